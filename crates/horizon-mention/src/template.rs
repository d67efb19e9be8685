//! Rendered content and the template hooks that produce it.

use std::fmt;
use std::sync::Arc;

use crate::filter::{FilteredItem, MentionRecord};

/// Class given to mention spans produced by the default select template.
pub const MENTION_CLASS: &str = "tribute-mention";

/// Attribute recording which trigger produced a mention span.
pub const MENTION_TRIGGER_ATTR: &str = "data-mention-trigger";

/// One node of a structured fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentNode {
    /// A run of text.
    Text(String),
    /// An element with children.
    Element {
        tag: String,
        classes: Vec<String>,
        attributes: Vec<(String, String)>,
        children: Vec<FragmentNode>,
    },
}

impl FragmentNode {
    /// An element with a single text child.
    pub fn element_with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            classes: Vec::new(),
            attributes: Vec::new(),
            children: vec![Self::Text(text.into())],
        }
    }

    /// Builder method to add a class to an element. Text nodes are unchanged.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        if let Self::Element { classes, .. } = &mut self {
            classes.push(class.into());
        }
        self
    }

    /// Builder method to add an attribute to an element. Text nodes are unchanged.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attributes, .. } = &mut self {
            attributes.push((name.into(), value.into()));
        }
        self
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Element { children, .. } => children.iter().for_each(|c| c.collect_text(out)),
        }
    }
}

/// A sequence of nodes inserted into a structured surface.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    pub nodes: Vec<FragmentNode>,
}

impl Fragment {
    /// A fragment holding a single node.
    pub fn single(node: FragmentNode) -> Self {
        Self { nodes: vec![node] }
    }

    /// Concatenated text of every node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.nodes.iter().for_each(|n| n.collect_text(&mut out));
        out
    }
}

/// Output of a template: literal text or a structured fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Fragment(Fragment),
}

impl Content {
    /// Literal text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Text as it would read once inserted into a flat buffer.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Fragment(fragment) => fragment.text_content(),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Fragment> for Content {
    fn from(fragment: Fragment) -> Self {
        Self::Fragment(fragment)
    }
}

/// Renders one menu entry.
pub type MenuItemTemplate<T> = Arc<dyn Fn(&FilteredItem<T>) -> Content + Send + Sync>;

/// Builds the replacement for a committed item. `None` suppresses replacement.
pub type SelectTemplate<T> = Arc<dyn Fn(&SelectContext<'_>, Option<&FilteredItem<T>>) -> Option<Content> + Send + Sync>;

/// What a select template knows about the mention being committed.
#[derive(Debug, Clone, Copy)]
pub struct SelectContext<'a> {
    /// The trigger text that started the mention.
    pub trigger: &'a str,
    /// The query typed so far.
    pub mention_text: &'a str,
    /// Field whose value is inserted.
    pub fill_attr: &'a str,
    /// Whether the target is a structured surface.
    pub rich: bool,
}

/// Content shown when filtering yields nothing.
#[derive(Clone, Default)]
pub enum NoMatchTemplate {
    /// Close the menu instead of showing a placeholder.
    Disabled,
    /// Fixed placeholder content.
    Content(Content),
    /// Placeholder computed on demand.
    Dynamic(Arc<dyn Fn() -> Option<Content> + Send + Sync>),
    /// The built-in "No Match Found!" text.
    #[default]
    Default,
}

impl NoMatchTemplate {
    /// Placeholder text; empty or blank text disables the placeholder.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Self::Disabled
        } else {
            Self::Content(Content::Text(text))
        }
    }

    /// Render the placeholder, if any.
    pub fn render(&self) -> Option<Content> {
        match self {
            Self::Disabled => None,
            Self::Content(content) => Some(content.clone()),
            Self::Dynamic(f) => f(),
            Self::Default => Some(Content::text("No Match Found!")),
        }
    }
}

impl fmt::Debug for NoMatchTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("NoMatchTemplate::Disabled"),
            Self::Content(c) => f.debug_tuple("NoMatchTemplate::Content").field(c).finish(),
            Self::Dynamic(_) => f.write_str("NoMatchTemplate::Dynamic(..)"),
            Self::Default => f.write_str("NoMatchTemplate::Default"),
        }
    }
}

/// Default menu entry: the highlighted display string.
pub fn default_menu_item<T>(item: &FilteredItem<T>) -> Content {
    Content::Text(item.string.clone())
}

/// Default replacement content.
///
/// Without an item the typed text is restored. On structured surfaces the
/// mention is wrapped in a marked span so it can be counted later.
pub fn default_select<T: MentionRecord>(ctx: &SelectContext<'_>, item: Option<&FilteredItem<T>>) -> Option<Content> {
    let Some(item) = item else {
        return Some(Content::Text(format!("{}{}", ctx.trigger, ctx.mention_text)));
    };

    let value = item.original.field(ctx.fill_attr).unwrap_or_default();
    let text = format!("{}{}", ctx.trigger, value);
    if ctx.rich {
        Some(Content::Fragment(Fragment::single(
            FragmentNode::element_with_text("span", text)
                .with_class(MENTION_CLASS)
                .with_attribute(MENTION_TRIGGER_ATTR, ctx.trigger),
        )))
    } else {
        Some(Content::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(value: &str) -> FilteredItem<serde_json::Value> {
        FilteredItem {
            original: serde_json::json!({"key": value, "value": value.to_lowercase()}),
            string: value.to_string(),
            score: 1,
            index: 0,
        }
    }

    fn ctx(rich: bool) -> SelectContext<'static> {
        SelectContext {
            trigger: "@",
            mention_text: "ad",
            fill_attr: "value",
            rich,
        }
    }

    #[test]
    fn test_default_select_flat() {
        let content = default_select(&ctx(false), Some(&item("Ada"))).unwrap();
        assert_eq!(content, Content::text("@ada"));
    }

    #[test]
    fn test_default_select_rich() {
        let content = default_select(&ctx(true), Some(&item("Ada"))).unwrap();
        let Content::Fragment(fragment) = content else {
            panic!("expected fragment");
        };
        assert_eq!(fragment.text_content(), "@ada");
        match &fragment.nodes[0] {
            FragmentNode::Element { classes, attributes, .. } => {
                assert_eq!(classes, &vec![MENTION_CLASS.to_string()]);
                assert!(attributes.contains(&(MENTION_TRIGGER_ATTR.to_string(), "@".to_string())));
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_default_select_without_item() {
        let content = default_select::<serde_json::Value>(&ctx(true), None).unwrap();
        assert_eq!(content, Content::text("@ad"));
    }

    #[test]
    fn test_no_match_template() {
        assert_eq!(NoMatchTemplate::default().render(), Some(Content::text("No Match Found!")));
        assert!(NoMatchTemplate::text("").render().is_none());
        assert!(NoMatchTemplate::text("   ").render().is_none());
        assert_eq!(NoMatchTemplate::text("Nobody").render(), Some(Content::text("Nobody")));
        let dynamic = NoMatchTemplate::Dynamic(Arc::new(|| None));
        assert!(dynamic.render().is_none());
    }
}
