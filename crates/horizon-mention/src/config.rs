//! Engine options and collection registration.
//!
//! [`TributeOptions`] is plain data and can be loaded from JSON. Collections
//! carry closures (providers, templates, lookup functions) and are therefore
//! assembled in code with [`CollectionConfig`] builders. Every flag a
//! collection leaves unset is inherited from [`CollectionDefaults`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MentionError, MentionResult};
use crate::filter::{MentionRecord, SearchOptions};
use crate::session::Responder;
use crate::template::{Content, MenuItemTemplate, NoMatchTemplate, SelectTemplate};

/// Defaults applied to collections that leave a setting unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionDefaults {
    pub trigger: String,
    pub lookup: String,
    pub fill_attr: String,
    pub select_class: String,
    pub container_class: String,
    pub item_class: String,
    pub require_leading_space: bool,
    pub allow_spaces: bool,
    pub menu_show_min_length: usize,
    pub menu_item_limit: Option<usize>,
    pub max_display_items: Option<usize>,
    pub is_blocked: bool,
    pub search: SearchOptions,
    /// Placeholder text for empty results; `None` uses the built-in text and
    /// an empty string disables the placeholder.
    pub no_match_text: Option<String>,
}

impl Default for CollectionDefaults {
    fn default() -> Self {
        Self {
            trigger: "@".to_string(),
            lookup: "key".to_string(),
            fill_attr: "value".to_string(),
            select_class: "highlight".to_string(),
            container_class: "tribute-container".to_string(),
            item_class: String::new(),
            require_leading_space: true,
            allow_spaces: false,
            menu_show_min_length: 0,
            menu_item_limit: None,
            max_display_items: None,
            is_blocked: false,
            search: SearchOptions::default(),
            no_match_text: None,
        }
    }
}

/// Global engine options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TributeOptions {
    /// Complete the last word instead of trigger-led mentions.
    pub autocomplete_mode: bool,
    /// Separator pattern for autocomplete mode; `None` means whitespace.
    pub autocomplete_separator: Option<String>,
    /// Text appended after a replacement; `None` uses the surface default.
    pub replace_text_suffix: Option<String>,
    /// Let queries contain plain spaces.
    pub allow_spaces: bool,
    /// Compute panel coordinates; when false the panel is shown unpositioned.
    pub position_menu: bool,
    /// Space commits the selected entry.
    pub space_selects_match: bool,
    /// Page scrolls close the menu even when it lives in a host container.
    ///
    /// When unset, a menu in a host container closes on container scrolls and
    /// any other menu closes on page scrolls.
    pub close_on_scroll: bool,
    /// The panel lives in a host-supplied scroll container.
    pub menu_container: bool,
    /// Quiet period for resize and scroll handling, in milliseconds.
    pub debounce_ms: u64,
    /// Height of one menu entry.
    pub menu_item_height: f32,
    /// Upper bound on the panel height.
    pub menu_max_height: f32,
    /// Upper bound on the panel width.
    pub menu_max_width: f32,
    /// Font size used to measure menu entries.
    pub menu_font_size: f32,
    /// Defaults inherited by collections.
    pub defaults: CollectionDefaults,
}

impl Default for TributeOptions {
    fn default() -> Self {
        Self {
            autocomplete_mode: false,
            autocomplete_separator: None,
            replace_text_suffix: None,
            allow_spaces: false,
            position_menu: true,
            space_selects_match: false,
            close_on_scroll: false,
            menu_container: false,
            debounce_ms: 10,
            menu_item_height: 24.0,
            menu_max_height: 500.0,
            menu_max_width: 300.0,
            menu_font_size: 14.0,
            defaults: CollectionDefaults::default(),
        }
    }
}

impl TributeOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> MentionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Debounce delay as a duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Builder method to enable autocomplete mode.
    pub fn with_autocomplete(mut self, separator: Option<&str>) -> Self {
        self.autocomplete_mode = true;
        self.autocomplete_separator = separator.map(str::to_string);
        self
    }

    /// Builder method to set the replacement suffix.
    pub fn with_replace_text_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.replace_text_suffix = Some(suffix.into());
        self
    }

    /// Builder method to allow spaces in queries.
    pub fn with_allow_spaces(mut self, allow: bool) -> Self {
        self.allow_spaces = allow;
        self
    }

    /// Builder method to toggle panel positioning.
    pub fn with_position_menu(mut self, position: bool) -> Self {
        self.position_menu = position;
        self
    }

    /// Builder method to let space commit the selection.
    pub fn with_space_selects_match(mut self, enabled: bool) -> Self {
        self.space_selects_match = enabled;
        self
    }

    /// Builder method to choose which scrolls close the menu.
    pub fn with_close_on_scroll(mut self, enabled: bool) -> Self {
        self.close_on_scroll = enabled;
        self
    }

    /// Builder method to place the menu in a host scroll container.
    pub fn with_menu_container(mut self, in_container: bool) -> Self {
        self.menu_container = in_container;
        self
    }

    /// Builder method to set the debounce delay.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_ms = delay.as_millis() as u64;
        self
    }

    /// Builder method to replace collection defaults.
    pub fn with_defaults(mut self, defaults: CollectionDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Supplies items asynchronously.
///
/// The provider receives the query and a [`Responder`]; it may resolve right
/// away or keep the responder and resolve later. Results for a session that
/// has since ended are discarded.
pub trait ItemProvider<T>: Send + Sync {
    /// Start fetching items for `query`.
    fn fetch(&self, query: &str, responder: Responder<T>);
}

impl<T, F> ItemProvider<T> for F
where
    F: Fn(&str, Responder<T>) + Send + Sync,
{
    fn fetch(&self, query: &str, responder: Responder<T>) {
        self(query, responder)
    }
}

/// Where a collection's items come from.
pub enum Values<T> {
    /// A fixed list, filtered locally.
    Static(Vec<T>),
    /// An asynchronous provider.
    Provider(Arc<dyn ItemProvider<T>>),
}

impl<T> Default for Values<T> {
    fn default() -> Self {
        Self::Static(Vec::new())
    }
}

impl<T: Clone> Clone for Values<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(items) => Self::Static(items.clone()),
            Self::Provider(p) => Self::Provider(Arc::clone(p)),
        }
    }
}

impl<T> fmt::Debug for Values<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(items) => write!(f, "Values::Static({} items)", items.len()),
            Self::Provider(_) => f.write_str("Values::Provider(..)"),
        }
    }
}

/// Produces the searchable string for an item.
pub enum Lookup<T> {
    /// Read a named field.
    Field(String),
    /// Compute from the item and the current query.
    Function(Arc<dyn Fn(&T, &str) -> String + Send + Sync>),
}

impl<T> Clone for Lookup<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Field(name) => Self::Field(name.clone()),
            Self::Function(f) => Self::Function(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Lookup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Lookup::Field").field(name).finish(),
            Self::Function(_) => f.write_str("Lookup::Function(..)"),
        }
    }
}

impl<T: MentionRecord> Lookup<T> {
    /// Searchable string for `item`.
    pub fn extract(&self, item: &T, query: &str) -> String {
        match self {
            Self::Field(name) => item.field(name).unwrap_or_default(),
            Self::Function(f) => f(item, query),
        }
    }
}

/// A trigger source as registered by the host.
pub struct CollectionConfig<T> {
    trigger: Option<String>,
    lookup: Option<Lookup<T>>,
    fill_attr: Option<String>,
    select_class: Option<String>,
    container_class: Option<String>,
    item_class: Option<String>,
    require_leading_space: Option<bool>,
    allow_spaces: Option<bool>,
    menu_show_min_length: Option<usize>,
    menu_item_limit: Option<usize>,
    max_display_items: Option<usize>,
    is_blocked: Option<bool>,
    values: Values<T>,
    search: Option<SearchOptions>,
    menu_item_template: Option<MenuItemTemplate<T>>,
    select_template: Option<SelectTemplate<T>>,
    no_match_template: Option<NoMatchTemplate>,
    loading_item_template: Option<Content>,
}

impl<T> Default for CollectionConfig<T> {
    fn default() -> Self {
        Self {
            trigger: None,
            lookup: None,
            fill_attr: None,
            select_class: None,
            container_class: None,
            item_class: None,
            require_leading_space: None,
            allow_spaces: None,
            menu_show_min_length: None,
            menu_item_limit: None,
            max_display_items: None,
            is_blocked: None,
            values: Values::default(),
            search: None,
            menu_item_template: None,
            select_template: None,
            no_match_template: None,
            loading_item_template: None,
        }
    }
}

impl<T> CollectionConfig<T> {
    /// Create a collection that inherits every setting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the trigger text.
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    /// Builder method to supply a static item list.
    pub fn with_values(mut self, values: Vec<T>) -> Self {
        self.values = Values::Static(values);
        self
    }

    /// Builder method to supply an asynchronous provider.
    pub fn with_provider(mut self, provider: impl ItemProvider<T> + 'static) -> Self {
        self.values = Values::Provider(Arc::new(provider));
        self
    }

    /// Builder method to look up a named field.
    pub fn with_lookup_field(mut self, field: impl Into<String>) -> Self {
        self.lookup = Some(Lookup::Field(field.into()));
        self
    }

    /// Builder method to compute the searchable string.
    pub fn with_lookup_fn(mut self, f: impl Fn(&T, &str) -> String + Send + Sync + 'static) -> Self {
        self.lookup = Some(Lookup::Function(Arc::new(f)));
        self
    }

    /// Builder method to set the field inserted on commit.
    pub fn with_fill_attr(mut self, field: impl Into<String>) -> Self {
        self.fill_attr = Some(field.into());
        self
    }

    /// Builder method to set panel and entry classes.
    pub fn with_classes(
        mut self,
        container_class: impl Into<String>,
        select_class: impl Into<String>,
        item_class: impl Into<String>,
    ) -> Self {
        self.container_class = Some(container_class.into());
        self.select_class = Some(select_class.into());
        self.item_class = Some(item_class.into());
        self
    }

    /// Builder method to require whitespace before the trigger.
    pub fn with_require_leading_space(mut self, required: bool) -> Self {
        self.require_leading_space = Some(required);
        self
    }

    /// Builder method to allow spaces in queries.
    pub fn with_allow_spaces(mut self, allow: bool) -> Self {
        self.allow_spaces = Some(allow);
        self
    }

    /// Builder method to set the minimum query length before the menu opens.
    pub fn with_menu_show_min_length(mut self, length: usize) -> Self {
        self.menu_show_min_length = Some(length);
        self
    }

    /// Builder method to cap the number of rendered entries.
    pub fn with_menu_item_limit(mut self, limit: usize) -> Self {
        self.menu_item_limit = Some(limit);
        self
    }

    /// Builder method to cap the number of mentions a surface may hold.
    pub fn with_max_display_items(mut self, max: usize) -> Self {
        self.max_display_items = Some(max);
        self
    }

    /// Builder method to block the collection.
    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.is_blocked = Some(blocked);
        self
    }

    /// Builder method to set search options.
    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = Some(search);
        self
    }

    /// Builder method to set the menu entry template.
    pub fn with_menu_item_template(
        mut self,
        template: impl Fn(&crate::filter::FilteredItem<T>) -> Content + Send + Sync + 'static,
    ) -> Self {
        self.menu_item_template = Some(Arc::new(template));
        self
    }

    /// Builder method to set the select template.
    pub fn with_select_template(
        mut self,
        template: impl Fn(&crate::template::SelectContext<'_>, Option<&crate::filter::FilteredItem<T>>) -> Option<Content>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.select_template = Some(Arc::new(template));
        self
    }

    /// Builder method to set the no-match template.
    pub fn with_no_match_template(mut self, template: NoMatchTemplate) -> Self {
        self.no_match_template = Some(template);
        self
    }

    /// Builder method to show a placeholder while a provider is pending.
    pub fn with_loading_item_template(mut self, content: impl Into<Content>) -> Self {
        self.loading_item_template = Some(content.into());
        self
    }

    /// Apply defaults and validate.
    pub(crate) fn resolve(self, index: usize, options: &TributeOptions) -> MentionResult<Collection<T>> {
        let defaults = &options.defaults;

        let lookup = self.lookup.unwrap_or_else(|| Lookup::Field(defaults.lookup.clone()));
        if let Lookup::Field(name) = &lookup
            && name.is_empty()
        {
            return Err(MentionError::invalid_lookup(index, "lookup field name is empty"));
        }

        let (trigger, allow_spaces) = if options.autocomplete_mode {
            (String::new(), false)
        } else {
            (
                self.trigger.unwrap_or_else(|| defaults.trigger.clone()),
                self.allow_spaces.unwrap_or(defaults.allow_spaces),
            )
        };

        let no_match_template = self.no_match_template.unwrap_or_else(|| match &defaults.no_match_text {
            Some(text) => NoMatchTemplate::text(text.clone()),
            None => NoMatchTemplate::Default,
        });

        Ok(Collection {
            trigger,
            lookup,
            fill_attr: self.fill_attr.unwrap_or_else(|| defaults.fill_attr.clone()),
            select_class: self.select_class.unwrap_or_else(|| defaults.select_class.clone()),
            container_class: self.container_class.unwrap_or_else(|| defaults.container_class.clone()),
            item_class: self.item_class.unwrap_or_else(|| defaults.item_class.clone()),
            require_leading_space: self.require_leading_space.unwrap_or(defaults.require_leading_space),
            allow_spaces,
            menu_show_min_length: self.menu_show_min_length.unwrap_or(defaults.menu_show_min_length),
            menu_item_limit: self.menu_item_limit.or(defaults.menu_item_limit),
            max_display_items: self.max_display_items.or(defaults.max_display_items),
            is_blocked: self.is_blocked.unwrap_or(defaults.is_blocked),
            values: self.values,
            search: self.search.unwrap_or_else(|| defaults.search.clone()),
            menu_item_template: self.menu_item_template,
            select_template: self.select_template,
            no_match_template,
            loading_item_template: self.loading_item_template,
        })
    }
}

impl<T> fmt::Debug for CollectionConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionConfig")
            .field("trigger", &self.trigger)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

/// A registered collection with every setting resolved.
pub struct Collection<T> {
    pub(crate) trigger: String,
    pub(crate) lookup: Lookup<T>,
    pub(crate) fill_attr: String,
    pub(crate) select_class: String,
    pub(crate) container_class: String,
    pub(crate) item_class: String,
    pub(crate) require_leading_space: bool,
    pub(crate) allow_spaces: bool,
    pub(crate) menu_show_min_length: usize,
    pub(crate) menu_item_limit: Option<usize>,
    pub(crate) max_display_items: Option<usize>,
    pub(crate) is_blocked: bool,
    pub(crate) values: Values<T>,
    pub(crate) search: SearchOptions,
    pub(crate) menu_item_template: Option<MenuItemTemplate<T>>,
    pub(crate) select_template: Option<SelectTemplate<T>>,
    pub(crate) no_match_template: NoMatchTemplate,
    pub(crate) loading_item_template: Option<Content>,
}

impl<T> Collection<T> {
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn fill_attr(&self) -> &str {
        &self.fill_attr
    }

    pub fn container_class(&self) -> &str {
        &self.container_class
    }

    pub fn select_class(&self) -> &str {
        &self.select_class
    }

    pub fn item_class(&self) -> &str {
        &self.item_class
    }

    pub fn require_leading_space(&self) -> bool {
        self.require_leading_space
    }

    pub fn allow_spaces(&self) -> bool {
        self.allow_spaces
    }

    pub fn menu_show_min_length(&self) -> usize {
        self.menu_show_min_length
    }

    pub fn menu_item_limit(&self) -> Option<usize> {
        self.menu_item_limit
    }

    pub fn max_display_items(&self) -> Option<usize> {
        self.max_display_items
    }

    pub fn is_blocked(&self) -> bool {
        self.is_blocked
    }

    pub fn values(&self) -> &Values<T> {
        &self.values
    }

    pub fn search(&self) -> &SearchOptions {
        &self.search
    }

    pub fn no_match_template(&self) -> &NoMatchTemplate {
        &self.no_match_template
    }

    /// Static items, if the collection has them.
    pub fn static_values(&self) -> Option<&[T]> {
        match &self.values {
            Values::Static(items) => Some(items),
            Values::Provider(_) => None,
        }
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("trigger", &self.trigger)
            .field("lookup", &self.lookup)
            .field("require_leading_space", &self.require_leading_space)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = TributeOptions::default();
        assert_eq!(options.debounce(), Duration::from_millis(10));
        assert_eq!(options.defaults.trigger, "@");
        assert_eq!(options.defaults.lookup, "key");
        assert!(options.defaults.require_leading_space);
        assert!(options.position_menu);
    }

    #[test]
    fn test_options_from_json() {
        let options = TributeOptions::from_json(
            r##"{"allow_spaces": true, "defaults": {"trigger": "#", "menu_item_limit": 5}}"##,
        )
        .unwrap();
        assert!(options.allow_spaces);
        assert_eq!(options.defaults.trigger, "#");
        assert_eq!(options.defaults.menu_item_limit, Some(5));
        assert_eq!(options.defaults.fill_attr, "value");
        assert_eq!(options.menu_max_height, 500.0);
    }

    #[test]
    fn test_options_from_bad_json() {
        let err = TributeOptions::from_json("{not json").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_collection_inherits_defaults() {
        let options = TributeOptions::default();
        let collection = CollectionConfig::<String>::new()
            .with_menu_item_limit(3)
            .resolve(0, &options)
            .unwrap();
        assert_eq!(collection.trigger(), "@");
        assert_eq!(collection.fill_attr(), "value");
        assert_eq!(collection.menu_item_limit(), Some(3));
        assert!(collection.require_leading_space());
        assert_eq!(collection.no_match_template().render(), Some(Content::text("No Match Found!")));
    }

    #[test]
    fn test_autocomplete_forces_empty_trigger() {
        let options = TributeOptions::default().with_autocomplete(None);
        let collection = CollectionConfig::<String>::new()
            .with_trigger("#")
            .with_allow_spaces(true)
            .resolve(0, &options)
            .unwrap();
        assert_eq!(collection.trigger(), "");
        assert!(!collection.allow_spaces());
    }

    #[test]
    fn test_empty_lookup_rejected() {
        let result = CollectionConfig::<String>::new()
            .with_lookup_field("")
            .resolve(2, &TributeOptions::default());
        assert!(matches!(result, Err(MentionError::InvalidLookup { collection: 2, .. })));
    }

    #[test]
    fn test_lookup_function() {
        let collection = CollectionConfig::<String>::new()
            .with_lookup_fn(|item, query| format!("{item}:{query}"))
            .resolve(0, &TributeOptions::default())
            .unwrap();
        assert_eq!(collection.lookup.extract(&"ada".to_string(), "a"), "ada:a");
    }

    #[test]
    fn test_empty_no_match_text_disables_placeholder() {
        let mut options = TributeOptions::default();
        options.defaults.no_match_text = Some(String::new());
        let collection = CollectionConfig::<String>::new().resolve(0, &options).unwrap();
        assert!(collection.no_match_template().render().is_none());
    }
}
