//! Adapter for structured documents.

use horizon_mention_core::logging::{span_names, targets};

use crate::geometry::Rect;
use crate::template::{Content, FragmentNode};
use crate::trigger::TriggerInfo;

use super::{DocumentTree, HostSurface, NodeId, SelectionAnchor, SurfaceAdapter};

/// Suffix appended after a replacement in a structured document.
pub const DEFAULT_TREE_SUFFIX: &str = "\u{A0}";

/// Drives rich editable documents.
#[derive(Debug, Clone, Default)]
pub struct TreeAdapter {
    suffix: Option<String>,
    autocomplete_mode: bool,
}

impl TreeAdapter {
    pub fn new(suffix: Option<String>, autocomplete_mode: bool) -> Self {
        Self {
            suffix,
            autocomplete_mode,
        }
    }

    fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or(DEFAULT_TREE_SUFFIX)
    }

    /// The text node a replacement applies to: the anchored node when its
    /// path still resolves, else the node under the live caret.
    fn target_node(doc: &DocumentTree, info: &TriggerInfo) -> Option<NodeId> {
        let anchored = info
            .anchor
            .as_ref()
            .and_then(|a| a.host.and_then(|host| doc.resolve_path(host, &a.path).ok()));
        anchored
            .or_else(|| doc.caret().map(|c| c.node))
            .filter(|&node| doc.text(node).is_some())
    }

    fn splice(&self, doc: &mut DocumentTree, node: NodeId, info: &TriggerInfo, content: &Content) -> crate::error::MentionResult<()> {
        let start = info.mention_position;
        let mut end = start + info.mention_text.len();
        if !self.autocomplete_mode {
            end += info.trigger_len();
        }
        doc.delete_text(node, start, end)?;

        let suffix = self.suffix();
        match content {
            Content::Text(text) => {
                let inserted = format!("{text}{suffix}");
                doc.insert_text(node, start, &inserted)?;
                doc.set_caret(node, start + inserted.len())
            }
            Content::Fragment(fragment) => {
                let mut last = doc.insert_fragment(node, start, &fragment.nodes)?;
                if !suffix.is_empty() {
                    last = match last {
                        Some(last) => Some(doc.insert_text_after(last, suffix)?),
                        None => doc.insert_fragment(node, start, &[FragmentNode::Text(suffix.to_string())])?,
                    };
                }
                match last {
                    Some(last) => doc.set_caret_after(last),
                    None => doc.set_caret(node, start),
                }
            }
        }
    }
}

impl SurfaceAdapter for TreeAdapter {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn text_preceding_cursor(&self, surface: &HostSurface) -> Option<String> {
        let doc = surface.as_document()?;
        let caret = doc.caret()?;
        let text = doc.text_content(caret.node);
        text.get(..caret.offset).map(str::to_string)
    }

    fn selection_anchor(&self, surface: &HostSurface) -> Option<SelectionAnchor> {
        let doc = surface.as_document()?;
        let caret = doc.caret()?;
        let (host, path) = doc.path_from_host(caret.node)?;
        Some(SelectionAnchor {
            host: Some(host),
            path,
            offset: caret.offset,
        })
    }

    fn caret_rect(&self, surface: &HostSurface, position: usize) -> Option<Rect> {
        let doc = surface.as_document()?;
        let caret = doc.caret()?;
        doc.range_rect(caret.node, position)
    }

    fn replace_range(&self, surface: &mut HostSurface, info: &TriggerInfo, content: &Content) -> bool {
        let Some(doc) = surface.as_document_mut() else {
            return false;
        };
        let _span = tracing::debug_span!(span_names::REPLACE, surface = "tree").entered();

        let Some(node) = Self::target_node(doc, info) else {
            tracing::debug!(target: targets::SURFACE, "no text node to replace in");
            return false;
        };
        match self.splice(doc, node, info, content) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target: targets::SURFACE, error = %err, "tree replacement failed");
                false
            }
        }
    }

    fn insert_at_cursor(&self, surface: &mut HostSurface, text: &str) -> bool {
        surface
            .as_document_mut()
            .is_some_and(|doc| doc.insert_text_at_caret(text).is_ok())
    }

    fn count_mentions(&self, surface: &HostSurface, trigger: &str, _composing: Option<usize>) -> usize {
        surface.as_document().map(|doc| doc.count_mentions(trigger)).unwrap_or(0)
    }

    fn restore_selection(&self, surface: &mut HostSurface, anchor: &SelectionAnchor) -> bool {
        let Some(doc) = surface.as_document_mut() else {
            return false;
        };
        let Some(host) = anchor.host else {
            return false;
        };
        match doc.resolve_path(host, &anchor.path) {
            Ok(node) => doc.set_caret(node, anchor.offset).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Size, Viewport};
    use crate::layout::TextMetrics;
    use crate::template::{Fragment, MENTION_TRIGGER_ATTR};

    fn surface(text: &str) -> (HostSurface, NodeId) {
        let mut doc = DocumentTree::new()
            .with_metrics(TextMetrics::new(10.0).with_line_height(12.0))
            .with_bounds(Rect::new(0.0, 0.0, 400.0, 100.0));
        let p = doc.append_element(doc.root(), "p").unwrap();
        let node = doc.append_text(p, text).unwrap();
        doc.set_caret(node, text.len()).unwrap();
        (HostSurface::Rich(doc), node)
    }

    fn detect(adapter: &TreeAdapter, surface: &HostSurface, position: usize, query: &str) -> TriggerInfo {
        TriggerInfo {
            mention_position: position,
            mention_text: query.to_string(),
            trigger_char: "@".to_string(),
            anchor: adapter.selection_anchor(surface),
        }
    }

    #[test]
    fn test_text_preceding_and_anchor() {
        let adapter = TreeAdapter::default();
        let (surface, _) = surface("Hello @jo");
        assert_eq!(adapter.text_preceding_cursor(&surface).as_deref(), Some("Hello @jo"));
        let anchor = adapter.selection_anchor(&surface).unwrap();
        assert_eq!(anchor.path, vec![0, 0]);
        assert_eq!(anchor.offset, 9);
    }

    #[test]
    fn test_replace_text_with_nbsp_suffix() {
        let adapter = TreeAdapter::default();
        let (mut surface, _) = surface("Hello @jo");
        let info = detect(&adapter, &surface, 6, "jo");
        assert!(adapter.replace_range(&mut surface, &info, &Content::text("@john")));
        assert_eq!(surface.text(), "Hello @john\u{A0}");
        assert!(adapter.text_preceding_cursor(&surface).unwrap().ends_with("@john\u{A0}"));
    }

    #[test]
    fn test_replace_with_fragment() {
        let adapter = TreeAdapter::default();
        let (mut surface, _) = surface("Hi @jo!");
        if let Some(doc) = surface.as_document_mut() {
            let node = doc.caret().unwrap().node;
            doc.set_caret(node, 6).unwrap();
        }
        let info = detect(&adapter, &surface, 3, "jo");
        let fragment = Fragment::single(
            FragmentNode::element_with_text("span", "@john").with_attribute(MENTION_TRIGGER_ATTR, "@"),
        );
        assert!(adapter.replace_range(&mut surface, &info, &Content::Fragment(fragment)));

        assert_eq!(surface.text(), "Hi @john\u{A0}!");
        assert_eq!(adapter.count_mentions(&surface, "@", None), 1);
        assert!(adapter.text_preceding_cursor(&surface).unwrap().ends_with('\u{A0}'));
    }

    #[test]
    fn test_replace_after_rerender_uses_anchor() {
        let adapter = TreeAdapter::default();
        let (mut surface, _) = surface("Hello @jo");
        let info = detect(&adapter, &surface, 6, "jo");

        // Re-render the paragraph: the caret and every handle die.
        if let Some(doc) = surface.as_document_mut() {
            let p = doc.children(doc.root())[0];
            doc.replace_with_clone(p).unwrap();
            assert!(doc.caret().is_none());
        }
        assert!(adapter.text_preceding_cursor(&surface).is_none());

        assert!(adapter.replace_range(&mut surface, &info, &Content::text("@john")));
        assert_eq!(surface.text(), "Hello @john\u{A0}");
    }

    #[test]
    fn test_restore_selection() {
        let adapter = TreeAdapter::default();
        let (mut surface, _) = surface("Hello @jo");
        let anchor = adapter.selection_anchor(&surface).unwrap();
        if let Some(doc) = surface.as_document_mut() {
            let p = doc.children(doc.root())[0];
            doc.replace_with_clone(p).unwrap();
        }
        assert!(adapter.restore_selection(&mut surface, &anchor));
        assert_eq!(adapter.text_preceding_cursor(&surface).as_deref(), Some("Hello @jo"));
    }

    #[test]
    fn test_coordinates() {
        let adapter = TreeAdapter::default();
        let (surface, _) = surface("Hello @jo");
        let coords = adapter
            .coordinates(&surface, 6, Size::new(100.0, 50.0), &Viewport::new(800.0, 600.0))
            .unwrap();
        assert_eq!(coords.top, crate::surface::Edge::Px(12.0));
        assert_eq!(coords.left, crate::surface::Edge::Px(36.0));
    }

    #[test]
    fn test_insert_at_cursor() {
        let adapter = TreeAdapter::default();
        let (mut surface, _) = surface("Hi ");
        assert!(adapter.insert_at_cursor(&mut surface, "@"));
        assert_eq!(adapter.text_preceding_cursor(&surface).as_deref(), Some("Hi @"));
    }
}
