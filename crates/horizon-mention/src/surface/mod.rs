//! Editing surfaces and the adapters that drive them.
//!
//! A host binds a [`HostSurface`]: a flat [`TextField`] (single-line input or
//! multi-line text area) or a structured [`DocumentTree`]. At bind time the
//! controller picks the matching [`SurfaceAdapter`]; every caret lookup, text
//! read and replacement afterwards goes through that adapter, never through a
//! per-call branch on the surface kind. [`InertAdapter`] stands in while no
//! surface is current.
//!
//! # Related Modules
//!
//! - [`placement`] - flips the menu against the caret rect
//! - [`mirror`] - caret measurement for flat fields

mod document;
mod field;
mod flat;
mod inert;
pub mod mirror;
pub mod placement;
mod tree;

use std::fmt;

use slotmap::new_key_type;

pub use document::{Caret, DocumentTree, ElementData, NodeId, NodeKind};
pub use field::{BoxSizing, Edges, FieldStyle, FontStyle, Overflow, TextAlign, TextDirection, TextField, TextTransform};
pub use flat::FlatBufferAdapter;
pub use inert::InertAdapter;
pub use placement::{Edge, MenuCoordinates};
pub use tree::TreeAdapter;

use crate::geometry::{Rect, Size, Viewport};
use crate::template::Content;
use crate::trigger::TriggerInfo;

new_key_type! {
    /// Handle to a bound surface.
    pub struct SurfaceId;
}

/// A text-bearing component the host wants mentions in.
#[derive(Debug, Clone)]
pub enum HostSurface {
    /// Single-line text field.
    Input(TextField),
    /// Multi-line text field.
    TextArea(TextField),
    /// Rich editable content.
    Rich(DocumentTree),
    /// Any other element; cannot be bound.
    Other { node_name: String },
}

/// The kind of a [`HostSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Input,
    TextArea,
    Rich,
    Other,
}

impl HostSurface {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Self::Input(_) => SurfaceKind::Input,
            Self::TextArea(_) => SurfaceKind::TextArea,
            Self::Rich(_) => SurfaceKind::Rich,
            Self::Other { .. } => SurfaceKind::Other,
        }
    }

    /// Element name as the host would report it.
    pub fn node_name(&self) -> &str {
        match self {
            Self::Input(_) => "INPUT",
            Self::TextArea(_) => "TEXTAREA",
            Self::Rich(_) => "DIV",
            Self::Other { node_name } => node_name,
        }
    }

    /// The flat field, for inputs and text areas.
    pub fn as_field(&self) -> Option<&TextField> {
        match self {
            Self::Input(field) | Self::TextArea(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_field_mut(&mut self) -> Option<&mut TextField> {
        match self {
            Self::Input(field) | Self::TextArea(field) => Some(field),
            _ => None,
        }
    }

    /// The document, for rich surfaces.
    pub fn as_document(&self) -> Option<&DocumentTree> {
        match self {
            Self::Rich(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut DocumentTree> {
        match self {
            Self::Rich(doc) => Some(doc),
            _ => None,
        }
    }

    /// Whole text of the surface.
    pub fn text(&self) -> String {
        match self {
            Self::Input(field) | Self::TextArea(field) => field.value().to_string(),
            Self::Rich(doc) => doc.text_content(doc.root()),
            Self::Other { .. } => String::new(),
        }
    }
}

/// A cursor position that survives re-renders.
///
/// For structured surfaces `path` holds child indices from the editable
/// `host` down to the caret's node. Flat surfaces have no host and an empty
/// path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionAnchor {
    pub host: Option<NodeId>,
    pub path: Vec<usize>,
    pub offset: usize,
}

/// Caret geometry, text access and splicing for one kind of surface.
pub trait SurfaceAdapter: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Text from the start of the caret's container up to the caret.
    fn text_preceding_cursor(&self, surface: &HostSurface) -> Option<String>;

    /// Re-locatable description of the caret.
    fn selection_anchor(&self, surface: &HostSurface) -> Option<SelectionAnchor>;

    /// Viewport rect of a collapsed caret at `position`.
    fn caret_rect(&self, surface: &HostSurface, position: usize) -> Option<Rect>;

    /// Replace the mention described by `info` with `content` plus the suffix.
    ///
    /// Returns `false` when nothing could be replaced.
    fn replace_range(&self, surface: &mut HostSurface, info: &TriggerInfo, content: &Content) -> bool;

    /// Insert `text` at the caret, leaving the caret after it.
    fn insert_at_cursor(&self, surface: &mut HostSurface, text: &str) -> bool;

    /// Mentions already present for `trigger`, skipping one still being typed
    /// at `composing`.
    fn count_mentions(&self, surface: &HostSurface, trigger: &str, composing: Option<usize>) -> usize;

    /// Move the caret back to `anchor` after the live caret was lost.
    fn restore_selection(&self, _surface: &mut HostSurface, _anchor: &SelectionAnchor) -> bool {
        false
    }

    /// Menu coordinates for a caret at `position`.
    fn coordinates(
        &self,
        surface: &HostSurface,
        position: usize,
        menu: Size,
        viewport: &Viewport,
    ) -> Option<MenuCoordinates> {
        let anchor = self.caret_rect(surface, position)?;
        Some(placement::coordinates_relative_to_rect(anchor, menu, viewport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_kind_and_names() {
        let input = HostSurface::Input(TextField::new("a"));
        assert_eq!(input.kind(), SurfaceKind::Input);
        assert_eq!(input.node_name(), "INPUT");
        assert!(input.as_field().is_some());
        assert!(input.as_document().is_none());

        let other = HostSurface::Other {
            node_name: "SPAN".to_string(),
        };
        assert_eq!(other.kind(), SurfaceKind::Other);
        assert_eq!(other.node_name(), "SPAN");
        assert_eq!(other.text(), "");
    }

    #[test]
    fn test_rich_text() {
        let mut doc = DocumentTree::new();
        let root = doc.root();
        doc.append_text(root, "hi").unwrap();
        let rich = HostSurface::Rich(doc);
        assert_eq!(rich.text(), "hi");
    }
}
