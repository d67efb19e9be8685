//! Structured editable documents.
//!
//! A [`DocumentTree`] stores element and text nodes in a slotmap arena. Node
//! handles are stable while the node lives and become invalid once it is
//! removed, so code that must survive a re-render records a child-index path
//! from the editable host instead of holding a [`NodeId`].
//!
//! The caret is collapsed and addressed as a node plus a byte offset into that
//! node's text content.

use slotmap::{SecondaryMap, SlotMap, new_key_type};

use horizon_mention_core::TreeSource;

use crate::error::{MentionError, MentionResult};
use crate::geometry::Rect;
use crate::layout::{FlowLayout, TextMetrics, WrapMode};
use crate::template::{FragmentNode, MENTION_TRIGGER_ATTR};

new_key_type! {
    /// Handle to a node in a [`DocumentTree`].
    pub struct NodeId;
}

const BLOCK_TAGS: &[&str] = &[
    "div", "p", "li", "ul", "ol", "pre", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Element payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    pub tag: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    /// Whether the element is an editing host.
    pub editable: bool,
}

impl ElementData {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    fn is_block(&self) -> bool {
        BLOCK_TAGS.contains(&self.tag.as_str())
    }
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A collapsed caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    /// Byte offset into the node's text content.
    pub offset: usize,
}

/// An editable tree of element and text nodes.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: SlotMap<NodeId, NodeData>,
    root: NodeId,
    caret: Option<Caret>,
    bounds: Option<Rect>,
    padding: f32,
    scroll_top: f32,
    metrics: TextMetrics,
}

impl DocumentTree {
    /// Create a document whose root is an editable `div`.
    pub fn new() -> Self {
        Self::with_root("div", true)
    }

    /// Create a document with a custom root element.
    pub fn with_root(tag: &str, editable: bool) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(NodeData {
            kind: NodeKind::Element(ElementData {
                editable,
                ..ElementData::new(tag)
            }),
            parent: None,
            children: Vec::new(),
        });
        Self {
            nodes,
            root,
            caret: None,
            bounds: None,
            padding: 0.0,
            scroll_top: 0.0,
            metrics: TextMetrics::default(),
        }
    }

    /// Builder method to attach the document at `bounds`.
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Builder method to set text metrics.
    pub fn with_metrics(mut self, metrics: TextMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Builder method to set inner padding.
    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `node` is still part of the document.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    fn data(&self, node: NodeId) -> MentionResult<&NodeData> {
        self.nodes.get(node).ok_or(MentionError::Detached)
    }

    fn data_mut(&mut self, node: NodeId) -> MentionResult<&mut NodeData> {
        self.nodes.get_mut(node).ok_or(MentionError::Detached)
    }

    fn element_mut(&mut self, node: NodeId) -> MentionResult<&mut ElementData> {
        match &mut self.data_mut(node)?.kind {
            NodeKind::Element(element) => Ok(element),
            NodeKind::Text(_) => Err(MentionError::NodeKindMismatch),
        }
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node).map(|n| &n.kind)
    }

    /// Text of a text node.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Position of `node` among its parent's children.
    pub fn child_index(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, kind: NodeKind) -> MentionResult<NodeId> {
        self.element_mut(parent)?;
        let id = self.nodes.insert(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        let children = &mut self.data_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, id);
        Ok(id)
    }

    /// Append an element to `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> MentionResult<NodeId> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, NodeKind::Element(ElementData::new(tag)))
    }

    /// Append a text node to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> MentionResult<NodeId> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, NodeKind::Text(text.to_string()))
    }

    /// Insert a text node right after `node`.
    pub fn insert_text_after(&mut self, node: NodeId, text: &str) -> MentionResult<NodeId> {
        let parent = self.parent(node).ok_or(MentionError::Detached)?;
        let index = self.child_index(node).ok_or(MentionError::Detached)?;
        self.insert_child(parent, index + 1, NodeKind::Text(text.to_string()))
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> MentionResult<()> {
        let element = self.element_mut(node)?;
        match element.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => element.attributes.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Element(element) => element.attribute(name),
            NodeKind::Text(_) => None,
        }
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> MentionResult<()> {
        let element = self.element_mut(node)?;
        if !element.classes.iter().any(|c| c == class) {
            element.classes.push(class.to_string());
        }
        Ok(())
    }

    pub fn is_editable(&self, node: NodeId) -> bool {
        matches!(self.kind(node), Some(NodeKind::Element(e)) if e.editable)
    }

    pub fn set_editable(&mut self, node: NodeId, editable: bool) -> MentionResult<()> {
        self.element_mut(node)?.editable = editable;
        Ok(())
    }

    /// Nearest editable element at or above `node`.
    pub fn editable_host(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.is_editable(id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element(_)) => {
                for &child in self.children(node) {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    // =========================================================================
    // Caret
    // =========================================================================

    pub fn caret(&self) -> Option<Caret> {
        self.caret.filter(|c| self.contains(c.node))
    }

    /// Place the caret; the offset is clamped and snapped to a char boundary.
    pub fn set_caret(&mut self, node: NodeId, offset: usize) -> MentionResult<()> {
        self.data(node)?;
        let text = self.text_content(node);
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        self.caret = Some(Caret { node, offset });
        Ok(())
    }

    pub fn clear_caret(&mut self) {
        self.caret = None;
    }

    /// Place the caret right after `node`, creating an empty text node when
    /// the next sibling is not text.
    pub fn set_caret_after(&mut self, node: NodeId) -> MentionResult<()> {
        if let Some(text) = self.text(node) {
            let len = text.len();
            return self.set_caret(node, len);
        }
        let parent = self.parent(node).ok_or(MentionError::Detached)?;
        let index = self.child_index(node).ok_or(MentionError::Detached)?;
        let next = self.children(parent).get(index + 1).copied();
        let target = match next {
            Some(sibling) if self.text(sibling).is_some() => sibling,
            _ => self.insert_text_after(node, "")?,
        };
        self.set_caret(target, 0)
    }

    /// Type `text` at the caret.
    ///
    /// A caret on an element appends a text node to it and moves into it.
    pub fn insert_text_at_caret(&mut self, text: &str) -> MentionResult<()> {
        let caret = self.caret().ok_or(MentionError::Detached)?;
        if self.text(caret.node).is_none() {
            let node = self.append_text(caret.node, text)?;
            return self.set_caret(node, text.len());
        }
        if let NodeKind::Text(existing) = &mut self.data_mut(caret.node)?.kind {
            existing.insert_str(caret.offset, text);
        }
        self.caret = Some(Caret {
            node: caret.node,
            offset: caret.offset + text.len(),
        });
        Ok(())
    }

    /// Delete the character before the caret inside its text node.
    pub fn backspace(&mut self) -> MentionResult<()> {
        let caret = self.caret().ok_or(MentionError::Detached)?;
        let mut moved_to = None;
        if let NodeKind::Text(text) = &mut self.data_mut(caret.node)?.kind
            && let Some(prev) = text[..caret.offset].chars().next_back()
        {
            let from = caret.offset - prev.len_utf8();
            text.replace_range(from..caret.offset, "");
            moved_to = Some(from);
        }
        if let Some(offset) = moved_to {
            self.caret = Some(Caret {
                node: caret.node,
                offset,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Insert `text` at `offset` inside a text node.
    pub fn insert_text(&mut self, node: NodeId, offset: usize, text: &str) -> MentionResult<()> {
        match &mut self.data_mut(node)?.kind {
            NodeKind::Text(existing) => {
                let mut offset = offset.min(existing.len());
                while !existing.is_char_boundary(offset) {
                    offset -= 1;
                }
                existing.insert_str(offset, text);
                Ok(())
            }
            NodeKind::Element(_) => Err(MentionError::NodeKindMismatch),
        }
    }

    /// Delete `start..end` of a text node, clamped to its length.
    pub fn delete_text(&mut self, node: NodeId, start: usize, end: usize) -> MentionResult<()> {
        match &mut self.data_mut(node)?.kind {
            NodeKind::Text(text) => {
                let end = end.min(text.len());
                let start = start.min(end);
                if text.is_char_boundary(start) && text.is_char_boundary(end) {
                    text.replace_range(start..end, "");
                }
                Ok(())
            }
            NodeKind::Element(_) => Err(MentionError::NodeKindMismatch),
        }
    }

    /// Insert fragment nodes at `offset` inside a text node, splitting it.
    ///
    /// Returns the last inserted node.
    pub fn insert_fragment(
        &mut self,
        node: NodeId,
        offset: usize,
        fragment: &[FragmentNode],
    ) -> MentionResult<Option<NodeId>> {
        let parent = self.parent(node).ok_or(MentionError::Detached)?;
        let mut index = self.child_index(node).ok_or(MentionError::Detached)?;

        let tail = match &mut self.data_mut(node)?.kind {
            NodeKind::Text(text) => {
                let offset = offset.min(text.len());
                if text.is_char_boundary(offset) {
                    text.split_off(offset)
                } else {
                    String::new()
                }
            }
            NodeKind::Element(_) => return Err(MentionError::NodeKindMismatch),
        };

        let mut last = None;
        for part in fragment {
            index += 1;
            last = Some(self.build(parent, index, part)?);
        }
        if !tail.is_empty() {
            self.insert_child(parent, index + 1, NodeKind::Text(tail))?;
        }
        Ok(last)
    }

    fn build(&mut self, parent: NodeId, index: usize, part: &FragmentNode) -> MentionResult<NodeId> {
        match part {
            FragmentNode::Text(text) => self.insert_child(parent, index, NodeKind::Text(text.clone())),
            FragmentNode::Element {
                tag,
                classes,
                attributes,
                children,
            } => {
                let id = self.insert_child(
                    parent,
                    index,
                    NodeKind::Element(ElementData {
                        tag: tag.clone(),
                        classes: classes.clone(),
                        attributes: attributes.clone(),
                        editable: false,
                    }),
                )?;
                for (i, child) in children.iter().enumerate() {
                    self.build(id, i, child)?;
                }
                Ok(id)
            }
        }
    }

    /// Replace `node` with an identical copy under new handles.
    ///
    /// This is what a re-render does: the structure is unchanged but every
    /// previously held handle into the subtree is dead, the caret included.
    pub fn replace_with_clone(&mut self, node: NodeId) -> MentionResult<NodeId> {
        let parent = self.parent(node).ok_or(MentionError::Detached)?;
        let index = self.child_index(node).ok_or(MentionError::Detached)?;
        let copy = self.clone_subtree(node, parent)?;
        self.remove_subtree(node);
        if let Some(data) = self.nodes.get_mut(parent) {
            data.children[index] = copy;
        }
        Ok(copy)
    }

    fn clone_subtree(&mut self, node: NodeId, parent: NodeId) -> MentionResult<NodeId> {
        let data = self.data(node)?;
        let kind = data.kind.clone();
        let children = data.children.clone();
        let copy = self.nodes.insert(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        for child in children {
            let child_copy = self.clone_subtree(child, copy)?;
            self.data_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    fn remove_subtree(&mut self, node: NodeId) {
        if let Some(data) = self.nodes.remove(node) {
            for child in data.children {
                self.remove_subtree(child);
            }
        }
    }

    // =========================================================================
    // Paths
    // =========================================================================

    /// Editable host of `node` and the child-index path from it down to `node`.
    pub fn path_from_host(&self, node: NodeId) -> Option<(NodeId, Vec<usize>)> {
        let mut path = Vec::new();
        let mut current = node;
        loop {
            if self.is_editable(current) {
                path.reverse();
                return Some((current, path));
            }
            path.push(self.child_index(current)?);
            current = self.parent(current)?;
        }
    }

    /// Follow a child-index path down from `host`.
    pub fn resolve_path(&self, host: NodeId, path: &[usize]) -> MentionResult<NodeId> {
        path.iter().try_fold(host, |node, &index| {
            self.data(node)?.children.get(index).copied().ok_or(MentionError::Detached)
        })
    }

    /// Number of mention elements created by `trigger`.
    pub fn count_mentions(&self, trigger: &str) -> usize {
        self.nodes
            .values()
            .filter(|n| matches!(&n.kind, NodeKind::Element(e) if e.attribute(MENTION_TRIGGER_ATTR) == Some(trigger)))
            .count()
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// On-screen bounds; `None` while detached.
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
    }

    pub fn metrics(&self) -> &TextMetrics {
        &self.metrics
    }

    pub fn set_scroll_top(&mut self, scroll_top: f32) {
        self.scroll_top = scroll_top;
    }

    /// Viewport rect of a collapsed range at `offset` within `node`.
    pub fn range_rect(&self, node: NodeId, offset: usize) -> Option<Rect> {
        let bounds = self.bounds?;
        if !self.contains(node) {
            return None;
        }

        let mut flat = String::new();
        let mut starts = SecondaryMap::new();
        self.flatten(self.root, &mut flat, &mut starts);
        let start = *starts.get(node)?;

        let layout = FlowLayout::new(
            &flat,
            &self.metrics,
            WrapMode::Word,
            Some((bounds.width() - 2.0 * self.padding).max(0.0)),
            0.0,
        );
        let rect = layout.caret_rect(start + offset);
        Some(rect.translate(
            bounds.left() + self.padding,
            bounds.top() + self.padding - self.scroll_top,
        ))
    }

    fn flatten(&self, node: NodeId, out: &mut String, starts: &mut SecondaryMap<NodeId, usize>) {
        let Some(kind) = self.kind(node) else {
            return;
        };
        match kind {
            NodeKind::Text(text) => {
                starts.insert(node, out.len());
                out.push_str(text);
            }
            NodeKind::Element(element) => {
                if element.tag == "br" {
                    out.push('\n');
                }
                if node != self.root && element.is_block() && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                starts.insert(node, out.len());
                for &child in self.children(node) {
                    self.flatten(child, out, starts);
                }
            }
        }
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSource for DocumentTree {
    type Node = NodeId;

    fn roots(&self) -> Vec<NodeId> {
        vec![self.root]
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        DocumentTree::children(self, node).to_vec()
    }

    fn label(&self, node: NodeId) -> String {
        match self.kind(node) {
            Some(NodeKind::Element(e)) if e.classes.is_empty() => format!("<{}>", e.tag),
            Some(NodeKind::Element(e)) => format!("<{}.{}>", e.tag, e.classes.join(".")),
            Some(NodeKind::Text(text)) => format!("{text:?}"),
            None => "(detached)".to_string(),
        }
    }

    fn kind(&self, node: NodeId) -> &'static str {
        match DocumentTree::kind(self, node) {
            Some(NodeKind::Element(_)) => "element",
            Some(NodeKind::Text(_)) => "text",
            None => "detached",
        }
    }
}
