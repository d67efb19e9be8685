//! The floating suggestion panel.
//!
//! [`MenuController`] holds what the host needs to draw the panel: its state,
//! the rendered entries or placeholder, the selected entry, the scroll offset
//! and where to put it. It never draws anything itself.
//!
//! # Selection
//!
//! The selected index is `None` when no entry can be selected (the panel
//! shows a placeholder, or every entry is disabled). Otherwise it always
//! points at an enabled entry. `up` and `down` wrap around and skip disabled
//! entries; with no selection they do nothing.

use std::ops::Range;

use horizon_mention_core::logging::targets;

use crate::config::TributeOptions;
use crate::error::{MentionError, MentionResult};
use crate::geometry::Size;
use crate::layout::TextMetrics;
use crate::surface::MenuCoordinates;
use crate::template::Content;

/// Horizontal padding inside an entry, on each side.
const ENTRY_PADDING: f32 = 8.0;

/// Border around the list.
const BORDER: f32 = 1.0;

/// Panel visibility and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    /// Not shown.
    #[default]
    Closed,
    /// Shown without entries: loading, no match, or waiting for the first render.
    OpenEmpty,
    /// Shown with entries.
    OpenListing,
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuEntry {
    /// Position in the filtered item list.
    pub index: usize,
    pub content: Content,
    pub disabled: bool,
}

/// Where the panel goes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Placement {
    #[default]
    Hidden,
    /// Shown at the host's default position.
    Unpositioned,
    /// Shown at fixed viewport coordinates.
    At(MenuCoordinates),
}

#[derive(Debug, Clone)]
struct ListContainer {
    container_class: String,
}

/// State of the suggestion panel.
#[derive(Debug, Clone)]
pub struct MenuController {
    container: Option<ListContainer>,
    state: MenuState,
    entries: Vec<MenuEntry>,
    placeholder: Option<Content>,
    selected: Option<usize>,
    scroll_top: f32,
    placement: Placement,
    item_class: String,
    select_class: String,
    item_height: f32,
    max_height: f32,
    max_width: f32,
    metrics: TextMetrics,
}

impl MenuController {
    pub fn new(options: &TributeOptions) -> Self {
        Self {
            container: None,
            state: MenuState::Closed,
            entries: Vec::new(),
            placeholder: None,
            selected: Some(0),
            scroll_top: 0.0,
            placement: Placement::Hidden,
            item_class: String::new(),
            select_class: String::new(),
            item_height: options.menu_item_height,
            max_height: options.menu_max_height,
            max_width: options.menu_max_width,
            metrics: TextMetrics::new(options.menu_font_size),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create the panel and its list container.
    pub fn create(&mut self, container_class: &str) {
        tracing::debug!(target: targets::MENU, container_class, "menu created");
        self.container = Some(ListContainer {
            container_class: container_class.to_string(),
        });
    }

    /// Remove the panel.
    pub fn destroy(&mut self) {
        self.deactivate();
        self.container = None;
    }

    pub fn is_created(&self) -> bool {
        self.container.is_some()
    }

    pub fn container_class(&self) -> Option<&str> {
        self.container.as_ref().map(|c| c.container_class.as_str())
    }

    /// Open the panel with the selection and scroll reset. Entries still
    /// shown from an earlier query keep their first enabled one selected.
    pub fn activate(&mut self) {
        self.selected = self.first_enabled();
        self.scroll_top = 0.0;
        if self.state == MenuState::Closed {
            self.state = MenuState::OpenEmpty;
        }
    }

    /// Close the panel. The selection goes back to the first entry.
    pub fn deactivate(&mut self) {
        self.state = MenuState::Closed;
        self.placement = Placement::Hidden;
        self.entries.clear();
        self.placeholder = None;
        self.selected = Some(0);
        self.scroll_top = 0.0;
    }

    /// Clear the selection.
    pub fn unselect(&mut self) {
        self.selected = None;
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != MenuState::Closed
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Set the classes applied to entries.
    pub fn set_classes(&mut self, item_class: &str, select_class: &str) {
        self.item_class = item_class.to_string();
        self.select_class = select_class.to_string();
    }

    /// Show `entries`, selecting the first enabled one.
    pub fn render_items(&mut self, entries: Vec<MenuEntry>) -> MentionResult<()> {
        if self.container.is_none() {
            return Err(MentionError::MissingListContainer);
        }
        self.entries = entries;
        self.selected = self.first_enabled();
        self.placeholder = None;
        self.state = MenuState::OpenListing;
        tracing::trace!(
            target: targets::MENU,
            count = self.entries.len(),
            selected = ?self.selected,
            "rendered entries"
        );
        Ok(())
    }

    /// Show a placeholder instead of entries. Nothing is selectable.
    pub fn render_placeholder(&mut self, content: Content) -> MentionResult<()> {
        if self.container.is_none() {
            return Err(MentionError::MissingListContainer);
        }
        self.entries.clear();
        self.placeholder = Some(content);
        self.selected = None;
        self.state = MenuState::OpenEmpty;
        Ok(())
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn placeholder(&self) -> Option<&Content> {
        self.placeholder.as_ref()
    }

    /// Classes for the entry at `index`.
    pub fn entry_classes(&self, index: usize) -> Vec<&str> {
        let mut classes = Vec::new();
        if !self.item_class.is_empty() {
            classes.push(self.item_class.as_str());
        }
        let enabled = self.entries.get(index).is_some_and(|e| !e.disabled);
        if enabled && self.selected == Some(index) {
            classes.push(self.select_class.as_str());
        }
        classes
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&MenuEntry> {
        self.selected.and_then(|i| self.entries.get(i))
    }

    /// Move the selection to the next enabled entry, wrapping to the top.
    pub fn down(&mut self) -> bool {
        let count = self.entries.len();
        let Some(mut index) = self.selected.filter(|_| count > 0) else {
            return false;
        };
        for _ in 0..count {
            index += 1;
            if index >= count {
                index = 0;
                self.scroll_top = 0.0;
            }
            if !self.entries[index].disabled {
                self.select(index);
                return true;
            }
        }
        false
    }

    /// Move the selection to the previous enabled entry, wrapping to the bottom.
    pub fn up(&mut self) -> bool {
        let count = self.entries.len();
        let Some(mut index) = self.selected.filter(|_| count > 0) else {
            return false;
        };
        for _ in 0..count {
            if index == 0 {
                index = count - 1;
                self.scroll_top = self.max_scroll();
            } else {
                index -= 1;
            }
            if !self.entries[index].disabled {
                self.select(index);
                return true;
            }
        }
        false
    }

    /// Select the entry under the pointer. Disabled entries are ignored.
    pub fn set_active(&mut self, index: usize) -> bool {
        match self.entries.get(index) {
            Some(entry) if !entry.disabled => {
                self.select(index);
                true
            }
            _ => false,
        }
    }

    fn first_enabled(&self) -> Option<usize> {
        self.entries.iter().position(|e| !e.disabled)
    }

    fn select(&mut self, index: usize) {
        self.selected = Some(index);
        let top = index as f32 * self.item_height;
        let bottom = top + self.item_height;
        let visible = self.visible_height();
        if bottom > self.scroll_top + visible {
            self.scroll_top = bottom - visible;
        } else if top < self.scroll_top {
            self.scroll_top = top;
        }
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    /// Entries currently inside the scrolled viewport of the list.
    pub fn visible_range(&self) -> Range<usize> {
        if self.entries.is_empty() || self.item_height <= 0.0 {
            return 0..0;
        }
        let first = (self.scroll_top / self.item_height).floor() as usize;
        let last = ((self.scroll_top + self.visible_height()) / self.item_height).ceil() as usize;
        first.min(self.entries.len())..last.min(self.entries.len())
    }

    fn rows(&self) -> usize {
        if self.placeholder.is_some() { 1 } else { self.entries.len() }
    }

    fn content_height(&self) -> f32 {
        self.rows() as f32 * self.item_height
    }

    fn height_cap(&self) -> f32 {
        match self.placement {
            Placement::At(coords) => self.max_height.min(coords.max_height),
            _ => self.max_height,
        }
    }

    fn visible_height(&self) -> f32 {
        self.content_height().min(self.height_cap())
    }

    fn max_scroll(&self) -> f32 {
        (self.content_height() - self.visible_height()).max(0.0)
    }

    /// Unobstructed panel size, used to decide placement.
    pub fn dimensions(&self) -> Size {
        let widest = self
            .entries
            .iter()
            .map(|e| &e.content)
            .chain(self.placeholder.as_ref())
            .map(|c| self.metrics.measure(&c.plain_text()))
            .fold(0.0_f32, f32::max);
        let width = (widest + 2.0 * (ENTRY_PADDING + BORDER)).min(self.max_width);
        let height = (self.content_height() + 2.0 * BORDER).min(self.max_height);
        Size::new(width, height)
    }

    pub fn position(&mut self, placement: Placement) {
        self.placement = placement;
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Edge;

    fn entry(index: usize, text: &str, disabled: bool) -> MenuEntry {
        MenuEntry {
            index,
            content: Content::text(text),
            disabled,
        }
    }

    fn menu() -> MenuController {
        let mut menu = MenuController::new(&TributeOptions::default());
        menu.create("tribute-container");
        menu.activate();
        menu
    }

    #[test]
    fn test_render_requires_container() {
        let mut menu = MenuController::new(&TributeOptions::default());
        let err = menu.render_items(vec![entry(0, "a", false)]).unwrap_err();
        assert!(matches!(err, MentionError::MissingListContainer));
        assert!(menu.render_placeholder(Content::text("x")).is_err());
    }

    #[test]
    fn test_render_selects_first_enabled() {
        let mut menu = menu();
        menu.render_items(vec![entry(0, "a", true), entry(1, "b", false)]).unwrap();
        assert_eq!(menu.state(), MenuState::OpenListing);
        assert_eq!(menu.selected_index(), Some(1));
    }

    #[test]
    fn test_down_cycles() {
        let mut menu = menu();
        let entries: Vec<_> = (0..4).map(|i| entry(i, "x", false)).collect();
        menu.render_items(entries).unwrap();
        for _ in 0..4 {
            assert!(menu.down());
        }
        assert_eq!(menu.selected_index(), Some(0));
    }

    #[test]
    fn test_navigation_skips_disabled() {
        let mut menu = menu();
        menu.render_items(vec![entry(0, "a", false), entry(1, "b", true), entry(2, "c", false)])
            .unwrap();
        menu.down();
        assert_eq!(menu.selected_index(), Some(2));
        menu.up();
        assert_eq!(menu.selected_index(), Some(0));
        menu.up();
        assert_eq!(menu.selected_index(), Some(2));
    }

    #[test]
    fn test_all_disabled_is_inert() {
        let mut menu = menu();
        menu.render_items(vec![entry(0, "a", true), entry(1, "b", true)]).unwrap();
        assert_eq!(menu.selected_index(), None);
        assert!(!menu.down());
        assert!(!menu.up());
        assert_eq!(menu.selected_index(), None);
    }

    #[test]
    fn test_reactivate_keeps_selection_off_disabled() {
        let mut menu = menu();
        menu.render_items(vec![entry(0, "ann", true), entry(1, "amy", false)]).unwrap();
        assert_eq!(menu.selected_index(), Some(1));
        menu.activate();
        assert_eq!(menu.selected_index(), Some(1));

        menu.render_items(vec![entry(0, "ann", true)]).unwrap();
        menu.activate();
        assert_eq!(menu.selected_index(), None);
    }

    #[test]
    fn test_hover_selection() {
        let mut menu = menu();
        menu.render_items(vec![entry(0, "a", false), entry(1, "b", true), entry(2, "c", false)])
            .unwrap();
        assert!(menu.set_active(2));
        assert!(!menu.set_active(1));
        assert!(!menu.set_active(9));
        assert_eq!(menu.selected_index(), Some(2));
    }

    #[test]
    fn test_entry_classes() {
        let mut menu = menu();
        menu.set_classes("item", "highlight");
        menu.render_items(vec![entry(0, "a", false), entry(1, "b", false)]).unwrap();
        assert_eq!(menu.entry_classes(0), vec!["item", "highlight"]);
        assert_eq!(menu.entry_classes(1), vec!["item"]);
    }

    #[test]
    fn test_placeholder_clears_selection() {
        let mut menu = menu();
        menu.render_placeholder(Content::text("No Match Found!")).unwrap();
        assert_eq!(menu.state(), MenuState::OpenEmpty);
        assert_eq!(menu.selected_index(), None);
        assert!(menu.selected_entry().is_none());
    }

    #[test]
    fn test_deactivate_resets() {
        let mut menu = menu();
        menu.render_items(vec![entry(0, "a", false), entry(1, "b", false)]).unwrap();
        menu.down();
        menu.deactivate();
        assert!(!menu.is_open());
        assert_eq!(menu.selected_index(), Some(0));
        assert!(menu.entries().is_empty());
        assert_eq!(menu.placement(), Placement::Hidden);
    }

    #[test]
    fn test_scrolls_selection_into_view() {
        let mut menu = menu();
        let entries: Vec<_> = (0..10).map(|i| entry(i, "x", false)).collect();
        menu.render_items(entries).unwrap();
        menu.position(Placement::At(MenuCoordinates {
            top: Edge::Px(0.0),
            right: Edge::Auto,
            bottom: Edge::Auto,
            left: Edge::Px(0.0),
            max_height: 72.0,
            max_width: 300.0,
        }));
        assert_eq!(menu.visible_range(), 0..3);

        for _ in 0..4 {
            menu.down();
        }
        assert_eq!(menu.selected_index(), Some(4));
        assert_eq!(menu.scroll_top(), 48.0);
        assert_eq!(menu.visible_range(), 2..5);

        // Wrapping up from the top jumps to the bottom.
        let mut menu2 = menu.clone();
        while menu2.selected_index() != Some(0) {
            menu2.up();
        }
        menu2.up();
        assert_eq!(menu2.selected_index(), Some(9));
        assert_eq!(menu2.scroll_top(), 240.0 - 72.0);
    }

    #[test]
    fn test_dimensions() {
        let mut menu = menu();
        menu.render_items(vec![entry(0, "abcd", false), entry(1, "ab", false)]).unwrap();
        let size = menu.dimensions();
        // 14px font at 0.6 advance: 4 chars = 33.6px, plus padding and border.
        assert!((size.width - (33.6 + 18.0)).abs() < 0.01);
        assert_eq!(size.height, 50.0);
    }
}
