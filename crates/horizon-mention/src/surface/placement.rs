//! Menu placement relative to a caret rectangle.
//!
//! The panel is positioned with fixed (viewport) coordinates. On each axis it
//! opens toward the side with room for it, flipping when the preferred side is
//! too small and the other side is larger or big enough. The chosen side's
//! free space always becomes the panel's size cap.

use crate::geometry::{Rect, Size, Viewport};

/// Distance kept between a scrolled-to menu and the viewport edge.
pub const SCROLL_BUFFER: f32 = 20.0;

/// Largest scroll adjustment made to reveal the menu.
pub const MAX_SCROLL_DISPLACEMENT: f32 = 100.0;

/// One edge offset of a fixed-position box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Edge {
    #[default]
    Auto,
    Px(f32),
}

impl Edge {
    pub fn px(self) -> Option<f32> {
        match self {
            Self::Px(v) => Some(v),
            Self::Auto => None,
        }
    }
}

/// Fixed-position coordinates for the menu panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuCoordinates {
    pub top: Edge,
    pub right: Edge,
    pub bottom: Edge,
    pub left: Edge,
    pub max_height: f32,
    pub max_width: f32,
}

impl MenuCoordinates {
    /// Whether the panel opens above the anchor.
    pub fn is_flipped_up(&self) -> bool {
        matches!(self.top, Edge::Auto)
    }

    /// Whether the panel opens left of the anchor.
    pub fn is_flipped_left(&self) -> bool {
        matches!(self.left, Edge::Auto)
    }

    /// Viewport rect the panel occupies at `size`, after applying the caps.
    pub fn resolve(&self, size: Size, viewport: &Viewport) -> Rect {
        let width = size.width.min(self.max_width);
        let height = size.height.min(self.max_height);
        let left = match (self.left, self.right) {
            (Edge::Px(left), _) => left,
            (Edge::Auto, Edge::Px(right)) => viewport.width - right - width,
            (Edge::Auto, Edge::Auto) => 0.0,
        };
        let top = match (self.top, self.bottom) {
            (Edge::Px(top), _) => top,
            (Edge::Auto, Edge::Px(bottom)) => viewport.height - bottom - height,
            (Edge::Auto, Edge::Auto) => 0.0,
        };
        Rect::new(left, top, width, height)
    }
}

/// Place a panel of `menu` size against `anchor`.
pub fn coordinates_relative_to_rect(anchor: Rect, menu: Size, viewport: &Viewport) -> MenuCoordinates {
    let space_above = anchor.top();
    let space_below = viewport.height - anchor.bottom();
    let (top, bottom, max_height) =
        if space_below < menu.height && (space_above >= menu.height || space_above > space_below) {
            (Edge::Auto, Edge::Px(viewport.height - anchor.top()), space_above)
        } else {
            (Edge::Px(anchor.bottom()), Edge::Auto, space_below)
        };

    let space_left = anchor.left();
    let space_right = viewport.width - anchor.left();
    let (left, right, max_width) =
        if space_right < menu.width && (space_left >= menu.width || space_left > space_right) {
            (Edge::Auto, Edge::Px(viewport.width - anchor.left()), space_left)
        } else {
            (Edge::Px(anchor.left()), Edge::Auto, space_right)
        };

    MenuCoordinates {
        top,
        right,
        bottom,
        left,
        max_height,
        max_width,
    }
}

/// Page scroll position that brings `menu` into view, if it is not.
pub fn scroll_target(menu: Rect, viewport: &Viewport) -> Option<f32> {
    let page_y = viewport.scroll_y;
    if menu.top() < 0.0 {
        return Some(page_y + menu.top() - SCROLL_BUFFER);
    }
    if menu.bottom() > viewport.height {
        let max_y = (page_y + menu.top() - SCROLL_BUFFER).min(page_y + MAX_SCROLL_DISPLACEMENT);
        let target = page_y - (viewport.height - menu.bottom());
        return Some(target.min(max_y));
    }
    None
}
