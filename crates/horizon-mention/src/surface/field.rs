//! Flat text fields: single-line inputs and multi-line text areas.

use crate::geometry::Rect;

/// Inline base direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Which box the declared width and height refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoxSizing {
    #[default]
    ContentBox,
    BorderBox,
}

/// Overflow behavior along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Scroll,
    Auto,
}

/// Horizontal alignment of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextAlign {
    #[default]
    Start,
    End,
    Left,
    Right,
    Center,
}

/// Case transformation applied before layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
}

/// Font slant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// Widths of the four sides of a box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    /// The same width on every side.
    pub const fn uniform(width: f32) -> Self {
        Self {
            top: width,
            right: width,
            bottom: width,
            left: width,
        }
    }

    /// Sum of left and right.
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// Sum of top and bottom.
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// The computed style of a text field.
///
/// Holds every property that can change where text lands. The measuring
/// mirror copies all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStyle {
    pub direction: TextDirection,
    pub box_sizing: BoxSizing,
    /// Declared width; `None` uses the bounding rect.
    pub width: Option<f32>,
    /// Declared height; `None` uses the bounding rect.
    pub height: Option<f32>,
    pub overflow_x: Overflow,
    pub overflow_y: Overflow,
    pub border: Edges,
    pub padding: Edges,
    pub font_family: String,
    pub font_size: f32,
    pub font_style: FontStyle,
    pub font_weight: u16,
    /// Average advance as a fraction of the font size.
    pub font_advance_ratio: f32,
    /// `None` means 1.2 times the font size.
    pub line_height: Option<f32>,
    pub text_align: TextAlign,
    pub text_transform: TextTransform,
    pub text_indent: f32,
    pub letter_spacing: f32,
    pub word_spacing: f32,
    pub tab_size: usize,
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            direction: TextDirection::Ltr,
            box_sizing: BoxSizing::ContentBox,
            width: None,
            height: None,
            overflow_x: Overflow::Visible,
            overflow_y: Overflow::Visible,
            border: Edges::uniform(1.0),
            padding: Edges::uniform(2.0),
            font_family: "sans-serif".to_string(),
            font_size: 14.0,
            font_style: FontStyle::Normal,
            font_weight: 400,
            font_advance_ratio: 0.6,
            line_height: None,
            text_align: TextAlign::Start,
            text_transform: TextTransform::None,
            text_indent: 0.0,
            letter_spacing: 0.0,
            word_spacing: 0.0,
            tab_size: 8,
        }
    }
}

/// A plain text field addressed by byte offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct TextField {
    value: String,
    selection_start: usize,
    selection_end: usize,
    style: FieldStyle,
    bounds: Option<Rect>,
    scroll_top: f32,
    scroll_left: f32,
}

impl TextField {
    /// Create a field with the cursor at the end of `value`.
    ///
    /// The field starts detached: it has no on-screen bounds until
    /// [`set_bounds`](Self::set_bounds) is called.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let end = value.len();
        Self {
            value,
            selection_start: end,
            selection_end: end,
            style: FieldStyle::default(),
            bounds: None,
            scroll_top: 0.0,
            scroll_left: 0.0,
        }
    }

    /// Builder method to set the style.
    pub fn with_style(mut self, style: FieldStyle) -> Self {
        self.style = style;
        self
    }

    /// Builder method to attach the field at `bounds`.
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value and put the cursor at the end.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.selection_start = self.value.len();
        self.selection_end = self.value.len();
    }

    /// The cursor (selection start).
    pub fn cursor(&self) -> usize {
        self.selection_start
    }

    /// Collapse the selection at `offset`, snapped back to a char boundary.
    pub fn set_cursor(&mut self, offset: usize) {
        let offset = self.snap(offset);
        self.selection_start = offset;
        self.selection_end = offset;
    }

    /// Selection as `(start, end)`.
    pub fn selection(&self) -> (usize, usize) {
        (self.selection_start, self.selection_end)
    }

    /// Select a range; the ends are ordered and snapped to char boundaries.
    pub fn set_selection(&mut self, start: usize, end: usize) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.selection_start = self.snap(start);
        self.selection_end = self.snap(end);
    }

    /// Replace the selection with `text`, leaving the cursor after it.
    pub fn insert_text(&mut self, text: &str) {
        let (start, end) = self.selection();
        self.value.replace_range(start..end, text);
        self.set_cursor(start + text.len());
    }

    /// Delete the selection, or the character before the cursor.
    pub fn backspace(&mut self) {
        let (start, end) = self.selection();
        if start != end {
            self.value.replace_range(start..end, "");
            self.set_cursor(start);
        } else if let Some(prev) = self.value[..start].chars().next_back() {
            let from = start - prev.len_utf8();
            self.value.replace_range(from..start, "");
            self.set_cursor(from);
        }
    }

    pub fn style(&self) -> &FieldStyle {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut FieldStyle {
        &mut self.style
    }

    /// On-screen border box; `None` while detached.
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// Attach at `bounds`, or detach with `None`.
    pub fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
    }

    /// Scroll offsets as `(top, left)`.
    pub fn scroll(&self) -> (f32, f32) {
        (self.scroll_top, self.scroll_left)
    }

    pub fn set_scroll(&mut self, top: f32, left: f32) {
        self.scroll_top = top;
        self.scroll_left = left;
    }

    fn snap(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.value.len());
        while !self.value.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_field_cursor_at_end() {
        let field = TextField::new("Hello");
        assert_eq!(field.cursor(), 5);
        assert!(field.bounds().is_none());
    }

    #[test]
    fn test_insert_and_backspace() {
        let mut field = TextField::new("Hi ");
        field.insert_text("@jo");
        assert_eq!(field.value(), "Hi @jo");
        assert_eq!(field.cursor(), 6);

        field.backspace();
        assert_eq!(field.value(), "Hi @j");

        field.set_selection(5, 3);
        field.backspace();
        assert_eq!(field.value(), "Hi ");
        assert_eq!(field.cursor(), 3);
    }

    #[test]
    fn test_cursor_snaps_to_char_boundary() {
        let mut field = TextField::new("h\u{e9}llo");
        field.set_cursor(2);
        assert_eq!(field.cursor(), 1);
        field.set_cursor(100);
        assert_eq!(field.cursor(), field.value().len());
    }

    #[test]
    fn test_backspace_multibyte() {
        let mut field = TextField::new("caf\u{e9}");
        field.backspace();
        assert_eq!(field.value(), "caf");
    }
}
