//! Caret measurement for flat text fields.
//!
//! Flat fields only expose a linear cursor offset. To find where an offset
//! lands on screen, a [`MeasuringMirror`] copies the field's style and text,
//! places a zero-width marker at the offset, lays the copy out over the
//! field's bounds and reads the marker's box. The mirror is discarded after a
//! single measurement.

use horizon_mention_core::logging::span_names;

use crate::geometry::{Point, Rect};
use crate::layout::{FlowLayout, TextMetrics, WrapMode, ZERO_WIDTH_MARKER};

use super::field::{BoxSizing, FieldStyle, TextAlign, TextDirection, TextField, TextTransform};

/// Off-screen copy of a text field used for one measurement.
#[derive(Debug, Clone)]
pub struct MeasuringMirror {
    style: FieldStyle,
    content: String,
    marker_at: usize,
    content_origin: Point,
    content_width: f32,
    wrap: WrapMode,
    scroll: (f32, f32),
}

impl MeasuringMirror {
    /// Mirror `field` with a marker at byte `position`.
    ///
    /// Returns `None` when the field is detached. Single-line fields fold all
    /// whitespace to spaces and never wrap.
    pub fn new(field: &TextField, position: usize, multiline: bool) -> Option<Self> {
        let bounds = field.bounds()?;
        let style = field.style().clone();
        let value = field.value();
        let mut position = position.min(value.len());
        while !value.is_char_boundary(position) {
            position -= 1;
        }

        let prepare = |text: &str| -> String {
            let text = match style.text_transform {
                TextTransform::None => text.to_string(),
                TextTransform::Uppercase => text.to_uppercase(),
                TextTransform::Lowercase => text.to_lowercase(),
            };
            if multiline {
                text
            } else {
                text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }).collect()
            }
        };

        let before = prepare(&value[..position]);
        let after = prepare(&value[position..]);
        let marker_at = before.len();
        let content = format!("{before}{ZERO_WIDTH_MARKER}{after}");

        let chrome = style.border.horizontal() + style.padding.horizontal();
        let content_width = match (style.width, style.box_sizing) {
            (Some(width), BoxSizing::BorderBox) => width - chrome,
            (Some(width), BoxSizing::ContentBox) => width,
            (None, _) => bounds.width() - chrome,
        }
        .max(0.0);

        let content_origin = Point::new(
            bounds.left() + style.border.left + style.padding.left,
            bounds.top() + style.border.top + style.padding.top,
        );

        Some(Self {
            style,
            content,
            marker_at,
            content_origin,
            content_width,
            wrap: if multiline { WrapMode::Word } else { WrapMode::None },
            scroll: field.scroll(),
        })
    }

    /// Text metrics derived from the mirrored style.
    pub fn metrics(&self) -> TextMetrics {
        TextMetrics {
            font_size: self.style.font_size,
            advance_ratio: self.style.font_advance_ratio,
            line_height: self.style.line_height.unwrap_or(self.style.font_size * 1.2),
            letter_spacing: self.style.letter_spacing,
            word_spacing: self.style.word_spacing,
            tab_size: self.style.tab_size,
        }
    }

    /// Mirrored text, marker included.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Viewport rect of the marker.
    pub fn measure(&self) -> Rect {
        let _span = tracing::trace_span!(span_names::MEASURE, marker_at = self.marker_at).entered();
        let metrics = self.metrics();
        let layout = FlowLayout::new(
            &self.content,
            &metrics,
            self.wrap,
            Some(self.content_width),
            self.style.text_indent,
        );

        let caret = layout.caret_position(self.marker_at);
        let line_width = layout
            .lines()
            .get(layout.line_at(self.marker_at))
            .map(|line| line.width)
            .unwrap_or(0.0);

        let rtl = self.style.direction == TextDirection::Rtl;
        let align = match (self.style.text_align, rtl) {
            (TextAlign::Start, false) | (TextAlign::End, true) => TextAlign::Left,
            (TextAlign::Start, true) | (TextAlign::End, false) => TextAlign::Right,
            (other, _) => other,
        };
        let slack = (self.content_width - line_width).max(0.0);
        let line_offset = match align {
            TextAlign::Right => slack,
            TextAlign::Center => slack / 2.0,
            _ => 0.0,
        };
        let x = if rtl { line_offset + (line_width - caret.x) } else { line_offset + caret.x };

        let (scroll_top, scroll_left) = self.scroll;
        Rect::new(
            self.content_origin.x + x - scroll_left,
            self.content_origin.y + caret.y - scroll_top,
            0.0,
            metrics.line_height,
        )
    }
}

/// Viewport rect of the caret at byte `position`, or `None` when detached.
pub fn caret_rect(field: &TextField, position: usize, multiline: bool) -> Option<Rect> {
    let mirror = MeasuringMirror::new(field, position, multiline)?;
    Some(mirror.measure())
}
