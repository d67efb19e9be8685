//! Approximate text layout used for caret and menu geometry.
//!
//! The engine never rasterizes text; it only needs to know where a caret or a
//! marker would land. [`FlowLayout`] places one box per grapheme cluster using
//! fixed advance metrics, breaking lines at hard newlines and, when wrapping is
//! enabled, at word boundaries (falling back to breaking inside a word that is
//! wider than the line).

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use crate::geometry::{Point, Rect};

/// Zero-width marker inserted into mirrored text to locate a caret.
pub const ZERO_WIDTH_MARKER: &str = "\u{200B}";

/// How text is broken across lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// Only hard newlines break lines.
    #[default]
    None,
    /// Break at word boundaries, or inside a word that cannot fit.
    Word,
}

/// Font metrics driving the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMetrics {
    /// Font size in pixels.
    pub font_size: f32,
    /// Average glyph advance as a fraction of the font size.
    pub advance_ratio: f32,
    /// Height of one line in pixels.
    pub line_height: f32,
    /// Extra space after every grapheme.
    pub letter_spacing: f32,
    /// Extra space after every space character.
    pub word_spacing: f32,
    /// Width of a tab, in spaces.
    pub tab_size: usize,
}

impl TextMetrics {
    /// Metrics for the given font size with a 1.2 line height.
    pub fn new(font_size: f32) -> Self {
        Self {
            font_size,
            advance_ratio: 0.6,
            line_height: font_size * 1.2,
            letter_spacing: 0.0,
            word_spacing: 0.0,
            tab_size: 8,
        }
    }

    /// Builder method to set the line height.
    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height;
        self
    }

    /// Builder method to set the advance ratio.
    pub fn with_advance_ratio(mut self, ratio: f32) -> Self {
        self.advance_ratio = ratio;
        self
    }

    /// Builder method to set letter and word spacing.
    pub fn with_spacing(mut self, letter_spacing: f32, word_spacing: f32) -> Self {
        self.letter_spacing = letter_spacing;
        self.word_spacing = word_spacing;
        self
    }

    /// Horizontal advance of a single grapheme cluster.
    pub fn advance(&self, grapheme: &str) -> f32 {
        let base = self.font_size * self.advance_ratio;
        match grapheme {
            ZERO_WIDTH_MARKER | "\n" | "\r\n" | "\r" => 0.0,
            "\t" => (base + self.letter_spacing + self.word_spacing) * self.tab_size as f32,
            " " | "\u{A0}" => base + self.letter_spacing + self.word_spacing,
            _ => base + self.letter_spacing,
        }
    }

    /// Width of a string laid out on one line.
    pub fn measure(&self, text: &str) -> f32 {
        text.graphemes(true).map(|g| self.advance(g)).sum()
    }
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self::new(14.0)
    }
}

/// Position of one grapheme cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBox {
    /// Byte range of the cluster in the source text.
    pub range: Range<usize>,
    /// Box relative to the layout origin.
    pub rect: Rect,
    /// Line index.
    pub line: usize,
}

/// One laid-out line.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    /// Byte range covered by the line.
    pub range: Range<usize>,
    /// Advance width of the line content.
    pub width: f32,
    /// Top edge relative to the layout origin.
    pub top: f32,
}

/// Result of laying out a string.
#[derive(Debug, Clone)]
pub struct FlowLayout {
    glyphs: Vec<GlyphBox>,
    lines: Vec<LayoutLine>,
    line_height: f32,
    end: Point,
}

impl FlowLayout {
    /// Lay out `text`.
    ///
    /// `max_width` only matters with [`WrapMode::Word`]. `first_line_indent`
    /// shifts the first line, as a text indent would.
    pub fn new(
        text: &str,
        metrics: &TextMetrics,
        wrap: WrapMode,
        max_width: Option<f32>,
        first_line_indent: f32,
    ) -> Self {
        let mut builder = LineBuilder {
            glyphs: Vec::new(),
            lines: Vec::new(),
            line_height: metrics.line_height,
            line_start: 0,
            line_start_x: first_line_indent,
            x: first_line_indent,
            line: 0,
        };
        let limit = match wrap {
            WrapMode::Word => max_width,
            WrapMode::None => None,
        };

        let segments = segments(text);
        for (i, &(seg_start, segment)) in segments.iter().enumerate() {
            if matches!(segment, "\n" | "\r\n" | "\r") {
                builder.push(seg_start..seg_start + segment.len(), 0.0);
                builder.break_line(seg_start + segment.len());
                continue;
            }

            let is_marker = segment == ZERO_WIDTH_MARKER;
            let is_space = !is_marker && segment.chars().all(char::is_whitespace);
            // A marker wraps together with the word that follows it.
            let break_width = if is_marker {
                segments
                    .get(i + 1)
                    .filter(|(_, next)| !next.chars().all(char::is_whitespace))
                    .map(|(_, next)| metrics.measure(next))
                    .unwrap_or(0.0)
            } else {
                metrics.measure(segment)
            };
            if let Some(limit) = limit
                && !is_space
                && builder.x > builder.line_start_x
                && builder.x + break_width > limit
            {
                builder.break_line(seg_start);
            }

            for (offset, grapheme) in segment.grapheme_indices(true) {
                let start = seg_start + offset;
                let width = metrics.advance(grapheme);
                if let Some(limit) = limit
                    && !is_space
                    && builder.x > builder.line_start_x
                    && builder.x + width > limit
                {
                    builder.break_line(start);
                }
                builder.push(start..start + grapheme.len(), width);
            }
        }

        builder.finish(text.len())
    }

    /// All glyph boxes in source order.
    pub fn glyphs(&self) -> &[GlyphBox] {
        &self.glyphs
    }

    /// All lines in order.
    pub fn lines(&self) -> &[LayoutLine] {
        &self.lines
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Width of the widest line.
    pub fn width(&self) -> f32 {
        self.lines.iter().map(|l| l.width).fold(0.0, f32::max)
    }

    /// Total height.
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    /// Line index that holds the caret at `offset`.
    pub fn line_at(&self, offset: usize) -> usize {
        self.glyphs
            .iter()
            .find(|g| g.range.start >= offset)
            .map(|g| g.line)
            .unwrap_or(self.lines.len().saturating_sub(1))
    }

    /// Top-left of a caret placed before byte `offset`.
    pub fn caret_position(&self, offset: usize) -> Point {
        self.glyphs
            .iter()
            .find(|g| g.range.start >= offset)
            .map(|g| g.rect.origin)
            .unwrap_or(self.end)
    }

    /// Zero-width caret box before byte `offset`.
    pub fn caret_rect(&self, offset: usize) -> Rect {
        let origin = self.caret_position(offset);
        Rect::new(origin.x, origin.y, 0.0, self.line_height)
    }
}

/// Word-boundary segments, with every marker split out on its own.
fn segments(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    for (start, segment) in text.split_word_bound_indices() {
        let mut rest_start = start;
        let mut rest = segment;
        while let Some(i) = rest.find(ZERO_WIDTH_MARKER) {
            if i > 0 {
                out.push((rest_start, &rest[..i]));
            }
            let end = i + ZERO_WIDTH_MARKER.len();
            out.push((rest_start + i, &rest[i..end]));
            rest_start += end;
            rest = &rest[end..];
        }
        if !rest.is_empty() {
            out.push((rest_start, rest));
        }
    }
    out
}

struct LineBuilder {
    glyphs: Vec<GlyphBox>,
    lines: Vec<LayoutLine>,
    line_height: f32,
    line_start: usize,
    line_start_x: f32,
    x: f32,
    line: usize,
}

impl LineBuilder {
    fn top(&self) -> f32 {
        self.line as f32 * self.line_height
    }

    fn push(&mut self, range: Range<usize>, width: f32) {
        self.glyphs.push(GlyphBox {
            range,
            rect: Rect::new(self.x, self.top(), width, self.line_height),
            line: self.line,
        });
        self.x += width;
    }

    fn break_line(&mut self, at: usize) {
        self.lines.push(LayoutLine {
            range: self.line_start..at,
            width: self.x,
            top: self.top(),
        });
        self.line += 1;
        self.line_start = at;
        self.line_start_x = 0.0;
        self.x = 0.0;
    }

    fn finish(mut self, text_len: usize) -> FlowLayout {
        let end = Point::new(self.x, self.top());
        self.lines.push(LayoutLine {
            range: self.line_start..text_len,
            width: self.x,
            top: self.top(),
        });
        FlowLayout {
            glyphs: self.glyphs,
            lines: self.lines,
            line_height: self.line_height,
            end,
        }
    }
}
