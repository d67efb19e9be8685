//! Adapter for flat text fields.

use horizon_mention_core::logging::{span_names, targets};

use crate::geometry::Rect;
use crate::template::Content;
use crate::trigger::TriggerInfo;

use super::{HostSurface, SelectionAnchor, SurfaceAdapter, mirror};

/// Suffix appended after a replacement in a flat field.
pub const DEFAULT_FLAT_SUFFIX: &str = " ";

/// Drives single-line inputs and multi-line text areas.
#[derive(Debug, Clone, Default)]
pub struct FlatBufferAdapter {
    suffix: Option<String>,
    autocomplete_mode: bool,
}

impl FlatBufferAdapter {
    pub fn new(suffix: Option<String>, autocomplete_mode: bool) -> Self {
        Self {
            suffix,
            autocomplete_mode,
        }
    }

    fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or(DEFAULT_FLAT_SUFFIX)
    }
}

impl SurfaceAdapter for FlatBufferAdapter {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn text_preceding_cursor(&self, surface: &HostSurface) -> Option<String> {
        let field = surface.as_field()?;
        if field.value().is_empty() {
            return None;
        }
        Some(field.value()[..field.cursor()].to_string())
    }

    fn selection_anchor(&self, surface: &HostSurface) -> Option<SelectionAnchor> {
        let field = surface.as_field()?;
        Some(SelectionAnchor {
            host: None,
            path: Vec::new(),
            offset: field.cursor(),
        })
    }

    fn caret_rect(&self, surface: &HostSurface, position: usize) -> Option<Rect> {
        let multiline = matches!(surface, HostSurface::TextArea(_));
        let rect = mirror::caret_rect(surface.as_field()?, position, multiline);
        if rect.is_none() {
            tracing::debug!(target: targets::SURFACE, "caret geometry unavailable for detached field");
        }
        rect
    }

    fn replace_range(&self, surface: &mut HostSurface, info: &TriggerInfo, content: &Content) -> bool {
        let Some(field) = surface.as_field_mut() else {
            return false;
        };
        let _span = tracing::debug_span!(span_names::REPLACE, surface = "flat").entered();

        let suffix = self.suffix();
        let inserted = format!("{}{}", content.plain_text(), suffix);
        let value = field.value();

        let start = info.mention_position.min(value.len());
        if !value.is_char_boundary(start) {
            return false;
        }
        let mut end = start + info.mention_text.len();
        if !self.autocomplete_mode {
            end += info.trigger_len();
        }
        let end = end.min(value.len());
        if !value.is_char_boundary(end) {
            return false;
        }
        // A suffix longer than one character also swallows what follows the query.
        let swallow = suffix.chars().count().max(1) - 1;
        let end = value[end..]
            .char_indices()
            .nth(swallow)
            .map(|(i, _)| end + i)
            .unwrap_or(value.len());

        let updated = format!("{}{}{}", &value[..start], inserted, &value[end..]);
        field.set_value(updated);
        field.set_cursor(start + inserted.len());

        tracing::debug!(
            target: targets::SURFACE,
            start,
            end,
            inserted = %inserted,
            "flat buffer replaced"
        );
        true
    }

    fn insert_at_cursor(&self, surface: &mut HostSurface, text: &str) -> bool {
        match surface.as_field_mut() {
            Some(field) => {
                field.insert_text(text);
                true
            }
            None => false,
        }
    }

    fn count_mentions(&self, surface: &HostSurface, trigger: &str, composing: Option<usize>) -> usize {
        let Some(field) = surface.as_field() else {
            return 0;
        };
        if trigger.is_empty() {
            return 0;
        }
        let value = field.value();
        value
            .match_indices(trigger)
            .filter(|&(i, _)| Some(i) != composing)
            .filter(|&(i, _)| i == 0 || value[..i].chars().next_back().is_some_and(char::is_whitespace))
            .filter(|&(i, _)| {
                value[i + trigger.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| !c.is_whitespace())
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::TextField;

    fn info(position: usize, text: &str, trigger: &str) -> TriggerInfo {
        TriggerInfo {
            mention_position: position,
            mention_text: text.to_string(),
            trigger_char: trigger.to_string(),
            anchor: None,
        }
    }

    #[test]
    fn test_text_preceding_cursor() {
        let adapter = FlatBufferAdapter::default();
        let mut field = TextField::new("Hello @jo there");
        field.set_cursor(9);
        let surface = HostSurface::Input(field);
        assert_eq!(adapter.text_preceding_cursor(&surface).as_deref(), Some("Hello @jo"));
        assert_eq!(adapter.selection_anchor(&surface).unwrap().offset, 9);

        let empty = HostSurface::Input(TextField::new(""));
        assert!(adapter.text_preceding_cursor(&empty).is_none());
    }

    #[test]
    fn test_replace_with_default_suffix() {
        let adapter = FlatBufferAdapter::default();
        let mut surface = HostSurface::TextArea(TextField::new("Hello @jo"));
        assert!(adapter.replace_range(&mut surface, &info(6, "jo", "@"), &Content::text("@john")));

        let field = surface.as_field().unwrap();
        assert_eq!(field.value(), "Hello @john ");
        assert_eq!(field.cursor(), 12);
        assert!(adapter.text_preceding_cursor(&surface).unwrap().ends_with("@john "));
    }

    #[test]
    fn test_replace_keeps_text_after_cursor() {
        let adapter = FlatBufferAdapter::default();
        let mut field = TextField::new("Hi @jo, bye");
        field.set_cursor(6);
        let mut surface = HostSurface::Input(field);
        adapter.replace_range(&mut surface, &info(3, "jo", "@"), &Content::text("@joe"));
        assert_eq!(surface.as_field().unwrap().value(), "Hi @joe , bye");
    }

    #[test]
    fn test_replace_with_custom_suffix() {
        let adapter = FlatBufferAdapter::new(Some(", ".to_string()), false);
        let mut surface = HostSurface::Input(TextField::new("cc @an x"));
        adapter.replace_range(&mut surface, &info(3, "an", "@"), &Content::text("@ann"));
        // The two-character suffix also takes the space after the query.
        assert_eq!(surface.as_field().unwrap().value(), "cc @ann, x");
    }

    #[test]
    fn test_replace_autocomplete() {
        let adapter = FlatBufferAdapter::new(None, true);
        let mut surface = HostSurface::Input(TextField::new("hello wor"));
        adapter.replace_range(&mut surface, &info(6, "wor", ""), &Content::text("world"));
        assert_eq!(surface.as_field().unwrap().value(), "hello world ");
    }

    #[test]
    fn test_insert_at_cursor() {
        let adapter = FlatBufferAdapter::default();
        let mut surface = HostSurface::Input(TextField::new("Hi "));
        assert!(adapter.insert_at_cursor(&mut surface, "@"));
        assert_eq!(adapter.text_preceding_cursor(&surface).as_deref(), Some("Hi @"));
    }

    #[test]
    fn test_count_mentions() {
        let adapter = FlatBufferAdapter::default();
        let surface = HostSurface::Input(TextField::new("@ann and @bo mail@x.org @ and @jo"));
        assert_eq!(adapter.count_mentions(&surface, "@", None), 3);
        assert_eq!(adapter.count_mentions(&surface, "@", Some(30)), 2);
        assert_eq!(adapter.count_mentions(&surface, "#", None), 0);
    }

    #[test]
    fn test_wrong_surface_kind() {
        let adapter = FlatBufferAdapter::default();
        let mut surface = HostSurface::Rich(crate::surface::DocumentTree::new());
        assert!(adapter.text_preceding_cursor(&surface).is_none());
        assert!(!adapter.replace_range(&mut surface, &info(0, "", "@"), &Content::text("x")));
    }
}
