//! Trigger detection.
//!
//! A [`TriggerParser`] looks at the text immediately before the cursor and
//! decides whether a mention is being composed. Two parsers exist:
//!
//! - [`StandardTriggerParser`] scans for every registered trigger and picks
//!   the most recently typed one.
//! - [`AutocompleteTriggerParser`] has no trigger at all; the last word before
//!   the cursor is always the query.
//!
//! All offsets are byte offsets into the preceding text.

use std::fmt;

use regex::Regex;

use horizon_mention_core::logging::targets;

use crate::error::{MentionError, MentionResult};
use crate::surface::SelectionAnchor;

/// Separator used by autocomplete mode when none is configured.
pub const DEFAULT_AUTOCOMPLETE_SEPARATOR: &str = r"\s+";

/// A mention found in the text before the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerInfo {
    /// Offset where the trigger starts (or the query, in autocomplete mode).
    pub mention_position: usize,
    /// The live query.
    pub mention_text: String,
    /// The trigger text actually matched; empty in autocomplete mode.
    pub trigger_char: String,
    /// Where the cursor was, for structured surfaces.
    pub anchor: Option<SelectionAnchor>,
}

impl TriggerInfo {
    /// Byte length of the matched trigger.
    pub fn trigger_len(&self) -> usize {
        self.trigger_char.len()
    }
}

/// Inputs to one detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectRequest {
    /// An open menu keeps refining queries that contain whitespace.
    pub menu_already_active: bool,
    /// The previous pass saw trailing whitespace; trim the query first.
    pub has_trailing_space: bool,
    /// Fallback leading-space rule for triggers that do not set their own.
    pub require_leading_space: bool,
    /// Plain spaces do not end a query.
    pub allow_spaces: bool,
}

impl Default for DetectRequest {
    fn default() -> Self {
        Self {
            menu_already_active: false,
            has_trailing_space: false,
            require_leading_space: true,
            allow_spaces: false,
        }
    }
}

/// Result of a detection pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detection {
    /// The mention, if one is being composed.
    pub info: Option<TriggerInfo>,
    /// New value for the trailing-space flag; `None` leaves it unchanged.
    pub has_trailing_space: Option<bool>,
}

/// A registered trigger as seen by the standard parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    pub trigger: String,
    pub require_leading_space: bool,
}

impl TriggerSpec {
    pub fn new(trigger: impl Into<String>, require_leading_space: bool) -> Self {
        Self {
            trigger: trigger.into(),
            require_leading_space,
        }
    }
}

/// Decides whether a mention is being composed.
pub trait TriggerParser: Send + Sync + fmt::Debug {
    /// Inspect the text preceding the cursor.
    fn detect(&self, preceding: &str, anchor: Option<SelectionAnchor>, request: DetectRequest) -> Detection;

    /// The trigger a typed character starts, if any.
    fn resolve_trigger_for_key(&self, key: char) -> Option<String>;

    /// Whether this parser runs in autocomplete mode.
    fn is_autocomplete(&self) -> bool {
        false
    }
}

/// Multi-trigger parser.
#[derive(Debug, Clone)]
pub struct StandardTriggerParser {
    triggers: Vec<TriggerSpec>,
}

impl StandardTriggerParser {
    /// Create a parser for the given triggers, in registration order.
    pub fn new(triggers: Vec<TriggerSpec>) -> Self {
        Self { triggers }
    }

    /// Registered triggers.
    pub fn triggers(&self) -> &[TriggerSpec] {
        &self.triggers
    }

    /// Rightmost occurrence of `trigger` that starts the text or follows whitespace.
    fn last_index_with_leading_space(text: &str, trigger: &str) -> Option<usize> {
        text.char_indices().rev().map(|(i, _)| i).find(|&i| {
            text[i..].starts_with(trigger)
                && (i == 0 || text[..i].chars().next_back().is_some_and(char::is_whitespace))
        })
    }

    fn locate(&self, text: &str) -> Option<(usize, &TriggerSpec)> {
        let mut best: Option<(usize, &TriggerSpec)> = None;
        for spec in &self.triggers {
            if spec.trigger.is_empty() {
                continue;
            }
            let index = if spec.require_leading_space {
                Self::last_index_with_leading_space(text, &spec.trigger)
            } else {
                text.rfind(spec.trigger.as_str())
            };
            // Strictly greater keeps the first registered trigger on ties.
            if let Some(index) = index
                && best.is_none_or(|(b, _)| index > b)
            {
                best = Some((index, spec));
            }
        }
        best
    }

    fn is_disqualifying(c: char, allow_spaces: bool) -> bool {
        if allow_spaces {
            c.is_whitespace() && c != ' '
        } else {
            c.is_whitespace()
        }
    }
}

impl TriggerParser for StandardTriggerParser {
    fn detect(&self, preceding: &str, anchor: Option<SelectionAnchor>, request: DetectRequest) -> Detection {
        let Some((position, spec)) = self.locate(preceding) else {
            return Detection::default();
        };

        let leading_ok = position == 0
            || !spec.require_leading_space
            || preceding[..position].chars().next_back().is_some_and(char::is_whitespace);
        if !leading_ok {
            return Detection::default();
        }

        let trigger_end = position + spec.trigger.len();
        let trigger_char = preceding[position..trigger_end].to_string();
        let mut snippet = &preceding[trigger_end..];
        let leading_space = matches!(snippet.chars().next(), Some(' ' | '\u{A0}'));
        if request.has_trailing_space {
            snippet = snippet.trim();
        }

        let trailing = snippet.chars().any(|c| Self::is_disqualifying(c, request.allow_spaces));
        let info = if !leading_space && (request.menu_already_active || !trailing) {
            tracing::trace!(
                target: targets::TRIGGER,
                position,
                trigger = %trigger_char,
                query = %snippet,
                "mention detected"
            );
            Some(TriggerInfo {
                mention_position: position,
                mention_text: snippet.to_string(),
                trigger_char,
                anchor,
            })
        } else {
            None
        };

        Detection {
            info,
            has_trailing_space: Some(trailing),
        }
    }

    fn resolve_trigger_for_key(&self, key: char) -> Option<String> {
        self.triggers
            .iter()
            .find(|spec| spec.trigger.starts_with(key))
            .map(|spec| spec.trigger.clone())
    }
}

/// Last-word parser used in autocomplete mode.
#[derive(Debug, Clone)]
pub struct AutocompleteTriggerParser {
    separator: Regex,
}

impl AutocompleteTriggerParser {
    /// Create a parser splitting words on `separator` (a regular expression).
    pub fn new(separator: Option<&str>) -> MentionResult<Self> {
        let pattern = separator.unwrap_or(DEFAULT_AUTOCOMPLETE_SEPARATOR);
        let separator = Regex::new(pattern).map_err(|source| MentionError::InvalidSeparator {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { separator })
    }

    /// Separator pattern.
    pub fn separator(&self) -> &str {
        self.separator.as_str()
    }

    fn last_word(&self, text: &str) -> (usize, usize) {
        let mut start = self.separator.find_iter(text).last().map(|m| m.end()).unwrap_or(0);
        // Non-breaking spaces separate words too.
        if let Some(nbsp) = text[start..].rfind('\u{A0}') {
            start += nbsp + '\u{A0}'.len_utf8();
        }
        let word = &text[start..];
        let trimmed_start = word.trim_start();
        start += word.len() - trimmed_start.len();
        let end = start + trimmed_start.trim_end().len();
        (start, end)
    }
}

impl TriggerParser for AutocompleteTriggerParser {
    fn detect(&self, preceding: &str, anchor: Option<SelectionAnchor>, _request: DetectRequest) -> Detection {
        let (start, end) = self.last_word(preceding);
        Detection {
            info: Some(TriggerInfo {
                mention_position: start,
                mention_text: preceding[start..end].to_string(),
                trigger_char: String::new(),
                anchor,
            }),
            has_trailing_space: None,
        }
    }

    fn resolve_trigger_for_key(&self, _key: char) -> Option<String> {
        Some(String::new())
    }

    fn is_autocomplete(&self) -> bool {
        true
    }
}
