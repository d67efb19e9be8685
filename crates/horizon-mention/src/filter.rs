//! Candidate records and ranking.
//!
//! The engine treats ranking as an external collaborator behind the
//! [`ItemFilter`] trait. [`FuzzyFilter`] is the default: a subsequence matcher
//! that rewards consecutive runs and highlights the matched characters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A candidate item that can be looked up by field name.
pub trait MentionRecord: Clone + Send + Sync + 'static {
    /// Value of the named field, if present.
    fn field(&self, name: &str) -> Option<String>;

    /// Whether the item is shown but cannot be selected.
    fn is_disabled(&self) -> bool {
        false
    }
}

impl MentionRecord for String {
    fn field(&self, _name: &str) -> Option<String> {
        Some(self.clone())
    }
}

impl MentionRecord for serde_json::Value {
    fn field(&self, name: &str) -> Option<String> {
        match self {
            serde_json::Value::Object(map) => map.get(name).and_then(|value| match value {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            }),
            serde_json::Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn is_disabled(&self) -> bool {
        self.get("disabled").and_then(serde_json::Value::as_bool) == Some(true)
    }
}

/// A candidate that survived filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredItem<T> {
    /// The item as supplied by the collection.
    pub original: T,
    /// Display string, with matched characters wrapped in highlight markers.
    pub string: String,
    /// Match score; higher ranks first.
    pub score: u64,
    /// Position of the item in the input list.
    pub index: usize,
}

/// Per-collection search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Marker inserted before each matched character.
    pub pre: String,
    /// Marker inserted after each matched character.
    pub post: String,
    /// Accept every item unranked.
    pub skip: bool,
    /// Match case exactly.
    pub case_sensitive: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            pre: "<span>".to_string(),
            post: "</span>".to_string(),
            skip: false,
            case_sensitive: false,
        }
    }
}

/// Options passed to an [`ItemFilter`] for one filtering pass.
pub struct FilterOptions<'a, T> {
    /// Marker inserted before each matched character.
    pub pre: &'a str,
    /// Marker inserted after each matched character.
    pub post: &'a str,
    /// Accept every item unranked.
    pub skip: bool,
    /// Match case exactly.
    pub case_sensitive: bool,
    /// Produces the searchable string for an item.
    pub extract: &'a dyn Fn(&T) -> String,
}

impl<'a, T> FilterOptions<'a, T> {
    /// Build options from collection search settings.
    pub fn from_search(search: &'a SearchOptions, extract: &'a dyn Fn(&T) -> String) -> Self {
        Self {
            pre: &search.pre,
            post: &search.post,
            skip: search.skip,
            case_sensitive: search.case_sensitive,
            extract,
        }
    }
}

/// Ranks candidate items against a query.
///
/// Implementations must be pure and return items ordered by descending score,
/// ties broken by input order.
pub trait ItemFilter<T>: Send + Sync {
    /// Filter and rank `items` against `query`.
    fn filter(&self, query: &str, items: &[T], options: &FilterOptions<'_, T>) -> Vec<FilteredItem<T>>;
}

/// Subsequence matcher with a consecutive-run bonus.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyFilter;

/// Best continuation per `(hay_index, needle_index, streak)`: its score and
/// the haystack index chosen for `needle[needle_index]`.
type Memo = HashMap<(usize, usize, usize), Option<(u64, usize)>>;

impl FuzzyFilter {
    /// Create the filter.
    pub fn new() -> Self {
        Self
    }

    /// Match `query` against one string, returning the highlighted rendering and score.
    pub fn match_str(
        &self,
        query: &str,
        subject: &str,
        pre: &str,
        post: &str,
        case_sensitive: bool,
    ) -> Option<(String, u64)> {
        let subject_chars: Vec<char> = subject.chars().collect();
        let fold = |c: char| {
            if case_sensitive {
                c
            } else {
                c.to_lowercase().next().unwrap_or(c)
            }
        };
        let haystack: Vec<char> = subject_chars.iter().copied().map(fold).collect();
        let needle: Vec<char> = query.chars().map(fold).collect();

        let mut memo = Memo::new();
        let score = Self::best_from(&haystack, &needle, 0, 0, 0, &mut memo)?;
        let indices = Self::walk(&memo, needle.len());
        Some((Self::render(&subject_chars, &indices, pre, post), score))
    }

    /// Best score for `needle[needle_index..]` within `haystack[hay_index..]`.
    /// `streak` counts the consecutive matches ending at `hay_index - 1`.
    fn best_from(
        haystack: &[char],
        needle: &[char],
        hay_index: usize,
        needle_index: usize,
        streak: usize,
        memo: &mut Memo,
    ) -> Option<u64> {
        if needle_index == needle.len() {
            return Some(0);
        }
        if hay_index == haystack.len() || needle.len() - needle_index > haystack.len() - hay_index {
            return None;
        }
        let key = (hay_index, needle_index, streak);
        if let Some(known) = memo.get(&key) {
            return known.map(|(score, _)| score);
        }

        let wanted = needle[needle_index];
        let mut best: Option<(u64, usize)> = None;
        let mut from = hay_index;
        while let Some(found) = haystack[from..].iter().position(|&c| c == wanted) {
            let index = from + found;
            let run = if streak > 0 && index == hay_index { streak + 1 } else { 1 };
            // A later occurrence leaves even less room, so stop at the first miss.
            let Some(rest) = Self::best_from(haystack, needle, index + 1, needle_index + 1, run, memo) else {
                break;
            };
            let score = Self::run_value(run).saturating_add(rest);
            if best.is_none_or(|(b, _)| b < score) {
                best = Some((score, index));
            }
            from = index + 1;
        }
        memo.insert(key, best);
        best.map(|(score, _)| score)
    }

    /// Follow the chosen indices from the start of a solved memo.
    fn walk(memo: &Memo, needle_len: usize) -> Vec<usize> {
        let mut indices = Vec::with_capacity(needle_len);
        let (mut hay_index, mut streak) = (0, 0);
        for needle_index in 0..needle_len {
            let Some(&Some((_, index))) = memo.get(&(hay_index, needle_index, streak)) else {
                break;
            };
            streak = if streak > 0 && index == hay_index { streak + 1 } else { 1 };
            indices.push(index);
            hay_index = index + 1;
        }
        indices
    }

    /// Bonus for the `streak`-th consecutive match: 1, 3, 7, 15, ...
    fn run_value(streak: usize) -> u64 {
        (1..streak).fold(1u64, |run, _| run.saturating_add(run).saturating_add(1))
    }

    fn render(chars: &[char], indices: &[usize], pre: &str, post: &str) -> String {
        let Some(&first) = indices.first() else {
            return chars.iter().collect();
        };

        let mut rendered: String = chars[..first].iter().collect();
        for (i, &index) in indices.iter().enumerate() {
            let next = indices.get(i + 1).copied().unwrap_or(chars.len());
            rendered.push_str(pre);
            rendered.push(chars[index]);
            rendered.push_str(post);
            rendered.extend(&chars[index + 1..next]);
        }
        rendered
    }
}

impl<T: Clone + Send + Sync> ItemFilter<T> for FuzzyFilter {
    fn filter(&self, query: &str, items: &[T], options: &FilterOptions<'_, T>) -> Vec<FilteredItem<T>> {
        let mut matched: Vec<FilteredItem<T>> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let subject = (options.extract)(item);
                let (string, score) = if options.skip {
                    (subject, 0)
                } else {
                    self.match_str(query, &subject, options.pre, options.post, options.case_sensitive)?
                };
                Some(FilteredItem {
                    original: item.clone(),
                    string,
                    score,
                    index,
                })
            })
            .collect();

        matched.sort_by(|a, b| b.score.cmp(&a.score).then(a.index.cmp(&b.index)));
        matched
    }
}
