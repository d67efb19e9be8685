//! Logging and debugging facilities for Horizon Mention.
//!
//! This module provides:
//! - Integration with the `tracing` crate for structured logging
//! - Debug visualization for node trees (structured editing surfaces)
//! - Performance tracing hooks for profiling
//!
//! # Tracing Integration
//!
//! Horizon Mention uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!     // Your application code...
//! }
//! ```
//!
//! # Debug Visualization
//!
//! Any tree that implements [`TreeSource`] can be rendered with [`TreeDebug`]:
//!
//! ```ignore
//! use horizon_mention_core::logging::TreeDebug;
//!
//! println!("{}", TreeDebug::new().format_all(&document));
//! ```

use std::fmt::Write as FmtWrite;

/// Span names used throughout Horizon Mention for tracing.
pub mod span_names {
    /// Trigger detection span.
    pub const DETECT: &str = "horizon_mention::detect";
    /// Candidate filtering span.
    pub const FILTER: &str = "horizon_mention::filter";
    /// Text replacement span.
    pub const REPLACE: &str = "horizon_mention::replace";
    /// Caret measurement span.
    pub const MEASURE: &str = "horizon_mention::measure";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core target.
    pub const CORE: &str = "horizon_mention_core";
    /// Signal target.
    pub const SIGNAL: &str = "horizon_mention_core::signal";
    /// Timer and debounce target.
    pub const TIMER: &str = "horizon_mention_core::timer";
    /// Deferred action target.
    pub const TASK: &str = "horizon_mention_core::task";
    /// Trigger detection target.
    pub const TRIGGER: &str = "horizon_mention::trigger";
    /// Surface adapter target.
    pub const SURFACE: &str = "horizon_mention::surface";
    /// Session target.
    pub const SESSION: &str = "horizon_mention::session";
    /// Menu target.
    pub const MENU: &str = "horizon_mention::menu";
    /// Top-level controller target.
    pub const TRIBUTE: &str = "horizon_mention::tribute";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show node IDs.
    pub show_ids: bool,
    /// Whether to show node kinds.
    pub show_kinds: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_kinds: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_kinds: false,
            ..Default::default()
        }
    }
}

/// A tree that can be rendered by [`TreeDebug`].
pub trait TreeSource {
    /// Node handle type.
    type Node: Copy + std::fmt::Debug;

    /// Root nodes, in order.
    fn roots(&self) -> Vec<Self::Node>;
    /// Children of a node, in order.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;
    /// Human-readable label for a node.
    fn label(&self, node: Self::Node) -> String;
    /// Short kind name for a node.
    fn kind(&self, node: Self::Node) -> &'static str;
}

/// Debug utility for visualizing trees.
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    /// Create a new debug visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a debug visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole tree.
    pub fn format_all<S: TreeSource>(&self, source: &S) -> String {
        let mut output = String::new();
        let roots = source.roots();
        if roots.is_empty() {
            output.push_str("(empty)\n");
        }
        for root in roots {
            self.format_subtree_into(source, root, 0, true, &mut output);
        }
        output
    }

    /// Format a subtree starting from a specific node.
    pub fn format_subtree<S: TreeSource>(&self, source: &S, root: S::Node) -> String {
        let mut output = String::new();
        self.format_subtree_into(source, root, 0, true, &mut output);
        output
    }

    fn format_subtree_into<S: TreeSource>(
        &self,
        source: &S,
        node: S::Node,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }

        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(&source.label(node));

        if self.options.show_ids {
            let _ = write!(output, " [{node:?}]");
        }
        if self.options.show_kinds {
            let _ = write!(output, " ({})", source.kind(node));
        }
        output.push('\n');

        let children = source.children(node);
        let child_count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_subtree_into(source, child, depth + 1, i + 1 == child_count, output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.extend(std::iter::repeat_n(' ', self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for tracking the duration of measurement and filtering passes.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_mention::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns with consistent target naming.
#[macro_export]
macro_rules! mention_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_mention", $($arg)*)
    };
}

#[macro_export]
macro_rules! mention_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_mention", $($arg)*)
    };
}

#[macro_export]
macro_rules! mention_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_mention", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parent-index tree used to exercise the formatter.
    struct Outline(Vec<(&'static str, Option<usize>)>);

    impl TreeSource for Outline {
        type Node = usize;

        fn roots(&self) -> Vec<usize> {
            (0..self.0.len()).filter(|&i| self.0[i].1.is_none()).collect()
        }

        fn children(&self, node: usize) -> Vec<usize> {
            (0..self.0.len()).filter(|&i| self.0[i].1 == Some(node)).collect()
        }

        fn label(&self, node: usize) -> String {
            self.0[node].0.to_string()
        }

        fn kind(&self, _node: usize) -> &'static str {
            "entry"
        }
    }

    #[test]
    fn test_tree_format_empty() {
        let output = TreeDebug::new().format_all(&Outline(Vec::new()));
        assert_eq!(output, "(empty)\n");
    }

    #[test]
    fn test_tree_format_hierarchy() {
        let tree = Outline(vec![("root", None), ("a", Some(0)), ("b", Some(0))]);
        let output = TreeDebug::with_options(TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..TreeFormatOptions::minimal()
        })
        .format_all(&tree);

        assert_eq!(output, "root\n+-- a\n`-- b\n");
    }

    #[test]
    fn test_tree_format_details() {
        let tree = Outline(vec![("root", None)]);
        let output = TreeDebug::new().format_subtree(&tree, 0);
        assert_eq!(output, "root [0] (entry)\n");
    }

    #[test]
    fn test_tree_max_depth() {
        let tree = Outline(vec![("root", None), ("child", Some(0)), ("leaf", Some(1))]);
        let output = TreeDebug::with_options(TreeFormatOptions {
            max_depth: Some(1),
            ..TreeFormatOptions::minimal()
        })
        .format_all(&tree);
        assert!(output.contains("child"));
        assert!(!output.contains("leaf"));
    }

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("test_operation");
    }
}
