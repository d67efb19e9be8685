//! Error types for the mention engine.
//!
//! Only conditions that indicate a broken configuration or binding are errors.
//! A provider resolving after its session ended, or a caret whose geometry
//! cannot be computed, are ordinary runtime conditions and are handled (and
//! logged) without surfacing here.

/// Result type alias for mention engine operations.
pub type MentionResult<T> = std::result::Result<T, MentionError>;

/// Errors raised by the mention engine.
#[derive(Debug, thiserror::Error)]
pub enum MentionError {
    /// No collection was registered.
    #[error("no collection registered; at least one collection is required")]
    NoCollection,

    /// A lookup extractor cannot be used.
    #[error("invalid lookup for collection {collection}: {message}")]
    InvalidLookup { collection: usize, message: String },

    /// The autocomplete separator is not a valid pattern.
    #[error("invalid autocomplete separator '{pattern}': {source}")]
    InvalidSeparator {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Options could not be decoded.
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    /// The surface kind has no adapter.
    #[error("cannot bind a '{node_name}' surface; only input, textarea and rich surfaces are supported")]
    SurfaceMismatch { node_name: String },

    /// The surface id does not refer to a bound surface.
    #[error("surface is not bound")]
    UnknownSurface,

    /// The collection index is out of range.
    #[error("collection index {index} out of range ({count} registered)")]
    CollectionIndex { index: usize, count: usize },

    /// Items were appended to a collection backed by a provider.
    #[error("collection {index} uses a provider; items cannot be appended")]
    ValuesAreProvider { index: usize },

    /// An operation needed an active mention session.
    #[error("no active mention session")]
    NoActiveSession,

    /// A node handle no longer refers to a live node.
    #[error("node is no longer part of the document")]
    Detached,

    /// An element was used where a text node is required, or the reverse.
    #[error("operation does not apply to this kind of node")]
    NodeKindMismatch,

    /// The menu was rendered before its list container existed.
    #[error("menu list container has not been created")]
    MissingListContainer,
}

impl MentionError {
    /// Create a lookup error.
    pub fn invalid_lookup(collection: usize, message: impl Into<String>) -> Self {
        Self::InvalidLookup {
            collection,
            message: message.into(),
        }
    }

    /// Create a surface mismatch error.
    pub fn surface_mismatch(node_name: impl Into<String>) -> Self {
        Self::SurfaceMismatch {
            node_name: node_name.into(),
        }
    }

    /// Whether the error comes from configuration rather than runtime use.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoCollection
                | Self::InvalidLookup { .. }
                | Self::InvalidSeparator { .. }
                | Self::InvalidOptions(_)
        )
    }
}
