//! Horizon Mention - trigger-driven mentions and autocompletion for text surfaces.
//!
//! A [`Tribute`] watches one or more bound surfaces for a trigger (such as `@`)
//! followed by a query, filters a collection of candidates with a fuzzy
//! matcher, shows a navigable suggestion menu near the caret and, on commit,
//! replaces the typed trigger and query with the chosen item.
//!
//! Two kinds of surface are supported:
//!
//! - **Flat fields** ([`TextField`]): single-line inputs and multi-line text
//!   areas with a plain string value and byte-offset caret
//! - **Structured documents** ([`DocumentTree`]): an editable node tree where
//!   mentions can be inserted as marked elements
//!
//! # Modules
//!
//! - [`config`] - options and per-collection settings
//! - [`trigger`] - finding the mention being typed
//! - [`filter`] - fuzzy ranking of candidates
//! - [`template`] - menu entry, selection and placeholder content
//! - [`surface`] - surfaces, caret geometry and text replacement
//! - [`menu`] - panel state, navigation and sizing
//! - [`session`] - per-activation state and asynchronous providers
//! - [`events`] - keys, clicks and notifications
//!
//! # Example
//!
//! ```
//! use horizon_mention::{CollectionConfig, HostSurface, Key, TextField, Tribute, TributeOptions};
//!
//! let mut tribute = Tribute::new(
//!     TributeOptions::default(),
//!     vec![CollectionConfig::new().with_values(vec!["ada".to_string(), "grace".to_string()])],
//! )
//! .unwrap();
//! let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
//!
//! tribute.surface_mut(id).unwrap().as_field_mut().unwrap().insert_text("@gr");
//! tribute.input(id).unwrap();
//! assert!(tribute.is_active());
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod geometry;
pub mod layout;
pub mod menu;
pub mod session;
pub mod surface;
pub mod template;
pub mod trigger;
mod tribute;

pub use config::{Collection, CollectionConfig, CollectionDefaults, ItemProvider, Lookup, TributeOptions, Values};
pub use error::{MentionError, MentionResult};
pub use events::{InputEvent, Key, MentionReplaced, PanelHandle, ScrollSource, TributeSignals};
pub use filter::{FilteredItem, FuzzyFilter, ItemFilter, MentionRecord, SearchOptions};
pub use geometry::{Point, Rect, Size, Viewport};
pub use menu::{MenuController, MenuEntry, MenuState, Placement};
pub use session::{MentionSession, Responder, SessionSnapshot, SessionState};
pub use surface::{DocumentTree, FieldStyle, HostSurface, NodeId, SurfaceAdapter, SurfaceId, SurfaceKind, TextField};
pub use template::{Content, Fragment, FragmentNode, NoMatchTemplate};
pub use trigger::{TriggerInfo, TriggerParser};
pub use tribute::Tribute;

pub use horizon_mention_core::{ConnectionId, Signal};
