//! Per-activation mention state.
//!
//! One [`MentionSession`] exists per activation cycle. Hiding the menu
//! replaces it wholesale, so "is this still the live session" is an identity
//! comparison on its [`SessionToken`].
//!
//! Asynchronous providers never call back into the controller. They receive
//! a [`Responder`] that pushes a [`Delivery`] into a shared inbox; the
//! controller drains the inbox and drops every delivery whose token does not
//! match the current session.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use horizon_mention_core::logging::{span_names, targets};

use crate::config::Collection;
use crate::filter::{FilterOptions, FilteredItem, ItemFilter, MentionRecord};
use crate::surface::SurfaceId;
use crate::trigger::TriggerInfo;

/// Identity of one session.
#[derive(Clone, Default)]
pub struct SessionToken(Arc<()>);

impl SessionToken {
    fn new() -> Self {
        Self(Arc::new(()))
    }

    /// Whether both tokens belong to the same session.
    pub fn same(&self, other: &SessionToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({:p})", Arc::as_ptr(&self.0))
    }
}

/// Items a provider resolved for a session.
#[derive(Debug)]
pub(crate) struct Delivery<T> {
    pub(crate) token: SessionToken,
    pub(crate) items: Vec<T>,
}

pub(crate) type Inbox<T> = Arc<Mutex<VecDeque<Delivery<T>>>>;

/// Handle an [`ItemProvider`](crate::config::ItemProvider) resolves its items through.
///
/// Resolving consumes the responder, so each request delivers at most once.
/// The responder can be moved to another thread.
pub struct Responder<T> {
    token: SessionToken,
    inbox: Inbox<T>,
    query: String,
}

impl<T> Responder<T> {
    pub(crate) fn new(token: SessionToken, inbox: Inbox<T>, query: impl Into<String>) -> Self {
        Self {
            token,
            inbox,
            query: query.into(),
        }
    }

    /// The query the items were requested for.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Hand the items back to the engine.
    pub fn resolve(self, items: Vec<T>) {
        tracing::trace!(target: targets::SESSION, query = %self.query, count = items.len(), "provider resolved");
        self.inbox.lock().push_back(Delivery {
            token: self.token,
            items,
        });
    }
}

impl<T> fmt::Debug for Responder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("token", &self.token)
            .field("query", &self.query)
            .finish()
    }
}

/// Where an active session is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Waiting for the minimum query length or for a provider.
    #[default]
    Composing,
    /// Candidates have been filtered and rendered.
    Filtered,
}

/// A read-only copy of the session, carried by notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub surface: Option<SurfaceId>,
    pub collection: Option<usize>,
    pub mention_text: String,
    pub trigger: Option<TriggerInfo>,
    pub external_trigger: bool,
}

/// State of the mention being composed.
pub struct MentionSession<T> {
    token: SessionToken,
    pub(crate) surface: Option<SurfaceId>,
    pub(crate) collection: Option<usize>,
    pub(crate) mention_text: String,
    pub(crate) trigger: Option<TriggerInfo>,
    pub(crate) filtered_items: Option<Vec<FilteredItem<T>>>,
    pub(crate) external_trigger: bool,
    pub(crate) state: SessionState,
}

impl<T> MentionSession<T> {
    /// A fresh, inactive session.
    pub fn new() -> Self {
        Self {
            token: SessionToken::new(),
            surface: None,
            collection: None,
            mention_text: String::new(),
            trigger: None,
            filtered_items: None,
            external_trigger: false,
            state: SessionState::Composing,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    /// Index of the collection driving this session.
    pub fn collection(&self) -> Option<usize> {
        self.collection
    }

    pub fn mention_text(&self) -> &str {
        &self.mention_text
    }

    /// The last detection this session was updated from.
    pub fn trigger(&self) -> Option<&TriggerInfo> {
        self.trigger.as_ref()
    }

    /// Candidates from the last filtering pass.
    pub fn filtered_items(&self) -> Option<&[FilteredItem<T>]> {
        self.filtered_items.as_deref()
    }

    /// Whether the mention was opened programmatically.
    pub fn is_external_trigger(&self) -> bool {
        self.external_trigger
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Take the query and anchor from a fresh detection.
    pub fn update_selection(&mut self, info: TriggerInfo) {
        self.mention_text.clone_from(&info.mention_text);
        self.trigger = Some(info);
    }

    /// Whether the query is shorter than the collection's minimum, counted in characters.
    pub fn is_under_minimum(&self, collection: &Collection<T>) -> bool {
        self.mention_text.chars().count() < collection.menu_show_min_length
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            surface: self.surface,
            collection: self.collection,
            mention_text: self.mention_text.clone(),
            trigger: self.trigger.clone(),
            external_trigger: self.external_trigger,
        }
    }
}

impl<T> Default for MentionSession<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MentionSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MentionSession")
            .field("token", &self.token)
            .field("collection", &self.collection)
            .field("mention_text", &self.mention_text)
            .field("state", &self.state)
            .field("external_trigger", &self.external_trigger)
            .finish_non_exhaustive()
    }
}

/// Rank `items` for `query` with the collection's lookup and search settings,
/// keeping at most `menu_item_limit` results.
pub(crate) fn filter_items<T: MentionRecord>(
    collection: &Collection<T>,
    filter: &dyn ItemFilter<T>,
    query: &str,
    items: &[T],
) -> Vec<FilteredItem<T>> {
    let _span = tracing::debug_span!(span_names::FILTER, query, candidates = items.len()).entered();

    let extract = |item: &T| collection.lookup.extract(item, query);
    let options = FilterOptions::from_search(&collection.search, &extract);
    let mut ranked = filter.filter(query, items, &options);
    if let Some(limit) = collection.menu_item_limit {
        ranked.truncate(limit);
    }
    ranked
}

/// Whether a new mention for `collection` must not open, given `existing`
/// mentions already present on the surface.
pub(crate) fn is_maximum_items_added<T>(collection: &Collection<T>, existing: usize) -> bool {
    collection.is_blocked || collection.max_display_items.is_some_and(|max| existing >= max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectionConfig, TributeOptions};
    use crate::filter::FuzzyFilter;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("name{i}")).collect()
    }

    fn collection(config: CollectionConfig<String>) -> Collection<String> {
        config.resolve(0, &TributeOptions::default()).unwrap()
    }

    #[test]
    fn test_token_identity() {
        let a = MentionSession::<String>::new();
        let b = MentionSession::<String>::new();
        assert!(a.token().same(&a.token().clone()));
        assert!(!a.token().same(b.token()));
    }

    #[test]
    fn test_responder_delivers_once_with_token() {
        let session = MentionSession::<String>::new();
        let inbox: Inbox<String> = Arc::default();
        let responder = Responder::new(session.token().clone(), Arc::clone(&inbox), "jo");
        assert_eq!(responder.query(), "jo");
        responder.resolve(vec!["john".to_string()]);

        let delivery = inbox.lock().pop_front().unwrap();
        assert!(delivery.token.same(session.token()));
        assert_eq!(delivery.items, vec!["john".to_string()]);
        assert!(inbox.lock().is_empty());
    }

    #[test]
    fn test_update_selection_and_snapshot() {
        let mut session = MentionSession::<String>::new();
        session.update_selection(TriggerInfo {
            mention_position: 6,
            mention_text: "jo".to_string(),
            trigger_char: "@".to_string(),
            anchor: None,
        });
        assert_eq!(session.mention_text(), "jo");
        let snapshot = session.snapshot();
        assert_eq!(snapshot.mention_text, "jo");
        assert_eq!(snapshot.trigger.unwrap().mention_position, 6);
    }

    #[test]
    fn test_filter_respects_item_limit() {
        let collection = collection(CollectionConfig::new().with_values(names(10)).with_menu_item_limit(3));
        let items = collection.static_values().unwrap().to_vec();
        let ranked = filter_items(&collection, &FuzzyFilter::new(), "", &items);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].original, "name0");
    }

    #[test]
    fn test_minimum_length() {
        let collection = collection(CollectionConfig::new().with_menu_show_min_length(2));
        let mut session = MentionSession::<String>::new();
        session.mention_text = "j".to_string();
        assert!(session.is_under_minimum(&collection));
        session.mention_text = "jo".to_string();
        assert!(!session.is_under_minimum(&collection));
    }

    #[test]
    fn test_maximum_items_added() {
        let limited = collection(CollectionConfig::new().with_max_display_items(1));
        assert!(!is_maximum_items_added(&limited, 0));
        assert!(is_maximum_items_added(&limited, 1));

        let blocked = collection(CollectionConfig::new().with_blocked(true));
        assert!(is_maximum_items_added(&blocked, 0));

        let open = collection(CollectionConfig::new());
        assert!(!is_maximum_items_added(&open, 100));
    }
}
