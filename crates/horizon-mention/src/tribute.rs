//! The top-level mention controller.
//!
//! [`Tribute`] owns everything: bound surfaces, resolved collections, the
//! trigger parser, the live [`MentionSession`], the [`MenuController`] and the
//! notification signals. The host drives it with key, input, click, resize
//! and scroll events plus a periodic [`Tribute::tick`] that runs deferred
//! actions, debounced closes and pending provider deliveries.
//!
//! # Example
//!
//! ```
//! use horizon_mention::{
//!     CollectionConfig, HostSurface, Key, TextField, Tribute, TributeOptions,
//! };
//! use serde_json::json;
//!
//! let people = vec![
//!     json!({"key": "Jordan Humphreys", "value": "Jordan"}),
//!     json!({"key": "Sir Walter Riley", "value": "Sir Walter"}),
//! ];
//! let mut tribute = Tribute::new(
//!     TributeOptions::default(),
//!     vec![CollectionConfig::new().with_values(people)],
//! )
//! .unwrap();
//!
//! let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
//! for c in "Hi @jor".chars() {
//!     tribute.surface_mut(id).unwrap().as_field_mut().unwrap().insert_text(&c.to_string());
//!     tribute.key_down(id, Key::Character(c)).unwrap();
//!     tribute.key_up(id, Key::Character(c)).unwrap();
//! }
//! assert!(tribute.is_active());
//!
//! tribute.key_down(id, Key::Enter).unwrap();
//! assert_eq!(tribute.surface(id).unwrap().text(), "Hi @Jordan ");
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use slotmap::SlotMap;

use horizon_mention_core::logging::{span_names, targets};
use horizon_mention_core::{Debouncer, DeferredQueue, PerfSpan, TreeDebug, mention_debug, mention_trace, mention_warn};

use crate::config::{Collection, CollectionConfig, TributeOptions, Values};
use crate::error::{MentionError, MentionResult};
use crate::events::{InputEvent, Key, MentionReplaced, PanelHandle, ScrollSource, TributeSignals};
use crate::filter::{FilteredItem, FuzzyFilter, ItemFilter, MentionRecord};
use crate::geometry::Viewport;
use crate::menu::{MenuController, MenuEntry, Placement};
use crate::session::{self, Inbox, MentionSession, Responder};
use crate::surface::{
    FlatBufferAdapter, HostSurface, InertAdapter, SurfaceAdapter, SurfaceId, SurfaceKind, TreeAdapter, placement,
};
use crate::template::{self, Content, SelectContext};
use crate::trigger::{
    AutocompleteTriggerParser, DetectRequest, StandardTriggerParser, TriggerInfo, TriggerParser, TriggerSpec,
};

/// Actions that run on a later tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// Close after a click outside the menu.
    HideMenu,
    /// Close and release the panel after the active surface was unbound.
    ReleaseMenu,
}

struct BoundSurface {
    surface: HostSurface,
    adapter: Arc<dyn SurfaceAdapter>,
}

/// Mention engine bound to any number of surfaces.
pub struct Tribute<T: MentionRecord> {
    options: TributeOptions,
    collections: Vec<Collection<T>>,
    parser: Box<dyn TriggerParser>,
    filter: Arc<dyn ItemFilter<T>>,
    surfaces: SlotMap<SurfaceId, BoundSurface>,
    flat: Arc<FlatBufferAdapter>,
    tree: Arc<TreeAdapter>,
    inert: Arc<InertAdapter>,
    session: MentionSession<T>,
    pending_scroll: bool,
    menu: MenuController,
    signals: TributeSignals<T>,
    inbox: Inbox<T>,
    deferred: DeferredQueue<Deferred>,
    resize: Debouncer,
    scroll: Debouncer,
    viewport: Viewport,
    has_trailing_space: bool,
    command_event: bool,
    input_event: bool,
    is_active: bool,
    committing: bool,
}

impl<T: MentionRecord> Tribute<T> {
    /// Create a controller for `collections`.
    ///
    /// Fails with [`MentionError::NoCollection`] when no collection is given
    /// and with a configuration error when one does not resolve.
    pub fn new(options: TributeOptions, collections: Vec<CollectionConfig<T>>) -> MentionResult<Self> {
        if collections.is_empty() {
            return Err(MentionError::NoCollection);
        }
        let collections = collections
            .into_iter()
            .enumerate()
            .map(|(index, config)| config.resolve(index, &options))
            .collect::<MentionResult<Vec<_>>>()?;

        let parser: Box<dyn TriggerParser> = if options.autocomplete_mode {
            if collections.len() > 1 {
                tracing::warn!(
                    target: targets::TRIBUTE,
                    count = collections.len(),
                    "autocomplete mode only uses the first collection's trigger"
                );
            }
            Box::new(AutocompleteTriggerParser::new(options.autocomplete_separator.as_deref())?)
        } else {
            Box::new(StandardTriggerParser::new(
                collections
                    .iter()
                    .map(|c| TriggerSpec::new(c.trigger.clone(), c.require_leading_space))
                    .collect(),
            ))
        };

        let suffix = options.replace_text_suffix.clone();
        let delay = options.debounce();
        mention_debug!(
            collections = collections.len(),
            autocomplete = options.autocomplete_mode,
            "tribute created"
        );

        Ok(Self {
            flat: Arc::new(FlatBufferAdapter::new(suffix.clone(), options.autocomplete_mode)),
            tree: Arc::new(TreeAdapter::new(suffix, options.autocomplete_mode)),
            inert: Arc::new(InertAdapter),
            menu: MenuController::new(&options),
            options,
            collections,
            parser,
            filter: Arc::new(FuzzyFilter::new()),
            surfaces: SlotMap::with_key(),
            session: MentionSession::new(),
            pending_scroll: false,
            signals: TributeSignals::new(),
            inbox: Arc::default(),
            deferred: DeferredQueue::new(),
            resize: Debouncer::new(delay),
            scroll: Debouncer::new(delay),
            viewport: Viewport::default(),
            has_trailing_space: false,
            command_event: false,
            input_event: false,
            is_active: false,
            committing: false,
        })
    }

    /// Builder method to replace the ranking function.
    pub fn with_filter(mut self, filter: impl ItemFilter<T> + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn options(&self) -> &TributeOptions {
        &self.options
    }

    pub fn collection(&self, index: usize) -> Option<&Collection<T>> {
        self.collections.get(index)
    }

    /// Registered triggers, in registration order.
    pub fn triggers(&self) -> Vec<&str> {
        self.collections.iter().map(|c| c.trigger.as_str()).collect()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn session(&self) -> &MentionSession<T> {
        &self.session
    }

    pub fn menu(&self) -> &MenuController {
        &self.menu
    }

    pub fn signals(&self) -> &TributeSignals<T> {
        &self.signals
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Update the viewport without scheduling a close.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&HostSurface> {
        self.surfaces.get(id).map(|b| &b.surface)
    }

    /// Mutable access for the host's own edits (typing, caret moves).
    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut HostSurface> {
        self.surfaces.get_mut(id).map(|b| &mut b.surface)
    }

    /// The adapter driving `id`, or the inert one for unknown ids.
    pub fn adapter(&self, id: SurfaceId) -> Arc<dyn SurfaceAdapter> {
        match self.surfaces.get(id) {
            Some(bound) => Arc::clone(&bound.adapter),
            None => self.inert.clone(),
        }
    }

    /// Tree dump of a structured surface, for debugging.
    pub fn dump_surface(&self, id: SurfaceId) -> Option<String> {
        let doc = self.surface(id)?.as_document()?;
        Some(TreeDebug::new().format_all(doc))
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Bind a surface and pick its adapter.
    ///
    /// A structured surface is made editable if it is not already.
    pub fn bind(&mut self, mut surface: HostSurface) -> MentionResult<SurfaceId> {
        let adapter: Arc<dyn SurfaceAdapter> = match surface.kind() {
            SurfaceKind::Input | SurfaceKind::TextArea => self.flat.clone(),
            SurfaceKind::Rich => {
                if let Some(doc) = surface.as_document_mut() {
                    let root = doc.root();
                    if !doc.is_editable(root) {
                        doc.set_editable(root, true)?;
                    }
                }
                self.tree.clone()
            }
            SurfaceKind::Other => {
                mention_warn!(node_name = surface.node_name(), "cannot bind surface");
                return Err(MentionError::surface_mismatch(surface.node_name()));
            }
        };
        let name = adapter.name();
        let id = self.surfaces.insert(BoundSurface { surface, adapter });
        tracing::debug!(target: targets::TRIBUTE, ?id, adapter = name, "surface bound");
        Ok(id)
    }

    /// Unbind a surface and hand it back.
    ///
    /// If it held the active session, the menu is closed on the next tick.
    pub fn unbind(&mut self, id: SurfaceId, now: Instant) -> MentionResult<HostSurface> {
        let bound = self.surfaces.remove(id).ok_or(MentionError::UnknownSurface)?;
        if self.session.surface == Some(id) {
            self.deferred.post(now, Duration::ZERO, Deferred::ReleaseMenu);
        }
        tracing::debug!(target: targets::TRIBUTE, ?id, "surface unbound");
        Ok(bound.surface)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Extend or replace the static items of collection `index`.
    pub fn append(&mut self, index: usize, values: Vec<T>, replace: bool) -> MentionResult<()> {
        let count = self.collections.len();
        let collection = self
            .collections
            .get_mut(index)
            .ok_or(MentionError::CollectionIndex { index, count })?;
        match &mut collection.values {
            Values::Provider(_) => Err(MentionError::ValuesAreProvider { index }),
            Values::Static(items) => {
                if replace {
                    *items = values;
                } else {
                    items.extend(values);
                }
                Ok(())
            }
        }
    }

    /// [`append`](Self::append) to the collection of the active session.
    pub fn append_current(&mut self, values: Vec<T>, replace: bool) -> MentionResult<()> {
        match self.session.collection.filter(|_| self.is_active) {
            Some(index) => self.append(index, values, replace),
            None => Err(MentionError::NoActiveSession),
        }
    }

    // =========================================================================
    // Showing and hiding
    // =========================================================================

    /// Open the menu for a collection as if its trigger had been typed.
    ///
    /// The trigger is inserted at the caret. Nothing happens when the
    /// collection is blocked or already has its maximum number of mentions.
    pub fn show_menu_for_collection(&mut self, id: SurfaceId, index: Option<usize>) -> MentionResult<()> {
        let index = index.unwrap_or(0);
        let count = self.collections.len();
        let collection = self
            .collections
            .get(index)
            .ok_or(MentionError::CollectionIndex { index, count })?;
        let bound = self.surfaces.get_mut(id).ok_or(MentionError::UnknownSurface)?;

        let existing = bound.adapter.count_mentions(&bound.surface, &collection.trigger, None);
        if session::is_maximum_items_added(collection, existing) {
            tracing::debug!(target: targets::SESSION, index, existing, "collection blocked or full");
            return Ok(());
        }

        let trigger = collection.trigger.clone();
        bound.adapter.insert_at_cursor(&mut bound.surface, &trigger);

        self.session.collection = Some(index);
        self.session.external_trigger = true;
        self.update_selection(id);
        if self.session.trigger.is_none() {
            // The inserted trigger may not qualify (no leading space); track it anyway.
            self.session.trigger = self.synthesize_trigger(id, &trigger);
        }
        self.show_menu_for(id, false)
    }

    /// Activate the menu for the current session on `id` and process its query.
    pub fn show_menu_for(&mut self, id: SurfaceId, scroll_to: bool) -> MentionResult<()> {
        let index = self.session.collection.ok_or(MentionError::NoCollection)?;
        let collection = self.collections.get(index).ok_or(MentionError::CollectionIndex {
            index,
            count: self.collections.len(),
        })?;
        let bound = self.surfaces.get(id).ok_or(MentionError::UnknownSurface)?;

        let composing = self.session.trigger.as_ref().map(|t| t.mention_position);
        let existing = bound.adapter.count_mentions(&bound.surface, &collection.trigger, composing);
        if session::is_maximum_items_added(collection, existing) {
            tracing::debug!(target: targets::SESSION, index, existing, "collection blocked or full");
            return Ok(());
        }

        if !self.menu.is_created() {
            self.menu.create(&collection.container_class);
        }
        self.menu.set_classes(&collection.item_class, &collection.select_class);
        self.session.surface = Some(id);
        self.set_active(true);
        self.menu.activate();
        self.process(scroll_to)
    }

    /// Close the menu and start over with a fresh session.
    pub fn hide_menu(&mut self) {
        if !self.menu.is_created() {
            return;
        }
        self.set_active(false);
        self.menu.deactivate();
        self.session = MentionSession::new();
        self.pending_scroll = false;
        let generation = self.deferred.advance_generation();
        mention_trace!(generation, "session reset");
    }

    fn set_active(&mut self, active: bool) {
        if self.is_active != active {
            self.is_active = active;
            self.signals.active_changed.emit(active);
        }
    }

    // =========================================================================
    // Processing
    // =========================================================================

    fn process(&mut self, scroll_to: bool) -> MentionResult<()> {
        let Some(index) = self.session.collection else {
            return Ok(());
        };
        let _perf = PerfSpan::new("process");
        let collection = &self.collections[index];
        let query = self.session.mention_text.clone();
        match &collection.values {
            Values::Static(items) => {
                let ranked = session::filter_items(collection, self.filter.as_ref(), &query, items);
                self.apply_results(ranked, scroll_to)
            }
            Values::Provider(provider) => {
                let provider = Arc::clone(provider);
                if let Some(loading) = collection.loading_item_template.clone() {
                    self.menu.render_placeholder(loading)?;
                    self.position_menu_at_caret(scroll_to);
                }
                self.pending_scroll = scroll_to;
                let responder = Responder::new(self.session.token().clone(), Arc::clone(&self.inbox), query.as_str());
                tracing::trace!(target: targets::SESSION, query = %query, "fetching from provider");
                provider.fetch(&query, responder);
                self.process_deliveries().map(|_| ())
            }
        }
    }

    /// Apply every provider delivery received so far.
    ///
    /// Deliveries for a session that is no longer current are dropped.
    /// Returns how many were applied.
    pub fn process_deliveries(&mut self) -> MentionResult<usize> {
        let deliveries: Vec<_> = self.inbox.lock().drain(..).collect();
        let mut applied = 0;
        for delivery in deliveries {
            if !self.is_active || !delivery.token.same(self.session.token()) {
                tracing::trace!(target: targets::SESSION, "dropping stale provider result");
                continue;
            }
            let Some(collection) = self.session.collection.and_then(|i| self.collections.get(i)) else {
                continue;
            };
            let ranked = session::filter_items(
                collection,
                self.filter.as_ref(),
                &self.session.mention_text,
                &delivery.items,
            );
            self.apply_results(ranked, self.pending_scroll)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn apply_results(&mut self, ranked: Vec<FilteredItem<T>>, scroll_to: bool) -> MentionResult<()> {
        if !self.is_active {
            tracing::trace!(target: targets::SESSION, "results arrived after close");
            return Ok(());
        }
        let Some(collection) = self.session.collection.and_then(|i| self.collections.get(i)) else {
            return Ok(());
        };

        if ranked.is_empty() {
            self.signals.no_match.emit(PanelHandle {
                container_class: collection.container_class.clone(),
                surface: self.session.surface,
            });
            match collection.no_match_template.render() {
                Some(content) => self.menu.render_placeholder(content)?,
                None => {
                    self.hide_menu();
                    return Ok(());
                }
            }
        } else {
            let entries = ranked
                .iter()
                .enumerate()
                .map(|(index, item)| MenuEntry {
                    index,
                    content: match &collection.menu_item_template {
                        Some(render) => render(item),
                        None => template::default_menu_item(item),
                    },
                    disabled: item.original.is_disabled(),
                })
                .collect();
            self.menu.render_items(entries)?;
        }

        self.session.filtered_items = Some(ranked);
        self.session.state = session::SessionState::Filtered;
        self.position_menu_at_caret(scroll_to);
        Ok(())
    }

    /// Place the open menu against the caret.
    ///
    /// When the caret geometry is unavailable the panel is hidden rather
    /// than shown at a wrong position. With `scroll_to`, a page scroll that
    /// reveals the panel is requested through
    /// [`TributeSignals::scroll_requested`].
    pub fn position_menu_at_caret(&mut self, scroll_to: bool) {
        if !self.menu.is_open() {
            return;
        }
        if !self.options.position_menu {
            self.menu.position(Placement::Unpositioned);
            return;
        }
        let Some(id) = self.session.surface else {
            return;
        };
        self.restore_caret(id);
        let Some(position) = self.session.trigger.as_ref().map(|t| t.mention_position) else {
            return;
        };
        let Some(bound) = self.surfaces.get(id) else {
            return;
        };

        let size = self.menu.dimensions();
        match bound.adapter.coordinates(&bound.surface, position, size, &self.viewport) {
            Some(coords) => {
                self.menu.position(Placement::At(coords));
                if scroll_to
                    && let Some(target) = placement::scroll_target(coords.resolve(size, &self.viewport), &self.viewport)
                {
                    self.signals.scroll_requested.emit(target);
                }
            }
            None => {
                tracing::debug!(target: targets::MENU, "caret position unavailable, hiding panel");
                self.menu.position(Placement::Hidden);
            }
        }
    }

    // =========================================================================
    // Detection
    // =========================================================================

    fn allow_spaces(&self) -> bool {
        self.options.allow_spaces
            || self
                .session
                .collection
                .and_then(|i| self.collections.get(i))
                .is_some_and(|c| c.allow_spaces)
    }

    fn detect(&mut self, id: SurfaceId, menu_already_active: bool, has_trailing_space: bool) -> Option<TriggerInfo> {
        let bound = self.surfaces.get(id)?;
        let preceding = bound.adapter.text_preceding_cursor(&bound.surface)?;
        let anchor = bound.adapter.selection_anchor(&bound.surface);
        let request = DetectRequest {
            menu_already_active,
            has_trailing_space,
            require_leading_space: true,
            allow_spaces: self.allow_spaces(),
        };
        let _span = tracing::trace_span!(span_names::DETECT, surface = bound.adapter.name()).entered();
        let detection = self.parser.detect(&preceding, anchor, request);
        if let Some(flag) = detection.has_trailing_space {
            self.has_trailing_space = flag;
        }
        detection.info
    }

    /// Refresh the session's query from the text before the caret.
    fn update_selection(&mut self, id: SurfaceId) -> Option<()> {
        self.session.surface = Some(id);
        let info = self.detect(id, false, self.has_trailing_space)?;
        self.session.update_selection(info);
        Some(())
    }

    fn synthesize_trigger(&self, id: SurfaceId, trigger: &str) -> Option<TriggerInfo> {
        let bound = self.surfaces.get(id)?;
        let preceding = bound.adapter.text_preceding_cursor(&bound.surface)?;
        Some(TriggerInfo {
            mention_position: preceding.len().saturating_sub(trigger.len()),
            mention_text: String::new(),
            trigger_char: trigger.to_string(),
            anchor: bound.adapter.selection_anchor(&bound.surface),
        })
    }

    /// Put a lost caret back where the session last saw it.
    fn restore_caret(&mut self, id: SurfaceId) {
        let Some(anchor) = self.session.trigger.as_ref().and_then(|t| t.anchor.clone()) else {
            return;
        };
        let Some(bound) = self.surfaces.get_mut(id) else {
            return;
        };
        if bound.adapter.text_preceding_cursor(&bound.surface).is_none()
            && bound.adapter.restore_selection(&mut bound.surface, &anchor)
        {
            tracing::trace!(target: targets::SURFACE, path = ?anchor.path, "caret restored from anchor");
        }
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Commit the filtered item at `index`.
    ///
    /// With no index, or an index past the results, nothing is replaced and
    /// [`TributeSignals::no_match_selected`] fires with the fallback content.
    /// A select template returning `None` suppresses the replacement, and a
    /// disabled item is never committed.
    pub fn select_item_at_index(&mut self, index: Option<usize>, event: InputEvent) -> MentionResult<()> {
        if self.committing {
            tracing::trace!(target: targets::TRIBUTE, "commit already in progress");
            return Ok(());
        }
        let (Some(items), Some(collection), Some(id)) = (
            self.session.filtered_items.as_ref(),
            self.session.collection.and_then(|i| self.collections.get(i)),
            self.session.surface,
        ) else {
            return Ok(());
        };
        let bound = self.surfaces.get(id).ok_or(MentionError::UnknownSurface)?;

        let item = index.and_then(|i| items.get(i)).cloned();
        if item.as_ref().is_some_and(|item| item.original.is_disabled()) {
            tracing::debug!(target: targets::TRIBUTE, ?index, "refusing to commit a disabled item");
            return Ok(());
        }
        let content = {
            let ctx = SelectContext {
                trigger: &collection.trigger,
                mention_text: &self.session.mention_text,
                fill_attr: &collection.fill_attr,
                rich: bound.surface.kind() == SurfaceKind::Rich,
            };
            match &collection.select_template {
                Some(select) => select(&ctx, item.as_ref()),
                None => template::default_select(&ctx, item.as_ref()),
            }
        };

        let Some(item) = item else {
            tracing::debug!(target: targets::TRIBUTE, ?index, "commit with no match");
            self.signals.no_match_selected.emit(content);
            return Ok(());
        };
        let Some(content) = content else {
            tracing::debug!(target: targets::TRIBUTE, "select template suppressed replacement");
            return Ok(());
        };

        self.committing = true;
        let result = self.replace_trigger_text(id, &content, item, event);
        self.committing = false;
        result
    }

    fn replace_trigger_text(
        &mut self,
        id: SurfaceId,
        content: &Content,
        item: FilteredItem<T>,
        event: InputEvent,
    ) -> MentionResult<()> {
        self.restore_caret(id);
        let Some(info) = self.detect(id, true, true).or_else(|| self.session.trigger.clone()) else {
            tracing::debug!(target: targets::TRIBUTE, "no mention to replace");
            return Ok(());
        };

        let bound = self.surfaces.get_mut(id).ok_or(MentionError::UnknownSurface)?;
        if !bound.adapter.replace_range(&mut bound.surface, &info, content) {
            tracing::debug!(target: targets::TRIBUTE, adapter = bound.adapter.name(), "replacement failed");
            return Ok(());
        }

        self.signals.surface_changed.emit(id);
        self.signals.replaced.emit(MentionReplaced {
            item,
            session: self.session.snapshot(),
            context: info,
            event,
            surface: id,
        });
        Ok(())
    }

    // =========================================================================
    // Keyboard and input
    // =========================================================================

    /// Handle a key press. Returns `true` when the key was consumed by the
    /// menu and the host should not apply it.
    pub fn key_down(&mut self, id: SurfaceId, key: Key) -> MentionResult<bool> {
        if !self.surfaces.contains_key(id) {
            return Err(MentionError::UnknownSurface);
        }
        if self.should_deactivate(key) {
            self.hide_menu();
        }
        self.command_event = key.is_command();
        if self.command_event {
            return self.run_command(id, key);
        }
        Ok(false)
    }

    /// An open menu with an empty query closes on any ordinary key; the
    /// key-up that follows re-detects.
    fn should_deactivate(&self, key: Key) -> bool {
        self.is_active && self.session.mention_text.is_empty() && !key.is_command()
    }

    fn run_command(&mut self, id: SurfaceId, key: Key) -> MentionResult<bool> {
        match key {
            Key::Enter | Key::Tab => self.commit_selected(key),
            Key::Escape => {
                if self.is_active {
                    self.set_active(false);
                    self.hide_menu();
                    return Ok(true);
                }
                Ok(false)
            }
            Key::Space => {
                if !self.is_active {
                    return Ok(false);
                }
                if self.options.space_selects_match {
                    self.commit_selected(key)
                } else {
                    if !self.allow_spaces() {
                        self.hide_menu();
                    }
                    Ok(false)
                }
            }
            Key::Up | Key::Down => {
                if self.is_active && self.session.filtered_items.is_some() {
                    if key == Key::Up {
                        self.menu.up();
                    } else {
                        self.menu.down();
                    }
                    return Ok(true);
                }
                Ok(false)
            }
            Key::Backspace => {
                if self.is_active {
                    if self.session.mention_text.is_empty() {
                        self.hide_menu();
                    } else {
                        self.show_menu_for(id, false)?;
                    }
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn commit_selected(&mut self, key: Key) -> MentionResult<bool> {
        if !self.is_active || self.session.filtered_items.is_none() {
            return Ok(false);
        }
        let selected = self.menu.selected_index();
        let result = self.select_item_at_index(selected, InputEvent::Key(key));
        self.hide_menu();
        result.map(|_| true)
    }

    /// Handle a key release.
    pub fn key_up(&mut self, id: SurfaceId, key: Key) -> MentionResult<()> {
        self.handle_key_up(id, Some(key))
    }

    /// Handle a text input event on `id`.
    ///
    /// An input that completes a trigger opens the menu at once when the
    /// query already meets the collection's minimum length.
    pub fn input(&mut self, id: SurfaceId) -> MentionResult<()> {
        self.input_event = true;
        self.handle_key_up(id, None)
    }

    fn handle_key_up(&mut self, id: SurfaceId, key: Option<Key>) -> MentionResult<()> {
        if !self.surfaces.contains_key(id) {
            return Err(MentionError::UnknownSurface);
        }
        let from_input = std::mem::take(&mut self.input_event);

        let detected = self.update_selection(id).is_some();
        if key == Some(Key::Escape) {
            return Ok(());
        }
        if self.is_active && !detected && self.session.surface == Some(id) {
            tracing::trace!(target: targets::TRIGGER, "mention no longer present");
            self.hide_menu();
            return Ok(());
        }

        if !self.allow_spaces() && self.has_trailing_space {
            self.has_trailing_space = false;
            self.command_event = true;
            self.run_command(id, Key::Space)?;
            return Ok(());
        }

        let mut opened = false;
        if !self.is_active {
            let trigger = if self.parser.is_autocomplete() {
                self.parser.resolve_trigger_for_key(' ')
            } else {
                self.session
                    .trigger
                    .as_ref()
                    .and_then(|info| info.trigger_char.chars().next())
                    .and_then(|c| self.parser.resolve_trigger_for_key(c))
            };
            if let Some(trigger) = trigger {
                opened = self.trigger_char(id, &trigger, from_input)?;
            }
        }

        let Some(collection) = self.session.collection.and_then(|i| self.collections.get(i)) else {
            return Ok(());
        };
        if opened || self.session.is_under_minimum(collection) {
            return Ok(());
        }
        let backspace_while_active = self.is_active && key == Some(Key::Backspace);
        if !self.command_event || backspace_while_active {
            self.show_menu_for(id, true)?;
        }
        Ok(())
    }

    /// A trigger was typed: attach its collection to the session.
    fn trigger_char(&mut self, id: SurfaceId, trigger: &str, from_input: bool) -> MentionResult<bool> {
        let Some(index) = self.collections.iter().position(|c| c.trigger == trigger) else {
            return Ok(false);
        };
        self.session.collection = Some(index);
        tracing::trace!(target: targets::TRIGGER, trigger, index, "trigger typed");
        if from_input && !self.session.is_under_minimum(&self.collections[index]) {
            self.show_menu_for(id, true)?;
            return Ok(true);
        }
        Ok(false)
    }

    // =========================================================================
    // Mouse
    // =========================================================================

    /// Handle a click on menu entry `index`. Disabled entries are ignored.
    pub fn click_menu_item(&mut self, index: usize) -> MentionResult<()> {
        if !self.menu.is_open() {
            return Ok(());
        }
        let target = if self.menu.entries().is_empty() {
            None
        } else {
            match self.menu.entries().get(index) {
                Some(entry) if entry.disabled => return Ok(()),
                Some(_) => Some(index),
                None => return Ok(()),
            }
        };
        let result = self.select_item_at_index(target, InputEvent::Click { index });
        self.hide_menu();
        result
    }

    /// Move the selection to the hovered entry.
    pub fn hover_menu_item(&mut self, index: usize) -> bool {
        self.is_active && self.menu.set_active(index)
    }

    /// Handle a click anywhere outside the menu.
    ///
    /// The menu closes on the next tick. The first outside click after a
    /// programmatic open only clears the external flag.
    pub fn click_outside(&mut self, now: Instant) {
        if self.session.external_trigger {
            self.session.external_trigger = false;
        } else if self.session.surface.is_some() {
            self.deferred.post(now, Duration::ZERO, Deferred::HideMenu);
        }
    }

    // =========================================================================
    // Viewport
    // =========================================================================

    /// The viewport changed size. The menu closes once resizing settles.
    pub fn viewport_resized(&mut self, viewport: Viewport, now: Instant) {
        self.viewport = viewport;
        self.resize.call(now);
    }

    /// Something scrolled. Honored scrolls close the menu once they settle.
    pub fn scrolled(&mut self, source: ScrollSource, now: Instant) {
        let honored = match source {
            ScrollSource::Window => self.options.close_on_scroll || !self.options.menu_container,
            ScrollSource::Container => !self.options.close_on_scroll && self.options.menu_container,
        };
        if honored {
            self.scroll.call(now);
        }
    }

    /// Run deferred actions, debounced closes and pending deliveries.
    pub fn tick(&mut self, now: Instant) -> MentionResult<()> {
        for action in self.deferred.take_due(now) {
            match action {
                Deferred::HideMenu => {
                    if self.is_active {
                        self.hide_menu();
                    }
                }
                Deferred::ReleaseMenu => {
                    self.hide_menu();
                    self.set_active(false);
                    if self.surfaces.is_empty() {
                        self.menu.destroy();
                    }
                }
            }
        }

        let resized = self.resize.poll(now);
        let scrolled = self.scroll.poll(now);
        if (resized || scrolled) && self.is_active {
            tracing::trace!(target: targets::TRIBUTE, resized, scrolled, "closing after viewport change");
            self.hide_menu();
        }

        self.process_deliveries()?;
        Ok(())
    }
}

impl<T: MentionRecord> std::fmt::Debug for Tribute<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tribute")
            .field("collections", &self.collections.len())
            .field("surfaces", &self.surfaces.len())
            .field("parser", &self.parser)
            .field("session", &self.session)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DocumentTree, TextField};
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    fn people() -> Vec<Value> {
        vec![
            json!({"key": "Jordan Humphreys", "value": "Jordan"}),
            json!({"key": "Sir Walter Riley", "value": "Sir Walter"}),
            json!({"key": "Joe Bloggs", "value": "Joe"}),
        ]
    }

    fn tribute() -> Tribute<Value> {
        Tribute::new(TributeOptions::default(), vec![CollectionConfig::new().with_values(people())]).unwrap()
    }

    fn type_text(tribute: &mut Tribute<Value>, id: SurfaceId, text: &str) {
        for c in text.chars() {
            let key = if c == ' ' { Key::Space } else { Key::Character(c) };
            tribute.key_down(id, key).unwrap();
            tribute.surface_mut(id).unwrap().as_field_mut().unwrap().insert_text(&c.to_string());
            tribute.key_up(id, key).unwrap();
        }
    }

    #[test]
    fn test_new_requires_collection() {
        let err = Tribute::<Value>::new(TributeOptions::default(), Vec::new()).unwrap_err();
        assert!(matches!(err, MentionError::NoCollection));
    }

    #[test]
    fn test_new_rejects_empty_lookup() {
        let err = Tribute::<Value>::new(
            TributeOptions::default(),
            vec![CollectionConfig::new().with_lookup_field("")],
        )
        .unwrap_err();
        assert!(matches!(err, MentionError::InvalidLookup { .. }));
    }

    #[test]
    fn test_bind_rejects_other_surfaces() {
        let mut tribute = tribute();
        let err = tribute
            .bind(HostSurface::Other {
                node_name: "IMG".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, MentionError::SurfaceMismatch { .. }));
    }

    #[test]
    fn test_bind_makes_document_editable() {
        let mut tribute = tribute();
        let id = tribute
            .bind(HostSurface::Rich(DocumentTree::with_root("div", false)))
            .unwrap();
        let doc = tribute.surface(id).unwrap().as_document().unwrap();
        assert!(doc.is_editable(doc.root()));
        assert_eq!(tribute.adapter(id).name(), "tree");
    }

    #[test]
    fn test_typing_opens_and_filters() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "Hi @jo");

        assert!(tribute.is_active());
        assert_eq!(tribute.session().mention_text(), "jo");
        let items = tribute.session().filtered_items().unwrap();
        assert_eq!(items.len(), 2);
        assert!(tribute.menu().is_open());
    }

    #[test]
    fn test_enter_commits_selection() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        let replaced = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&replaced);
        tribute.signals().replaced.connect(move |event: &MentionReplaced<Value>| {
            sink.lock().push(event.item.original["value"].clone());
        });

        type_text(&mut tribute, id, "Hi @sir");
        assert!(tribute.key_down(id, Key::Enter).unwrap());

        assert_eq!(tribute.surface(id).unwrap().text(), "Hi @Sir Walter ");
        assert_eq!(*replaced.lock(), vec![json!("Sir Walter")]);
        assert!(!tribute.is_active());
        assert!(!tribute.menu().is_open());
    }

    #[test]
    fn test_escape_closes() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@jo");
        assert!(tribute.key_down(id, Key::Escape).unwrap());
        assert!(!tribute.is_active());
        assert_eq!(tribute.surface(id).unwrap().text(), "@jo");
    }

    #[test]
    fn test_space_closes_without_allow_spaces() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@jo");
        assert!(tribute.is_active());
        type_text(&mut tribute, id, " ");
        assert!(!tribute.is_active());
    }

    #[test]
    fn test_space_selects_match() {
        let mut tribute = Tribute::new(
            TributeOptions::default().with_space_selects_match(true),
            vec![CollectionConfig::new().with_values(people())],
        )
        .unwrap();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@joe");
        assert!(tribute.key_down(id, Key::Space).unwrap());
        assert_eq!(tribute.surface(id).unwrap().text(), "@Joe ");
    }

    #[test]
    fn test_backspace_over_trigger_closes() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "a @j");
        assert!(tribute.is_active());
        for _ in 0..2 {
            tribute.key_down(id, Key::Backspace).unwrap();
            tribute.surface_mut(id).unwrap().as_field_mut().unwrap().backspace();
            tribute.key_up(id, Key::Backspace).unwrap();
        }
        assert!(!tribute.is_active());
    }

    #[test]
    fn test_no_match_placeholder_and_commit() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        let fallback = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&fallback);
        tribute.signals().no_match_selected.connect(move |content: &Option<Content>| {
            *sink.lock() = content.clone();
        });

        type_text(&mut tribute, id, "@zz");
        assert_eq!(tribute.menu().placeholder(), Some(&Content::text("No Match Found!")));
        tribute.key_down(id, Key::Enter).unwrap();

        assert_eq!(*fallback.lock(), Some(Content::text("@zz")));
        assert_eq!(tribute.surface(id).unwrap().text(), "@zz");
    }

    #[test]
    fn test_disabled_no_match_closes() {
        let mut tribute = Tribute::new(
            TributeOptions::default(),
            vec![
                CollectionConfig::new()
                    .with_values(people())
                    .with_no_match_template(crate::template::NoMatchTemplate::text("")),
            ],
        )
        .unwrap();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@zz");
        assert!(!tribute.is_active());
    }

    #[test]
    fn test_select_template_none_suppresses() {
        let mut tribute = Tribute::new(
            TributeOptions::default(),
            vec![
                CollectionConfig::new()
                    .with_values(people())
                    .with_select_template(|_, _| None),
            ],
        )
        .unwrap();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@jo");
        tribute.key_down(id, Key::Enter).unwrap();
        assert_eq!(tribute.surface(id).unwrap().text(), "@jo");
    }

    #[test]
    fn test_active_changed_fires_on_change_only() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        tribute.signals().active_changed.connect(move |active: &bool| sink.lock().push(*active));

        type_text(&mut tribute, id, "@");
        tribute.key_down(id, Key::Escape).unwrap();
        tribute.key_down(id, Key::Escape).unwrap();
        assert_eq!(*changes.lock(), vec![true, false]);
    }

    #[test]
    fn test_append() {
        let mut tribute = tribute();
        tribute.append(0, vec![json!({"key": "Ann", "value": "ann"})], false).unwrap();
        assert_eq!(tribute.collection(0).unwrap().static_values().unwrap().len(), 4);
        tribute.append(0, Vec::new(), true).unwrap();
        assert!(tribute.collection(0).unwrap().static_values().unwrap().is_empty());

        assert!(matches!(
            tribute.append(3, Vec::new(), false),
            Err(MentionError::CollectionIndex { index: 3, count: 1 })
        ));
        assert!(matches!(
            tribute.append_current(Vec::new(), false),
            Err(MentionError::NoActiveSession)
        ));
    }

    #[test]
    fn test_append_rejects_provider() {
        let mut tribute = Tribute::<Value>::new(
            TributeOptions::default(),
            vec![CollectionConfig::new().with_provider(|_: &str, r: Responder<Value>| r.resolve(Vec::new()))],
        )
        .unwrap();
        assert!(matches!(
            tribute.append(0, Vec::new(), false),
            Err(MentionError::ValuesAreProvider { index: 0 })
        ));
    }

    #[test]
    fn test_click_outside_deferred() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@jo");
        let now = Instant::now();
        tribute.click_outside(now);
        assert!(tribute.is_active());
        tribute.tick(now).unwrap();
        assert!(!tribute.is_active());
    }

    #[test]
    fn test_resize_debounced() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@jo");
        let start = Instant::now();
        tribute.viewport_resized(Viewport::new(800.0, 600.0), start);
        tribute.tick(start + Duration::from_millis(5)).unwrap();
        assert!(tribute.is_active());
        tribute.tick(start + Duration::from_millis(10)).unwrap();
        assert!(!tribute.is_active());
    }

    #[test]
    fn test_container_scroll_ignored_without_container() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@jo");
        let start = Instant::now();
        tribute.scrolled(ScrollSource::Container, start);
        tribute.tick(start + Duration::from_millis(20)).unwrap();
        assert!(tribute.is_active());
        tribute.scrolled(ScrollSource::Window, start);
        tribute.tick(start + Duration::from_millis(20)).unwrap();
        assert!(!tribute.is_active());
    }

    #[test]
    fn test_unbind_releases_menu() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@jo");
        let now = Instant::now();
        let surface = tribute.unbind(id, now).unwrap();
        assert_eq!(surface.text(), "@jo");
        assert!(matches!(tribute.unbind(id, now), Err(MentionError::UnknownSurface)));
        tribute.tick(now).unwrap();
        assert!(!tribute.is_active());
        assert!(!tribute.menu().is_created());
    }

    #[test]
    fn test_unpositioned_menu() {
        let mut tribute = Tribute::new(
            TributeOptions::default().with_position_menu(false),
            vec![CollectionConfig::new().with_values(people())],
        )
        .unwrap();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@jo");
        assert_eq!(tribute.menu().placement(), Placement::Unpositioned);
    }

    #[test]
    fn test_detached_field_hides_panel() {
        let mut tribute = tribute();
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@jo");
        assert!(tribute.menu().is_open());
        assert_eq!(tribute.menu().placement(), Placement::Hidden);
    }

    #[test]
    fn test_multiple_triggers_pick_latest() {
        let mut tribute = Tribute::new(
            TributeOptions::default(),
            vec![
                CollectionConfig::new().with_values(people()),
                CollectionConfig::new()
                    .with_trigger("#")
                    .with_values(vec![json!({"key": "rust", "value": "rust"})]),
            ],
        )
        .unwrap();
        assert_eq!(tribute.triggers(), vec!["@", "#"]);
        let id = tribute.bind(HostSurface::Input(TextField::new(""))).unwrap();
        type_text(&mut tribute, id, "@jo and #ru");
        assert_eq!(tribute.session().collection(), Some(1));
        tribute.key_down(id, Key::Tab).unwrap();
        assert_eq!(tribute.surface(id).unwrap().text(), "@jo and #rust ");
    }

    #[test]
    fn test_dump_surface() {
        let mut tribute = tribute();
        let mut doc = DocumentTree::new();
        let root = doc.root();
        doc.append_text(root, "hi").unwrap();
        let id = tribute.bind(HostSurface::Rich(doc)).unwrap();
        let dump = tribute.dump_surface(id).unwrap();
        assert!(dump.contains("\"hi\""));
    }
}
