//! Input events and notifications.
//!
//! The host feeds [`Key`]s and clicks into the controller and listens on
//! [`TributeSignals`]. Notifications are fire-and-forget: slots run
//! synchronously during the emitting call and cannot reach back into the
//! controller.

use horizon_mention_core::Signal;

use crate::filter::FilteredItem;
use crate::session::SessionSnapshot;
use crate::surface::SurfaceId;
use crate::template::Content;
use crate::trigger::TriggerInfo;

/// A key as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Tab,
    Escape,
    Up,
    Down,
    Space,
    Backspace,
    Delete,
    Character(char),
    Other,
}

impl Key {
    /// Whether the key drives the menu rather than the query.
    pub fn is_command(self) -> bool {
        matches!(
            self,
            Self::Enter | Self::Tab | Self::Escape | Self::Up | Self::Down | Self::Space | Self::Backspace
        )
    }

    /// The character the key types, if any.
    pub fn character(self) -> Option<char> {
        match self {
            Self::Space => Some(' '),
            Self::Character(c) => Some(c),
            _ => None,
        }
    }
}

/// What caused a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(Key),
    /// A click on the menu entry at `index`.
    Click { index: usize },
    /// A direct call from the host.
    Programmatic,
}

/// Where a scroll happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollSource {
    /// The page.
    Window,
    /// The host container the menu lives in.
    Container,
}

/// Payload of [`TributeSignals::replaced`].
#[derive(Debug, Clone)]
pub struct MentionReplaced<T> {
    /// The committed item.
    pub item: FilteredItem<T>,
    /// The session as it was at commit time.
    pub session: SessionSnapshot,
    /// The detection the replacement was applied to.
    pub context: TriggerInfo,
    pub event: InputEvent,
    pub surface: SurfaceId,
}

/// Identifies the panel in [`TributeSignals::no_match`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelHandle {
    pub container_class: String,
    pub surface: Option<SurfaceId>,
}

/// Notifications emitted by [`Tribute`](crate::Tribute).
pub struct TributeSignals<T: Clone + Send + 'static> {
    /// A mention was committed into a surface.
    pub replaced: Signal<MentionReplaced<T>>,
    /// A commit happened with nothing selected; carries the fallback content.
    pub no_match_selected: Signal<Option<Content>>,
    /// Filtering produced no candidates.
    pub no_match: Signal<PanelHandle>,
    /// The controller became active or inactive.
    pub active_changed: Signal<bool>,
    /// A surface's text was changed by the engine.
    pub surface_changed: Signal<SurfaceId>,
    /// The page should scroll to this vertical offset to reveal the menu.
    pub scroll_requested: Signal<f32>,
}

impl<T: Clone + Send + 'static> TributeSignals<T> {
    pub fn new() -> Self {
        Self {
            replaced: Signal::new(),
            no_match_selected: Signal::new(),
            no_match: Signal::new(),
            active_changed: Signal::new(),
            surface_changed: Signal::new(),
            scroll_requested: Signal::new(),
        }
    }
}

impl<T: Clone + Send + 'static> Default for TributeSignals<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_keys() {
        for key in [Key::Enter, Key::Tab, Key::Escape, Key::Up, Key::Down, Key::Space, Key::Backspace] {
            assert!(key.is_command(), "{key:?}");
        }
        assert!(!Key::Character('a').is_command());
        assert!(!Key::Delete.is_command());
    }

    #[test]
    fn test_key_character() {
        assert_eq!(Key::Space.character(), Some(' '));
        assert_eq!(Key::Character('@').character(), Some('@'));
        assert_eq!(Key::Enter.character(), None);
    }
}
