use crate::geometry::Rect;
use crate::template::Content;
use crate::trigger::TriggerInfo;

use super::{HostSurface, SelectionAnchor, SurfaceAdapter};

/// Adapter used while no surface is current. Every capability is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct InertAdapter;

impl SurfaceAdapter for InertAdapter {
    fn name(&self) -> &'static str {
        "inert"
    }

    fn text_preceding_cursor(&self, _surface: &HostSurface) -> Option<String> {
        None
    }

    fn selection_anchor(&self, _surface: &HostSurface) -> Option<SelectionAnchor> {
        None
    }

    fn caret_rect(&self, _surface: &HostSurface, _position: usize) -> Option<Rect> {
        None
    }

    fn replace_range(&self, _surface: &mut HostSurface, _info: &TriggerInfo, _content: &Content) -> bool {
        false
    }

    fn insert_at_cursor(&self, _surface: &mut HostSurface, _text: &str) -> bool {
        false
    }

    fn count_mentions(&self, _surface: &HostSurface, _trigger: &str, _composing: Option<usize>) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Size, Viewport};
    use crate::surface::TextField;

    #[test]
    fn test_everything_unavailable() {
        let mut surface = HostSurface::Input(TextField::new("Hello @jo").with_bounds(Rect::new(0.0, 0.0, 100.0, 20.0)));
        let adapter = InertAdapter;
        assert!(adapter.text_preceding_cursor(&surface).is_none());
        assert!(adapter.selection_anchor(&surface).is_none());
        assert!(
            adapter
                .coordinates(&surface, 0, Size::new(10.0, 10.0), &Viewport::default())
                .is_none()
        );
        assert!(!adapter.insert_at_cursor(&mut surface, "@"));
        assert_eq!(adapter.count_mentions(&surface, "@", None), 0);
        assert_eq!(surface.text(), "Hello @jo");
    }
}
