//! Header dragging. At most one drag is active; the window follows the pointer
//! at the offset where the header was grabbed.

use super::{FloatRect, WindowId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDrag {
    pub id: WindowId,
    pub offset_x: i32,
    pub offset_y: i32,
}

#[derive(Debug, Default)]
pub struct DragController {
    active: Option<HeaderDrag>,
}

impl DragController {
    /// Start dragging `id`, grabbed at `(column, row)` while it occupies
    /// `rect`. Replaces any drag still in flight.
    pub fn begin(&mut self, id: WindowId, rect: FloatRect, column: u16, row: u16) {
        let drag = HeaderDrag {
            id,
            offset_x: column as i32 - rect.x,
            offset_y: row as i32 - rect.y,
        };
        tracing::trace!(window_id = %drag.id, drag.offset_x, drag.offset_y, "drag started");
        self.active = Some(drag);
    }

    pub fn active(&self) -> Option<&HeaderDrag> {
        self.active.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Origin the dragged window should take for a pointer at
    /// `(column, row)`.
    pub fn origin_for(&self, column: u16, row: u16) -> Option<(&WindowId, i32, i32)> {
        self.active.as_ref().map(|drag| {
            (
                &drag.id,
                column as i32 - drag.offset_x,
                row as i32 - drag.offset_y,
            )
        })
    }

    pub fn end(&mut self) -> Option<HeaderDrag> {
        self.active.take()
    }

    /// Drop the drag if it belongs to `id`.
    pub(crate) fn cancel_for(&mut self, id: &WindowId) {
        if self.active.as_ref().is_some_and(|drag| &drag.id == id) {
            self.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_keeps_grab_offset() {
        let mut drag = DragController::default();
        let rect = FloatRect {
            x: 10,
            y: 4,
            width: 20,
            height: 6,
        };
        drag.begin(WindowId::compose("code", None, 0), rect, 15, 4);
        let (_, x, y) = drag.origin_for(3, 1).expect("active");
        assert_eq!((x, y), (-2, 1));
        assert!(drag.end().is_some());
        assert!(drag.origin_for(3, 1).is_none());
    }

    #[test]
    fn cancel_only_affects_matching_window() {
        let mut drag = DragController::default();
        let rect = FloatRect {
            x: 0,
            y: 0,
            width: 20,
            height: 6,
        };
        drag.begin(WindowId::compose("code", None, 0), rect, 1, 0);
        drag.cancel_for(&WindowId::compose("code", None, 1));
        assert!(drag.is_dragging());
        drag.cancel_for(&WindowId::compose("code", None, 0));
        assert!(!drag.is_dragging());
    }
}
