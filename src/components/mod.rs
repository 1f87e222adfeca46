//! Host-side widgets drawn over the desktop: modal alert, title prompt and
//! footer.

use crossterm::event::Event;
use ratatui::layout::Rect;

use crate::ui::UiFrame;

pub mod dialog_overlay;
pub mod prompt_overlay;
pub mod status_bar;

pub use dialog_overlay::DialogOverlay;
pub use prompt_overlay::{PromptOutcome, PromptOverlay};
pub use status_bar::{FooterTone, StatusBar};

pub trait Component {
    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect);

    fn handle_event(&mut self, _event: &Event) -> bool {
        false
    }
}

pub(crate) fn rect_contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

/// `width`×`height` centered in `area`, shrunk to fit.
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = area.width.min(width).max(1);
    let height = area.height.min(height).max(1);
    Rect {
        x: area.x.saturating_add(area.width.saturating_sub(width) / 2),
        y: area.y.saturating_add(area.height.saturating_sub(height) / 2),
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;

    impl Component for Inert {
        fn render(&mut self, _frame: &mut UiFrame<'_>, _area: Rect) {}
    }

    #[test]
    fn default_handle_event_returns_false() {
        let event = Event::Key(crossterm::event::KeyEvent::from(
            crossterm::event::KeyCode::Char('a'),
        ));
        assert!(!Inert.handle_event(&event));
    }

    #[test]
    fn centered_rect_fits_small_areas() {
        let rect = centered(Rect::new(0, 0, 10, 2), 40, 7);
        assert_eq!(rect, Rect::new(0, 0, 10, 2));
        let rect = centered(Rect::new(0, 0, 80, 24), 40, 8);
        assert_eq!(rect, Rect::new(20, 8, 40, 8));
    }
}
