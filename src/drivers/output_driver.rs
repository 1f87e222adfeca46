use std::io;

use ratatui::backend::Backend;
use ratatui::layout::Rect;

use crate::ui::UiFrame;

pub trait OutputDriver {
    type Backend: Backend;

    fn enter(&mut self) -> io::Result<()>;
    fn exit(&mut self) -> io::Result<()>;

    /// Current drawable area, used as the desktop viewport.
    fn area(&self) -> io::Result<Rect>;

    fn draw<F>(&mut self, f: F) -> io::Result<()>
    where
        F: FnOnce(UiFrame<'_>);
}
