//! `UiFrame`: a `ratatui::Frame` wrapper that clips every draw call to the
//! visible area, so windows dragged partly off-screen can't write out of
//! bounds.
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;

use crate::window::FloatRect;

pub struct UiFrame<'a> {
    area: Rect,
    buffer: &'a mut Buffer,
}

impl<'a> UiFrame<'a> {
    pub fn new(frame: &'a mut Frame<'_>) -> Self {
        let area = frame.area();
        let buffer = frame.buffer_mut();
        Self { area, buffer }
    }

    /// Offscreen frame: windows draw at their logical size here before being
    /// composited onto the terminal buffer.
    pub(crate) fn from_parts(area: Rect, buffer: &'a mut Buffer) -> Self {
        Self { area, buffer }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        self.buffer
    }

    pub fn render_widget<W: Widget>(&mut self, widget: W, area: Rect) {
        let clipped = area.intersection(self.area);
        if !clipped.is_empty() {
            widget.render(clipped, self.buffer);
        }
    }

    /// Copy an offscreen window buffer (origin at 0,0) to `dest`, which may
    /// start left of or above the frame.
    pub fn composite(&mut self, src: &Buffer, dest: FloatRect) {
        let left = self.area.x as i32;
        let top = self.area.y as i32;
        let right = self.area.right() as i32;
        let bottom = self.area.bottom() as i32;
        let rows = (dest.y.max(top)..(dest.y + dest.height as i32).min(bottom))
            .map(|dy| (dy, dy - dest.y));
        for (dy, sy) in rows {
            for dx in dest.x.max(left)..(dest.x + dest.width as i32).min(right) {
                let sx = dx - dest.x;
                if let (Some(src_cell), Some(dst_cell)) = (
                    src.cell((sx as u16, sy as u16)),
                    self.buffer.cell_mut((dx as u16, dy as u16)),
                ) {
                    *dst_cell = src_cell.clone();
                }
            }
        }
    }
}

/// Write `text` at (x, y), cut at the right edge of `bounds`. Positions
/// outside `bounds` are ignored.
pub(crate) fn safe_set_string(
    buffer: &mut Buffer,
    bounds: Rect,
    x: u16,
    y: u16,
    text: &str,
    style: Style,
) {
    if x < bounds.x || x >= bounds.right() || y < bounds.y || y >= bounds.bottom() {
        return;
    }
    let available = bounds.right() - x;
    buffer.set_string(x, y, truncate_to_width(text, available as usize), style);
}

pub(crate) fn truncate_to_width(value: &str, width: usize) -> String {
    value.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use ratatui::widgets::Block;

    use super::*;

    fn filled(area: Rect, symbol: &str) -> Buffer {
        let mut buffer = Buffer::empty(area);
        for cell in buffer.content.iter_mut() {
            cell.set_symbol(symbol);
        }
        buffer
    }

    fn row(buffer: &Buffer, y: u16) -> String {
        (buffer.area.x..buffer.area.right())
            .map(|x| buffer[(x, y)].symbol())
            .collect()
    }

    #[test]
    fn composite_clips_a_window_hanging_off_the_left() {
        let area = Rect::new(0, 0, 4, 2);
        let mut dest = Buffer::empty(area);
        let mut frame = UiFrame::from_parts(area, &mut dest);
        let src = filled(Rect::new(0, 0, 3, 2), "#");
        frame.composite(&src, FloatRect { x: -1, y: -1, width: 3, height: 2 });
        assert_eq!(row(&dest, 0), "##  ");
        assert_eq!(row(&dest, 1), "    ");
    }

    #[test]
    fn composite_outside_the_frame_is_a_no_op() {
        let area = Rect::new(0, 0, 3, 3);
        let mut dest = filled(area, ".");
        let mut frame = UiFrame::from_parts(area, &mut dest);
        let src = filled(Rect::new(0, 0, 2, 2), "#");
        frame.composite(&src, FloatRect { x: -5, y: 1, width: 2, height: 2 });
        frame.composite(&src, FloatRect { x: 1, y: 7, width: 2, height: 2 });
        assert!((0..3).all(|y| row(&dest, y) == "..."));
    }

    #[test]
    fn widgets_are_clipped_to_the_frame() {
        let area = Rect::new(0, 0, 5, 3);
        let mut buffer = Buffer::empty(area);
        let mut frame = UiFrame::from_parts(area, &mut buffer);
        frame.render_widget(Block::bordered(), Rect::new(3, 1, 5, 5));
        assert_eq!(row(&buffer, 0), "     ");
        assert_eq!(row(&buffer, 1), "   ┌┐");
        assert_eq!(row(&buffer, 2), "   └┘");
    }

    #[test]
    fn strings_stop_at_the_bounds() {
        let bounds = Rect::new(0, 0, 6, 1);
        let mut buffer = Buffer::empty(bounds);
        safe_set_string(&mut buffer, bounds, 2, 0, "abcdef", Style::default());
        safe_set_string(&mut buffer, bounds, 9, 0, "x", Style::default());
        assert_eq!(row(&buffer, 0), "  abcd");
        assert_eq!(truncate_to_width("ab", 5), "ab");
    }
}
