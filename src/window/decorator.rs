use ratatui::buffer::Buffer;
use ratatui::prelude::Rect;
use ratatui::style::{Modifier, Style};

use super::{FloatRect, HeaderTone};
use crate::theme;
use crate::ui::safe_set_string;

/// What a press on a window's frame means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    Refresh,
    Visibility,
    EditTitle,
    Close,
    Drag,
    None,
}

/// Per-frame inputs for drawing a window's chrome.
#[derive(Debug, Clone, Copy)]
pub struct Chrome<'a> {
    pub title: &'a str,
    pub tone: HeaderTone,
    pub collapsed: bool,
}

pub trait WindowDecorator: std::fmt::Debug {
    /// Draw header, borders and grip into `buffer`, whose area is the window
    /// in its own coordinates.
    fn render_window(&self, buffer: &mut Buffer, area: Rect, chrome: Chrome<'_>);

    fn hit_test(&self, rect: FloatRect, column: u16, row: u16) -> HeaderAction;

    /// Whether `(column, row)` is on the resize grip.
    fn grip_hit(&self, rect: FloatRect, column: u16, row: u16) -> bool;

    /// Content area of a window occupying `rect`.
    fn content_rect(&self, rect: FloatRect) -> FloatRect;
}

/// One-row header bar with the title on the left and the reset, visibility,
/// edit-title and close controls on the right. The bottom-right corner cell
/// is the resize grip.
#[derive(Debug, Default)]
pub struct HeaderBarDecorator;

const CONTROL_WIDTH: u16 = 2;
const CONTROLS: [HeaderAction; 4] = [
    HeaderAction::Refresh,
    HeaderAction::Visibility,
    HeaderAction::EditTitle,
    HeaderAction::Close,
];

impl HeaderBarDecorator {
    /// Column offset of the first control cell inside the window.
    fn controls_start(width: u16) -> u16 {
        width.saturating_sub(1 + CONTROL_WIDTH * CONTROLS.len() as u16)
    }

    fn glyph(action: HeaderAction, collapsed: bool) -> &'static str {
        match action {
            HeaderAction::Refresh => "⟳",
            HeaderAction::Visibility if collapsed => "▸",
            HeaderAction::Visibility => "▾",
            HeaderAction::EditTitle => "✎",
            HeaderAction::Close => "✕",
            HeaderAction::Drag | HeaderAction::None => " ",
        }
    }
}

impl WindowDecorator for HeaderBarDecorator {
    fn render_window(&self, buffer: &mut Buffer, area: Rect, chrome: Chrome<'_>) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let header_style = match chrome.tone {
            HeaderTone::Focused => Style::default()
                .bg(theme::header_focused_bg())
                .fg(theme::header_focused_fg())
                .add_modifier(Modifier::BOLD),
            HeaderTone::Unfocused => Style::default()
                .bg(theme::header_unfocused_bg())
                .fg(theme::header_unfocused_fg()),
        };
        let border_style = Style::default().fg(theme::window_border());

        let left = area.x;
        let right = area.x + area.width - 1;
        let top = area.y;
        let bottom = area.y + area.height - 1;

        // Header
        for x in left..=right {
            if let Some(cell) = buffer.cell_mut((x, top)) {
                cell.set_symbol(" ");
                cell.set_style(header_style);
            }
        }
        let controls_x = left + Self::controls_start(area.width);
        let title_width = controls_x.saturating_sub(left + 1);
        safe_set_string(
            buffer,
            Rect::new(left + 1, top, title_width, 1),
            left + 1,
            top,
            chrome.title,
            header_style,
        );
        for (index, action) in CONTROLS.iter().enumerate() {
            let x = controls_x + index as u16 * CONTROL_WIDTH;
            safe_set_string(
                buffer,
                area,
                x,
                top,
                Self::glyph(*action, chrome.collapsed),
                header_style,
            );
        }

        if area.height == 1 {
            safe_set_string(buffer, area, right, top, "◢", header_style);
            return;
        }

        // Sides and bottom
        for y in top + 1..bottom {
            for x in [left, right] {
                if let Some(cell) = buffer.cell_mut((x, y)) {
                    cell.set_symbol("│");
                    cell.set_style(border_style);
                }
            }
        }
        for x in left..=right {
            if let Some(cell) = buffer.cell_mut((x, bottom)) {
                let symbol = if x == left {
                    "└"
                } else if x == right {
                    "◢"
                } else {
                    "─"
                };
                cell.set_symbol(symbol);
                cell.set_style(border_style);
            }
        }
    }

    fn hit_test(&self, rect: FloatRect, column: u16, row: u16) -> HeaderAction {
        if row as i32 != rect.y || !rect.contains(column, row) {
            return HeaderAction::None;
        }
        let offset = (column as i32 - rect.x) as u16;
        if offset == rect.width.saturating_sub(1) {
            return HeaderAction::None;
        }
        let start = Self::controls_start(rect.width);
        if offset >= start {
            let index = ((offset - start) / CONTROL_WIDTH) as usize;
            return CONTROLS.get(index).copied().unwrap_or(HeaderAction::None);
        }
        HeaderAction::Drag
    }

    fn grip_hit(&self, rect: FloatRect, column: u16, row: u16) -> bool {
        column as i32 == rect.right() && row as i32 == rect.bottom()
    }

    fn content_rect(&self, rect: FloatRect) -> FloatRect {
        if rect.height <= 2 || rect.width <= 2 {
            return FloatRect {
                x: rect.x,
                y: rect.y + 1,
                width: 0,
                height: 0,
            };
        }
        FloatRect {
            x: rect.x + 1,
            y: rect.y + 1,
            width: rect.width - 2,
            height: rect.height - 2,
        }
    }
}
