use crossterm::event::{Event, KeyCode, MouseButton, MouseEventKind};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::{Component, centered, rect_contains};
use crate::theme;
use crate::ui::{UiFrame, safe_set_string};

const OK_LABEL: &str = "[ OK ]";

/// Modal alert. While visible it swallows every event; Enter, Esc or a click
/// on the button dismisses it.
#[derive(Debug, Clone)]
pub struct DialogOverlay {
    title: String,
    body: String,
    visible: bool,
    width: u16,
    dim_backdrop: bool,
    ok_rect: Option<Rect>,
    queued: Vec<String>,
}

impl DialogOverlay {
    pub fn new() -> Self {
        Self {
            title: "perfdesk".to_string(),
            body: String::new(),
            visible: false,
            width: 56,
            dim_backdrop: true,
            ok_rect: None,
            queued: Vec::new(),
        }
    }

    /// Show `body`, or queue it behind the alert already on screen.
    pub fn alert(&mut self, body: impl Into<String>) {
        let body = body.into();
        if self.visible {
            self.queued.push(body);
            return;
        }
        self.body = body;
        self.visible = true;
    }

    pub fn dismiss(&mut self) {
        self.ok_rect = None;
        if self.queued.is_empty() {
            self.visible = false;
            self.body.clear();
        } else {
            self.body = self.queued.remove(0);
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_dim_backdrop(&mut self, dim: bool) {
        self.dim_backdrop = dim;
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn rect_for(&self, area: Rect) -> Rect {
        let inner_width = self.width.saturating_sub(4).max(1) as usize;
        let body_rows = self.body.chars().count().div_ceil(inner_width).max(1) as u16;
        centered(area, self.width, body_rows + 5)
    }
}

impl Default for DialogOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for DialogOverlay {
    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect) {
        if !self.visible || area.width == 0 || area.height == 0 {
            return;
        }
        if self.dim_backdrop {
            let buffer = frame.buffer_mut();
            let dim = Style::default().add_modifier(Modifier::DIM);
            for y in area.y..area.y.saturating_add(area.height) {
                for x in area.x..area.x.saturating_add(area.width) {
                    if let Some(cell) = buffer.cell_mut((x, y)) {
                        cell.set_style(dim);
                    }
                }
            }
        }
        let rect = self.rect_for(area);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .title(self.title.as_str())
            .borders(Borders::ALL)
            .style(Style::default().bg(theme::dialog_bg()).fg(theme::dialog_fg()));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);
        if inner.height < 2 {
            return;
        }
        let body = Rect {
            height: inner.height.saturating_sub(2),
            ..inner
        };
        frame.render_widget(
            Paragraph::new(self.body.as_str())
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            body,
        );
        let button_y = inner.y.saturating_add(inner.height.saturating_sub(1));
        let width = OK_LABEL.len() as u16;
        let button_x = inner.x.saturating_add(inner.width.saturating_sub(width) / 2);
        let style = Style::default()
            .fg(theme::header_focused_fg())
            .bg(theme::header_focused_bg())
            .add_modifier(Modifier::BOLD);
        let buffer = frame.buffer_mut();
        let bounds = area.intersection(buffer.area);
        safe_set_string(buffer, bounds, button_x, button_y, OK_LABEL, style);
        self.ok_rect = Some(Rect::new(button_x, button_y, width, 1));
    }

    fn handle_event(&mut self, event: &Event) -> bool {
        if !self.visible {
            return false;
        }
        match event {
            Event::Key(key) if matches!(key.code, KeyCode::Enter | KeyCode::Esc) => {
                self.dismiss();
            }
            Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                if self
                    .ok_rect
                    .is_some_and(|rect| rect_contains(rect, mouse.column, mouse.row))
                {
                    self.dismiss();
                }
            }
            _ => {}
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn alerts_queue_behind_the_visible_one() {
        let mut dialog = DialogOverlay::new();
        dialog.alert("first");
        dialog.alert("second");
        assert_eq!(dialog.body(), "first");
        assert!(dialog.handle_event(&Event::Key(KeyEvent::from(KeyCode::Enter))));
        assert_eq!(dialog.body(), "second");
        dialog.handle_event(&Event::Key(KeyEvent::from(KeyCode::Esc)));
        assert!(!dialog.visible());
    }

    #[test]
    fn modal_swallows_unrelated_keys() {
        let mut dialog = DialogOverlay::new();
        assert!(!dialog.handle_event(&Event::Key(KeyEvent::from(KeyCode::Char('x')))));
        dialog.alert("Module \"gpu\" is not installed");
        assert!(dialog.handle_event(&Event::Key(KeyEvent::from(KeyCode::Char('x')))));
        assert!(dialog.visible());
    }

    #[test]
    fn renders_body_and_button() {
        let mut dialog = DialogOverlay::new();
        dialog.set_dim_backdrop(false);
        dialog.alert("hello");
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).expect("terminal");
        terminal
            .draw(|frame| {
                let area = frame.area();
                dialog.render(&mut UiFrame::new(frame), area);
            })
            .expect("draw");
        let buffer = terminal.backend().buffer();
        let text: String = (0..buffer.area.height)
            .flat_map(|y| (0..buffer.area.width).map(move |x| (x, y)))
            .map(|pos| buffer[pos].symbol().to_string())
            .collect();
        assert!(text.contains("hello"));
        assert!(text.contains(OK_LABEL));
    }
}
