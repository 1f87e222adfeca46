use crossterm::event::{Event, KeyCode, KeyModifiers};
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear};

use super::{Component, centered};
use crate::theme;
use crate::ui::{UiFrame, safe_set_string};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Submitted(String),
    Cancelled,
}

/// Single-line text input in a centered box.
#[derive(Debug, Clone, Default)]
pub struct PromptOverlay {
    title: String,
    input: String,
    visible: bool,
}

impl PromptOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, title: impl Into<String>, initial: &str) {
        self.title = title.into();
        self.input = initial.to_string();
        self.visible = true;
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.input.clear();
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Edit the input; `Some` once the prompt is answered or dismissed.
    pub fn handle_prompt_event(&mut self, event: &Event) -> Option<PromptOutcome> {
        let Event::Key(key) = event else {
            return None;
        };
        match key.code {
            KeyCode::Enter => {
                let value = std::mem::take(&mut self.input);
                self.close();
                Some(PromptOutcome::Submitted(value))
            }
            KeyCode::Esc => {
                self.close();
                Some(PromptOutcome::Cancelled)
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.clear();
                None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.push(c);
                None
            }
            _ => None,
        }
    }
}

impl Component for PromptOverlay {
    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect) {
        if !self.visible || area.width == 0 || area.height == 0 {
            return;
        }
        let rect = centered(area, 50, 3);
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .title(self.title.as_str())
            .borders(Borders::ALL)
            .style(Style::default().bg(theme::dialog_bg()).fg(theme::dialog_fg()));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);
        if inner.width == 0 || inner.height == 0 {
            return;
        }
        // Keep the tail of long input in view.
        let room = inner.width.saturating_sub(1) as usize;
        let count = self.input.chars().count();
        let shown: String = self.input.chars().skip(count.saturating_sub(room)).collect();
        let buffer = frame.buffer_mut();
        let bounds = inner.intersection(buffer.area);
        safe_set_string(buffer, bounds, inner.x, inner.y, &shown, Style::default());
        let cursor_x = inner.x.saturating_add(shown.chars().count() as u16);
        safe_set_string(
            buffer,
            bounds,
            cursor_x,
            inner.y,
            " ",
            Style::default().add_modifier(Modifier::REVERSED),
        );
    }

    fn handle_event(&mut self, event: &Event) -> bool {
        if !self.visible {
            return false;
        }
        self.handle_prompt_event(event);
        true
    }
}
