//! Settings window: borrows one backend's settings panel at a time from the
//! detached pool and gives it back on refresh, close or a change of backend.

use crossterm::event::{MouseButton, MouseEventKind};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use serde_json::Value;

use crate::panels::PanelId;
use crate::theme;
use crate::window::{ContentEvent, ContentMarkup, WindowContent, WindowCx};

const PROMPT: &str = "Please select a backend...";
const HINT: &str = "Select a backend first to be able to change its settings.";

#[derive(Debug, Default)]
pub struct SettingsWindow {
    backends: Vec<PanelId>,
    current: Option<PanelId>,
}

impl SettingsWindow {
    pub fn current(&self) -> Option<&PanelId> {
        self.current.as_ref()
    }

    /// Rows before the first backend entry.
    const LIST_START: usize = 1;

    fn give_back(&mut self, cx: &mut WindowCx<'_>) {
        if let Some(panel) = self.current.take() {
            let owner = cx.id().clone();
            cx.panels_mut().release(&panel, &owner);
        }
    }

    fn redraw(&self, cx: &mut WindowCx<'_>, error: Option<String>) {
        let mut lines = vec![Line::styled(
            PROMPT,
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for id in &self.backends {
            let backend = cx
                .panels()
                .get(id)
                .map(|panel| panel.backend().to_string())
                .unwrap_or_else(|| id.to_string());
            let marker = if self.current.as_ref() == Some(id) { "●" } else { "○" };
            lines.push(Line::from(format!(" {marker} {backend}")));
        }
        lines.push(Line::from(""));
        match self.current.as_ref().and_then(|id| cx.panels().get(id)) {
            Some(panel) => {
                let values: Vec<Line<'static>> = panel
                    .values()
                    .iter()
                    .map(|(key, value)| Line::from(format!("{key}: {value}")))
                    .collect();
                if values.is_empty() {
                    lines.push(Line::styled("No settings.", theme::muted_text()));
                }
                lines.extend(values);
            }
            None => lines.push(Line::styled(HINT, theme::muted_text())),
        }
        if let Some(error) = error {
            lines.push(Line::styled(error, theme::error_text()));
        }
        cx.set_lines(lines);
    }

    /// Switch to the panel at `index` in the backend list.
    pub fn select(&mut self, cx: &mut WindowCx<'_>, index: usize) -> bool {
        let Some(panel) = self.backends.get(index).cloned() else {
            return false;
        };
        if self.current.as_ref() == Some(&panel) {
            return true;
        }
        let error = match cx.swap_panel(self.current.as_ref(), &panel) {
            Ok(()) => {
                self.current = Some(panel);
                None
            }
            Err(err) => {
                tracing::warn!(window_id = %cx.id(), error = %err, "could not borrow settings panel");
                // The previous panel was already given back.
                self.current = None;
                Some(err.to_string())
            }
        };
        self.redraw(cx, error);
        true
    }
}

impl WindowContent for SettingsWindow {
    fn kind(&self) -> &'static str {
        "settings"
    }

    fn content_code(&self) -> ContentMarkup {
        ContentMarkup::from_text(HINT)
    }

    fn title(&self) -> String {
        "Settings".to_string()
    }

    fn setup(&mut self, cx: &mut WindowCx<'_>, _data: &Value, _is_refresh: bool) {
        self.current = None;
        self.backends = cx.panels().ids().cloned().collect();
        self.redraw(cx, None);
        cx.hide_loading();
    }

    fn prepare_refresh(&mut self, cx: &mut WindowCx<'_>, _data: &Value) {
        self.give_back(cx);
    }

    fn prepare_close(&mut self, cx: &mut WindowCx<'_>) {
        self.give_back(cx);
    }

    fn start_resize(&mut self, _cx: &mut WindowCx<'_>) -> bool {
        false
    }

    fn finish_resize(&mut self, _cx: &mut WindowCx<'_>) {}

    fn handle_event(&mut self, cx: &mut WindowCx<'_>, event: &ContentEvent) -> bool {
        let ContentEvent::Mouse {
            kind: MouseEventKind::Down(MouseButton::Left),
            row,
            ..
        } = *event
        else {
            return false;
        };
        match (row as usize).checked_sub(Self::LIST_START) {
            Some(index) => self.select(cx, index),
            None => false,
        }
    }
}
