//! Source file viewer.

use crossterm::event::MouseEventKind;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;
use serde_json::Value;

use super::{failure_line, show_error};
use crate::session::form;
use crate::theme;
use crate::transport::{Reply, ResponseKind};
use crate::ui::UiFrame;
use crate::window::{ContentEvent, ContentMarkup, WindowContent, WindowCx};

#[derive(Debug)]
pub struct CodeWindow {
    file: String,
    scroll: u16,
}

impl CodeWindow {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            scroll: 0,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }
}

/// `source` as numbered lines, the gutter sized to the largest number.
pub fn numbered_lines(source: &str) -> Vec<Line<'static>> {
    let count = source.lines().count();
    let gutter = count.max(1).to_string().len();
    source
        .lines()
        .enumerate()
        .map(|(index, text)| {
            Line::from(vec![
                Span::styled(format!("{:>gutter$} │ ", index + 1), theme::muted_text()),
                Span::raw(text.replace('\t', "    ")),
            ])
        })
        .collect()
}

impl WindowContent for CodeWindow {
    fn kind(&self) -> &'static str {
        "code"
    }

    fn content_code(&self) -> ContentMarkup {
        ContentMarkup::new()
    }

    fn title(&self) -> String {
        format!("Source: {}", self.file)
    }

    fn setup(&mut self, cx: &mut WindowCx<'_>, _data: &Value, _is_refresh: bool) {
        self.scroll = 0;
        match cx.request(form([("src", self.file.as_str())]), ResponseKind::Text) {
            Ok(request) => {
                cx.send("src", request);
            }
            Err(err) => show_error(cx, Line::styled(err.to_string(), theme::error_text())),
        }
    }

    fn prepare_refresh(&mut self, _cx: &mut WindowCx<'_>, _data: &Value) {}

    fn prepare_close(&mut self, _cx: &mut WindowCx<'_>) {}

    fn start_resize(&mut self, _cx: &mut WindowCx<'_>) -> bool {
        false
    }

    fn finish_resize(&mut self, _cx: &mut WindowCx<'_>) {}

    fn on_response(&mut self, cx: &mut WindowCx<'_>, reply: Reply) {
        match reply.result {
            Ok(response) => match response.as_text() {
                Some(source) => {
                    cx.set_lines(numbered_lines(source));
                    cx.hide_loading();
                }
                None => show_error(
                    cx,
                    Line::styled("The source code is not plain text", theme::error_text()),
                ),
            },
            Err(failure) => show_error(
                cx,
                failure_line(&format!("the source of {}", self.file), &failure),
            ),
        }
    }

    fn handle_event(&mut self, cx: &mut WindowCx<'_>, event: &ContentEvent) -> bool {
        let ContentEvent::Mouse { kind, .. } = *event else {
            return false;
        };
        let last = cx.markup().len().saturating_sub(1) as u16;
        match kind {
            MouseEventKind::ScrollDown => {
                self.scroll = (self.scroll + 1).min(last);
                true
            }
            MouseEventKind::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect, markup: &ContentMarkup, _focused: bool) {
        frame.render_widget(
            Paragraph::new(Text::from(markup.lines().to_vec()))
                .style(Style::default())
                .scroll((self.scroll, 0)),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gutter_width_follows_line_count() {
        let source = (1..=12).map(|n| format!("l{n}")).collect::<Vec<_>>().join("\n");
        let lines = numbered_lines(&source);
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0].to_string(), " 1 │ l1");
        assert_eq!(lines[11].to_string(), "12 │ l12");
    }

    #[test]
    fn tabs_expand_to_spaces() {
        let lines = numbered_lines("\tx");
        assert_eq!(lines[0].to_string(), "1 │     x");
    }
}
