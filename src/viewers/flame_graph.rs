//! Flame graph of one thread, drawn as an indented frame tree whose bars are
//! proportional to each frame's share of samples.

use std::collections::BTreeSet;

use crossterm::event::{MouseButton, MouseEventKind};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;
use serde::Deserialize;
use serde_json::{Value, json};

use super::code::CodeWindow;
use super::{decode, failure_line, show_error};
use crate::menu::MenuItem;
use crate::session::form;
use crate::theme;
use crate::transport::{Reply, ResponseKind};
use crate::ui::UiFrame;
use crate::window::{ContentEvent, ContentMarkup, OpenOptions, WindowContent, WindowCx};

/// A frame in the d3-flame-graph layout the data source produces.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlameNode {
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub children: Vec<FlameNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    Frame { file: Option<String> },
    /// Children of the frame at `parent` that fell under the threshold.
    Collapsed { parent: Vec<usize>, count: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlameRow {
    pub depth: usize,
    pub name: String,
    pub share: f64,
    pub kind: RowKind,
}

/// Flatten `node` depth first. Children below `threshold` of the root's value
/// fold into one collapsed row unless their parent's path is in `expanded`.
fn build_rows(
    node: &FlameNode,
    path: &mut Vec<usize>,
    total: f64,
    threshold: f64,
    expanded: &BTreeSet<Vec<usize>>,
    rows: &mut Vec<FlameRow>,
) {
    let depth = path.len();
    rows.push(FlameRow {
        depth,
        name: node.name.clone(),
        share: share(node.value, total),
        kind: RowKind::Frame {
            file: node.file.clone(),
        },
    });
    let show_all = threshold <= 0.0 || expanded.contains(path);
    let mut hidden = 0usize;
    let mut hidden_share = 0.0;
    for (index, child) in node.children.iter().enumerate() {
        let child_share = share(child.value, total);
        if !show_all && child_share < threshold {
            hidden += 1;
            hidden_share += child_share;
            continue;
        }
        path.push(index);
        build_rows(child, path, total, threshold, expanded, rows);
        path.pop();
    }
    if hidden > 0 {
        rows.push(FlameRow {
            depth: depth + 1,
            name: format!("[{hidden} collapsed]"),
            share: hidden_share,
            kind: RowKind::Collapsed {
                parent: path.clone(),
                count: hidden,
            },
        });
    }
}

fn share(value: f64, total: f64) -> f64 {
    if total > 0.0 { value / total } else { 0.0 }
}

#[derive(Debug)]
pub struct FlameGraphWindow {
    pid: String,
    tid: String,
    threshold: f64,
    root: Option<FlameNode>,
    expanded: BTreeSet<Vec<usize>>,
    rows: Vec<FlameRow>,
    scroll: usize,
}

impl FlameGraphWindow {
    pub fn new(pid: impl Into<String>, tid: impl Into<String>, threshold: f64) -> Self {
        Self {
            pid: pid.into(),
            tid: tid.into(),
            threshold,
            root: None,
            expanded: BTreeSet::new(),
            rows: Vec::new(),
            scroll: 0,
        }
    }

    /// Build from a `{"pid", "tid", "threshold"}` payload.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let field = |key: &str| match payload.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        };
        let threshold = payload
            .get("threshold")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        Some(Self::new(field("pid")?, field("tid")?, threshold))
    }

    pub fn rows(&self) -> &[FlameRow] {
        &self.rows
    }

    fn rebuild(&mut self) {
        self.rows.clear();
        if let Some(root) = &self.root {
            let total = root.value;
            build_rows(
                root,
                &mut Vec::new(),
                total,
                self.threshold,
                &self.expanded,
                &mut self.rows,
            );
        }
        self.scroll = self.scroll.min(self.rows.len().saturating_sub(1));
    }

    fn row_at(&self, content_row: u16) -> Option<usize> {
        let index = content_row as usize + self.scroll;
        (index < self.rows.len()).then_some(index)
    }

    fn row_line(row: &FlameRow, width: u16) -> Line<'static> {
        let indent = "  ".repeat(row.depth);
        let avail = (width as usize).saturating_sub(indent.len());
        let text = format!("{} {:.1}%", row.name, row.share * 100.0);
        let bar = ((row.share * avail as f64).round() as usize).clamp(1, avail.max(1));
        let style = match row.kind {
            RowKind::Frame { .. } => Style::default()
                .bg(theme::flame_frame(row.depth))
                .fg(Color::Black),
            RowKind::Collapsed { .. } => theme::muted_text(),
        };
        let chars: Vec<char> = text.chars().collect();
        let (inside, outside): (String, String) = if chars.len() >= bar {
            (
                chars[..bar].iter().collect(),
                chars[bar..].iter().collect(),
            )
        } else {
            (format!("{text:<bar$}"), String::new())
        };
        Line::from(vec![
            Span::raw(indent),
            Span::styled(inside, style),
            Span::raw(outside),
        ])
    }
}

impl WindowContent for FlameGraphWindow {
    fn kind(&self) -> &'static str {
        "flame_graph"
    }

    fn content_code(&self) -> ContentMarkup {
        ContentMarkup::new()
    }

    fn title(&self) -> String {
        if self.threshold > 0.0 {
            format!(
                "Flame graph (PID: {}, TID: {}, collapsed < {:.0}%)",
                self.pid,
                self.tid,
                self.threshold * 100.0
            )
        } else {
            format!("Flame graph (PID: {}, TID: {})", self.pid, self.tid)
        }
    }

    fn setup(&mut self, cx: &mut WindowCx<'_>, _data: &Value, _is_refresh: bool) {
        self.root = None;
        self.expanded.clear();
        self.rows.clear();
        self.scroll = 0;
        let fields = form([
            ("pid", self.pid.clone()),
            ("tid", self.tid.clone()),
            ("threshold", self.threshold.to_string()),
        ]);
        match cx.request(fields, ResponseKind::Json) {
            Ok(request) => {
                cx.send("flame_graph", request);
            }
            Err(err) => show_error(cx, Line::styled(err.to_string(), theme::error_text())),
        }
    }

    fn prepare_refresh(&mut self, _cx: &mut WindowCx<'_>, _data: &Value) {}

    fn prepare_close(&mut self, _cx: &mut WindowCx<'_>) {}

    fn start_resize(&mut self, _cx: &mut WindowCx<'_>) -> bool {
        true
    }

    fn finish_resize(&mut self, cx: &mut WindowCx<'_>) {
        tracing::trace!(window_id = %cx.id(), rows = self.rows.len(), "flame graph resized");
    }

    fn on_response(&mut self, cx: &mut WindowCx<'_>, reply: Reply) {
        let result = reply.result.map_err(|failure| failure_line("the flame graph", &failure));
        match result.and_then(|response| {
            decode::<FlameNode>(response)
                .map_err(|err| Line::styled(err.to_string(), theme::error_text()))
        }) {
            Ok(root) => {
                self.root = Some(root);
                self.rebuild();
                tracing::debug!(window_id = %cx.id(), frames = self.rows.len(), "flame graph loaded");
                cx.hide_loading();
            }
            Err(line) => show_error(cx, line),
        }
    }

    fn handle_event(&mut self, cx: &mut WindowCx<'_>, event: &ContentEvent) -> bool {
        let ContentEvent::Mouse {
            kind,
            row,
            screen_column,
            screen_row,
            ..
        } = *event
        else {
            return false;
        };
        match kind {
            MouseEventKind::ScrollDown => {
                self.scroll = (self.scroll + 1).min(self.rows.len().saturating_sub(1));
                true
            }
            MouseEventKind::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(1);
                true
            }
            MouseEventKind::Down(button) => {
                let Some(index) = self.row_at(row) else {
                    return false;
                };
                match (&self.rows[index].kind, button) {
                    (RowKind::Collapsed { parent, .. }, MouseButton::Left) => {
                        self.expanded.insert(parent.clone());
                        self.rebuild();
                        true
                    }
                    (RowKind::Frame { file: Some(file) }, MouseButton::Right) => {
                        let scope = cx.scope().clone();
                        cx.open_menu(
                            screen_column,
                            screen_row,
                            vec![MenuItem::new(
                                "View source",
                                json!({ "file": file }),
                                move |desktop, payload| {
                                    let Some(file) = payload.get("file").and_then(Value::as_str)
                                    else {
                                        return;
                                    };
                                    if let Err(err) = desktop.open(
                                        Box::new(CodeWindow::new(file)),
                                        OpenOptions::new().scoped(&scope).data(payload.clone()),
                                    ) {
                                        tracing::warn!(error = %err, "could not open source view");
                                    }
                                },
                            )],
                        );
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect, markup: &ContentMarkup, _focused: bool) {
        if self.rows.is_empty() {
            frame.render_widget(Paragraph::new(Text::from(markup.lines().to_vec())), area);
            return;
        }
        let lines: Vec<Line<'static>> = self
            .rows
            .iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .map(|row| Self::row_line(row, area.width))
            .collect();
        frame.render_widget(Paragraph::new(Text::from(lines)), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> FlameNode {
        serde_json::from_value(json!({
            "name": "all", "value": 100.0,
            "children": [
                {"name": "main", "value": 90.0, "file": "main.c",
                 "children": [{"name": "work", "value": 88.0}, {"name": "log", "value": 2.0}]},
                {"name": "idle", "value": 3.0},
                {"name": "gc", "value": 1.0}
            ]
        }))
        .expect("tree")
    }

    fn rows(window: &mut FlameGraphWindow) -> Vec<(String, usize)> {
        window.root = Some(tree());
        window.rebuild();
        window
            .rows()
            .iter()
            .map(|row| (row.name.clone(), row.depth))
            .collect()
    }

    #[test]
    fn zero_threshold_shows_every_frame() {
        let mut window = FlameGraphWindow::new("1", "1", 0.0);
        assert_eq!(rows(&mut window).len(), 6);
    }

    #[test]
    fn small_frames_fold_into_one_row_per_parent() {
        let mut window = FlameGraphWindow::new("1", "1", 0.05);
        let names = rows(&mut window);
        assert_eq!(
            names,
            vec![
                ("all".to_string(), 0),
                ("main".to_string(), 1),
                ("work".to_string(), 2),
                ("[1 collapsed]".to_string(), 2),
                ("[2 collapsed]".to_string(), 1),
            ]
        );
        match &window.rows()[4].kind {
            RowKind::Collapsed { parent, count } => {
                assert!(parent.is_empty());
                assert_eq!(*count, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn expanding_a_group_reveals_its_frames() {
        let mut window = FlameGraphWindow::new("1", "1", 0.05);
        rows(&mut window);
        window.expanded.insert(Vec::new());
        window.rebuild();
        let names: Vec<&str> = window.rows().iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"idle"));
        assert!(names.contains(&"gc"));
        assert!(names.contains(&"[1 collapsed]"));
    }

    #[test]
    fn payload_accepts_numbers_or_strings() {
        let window = FlameGraphWindow::from_payload(&json!({"pid": 7, "tid": "8", "threshold": 0.05}))
            .expect("window");
        assert_eq!(window.title(), "Flame graph (PID: 7, TID: 8, collapsed < 5%)");
        assert!(FlameGraphWindow::from_payload(&json!({"pid": 7})).is_none());
    }

    #[test]
    fn bar_length_follows_share() {
        let row = FlameRow {
            depth: 0,
            name: "x".into(),
            share: 0.5,
            kind: RowKind::Frame { file: None },
        };
        let line = FlameGraphWindow::row_line(&row, 20);
        assert_eq!(line.spans[1].content.chars().count(), 10);
    }
}
