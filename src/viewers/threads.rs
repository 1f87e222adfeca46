//! The `perf` backend: its root window lists the processes and threads a
//! session recorded and opens flame graphs for them.

use crossterm::event::{KeyCode, MouseButton, MouseEventKind};
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::Paragraph;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::flame_graph::FlameGraphWindow;
use super::{decode, failure_line, show_error};
use crate::error::DesktopError;
use crate::menu::MenuItem;
use crate::modules::{BackendModule, RootWindowArgs};
use crate::session::form;
use crate::theme;
use crate::transport::{Reply, ResponseKind};
use crate::ui::UiFrame;
use crate::window::{
    ContentEvent, ContentMarkup, Desktop, OpenOptions, WindowContent, WindowCx, WindowId,
    WindowScope,
};

pub const BACKEND: &str = "perf";

/// Threshold behind the "collapsed" flame graph entry.
pub const COLLAPSE_THRESHOLD: f64 = 0.05;

pub fn module() -> BackendModule {
    let mut settings = Map::new();
    settings.insert("collapse_threshold".into(), json!(COLLAPSE_THRESHOLD));
    BackendModule {
        name: BACKEND.to_string(),
        create_root_window,
        settings,
    }
}

fn create_root_window(desktop: &mut Desktop, args: RootWindowArgs) -> Result<WindowId, DesktopError> {
    let mut options = OpenOptions::new()
        .session(args.session)
        .node(args.node_id)
        .module(BACKEND);
    if let Some(entity) = args.entity_id {
        options = options.entity(entity);
    }
    desktop.open(Box::new(ThreadsWindow::default()), options)
}

/// One process or thread as recorded in the session tree. Threads spawned by
/// a thread appear as its children.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThreadNode {
    pub name: String,
    pub pid: String,
    pub tid: String,
    #[serde(default)]
    pub children: Vec<ThreadNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRow {
    pub pid: String,
    pub tid: String,
    pub name: String,
    pub depth: usize,
}

/// Accepts a single root or a list of roots.
#[derive(Deserialize)]
#[serde(untagged)]
enum TreePayload {
    One(ThreadNode),
    Many(Vec<ThreadNode>),
}

fn flatten(nodes: &[ThreadNode], depth: usize, rows: &mut Vec<ThreadRow>) {
    for node in nodes {
        rows.push(ThreadRow {
            pid: node.pid.clone(),
            tid: node.tid.clone(),
            name: node.name.clone(),
            depth,
        });
        flatten(&node.children, depth + 1, rows);
    }
}

const HEADER_ROWS: usize = 1;

#[derive(Debug, Default)]
pub struct ThreadsWindow {
    rows: Vec<ThreadRow>,
    selected: Option<usize>,
}

impl ThreadsWindow {
    pub fn rows(&self) -> &[ThreadRow] {
        &self.rows
    }

    fn load(&mut self, cx: &mut WindowCx<'_>) {
        self.rows.clear();
        self.selected = None;
        match cx.request(form([("tree", "1")]), ResponseKind::Json) {
            Ok(request) => {
                cx.send("tree", request);
            }
            Err(err) => show_error(cx, Line::styled(err.to_string(), theme::error_text())),
        }
    }

    fn apply_tree(&mut self, cx: &mut WindowCx<'_>, payload: TreePayload) {
        let roots = match payload {
            TreePayload::One(root) => vec![root],
            TreePayload::Many(roots) => roots,
        };
        let mut rows = Vec::new();
        flatten(&roots, 0, &mut rows);
        let mut lines = vec![Line::styled(
            format!("{:<8} {:<8} NAME", "PID", "TID"),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        lines.extend(rows.iter().map(|row| {
            Line::from(format!(
                "{:<8} {:<8} {}{}",
                row.pid,
                row.tid,
                "  ".repeat(row.depth),
                row.name
            ))
        }));
        tracing::debug!(window_id = %cx.id(), threads = rows.len(), "thread tree loaded");
        self.rows = rows;
        cx.set_lines(lines);
        cx.hide_loading();
    }

    fn row_at(&self, content_row: u16) -> Option<usize> {
        (content_row as usize)
            .checked_sub(HEADER_ROWS)
            .filter(|index| *index < self.rows.len())
    }

    fn open_thread_menu(&self, cx: &mut WindowCx<'_>, index: usize, x: u16, y: u16) {
        let Some(row) = self.rows.get(index) else {
            return;
        };
        let scope = cx.scope().clone();
        let entries = [
            ("Flame graph", 0.0),
            ("Flame graph (collapsed < 5%)", COLLAPSE_THRESHOLD),
        ];
        let items = entries
            .into_iter()
            .map(|(label, threshold)| {
                let scope = scope.clone();
                MenuItem::new(
                    label,
                    json!({"pid": row.pid, "tid": row.tid, "threshold": threshold}),
                    move |desktop, payload| open_flame_graph(desktop, &scope, payload),
                )
            })
            .collect();
        cx.open_menu(x, y, items);
    }
}

fn open_flame_graph(desktop: &mut Desktop, scope: &WindowScope, payload: Value) {
    let Some(window) = FlameGraphWindow::from_payload(&payload) else {
        tracing::warn!(%payload, "flame graph menu payload is incomplete");
        return;
    };
    if let Err(err) = desktop.open(
        Box::new(window),
        OpenOptions::new().scoped(scope).data(payload),
    ) {
        tracing::warn!(error = %err, "could not open flame graph");
    }
}

impl WindowContent for ThreadsWindow {
    fn kind(&self) -> &'static str {
        "threads"
    }

    fn content_code(&self) -> ContentMarkup {
        ContentMarkup::new()
    }

    fn title(&self) -> String {
        "Threads and processes".to_string()
    }

    fn setup(&mut self, cx: &mut WindowCx<'_>, _data: &Value, _is_refresh: bool) {
        self.load(cx);
    }

    fn prepare_refresh(&mut self, _cx: &mut WindowCx<'_>, _data: &Value) {}

    fn prepare_close(&mut self, _cx: &mut WindowCx<'_>) {}

    fn start_resize(&mut self, _cx: &mut WindowCx<'_>) -> bool {
        false
    }

    fn finish_resize(&mut self, _cx: &mut WindowCx<'_>) {}

    fn on_response(&mut self, cx: &mut WindowCx<'_>, reply: Reply) {
        match reply.result {
            Ok(response) => match decode::<TreePayload>(response) {
                Ok(payload) => self.apply_tree(cx, payload),
                Err(err) => show_error(cx, Line::styled(err.to_string(), theme::error_text())),
            },
            Err(failure) => show_error(cx, failure_line("the thread tree", &failure)),
        }
    }

    fn handle_event(&mut self, cx: &mut WindowCx<'_>, event: &ContentEvent) -> bool {
        match *event {
            ContentEvent::Mouse {
                kind: MouseEventKind::Down(button),
                row,
                screen_column,
                screen_row,
                ..
            } => {
                let Some(index) = self.row_at(row) else {
                    return false;
                };
                self.selected = Some(index);
                if button == MouseButton::Right {
                    self.open_thread_menu(cx, index, screen_column, screen_row);
                }
                true
            }
            ContentEvent::Key(key) => {
                let last = self.rows.len().checked_sub(1);
                match key.code {
                    KeyCode::Down => {
                        self.selected = match (self.selected, last) {
                            (Some(index), Some(last)) => Some((index + 1).min(last)),
                            (None, Some(_)) => Some(0),
                            (_, None) => None,
                        };
                        true
                    }
                    KeyCode::Up => {
                        self.selected = self.selected.map(|index| index.saturating_sub(1));
                        true
                    }
                    KeyCode::Enter => match self.selected {
                        Some(index) => {
                            let viewport = cx.viewport();
                            let (x, y) = (viewport.width / 3, viewport.height / 3);
                            self.open_thread_menu(cx, index, x, y);
                            true
                        }
                        None => false,
                    },
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect, markup: &ContentMarkup, focused: bool) {
        let highlight = self.selected.map(|index| index + HEADER_ROWS);
        let lines: Vec<Line<'static>> = markup
            .lines()
            .iter()
            .enumerate()
            .map(|(index, line)| {
                if Some(index) == highlight {
                    let style = if focused {
                        Style::default()
                            .bg(theme::menu_hover_bg())
                            .fg(theme::menu_hover_fg())
                    } else {
                        Style::default().add_modifier(Modifier::REVERSED)
                    };
                    line.clone().patch_style(style)
                } else {
                    line.clone()
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(Text::from(lines)), area);
    }
}
