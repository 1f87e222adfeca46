//! The base view of a loaded session: the profiled system as a node/edge
//! graph. Double-clicking a node opens the root window of its backend.

use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use serde::Deserialize;
use serde_json::Value;

use crate::constants::DOUBLE_CLICK_MS;
use crate::error::DesktopError;
use crate::menu::MenuItem;
use crate::modules::RootWindowArgs;
use crate::session::SessionId;
use crate::theme;
use crate::ui::{UiFrame, safe_set_string};
use crate::window::{Desktop, HostRequest};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeAttributes {
    pub label: Option<String>,
    pub x: f64,
    pub y: f64,
    pub backend: Option<String>,
    pub backends: Vec<String>,
    pub entity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphNode {
    pub key: String,
    #[serde(default)]
    pub attributes: NodeAttributes,
}

impl GraphNode {
    pub fn label(&self) -> &str {
        self.attributes.label.as_deref().unwrap_or(&self.key)
    }

    /// Backends that can analyse this node. `backends` wins over the single
    /// `backend` attribute when both are present.
    pub fn backends(&self) -> Vec<&str> {
        if !self.attributes.backends.is_empty() {
            return self.attributes.backends.iter().map(String::as_str).collect();
        }
        self.attributes.backend.as_deref().into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Node/edge payload as the data source serializes it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl SystemGraph {
    pub fn from_value(value: Value) -> Result<Self, DesktopError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn node(&self, key: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.key == key)
    }
}

/// A node double-clicked in the view, ready to hand to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeActivation {
    pub session: SessionId,
    pub node_id: String,
    pub entity_id: Option<String>,
    pub backends: Vec<String>,
}

const NODE_HEIGHT: u16 = 3;

#[derive(Debug)]
pub struct GraphView {
    graph: SystemGraph,
    session: SessionId,
    boxes: Vec<Rect>,
    selected: Option<usize>,
    last_click: Option<(usize, Instant)>,
}

impl GraphView {
    pub fn new(session: SessionId, graph: SystemGraph) -> Self {
        Self {
            graph,
            session,
            boxes: Vec::new(),
            selected: None,
            last_click: None,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn graph(&self) -> &SystemGraph {
        &self.graph
    }

    pub fn selected(&self) -> Option<&GraphNode> {
        self.selected.and_then(|index| self.graph.nodes.get(index))
    }

    /// Lay the nodes out inside `area`, scaling their coordinates so the
    /// whole graph fits.
    pub fn layout(&mut self, area: Rect) {
        let nodes = &self.graph.nodes;
        let widths: Vec<u16> = nodes
            .iter()
            .map(|node| (node.label().chars().count() as u16 + 4).min(area.width.max(1)))
            .collect();
        let widest = widths.iter().copied().max().unwrap_or(0);
        let (min_x, max_x) = bounds(nodes.iter().map(|n| n.attributes.x));
        let (min_y, max_y) = bounds(nodes.iter().map(|n| n.attributes.y));
        let room_x = area.width.saturating_sub(widest) as f64;
        let room_y = area.height.saturating_sub(NODE_HEIGHT) as f64;
        let scale = |value: f64, lo: f64, hi: f64, room: f64| {
            if hi > lo {
                ((value - lo) / (hi - lo) * room).round() as u16
            } else {
                (room / 2.0) as u16
            }
        };
        self.boxes = nodes
            .iter()
            .zip(widths)
            .map(|(node, width)| {
                Rect::new(
                    area.x + scale(node.attributes.x, min_x, max_x, room_x),
                    area.y + scale(node.attributes.y, min_y, max_y, room_y),
                    width,
                    NODE_HEIGHT.min(area.height),
                )
            })
            .collect();
    }

    /// Index of the node drawn under `(column, row)`, topmost first.
    pub fn node_at(&self, column: u16, row: u16) -> Option<usize> {
        self.boxes
            .iter()
            .rposition(|rect| rect.contains((column, row).into()))
    }

    /// Register a press at `(column, row)`. Returns the node when this press
    /// completes a double-click on it.
    pub fn click(&mut self, column: u16, row: u16, now: Instant) -> Option<NodeActivation> {
        let Some(index) = self.node_at(column, row) else {
            self.selected = None;
            self.last_click = None;
            return None;
        };
        self.selected = Some(index);
        let double = self.last_click.is_some_and(|(prev, at)| {
            prev == index && now.duration_since(at) <= Duration::from_millis(DOUBLE_CLICK_MS)
        });
        if !double {
            self.last_click = Some((index, now));
            return None;
        }
        self.last_click = None;
        let node = self.graph.nodes.get(index)?;
        tracing::debug!(node = %node.key, session = %self.session, "graph node activated");
        Some(NodeActivation {
            session: self.session.clone(),
            node_id: node.key.clone(),
            entity_id: node.attributes.entity.clone(),
            backends: node.backends().into_iter().map(str::to_string).collect(),
        })
    }

    pub fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect) {
        self.layout(area);
        let edge_style = Style::default().fg(theme::graph_edge());
        for edge in &self.graph.edges {
            let ends = (
                self.graph.nodes.iter().position(|n| n.key == edge.source),
                self.graph.nodes.iter().position(|n| n.key == edge.target),
            );
            if let (Some(from), Some(to)) = ends {
                let (a, b) = (center(self.boxes[from]), center(self.boxes[to]));
                for (step, (x, y)) in line_cells(a, b).into_iter().enumerate() {
                    if step % 2 == 0 {
                        safe_set_string(frame.buffer_mut(), area, x, y, "·", edge_style);
                    }
                }
            }
        }
        for (index, (node, rect)) in self.graph.nodes.iter().zip(&self.boxes).enumerate() {
            let color = if self.selected == Some(index) {
                theme::graph_node_selected()
            } else {
                theme::graph_node()
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(color));
            frame.render_widget(
                Paragraph::new(node.label().to_string())
                    .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                    .centered()
                    .block(block),
                *rect,
            );
        }
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn center(rect: Rect) -> (u16, u16) {
    (rect.x + rect.width / 2, rect.y + rect.height / 2)
}

/// Cells on the straight segment from `a` to `b`, inclusive.
fn line_cells(a: (u16, u16), b: (u16, u16)) -> Vec<(u16, u16)> {
    let (mut x, mut y) = (a.0 as i32, a.1 as i32);
    let (x1, y1) = (b.0 as i32, b.1 as i32);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut cells = Vec::new();
    loop {
        cells.push((x as u16, y as u16));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

/// Open the backend for an activated node at `(x, y)`: directly when it has
/// one backend, through a menu when it has several.
pub fn activate(desktop: &mut Desktop, activation: NodeActivation, x: u16, y: u16) {
    let args = RootWindowArgs {
        entity_id: activation.entity_id,
        node_id: activation.node_id,
        session: activation.session,
    };
    match activation.backends.as_slice() {
        [] => {
            tracing::warn!(node = %args.node_id, "graph node has no backend");
            desktop.post_host_request(HostRequest::Alert(format!(
                "Node \"{}\" has no analysis backend",
                args.node_id
            )));
        }
        [backend] => open_backend(desktop, backend, args),
        backends => {
            let items = backends
                .iter()
                .map(|backend| {
                    let args = args.clone();
                    MenuItem::new(
                        backend.clone(),
                        Value::String(backend.clone()),
                        move |desktop, payload| {
                            if let Some(name) = payload.as_str() {
                                open_backend(desktop, name, args);
                            }
                        },
                    )
                })
                .collect();
            desktop.create_menu(x, y, items);
        }
    }
}

fn open_backend(desktop: &mut Desktop, backend: &str, args: RootWindowArgs) {
    if let Err(err) = desktop.open_root_window(backend, args) {
        tracing::debug!(backend, error = %err, "root window not opened");
    }
}
