pub mod content;
pub mod decorator;
pub mod drag;
pub mod focus;
pub mod id;
pub mod resize;

mod desktop;
#[cfg(test)]
pub(crate) mod testing;

use std::time::Instant;

use ratatui::prelude::Rect;
use serde_json::{Map, Value};

pub use content::{ContentEvent, ContentMarkup, WindowContent, WindowCx};
pub use desktop::{Desktop, HostRequest, OpenOptions};
pub use id::WindowId;

use crate::session::SessionId;

/// Signed floating rectangle origin with unsigned size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatRect {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl FloatRect {
    pub fn contains(&self, column: u16, row: u16) -> bool {
        let (column, row) = (column as i32, row as i32);
        column >= self.x
            && row >= self.y
            && column < self.x + self.width as i32
            && row < self.y + self.height as i32
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32 - 1
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32 - 1
    }

    /// Portion of the rectangle that lies inside `bounds`.
    pub fn visible(&self, bounds: Rect) -> Rect {
        let left = self.x.max(bounds.x as i32);
        let top = self.y.max(bounds.y as i32);
        let right = (self.x + self.width as i32).min(bounds.x as i32 + bounds.width as i32);
        let bottom = (self.y + self.height as i32).min(bounds.y as i32 + bounds.height as i32);
        if right <= left || bottom <= top {
            return Rect::default();
        }
        Rect {
            x: left as u16,
            y: top as u16,
            width: (right - left) as u16,
            height: (bottom - top) as u16,
        }
    }
}

/// How a window's origin is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Centered in the viewport, following it as it changes size.
    Centered,
    /// Literal left/top.
    Absolute { x: i32, y: i32 },
}

impl Placement {
    pub fn resolve(&self, width: u16, height: u16, viewport: Rect) -> FloatRect {
        match *self {
            Placement::Absolute { x, y } => FloatRect {
                x,
                y,
                width,
                height,
            },
            Placement::Centered => FloatRect {
                x: viewport.x as i32 + viewport.width as i32 / 2 - width as i32 / 2,
                y: viewport.y as i32 + viewport.height as i32 / 2 - height as i32 / 2,
                width,
                height,
            },
        }
    }

    pub fn is_centered(&self) -> bool {
        matches!(self, Placement::Centered)
    }
}

/// Which edges of a window the resize grip may move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Both,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTone {
    Focused,
    Unfocused,
}

/// Everything a window draws: frame geometry, header state and content.
#[derive(Debug, Clone)]
pub struct Surface {
    pub(crate) placement: Placement,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) min_height: u16,
    pub(crate) resize: ResizeMode,
    pub(crate) z_index: Option<u32>,
    pub(crate) tone: HeaderTone,
    pub(crate) title: String,
    pub(crate) markup: ContentMarkup,
    pub(crate) loading: bool,
}

impl Surface {
    fn new(placement: Placement, width: u16, height: u16, min_height: u16) -> Self {
        Self {
            placement,
            width,
            height: height.max(min_height),
            min_height,
            resize: ResizeMode::Both,
            z_index: None,
            tone: HeaderTone::Unfocused,
            title: String::new(),
            markup: ContentMarkup::default(),
            loading: false,
        }
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn min_height(&self) -> u16 {
        self.min_height
    }

    pub fn resize_mode(&self) -> ResizeMode {
        self.resize
    }

    pub fn z_index(&self) -> Option<u32> {
        self.z_index
    }

    pub fn tone(&self) -> HeaderTone {
        self.tone
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn markup(&self) -> &ContentMarkup {
        &self.markup
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn rect(&self, viewport: Rect) -> FloatRect {
        self.placement.resolve(self.width, self.height, viewport)
    }

    /// Replace a centered placement with the literal position it currently
    /// resolves to, so later size changes grow from a fixed corner.
    pub(crate) fn pin_position(&mut self, viewport: Rect) {
        if self.placement.is_centered() {
            let rect = self.rect(viewport);
            self.placement = Placement::Absolute {
                x: rect.x,
                y: rect.y,
            };
        }
    }
}

/// Keys that tie a window to a session's auxiliary data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowScope {
    pub session: Option<SessionId>,
    pub entity_id: Option<String>,
    pub node_id: Option<String>,
    pub module_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CollapseMemo {
    pub(crate) height: u16,
    pub(crate) min_height: u16,
}

/// Window attributes owned by the desktop, as opposed to the boxed content
/// hooks. Hooks see this through [`WindowCx`].
#[derive(Debug)]
pub struct WindowState {
    pub(crate) id: WindowId,
    pub(crate) serial: u64,
    pub(crate) generation: u64,
    pub(crate) kind: &'static str,
    pub(crate) scope: WindowScope,
    pub(crate) data: Map<String, Value>,
    pub(crate) collapsed: Option<CollapseMemo>,
    pub(crate) being_resized: bool,
    pub(crate) first_resize_call: bool,
    pub(crate) last_focus: Instant,
    pub(crate) focus_seq: u64,
    pub(crate) setup_data: Option<Value>,
    pub(crate) custom_title: Option<String>,
    pub(crate) surface: Surface,
}

impl WindowState {
    pub fn id(&self) -> &WindowId {
        &self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn scope(&self) -> &WindowScope {
        &self.scope
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn collapsed(&self) -> bool {
        self.collapsed.is_some()
    }

    pub fn being_resized(&self) -> bool {
        self.being_resized
    }

    pub fn last_focus(&self) -> Instant {
        self.last_focus
    }

    pub fn setup_data(&self) -> Option<&Value> {
        self.setup_data.as_ref()
    }

    pub fn custom_title(&self) -> Option<&str> {
        self.custom_title.as_deref()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Recency key used to pick a window to refocus. The sequence number
    /// breaks ties between equal timestamps.
    pub(crate) fn recency(&self) -> (Instant, u64) {
        (self.last_focus, self.focus_seq)
    }
}

/// One floating panel: desktop-owned state plus the variant's content hooks.
pub struct Window {
    pub(crate) state: WindowState,
    pub(crate) content: Box<dyn WindowContent>,
}

impl Window {
    pub fn id(&self) -> &WindowId {
        &self.state.id
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn surface(&self) -> &Surface {
        &self.state.surface
    }

    pub fn content(&self) -> &dyn WindowContent {
        self.content.as_ref()
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("state", &self.state)
            .field("kind", &self.content.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_placement_straddles_viewport_middle() {
        let viewport = Rect::new(0, 0, 100, 40);
        let rect = Placement::Centered.resolve(20, 10, viewport);
        assert_eq!((rect.x, rect.y), (40, 15));
    }

    #[test]
    fn oversized_centered_window_gets_negative_origin() {
        let viewport = Rect::new(0, 0, 10, 10);
        let rect = Placement::Centered.resolve(30, 4, viewport);
        assert_eq!(rect.x, -10);
    }

    #[test]
    fn visible_clips_negative_offsets() {
        let rect = FloatRect {
            x: -3,
            y: 2,
            width: 10,
            height: 4,
        };
        let clipped = rect.visible(Rect::new(0, 0, 5, 5));
        assert_eq!(clipped, Rect::new(0, 2, 5, 3));
    }

    #[test]
    fn pin_position_freezes_centered_origin() {
        let viewport = Rect::new(0, 0, 100, 40);
        let mut surface = Surface::new(Placement::Centered, 20, 10, 5);
        surface.pin_position(viewport);
        assert_eq!(surface.placement(), Placement::Absolute { x: 40, y: 15 });
        surface.width = 40;
        assert_eq!(surface.rect(viewport).x, 40);
    }
}
