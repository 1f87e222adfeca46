use std::collections::BTreeMap;
use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::buffer::Buffer;
use ratatui::prelude::Rect;
use serde_json::{Map, Value};

use super::decorator::{Chrome, HeaderAction, HeaderBarDecorator, WindowDecorator};
use super::drag::DragController;
use super::focus::{ZOrder, stacking_order};
use super::resize::{GripDrag, ResizeEdge, ResizeObserver};
use super::{
    CollapseMemo, ContentEvent, FloatRect, HeaderTone, Placement, ResizeMode, Surface, Window,
    WindowContent, WindowCx, WindowId, WindowScope, WindowState, id,
};
use crate::config::DesktopConfig;
use crate::error::DesktopError;
use crate::menu::{Menu, MenuBlock, MenuHit, MenuItem, MenuSlot};
use crate::modules::{ModuleRegistry, RootWindowArgs};
use crate::panels::{PanelStore, SettingsPanel};
use crate::session::{SessionId, SessionRegistry, SessionRequest};
use crate::transport::{Completion, Envelope, Reply, Ticket};
use crate::ui::{UiFrame, safe_set_string};

/// Something the host has to show or do on the desktop's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    Alert(String),
    /// Ask for a new title for `window`; answer with
    /// [`Desktop::set_custom_title`].
    PromptTitle { window: WindowId, current: String },
    /// The user picked a session to load.
    LoadSession { id: SessionId, label: String },
}

/// Desktop services reachable from content hooks.
pub(crate) struct Shared {
    pub(crate) config: DesktopConfig,
    pub(crate) viewport: Rect,
    pub(crate) sessions: SessionRegistry,
    pub(crate) panels: PanelStore,
    pub(crate) menu: MenuSlot,
    pub(crate) outbox: Vec<Envelope>,
    pub(crate) host: Vec<HostRequest>,
    next_ticket: u64,
}

impl Shared {
    pub(crate) fn enqueue(
        &mut self,
        state: &WindowState,
        tag: String,
        request: SessionRequest,
    ) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        tracing::debug!(
            window_id = %state.id,
            ticket = ticket.0,
            tag = %tag,
            session = %request.session,
            "request queued"
        );
        self.outbox.push(Envelope {
            ticket,
            window: state.id.clone(),
            serial: state.serial,
            generation: state.generation,
            tag,
            request,
        });
        ticket
    }
}

/// How a new window is scoped, seeded and placed.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    scope: WindowScope,
    data: Option<Value>,
    position: Option<(i32, i32)>,
    size: Option<(u16, u16)>,
    min_height: Option<u16>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(mut self, session: SessionId) -> Self {
        self.scope.session = Some(session);
        self
    }

    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.scope.entity_id = Some(entity_id.into());
        self
    }

    pub fn node(mut self, node_id: impl Into<String>) -> Self {
        self.scope.node_id = Some(node_id.into());
        self
    }

    pub fn module(mut self, module_name: impl Into<String>) -> Self {
        self.scope.module_name = Some(module_name.into());
        self
    }

    /// Copy session, entity, node and module from an existing scope.
    pub fn scoped(mut self, scope: &WindowScope) -> Self {
        self.scope = scope.clone();
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Open at a literal position instead of centered.
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Some((x, y));
        self
    }

    pub fn size(mut self, width: u16, height: u16) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn min_height(mut self, min_height: u16) -> Self {
        self.min_height = Some(min_height);
        self
    }
}

/// The window manager: registry, stacking order, pointer interaction, the
/// menu slot and the sessions windows are scoped to.
///
/// Everything runs on the UI thread. Requests leave through
/// [`Desktop::take_outbox`] and come back through [`Desktop::deliver`].
pub struct Desktop {
    shared: Shared,
    windows: BTreeMap<WindowId, Window>,
    z_order: ZOrder,
    drag: DragController,
    grip: Option<GripDrag>,
    observer: ResizeObserver,
    decorator: Box<dyn WindowDecorator>,
    modules: ModuleRegistry,
    next_serial: u64,
}

impl Desktop {
    pub fn new(config: DesktopConfig) -> Self {
        Self::with_modules(config, ModuleRegistry::builtin())
    }

    pub fn with_modules(config: DesktopConfig, modules: ModuleRegistry) -> Self {
        let mut panels = PanelStore::new();
        for module in modules.iter() {
            panels.register(SettingsPanel::new(module.name.clone(), module.settings.clone()));
        }
        Self {
            shared: Shared {
                config,
                viewport: Rect::new(0, 0, 80, 24),
                sessions: SessionRegistry::new(),
                panels,
                menu: MenuSlot::default(),
                outbox: Vec::new(),
                host: Vec::new(),
                next_ticket: 0,
            },
            windows: BTreeMap::new(),
            z_order: ZOrder::new(config.renormalize_threshold),
            drag: DragController::default(),
            grip: None,
            observer: ResizeObserver::default(),
            decorator: Box::new(HeaderBarDecorator),
            modules,
            next_serial: 0,
        }
    }

    pub fn config(&self) -> &DesktopConfig {
        &self.shared.config
    }

    pub fn viewport(&self) -> Rect {
        self.shared.viewport
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.shared.viewport = viewport;
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.shared.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionRegistry {
        &mut self.shared.sessions
    }

    pub fn panels(&self) -> &PanelStore {
        &self.shared.panels
    }

    pub fn panels_mut(&mut self) -> &mut PanelStore {
        &mut self.shared.panels
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.modules
    }

    pub fn focused(&self) -> Option<&WindowId> {
        self.z_order.current()
    }

    pub fn window(&self, id: &WindowId) -> Option<&Window> {
        self.windows.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &WindowId> {
        self.windows.keys()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Largest stacking index handed out so far.
    pub fn largest_z_index(&self) -> u32 {
        self.z_order.largest()
    }

    /// Ids from bottom to top.
    pub fn stacking_order(&self) -> Vec<WindowId> {
        stacking_order(&self.windows)
    }

    pub fn window_rect(&self, id: &WindowId) -> Option<FloatRect> {
        self.windows
            .get(id)
            .map(|window| window.state.surface.rect(self.shared.viewport))
    }

    /// Content area of `id` in screen coordinates.
    pub fn content_rect(&self, id: &WindowId) -> Option<FloatRect> {
        self.window_rect(id)
            .map(|rect| self.decorator.content_rect(rect))
    }

    /// Topmost window under `(column, row)`.
    pub fn window_at(&self, column: u16, row: u16) -> Option<WindowId> {
        self.stacking_order().into_iter().rev().find(|id| {
            self.window_rect(id)
                .is_some_and(|rect| rect.contains(column, row))
        })
    }

    /// Construct, mount and focus a window, then run its setup hook with
    /// `options.data` (an empty bag when absent).
    pub fn open(
        &mut self,
        content: Box<dyn WindowContent>,
        options: OpenOptions,
    ) -> Result<WindowId, DesktopError> {
        let label = match &options.scope.session {
            Some(session) => Some(
                self.shared
                    .sessions
                    .get(session)
                    .ok_or_else(|| DesktopError::UnknownSession(session.clone()))?
                    .label()
                    .to_string(),
            ),
            None => None,
        };
        let kind = content.kind();
        let windows = &self.windows;
        let id = id::allocate(kind, label.as_deref(), |candidate| {
            windows.contains_key(candidate)
        });

        let config = self.shared.config;
        let (width, height) = options
            .size
            .unwrap_or((config.default_width, config.default_height));
        let placement = match options.position {
            Some((x, y)) => Placement::Absolute { x, y },
            None => Placement::Centered,
        };
        let mut surface = Surface::new(
            placement,
            width.max(config.min_width),
            height,
            options.min_height.unwrap_or(config.min_height),
        );
        surface.markup = content.content_code();

        self.next_serial += 1;
        let data = options
            .data
            .unwrap_or_else(|| Value::Object(Map::new()));
        let mut state = WindowState {
            id: id.clone(),
            serial: self.next_serial,
            generation: 0,
            kind,
            scope: options.scope,
            data: Map::new(),
            collapsed: None,
            being_resized: false,
            first_resize_call: true,
            last_focus: Instant::now(),
            focus_seq: 0,
            setup_data: Some(data.clone()),
            custom_title: None,
            surface,
        };
        state.surface.title = compose_title(&state, content.title(), &self.shared.sessions);
        state.surface.loading = true;
        self.observer
            .observe(&id, state.surface.width, state.surface.height);
        self.windows.insert(id.clone(), Window { state, content });
        tracing::info!(window_id = %id, kind, "window opened");

        self.focus(Some(&id));
        self.call_hook(&id, |content, cx| content.setup(cx, &data, false));
        self.settle();
        Ok(id)
    }

    fn call_hook<R, F>(&mut self, id: &WindowId, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn WindowContent, &mut WindowCx<'_>) -> R,
    {
        let window = self.windows.get_mut(id)?;
        let mut cx = WindowCx::new(&mut window.state, &mut self.shared);
        Some(f(window.content.as_mut(), &mut cx))
    }

    /// Rebuild a window's content from scratch while keeping its identity.
    pub fn refresh(&mut self, id: &WindowId) -> Result<(), DesktopError> {
        let data = self
            .windows
            .get(id)
            .ok_or_else(|| DesktopError::UnknownWindow(id.clone()))?
            .state
            .setup_data
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        self.call_hook(id, |content, cx| content.prepare_refresh(cx, &data));

        let window = self
            .windows
            .get_mut(id)
            .ok_or_else(|| DesktopError::UnknownWindow(id.clone()))?;
        window.state.generation += 1;
        window.state.data = Map::new();
        window.state.surface.markup = window.content.content_code();
        window.state.surface.title =
            compose_title(&window.state, window.content.title(), &self.shared.sessions);
        window.state.surface.loading = true;
        tracing::debug!(
            window_id = %id,
            generation = window.state.generation,
            "window refreshed"
        );
        self.call_hook(id, |content, cx| content.setup(cx, &data, true));
        self.settle();
        Ok(())
    }

    /// Tear a window down and hand focus to the most recently focused
    /// survivor.
    pub fn close(&mut self, id: &WindowId) -> Result<(), DesktopError> {
        if !self.windows.contains_key(id) {
            return Err(DesktopError::UnknownWindow(id.clone()));
        }
        self.call_hook(id, |content, cx| content.prepare_close(cx));
        self.windows.remove(id);

        let leaked = self.shared.panels.release_all(id);
        if !leaked.is_empty() {
            tracing::warn!(window_id = %id, panels = ?leaked, "closing window still held panels");
        }
        self.observer.unobserve(id);
        self.drag.cancel_for(id);
        if self.grip.as_ref().is_some_and(|grip| &grip.id == id) {
            self.grip = None;
        }
        tracing::info!(window_id = %id, remaining = self.windows.len(), "window closed");

        self.z_order.forget(id);
        self.focus(None);
        self.settle();
        Ok(())
    }

    /// Focus `target`, or the most recently focused window when `None`.
    /// Returns whether focus moved.
    pub fn focus(&mut self, target: Option<&WindowId>) -> bool {
        self.z_order.focus(&mut self.windows, target).is_some()
    }

    /// Bring the bottom-most window to the top, cycling through the stack.
    pub fn focus_next(&mut self) -> bool {
        if self.windows.len() < 2 {
            return false;
        }
        match self.stacking_order().first().cloned() {
            Some(bottom) => self.focus(Some(&bottom)),
            None => false,
        }
    }

    /// Collapse a window to its header or expand it back.
    pub fn toggle_collapsed(&mut self, id: &WindowId) -> Result<bool, DesktopError> {
        let viewport = self.shared.viewport;
        let header = self.shared.config.header_height;
        let window = self
            .windows
            .get_mut(id)
            .ok_or_else(|| DesktopError::UnknownWindow(id.clone()))?;
        let state = &mut window.state;
        let collapsed = match state.collapsed.take() {
            Some(memo) => {
                state.surface.height = memo.height;
                state.surface.min_height = memo.min_height;
                state.surface.resize = ResizeMode::Both;
                false
            }
            None => {
                state.surface.pin_position(viewport);
                state.collapsed = Some(CollapseMemo {
                    height: state.surface.height,
                    min_height: state.surface.min_height,
                });
                state.surface.height = header;
                state.surface.min_height = 0;
                state.surface.resize = ResizeMode::Horizontal;
                true
            }
        };
        let (width, height) = (state.surface.width, state.surface.height);
        tracing::debug!(window_id = %id, collapsed, "visibility toggled");
        self.observer.notify(id, width, height);
        self.settle();
        Ok(collapsed)
    }

    /// Change a window's size, as a content-driven layout change would.
    pub fn set_size(&mut self, id: &WindowId, width: u16, height: u16) -> Result<(), DesktopError> {
        let min_width = self.shared.config.min_width;
        let window = self
            .windows
            .get_mut(id)
            .ok_or_else(|| DesktopError::UnknownWindow(id.clone()))?;
        let surface = &mut window.state.surface;
        let width = width.max(min_width);
        let height = height.max(surface.min_height);
        if (surface.width, surface.height) != (width, height) {
            surface.width = width;
            surface.height = height;
            self.observer.notify(id, width, height);
        }
        self.settle();
        Ok(())
    }

    /// Ask the host to prompt for a new title.
    pub fn request_title_edit(&mut self, id: &WindowId) -> Result<(), DesktopError> {
        let window = self
            .windows
            .get(id)
            .ok_or_else(|| DesktopError::UnknownWindow(id.clone()))?;
        self.shared.host.push(HostRequest::PromptTitle {
            window: id.clone(),
            current: window.state.surface.title.clone(),
        });
        Ok(())
    }

    /// Answer to a title prompt. `None` or blank text leaves the title alone.
    /// Returns whether the title changed.
    pub fn set_custom_title(
        &mut self,
        id: &WindowId,
        title: Option<&str>,
    ) -> Result<bool, DesktopError> {
        let window = self
            .windows
            .get_mut(id)
            .ok_or_else(|| DesktopError::UnknownWindow(id.clone()))?;
        let Some(title) = title.filter(|text| !text.trim().is_empty()) else {
            return Ok(false);
        };
        window.state.custom_title = Some(title.to_string());
        window.state.surface.title = title.to_string();
        tracing::debug!(window_id = %id, title, "custom title set");
        Ok(true)
    }

    /// Start moving `id` with the pointer at `(column, row)`.
    pub fn begin_drag(&mut self, id: &WindowId, column: u16, row: u16) -> Result<(), DesktopError> {
        let rect = self
            .window_rect(id)
            .ok_or_else(|| DesktopError::UnknownWindow(id.clone()))?;
        self.focus(Some(id));
        self.drag.begin(id.clone(), rect, column, row);
        Ok(())
    }

    pub fn drag_to(&mut self, column: u16, row: u16) -> bool {
        let Some((id, x, y)) = self.drag.origin_for(column, row) else {
            return false;
        };
        let id = id.clone();
        if let Some(window) = self.windows.get_mut(&id) {
            window.state.surface.placement = Placement::Absolute { x, y };
        }
        true
    }

    pub fn end_drag(&mut self) -> bool {
        self.drag.end().is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Start resizing `id` from its corner grip.
    pub fn begin_grip(&mut self, id: &WindowId, column: u16, row: u16) -> Result<(), DesktopError> {
        let viewport = self.shared.viewport;
        let window = self
            .windows
            .get_mut(id)
            .ok_or_else(|| DesktopError::UnknownWindow(id.clone()))?;
        window.state.surface.pin_position(viewport);
        let start = window.state.surface.rect(viewport);
        let edge = ResizeEdge::from(window.state.surface.resize);
        self.focus(Some(id));
        self.grip = Some(GripDrag {
            id: id.clone(),
            edge,
            start,
            start_col: column,
            start_row: row,
        });
        Ok(())
    }

    pub fn grip_to(&mut self, column: u16, row: u16) -> bool {
        let Some(grip) = self.grip.clone() else {
            return false;
        };
        let min_width = self.shared.config.min_width;
        let Some(window) = self.windows.get_mut(&grip.id) else {
            self.grip = None;
            return false;
        };
        let surface = &mut window.state.surface;
        let min_height = match grip.edge {
            ResizeEdge::Right => surface.height,
            ResizeEdge::BottomRight => surface.min_height,
        };
        let rect = grip.apply(column, row, min_width, min_height);
        if (rect.width, rect.height) != (surface.width, surface.height) {
            surface.width = rect.width;
            surface.height = rect.height;
            self.observer.notify(&grip.id, rect.width, rect.height);
        }
        self.settle();
        true
    }

    /// Stop the grip drag, returning the window it was resizing.
    pub fn end_grip(&mut self) -> Option<WindowId> {
        self.grip.take().map(|grip| grip.id)
    }

    /// Drain queued size notifications into the windows' resize hooks.
    pub fn flush_resize_notifications(&mut self) {
        self.settle();
    }

    fn flush_resize_batch(&mut self) {
        let mut owners: Vec<WindowId> = Vec::new();
        for entry in self.observer.take_batch() {
            if !owners.contains(&entry.window) {
                owners.push(entry.window);
            }
        }
        let viewport = self.shared.viewport;
        for id in owners {
            let Some(window) = self.windows.get_mut(&id) else {
                continue;
            };
            if window.state.first_resize_call {
                window.state.first_resize_call = false;
                continue;
            }
            window.state.surface.pin_position(viewport);
            let expects_finish = self
                .call_hook(&id, |content, cx| content.start_resize(cx))
                .unwrap_or(false);
            if let Some(window) = self.windows.get_mut(&id) {
                window.state.being_resized |= expects_finish;
            }
            tracing::trace!(window_id = %id, expects_finish, "resize started");
        }
    }

    /// Pointer released at `(column, row)`: end any drag or grip and finish
    /// the resize of the window under the pointer or the one the grip held.
    pub fn release_pointer(&mut self, column: u16, row: u16) -> bool {
        let mut handled = self.drag.end().is_some();
        let mut targets = Vec::new();
        if let Some(id) = self.end_grip() {
            handled = true;
            targets.push(id);
        }
        if let Some(id) = self.window_at(column, row)
            && !targets.contains(&id)
        {
            targets.push(id);
        }
        for id in targets {
            let resizing = self
                .windows
                .get(&id)
                .is_some_and(|window| window.state.being_resized);
            if resizing {
                self.call_hook(&id, |content, cx| content.finish_resize(cx));
                if let Some(window) = self.windows.get_mut(&id) {
                    window.state.being_resized = false;
                }
                tracing::trace!(window_id = %id, "resize finished");
            }
        }
        self.settle();
        handled
    }

    /// Route one input event. Returns whether the desktop consumed it.
    pub fn handle_event(&mut self, event: &Event) -> bool {
        let consumed = match event {
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Key(key) => self.handle_key(key),
            _ => false,
        };
        self.settle();
        consumed
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent) -> bool {
        let (column, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(button) => {
                if let Some(menu) = self.shared.menu.get() {
                    match menu.hit(column, row) {
                        MenuHit::Item(index) => {
                            if let Some((payload, handler)) = self
                                .shared
                                .menu
                                .take()
                                .and_then(|menu| menu.take_action(index))
                            {
                                tracing::debug!(index, "menu item chosen");
                                handler(self, payload);
                            }
                            return true;
                        }
                        MenuHit::Inert => return true,
                        MenuHit::Frame => {
                            self.shared.menu.close();
                            return true;
                        }
                        MenuHit::Outside => {
                            self.shared.menu.close();
                        }
                    }
                }
                let Some(id) = self.window_at(column, row) else {
                    return false;
                };
                if button == MouseButton::Left
                    && let Some(rect) = self.window_rect(&id)
                {
                    let result = match self.decorator.hit_test(rect, column, row) {
                        HeaderAction::Refresh => Some(self.refresh(&id)),
                        HeaderAction::Visibility => Some(self.toggle_collapsed(&id).map(|_| ())),
                        HeaderAction::EditTitle => Some(self.request_title_edit(&id)),
                        HeaderAction::Close => Some(self.close(&id)),
                        HeaderAction::Drag => Some(self.begin_drag(&id, column, row)),
                        HeaderAction::None if self.decorator.grip_hit(rect, column, row) => {
                            Some(self.begin_grip(&id, column, row))
                        }
                        HeaderAction::None => None,
                    };
                    if let Some(result) = result {
                        if let Err(err) = result {
                            tracing::warn!(window_id = %id, error = %err, "header action failed");
                        }
                        return true;
                    }
                }
                self.focus(Some(&id));
                self.forward_mouse(&id, mouse);
                true
            }
            MouseEventKind::Drag(_) => {
                if self.drag_to(column, row) || self.grip_to(column, row) {
                    return true;
                }
                match self.window_at(column, row) {
                    Some(id) => self.forward_mouse(&id, mouse),
                    None => false,
                }
            }
            MouseEventKind::Up(_) => {
                let released = self.release_pointer(column, row);
                let forwarded = match self.window_at(column, row) {
                    Some(id) => self.forward_mouse(&id, mouse),
                    None => false,
                };
                released || forwarded
            }
            MouseEventKind::Moved => {
                if let Some(menu) = self.shared.menu.get_mut() {
                    menu.hover_at(column, row);
                }
                false
            }
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                let delta = if mouse.kind == MouseEventKind::ScrollUp {
                    -1
                } else {
                    1
                };
                if let Some(menu) = self.shared.menu.get_mut()
                    && menu.rect().contains((column, row).into())
                {
                    menu.scroll_by(delta);
                    return true;
                }
                match self.window_at(column, row) {
                    Some(id) => {
                        self.forward_mouse(&id, mouse);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    fn forward_mouse(&mut self, id: &WindowId, mouse: &MouseEvent) -> bool {
        let Some(content) = self.content_rect(id) else {
            return false;
        };
        if !content.contains(mouse.column, mouse.row) {
            return false;
        }
        let event = ContentEvent::Mouse {
            kind: mouse.kind,
            column: (mouse.column as i32 - content.x) as u16,
            row: (mouse.row as i32 - content.y) as u16,
            screen_column: mouse.column,
            screen_row: mouse.row,
        };
        self.call_hook(id, |content, cx| content.handle_event(cx, &event))
            .unwrap_or(false)
    }

    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if key.code == KeyCode::Esc && self.shared.menu.close() {
            return true;
        }
        let Some(id) = self.z_order.current().cloned() else {
            return false;
        };
        let event = ContentEvent::Key(*key);
        self.call_hook(&id, |content, cx| content.handle_event(cx, &event))
            .unwrap_or(false)
    }

    /// Open a menu of items at `(x, y)`, closing any open menu first.
    pub fn create_menu(&mut self, x: u16, y: u16, items: Vec<MenuItem>) {
        let (config, viewport) = (self.shared.config, self.shared.viewport);
        self.shared.menu.create(x, y, items, viewport, &config);
    }

    /// Open a menu of free-form blocks at `(x, y)`, closing any open menu
    /// first.
    pub fn create_menu_with_custom_blocks(&mut self, x: u16, y: u16, blocks: Vec<MenuBlock>) {
        let (config, viewport) = (self.shared.config, self.shared.viewport);
        self.shared
            .menu
            .create_with_blocks(x, y, blocks, viewport, &config);
    }

    pub fn close_menu(&mut self) -> bool {
        self.shared.menu.close()
    }

    pub fn menu(&self) -> Option<&Menu> {
        self.shared.menu.get()
    }

    /// Open the root window of backend `backend`. An unknown backend is
    /// reported to the user as an alert.
    pub fn open_root_window(
        &mut self,
        backend: &str,
        args: RootWindowArgs,
    ) -> Result<WindowId, DesktopError> {
        let factory = match self.modules.get(backend) {
            Ok(module) => module.create_root_window,
            Err(err) => {
                tracing::warn!(backend, node = %args.node_id, "backend module not installed");
                self.shared.host.push(HostRequest::Alert(err.to_string()));
                return Err(err);
            }
        };
        factory(self, args)
    }

    /// Queue a request on behalf of `id`, as the window itself would.
    pub fn send_request(
        &mut self,
        id: &WindowId,
        tag: impl Into<String>,
        request: SessionRequest,
    ) -> Result<Ticket, DesktopError> {
        let window = self
            .windows
            .get(id)
            .ok_or_else(|| DesktopError::UnknownWindow(id.clone()))?;
        Ok(self.shared.enqueue(&window.state, tag.into(), request))
    }

    pub fn take_outbox(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.shared.outbox)
    }

    /// Route a finished request to the window that issued it. Completions for
    /// windows that have since closed or refreshed are dropped.
    pub fn deliver(&mut self, completion: Completion) -> bool {
        let live = self.windows.get(&completion.window).is_some_and(|window| {
            window.state.serial == completion.serial
                && window.state.generation == completion.generation
        });
        if !live {
            tracing::debug!(
                window_id = %completion.window,
                ticket = completion.ticket.0,
                tag = %completion.tag,
                "dropped response for stale window"
            );
            return false;
        }
        let reply = Reply {
            tag: completion.tag,
            result: completion.result,
        };
        self.call_hook(&completion.window, |content, cx| content.on_response(cx, reply));
        self.settle();
        true
    }

    pub fn post_host_request(&mut self, request: HostRequest) {
        self.shared.host.push(request);
    }

    pub fn take_host_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.shared.host)
    }

    /// Deliver resize notifications until none are left; a hook may resize
    /// another window.
    fn settle(&mut self) {
        while self.observer.has_pending() {
            self.flush_resize_batch();
        }
    }

    /// Paint every window bottom to top, then the menu.
    pub fn render(&mut self, frame: &mut UiFrame<'_>) {
        let viewport = self.shared.viewport;
        for id in self.stacking_order() {
            let Some(window) = self.windows.get_mut(&id) else {
                continue;
            };
            let rect = window.state.surface.rect(viewport);
            if rect.visible(viewport).area() == 0 {
                continue;
            }
            let local = Rect::new(0, 0, rect.width, rect.height);
            let mut buffer = Buffer::empty(local);
            let state = &window.state;
            self.decorator.render_window(
                &mut buffer,
                local,
                Chrome {
                    title: &state.surface.title,
                    tone: state.surface.tone,
                    collapsed: state.collapsed.is_some(),
                },
            );
            let content = self.decorator.content_rect(FloatRect {
                x: 0,
                y: 0,
                width: rect.width,
                height: rect.height,
            });
            let content = Rect::new(
                content.x.max(0) as u16,
                content.y.max(0) as u16,
                content.width,
                content.height,
            );
            if content.area() > 0 {
                let focused = state.surface.tone == HeaderTone::Focused;
                let loading = state.surface.loading;
                {
                    let mut ui = UiFrame::from_parts(content, &mut buffer);
                    window
                        .content
                        .render(&mut ui, content, &window.state.surface.markup, focused);
                }
                if loading {
                    let text = "Loading...";
                    let x = content.x + content.width.saturating_sub(text.len() as u16) / 2;
                    let y = content.y + content.height / 2;
                    safe_set_string(
                        &mut buffer,
                        content,
                        x,
                        y,
                        text,
                        crate::theme::muted_text(),
                    );
                }
            }
            frame.composite(&buffer, rect);
        }
        if let Some(menu) = self.shared.menu.get() {
            menu.render(frame);
        }
    }
}

/// Displayed title: a custom title wins, otherwise the variant's title with
/// the session label in front.
fn compose_title(state: &WindowState, base: String, sessions: &SessionRegistry) -> String {
    if let Some(custom) = &state.custom_title {
        return custom.clone();
    }
    match state.scope.session.as_ref().and_then(|id| sessions.get(id)) {
        Some(session) => format!("[Session: {}] {base}", session.label()),
        None => base,
    }
}

impl std::fmt::Debug for Desktop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desktop")
            .field("windows", &self.windows.keys().collect::<Vec<_>>())
            .field("focused", &self.z_order.current())
            .field("menu", &self.shared.menu)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::testing::StubContent;
    use crossterm::event::KeyModifiers;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn desktop() -> Desktop {
        let mut desktop = Desktop::new(DesktopConfig::default());
        desktop.set_viewport(Rect::new(0, 0, 120, 40));
        desktop
    }

    fn stub(kind: &'static str) -> Box<dyn WindowContent> {
        Box::new(StubContent { kind })
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn open_mounts_focuses_and_centers() {
        let mut desktop = desktop();
        let id = desktop.open(stub("A"), OpenOptions::new()).expect("open");
        assert_eq!(id, "w_A_0");
        assert_eq!(desktop.focused(), Some(&id));
        let window = desktop.window(&id).expect("window");
        assert!(window.surface().placement().is_centered());
        assert!(!window.surface().loading());
        assert_eq!(window.surface().title(), "A");
    }

    #[test]
    fn session_scoped_title_and_id() {
        let mut desktop = desktop();
        let session = SessionId::new("s1");
        desktop.sessions_mut().get_or_create(&session, "L");
        let id = desktop
            .open(stub("T"), OpenOptions::new().session(session))
            .expect("open");
        assert_eq!(id, "w_L_T_0");
        assert_eq!(
            desktop.window(&id).map(|w| w.surface().title().to_string()),
            Some("[Session: L] T".to_string())
        );
    }

    #[test]
    fn open_with_unknown_session_fails_without_registering() {
        let mut desktop = desktop();
        let err = desktop
            .open(stub("T"), OpenOptions::new().session(SessionId::new("nope")))
            .unwrap_err();
        assert!(matches!(err, DesktopError::UnknownSession(_)));
        assert!(desktop.is_empty());
    }

    #[test]
    fn header_drag_moves_window_and_clears_centering() {
        let mut desktop = desktop();
        let id = desktop
            .open(stub("A"), OpenOptions::new().at(10, 5).size(30, 10))
            .expect("open");
        assert!(desktop.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 12, 5)));
        assert!(desktop.is_dragging());
        desktop.handle_event(&mouse(MouseEventKind::Drag(MouseButton::Left), 2, 1));
        let rect = desktop.window_rect(&id).expect("rect");
        assert_eq!((rect.x, rect.y), (0, 1));
        desktop.handle_event(&mouse(MouseEventKind::Up(MouseButton::Left), 2, 1));
        assert!(!desktop.is_dragging());
    }

    #[test]
    fn close_control_closes_window() {
        let mut desktop = desktop();
        let id = desktop
            .open(stub("A"), OpenOptions::new().at(0, 0).size(20, 8))
            .expect("open");
        // Close control sits at offset 17 of a 20-wide header.
        desktop.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 17, 0));
        assert!(desktop.window(&id).is_none());
        assert_eq!(desktop.focused(), None);
    }

    #[test]
    fn title_edit_goes_through_host_prompt() {
        let mut desktop = desktop();
        let id = desktop
            .open(stub("A"), OpenOptions::new().at(0, 0).size(20, 8))
            .expect("open");
        desktop.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 15, 0));
        assert_eq!(
            desktop.take_host_requests(),
            vec![HostRequest::PromptTitle {
                window: id.clone(),
                current: "A".into()
            }]
        );
        assert!(!desktop.set_custom_title(&id, Some("  ")).expect("live"));
        assert!(desktop.set_custom_title(&id, Some("Mine")).expect("live"));
        desktop.refresh(&id).expect("refresh");
        assert_eq!(
            desktop.window(&id).map(|w| w.surface().title().to_string()),
            Some("Mine".into())
        );
    }

    #[test]
    fn menu_item_click_closes_menu_then_runs_handler() {
        let mut desktop = desktop();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        desktop.create_menu(
            5,
            5,
            vec![MenuItem::new("Open", Value::from(7), move |desktop, payload| {
                *sink.borrow_mut() = Some((desktop.menu().is_none(), payload));
            })],
        );
        assert!(desktop.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 6, 6)));
        assert_eq!(*seen.borrow(), Some((true, Value::from(7))));
    }

    #[test]
    fn click_outside_menu_closes_it() {
        let mut desktop = desktop();
        desktop.create_menu(5, 5, vec![MenuItem::new("x", Value::Null, |_, _| {})]);
        assert!(!desktop.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 100, 30)));
        assert!(desktop.menu().is_none());
    }

    #[test]
    fn escape_closes_menu() {
        let mut desktop = desktop();
        desktop.create_menu(5, 5, vec![MenuItem::new("x", Value::Null, |_, _| {})]);
        let esc = Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(desktop.handle_event(&esc));
        assert!(desktop.menu().is_none());
    }

    #[test]
    fn focus_next_cycles_bottom_window_up() {
        let mut desktop = desktop();
        let a = desktop.open(stub("A"), OpenOptions::new()).expect("open");
        let b = desktop.open(stub("B"), OpenOptions::new()).expect("open");
        assert!(desktop.focus_next());
        assert_eq!(desktop.focused(), Some(&a));
        assert!(desktop.focus_next());
        assert_eq!(desktop.focused(), Some(&b));
    }

    #[test]
    fn render_draws_windows_in_stacking_order() {
        let mut desktop = desktop();
        desktop.set_viewport(Rect::new(0, 0, 40, 12));
        desktop
            .open(stub("A"), OpenOptions::new().at(0, 0).size(20, 6))
            .expect("open");
        desktop
            .open(stub("B"), OpenOptions::new().at(2, 1).size(20, 6))
            .expect("open");
        let area = Rect::new(0, 0, 40, 12);
        let mut buffer = Buffer::empty(area);
        {
            let mut frame = UiFrame::from_parts(area, &mut buffer);
            desktop.render(&mut frame);
        }
        // B is on top, so its title covers A's header row below it.
        assert_eq!(buffer[(3, 1)].symbol(), "B");
        assert_eq!(buffer[(1, 0)].symbol(), "A");
        assert_eq!(buffer[(3, 2)].symbol(), "s");
    }
}
