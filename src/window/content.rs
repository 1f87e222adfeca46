//! The hook contract every window variant implements, and the context the
//! hooks receive.

use crossterm::event::{KeyEvent, MouseEventKind};
use ratatui::layout::Rect;
use ratatui::text::{Line, Text};
use ratatui::widgets::Paragraph;
use serde_json::{Map, Value};

use super::desktop::{HostRequest, Shared};
use super::{WindowId, WindowScope, WindowState};
use crate::error::DesktopError;
use crate::menu::{MenuBlock, MenuItem};
use crate::panels::{PanelId, PanelStore};
use crate::session::{FormPayload, Session, SessionRequest};
use crate::transport::{Reply, ResponseKind, Ticket};
use crate::ui::UiFrame;

/// Content lines of a window, rebuilt from [`WindowContent::content_code`]
/// whenever the window is constructed or refreshed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentMarkup {
    lines: Vec<Line<'static>>,
}

impl ContentMarkup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build markup from a block of text, one line per row. A single leading
    /// newline is dropped so `indoc!` blocks read naturally.
    pub fn from_text(text: &str) -> Self {
        let text = text.strip_prefix('\n').unwrap_or(text);
        Self {
            lines: text.lines().map(|line| Line::from(line.to_string())).collect(),
        }
    }

    pub fn lines(&self) -> &[Line<'static>] {
        &self.lines
    }

    pub fn set_lines<I, L>(&mut self, lines: I)
    where
        I: IntoIterator<Item = L>,
        L: Into<Line<'static>>,
    {
        self.lines = lines.into_iter().map(Into::into).collect();
    }

    pub fn push(&mut self, line: impl Into<Line<'static>>) {
        self.lines.push(line.into());
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Unstyled text of line `index`.
    pub fn plain(&self, index: usize) -> Option<String> {
        self.lines.get(index).map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect()
        })
    }
}

impl From<Vec<Line<'static>>> for ContentMarkup {
    fn from(lines: Vec<Line<'static>>) -> Self {
        Self { lines }
    }
}

/// Input routed to a window's content area. Coordinates are local to the
/// content rectangle; `screen_*` keep the absolute position for anchoring
/// menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEvent {
    Mouse {
        kind: MouseEventKind,
        column: u16,
        row: u16,
        screen_column: u16,
        screen_row: u16,
    },
    Key(KeyEvent),
}

/// Hooks a window variant supplies. The desktop owns geometry, header
/// controls, focus and lifecycle; the variant owns what goes inside.
pub trait WindowContent {
    /// Stable type tag used in window ids.
    fn kind(&self) -> &'static str;

    /// Initial content markup, applied on construct and on every refresh.
    fn content_code(&self) -> ContentMarkup;

    fn title(&self) -> String;

    /// Populate the content for `data`. Must call [`WindowCx::hide_loading`]
    /// at some point, possibly after a request completes.
    fn setup(&mut self, cx: &mut WindowCx<'_>, data: &Value, is_refresh: bool);

    /// Runs before a refresh rebuilds the content. Give back anything the
    /// window borrowed.
    fn prepare_refresh(&mut self, cx: &mut WindowCx<'_>, data: &Value);

    /// Runs before the window is removed. Same contract as `prepare_refresh`.
    fn prepare_close(&mut self, cx: &mut WindowCx<'_>);

    /// The window's size started changing. Returns whether `finish_resize`
    /// should follow once the pointer is released.
    fn start_resize(&mut self, cx: &mut WindowCx<'_>) -> bool;

    fn finish_resize(&mut self, cx: &mut WindowCx<'_>);

    fn on_response(&mut self, _cx: &mut WindowCx<'_>, _reply: Reply) {}

    fn handle_event(&mut self, _cx: &mut WindowCx<'_>, _event: &ContentEvent) -> bool {
        false
    }

    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect, markup: &ContentMarkup, _focused: bool) {
        let text = Text::from(markup.lines().to_vec());
        frame.render_widget(Paragraph::new(text), area);
    }
}

/// What a content hook can reach while it runs: its own window state and the
/// desktop services that do not involve other windows' content.
pub struct WindowCx<'a> {
    pub(crate) state: &'a mut WindowState,
    pub(crate) shared: &'a mut Shared,
}

impl<'a> WindowCx<'a> {
    pub(crate) fn new(state: &'a mut WindowState, shared: &'a mut Shared) -> Self {
        Self { state, shared }
    }

    pub fn id(&self) -> &WindowId {
        &self.state.id
    }

    pub fn state(&self) -> &WindowState {
        self.state
    }

    pub fn scope(&self) -> &WindowScope {
        &self.state.scope
    }

    pub fn session(&self) -> Option<&Session> {
        let id = self.state.scope.session.as_ref()?;
        self.shared.sessions.get(id)
    }

    pub fn viewport(&self) -> Rect {
        self.shared.viewport
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.state.data
    }

    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.state.data
    }

    /// The session's data bag for this window's node and module, created on
    /// first use. `None` unless the window has a session, node id and module
    /// name.
    pub fn module_data(&mut self) -> Option<&mut Map<String, Value>> {
        let scope = &self.state.scope;
        let (Some(session), Some(node), Some(module)) = (
            scope.session.as_ref(),
            scope.node_id.as_deref(),
            scope.module_name.as_deref(),
        ) else {
            return None;
        };
        self.shared
            .sessions
            .get_mut(session)
            .map(|session| session.module_data_mut(node, module))
    }

    pub fn markup(&self) -> &ContentMarkup {
        &self.state.surface.markup
    }

    pub fn markup_mut(&mut self) -> &mut ContentMarkup {
        &mut self.state.surface.markup
    }

    pub fn set_lines<I, L>(&mut self, lines: I)
    where
        I: IntoIterator<Item = L>,
        L: Into<Line<'static>>,
    {
        self.state.surface.markup.set_lines(lines);
    }

    pub fn push_line(&mut self, line: impl Into<Line<'static>>) {
        self.state.surface.markup.push(line);
    }

    pub fn show_loading(&mut self) {
        self.state.surface.loading = true;
    }

    pub fn hide_loading(&mut self) {
        self.state.surface.loading = false;
    }

    /// Build a request scoped to this window's session, entity, node and
    /// module.
    pub fn request(&self, form: FormPayload, kind: ResponseKind) -> Result<SessionRequest, DesktopError> {
        let scope = &self.state.scope;
        let session = self
            .session()
            .ok_or_else(|| DesktopError::NoSession(self.state.id.clone()))?;
        Ok(session.request(
            scope.entity_id.as_deref(),
            scope.node_id.as_deref(),
            scope.module_name.as_deref(),
            form,
            kind,
        ))
    }

    /// Queue `request`; the answer comes back through
    /// [`WindowContent::on_response`] carrying `tag`, unless this window is
    /// closed or refreshed first.
    pub fn send(&mut self, tag: impl Into<String>, request: SessionRequest) -> Ticket {
        self.shared.enqueue(self.state, tag.into(), request)
    }

    pub fn panels(&self) -> &PanelStore {
        &self.shared.panels
    }

    pub fn panels_mut(&mut self) -> &mut PanelStore {
        &mut self.shared.panels
    }

    /// Claim `panel` for this window, giving back `previous` first.
    pub fn swap_panel(
        &mut self,
        previous: Option<&PanelId>,
        panel: &PanelId,
    ) -> Result<(), DesktopError> {
        let owner = self.state.id.clone();
        if let Some(previous) = previous {
            self.shared.panels.release(previous, &owner);
        }
        self.shared.panels.claim(panel, &owner)
    }

    pub fn open_menu(&mut self, x: u16, y: u16, items: Vec<MenuItem>) {
        let (config, viewport) = (self.shared.config, self.shared.viewport);
        self.shared.menu.create(x, y, items, viewport, &config);
    }

    pub fn open_menu_with_blocks(&mut self, x: u16, y: u16, blocks: Vec<MenuBlock>) {
        let (config, viewport) = (self.shared.config, self.shared.viewport);
        self.shared
            .menu
            .create_with_blocks(x, y, blocks, viewport, &config);
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        self.shared.host.push(HostRequest::Alert(message.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn from_text_drops_leading_newline_only() {
        let markup = ContentMarkup::from_text(indoc! {"
            first

            third
        "});
        assert_eq!(markup.len(), 3);
        assert_eq!(markup.plain(0).as_deref(), Some("first"));
        assert_eq!(markup.plain(1).as_deref(), Some(""));
    }

    #[test]
    fn plain_joins_styled_spans() {
        use ratatui::style::Stylize;
        use ratatui::text::Span;
        let mut markup = ContentMarkup::new();
        markup.push(Line::from(vec![Span::raw("pid "), "42".bold()]));
        assert_eq!(markup.plain(0).as_deref(), Some("pid 42"));
        assert_eq!(markup.plain(1), None);
    }
}
