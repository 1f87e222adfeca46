//! The transient context menu: at most one open at a time, placed at the
//! pointer and pulled back inside the viewport when it would overflow.

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};
use serde_json::Value;

use crate::config::{DesktopConfig, MenuMargins};
use crate::theme;
use crate::ui::UiFrame;
use crate::window::Desktop;

/// Invoked with the item's payload after the menu has been closed.
pub type MenuHandler = Box<dyn FnOnce(&mut Desktop, Value)>;

pub struct MenuAction {
    payload: Value,
    handler: MenuHandler,
}

/// One clickable row of a regular menu. Regular items always highlight on
/// hover.
pub struct MenuItem {
    label: Line<'static>,
    action: Option<MenuAction>,
}

impl MenuItem {
    pub fn new<F>(label: impl Into<Line<'static>>, payload: Value, handler: F) -> Self
    where
        F: FnOnce(&mut Desktop, Value) + 'static,
    {
        Self {
            label: label.into(),
            action: Some(MenuAction {
                payload,
                handler: Box::new(handler),
            }),
        }
    }
}

/// A free-form block of lines. Without a handler a click on it is swallowed
/// and the menu stays open.
pub struct MenuBlock {
    lines: Vec<Line<'static>>,
    hover: bool,
    action: Option<MenuAction>,
}

impl MenuBlock {
    pub fn new<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Line<'static>>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            hover: false,
            action: None,
        }
    }

    pub fn hover(mut self, hover: bool) -> Self {
        self.hover = hover;
        self
    }

    pub fn on_click<F>(mut self, payload: Value, handler: F) -> Self
    where
        F: FnOnce(&mut Desktop, Value) + 'static,
    {
        self.action = Some(MenuAction {
            payload,
            handler: Box::new(handler),
        });
        self
    }
}

struct Entry {
    lines: Vec<Line<'static>>,
    hover: bool,
    action: Option<MenuAction>,
}

impl From<MenuItem> for Entry {
    fn from(item: MenuItem) -> Self {
        Self {
            lines: vec![item.label],
            hover: true,
            action: item.action,
        }
    }
}

impl From<MenuBlock> for Entry {
    fn from(block: MenuBlock) -> Self {
        Self {
            lines: block.lines,
            hover: block.hover,
            action: block.action,
        }
    }
}

/// Where a pointer landed relative to the open menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuHit {
    /// An entry that carries a handler.
    Item(usize),
    /// A block without a handler; the click is swallowed.
    Inert,
    /// Border or padding of the menu, off every entry.
    Frame,
    Outside,
}

pub struct Menu {
    anchor: (u16, u16),
    entries: Vec<Entry>,
    rect: Rect,
    natural: (u16, u16),
    scroll: u16,
    hovered: Option<usize>,
    z_index: u32,
}

impl Menu {
    fn build(x: u16, y: u16, entries: Vec<Entry>, viewport: Rect, config: &DesktopConfig) -> Self {
        let content_width = entries
            .iter()
            .flat_map(|entry| entry.lines.iter())
            .map(|line| line.width())
            .max()
            .unwrap_or(0);
        let content_height: usize = entries.iter().map(|entry| entry.lines.len()).sum();
        let natural = (
            (content_width + 2).min(u16::MAX as usize) as u16,
            (content_height + 2).min(u16::MAX as usize) as u16,
        );
        let rect = place_menu(x, y, natural.0, natural.1, viewport, config.menu_margins);
        Self {
            anchor: (x, y),
            entries,
            rect,
            natural,
            scroll: 0,
            hovered: None,
            z_index: config.menu_z_index,
        }
    }

    pub fn anchor(&self) -> (u16, u16) {
        self.anchor
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Width and height the menu would take without clamping.
    pub fn natural_size(&self) -> (u16, u16) {
        self.natural
    }

    pub fn z_index(&self) -> u32 {
        self.z_index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Plain text of every entry, one string per line.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|entry| entry.lines.iter())
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    fn inner(&self) -> Rect {
        Block::default().borders(Borders::ALL).inner(self.rect)
    }

    fn entry_at(&self, column: u16, row: u16) -> Option<usize> {
        let inner = self.inner();
        if !inner.contains((column, row).into()) {
            return None;
        }
        let mut line = (row - inner.y) as usize + self.scroll as usize;
        for (index, entry) in self.entries.iter().enumerate() {
            if line < entry.lines.len() {
                return Some(index);
            }
            line -= entry.lines.len();
        }
        None
    }

    pub fn hit(&self, column: u16, row: u16) -> MenuHit {
        if !self.rect.contains((column, row).into()) {
            return MenuHit::Outside;
        }
        match self.entry_at(column, row) {
            Some(index) if self.entries[index].action.is_some() => MenuHit::Item(index),
            Some(_) => MenuHit::Inert,
            None => MenuHit::Frame,
        }
    }

    pub fn hover_at(&mut self, column: u16, row: u16) {
        self.hovered = self
            .entry_at(column, row)
            .filter(|&index| self.entries[index].hover);
    }

    /// Scroll a clamped menu by `delta` lines.
    pub fn scroll_by(&mut self, delta: i32) {
        let total: usize = self.entries.iter().map(|e| e.lines.len()).sum();
        let visible = self.inner().height as usize;
        let max = total.saturating_sub(visible) as i32;
        self.scroll = (self.scroll as i32 + delta).clamp(0, max) as u16;
    }

    pub(crate) fn take_action(mut self, index: usize) -> Option<(Value, MenuHandler)> {
        if index >= self.entries.len() {
            return None;
        }
        self.entries
            .swap_remove(index)
            .action
            .map(|action| (action.payload, action.handler))
    }

    pub fn render(&self, frame: &mut UiFrame<'_>) {
        if self.rect.width == 0 || self.rect.height == 0 {
            return;
        }
        let mut lines = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let mut style = Style::default();
            if index == 0 {
                style = style.add_modifier(Modifier::BOLD);
            }
            if self.hovered == Some(index) {
                style = style.bg(theme::menu_hover_bg()).fg(theme::menu_hover_fg());
            }
            lines.extend(entry.lines.iter().cloned().map(|line| line.patch_style(style)));
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .style(Style::default().bg(theme::menu_bg()).fg(theme::menu_fg()));
        frame.render_widget(Clear, self.rect);
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(block)
                .scroll((self.scroll, 0)),
            self.rect,
        );
    }
}

impl std::fmt::Debug for Menu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Menu")
            .field("anchor", &self.anchor)
            .field("rect", &self.rect)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Rectangle for a menu of natural size `width` x `height` anchored at
/// `(x, y)`.
///
/// The top edge stays at `y`; the height is cut so the bottom edge stays
/// `margins.bottom` above the viewport bottom. If the right edge would pass
/// `margins.right` before the viewport's right edge, the menu opens leftwards
/// from the anchor instead, never past the left edge. The anchor is first
/// pulled back to the right limit and the width is capped to the room left of
/// it, so the whole menu stays within `[viewport.x, right limit]`.
pub fn place_menu(
    x: u16,
    y: u16,
    width: u16,
    height: u16,
    viewport: Rect,
    margins: MenuMargins,
) -> Rect {
    let limit_bottom = viewport.bottom().saturating_sub(margins.bottom);
    let limit_right = viewport.right().saturating_sub(margins.right);

    let height = if y.saturating_add(height) > limit_bottom {
        limit_bottom.saturating_sub(y)
    } else {
        height
    };

    let width = width.min(limit_right.saturating_sub(viewport.x));
    let left = if x.saturating_add(width) > limit_right {
        x.min(limit_right)
            .saturating_sub(width)
            .max(viewport.x)
    } else {
        x
    };

    Rect {
        x: left,
        y,
        width,
        height,
    }
}

/// Holder for the single open menu.
#[derive(Default)]
pub struct MenuSlot {
    menu: Option<Menu>,
}

impl MenuSlot {
    pub fn create(
        &mut self,
        x: u16,
        y: u16,
        items: Vec<MenuItem>,
        viewport: Rect,
        config: &DesktopConfig,
    ) {
        let entries = items.into_iter().map(Entry::from).collect();
        self.open(Menu::build(x, y, entries, viewport, config));
    }

    pub fn create_with_blocks(
        &mut self,
        x: u16,
        y: u16,
        blocks: Vec<MenuBlock>,
        viewport: Rect,
        config: &DesktopConfig,
    ) {
        let entries = blocks.into_iter().map(Entry::from).collect();
        self.open(Menu::build(x, y, entries, viewport, config));
    }

    fn open(&mut self, menu: Menu) {
        self.close();
        tracing::debug!(x = menu.anchor.0, y = menu.anchor.1, rect = ?menu.rect, "menu opened");
        self.menu = Some(menu);
    }

    /// Close the open menu. Returns whether there was one.
    pub fn close(&mut self) -> bool {
        match self.menu.take() {
            Some(_) => {
                tracing::debug!("menu closed");
                true
            }
            None => false,
        }
    }

    pub fn get(&self) -> Option<&Menu> {
        self.menu.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut Menu> {
        self.menu.as_mut()
    }

    pub(crate) fn take(&mut self) -> Option<Menu> {
        self.menu.take()
    }

    pub fn is_open(&self) -> bool {
        self.menu.is_some()
    }
}

impl std::fmt::Debug for MenuSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuSlot").field("menu", &self.menu).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PX: MenuMargins = MenuMargins {
        right: 20,
        bottom: 30,
    };

    #[test]
    fn fitting_menu_keeps_anchor_and_size() {
        let rect = place_menu(10, 10, 30, 8, Rect::new(0, 0, 200, 100), PX);
        assert_eq!(rect, Rect::new(10, 10, 30, 8));
    }

    #[test]
    fn overflowing_menu_is_pulled_inside_margins() {
        let viewport = Rect::new(0, 0, 200, 100);
        let rect = place_menu(190, 50, 40, 25, viewport, PX);
        assert!(rect.x + rect.width <= 200 - 20);
        assert!(rect.y + rect.height <= 100 - 30);
        assert_eq!(rect.y, 50);
    }

    #[test]
    fn right_overflow_opens_leftwards_from_anchor() {
        let rect = place_menu(170, 0, 30, 5, Rect::new(0, 0, 200, 100), PX);
        assert_eq!(rect.x, 140);
    }

    #[test]
    fn left_shift_never_goes_negative() {
        let rect = place_menu(15, 0, 60, 5, Rect::new(0, 0, 70, 100), PX);
        assert_eq!(rect.x, 0);
        assert!(rect.right() <= 50);
    }

    #[test]
    fn bottom_clamp_can_shrink_to_nothing() {
        let rect = place_menu(0, 80, 10, 10, Rect::new(0, 0, 200, 100), PX);
        assert_eq!(rect.height, 0);
    }

    #[test]
    fn new_menu_replaces_open_one() {
        let config = DesktopConfig::default();
        let viewport = Rect::new(0, 0, 200, 100);
        let mut slot = MenuSlot::default();
        slot.create(1, 1, vec![MenuItem::new("a", json!(1), |_, _| {})], viewport, &config);
        slot.create(
            5,
            5,
            vec![
                MenuItem::new("b", json!(2), |_, _| {}),
                MenuItem::new("c", json!(3), |_, _| {}),
            ],
            viewport,
            &config,
        );
        let menu = slot.get().expect("menu");
        assert_eq!(menu.anchor(), (5, 5));
        assert_eq!(menu.labels(), vec!["b", "c"]);
        assert_eq!(menu.z_index(), config.menu_z_index);
    }

    #[test]
    fn blocks_without_handler_are_inert() {
        let config = DesktopConfig::default();
        let mut slot = MenuSlot::default();
        slot.create_with_blocks(
            0,
            0,
            vec![
                MenuBlock::new(["header", "text"]),
                MenuBlock::new(["go"]).hover(true).on_click(json!("x"), |_, _| {}),
            ],
            Rect::new(0, 0, 200, 100),
            &config,
        );
        let menu = slot.get_mut().expect("menu");
        // Border row 0, block one on rows 1-2, block two on row 3.
        assert_eq!(menu.hit(1, 1), MenuHit::Inert);
        assert_eq!(menu.hit(1, 3), MenuHit::Item(1));
        assert_eq!(menu.hit(0, 0), MenuHit::Frame);
        assert_eq!(menu.hit(100, 50), MenuHit::Outside);
        menu.hover_at(1, 1);
        assert_eq!(menu.hovered(), None);
        menu.hover_at(1, 3);
        assert_eq!(menu.hovered(), Some(1));
    }
}
