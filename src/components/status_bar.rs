use ratatui::layout::Rect;
use ratatui::style::Style;

use super::Component;
use crate::theme;
use crate::ui::{UiFrame, safe_set_string, truncate_to_width};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FooterTone {
    #[default]
    Info,
    Error,
}

/// One-row footer: status text on the left, key hints on the right.
#[derive(Debug, Clone, Default)]
pub struct StatusBar {
    left: String,
    right: String,
    tone: FooterTone,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_left<T: Into<String>>(&mut self, value: T, tone: FooterTone) {
        self.left = value.into();
        self.tone = tone;
    }

    pub fn set_right<T: Into<String>>(&mut self, value: T) {
        self.right = value.into();
    }

    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn tone(&self) -> FooterTone {
        self.tone
    }
}

impl Component for StatusBar {
    fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let base = Style::default().bg(theme::footer_bg()).fg(theme::footer_fg());
        let left_style = match self.tone {
            FooterTone::Info => base,
            FooterTone::Error => base.patch(theme::error_text()),
        };
        let (x, y) = (area.x, area.y);
        let width = area.width as usize;
        let buffer = frame.buffer_mut();
        let bounds = area.intersection(buffer.area);
        if bounds.width == 0 || bounds.height == 0 {
            return;
        }
        safe_set_string(buffer, bounds, x, y, &" ".repeat(width), base);

        let left = truncate_to_width(&self.left, width);
        let left_width = left.chars().count();
        safe_set_string(buffer, bounds, x, y, &left, left_style);

        // Hints only where they don't cover the status text.
        let right_width = self.right.chars().count();
        if right_width > 0 && left_width + 2 + right_width <= width {
            let start_x = x.saturating_add((width - right_width) as u16);
            safe_set_string(buffer, bounds, start_x, y, &self.right, base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::buffer::Buffer;

    fn row(bar: &mut StatusBar, width: u16) -> String {
        let area = Rect::new(0, 0, width, 1);
        let mut buffer = Buffer::empty(area);
        bar.render(&mut UiFrame::from_parts(area, &mut buffer), area);
        (0..width).map(|x| buffer[(x, 0)].symbol().to_string()).collect()
    }

    #[test]
    fn hints_are_right_aligned() {
        let mut bar = StatusBar::new();
        bar.set_left("Please wait...", FooterTone::Info);
        bar.set_right("s Sessions");
        let text = row(&mut bar, 40);
        assert!(text.starts_with("Please wait..."));
        assert!(text.ends_with("s Sessions"));
    }

    #[test]
    fn long_status_hides_hints() {
        let mut bar = StatusBar::new();
        bar.set_left("x".repeat(35), FooterTone::Error);
        bar.set_right("s Sessions");
        let text = row(&mut bar, 40);
        assert!(!text.contains("Sessions"));
        assert_eq!(bar.tone(), FooterTone::Error);
    }
}
