use ratatui::style::{Color, Modifier, Style};

// Centralized theme colors. Keep these as small helpers so widgets never
// hard-code a palette.

// Window header
pub fn header_focused_bg() -> Color {
    Color::Black
}
pub fn header_focused_fg() -> Color {
    Color::White
}
pub fn header_unfocused_bg() -> Color {
    Color::Gray
}
pub fn header_unfocused_fg() -> Color {
    Color::Black
}
pub fn window_border() -> Color {
    Color::DarkGray
}

// Menu
pub fn menu_bg() -> Color {
    Color::Black
}
pub fn menu_fg() -> Color {
    Color::White
}
pub fn menu_hover_bg() -> Color {
    Color::White
}
pub fn menu_hover_fg() -> Color {
    Color::Black
}

// Dialog / prompt
pub fn dialog_bg() -> Color {
    Color::Black
}
pub fn dialog_fg() -> Color {
    Color::White
}

// Base graph
pub fn graph_node() -> Color {
    Color::Cyan
}
pub fn graph_node_selected() -> Color {
    Color::Yellow
}
pub fn graph_edge() -> Color {
    Color::DarkGray
}

// Status bar
pub fn footer_bg() -> Color {
    Color::DarkGray
}
pub fn footer_fg() -> Color {
    Color::White
}

/// Inline error text, used by the footer and by window contents.
pub fn error_text() -> Style {
    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
}

pub fn muted_text() -> Style {
    Style::default().fg(Color::DarkGray)
}

// Flame graph frames cycle through warm colors by depth.
pub fn flame_frame(depth: usize) -> Color {
    const PALETTE: [Color; 4] = [Color::Red, Color::LightRed, Color::Yellow, Color::LightYellow];
    PALETTE[depth % PALETTE.len()]
}
