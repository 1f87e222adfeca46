//! Runtime tunables for a [`crate::window::Desktop`].

use crate::constants::{
    DEFAULT_MIN_HEIGHT, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, FOCUS_RENORMALIZE_THRESHOLD,
    HEADER_HEIGHT, MENU_MARGIN_BOTTOM, MENU_MARGIN_RIGHT, MENU_Z_INDEX, MIN_WINDOW_WIDTH,
};

/// Gaps a menu keeps from the right and bottom viewport edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuMargins {
    pub right: u16,
    pub bottom: u16,
}

impl Default for MenuMargins {
    fn default() -> Self {
        Self {
            right: MENU_MARGIN_RIGHT,
            bottom: MENU_MARGIN_BOTTOM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesktopConfig {
    pub renormalize_threshold: u32,
    pub menu_margins: MenuMargins,
    pub menu_z_index: u32,
    pub default_width: u16,
    pub default_height: u16,
    pub min_width: u16,
    pub min_height: u16,
    pub header_height: u16,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            renormalize_threshold: FOCUS_RENORMALIZE_THRESHOLD,
            menu_margins: MenuMargins::default(),
            menu_z_index: MENU_Z_INDEX,
            default_width: DEFAULT_WINDOW_WIDTH,
            default_height: DEFAULT_WINDOW_HEIGHT,
            min_width: MIN_WINDOW_WIDTH,
            min_height: DEFAULT_MIN_HEIGHT,
            header_height: HEADER_HEIGHT,
        }
    }
}

impl DesktopConfig {
    /// Defaults scaled for a character-cell viewport, where the pixel-sized
    /// menu margins would swallow most of the screen.
    pub fn for_terminal() -> Self {
        Self {
            menu_margins: MenuMargins {
                right: 2,
                bottom: 1,
            },
            ..Self::default()
        }
    }

    pub fn with_renormalize_threshold(mut self, threshold: u32) -> Self {
        self.renormalize_threshold = threshold;
        self
    }

    pub fn with_menu_margins(mut self, margins: MenuMargins) -> Self {
        self.menu_margins = margins;
        self
    }
}
