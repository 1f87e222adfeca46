//! Shared crate-wide constants.

/// Stacking counter value past which the next focus change compacts every
/// live window's stacking index back into `1..=n`.
pub const FOCUS_RENORMALIZE_THRESHOLD: u32 = 10_000;

/// Stacking index given to the context menu so it always draws above windows.
pub const MENU_Z_INDEX: u32 = FOCUS_RENORMALIZE_THRESHOLD + 1;

/// Gap kept between a menu's right edge and the viewport's right edge.
///
/// Units: pixel-equivalent layout units. The terminal host overrides this
/// with a cell-sized value via [`crate::config::DesktopConfig::for_terminal`].
pub const MENU_MARGIN_RIGHT: u16 = 20;

/// Gap kept between a menu's bottom edge and the viewport's bottom edge.
pub const MENU_MARGIN_BOTTOM: u16 = 30;

/// Rows taken by a window header. A collapsed window is exactly this tall.
pub const HEADER_HEIGHT: u16 = 1;

/// Narrowest a window may be resized to; the header controls need the room.
pub const MIN_WINDOW_WIDTH: u16 = 16;

/// Minimum content height applied to expanded windows.
pub const DEFAULT_MIN_HEIGHT: u16 = 5;

pub const DEFAULT_WINDOW_WIDTH: u16 = 64;
pub const DEFAULT_WINDOW_HEIGHT: u16 = 18;

/// Two presses on the same graph node within this many milliseconds open it.
pub const DOUBLE_CLICK_MS: u64 = 500;
