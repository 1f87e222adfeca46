//! perfdesk: a windowing runtime for performance-analysis viewers, hosted in
//! the terminal.
//!
//! [`window::Desktop`] owns the floating windows, their stacking and focus,
//! dragging and resizing, the single context menu and the request outbox.
//! Analysis backends plug in through [`modules::ModuleRegistry`]; the
//! [`app::App`] host wires the desktop to a [`transport::Worker`], the base
//! [`graph::GraphView`] and the terminal.

pub mod app;
pub mod components;
pub mod config;
pub mod constants;
pub mod demo;
pub mod drivers;
pub mod error;
pub mod event_loop;
pub mod graph;
pub mod keybindings;
pub mod menu;
pub mod modules;
pub mod panels;
pub mod session;
pub mod theme;
pub mod tracing_sub;
pub mod transport;
pub mod ui;
pub mod viewers;
pub mod window;

pub use error::{DesktopError, RequestFailure};
pub use window::{Desktop, WindowId};
