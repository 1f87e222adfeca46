//! Concrete window contents: the settings window and the analysis windows
//! of the built-in backends.

pub mod code;
pub mod flame_graph;
pub mod roofline;
pub mod settings;
pub mod threads;

use ratatui::text::Line;
use serde::de::DeserializeOwned;

use crate::error::{DesktopError, RequestFailure};
use crate::theme;
use crate::transport::Response;
use crate::window::WindowCx;

/// Inline error line for a failed load of `what`.
pub(crate) fn failure_line(what: &str, failure: &RequestFailure) -> Line<'static> {
    let text = if failure.is_server_error() {
        format!("Could not load {what} because of an error on the server side!")
    } else {
        format!("Could not load {what}! (HTTP code {})", failure.status)
    };
    Line::styled(text, theme::error_text())
}

/// Decode a JSON response into `T`.
pub(crate) fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DesktopError> {
    match response {
        Response::Json(value) => Ok(serde_json::from_value(value)?),
        Response::Text(text) => Ok(serde_json::from_str(&text)?),
    }
}

/// Replace the content with an error line and stop the loading indicator.
pub(crate) fn show_error(cx: &mut WindowCx<'_>, line: Line<'static>) {
    tracing::warn!(window_id = %cx.id(), error = %line, "window content failed to load");
    cx.set_lines([line]);
    cx.hide_loading();
}
