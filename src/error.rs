use std::io;

use thiserror::Error;

use crate::session::SessionId;
use crate::window::WindowId;

/// Descriptor handed to failure paths of a session request: the status code
/// the data source answered with and its body text.
///
/// Status `0` means the request never reached the data source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request failed with status {status}: {text}")]
pub struct RequestFailure {
    pub status: u16,
    pub text: String,
}

impl RequestFailure {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    pub fn bad_request() -> Self {
        Self::new(400, "")
    }

    pub fn not_found() -> Self {
        Self::new(404, "")
    }

    pub fn unreachable(text: impl Into<String>) -> Self {
        Self::new(0, text)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

#[derive(Debug, Error)]
pub enum DesktopError {
    #[error("no live window with id {0}")]
    UnknownWindow(WindowId),
    #[error("no session with id {0}")]
    UnknownSession(SessionId),
    #[error("window {0} is not scoped to a session")]
    NoSession(WindowId),
    #[error("Module \"{0}\" is not installed")]
    ModuleNotInstalled(String),
    #[error("panel {panel} is owned by window {owner}")]
    PanelOwned { panel: String, owner: WindowId },
    #[error("no settings panel named {0}")]
    UnknownPanel(String),
    #[error("failed to decode system graph: {0}")]
    Graph(#[from] serde_json::Error),
    #[error(transparent)]
    Request(#[from] RequestFailure),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<DesktopError> for io::Error {
    fn from(err: DesktopError) -> Self {
        match err {
            DesktopError::Io(inner) => inner,
            other => io::Error::other(other.to_string()),
        }
    }
}
