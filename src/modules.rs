//! Backend modules: the name a graph node gives as its `backend` mapped to
//! the entry point that opens that backend's root window.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::DesktopError;
use crate::session::SessionId;
use crate::viewers;
use crate::window::{Desktop, WindowId};

/// What a root window is opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootWindowArgs {
    pub entity_id: Option<String>,
    pub node_id: String,
    pub session: SessionId,
}

pub type RootWindowFactory = fn(&mut Desktop, RootWindowArgs) -> Result<WindowId, DesktopError>;

#[derive(Debug, Clone)]
pub struct BackendModule {
    pub name: String,
    pub create_root_window: RootWindowFactory,
    /// Initial values of the backend's settings panel.
    pub settings: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, BackendModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the backends shipped in this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(viewers::threads::module());
        registry.register(viewers::roofline::module());
        registry
    }

    pub fn register(&mut self, module: BackendModule) {
        tracing::debug!(module = %module.name, "registered backend module");
        self.modules.insert(module.name.clone(), module);
    }

    pub fn get(&self, name: &str) -> Result<&BackendModule, DesktopError> {
        self.modules
            .get(name)
            .ok_or_else(|| DesktopError::ModuleNotInstalled(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendModule> {
        self.modules.values()
    }
}
