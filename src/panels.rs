//! Settings panels that windows borrow for display.
//!
//! Each backend contributes one panel. A panel sits detached until a window
//! claims it and goes back to the detached pool when that window releases it,
//! refreshes or closes.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::DesktopError;
use crate::window::WindowId;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelId(String);

impl PanelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct SettingsPanel {
    id: PanelId,
    backend: String,
    values: Map<String, Value>,
    owner: Option<WindowId>,
}

impl SettingsPanel {
    pub fn new(backend: impl Into<String>, values: Map<String, Value>) -> Self {
        let backend = backend.into();
        Self {
            id: PanelId::new(format!("settings_{backend}")),
            backend,
            values,
            owner: None,
        }
    }

    pub fn id(&self) -> &PanelId {
        &self.id
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.values
    }

    pub fn owner(&self) -> Option<&WindowId> {
        self.owner.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct PanelStore {
    panels: BTreeMap<PanelId, SettingsPanel>,
}

impl PanelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached panel, replacing any panel with the same id.
    pub fn register(&mut self, panel: SettingsPanel) -> PanelId {
        let id = panel.id.clone();
        self.panels.insert(id.clone(), panel);
        id
    }

    pub fn ids(&self) -> impl Iterator<Item = &PanelId> {
        self.panels.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettingsPanel> {
        self.panels.values()
    }

    pub fn get(&self, id: &PanelId) -> Option<&SettingsPanel> {
        self.panels.get(id)
    }

    pub fn get_mut(&mut self, id: &PanelId) -> Option<&mut SettingsPanel> {
        self.panels.get_mut(id)
    }

    pub fn for_backend(&self, backend: &str) -> Option<&SettingsPanel> {
        self.panels.values().find(|panel| panel.backend == backend)
    }

    /// Attach `id` to `owner`. Claiming a panel the same window already holds
    /// succeeds; one held by another window does not.
    pub fn claim(&mut self, id: &PanelId, owner: &WindowId) -> Result<(), DesktopError> {
        let panel = self
            .panels
            .get_mut(id)
            .ok_or_else(|| DesktopError::UnknownPanel(id.to_string()))?;
        match &panel.owner {
            Some(current) if current != owner => Err(DesktopError::PanelOwned {
                panel: id.to_string(),
                owner: current.clone(),
            }),
            _ => {
                panel.owner = Some(owner.clone());
                tracing::debug!(panel = %id, window_id = %owner, "panel claimed");
                Ok(())
            }
        }
    }

    /// Detach `id` if `owner` holds it. Returns whether anything changed.
    pub fn release(&mut self, id: &PanelId, owner: &WindowId) -> bool {
        match self.panels.get_mut(id) {
            Some(panel) if panel.owner.as_ref() == Some(owner) => {
                panel.owner = None;
                tracing::debug!(panel = %id, window_id = %owner, "panel released");
                true
            }
            _ => false,
        }
    }

    /// Detach every panel `owner` still holds.
    pub fn release_all(&mut self, owner: &WindowId) -> Vec<PanelId> {
        let mut released = Vec::new();
        for panel in self.panels.values_mut() {
            if panel.owner.as_ref() == Some(owner) {
                panel.owner = None;
                released.push(panel.id.clone());
            }
        }
        released
    }

    pub fn owned_by(&self, owner: &WindowId) -> Vec<&PanelId> {
        self.panels
            .values()
            .filter(|panel| panel.owner.as_ref() == Some(owner))
            .map(|panel| &panel.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (PanelStore, PanelId) {
        let mut store = PanelStore::new();
        let id = store.register(SettingsPanel::new("perf", Map::new()));
        (store, id)
    }

    #[test]
    fn panel_has_single_owner() {
        let (mut store, id) = store();
        let a = WindowId::compose("settings", None, 0);
        let b = WindowId::compose("settings", None, 1);
        store.claim(&id, &a).expect("first claim");
        store.claim(&id, &a).expect("reclaim by owner");
        match store.claim(&id, &b) {
            Err(DesktopError::PanelOwned { owner, .. }) => assert_eq!(owner, a),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!store.release(&id, &b));
        assert!(store.release(&id, &a));
        store.claim(&id, &b).expect("claim after release");
    }

    #[test]
    fn release_all_returns_held_panels() {
        let (mut store, id) = store();
        let other = store.register(SettingsPanel::new("roofline", Map::new()));
        let a = WindowId::compose("settings", None, 0);
        store.claim(&id, &a).expect("claim");
        assert_eq!(store.release_all(&a), vec![id.clone()]);
        assert!(store.get(&other).and_then(SettingsPanel::owner).is_none());
        assert!(store.owned_by(&a).is_empty());
    }

    #[test]
    fn unknown_panel_is_an_error() {
        let (mut store, _) = store();
        let a = WindowId::compose("settings", None, 0);
        assert!(matches!(
            store.claim(&PanelId::new("nope"), &a),
            Err(DesktopError::UnknownPanel(_))
        ));
    }
}
