//! Analysis sessions and the per-node, per-module data they carry.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::transport::ResponseKind;

/// Server-assigned session identifier.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Form fields of a session request, e.g. `tree=1` or `pid=..&tid=..`.
pub type FormPayload = BTreeMap<String, String>;

/// Build a [`FormPayload`] from `(key, value)` pairs.
pub fn form<K, V, I>(pairs: I) -> FormPayload
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A POST addressed to one session, scoped by the issuing window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub session: SessionId,
    pub entity_id: Option<String>,
    pub node_id: Option<String>,
    pub module_name: Option<String>,
    pub form: FormPayload,
    pub kind: ResponseKind,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    label: String,
    module_data: BTreeMap<(String, String), Map<String, Value>>,
}

impl Session {
    pub fn new(id: SessionId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            module_data: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn module_data(&self, node_id: &str, module_name: &str) -> Option<&Map<String, Value>> {
        self.module_data
            .get(&(node_id.to_string(), module_name.to_string()))
    }

    /// Data bag for `(node_id, module_name)`, created empty on first access.
    pub fn module_data_mut(&mut self, node_id: &str, module_name: &str) -> &mut Map<String, Value> {
        self.module_data
            .entry((node_id.to_string(), module_name.to_string()))
            .or_default()
    }

    pub fn request(
        &self,
        entity_id: Option<&str>,
        node_id: Option<&str>,
        module_name: Option<&str>,
        form: FormPayload,
        kind: ResponseKind,
    ) -> SessionRequest {
        SessionRequest {
            session: self.id.clone(),
            entity_id: entity_id.map(str::to_string),
            node_id: node_id.map(str::to_string),
            module_name: module_name.map(str::to_string),
            form,
            kind,
        }
    }
}

/// Every session the user has selected so far. Records live for the rest of
/// the process.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing record for `id`, or a new one labelled `label`. The label of
    /// an existing record is never changed.
    pub fn get_or_create(&mut self, id: &SessionId, label: &str) -> &mut Session {
        self.sessions.entry(id.clone()).or_insert_with(|| {
            tracing::debug!(session = %id, label, "created session record");
            Session::new(id.clone(), label)
        })
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}
