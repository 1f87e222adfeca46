//! Data-source boundary: the [`Transport`] trait, an in-memory fixture
//! implementation, and the background worker that keeps requests off the UI
//! thread.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::RequestFailure;
use crate::session::{SessionId, SessionRequest};
use crate::window::WindowId;

/// How the caller wants a successful response decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Json(Value),
    Text(String),
}

impl Response {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Response::Json(value) => Some(value),
            Response::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Response::Text(text) => Some(text),
            Response::Json(Value::String(text)) => Some(text),
            Response::Json(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub label: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not read fixture {path}: {source}")]
    Fixture { path: PathBuf, source: io::Error },
    #[error("invalid fixture: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request worker has stopped")]
    Disconnected,
}

/// Where session listings, system graphs and analysis payloads come from.
pub trait Transport: Send + Sync {
    fn sessions(&self) -> Result<Vec<SessionInfo>, RequestFailure>;

    /// Node/edge payload describing the profiled system.
    fn system_graph(&self, session: &SessionId) -> Result<Value, RequestFailure>;

    fn post(&self, request: &SessionRequest) -> Result<Response, RequestFailure>;
}

/// One recorded session in a fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureSession {
    pub id: SessionId,
    pub label: String,
    /// Answer `system_graph` with this status instead of the graph.
    pub load_status: Option<u16>,
    pub system: Value,
    pub tree: Option<Value>,
    pub perf_map: Option<Value>,
    pub callchain: Option<Value>,
    pub general_analysis: BTreeMap<String, Value>,
    /// Flame graphs keyed by `"<pid>_<tid>"`.
    pub flame_graphs: BTreeMap<String, Value>,
    pub sources: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub sessions: Vec<FixtureSession>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, TransportError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TransportError::Fixture {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Fixture-backed transport answering the same way the analysis server does:
/// a request without a recognised key is a 400, a missing resource a 404.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    fixture: Fixture,
}

impl MemoryTransport {
    pub fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    pub fn from_json(raw: &str) -> Result<Self, TransportError> {
        Ok(Self::new(serde_json::from_str(raw)?))
    }

    fn session(&self, id: &SessionId) -> Result<&FixtureSession, RequestFailure> {
        self.fixture
            .sessions
            .iter()
            .find(|session| &session.id == id)
            .ok_or_else(RequestFailure::not_found)
    }

    fn lookup(&self, request: &SessionRequest) -> Result<Value, RequestFailure> {
        let session = self.session(&request.session)?;
        let form = &request.form;
        let found = if form.contains_key("tree") {
            session.tree.clone()
        } else if form.contains_key("perf_map") {
            session.perf_map.clone()
        } else if let Some(kind) = form.get("general_analysis") {
            session.general_analysis.get(kind).cloned()
        } else if let (Some(pid), Some(tid), Some(threshold)) =
            (form.get("pid"), form.get("tid"), form.get("threshold"))
        {
            if threshold.parse::<f64>().is_err() {
                return Err(RequestFailure::not_found());
            }
            session.flame_graphs.get(&format!("{pid}_{tid}")).cloned()
        } else if form.contains_key("callchain") {
            session.callchain.clone()
        } else if let Some(name) = form.get("src") {
            session.sources.get(name).cloned().map(Value::String)
        } else {
            return Err(RequestFailure::bad_request());
        };
        found.ok_or_else(RequestFailure::not_found)
    }
}

impl Transport for MemoryTransport {
    fn sessions(&self) -> Result<Vec<SessionInfo>, RequestFailure> {
        Ok(self
            .fixture
            .sessions
            .iter()
            .map(|session| SessionInfo {
                id: session.id.clone(),
                label: session.label.clone(),
            })
            .collect())
    }

    fn system_graph(&self, session: &SessionId) -> Result<Value, RequestFailure> {
        let session = self.session(session)?;
        if let Some(status) = session.load_status {
            return Err(RequestFailure::new(status, ""));
        }
        Ok(session.system.clone())
    }

    fn post(&self, request: &SessionRequest) -> Result<Response, RequestFailure> {
        let value = self.lookup(request)?;
        Ok(match (request.kind, value) {
            (ResponseKind::Text, Value::String(text)) => Response::Text(text),
            (ResponseKind::Text, other) => Response::Text(other.to_string()),
            (ResponseKind::Json, value) => Response::Json(value),
        })
    }
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

/// A window request on its way to the transport, stamped with the identity of
/// the window instance that issued it.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub ticket: Ticket,
    pub window: WindowId,
    pub serial: u64,
    pub generation: u64,
    pub tag: String,
    pub request: SessionRequest,
}

impl Envelope {
    pub fn complete(self, result: Result<Response, RequestFailure>) -> Completion {
        Completion {
            ticket: self.ticket,
            window: self.window,
            serial: self.serial,
            generation: self.generation,
            tag: self.tag,
            result,
        }
    }
}

/// A finished request on its way back to the desktop.
#[derive(Debug, Clone)]
pub struct Completion {
    pub ticket: Ticket,
    pub window: WindowId,
    pub serial: u64,
    pub generation: u64,
    pub tag: String,
    pub result: Result<Response, RequestFailure>,
}

/// What a window's `on_response` hook receives.
#[derive(Debug, Clone)]
pub struct Reply {
    pub tag: String,
    pub result: Result<Response, RequestFailure>,
}

#[derive(Debug, Clone)]
pub enum WorkerJob {
    ListSessions,
    LoadGraph(SessionId),
    Post(Envelope),
}

#[derive(Debug, Clone)]
pub enum WorkerResult {
    Sessions(Result<Vec<SessionInfo>, RequestFailure>),
    Graph {
        session: SessionId,
        result: Result<Value, RequestFailure>,
    },
    Post(Completion),
}

/// Run one job to completion on the calling thread.
pub fn execute(transport: &dyn Transport, job: WorkerJob) -> WorkerResult {
    match job {
        WorkerJob::ListSessions => WorkerResult::Sessions(transport.sessions()),
        WorkerJob::LoadGraph(session) => {
            let result = transport.system_graph(&session);
            WorkerResult::Graph { session, result }
        }
        WorkerJob::Post(envelope) => {
            let result = transport.post(&envelope.request);
            WorkerResult::Post(envelope.complete(result))
        }
    }
}

/// Background thread running a [`Transport`]. Results come back in
/// submission order and are drained without blocking from the UI loop.
pub struct Worker {
    jobs: Option<Sender<WorkerJob>>,
    results: Receiver<WorkerResult>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(transport: Arc<dyn Transport>) -> io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<WorkerJob>();
        let (result_tx, result_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("perfdesk-worker".into())
            .spawn(move || {
                for job in job_rx {
                    let result = execute(transport.as_ref(), job);
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                tracing::debug!("request worker exiting");
            })?;
        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, job: WorkerJob) -> Result<(), TransportError> {
        self.jobs
            .as_ref()
            .ok_or(TransportError::Disconnected)?
            .send(job)
            .map_err(|_| TransportError::Disconnected)
    }

    /// Every result that has arrived so far.
    pub fn drain(&self) -> Vec<WorkerResult> {
        let mut out = Vec::new();
        loop {
            match self.results.try_recv() {
                Ok(result) => out.push(result),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    /// Block until the next result, for callers that have nothing else to do.
    pub fn recv(&self) -> Result<WorkerResult, TransportError> {
        self.results.recv().map_err(|_| TransportError::Disconnected)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("request worker panicked");
        }
    }
}
