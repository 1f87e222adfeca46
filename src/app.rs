//! The host around the desktop: session picking and loading, the base graph,
//! the footer, and the modal overlays that answer [`HostRequest`]s.

use std::io;
use std::time::Instant;

use crossterm::event::{Event, MouseButton, MouseEventKind};
use ratatui::layout::Rect;
use serde_json::json;

use crate::components::{
    Component, DialogOverlay, FooterTone, PromptOutcome, PromptOverlay, StatusBar,
};
use crate::config::DesktopConfig;
use crate::error::RequestFailure;
use crate::event_loop::ControlFlow;
use crate::graph::{self, GraphView, SystemGraph};
use crate::keybindings::{Action, KeyBindings};
use crate::menu::MenuItem;
use crate::session::SessionId;
use crate::transport::{SessionInfo, Worker, WorkerJob, WorkerResult};
use crate::ui::UiFrame;
use crate::viewers::settings::SettingsWindow;
use crate::window::{Desktop, HostRequest, OpenOptions, WindowId};

pub const PLEASE_WAIT: &str = "Please wait...";
pub const GUIDANCE: &str = "You can see a graph describing your computer system. Double-click any node to open an internal window with its detailed analysis as implemented by its backend.";
pub const NO_SESSION: &str = "Press s to pick a session.";

/// Footer text for a failed session load.
pub fn session_failure_text(failure: &RequestFailure) -> String {
    if failure.status == 500 {
        "Could not load the session because of an error on the server side!".to_string()
    } else {
        format!("Could not load the session! (HTTP code {})", failure.status)
    }
}

pub struct App {
    desktop: Desktop,
    graph: Option<GraphView>,
    worker: Worker,
    keys: KeyBindings,
    footer: StatusBar,
    dialog: DialogOverlay,
    prompt: PromptOverlay,
    prompt_target: Option<WindowId>,
    sessions: Vec<SessionInfo>,
    current: Option<SessionInfo>,
    preselect: Option<SessionId>,
    in_flight: usize,
    area: Rect,
}

impl App {
    pub fn new(worker: Worker, keys: KeyBindings) -> Self {
        let mut footer = StatusBar::new();
        footer.set_left(NO_SESSION, FooterTone::Info);
        footer.set_right(keys.hint());
        let mut app = Self {
            desktop: Desktop::new(DesktopConfig::for_terminal()),
            graph: None,
            worker,
            keys,
            footer,
            dialog: DialogOverlay::new(),
            prompt: PromptOverlay::new(),
            prompt_target: None,
            sessions: Vec::new(),
            current: None,
            preselect: None,
            in_flight: 0,
            area: Rect::new(0, 0, 80, 24),
        };
        app.submit(WorkerJob::ListSessions);
        app
    }

    /// Load session `id` as soon as the session list arrives.
    pub fn preselect(&mut self, id: SessionId) {
        self.preselect = Some(id);
    }

    pub fn desktop(&self) -> &Desktop {
        &self.desktop
    }

    pub fn desktop_mut(&mut self) -> &mut Desktop {
        &mut self.desktop
    }

    pub fn graph(&self) -> Option<&GraphView> {
        self.graph.as_ref()
    }

    pub fn footer(&self) -> &StatusBar {
        &self.footer
    }

    pub fn dialog(&self) -> &DialogOverlay {
        &self.dialog
    }

    pub fn prompt(&self) -> &PromptOverlay {
        &self.prompt
    }

    pub fn sessions(&self) -> &[SessionInfo] {
        &self.sessions
    }

    pub fn current_session(&self) -> Option<&SessionInfo> {
        self.current.as_ref()
    }

    /// Terminal area; the bottom row is the footer, the rest the desktop.
    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
        self.desktop.set_viewport(desktop_area(area));
    }

    fn submit(&mut self, job: WorkerJob) {
        match self.worker.submit(job) {
            Ok(()) => self.in_flight += 1,
            Err(err) => {
                tracing::error!(error = %err, "could not reach request worker");
                self.dialog.alert(err.to_string());
            }
        }
    }

    pub fn load_session(&mut self, info: SessionInfo) {
        tracing::info!(session = %info.id, label = %info.label, "loading session");
        self.desktop
            .sessions_mut()
            .get_or_create(&info.id, &info.label);
        self.graph = None;
        self.footer.set_left(PLEASE_WAIT, FooterTone::Info);
        self.submit(WorkerJob::LoadGraph(info.id.clone()));
        self.current = Some(info);
    }

    pub fn reload_session(&mut self) -> bool {
        match self.current.clone() {
            Some(info) => {
                self.load_session(info);
                true
            }
            None => false,
        }
    }

    pub fn open_session_picker(&mut self) {
        if self.sessions.is_empty() {
            self.footer
                .set_left("No sessions are available.", FooterTone::Error);
            return;
        }
        let items = self
            .sessions
            .iter()
            .map(|info| {
                let pick = info.clone();
                MenuItem::new(
                    info.label.clone(),
                    json!({"id": info.id.as_str()}),
                    move |desktop, _payload| {
                        desktop.post_host_request(HostRequest::LoadSession {
                            id: pick.id,
                            label: pick.label,
                        });
                    },
                )
            })
            .collect();
        let viewport = self.desktop.viewport();
        self.desktop.create_menu(viewport.x + 1, viewport.y + 1, items);
    }

    pub fn open_settings(&mut self) -> Option<WindowId> {
        match self
            .desktop
            .open(Box::new(SettingsWindow::default()), OpenOptions::new())
        {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "could not open settings");
                None
            }
        }
    }

    /// Forward queued window requests, then apply whatever results arrived.
    pub fn pump(&mut self) {
        self.flush_outbox();
        for result in self.worker.drain() {
            self.apply(result);
        }
        self.answer_host_requests();
    }

    /// Block until every submitted job has been answered, including the
    /// requests those answers trigger.
    pub fn wait_idle(&mut self) -> io::Result<()> {
        loop {
            self.flush_outbox();
            self.answer_host_requests();
            self.flush_outbox();
            if self.in_flight == 0 {
                return Ok(());
            }
            let result = self.worker.recv().map_err(io::Error::other)?;
            self.apply(result);
        }
    }

    fn flush_outbox(&mut self) {
        for envelope in self.desktop.take_outbox() {
            self.submit(WorkerJob::Post(envelope));
        }
    }

    fn apply(&mut self, result: WorkerResult) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            WorkerResult::Sessions(Ok(list)) => {
                tracing::debug!(count = list.len(), "session list received");
                self.sessions = list;
                if let Some(id) = self.preselect.take() {
                    match self.sessions.iter().find(|info| info.id == id).cloned() {
                        Some(info) => self.load_session(info),
                        None => self
                            .footer
                            .set_left(format!("Unknown session \"{id}\"."), FooterTone::Error),
                    }
                }
            }
            WorkerResult::Sessions(Err(failure)) => {
                tracing::warn!(status = failure.status, "could not list sessions");
                self.footer.set_left(
                    format!("Could not list sessions! (HTTP code {})", failure.status),
                    FooterTone::Error,
                );
            }
            WorkerResult::Graph { session, result } => self.apply_graph(session, result),
            WorkerResult::Post(completion) => {
                self.desktop.deliver(completion);
            }
        }
    }

    fn apply_graph(&mut self, session: SessionId, result: Result<serde_json::Value, RequestFailure>) {
        if self.current.as_ref().map(|info| &info.id) != Some(&session) {
            tracing::debug!(session = %session, "dropped graph for unselected session");
            return;
        }
        match result.map_err(|failure| session_failure_text(&failure)) {
            Ok(value) => match SystemGraph::from_value(value) {
                Ok(graph) => {
                    tracing::info!(session = %session, nodes = graph.nodes.len(), "session loaded");
                    self.graph = Some(GraphView::new(session, graph));
                    self.footer.set_left(GUIDANCE, FooterTone::Info);
                }
                Err(err) => {
                    tracing::warn!(session = %session, error = %err, "bad system graph");
                    self.footer.set_left(err.to_string(), FooterTone::Error);
                }
            },
            Err(text) => {
                tracing::warn!(session = %session, "session load failed");
                self.footer.set_left(text, FooterTone::Error);
            }
        }
    }

    fn answer_host_requests(&mut self) {
        for request in self.desktop.take_host_requests() {
            match request {
                HostRequest::Alert(text) => self.dialog.alert(text),
                HostRequest::PromptTitle { window, current } => {
                    self.prompt.open("Window title", &current);
                    self.prompt_target = Some(window);
                }
                HostRequest::LoadSession { id, label } => {
                    self.load_session(SessionInfo { id, label });
                }
            }
        }
    }

    pub fn handle_event(&mut self, event: &Event) -> ControlFlow {
        let flow = self.route(event);
        self.pump();
        flow
    }

    fn route(&mut self, event: &Event) -> ControlFlow {
        if let Event::Resize(width, height) = *event {
            self.set_area(Rect::new(0, 0, width, height));
            return ControlFlow::Continue;
        }
        if self.dialog.handle_event(event) {
            return ControlFlow::Continue;
        }
        if self.prompt.visible() {
            match self.prompt.handle_prompt_event(event) {
                Some(PromptOutcome::Submitted(title)) => {
                    if let Some(window) = self.prompt_target.take()
                        && let Err(err) = self.desktop.set_custom_title(&window, Some(&title))
                    {
                        tracing::warn!(window_id = %window, error = %err, "could not set title");
                    }
                }
                Some(PromptOutcome::Cancelled) => self.prompt_target = None,
                None => {}
            }
            return ControlFlow::Continue;
        }
        match event {
            Event::Key(key) => match self.keys.action_for_key(key) {
                Some(Action::Quit) => return ControlFlow::Quit,
                Some(Action::FocusNext) => {
                    self.desktop.focus_next();
                }
                Some(Action::SessionPicker) => self.open_session_picker(),
                Some(Action::ReloadSession) => {
                    self.reload_session();
                }
                Some(Action::OpenSettings) => {
                    self.open_settings();
                }
                Some(Action::CloseOverlay) | None => {
                    self.desktop.handle_event(event);
                }
            },
            Event::Mouse(mouse) => {
                if !self.desktop.handle_event(event)
                    && mouse.kind == MouseEventKind::Down(MouseButton::Left)
                    && let Some(view) = self.graph.as_mut()
                    && let Some(activation) = view.click(mouse.column, mouse.row, Instant::now())
                {
                    graph::activate(&mut self.desktop, activation, mouse.column, mouse.row);
                }
            }
            _ => {}
        }
        ControlFlow::Continue
    }

    pub fn render(&mut self, frame: &mut UiFrame<'_>) {
        let area = frame.area();
        if area != self.area {
            self.set_area(area);
        }
        let desk = desktop_area(area);
        if let Some(view) = self.graph.as_mut() {
            view.layout(desk);
            view.render(frame, desk);
        }
        self.desktop.render(frame);
        let footer = Rect {
            y: area.y + desk.height,
            height: area.height.saturating_sub(desk.height),
            ..area
        };
        self.footer.render(frame, footer);
        self.prompt.render(frame, area);
        self.dialog.render(frame, area);
    }
}

fn desktop_area(area: Rect) -> Rect {
    Rect {
        height: area.height.saturating_sub(1),
        ..area
    }
}
