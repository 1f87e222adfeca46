#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use crossterm::event::{Event, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use perfdesk::config::DesktopConfig;
use perfdesk::session::form;
use perfdesk::transport::{Reply, ResponseKind};
use perfdesk::window::{ContentMarkup, Desktop, WindowContent, WindowCx};
use ratatui::layout::Rect;
use serde_json::Value;

pub type Log = Rc<RefCell<Vec<String>>>;

/// Content that records every hook call into a shared log.
pub struct Probe {
    pub kind: &'static str,
    pub log: Log,
    pub expects_finish: bool,
    /// Issue a `tree` request from `setup` (needs a session).
    pub request_on_setup: bool,
}

impl Probe {
    pub fn new(kind: &'static str, log: &Log) -> Box<Self> {
        Box::new(Self {
            kind,
            log: Rc::clone(log),
            expects_finish: false,
            request_on_setup: false,
        })
    }

    pub fn resizing(kind: &'static str, log: &Log) -> Box<Self> {
        let mut probe = Self::new(kind, log);
        probe.expects_finish = true;
        probe
    }

    pub fn requesting(kind: &'static str, log: &Log) -> Box<Self> {
        let mut probe = Self::new(kind, log);
        probe.request_on_setup = true;
        probe
    }

    fn record(&self, cx: &WindowCx<'_>, what: &str) {
        self.log.borrow_mut().push(format!("{}:{what}", cx.id()));
    }
}

impl WindowContent for Probe {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn content_code(&self) -> ContentMarkup {
        ContentMarkup::from_text("probe")
    }

    fn title(&self) -> String {
        self.kind.to_string()
    }

    fn setup(&mut self, cx: &mut WindowCx<'_>, _data: &Value, is_refresh: bool) {
        self.record(cx, if is_refresh { "setup(refresh)" } else { "setup" });
        if self.request_on_setup {
            if let Ok(request) = cx.request(form([("tree", "1")]), ResponseKind::Json) {
                cx.send("tree", request);
            }
        } else {
            cx.hide_loading();
        }
    }

    fn prepare_refresh(&mut self, cx: &mut WindowCx<'_>, _data: &Value) {
        self.record(cx, "prepare_refresh");
    }

    fn prepare_close(&mut self, cx: &mut WindowCx<'_>) {
        self.record(cx, "prepare_close");
    }

    fn start_resize(&mut self, cx: &mut WindowCx<'_>) -> bool {
        self.record(cx, "start_resize");
        self.expects_finish
    }

    fn finish_resize(&mut self, cx: &mut WindowCx<'_>) {
        self.record(cx, "finish_resize");
    }

    fn on_response(&mut self, cx: &mut WindowCx<'_>, reply: Reply) {
        self.record(cx, &format!("response:{}", reply.tag));
        cx.hide_loading();
    }
}

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

pub fn desktop() -> Desktop {
    desktop_with(DesktopConfig::for_terminal())
}

pub fn desktop_with(config: DesktopConfig) -> Desktop {
    let mut desktop = Desktop::new(config);
    desktop.set_viewport(Rect::new(0, 0, 120, 40));
    desktop
}

pub fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
    Event::Mouse(MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

pub fn left_down(column: u16, row: u16) -> Event {
    mouse(MouseEventKind::Down(MouseButton::Left), column, row)
}

pub fn left_drag(column: u16, row: u16) -> Event {
    mouse(MouseEventKind::Drag(MouseButton::Left), column, row)
}

pub fn left_up(column: u16, row: u16) -> Event {
    mouse(MouseEventKind::Up(MouseButton::Left), column, row)
}
