mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{desktop, desktop_with, left_down, log, mouse, Log, Probe};
use crossterm::event::{MouseButton, MouseEventKind};
use perfdesk::config::DesktopConfig;
use perfdesk::graph::{self, NodeActivation};
use perfdesk::menu::{MenuBlock, MenuItem};
use perfdesk::session::SessionId;
use perfdesk::window::{
    ContentEvent, ContentMarkup, HostRequest, OpenOptions, WindowContent, WindowCx,
};
use ratatui::layout::Rect;
use serde_json::{Value, json};

fn items(labels: &[&str]) -> Vec<MenuItem> {
    labels
        .iter()
        .map(|label| MenuItem::new(label.to_string(), Value::Null, |_, _| {}))
        .collect()
}

#[test]
fn only_one_menu_is_open_at_a_time() {
    let mut desktop = desktop();
    desktop.create_menu(2, 2, items(&["first"]));
    desktop.create_menu(4, 4, items(&["second", "third"]));
    let menu = desktop.menu().expect("menu");
    assert_eq!(menu.labels(), vec!["second", "third"]);
    assert_eq!(menu.anchor(), (4, 4));
}

#[test]
fn menu_stays_inside_viewport_margins() {
    let mut desktop = desktop_with(DesktopConfig::default());
    desktop.set_viewport(Rect::new(0, 0, 200, 100));
    let labels: Vec<String> = (0..60).map(|n| format!("entry {n}")).collect();
    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    desktop.create_menu(195, 60, items(&refs));
    let rect = desktop.menu().expect("menu").rect();
    assert!(rect.x + rect.width <= 180, "{rect:?}");
    assert!(rect.y + rect.height <= 70, "{rect:?}");
    assert_eq!(rect.y, 60);
    assert!(rect.height > 0);
}

#[test]
fn menu_draws_above_every_window() {
    let log = log();
    let mut desktop = desktop();
    desktop.open(Probe::new("A", &log), OpenOptions::new()).expect("open");
    desktop.create_menu(1, 1, items(&["x"]));
    let menu = desktop.menu().expect("menu");
    assert!(menu.z_index() > desktop.largest_z_index());
}

#[test]
fn uninstalled_backend_raises_an_alert() {
    let mut desktop = desktop();
    let session = SessionId::new("s");
    desktop.sessions_mut().get_or_create(&session, "S");
    graph::activate(
        &mut desktop,
        NodeActivation {
            session,
            node_id: "gpu".into(),
            entity_id: None,
            backends: vec!["gpu".into()],
        },
        3,
        3,
    );
    assert!(desktop.is_empty());
    assert_eq!(
        desktop.take_host_requests(),
        vec![HostRequest::Alert("Module \"gpu\" is not installed".into())]
    );
}

#[test]
fn several_backends_open_a_chooser() {
    let mut desktop = desktop();
    let session = SessionId::new("s");
    desktop.sessions_mut().get_or_create(&session, "S");
    graph::activate(
        &mut desktop,
        NodeActivation {
            session,
            node_id: "cpu0".into(),
            entity_id: Some("cpu0".into()),
            backends: vec!["perf".into(), "roofline".into()],
        },
        3,
        3,
    );
    assert_eq!(
        desktop.menu().map(|menu| menu.labels()),
        Some(vec!["perf".to_string(), "roofline".to_string()])
    );
    // Border at row 3, "perf" at row 4, "roofline" at row 5.
    assert!(desktop.handle_event(&left_down(4, 5)));
    assert!(desktop.menu().is_none());
    let id = desktop.focused().cloned().expect("root window");
    assert_eq!(id, "w_S_roofline_0");
    let scope = desktop.window(&id).expect("live").state().scope().clone();
    assert_eq!(scope.node_id.as_deref(), Some("cpu0"));
    assert_eq!(scope.module_name.as_deref(), Some("roofline"));
}

#[test]
fn click_on_the_menu_border_closes_it() {
    let mut desktop = desktop();
    desktop.create_menu(5, 5, items(&["only"]));
    let rect = desktop.menu().expect("menu").rect();
    assert!(desktop.handle_event(&left_down(rect.x, rect.y)));
    assert!(desktop.menu().is_none());

    desktop.create_menu(5, 5, items(&["only"]));
    assert!(desktop.handle_event(&left_down(rect.right() - 1, rect.bottom() - 1)));
    assert!(desktop.menu().is_none());
}

/// (menu still open when the handler ran, payload)
type Calls = Rc<RefCell<Vec<(bool, Value)>>>;

fn blocks(calls: &Calls) -> Vec<MenuBlock> {
    let calls = Rc::clone(calls);
    vec![
        MenuBlock::new(["Thread 4213", "app-worker"]),
        MenuBlock::new(["Open"])
            .hover(true)
            .on_click(json!({"tid": "4213"}), move |desktop, payload| {
                calls.borrow_mut().push((desktop.menu().is_some(), payload));
            }),
    ]
}

#[test]
fn block_without_handler_keeps_the_menu_open() {
    let calls: Calls = Rc::default();
    let mut desktop = desktop();
    desktop.create_menu_with_custom_blocks(2, 2, blocks(&calls));
    // Border on row 2, first block on rows 3-4, "Open" on row 5.
    assert!(desktop.handle_event(&left_down(4, 3)));
    assert!(desktop.handle_event(&left_down(4, 4)));
    assert!(desktop.menu().is_some());
    assert!(calls.borrow().is_empty());

    assert!(desktop.handle_event(&left_down(4, 5)));
    assert!(desktop.menu().is_none());
    assert_eq!(*calls.borrow(), vec![(false, json!({"tid": "4213"}))]);
}

#[test]
fn block_menu_is_clamped_like_any_menu() {
    let calls: Calls = Rc::default();
    let mut desktop = desktop_with(DesktopConfig::default());
    desktop.set_viewport(Rect::new(0, 0, 200, 100));
    let lines: Vec<String> = (0..60).map(|n| format!("frame {n}")).collect();
    let mut menu = vec![MenuBlock::new(lines)];
    menu.extend(blocks(&calls));
    desktop.create_menu_with_custom_blocks(190, 50, menu);
    let rect = desktop.menu().expect("menu").rect();
    assert!(rect.right() <= 180, "{rect:?}");
    assert!(rect.bottom() <= 70, "{rect:?}");
    assert_eq!(rect.y, 50);
}

/// Opens a block menu on right-click; its one action refreshes the window.
struct ContextMenuContent {
    log: Log,
}

impl WindowContent for ContextMenuContent {
    fn kind(&self) -> &'static str {
        "ctx"
    }

    fn content_code(&self) -> ContentMarkup {
        ContentMarkup::from_text("right-click me")
    }

    fn title(&self) -> String {
        "Context".to_string()
    }

    fn setup(&mut self, cx: &mut WindowCx<'_>, _data: &Value, is_refresh: bool) {
        let entry = if is_refresh { "setup(refresh)" } else { "setup" };
        self.log.borrow_mut().push(entry.to_string());
        cx.hide_loading();
    }

    fn prepare_refresh(&mut self, _cx: &mut WindowCx<'_>, _data: &Value) {}

    fn prepare_close(&mut self, _cx: &mut WindowCx<'_>) {}

    fn start_resize(&mut self, _cx: &mut WindowCx<'_>) -> bool {
        false
    }

    fn finish_resize(&mut self, _cx: &mut WindowCx<'_>) {}

    fn handle_event(&mut self, cx: &mut WindowCx<'_>, event: &ContentEvent) -> bool {
        let ContentEvent::Mouse {
            kind: MouseEventKind::Down(MouseButton::Right),
            screen_column,
            screen_row,
            ..
        } = *event
        else {
            return false;
        };
        let id = cx.id().clone();
        cx.open_menu_with_blocks(
            screen_column,
            screen_row,
            vec![
                MenuBlock::new(["Context"]),
                MenuBlock::new(["Refresh"])
                    .hover(true)
                    .on_click(Value::Null, move |desktop, _| {
                        let _ = desktop.refresh(&id);
                    }),
            ],
        );
        true
    }
}

#[test]
fn window_content_can_open_a_block_menu() {
    let log = log();
    let mut desktop = desktop();
    desktop
        .open(
            Box::new(ContextMenuContent { log: Rc::clone(&log) }),
            OpenOptions::new().at(0, 0).size(40, 10),
        )
        .expect("open");

    let right = mouse(MouseEventKind::Down(MouseButton::Right), 5, 4);
    assert!(desktop.handle_event(&right));
    let menu = desktop.menu().expect("menu");
    assert_eq!(menu.anchor(), (5, 4));
    assert_eq!(menu.labels(), vec!["Context", "Refresh"]);

    // Border on row 4, "Context" on row 5, "Refresh" on row 6.
    desktop.handle_event(&left_down(7, 5));
    assert!(desktop.menu().is_some());
    desktop.handle_event(&left_down(7, 6));
    assert!(desktop.menu().is_none());
    assert_eq!(*log.borrow(), vec!["setup", "setup(refresh)"]);
}
