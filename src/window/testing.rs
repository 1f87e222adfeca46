//! Minimal content and window builders for unit tests.

use std::time::Instant;

use serde_json::{Map, Value};

use super::{
    ContentMarkup, Placement, Surface, Window, WindowContent, WindowCx, WindowId, WindowScope,
    WindowState,
};

#[derive(Debug, Default)]
pub(crate) struct StubContent {
    pub(crate) kind: &'static str,
}

impl WindowContent for StubContent {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn content_code(&self) -> ContentMarkup {
        ContentMarkup::from_text("stub")
    }

    fn title(&self) -> String {
        self.kind.to_string()
    }

    fn setup(&mut self, cx: &mut WindowCx<'_>, _data: &Value, _is_refresh: bool) {
        cx.hide_loading();
    }

    fn prepare_refresh(&mut self, _cx: &mut WindowCx<'_>, _data: &Value) {}

    fn prepare_close(&mut self, _cx: &mut WindowCx<'_>) {}

    fn start_resize(&mut self, _cx: &mut WindowCx<'_>) -> bool {
        false
    }

    fn finish_resize(&mut self, _cx: &mut WindowCx<'_>) {}
}

/// A registered-looking window that never went through the desktop.
pub(crate) fn bare_window(id: &str) -> Window {
    Window {
        state: WindowState {
            id: WindowId::from_raw(id),
            serial: 0,
            generation: 0,
            kind: "stub",
            scope: WindowScope::default(),
            data: Map::new(),
            collapsed: None,
            being_resized: false,
            first_resize_call: true,
            last_focus: Instant::now(),
            focus_seq: 0,
            setup_data: None,
            custom_title: None,
            surface: Surface::new(Placement::Centered, 20, 8, 5),
        },
        content: Box::new(StubContent { kind: "stub" }),
    }
}
