//! The `roofline` backend: a cache-aware roofline model shown as a table of
//! ceilings and measured points.

use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{decode, failure_line, show_error};
use crate::error::DesktopError;
use crate::modules::{BackendModule, RootWindowArgs};
use crate::session::form;
use crate::theme;
use crate::transport::{Reply, ResponseKind};
use crate::window::{ContentMarkup, Desktop, OpenOptions, WindowContent, WindowCx, WindowId};

pub const BACKEND: &str = "roofline";

pub fn module() -> BackendModule {
    let mut settings = Map::new();
    settings.insert("log_scale".into(), json!(true));
    BackendModule {
        name: BACKEND.to_string(),
        create_root_window,
        settings,
    }
}

fn create_root_window(desktop: &mut Desktop, args: RootWindowArgs) -> Result<WindowId, DesktopError> {
    let mut options = OpenOptions::new()
        .session(args.session)
        .node(args.node_id)
        .module(BACKEND);
    if let Some(entity) = args.entity_id {
        options = options.entity(entity);
    }
    desktop.open(Box::new(RooflineWindow), options)
}

/// A bandwidth ceiling, e.g. L1 or DRAM, in GB/s.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ceiling {
    pub name: String,
    pub bandwidth: f64,
}

/// A measured code region: arithmetic intensity in FLOP/byte and achieved
/// performance in GFLOP/s.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RooflinePoint {
    pub name: String,
    pub intensity: f64,
    pub performance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RooflineModel {
    /// Peak compute in GFLOP/s.
    pub peak: Option<f64>,
    pub ceilings: Vec<Ceiling>,
    pub points: Vec<RooflinePoint>,
}

impl RooflineModel {
    /// Attainable performance at `intensity` under `ceiling`.
    pub fn attainable(&self, ceiling: &Ceiling, intensity: f64) -> f64 {
        let memory_bound = ceiling.bandwidth * intensity;
        match self.peak {
            Some(peak) => memory_bound.min(peak),
            None => memory_bound,
        }
    }

    /// Ceiling that binds `point` hardest, i.e. the lowest roof above it.
    pub fn binding_ceiling(&self, point: &RooflinePoint) -> Option<&Ceiling> {
        self.ceilings.iter().min_by(|a, b| {
            self.attainable(a, point.intensity)
                .total_cmp(&self.attainable(b, point.intensity))
        })
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = Vec::new();
        if let Some(peak) = self.peak {
            lines.push(Line::from(format!("Peak compute: {peak:.1} GFLOP/s")));
        }
        lines.push(Line::styled("Ceilings", bold));
        lines.push(Line::from(format!("  {:<12} {:>12}", "Memory", "GB/s")));
        for ceiling in &self.ceilings {
            lines.push(Line::from(format!(
                "  {:<12} {:>12.1}",
                ceiling.name, ceiling.bandwidth
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::styled("Points", bold));
        lines.push(Line::from(format!(
            "  {:<16} {:>10} {:>10} {:>8}  Bound by",
            "Region", "FLOP/B", "GFLOP/s", "Of roof"
        )));
        for point in &self.points {
            let (bound, share) = match self.binding_ceiling(point) {
                Some(ceiling) => {
                    let roof = self.attainable(ceiling, point.intensity);
                    let share = if roof > 0.0 {
                        format!("{:.0}%", point.performance / roof * 100.0)
                    } else {
                        "-".to_string()
                    };
                    (ceiling.name.clone(), share)
                }
                None => ("-".to_string(), "-".to_string()),
            };
            lines.push(Line::from(format!(
                "  {:<16} {:>10.2} {:>10.2} {:>8}  {}",
                point.name, point.intensity, point.performance, share, bound
            )));
        }
        lines
    }
}

#[derive(Debug, Default)]
pub struct RooflineWindow;

impl WindowContent for RooflineWindow {
    fn kind(&self) -> &'static str {
        "roofline"
    }

    fn content_code(&self) -> ContentMarkup {
        ContentMarkup::new()
    }

    fn title(&self) -> String {
        "Cache-aware roofline model".to_string()
    }

    fn setup(&mut self, cx: &mut WindowCx<'_>, _data: &Value, _is_refresh: bool) {
        match cx.request(form([("general_analysis", BACKEND)]), ResponseKind::Json) {
            Ok(request) => {
                cx.send("roofline", request);
            }
            Err(err) => show_error(cx, Line::styled(err.to_string(), theme::error_text())),
        }
    }

    fn prepare_refresh(&mut self, _cx: &mut WindowCx<'_>, _data: &Value) {}

    fn prepare_close(&mut self, _cx: &mut WindowCx<'_>) {}

    fn start_resize(&mut self, _cx: &mut WindowCx<'_>) -> bool {
        false
    }

    fn finish_resize(&mut self, _cx: &mut WindowCx<'_>) {}

    fn on_response(&mut self, cx: &mut WindowCx<'_>, reply: Reply) {
        match reply.result {
            Ok(response) => match decode::<RooflineModel>(response) {
                Ok(model) => {
                    if let Some(data) = cx.module_data() {
                        data.insert("points".into(), json!(model.points.len()));
                    }
                    cx.set_lines(model.lines());
                    cx.hide_loading();
                }
                Err(err) => show_error(cx, Line::styled(err.to_string(), theme::error_text())),
            },
            Err(failure) => show_error(cx, failure_line("the roofline model", &failure)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> RooflineModel {
        serde_json::from_value(json!({
            "peak": 100.0,
            "ceilings": [{"name": "L1", "bandwidth": 200.0}, {"name": "DRAM", "bandwidth": 20.0}],
            "points": [{"name": "loop", "intensity": 0.5, "performance": 5.0}]
        }))
        .expect("model")
    }

    #[test]
    fn lowest_roof_binds() {
        let model = model();
        let point = &model.points[0];
        let ceiling = model.binding_ceiling(point).expect("ceiling");
        assert_eq!(ceiling.name, "DRAM");
        assert_eq!(model.attainable(ceiling, point.intensity), 10.0);
    }

    #[test]
    fn peak_caps_attainable_performance() {
        let model = model();
        assert_eq!(model.attainable(&model.ceilings[0], 10.0), 100.0);
    }

    #[test]
    fn table_reports_share_of_roof() {
        let lines = model().lines();
        let last = lines.last().map(ToString::to_string).unwrap_or_default();
        assert!(last.contains("loop"));
        assert!(last.contains("50%"));
        assert!(last.ends_with("DRAM"));
    }
}
