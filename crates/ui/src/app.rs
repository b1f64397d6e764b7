use std::collections::HashMap;

use eframe::egui;
use flame_chart_core::{ChartEvent, NodeInfo, Settings, parse_data};
use tracing::warn;

use crate::widget::FlameChartView;

/// Bundled sample shown until a file is opened.
const DEMO: &str = include_str!("../assets/demo.json");

/// Format a duration in ms to human-readable string.
fn format_duration(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.1}µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{ms:.2}ms")
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

/// Standalone viewer around one [`FlameChartView`].
pub struct FlameApp {
    view: Option<FlameChartView>,
    /// Last selection, shared with the chart's event handler.
    selected: std::rc::Rc<std::cell::RefCell<Option<NodeInfo>>>,
    error: Option<String>,
}

impl FlameApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        let mut app = Self {
            view: None,
            selected: Default::default(),
            error: None,
        };
        app.load(DEMO.as_bytes());
        app
    }

    fn load(&mut self, data: &[u8]) {
        let text = match std::str::from_utf8(data) {
            Ok(text) => text,
            Err(e) => {
                self.error = Some(format!("Input is not UTF-8: {e}"));
                return;
            }
        };
        let view = parse_data(text)
            .and_then(|nodes| FlameChartView::new(nodes, HashMap::new(), Settings::default()));
        match view {
            Ok(mut view) => {
                let selected = self.selected.clone();
                view.chart_mut().subscribe(move |event| {
                    if let ChartEvent::Select { node, .. } = event {
                        *selected.borrow_mut() = node.clone();
                    }
                });
                *self.selected.borrow_mut() = None;
                self.view = Some(view);
                self.error = None;
            }
            Err(e) => {
                warn!(error = %e, "failed to load timeline");
                self.error = Some(format!("Failed to load timeline: {e}"));
            }
        }
    }
}

impl eframe::App for FlameApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("flame-chart");
                ui.separator();

                #[cfg(not(target_arch = "wasm32"))]
                if ui.button("Open").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Timeline", &["json"])
                        .pick_file()
                    {
                        match std::fs::read(&path) {
                            Ok(data) => self.load(&data),
                            Err(e) => {
                                self.error = Some(format!("Failed to read file: {e}"));
                            }
                        }
                    }
                }

                if ui.button("Reset view").clicked() {
                    if let Some(view) = &mut self.view {
                        view.chart_mut().reset_view();
                    }
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(err) = &self.error {
                    ui.colored_label(egui::Color32::RED, err);
                } else if let Some(view) = &self.view {
                    let viewport = view.chart().view();
                    ui.label(format!(
                        "Duration: {} | Viewing: {} to {}",
                        format_duration(viewport.max - viewport.min),
                        format_duration(viewport.position_x),
                        format_duration(viewport.view_end()),
                    ));
                    if let Some(node) = self.selected.borrow().as_ref() {
                        ui.separator();
                        ui.label(format!(
                            "{} ({})",
                            node.source.name,
                            format_duration(node.source.duration)
                        ));
                    }
                }
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| match &mut self.view {
                Some(view) => {
                    view.show(ui);
                }
                None => {
                    ui.centered_and_justified(|ui| {
                        ui.heading("Drop a timeline JSON file here");
                    });
                }
            });

        let dropped = ctx.input(|i| {
            i.raw
                .dropped_files
                .first()
                .and_then(|file| file.bytes.as_ref().map(|bytes| bytes.to_vec()))
        });
        if let Some(data) = dropped {
            self.load(&data);
        }
    }
}
