//! The ready-made widget: time grid, timeframe selector and flame chart
//! stacked in one container.

use std::collections::HashMap;
use std::rc::Rc;

use flame_chart_protocol::{RenderCommand, TimelineNode};

use crate::color::parse_color;
use crate::container::{Container, ContainerOptions};
use crate::error::FlameChartError;
use crate::events::Subscription;
use crate::interactions::{Cursor, PointerInput};
use crate::plugins::{ChartEvent, DataUpdate, FlameChartPlugin, TimeGridPlugin, TimeframeSelectorPlugin};
use crate::render::{Canvas, FixedWidthMetrics, FrameHandle, FrameSource, PanelId, TextMetrics, Viewport, ZoomGate};
use crate::settings::Settings;

pub struct FlameChartOptions {
    pub data: Vec<TimelineNode>,
    /// Node type → CSS color.
    pub colors: HashMap<String, String>,
    pub settings: Settings,
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
    pub frames: Rc<dyn FrameSource>,
    pub metrics: Rc<dyn TextMetrics>,
}

impl FlameChartOptions {
    pub fn new(data: Vec<TimelineNode>, width: f64, height: f64, frames: Rc<dyn FrameSource>) -> Self {
        Self {
            data,
            colors: HashMap::new(),
            settings: Settings::default(),
            width,
            height,
            pixel_ratio: 1.0,
            frames,
            metrics: Rc::new(FixedWidthMetrics::default()),
        }
    }

    pub fn with_colors(mut self, colors: HashMap<String, String>) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    pub fn with_metrics(mut self, metrics: Rc<dyn TextMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Parse the input tree from JSON.
pub fn parse_data(json: &str) -> Result<Vec<TimelineNode>, FlameChartError> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Debug)]
pub struct FlameChart {
    container: Container,
    time_grid: PanelId,
    timeframe_selector: PanelId,
    flame_chart: PanelId,
}

impl FlameChart {
    pub fn new(options: FlameChartOptions) -> Result<Self, FlameChartError> {
        for (kind, color) in &options.colors {
            parse_color(color).map_err(|source| FlameChartError::Color {
                kind: kind.clone(),
                source,
            })?;
        }

        let FlameChartOptions {
            data,
            colors,
            settings,
            width,
            height,
            pixel_ratio,
            frames,
            metrics,
        } = options;

        let container_options = ContainerOptions::new(width, height, frames)
            .with_pixel_ratio(pixel_ratio)
            .with_metrics(metrics)
            .with_plugin(Box::new(TimeGridPlugin::new(&settings)))
            .with_plugin(Box::new(TimeframeSelectorPlugin::new(&data, &settings)))
            .with_plugin(Box::new(FlameChartPlugin::new(&data, colors)))
            .with_settings(settings);
        let container = Container::new(container_options);

        let ids = container.panel_ids();
        let panel = |index: usize| {
            ids.get(index)
                .copied()
                .ok_or(FlameChartError::UnknownPanel(index as u32))
        };
        Ok(Self {
            time_grid: panel(0)?,
            timeframe_selector: panel(1)?,
            flame_chart: panel(2)?,
            container,
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    pub fn time_grid_panel(&self) -> PanelId {
        self.time_grid
    }

    pub fn timeframe_selector_panel(&self) -> PanelId {
        self.timeframe_selector
    }

    pub fn flame_chart_panel(&self) -> PanelId {
        self.flame_chart
    }

    pub fn view(&self) -> &Viewport {
        self.container.view()
    }

    pub fn canvas(&self) -> &Canvas {
        self.container.canvas()
    }

    pub fn frame(&self) -> Vec<RenderCommand> {
        self.container.frame()
    }

    pub fn cursor(&self) -> Cursor {
        self.container.cursor()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&ChartEvent) + 'static) -> Subscription {
        self.container.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.container.unsubscribe(subscription)
    }

    pub fn handle_input(&mut self, input: PointerInput) {
        self.container.handle_input(input);
    }

    pub fn on_animation_frame(&mut self, handle: FrameHandle) -> bool {
        self.container.on_animation_frame(handle)
    }

    pub fn poll_timers(&mut self) -> bool {
        self.container.poll_timers()
    }

    /// Hosts keep calling back while either is true.
    pub fn is_busy(&self) -> bool {
        self.container.has_pending_frame() || self.container.has_pending_timer()
    }

    pub fn set_data(&mut self, data: &[TimelineNode], update: DataUpdate) {
        self.container.set_data(data, update);
    }

    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        self.container.resize(width, height)
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        self.container.set_pixel_ratio(pixel_ratio);
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.container.set_settings(settings);
    }

    pub fn set_zoom(&mut self, start: f64, end: f64) -> Result<(), FlameChartError> {
        self.container.set_zoom(start, end)
    }

    pub fn reset_view(&mut self) {
        self.container.reset_view();
    }

    pub fn set_zoom_gate(&mut self, gate: Option<ZoomGate>) {
        self.container.set_zoom_gate(gate);
    }

    pub fn toggle_panel(&mut self, id: PanelId) -> Result<bool, FlameChartError> {
        self.container.toggle_panel(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ManualFrames;

    #[test]
    fn rejects_unparseable_colors() {
        let frames = Rc::new(ManualFrames::new());
        let colors = HashMap::from([("task".to_string(), "not-a-color".to_string())]);
        let options = FlameChartOptions::new(Vec::new(), 100.0, 100.0, frames).with_colors(colors);
        assert!(matches!(
            FlameChart::new(options),
            Err(FlameChartError::Color { kind, .. }) if kind == "task"
        ));
    }

    #[test]
    fn default_stack_is_grid_selector_chart() {
        let frames = Rc::new(ManualFrames::new());
        let data = parse_data(r#"[{ "name": "main", "start": 0, "duration": 50 }]"#);
        let Ok(data) = data else {
            panic!("fixture parses");
        };
        let Ok(chart) = FlameChart::new(FlameChartOptions::new(data, 300.0, 200.0, frames)) else {
            panic!("chart builds");
        };
        let sizes = chart.container().composite().get_children_sizes().0;
        assert_eq!(sizes[0].height, 18.0);
        assert_eq!(sizes[1].height, 60.0);
        assert_eq!(sizes[2].position, 78.0);
        assert_eq!(sizes[2].height, 122.0);
        assert_eq!(chart.view().max, 50.0);
    }

    #[test]
    fn bad_json_is_a_json_error() {
        assert!(matches!(parse_data("{"), Err(FlameChartError::Json(_))));
    }
}
