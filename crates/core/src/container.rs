//! Wires the composite engine, the interactions engine and the plugins
//! together and runs the request loop between them.

use std::rc::Rc;

use flame_chart_protocol::{RenderCommand, TimelineNode};
use tracing::{debug, warn};

use crate::error::FlameChartError;
use crate::events::{Emitter, Subscription};
use crate::interactions::{Cursor, InteractionEvent, InteractionsEngine, PointerInput};
use crate::plugins::{ChartEvent, DataUpdate, Plugin, Request};
use crate::render::{
    Canvas, CompositeEngine, FixedWidthMetrics, FrameHandle, FrameSource, PanelId, TextMetrics,
    Viewport, ZoomGate,
};
use crate::settings::Settings;

pub struct ContainerOptions {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
    pub settings: Settings,
    /// Top to bottom.
    pub plugins: Vec<Box<dyn Plugin>>,
    pub frames: Rc<dyn FrameSource>,
    pub metrics: Rc<dyn TextMetrics>,
}

impl ContainerOptions {
    pub fn new(width: f64, height: f64, frames: Rc<dyn FrameSource>) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
            settings: Settings::default(),
            plugins: Vec::new(),
            frames,
            metrics: Rc::new(FixedWidthMetrics::default()),
        }
    }

    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_metrics(mut self, metrics: Rc<dyn TextMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }
}

pub struct Container {
    composite: CompositeEngine,
    interactions: InteractionsEngine,
    events: Emitter<ChartEvent>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("composite", &self.composite)
            .field("subscribers", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl Container {
    pub fn new(options: ContainerOptions) -> Self {
        let ContainerOptions {
            width,
            height,
            pixel_ratio,
            settings,
            plugins,
            frames,
            metrics,
        } = options;

        let mut composite = CompositeEngine::new(width, height, pixel_ratio, settings, frames, metrics);
        let mut interactions = InteractionsEngine::new();
        for plugin in plugins {
            let id = composite.add_panel(plugin);
            interactions.add_panel(id);
        }

        composite.init_plugins(&mut interactions);
        composite.recalc_min_max();
        composite.reset_view();
        composite.apply_sizes(&mut interactions);
        composite.post_init_plugins(&mut interactions);
        composite.render();
        debug!(width, height, panels = composite.panels().len(), "container ready");

        let mut container = Self {
            composite,
            interactions,
            events: Emitter::new(),
        };
        container.process_requests();
        container
    }

    pub fn composite(&self) -> &CompositeEngine {
        &self.composite
    }

    pub fn interactions(&self) -> &InteractionsEngine {
        &self.interactions
    }

    pub fn view(&self) -> &Viewport {
        self.composite.view()
    }

    pub fn settings(&self) -> &Settings {
        self.composite.settings()
    }

    /// Panel ids, top to bottom.
    pub fn panel_ids(&self) -> Vec<PanelId> {
        self.composite.panels().iter().map(|panel| panel.id).collect()
    }

    /// The composed root canvas.
    pub fn canvas(&self) -> &Canvas {
        self.composite.root().canvas()
    }

    /// The composed root canvas as one command list, pixel ratio applied.
    pub fn frame(&self) -> Vec<RenderCommand> {
        self.canvas().frame()
    }

    pub fn cursor(&self) -> Cursor {
        self.interactions.cursor()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.composite.has_pending_frame()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.composite.has_pending_timer()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&ChartEvent) + 'static) -> Subscription {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.events.unsubscribe(subscription)
    }

    pub fn handle_input(&mut self, input: PointerInput) {
        let events = self.interactions.handle_input(input, &mut self.composite);
        self.dispatch(&events);
    }

    fn dispatch(&mut self, events: &[InteractionEvent]) {
        for event in events {
            self.composite.dispatch(event, &mut self.interactions);
            if matches!(event, InteractionEvent::MouseOut) {
                self.events.emit(&ChartEvent::MouseOut);
            }
        }
        self.process_requests();
    }

    /// Run the render scheduled under `handle`. Stale handles are ignored.
    pub fn on_animation_frame(&mut self, handle: FrameHandle) -> bool {
        let ran = self.composite.on_animation_frame(handle, &mut self.interactions);
        self.process_requests();
        ran
    }

    /// Fire the deferred hit-region rebuild once it is due, then re-check
    /// what the mouse is over.
    pub fn poll_timers(&mut self) -> bool {
        if !self.composite.poll_hit_regions(&mut self.interactions) {
            return false;
        }
        let mut events = Vec::new();
        self.interactions
            .check_region_hover(&mut self.composite, &mut events);
        self.dispatch(&events);
        true
    }

    pub fn toggle_panel(&mut self, id: PanelId) -> Result<bool, FlameChartError> {
        self.composite.toggle_panel(id, &mut self.interactions)
    }

    pub fn set_flexible(&mut self, id: PanelId) -> Result<(), FlameChartError> {
        self.composite.set_flexible(id, &mut self.interactions)
    }

    pub fn set_data(&mut self, nodes: &[TimelineNode], update: DataUpdate) {
        debug!(roots = nodes.len(), "set data");
        self.composite.set_data(nodes, update, &mut self.interactions);
        self.process_requests();
    }

    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        self.composite.resize(width, height, &mut self.interactions)
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        self.composite.set_pixel_ratio(pixel_ratio);
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.composite.set_settings(settings, &mut self.interactions);
        self.process_requests();
    }

    /// Show exactly `[start, end]`.
    pub fn set_zoom(&mut self, start: f64, end: f64) -> Result<(), FlameChartError> {
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(FlameChartError::InvalidZoomRange { start, end });
        }
        let zoom = self.composite.root().width() / (end - start);
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(FlameChartError::InvalidZoom(zoom));
        }
        if !self.composite.set_zoom(zoom) {
            debug!(start, end, "zoom range not applied");
            return Err(FlameChartError::ZoomRefused { start, end });
        }
        self.composite.set_position_x(start);
        self.composite.render();
        Ok(())
    }

    pub fn reset_view(&mut self) {
        self.composite.reset_view();
        self.composite.render();
    }

    pub fn set_zoom_gate(&mut self, gate: Option<ZoomGate>) {
        self.composite.set_zoom_gate(gate);
    }

    fn process_requests(&mut self) {
        loop {
            let requests = self.composite.take_requests();
            if requests.is_empty() {
                break;
            }
            for (id, request) in requests {
                self.apply(id, request);
            }
        }
    }

    fn apply(&mut self, id: PanelId, request: Request) {
        match request {
            Request::Render => self.composite.render(),
            Request::PartialRender => self.composite.partial_render(Some(id)),
            Request::TryChangePosition(delta) => {
                if self.composite.try_to_change_position(delta) {
                    self.composite.render();
                }
            }
            Request::SetZoomRange { start, end } => {
                if let Err(err) = self.set_zoom(start, end) {
                    warn!(%err, %id, "ignoring zoom range");
                }
            }
            Request::RecalcMinMax => self.composite.recalc_min_max(),
            Request::ResetView => self.composite.reset_view(),
            Request::SetCursor(cursor) => {
                self.interactions.set_cursor(Some(id), cursor);
            }
            Request::ClearCursor => self.interactions.clear_cursor(),
            Request::Emit(event) => self.events.emit(&event),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::plugins::{FlameChartPlugin, TimeGridPlugin};
    use crate::render::ManualFrames;

    fn data() -> Vec<TimelineNode> {
        vec![TimelineNode::new("main", 0.0, 100.0).with_children(vec![
            TimelineNode::new("parse", 0.0, 40.0),
            TimelineNode::new("eval", 40.0, 60.0),
        ])]
    }

    fn container() -> (Container, Rc<ManualFrames>) {
        let frames = Rc::new(ManualFrames::new());
        let options = ContainerOptions::new(200.0, 100.0, frames.clone())
            .with_plugin(Box::new(TimeGridPlugin::default()))
            .with_plugin(Box::new(FlameChartPlugin::new(&data(), Default::default())));
        (Container::new(options), frames)
    }

    fn run_frames(container: &mut Container, frames: &ManualFrames) {
        for handle in frames.take_pending() {
            container.on_animation_frame(handle);
        }
    }

    #[test]
    fn construction_fits_the_data_and_schedules_a_render() {
        let (mut container, frames) = container();
        assert_eq!(container.view().zoom, 2.0);
        assert_eq!(container.view().position_x, 0.0);
        assert!(frames.has_pending());

        run_frames(&mut container, &frames);
        assert!(!container.canvas().is_empty());
        assert!(!container.has_pending_frame());
    }

    #[test]
    fn zoom_range_is_validated() {
        let (mut container, _) = container();
        assert!(matches!(
            container.set_zoom(10.0, 10.0),
            Err(FlameChartError::InvalidZoomRange { .. })
        ));
        assert!(container.set_zoom(f64::NAN, 10.0).is_err());

        container.set_zoom(20.0, 60.0).ok();
        assert_eq!(container.view().zoom, 5.0);
        assert_eq!(container.view().position_x, 20.0);
    }

    #[test]
    fn gated_zoom_range_leaves_the_view_alone() {
        let (mut container, _) = container();
        container.set_zoom_gate(Some(Box::new(|_, zoom| zoom < 3.0)));

        assert!(matches!(
            container.set_zoom(20.0, 60.0),
            Err(FlameChartError::ZoomRefused { .. })
        ));
        let view = container.view();
        assert_eq!(view.zoom, 2.0);
        assert_eq!(view.position_x, 0.0);
        assert!(view.view_end() <= view.max);

        assert!(container.set_zoom(10.0, 90.0).is_ok());
        assert_eq!(container.view().zoom, 2.5);
        assert_eq!(container.view().position_x, 10.0);
    }

    #[test]
    fn clicking_a_node_emits_select() {
        let (mut container, frames) = container();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        container.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        run_frames(&mut container, &frames);
        frames.advance(20.0);
        container.poll_timers();

        // time grid takes the first 18px; "eval" sits on level 1 from x=80
        let (x, y) = (150.0, 18.0 + 17.0 + 8.0);
        container.handle_input(PointerInput::Move { x, y });
        container.handle_input(PointerInput::Down {
            x,
            y,
            button: crate::interactions::MouseButton::Left,
        });
        container.handle_input(PointerInput::Up { x, y });

        let seen = seen.borrow();
        let selected = seen.iter().find_map(|event| match event {
            ChartEvent::Select { node, .. } => node.as_ref().map(|n| n.source.name.to_string()),
            _ => None,
        });
        assert_eq!(selected.as_deref(), Some("eval"));
        assert!(seen.iter().any(|event| matches!(event, ChartEvent::MouseDown { .. })));
    }

    #[test]
    fn leaving_the_chart_emits_mouse_out() {
        let (mut container, _) = container();
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        container.subscribe(move |event| {
            if matches!(event, ChartEvent::MouseOut) {
                *sink.borrow_mut() += 1;
            }
        });
        container.handle_input(PointerInput::Move { x: 10.0, y: 10.0 });
        container.handle_input(PointerInput::Leave);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn unknown_panel_is_an_error() {
        let (mut container, _) = container();
        let ids = container.panel_ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(container.toggle_panel(ids[0]).ok(), Some(true));
        assert!(container.toggle_panel(PanelId(42)).is_err());
    }
}
