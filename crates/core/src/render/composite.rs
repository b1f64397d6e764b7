//! The root engine: panels, sizing, two-tier frame scheduling and the
//! shallow composite.

use std::fmt;
use std::rc::Rc;

use flame_chart_protocol::TimelineNode;
use tracing::{debug, trace};

use super::canvas::TextMetrics;
use super::engine::RenderEngine;
use super::panel::PanelEngine;
use super::scheduler::{Debounce, FrameHandle, FrameSource};
use super::time_grid::TimeGrid;
use super::viewport::Viewport;
use crate::error::FlameChartError;
use crate::interactions::{InteractionEvent, InteractionsEngine};
use crate::model::MinMax;
use crate::plugins::{DataUpdate, OverlayContext, Plugin, PluginContext, Request};
use crate::settings::{Settings, TooltipOption};

/// Delay between the last render and the full hit-region rebuild.
const HIT_REGION_REBUILD_MS: f64 = 16.0;

/// Panel identity, assigned by the composite when a plugin is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub(crate) u32);

impl PanelId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel-{}", self.0)
    }
}

/// Decides whether a zoom change may be applied, given the current view
/// and the requested zoom.
pub type ZoomGate = Box<dyn Fn(&Viewport, f64) -> bool>;

/// The slice of the composite that pointer handling may drive.
pub trait ViewportControl {
    fn view(&self) -> &Viewport;
    fn set_zoom(&mut self, zoom: f64) -> bool;
    fn try_to_change_position(&mut self, delta: f64) -> bool;
    fn render(&mut self);
    fn partial_render(&mut self, panel: Option<PanelId>);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSize {
    pub width: f64,
    pub position: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeClass {
    Static,
    FlexibleGrowing,
    FlexibleStatic,
}

pub struct Panel {
    pub id: PanelId,
    pub plugin: Box<dyn Plugin>,
    pub engine: PanelEngine,
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("id", &self.id)
            .field("plugin", &self.plugin.name())
            .field("engine", &self.engine)
            .finish()
    }
}

impl Panel {
    fn size_class(&self) -> SizeClass {
        match (self.engine.is_flexible(), self.plugin.height()) {
            (true, Some(_)) => SizeClass::FlexibleStatic,
            (_, None) => SizeClass::FlexibleGrowing,
            (false, Some(_)) => SizeClass::Static,
        }
    }

    fn current_or_declared_height(&self) -> f64 {
        let current = self.engine.height();
        if current > 0.0 {
            current
        } else {
            self.plugin.height().unwrap_or(0.0)
        }
    }
}

pub struct CompositeEngine {
    root: RenderEngine,
    panels: Vec<Panel>,
    next_panel_id: u32,
    settings: Settings,
    frames: Rc<dyn FrameSource>,
    full_frame: Option<FrameHandle>,
    partial_frame: Option<FrameHandle>,
    requested: Vec<PanelId>,
    free_space: f64,
    zoom_gate: Option<ZoomGate>,
    hit_region_timer: Debounce,
    requests: Vec<(PanelId, Request)>,
}

impl fmt::Debug for CompositeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeEngine")
            .field("root", &self.root)
            .field("panels", &self.panels)
            .field("free_space", &self.free_space)
            .field("full_frame", &self.full_frame)
            .field("partial_frame", &self.partial_frame)
            .finish_non_exhaustive()
    }
}

impl CompositeEngine {
    pub fn new(
        width: f64,
        height: f64,
        pixel_ratio: f64,
        settings: Settings,
        frames: Rc<dyn FrameSource>,
        metrics: Rc<dyn TextMetrics>,
    ) -> Self {
        let root = RenderEngine::new(width, height, pixel_ratio, &settings, metrics);
        Self {
            root,
            panels: Vec::new(),
            next_panel_id: 0,
            settings,
            frames,
            full_frame: None,
            partial_frame: None,
            requested: Vec::new(),
            free_space: height,
            zoom_gate: None,
            hit_region_timer: Debounce::new(HIT_REGION_REBUILD_MS),
            requests: Vec::new(),
        }
    }

    /// Register a plugin and give it a fresh offscreen panel.
    pub fn add_panel(&mut self, plugin: Box<dyn Plugin>) -> PanelId {
        let id = PanelId(self.next_panel_id);
        self.next_panel_id += 1;
        debug!(%id, plugin = plugin.name(), "add panel");
        let engine = PanelEngine::new(self.root.spawn(0.0));
        self.panels.push(Panel { id, plugin, engine });
        id
    }

    pub fn root(&self) -> &RenderEngine {
        &self.root
    }

    pub fn view(&self) -> &Viewport {
        self.root.view()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel_index(&self, id: PanelId) -> Option<usize> {
        self.panels.iter().position(|panel| panel.id == id)
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.iter().find(|panel| panel.id == id)
    }

    /// Height left over below the last panel.
    pub fn free_space(&self) -> f64 {
        self.free_space
    }

    pub fn set_zoom_gate(&mut self, gate: Option<ZoomGate>) {
        self.zoom_gate = gate;
    }

    pub(crate) fn take_requests(&mut self) -> Vec<(PanelId, Request)> {
        std::mem::take(&mut self.requests)
    }

    fn sync_panels(&mut self) {
        let view = *self.root.view();
        for panel in &mut self.panels {
            panel.engine.sync_view(&view);
        }
    }

    /// Apply a zoom unless it is invalid or the zoom gate refuses it.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        let refused = zoom.is_finite()
            && self
                .zoom_gate
                .as_ref()
                .is_some_and(|gate| !gate(self.root.view(), zoom));
        if refused {
            debug!(zoom, "zoom refused by gate");
            return false;
        }
        if !self.root.set_zoom(zoom) {
            return false;
        }
        self.sync_panels();
        true
    }

    pub fn set_position_x(&mut self, x: f64) -> f64 {
        let delta = self.root.set_position_x(x);
        self.sync_panels();
        delta
    }

    pub fn try_to_change_position(&mut self, delta: f64) -> bool {
        let changed = self.root.try_to_change_position(delta);
        if changed {
            self.sync_panels();
        }
        changed
    }

    pub fn set_min_max(&mut self, min: f64, max: f64) {
        self.root.set_min_max(min, max);
        self.sync_panels();
    }

    /// Union of every plugin's data bounds; `{0, 0}` when none has data.
    pub fn recalc_min_max(&mut self) {
        let bounds = self
            .panels
            .iter()
            .filter_map(|panel| panel.plugin.min_max())
            .reduce(|a, b| MinMax {
                min: a.min.min(b.min),
                max: a.max.max(b.max),
            })
            .unwrap_or_default();
        debug!(min = bounds.min, max = bounds.max, "recalc min/max");
        self.set_min_max(bounds.min, bounds.max);
    }

    pub fn reset_view(&mut self) {
        self.root.reset_view();
        self.sync_panels();
        debug!(zoom = self.root.zoom(), "reset view");
    }

    /// Lay panels out top to bottom.
    ///
    /// Static panels take their declared height, flexible-static panels
    /// their current (or declared) height, and growing panels share the
    /// rest evenly on top of what they had. Collapsed panels get nothing.
    /// Returns the sizes in panel order and the unused remainder.
    pub fn get_children_sizes(&self) -> (Vec<PanelSize>, f64) {
        let total = self.root.height();
        let width = self.root.width();

        let mut free_space = total;
        let mut growing = 0usize;
        for panel in &self.panels {
            if panel.engine.is_collapsed() {
                continue;
            }
            match panel.size_class() {
                SizeClass::Static => free_space -= panel.plugin.height().unwrap_or(0.0),
                SizeClass::FlexibleStatic => free_space -= panel.current_or_declared_height(),
                SizeClass::FlexibleGrowing => {
                    free_space -= panel.engine.height();
                    growing += 1;
                }
            }
        }
        let part = if growing > 0 {
            (free_space / growing as f64).floor()
        } else {
            0.0
        };

        let mut position = 0.0;
        let sizes = self
            .panels
            .iter()
            .map(|panel| {
                let height = if panel.engine.is_collapsed() {
                    0.0
                } else {
                    match panel.size_class() {
                        SizeClass::Static => panel.plugin.height().unwrap_or(0.0),
                        SizeClass::FlexibleGrowing => panel.engine.height() + part,
                        SizeClass::FlexibleStatic => panel.current_or_declared_height(),
                    }
                }
                .max(0.0);
                let size = PanelSize {
                    width,
                    position,
                    height,
                };
                position += height;
                size
            })
            .collect();
        (sizes, total - position)
    }

    pub(crate) fn apply_sizes(&mut self, interactions: &mut InteractionsEngine) {
        let (sizes, free_space) = self.get_children_sizes();
        for (panel, size) in self.panels.iter_mut().zip(sizes) {
            panel.engine.resize(size.width, size.height);
            panel.engine.set_position(size.position);
            interactions.set_panel_band(panel.id, size.position, size.height);
        }
        self.free_space = free_space;
        self.sync_panels();
    }

    /// Returns whether anything changed.
    pub fn resize(&mut self, width: f64, height: f64, interactions: &mut InteractionsEngine) -> bool {
        if width == self.root.width() && height == self.root.height() {
            return false;
        }
        self.root.resize(width, height);
        self.apply_sizes(interactions);
        self.render();
        true
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        self.root.set_pixel_ratio(pixel_ratio);
        for panel in &mut self.panels {
            panel.engine.base.set_pixel_ratio(pixel_ratio);
        }
        self.render();
    }

    fn call_plugin<R>(
        &mut self,
        index: usize,
        interactions: &mut InteractionsEngine,
        f: impl FnOnce(&mut dyn Plugin, &mut PluginContext<'_>) -> R,
    ) -> Option<R> {
        let panel = self.panels.get_mut(index)?;
        let mouse = interactions.local_mouse(panel.id);
        let panel_interactions = interactions.panel_mut(panel.id)?;
        let mut ctx = PluginContext::new(
            panel.id,
            &mut panel.engine,
            panel_interactions,
            &self.settings,
            mouse,
            &mut self.requests,
        );
        Some(f(panel.plugin.as_mut(), &mut ctx))
    }

    pub(crate) fn init_plugins(&mut self, interactions: &mut InteractionsEngine) {
        for index in 0..self.panels.len() {
            self.call_plugin(index, interactions, |plugin, ctx| plugin.init(ctx));
        }
    }

    pub(crate) fn post_init_plugins(&mut self, interactions: &mut InteractionsEngine) {
        for index in 0..self.panels.len() {
            self.call_plugin(index, interactions, |plugin, ctx| plugin.post_init(ctx));
        }
    }

    pub fn set_settings(&mut self, settings: Settings, interactions: &mut InteractionsEngine) {
        self.root.set_settings(&settings);
        for panel in &mut self.panels {
            panel.engine.set_settings(&settings);
        }
        self.settings = settings;
        for index in 0..self.panels.len() {
            self.call_plugin(index, interactions, |plugin, ctx| {
                let settings = ctx.settings;
                plugin.set_settings(settings, ctx);
            });
        }
        self.apply_sizes(interactions);
        self.render();
    }

    pub(crate) fn set_data(
        &mut self,
        nodes: &[TimelineNode],
        update: DataUpdate,
        interactions: &mut InteractionsEngine,
    ) {
        for index in 0..self.panels.len() {
            self.call_plugin(index, interactions, |plugin, ctx| {
                plugin.set_data(nodes, update, ctx);
            });
        }
    }

    /// Hand a root event to every panel it routes to.
    pub(crate) fn dispatch(&mut self, event: &InteractionEvent, interactions: &mut InteractionsEngine) {
        for index in 0..self.panels.len() {
            let id = self.panels[index].id;
            let Some(panel_event) = interactions.panel(id).and_then(|panel| panel.route(event)) else {
                continue;
            };
            self.call_plugin(index, interactions, |plugin, ctx| {
                plugin.on_event(&panel_event, ctx);
            });
        }
    }

    pub fn set_flexible(&mut self, id: PanelId, interactions: &mut InteractionsEngine) -> Result<(), FlameChartError> {
        let index = self.panel_index(id).ok_or(FlameChartError::UnknownPanel(id.0))?;
        self.panels[index].engine.set_flexible();
        self.apply_sizes(interactions);
        self.render();
        Ok(())
    }

    /// Collapse an expanded panel or expand a collapsed one. Returns the
    /// new collapsed state.
    pub fn toggle_panel(&mut self, id: PanelId, interactions: &mut InteractionsEngine) -> Result<bool, FlameChartError> {
        let index = self.panel_index(id).ok_or(FlameChartError::UnknownPanel(id.0))?;
        let engine = &mut self.panels[index].engine;
        if engine.is_collapsed() {
            engine.expand();
        } else {
            engine.collapse();
        }
        let collapsed = engine.is_collapsed();
        self.apply_sizes(interactions);
        self.render();
        Ok(collapsed)
    }

    /// Schedule a full render, superseding any pending full or partial one.
    pub fn render(&mut self) {
        if let Some(handle) = self.partial_frame.take() {
            self.frames.cancel_frame(handle);
        }
        self.requested.clear();
        if let Some(handle) = self.full_frame.take() {
            self.frames.cancel_frame(handle);
        }
        self.full_frame = Some(self.frames.request_frame());
        trace!("full render scheduled");
    }

    /// Schedule a re-render of `panel` (or only the composite when `None`).
    /// Requests before the frame fires are merged.
    pub fn partial_render(&mut self, panel: Option<PanelId>) {
        if self.full_frame.is_some() {
            return;
        }
        if let Some(id) = panel.filter(|id| !self.requested.contains(id)) {
            self.requested.push(id);
        }
        if let Some(handle) = self.partial_frame.take() {
            self.frames.cancel_frame(handle);
        }
        self.partial_frame = Some(self.frames.request_frame());
        trace!(?panel, "partial render scheduled");
    }

    pub fn has_pending_frame(&self) -> bool {
        self.full_frame.is_some() || self.partial_frame.is_some()
    }

    /// Whether a deferred hit-region rebuild is still waiting to fire.
    pub fn has_pending_timer(&self) -> bool {
        self.hit_region_timer.is_armed()
    }

    /// Run whichever render `handle` was scheduled for. Returns `false` for
    /// handles that are no longer current.
    pub fn on_animation_frame(&mut self, handle: FrameHandle, interactions: &mut InteractionsEngine) -> bool {
        if self.full_frame == Some(handle) {
            self.full_frame = None;
            self.full_render(interactions);
            true
        } else if self.partial_frame == Some(handle) {
            self.partial_frame = None;
            let requested = std::mem::take(&mut self.requested);
            for id in requested {
                if let Some(index) = self.panel_index(id) {
                    self.render_panel(index, interactions);
                }
            }
            self.shallow_render(interactions);
            self.hit_region_timer.arm(self.frames.now());
            true
        } else {
            trace!(?handle, "stale frame");
            false
        }
    }

    fn full_render(&mut self, interactions: &mut InteractionsEngine) {
        let grid = TimeGrid::recalc(self.root.view(), &self.settings.styles.time_grid);
        self.root.grid = grid;
        for panel in &mut self.panels {
            panel.engine.set_time_grid(grid);
        }
        for index in 0..self.panels.len() {
            self.render_panel(index, interactions);
        }
        self.shallow_render(interactions);
        self.hit_region_timer.arm(self.frames.now());
    }

    fn render_panel(&mut self, index: usize, interactions: &mut InteractionsEngine) {
        let Some(panel) = self.panels.get_mut(index) else {
            return;
        };
        panel.engine.clear();
        if let Some(panel_interactions) = interactions.panel_mut(panel.id) {
            panel_interactions.clear_hit_regions();
        }
        if panel.engine.is_collapsed() || panel.engine.height() <= 0.0 {
            return;
        }
        let fully_rendered = self
            .call_plugin(index, interactions, |plugin, ctx| plugin.render(ctx))
            .unwrap_or(true);
        if !fully_rendered {
            if let Some(panel) = self.panels.get_mut(index) {
                panel.engine.standard_render();
            }
        }
    }

    /// Copy the panel canvases into the root and draw the overlays.
    pub fn shallow_render(&mut self, interactions: &InteractionsEngine) {
        self.root.clear();
        let free_space = self.free_space.max(0.0);
        let grid = self.root.grid;
        let top = self.root.height() - free_space;
        grid.render_lines(&mut self.root, top, free_space);

        for panel in &self.panels {
            if panel.engine.is_collapsed() {
                continue;
            }
            let id = panel.id.to_string();
            self.root
                .canvas
                .draw_canvas(panel.engine.base.canvas(), 0.0, panel.engine.position(), &id);
        }

        let mouse = interactions.mouse();
        for panel in &mut self.panels {
            let mut ctx = OverlayContext {
                root: &mut self.root,
                panel: &panel.engine,
                settings: &self.settings,
                mouse,
            };
            panel.plugin.post_render(&mut ctx);
        }
        for panel in &mut self.panels {
            let mut ctx = OverlayContext {
                root: &mut self.root,
                panel: &panel.engine,
                settings: &self.settings,
                mouse,
            };
            panel.plugin.render_selected_node_mask(&mut ctx);
        }

        let mut tooltip_rendered = false;
        for panel in &mut self.panels {
            let mut ctx = OverlayContext {
                root: &mut self.root,
                panel: &panel.engine,
                settings: &self.settings,
                mouse,
            };
            if panel.plugin.render_tooltip(&mut ctx) {
                tooltip_rendered = true;
                break;
            }
        }
        if tooltip_rendered {
            return;
        }
        if let TooltipOption::Custom(tooltip) = &self.settings.options.tooltip {
            tooltip(None, &mut self.root, mouse);
        }
    }

    /// Fire the hit-region rebuild if its debounce has run out.
    pub(crate) fn poll_hit_regions(&mut self, interactions: &mut InteractionsEngine) -> bool {
        if !self.hit_region_timer.fire(self.frames.now()) {
            return false;
        }
        trace!("rebuild hit regions");
        for index in 0..self.panels.len() {
            if self.panels[index].engine.is_collapsed() {
                continue;
            }
            self.call_plugin(index, interactions, |plugin, ctx| plugin.rebuild_hit_regions(ctx));
        }
        true
    }

    pub fn now(&self) -> f64 {
        self.frames.now()
    }
}

impl ViewportControl for CompositeEngine {
    fn view(&self) -> &Viewport {
        self.root.view()
    }

    fn set_zoom(&mut self, zoom: f64) -> bool {
        CompositeEngine::set_zoom(self, zoom)
    }

    fn try_to_change_position(&mut self, delta: f64) -> bool {
        CompositeEngine::try_to_change_position(self, delta)
    }

    fn render(&mut self) {
        CompositeEngine::render(self);
    }

    fn partial_render(&mut self, panel: Option<PanelId>) {
        CompositeEngine::partial_render(self, panel);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use flame_chart_protocol::RenderCommand;

    use super::*;
    use crate::render::{FixedWidthMetrics, ManualFrames};

    struct Fixed {
        height: Option<f64>,
        bounds: Option<MinMax>,
        renders: Rc<Cell<usize>>,
    }

    impl Fixed {
        fn boxed(height: Option<f64>) -> Box<dyn Plugin> {
            Box::new(Self {
                height,
                bounds: None,
                renders: Rc::new(Cell::new(0)),
            })
        }
    }

    impl Plugin for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn height(&self) -> Option<f64> {
            self.height
        }

        fn min_max(&self) -> Option<MinMax> {
            self.bounds
        }

        fn render(&mut self, _ctx: &mut PluginContext<'_>) -> bool {
            self.renders.set(self.renders.get() + 1);
            true
        }
    }

    fn composite(height: f64) -> (CompositeEngine, Rc<ManualFrames>, InteractionsEngine) {
        let frames = Rc::new(ManualFrames::new());
        let engine = CompositeEngine::new(
            200.0,
            height,
            1.0,
            Settings::default(),
            frames.clone(),
            Rc::new(FixedWidthMetrics::default()),
        );
        (engine, frames, InteractionsEngine::new())
    }

    fn add(
        engine: &mut CompositeEngine,
        interactions: &mut InteractionsEngine,
        plugin: Box<dyn Plugin>,
    ) -> PanelId {
        let id = engine.add_panel(plugin);
        interactions.add_panel(id);
        id
    }

    #[test]
    fn growing_panel_takes_the_extra_height() {
        let (mut engine, _, mut interactions) = composite(400.0);
        add(&mut engine, &mut interactions, Fixed::boxed(Some(20.0)));
        let chart = add(&mut engine, &mut interactions, Fixed::boxed(None));
        engine.apply_sizes(&mut interactions);
        assert_eq!(engine.panel(chart).map(|p| p.engine.height()), Some(380.0));

        engine.resize(200.0, 800.0, &mut interactions);
        let (sizes, free_space) = engine.get_children_sizes();
        assert_eq!(sizes[0].height, 20.0);
        assert_eq!(sizes[1].height, 780.0);
        assert_eq!(sizes[1].position, 20.0);
        assert_eq!(free_space, 0.0);
    }

    #[test]
    fn sizes_add_up_to_the_root_height() {
        let (mut engine, _, mut interactions) = composite(301.0);
        add(&mut engine, &mut interactions, Fixed::boxed(Some(18.0)));
        add(&mut engine, &mut interactions, Fixed::boxed(None));
        add(&mut engine, &mut interactions, Fixed::boxed(None));
        engine.apply_sizes(&mut interactions);

        let (sizes, free_space) = engine.get_children_sizes();
        let used: f64 = sizes.iter().map(|size| size.height).sum();
        assert_eq!(used + free_space, 301.0);
        assert!(sizes.iter().all(|size| size.height >= 0.0));
    }

    #[test]
    fn mixed_panel_classes_tile_the_root() {
        let (mut engine, _, mut interactions) = composite(401.0);
        add(&mut engine, &mut interactions, Fixed::boxed(Some(18.0)));
        let pinned = add(&mut engine, &mut interactions, Fixed::boxed(Some(40.0)));
        add(&mut engine, &mut interactions, Fixed::boxed(None));
        let folded = add(&mut engine, &mut interactions, Fixed::boxed(Some(30.0)));
        add(&mut engine, &mut interactions, Fixed::boxed(None));
        engine.apply_sizes(&mut interactions);

        assert!(engine.set_flexible(pinned, &mut interactions).is_ok());
        assert_eq!(engine.toggle_panel(folded, &mut interactions).ok(), Some(true));
        assert!(engine.panel(pinned).is_some_and(|p| p.engine.is_flexible()));

        let (sizes, free_space) = engine.get_children_sizes();
        let heights: Vec<f64> = sizes.iter().map(|size| size.height).collect();
        assert_eq!(heights[0], 18.0);
        assert_eq!(heights[1], 40.0);
        assert_eq!(heights[3], 0.0);
        assert_eq!(heights[2], heights[4]);
        assert!(heights.iter().all(|&height| height >= 0.0));

        let used: f64 = heights.iter().sum();
        assert_eq!(used + free_space, 401.0);
        assert!((0.0..2.0).contains(&free_space));
        assert_eq!(engine.free_space(), free_space);

        let mut bottom = 0.0;
        for size in &sizes {
            assert_eq!(size.position, bottom);
            bottom += size.height;
        }
    }

    #[test]
    fn collapsed_panel_gets_no_height() {
        let (mut engine, _, mut interactions) = composite(100.0);
        let grid = add(&mut engine, &mut interactions, Fixed::boxed(Some(20.0)));
        add(&mut engine, &mut interactions, Fixed::boxed(None));
        engine.apply_sizes(&mut interactions);

        assert_eq!(engine.toggle_panel(grid, &mut interactions).ok(), Some(true));
        let (sizes, free_space) = engine.get_children_sizes();
        assert_eq!(sizes[0].height, 0.0);
        assert_eq!(sizes[1].position, 0.0);
        assert_eq!(sizes[1].height + free_space, 100.0);

        assert!(matches!(
            engine.toggle_panel(PanelId(9), &mut interactions),
            Err(FlameChartError::UnknownPanel(9))
        ));
    }

    #[test]
    fn partial_renders_merge_and_yield_to_full_render() {
        let (mut engine, frames, mut interactions) = composite(100.0);
        let id = add(&mut engine, &mut interactions, Fixed::boxed(None));
        engine.apply_sizes(&mut interactions);

        engine.partial_render(Some(id));
        engine.partial_render(Some(id));
        assert_eq!(frames.pending().len(), 1);

        engine.render();
        let pending = frames.take_pending();
        assert_eq!(pending.len(), 1);
        engine.partial_render(Some(id));
        assert!(frames.pending().is_empty());

        assert!(engine.on_animation_frame(pending[0], &mut interactions));
        assert!(!engine.on_animation_frame(pending[0], &mut interactions));
        assert!(!engine.has_pending_frame());
    }

    #[test]
    fn full_render_draws_every_panel_into_the_root() {
        let (mut engine, frames, mut interactions) = composite(100.0);
        let renders = Rc::new(Cell::new(0));
        let plugin = Box::new(Fixed {
            height: None,
            bounds: None,
            renders: renders.clone(),
        });
        let id = add(&mut engine, &mut interactions, plugin);
        engine.apply_sizes(&mut interactions);

        engine.render();
        for handle in frames.take_pending() {
            engine.on_animation_frame(handle, &mut interactions);
        }
        assert_eq!(renders.get(), 1);
        let groups: Vec<String> = engine
            .root()
            .canvas()
            .commands()
            .iter()
            .filter_map(|command| match command {
                RenderCommand::BeginGroup { id, .. } => Some(id.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(groups, vec![id.to_string()]);
    }

    #[test]
    fn min_max_is_the_union_of_plugin_bounds() {
        let (mut engine, _, mut interactions) = composite(100.0);
        for bounds in [MinMax { min: 5.0, max: 10.0 }, MinMax { min: 2.0, max: 7.0 }] {
            let plugin = Box::new(Fixed {
                height: None,
                bounds: Some(bounds),
                renders: Rc::new(Cell::new(0)),
            });
            add(&mut engine, &mut interactions, plugin);
        }
        engine.recalc_min_max();
        assert_eq!(engine.view().min, 2.0);
        assert_eq!(engine.view().max, 10.0);
    }

    #[test]
    fn zoom_gate_can_refuse() {
        let (mut engine, _, _) = composite(100.0);
        engine.set_zoom_gate(Some(Box::new(|_view: &Viewport, zoom: f64| zoom < 10.0)));
        assert!(engine.set_zoom(5.0));
        assert!(!engine.set_zoom(20.0));
        assert_eq!(engine.view().zoom, 5.0);
        assert!(!engine.set_zoom(f64::NAN));
    }
}
