//! The flame chart panel: one dataset, flattened once, clustered per view.

use std::collections::HashMap;
use std::rc::Rc;

use flame_chart_protocol::{Color, Point, Rect, TimelineNode};
use tracing::debug;

use super::{ChartEvent, DataUpdate, NodeInfo, NodeKind, OverlayContext, Plugin, PluginContext, Request};
use crate::color::{hsl, parse_color, rotate_hue, to_css_string};
use crate::interactions::{Cursor, HitRegion, Mouse, PanelEvent, RegionData, RegionKind};
use crate::model::{
    Cluster, ClusterParams, FlatNode, FlatTree, MetaCluster, MinMax, clusterize, default_equivalence,
    flatten, meta_clusterize, min_max, reclusterize,
};
use crate::render::{RenderEngine, TooltipField};
use crate::settings::TooltipOption;

const DEFAULT_TYPE: &str = "_default";
const HUE_STEP: f32 = 27.0;
const SELECTED_STROKE_COLOR: &str = "green";
const SELECTION_MASK_COLOR: &str = "rgba(71, 140, 255, 0.1)";
/// Clusters narrower than this are not painted.
const MIN_PAINTED_WIDTH: f64 = 0.25;

/// Type → color resolution, with generated colors for unmapped types.
#[derive(Debug, Clone)]
struct NodeColors {
    user: HashMap<String, String>,
    generated: HashMap<String, String>,
    faded: HashMap<String, String>,
    last: Color,
}

impl NodeColors {
    fn new(user: HashMap<String, String>) -> Self {
        Self {
            user,
            generated: HashMap::new(),
            faded: HashMap::new(),
            last: hsl(180.0, 0.3, 0.7),
        }
    }

    fn reset(&mut self) {
        self.generated.clear();
        self.faded.clear();
        self.last = hsl(180.0, 0.3, 0.7);
    }

    /// Explicit color, then the user map by type, then a generated one.
    fn resolve(&mut self, explicit: Option<&str>, kind: Option<&str>) -> String {
        if let Some(color) = explicit {
            return color.to_string();
        }
        let kind = kind.unwrap_or(DEFAULT_TYPE);
        if let Some(color) = self.user.get(kind) {
            return color.clone();
        }
        if let Some(color) = self.generated.get(kind) {
            return color.clone();
        }
        self.last = rotate_hue(self.last, HUE_STEP);
        let color = to_css_string(self.last);
        self.generated.insert(kind.to_string(), color.clone());
        color
    }

    /// Same color at half its alpha.
    fn fade(&mut self, css: &str) -> String {
        if let Some(faded) = self.faded.get(css) {
            return faded.clone();
        }
        let faded = match parse_color(css) {
            Ok(color) => to_css_string(color.with_alpha(color.a * 0.5)),
            Err(_) => css.to_string(),
        };
        self.faded.insert(css.to_string(), faded.clone());
        faded
    }
}

/// Block width tweak that leaves a visible gap between neighbours.
fn adjust_width(w: f64) -> f64 {
    if w <= 0.1 {
        0.1
    } else if w >= 3.0 {
        w - 1.0
    } else {
        w - w / 3.0
    }
}

pub struct FlameChartPlugin {
    name: String,
    kind: NodeKind,
    colors: NodeColors,
    params: ClusterParams,
    flat: FlatTree,
    meta_clusters: Vec<MetaCluster>,
    initial_clusters: Vec<Cluster>,
    actual_clusters: Vec<Rc<Cluster>>,
    /// Width the initial clusters were computed for.
    clustered_width: Option<f64>,
    /// `(zoom, position_x, width)` the actual clusters were computed for.
    view_key: Option<(f64, f64, f64)>,
    bounds: MinMax,
    position_y: f64,
    selected: Option<Rc<FlatNode>>,
    hovered: Option<Rc<FlatNode>>,
}

impl FlameChartPlugin {
    pub fn new(nodes: &[TimelineNode], colors: HashMap<String, String>) -> Self {
        let mut plugin = Self {
            name: "flame-chart".to_string(),
            kind: NodeKind::FlameChartNode,
            colors: NodeColors::new(colors),
            params: ClusterParams::default(),
            flat: Vec::new(),
            meta_clusters: Vec::new(),
            initial_clusters: Vec::new(),
            actual_clusters: Vec::new(),
            clustered_width: None,
            view_key: None,
            bounds: MinMax::default(),
            position_y: 0.0,
            selected: None,
            hovered: None,
        };
        plugin.load(nodes);
        plugin
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_cluster_params(mut self, params: ClusterParams) -> Self {
        self.params = params;
        self.clustered_width = None;
        self
    }

    pub fn selected(&self) -> Option<&Rc<FlatNode>> {
        self.selected.as_ref()
    }

    pub fn hovered(&self) -> Option<&Rc<FlatNode>> {
        self.hovered.as_ref()
    }

    pub fn position_y(&self) -> f64 {
        self.position_y
    }

    pub fn clusters(&self) -> &[Rc<Cluster>] {
        &self.actual_clusters
    }

    fn load(&mut self, nodes: &[TimelineNode]) {
        self.flat = flatten(nodes);
        self.meta_clusters = meta_clusterize(&self.flat, default_equivalence);
        self.bounds = min_max(&self.flat);
        self.initial_clusters.clear();
        self.actual_clusters.clear();
        self.clustered_width = None;
        self.view_key = None;
        self.colors.reset();
        debug!(
            nodes = self.flat.len(),
            meta_clusters = self.meta_clusters.len(),
            "flame chart data loaded"
        );
    }

    /// Initial clusters are cut at the fit-everything zoom; every view
    /// refines them from there.
    fn update_clusters(&mut self, engine: &RenderEngine) {
        let view = *engine.view();
        if self.clustered_width != Some(view.width) {
            let MinMax { min, max } = self.bounds;
            let zoom = if max > min { view.width / (max - min) } else { 1.0 };
            self.initial_clusters = clusterize(&self.meta_clusters, zoom, min, max, &self.params);
            self.clustered_width = Some(view.width);
            self.view_key = None;
        }
        let key = (view.zoom, view.position_x, view.width);
        if self.view_key != Some(key) {
            self.actual_clusters = reclusterize(
                &self.initial_clusters,
                view.zoom,
                view.position_x,
                view.view_end(),
                &self.params,
            )
            .into_iter()
            .map(Rc::new)
            .collect();
            self.view_key = Some(key);
        }
    }

    fn block_rect(&self, engine: &RenderEngine, start: f64, duration: f64, level: usize) -> Rect {
        let block_height = engine.block_height();
        let x = engine.time_to_position(start);
        let w = adjust_width(duration * engine.zoom());
        let mut y = level as f64 * (block_height + 1.0) - self.position_y;
        if engine.inverted() {
            y = engine.height() - block_height - y;
        }
        Rect::new(x, y, w, block_height)
    }

    fn is_visible(engine: &RenderEngine, rect: &Rect) -> bool {
        rect.right() >= 0.0 && rect.x <= engine.width() && rect.bottom() >= 0.0 && rect.y <= engine.height()
    }

    /// The node inside a hovered cluster that is actually under the mouse.
    fn find_node_in_cluster(
        &self,
        engine: &RenderEngine,
        region: Option<&HitRegion>,
        mouse: Option<Mouse>,
    ) -> Option<Rc<FlatNode>> {
        let cluster = region?.cluster()?;
        let mouse = mouse?;
        cluster
            .nodes
            .iter()
            .find(|node| {
                self.block_rect(engine, node.start(), node.duration(), node.level)
                    .contains(mouse.x, mouse.y)
            })
            .cloned()
    }

    fn node_info(node: Option<&Rc<FlatNode>>) -> Option<NodeInfo> {
        node.map(|node| NodeInfo::from(&**node))
    }

    fn add_cluster_regions(&self, ctx: &mut PluginContext<'_>, row: Option<f64>) {
        for cluster in &self.actual_clusters {
            let rect = self.block_rect(&ctx.engine.base, cluster.start, cluster.duration, cluster.level);
            if !Self::is_visible(&ctx.engine.base, &rect) {
                continue;
            }
            if row.is_some_and(|y| y < rect.y || y > rect.bottom()) {
                continue;
            }
            ctx.interactions.add_hit_region(
                RegionKind::Cluster,
                RegionData::Cluster(Rc::clone(cluster)),
                rect,
                Some(Cursor::Pointer),
            );
        }
    }

    fn tooltip_fields(&self, node: &FlatNode, engine: &RenderEngine) -> Vec<TooltipField> {
        let precision = engine.accuracy() + 2;
        let units = engine.time_units();
        let source = &node.source;
        let mut duration = format!("duration: {:.*} {units}", precision, source.duration);
        if source.child_count > 0 {
            duration.push_str(&format!(" (self {:.*} {units})", precision, source.self_time()));
        }
        vec![
            TooltipField::new(source.name.as_str()),
            TooltipField::new(duration),
            TooltipField::new(format!("start: {:.*}", precision, source.start)),
        ]
    }

    fn emit(
        &self,
        ctx: &mut PluginContext<'_>,
        make: fn(Option<NodeInfo>, NodeKind) -> ChartEvent,
        node: Option<&Rc<FlatNode>>,
    ) {
        ctx.emit(make(Self::node_info(node), self.kind));
    }
}

impl Plugin for FlameChartPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_max(&self) -> Option<MinMax> {
        (!self.flat.is_empty()).then_some(self.bounds)
    }

    fn set_data(&mut self, nodes: &[TimelineNode], update: DataUpdate, ctx: &mut PluginContext<'_>) {
        self.load(nodes);
        self.hovered = None;
        if update.reset_selection {
            self.selected = None;
        }
        if !update.keep_y_position {
            self.position_y = update.new_y_position.unwrap_or(0.0).max(0.0);
        }
        ctx.request(Request::RecalcMinMax);
        ctx.request(Request::ResetView);
        ctx.render();
    }

    fn render(&mut self, ctx: &mut PluginContext<'_>) -> bool {
        self.update_clusters(&ctx.engine.base);

        let engine = &ctx.engine.base;
        let min_text_width = engine.min_text_width();
        let font_color = engine.styles().main.font_color.clone();
        let mut rects = Vec::new();
        for cluster in &self.actual_clusters {
            let rect = self.block_rect(engine, cluster.start, cluster.duration, cluster.level);
            if Self::is_visible(engine, &rect) {
                rects.push((Rc::clone(cluster), rect));
            }
        }

        for (cluster, rect) in &rects {
            if rect.w >= MIN_PAINTED_WIDTH {
                let mut color = self
                    .colors
                    .resolve(cluster.color.as_deref(), cluster.kind.as_deref());
                if cluster.is_inactive {
                    color = self.colors.fade(&color);
                }
                ctx.engine.base.add_rect_to_render_queue(&color, rect.x, rect.y, rect.w);
            }
            if cluster.is_single() && rect.w >= min_text_width {
                if let Some(node) = cluster.nodes.first() {
                    ctx.engine
                        .base
                        .add_text_to_render_queue(node.source.name.as_str(), rect.x, rect.y, rect.w);
                }
            }
            if cluster.is_highlighted {
                ctx.engine
                    .base
                    .add_stroke_to_render_queue(&font_color, rect.x, rect.y, rect.w, rect.h);
            }
        }

        if let Some(mouse) = ctx.mouse {
            self.add_cluster_regions(ctx, Some(mouse.y));
        }

        if let Some(node) = &self.selected {
            let rect = self.block_rect(&ctx.engine.base, node.start(), node.duration(), node.level);
            ctx.engine
                .base
                .add_stroke_to_render_queue(SELECTED_STROKE_COLOR, rect.x, rect.y, rect.w, rect.h);
        }
        false
    }

    fn rebuild_hit_regions(&mut self, ctx: &mut PluginContext<'_>) {
        ctx.interactions.clear_hit_regions();
        self.add_cluster_regions(ctx, None);
    }

    fn on_event(&mut self, event: &PanelEvent, ctx: &mut PluginContext<'_>) {
        match event {
            PanelEvent::Hover { region, mouse } => {
                self.hovered = self.find_node_in_cluster(&ctx.engine.base, region.as_ref(), *mouse);
            }
            PanelEvent::Click { region, mouse } => {
                let node = self.find_node_in_cluster(&ctx.engine.base, region.as_ref(), Some(*mouse));
                if node != self.selected {
                    self.selected = node;
                    ctx.render();
                    self.emit(ctx, |node, kind| ChartEvent::Select { node, kind }, self.selected.as_ref());
                }
            }
            PanelEvent::Down { region, mouse } => {
                let node = self.find_node_in_cluster(&ctx.engine.base, region.as_ref(), Some(*mouse));
                self.emit(ctx, |node, kind| ChartEvent::MouseDown { node, kind }, node.as_ref());
            }
            PanelEvent::Up { region, mouse, .. } => {
                ctx.clear_cursor();
                let node = self.find_node_in_cluster(&ctx.engine.base, region.as_ref(), Some(*mouse));
                self.emit(ctx, |node, kind| ChartEvent::MouseUp { node, kind }, node.as_ref());
            }
            PanelEvent::Double { region, mouse } => {
                let node = self.find_node_in_cluster(&ctx.engine.base, region.as_ref(), Some(*mouse));
                self.emit(ctx, |node, kind| ChartEvent::DoubleClick { node, kind }, node.as_ref());
            }
            PanelEvent::RightClick { region, mouse } => {
                let node = self.find_node_in_cluster(&ctx.engine.base, region.as_ref(), Some(*mouse));
                self.emit(ctx, |node, kind| ChartEvent::RightClick { node, kind }, node.as_ref());
            }
            PanelEvent::ChangePosition {
                delta_x,
                delta_y,
                dragging,
            } => {
                if *dragging {
                    ctx.set_cursor(Cursor::Grabbing);
                }
                let start_y = self.position_y;
                let delta_y = if ctx.engine.base.inverted() { -delta_y } else { *delta_y };
                self.position_y = (self.position_y + delta_y).max(0.0);
                if *delta_x != 0.0 {
                    ctx.try_to_change_position(*delta_x);
                }
                if self.position_y != start_y {
                    ctx.render();
                }
            }
            PanelEvent::MouseOut => {
                self.hovered = None;
            }
            PanelEvent::Move { region, mouse } => {
                // a merged cluster holds many nodes under one region
                let node = self.find_node_in_cluster(&ctx.engine.base, region.as_ref(), Some(*mouse));
                if node != self.hovered {
                    self.hovered = node;
                    ctx.partial_render();
                }
            }
        }
    }

    fn render_selected_node_mask(&mut self, ctx: &mut OverlayContext<'_>) {
        let Some(node) = &self.selected else {
            return;
        };
        let x = ctx.root.time_to_position(node.start());
        let w = node.duration() * ctx.root.zoom();
        let height = ctx.root.height();
        ctx.root.fill_rect(SELECTION_MASK_COLOR, Rect::new(x, 0.0, w, height));
    }

    fn render_tooltip(&mut self, ctx: &mut OverlayContext<'_>) -> bool {
        let Some(node) = self.hovered.clone() else {
            return false;
        };
        match &ctx.settings.options.tooltip {
            TooltipOption::Disabled => {}
            TooltipOption::Custom(tooltip) => {
                let info = NodeInfo::from(&*node);
                tooltip(Some(&info), &mut *ctx.root, ctx.mouse);
            }
            TooltipOption::Default => {
                let fields = self.tooltip_fields(&node, ctx.root);
                let mouse = ctx.mouse.unwrap_or(Point::new(0.0, 0.0));
                ctx.root.render_tooltip_from_data(&fields, mouse);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use flame_chart_protocol::RenderCommand;

    use super::*;
    use crate::interactions::PanelInteractions;
    use crate::render::{FixedWidthMetrics, PanelEngine, PanelId};
    use crate::settings::Settings;

    struct Harness {
        engine: PanelEngine,
        interactions: PanelInteractions,
        settings: Settings,
        requests: Vec<(PanelId, Request)>,
    }

    impl Harness {
        fn new(plugin: &FlameChartPlugin) -> Self {
            let settings = Settings::default();
            let metrics = Rc::new(FixedWidthMetrics::default());
            let mut engine = PanelEngine::new(RenderEngine::new(100.0, 100.0, 1.0, &settings, metrics));
            if let Some(MinMax { min, max }) = plugin.min_max() {
                engine.set_min_max(min, max);
            }
            engine.base.reset_view();
            Self {
                engine,
                interactions: PanelInteractions::new(PanelId(0)),
                settings,
                requests: Vec::new(),
            }
        }

        fn with<R>(&mut self, mouse: Option<Mouse>, f: impl FnOnce(&mut PluginContext<'_>) -> R) -> R {
            let mut ctx = PluginContext::new(
                PanelId(0),
                &mut self.engine,
                &mut self.interactions,
                &self.settings,
                mouse,
                &mut self.requests,
            );
            f(&mut ctx)
        }
    }

    fn tree() -> Vec<TimelineNode> {
        vec![
            TimelineNode::new("root", 0.0, 10.0).with_kind("task").with_children(vec![
                TimelineNode::new("parse", 0.0, 5.0).with_kind("task"),
                TimelineNode::new("eval", 5.0, 5.0).with_kind("task"),
            ]),
        ]
    }

    #[test]
    fn render_registers_only_the_mouse_row() {
        let mut plugin = FlameChartPlugin::new(&tree(), HashMap::new());
        let mut harness = Harness::new(&plugin);

        let fully = harness.with(Some(Point::new(20.0, 20.0)), |ctx| plugin.render(ctx));
        assert!(!fully);
        assert!(harness.engine.base.has_queued());
        assert_eq!(plugin.clusters().len(), 3);
        let levels: Vec<usize> = harness
            .interactions
            .hit_regions()
            .iter()
            .filter_map(|region| region.cluster().map(|c| c.level))
            .collect();
        assert_eq!(levels, vec![1, 1]);

        harness.with(None, |ctx| plugin.rebuild_hit_regions(ctx));
        assert_eq!(harness.interactions.hit_regions().len(), 3);
    }

    #[test]
    fn click_selects_the_node_under_the_mouse() {
        let mut plugin = FlameChartPlugin::new(&tree(), HashMap::new());
        let mut harness = Harness::new(&plugin);
        harness.with(None, |ctx| plugin.render(ctx));
        harness.with(None, |ctx| plugin.rebuild_hit_regions(ctx));

        let mouse = Point::new(70.0, 20.0);
        let region = harness
            .interactions
            .region_at(mouse.x, mouse.y)
            .cloned();
        harness.with(Some(mouse), |ctx| {
            plugin.on_event(&PanelEvent::Click { region, mouse }, ctx)
        });

        assert_eq!(plugin.selected().map(|n| n.source.name.to_string()), Some("eval".to_string()));
        let emitted: Vec<&ChartEvent> = harness
            .requests
            .iter()
            .filter_map(|(_, request)| match request {
                Request::Emit(event) => Some(event),
                _ => None,
            })
            .collect();
        assert!(matches!(
            emitted.as_slice(),
            [ChartEvent::Select { node: Some(info), kind: NodeKind::FlameChartNode }]
                if info.source.name == "eval" && info.level == 1
        ));
    }

    #[test]
    fn hover_follows_the_mouse_inside_a_merged_cluster() {
        let slivers: Vec<TimelineNode> = (0..1000)
            .map(|i| TimelineNode::new(format!("n{i}"), f64::from(i) * 0.5, 0.4).with_kind("task"))
            .collect();
        let mut plugin = FlameChartPlugin::new(&slivers, HashMap::new());
        let mut harness = Harness::new(&plugin);
        harness.with(None, |ctx| plugin.render(ctx));
        harness.with(None, |ctx| plugin.rebuild_hit_regions(ctx));
        assert_eq!(plugin.clusters().len(), 1);

        let hovered_name = |plugin: &FlameChartPlugin| plugin.hovered().map(|n| n.source.name.to_string());
        let first = Point::new(10.05, 8.0);
        let region = harness.interactions.region_at(first.x, first.y).cloned();
        harness.with(Some(first), |ctx| {
            plugin.on_event(
                &PanelEvent::Hover {
                    region: region.clone(),
                    mouse: Some(first),
                },
                ctx,
            )
        });
        assert_eq!(hovered_name(&plugin).as_deref(), Some("n100"));

        let second = Point::new(80.05, 8.0);
        let same = harness.interactions.region_at(second.x, second.y).cloned();
        assert_eq!(same, region);
        harness.requests.clear();
        harness.with(Some(second), |ctx| {
            plugin.on_event(
                &PanelEvent::Move {
                    region: same,
                    mouse: second,
                },
                ctx,
            )
        });
        assert_eq!(hovered_name(&plugin).as_deref(), Some("n800"));
        assert!(harness.requests.contains(&(PanelId(0), Request::PartialRender)));
    }

    #[test]
    fn vertical_pan_stops_at_the_top() {
        let mut plugin = FlameChartPlugin::new(&tree(), HashMap::new());
        let mut harness = Harness::new(&plugin);
        let event = |delta_y| PanelEvent::ChangePosition {
            delta_x: 0.5,
            delta_y,
            dragging: true,
        };

        harness.with(None, |ctx| plugin.on_event(&event(30.0), ctx));
        assert_eq!(plugin.position_y(), 30.0);
        harness.with(None, |ctx| plugin.on_event(&event(-50.0), ctx));
        assert_eq!(plugin.position_y(), 0.0);
        assert!(harness
            .requests
            .contains(&(PanelId(0), Request::TryChangePosition(0.5))));
        assert!(harness
            .requests
            .contains(&(PanelId(0), Request::SetCursor(Cursor::Grabbing))));
    }

    #[test]
    fn default_tooltip_lists_name_duration_and_start() {
        let mut plugin = FlameChartPlugin::new(&tree(), HashMap::new());
        let harness = Harness::new(&plugin);
        plugin.hovered = plugin.flat.first().cloned();

        let fields = plugin.tooltip_fields(plugin.flat[0].as_ref(), &harness.engine.base);
        let texts: Vec<&str> = fields.iter().map(|field| field.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["root", "duration: 10.00 ms (self 0.00 ms)", "start: 0.00"]
        );

        let settings = Settings::default();
        let mut root = RenderEngine::new(
            400.0,
            200.0,
            1.0,
            &settings,
            Rc::new(FixedWidthMetrics::default()),
        );
        let mut ctx = OverlayContext {
            root: &mut root,
            panel: &harness.engine,
            settings: &settings,
            mouse: Some(Point::new(5.0, 5.0)),
        };
        assert!(plugin.render_tooltip(&mut ctx));
        assert!(root
            .canvas()
            .commands()
            .iter()
            .any(|command| matches!(command, RenderCommand::DrawText { text, .. } if *text == "root")));
    }

    #[test]
    fn colors_prefer_explicit_then_map_then_generated() {
        let mut colors = NodeColors::new(HashMap::from([("task".to_string(), "#ff0000".to_string())]));
        assert_eq!(colors.resolve(Some("blue"), Some("task")), "blue");
        assert_eq!(colors.resolve(None, Some("task")), "#ff0000");
        let io = colors.resolve(None, Some("io"));
        let gc = colors.resolve(None, Some("gc"));
        assert_ne!(io, gc);
        assert_eq!(colors.resolve(None, Some("io")), io);
        assert_eq!(colors.fade("rgb(0, 0, 0)"), "rgba(0, 0, 0, 0.5)");
    }

    #[test]
    fn width_adjustment_keeps_a_gap() {
        assert_eq!(adjust_width(0.05), 0.1);
        assert_eq!(adjust_width(1.5), 1.0);
        assert_eq!(adjust_width(10.0), 9.0);
    }
}
