//! The overview strip: the whole dataset in miniature, with the current
//! view window marked and draggable.

use flame_chart_protocol::{Rect, TimelineNode};
use tracing::trace;

use super::{DataUpdate, Plugin, PluginContext, Request};
use crate::interactions::{Cursor, Edge, HitRegion, PanelEvent, RegionData, RegionKind};
use crate::model::{MinMax, flatten, min_max};
use crate::render::PanelEngine;
use crate::settings::{Settings, TimeframeSelectorStyles};

/// Windows narrower than this, in pixels, are treated as a plain click.
const MIN_SELECTION_PX: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Knob(Edge),
    Area { anchor: f64 },
}

/// Number of nodes running at each time, as a step function.
///
/// Each `(time, count)` holds until the next point's time.
fn density(nodes: &[TimelineNode]) -> Vec<(f64, usize)> {
    let flat = flatten(nodes);
    // (time, is_start); ends sort before starts at the same time.
    let mut events: Vec<(f64, bool)> = flat
        .iter()
        .flat_map(|node| [(node.start(), true), (node.end, false)])
        .collect();
    events.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut points: Vec<(f64, usize)> = Vec::new();
    let mut count = 0usize;
    let mut index = 0;
    while index < events.len() {
        let time = events[index].0;
        while index < events.len() && events[index].0 == time {
            if events[index].1 {
                count += 1;
            } else {
                count = count.saturating_sub(1);
            }
            index += 1;
        }
        if points.last().is_none_or(|&(_, last)| last != count) {
            points.push((time, count));
        }
    }
    points
}

#[derive(Debug, Clone)]
pub struct TimeframeSelectorPlugin {
    styles: TimeframeSelectorStyles,
    points: Vec<(f64, usize)>,
    bounds: Option<MinMax>,
    child: Option<usize>,
    /// Width and data generation the graph was last drawn for.
    graph_key: Option<(f64, u64)>,
    generation: u64,
    drag: Option<Drag>,
    selection: Option<(f64, f64)>,
}

impl TimeframeSelectorPlugin {
    pub fn new(nodes: &[TimelineNode], settings: &Settings) -> Self {
        let mut plugin = Self {
            styles: settings.styles.timeframe_selector.clone(),
            points: Vec::new(),
            bounds: None,
            child: None,
            graph_key: None,
            generation: 0,
            drag: None,
            selection: None,
        };
        plugin.load(nodes);
        plugin
    }

    fn load(&mut self, nodes: &[TimelineNode]) {
        self.points = density(nodes);
        let flat = flatten(nodes);
        self.bounds = (!flat.is_empty()).then(|| min_max(&flat));
        self.generation += 1;
        self.drag = None;
        self.selection = None;
    }

    /// Pixels per time unit across the full dataset.
    fn scale(&self, width: f64) -> f64 {
        match self.bounds {
            Some(MinMax { min, max }) if max > min => width / (max - min),
            _ => 0.0,
        }
    }

    fn time_to_x(&self, time: f64, width: f64) -> f64 {
        let min = self.bounds.map_or(0.0, |b| b.min);
        (time - min) * self.scale(width)
    }

    fn x_to_time(&self, x: f64, width: f64) -> f64 {
        let min = self.bounds.map_or(0.0, |b| b.min);
        let scale = self.scale(width);
        if scale > 0.0 { min + x / scale } else { min }
    }

    fn render_graph(&self, child: &mut PanelEngine) {
        child.clear();
        let width = child.width();
        let height = child.height();
        let columns = width.max(0.0).ceil() as usize;
        let peak = self.points.iter().map(|&(_, count)| count).max().unwrap_or(0);
        if columns == 0 || peak == 0 {
            return;
        }

        let mut column_counts = vec![0usize; columns];
        for pair in self.points.windows(2) {
            let (from, count) = pair[0];
            let (to, _) = pair[1];
            if count == 0 {
                continue;
            }
            let first = (self.time_to_x(from, width).floor().max(0.0) as usize).min(columns);
            let last = (self.time_to_x(to, width).ceil().max(0.0) as usize).clamp(first, columns);
            for slot in &mut column_counts[first..last] {
                *slot = (*slot).max(count);
            }
        }

        let unit = (height - 1.0).max(0.0) / peak as f64;
        let fill = self.styles.graph_fill_color.clone();
        let mut run_start = 0;
        for column in 1..=columns {
            if column < columns && column_counts[column] == column_counts[run_start] {
                continue;
            }
            let count = column_counts[run_start];
            if count > 0 {
                let h = count as f64 * unit;
                let rect = Rect::new(run_start as f64, height - 1.0 - h, (column - run_start) as f64, h);
                child.base.fill_rect(&fill, rect);
            }
            run_start = column;
        }
        child
            .base
            .fill_rect(&self.styles.bottom_line_color, Rect::new(0.0, height - 1.0, width, 1.0));
    }

    /// The highlighted window in time: the drag in progress, or the view.
    fn window(&self, ctx: &PluginContext<'_>) -> (f64, f64) {
        self.selection.unwrap_or_else(|| {
            let view = ctx.engine.base.view();
            (view.position_x, view.view_end())
        })
    }

    fn render_knob(&self, ctx: &mut PluginContext<'_>, x: f64, edge: Edge) {
        let height = ctx.engine.height();
        let size = self.styles.knob_size;
        let engine = &mut ctx.engine.base;
        engine.fill_rect(&self.styles.knob_color, Rect::new(x, 0.0, 1.0, height));
        let knob = Rect::new(x - size / 2.0, height / 2.0 - size, size, size * 2.0);
        engine.fill_rect(&self.styles.knob_color, knob);
        engine.stroke_rect(&self.styles.knob_stroke_color, knob, 1.0);
        ctx.interactions.add_hit_region(
            RegionKind::TimeframeKnob,
            RegionData::Edge(edge),
            Rect::new(x - size, 0.0, size * 2.0, height),
            Some(Cursor::EwResize),
        );
    }

    fn update_selection(&mut self, drag: Drag, time: f64, current: (f64, f64)) {
        let (start, end) = current;
        self.selection = Some(match drag {
            Drag::Knob(Edge::Start) => (time.min(end), time.max(end)),
            Drag::Knob(Edge::End) => (start.min(time), start.max(time)),
            Drag::Area { anchor } => (anchor.min(time), anchor.max(time)),
        });
    }

    fn start_drag(&mut self, region: Option<&HitRegion>, time: f64, ctx: &PluginContext<'_>) {
        let drag = match region.map(|r| (r.kind, &r.data)) {
            Some((RegionKind::TimeframeKnob, RegionData::Edge(edge))) => Drag::Knob(*edge),
            Some((RegionKind::TimeframeArea, _)) => Drag::Area { anchor: time },
            _ => return,
        };
        let window = self.window(ctx);
        self.selection = Some(match drag {
            Drag::Knob(_) => window,
            Drag::Area { anchor } => (anchor, anchor),
        });
        self.drag = Some(drag);
        trace!(?drag, "timeframe drag started");
    }
}

impl Plugin for TimeframeSelectorPlugin {
    fn name(&self) -> &str {
        "timeframe-selector"
    }

    fn height(&self) -> Option<f64> {
        Some(self.styles.height)
    }

    fn init(&mut self, ctx: &mut PluginContext<'_>) {
        self.child = Some(ctx.engine.make_child(self.styles.height));
    }

    fn min_max(&self) -> Option<MinMax> {
        self.bounds
    }

    fn set_settings(&mut self, settings: &Settings, ctx: &mut PluginContext<'_>) {
        self.styles = settings.styles.timeframe_selector.clone();
        let width = ctx.engine.width();
        if let Some(child) = self.child.and_then(|index| ctx.engine.child_mut(index)) {
            child.resize(width, self.styles.height);
        }
        self.graph_key = None;
    }

    fn set_data(&mut self, nodes: &[TimelineNode], _update: DataUpdate, _ctx: &mut PluginContext<'_>) {
        self.load(nodes);
    }

    fn render(&mut self, ctx: &mut PluginContext<'_>) -> bool {
        let width = ctx.engine.width();
        let height = ctx.engine.height();
        let background = Rect::new(0.0, 0.0, width, height);
        ctx.engine
            .base
            .fill_rect(&self.styles.background_color, background);

        if let Some(index) = self.child {
            let key = (width, self.generation);
            if self.graph_key != Some(key) {
                if let Some(child) = ctx.engine.child_mut(index) {
                    self.render_graph(child);
                }
                self.graph_key = Some(key);
            }
            ctx.engine.draw_child(index, 0.0, 0.0);
        }

        let (start, end) = self.window(ctx);
        let x_start = self.time_to_x(start, width).clamp(0.0, width);
        let x_end = self.time_to_x(end, width).clamp(0.0, width);
        let overlay = self.styles.overlay_color.clone();
        ctx.engine.base.fill_rect(&overlay, Rect::new(0.0, 0.0, x_start, height));
        ctx.engine
            .base
            .fill_rect(&overlay, Rect::new(x_end, 0.0, width - x_end, height));

        let precision = ctx.engine.base.accuracy();
        let units = ctx.engine.base.time_units().to_string();
        let font_size = ctx.engine.base.styles().main.font_size;
        let padding = ctx.engine.base.styles().main.block_padding_left_right;
        let label = format!("{:.*}{units}", precision, end - start);
        ctx.engine.base.fill_text(
            &label,
            x_start + padding,
            font_size,
            &self.styles.font_color,
            font_size,
        );

        self.render_knob(ctx, x_start, Edge::Start);
        self.render_knob(ctx, x_end, Edge::End);
        ctx.interactions.add_hit_region(
            RegionKind::TimeframeArea,
            RegionData::Empty,
            background,
            Some(Cursor::Text),
        );
        true
    }

    fn on_event(&mut self, event: &PanelEvent, ctx: &mut PluginContext<'_>) {
        let width = ctx.engine.width();
        match event {
            PanelEvent::Down { region, mouse } => {
                let time = self.x_to_time(mouse.x, width);
                self.start_drag(region.as_ref(), time, ctx);
            }
            PanelEvent::Move { mouse, .. } => {
                let Some(drag) = self.drag else {
                    return;
                };
                let time = self.x_to_time(mouse.x.clamp(0.0, width), width);
                let current = self.window(ctx);
                self.update_selection(drag, time, current);
                ctx.partial_render();
            }
            PanelEvent::Up { mouse, .. } => {
                let Some(drag) = self.drag.take() else {
                    return;
                };
                let time = self.x_to_time(mouse.x.clamp(0.0, width), width);
                let current = self.window(ctx);
                self.update_selection(drag, time, current);
                if let Some((start, end)) = self.selection.take() {
                    if (end - start) * self.scale(width) >= MIN_SELECTION_PX {
                        ctx.request(Request::SetZoomRange { start, end });
                    }
                }
                ctx.partial_render();
            }
            PanelEvent::MouseOut => {
                if self.drag.take().is_some() {
                    self.selection = None;
                    ctx.partial_render();
                }
            }
            _ => {}
        }
    }
}
