//! Panel plugins.
//!
//! A plugin owns the content of one panel. Every capability beyond
//! [`Plugin::render`] has a no-op default, so a plugin only implements what
//! it supports. Plugins never reach into the composite directly: anything
//! that affects shared state is queued as a [`Request`] and applied by the
//! container once the plugin call returns.

pub mod flame_chart;
pub mod time_grid;
pub mod timeframe_selector;

pub use flame_chart::FlameChartPlugin;
pub use time_grid::TimeGridPlugin;
pub use timeframe_selector::TimeframeSelectorPlugin;

use flame_chart_protocol::TimelineNode;
use serde::Serialize;

use crate::interactions::{Cursor, Mouse, PanelEvent, PanelInteractions};
use crate::model::{FlatNode, MinMax, NodeSource};
use crate::render::{PanelEngine, PanelId, RenderEngine};
use crate::settings::Settings;

/// Which kind of chart produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    #[serde(rename = "flame-chart-node")]
    FlameChartNode,
    #[serde(rename = "waterfall-node")]
    WaterfallNode,
}

/// A node's own fields merged with its place in the flattened tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    #[serde(flatten)]
    pub source: NodeSource,
    pub end: f64,
    pub level: usize,
    pub index: usize,
}

impl From<&FlatNode> for NodeInfo {
    fn from(node: &FlatNode) -> Self {
        Self {
            source: node.source.clone(),
            end: node.end,
            level: node.level,
            index: node.index,
        }
    }
}

/// Events the chart reports to its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum ChartEvent {
    #[serde(rename = "select")]
    Select {
        node: Option<NodeInfo>,
        #[serde(rename = "type")]
        kind: NodeKind,
    },
    #[serde(rename = "mousedown")]
    MouseDown {
        node: Option<NodeInfo>,
        #[serde(rename = "type")]
        kind: NodeKind,
    },
    #[serde(rename = "mouseup")]
    MouseUp {
        node: Option<NodeInfo>,
        #[serde(rename = "type")]
        kind: NodeKind,
    },
    #[serde(rename = "dblclick")]
    DoubleClick {
        node: Option<NodeInfo>,
        #[serde(rename = "type")]
        kind: NodeKind,
    },
    #[serde(rename = "rightClick")]
    RightClick {
        node: Option<NodeInfo>,
        #[serde(rename = "type")]
        kind: NodeKind,
    },
    #[serde(rename = "mouseout")]
    MouseOut,
}

/// Something a plugin wants done outside its own panel.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Render,
    PartialRender,
    /// Pan the shared viewport by a time delta.
    TryChangePosition(f64),
    SetZoomRange { start: f64, end: f64 },
    RecalcMinMax,
    ResetView,
    SetCursor(Cursor),
    ClearCursor,
    Emit(ChartEvent),
}

/// How `set_data` treats per-dataset view state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataUpdate {
    pub keep_y_position: bool,
    /// Used when `keep_y_position` is false; defaults to the top.
    pub new_y_position: Option<f64>,
    pub reset_selection: bool,
}

impl Default for DataUpdate {
    fn default() -> Self {
        Self {
            keep_y_position: false,
            new_y_position: None,
            reset_selection: true,
        }
    }
}

/// What a plugin gets to work with for one call.
pub struct PluginContext<'a> {
    pub id: PanelId,
    pub engine: &'a mut PanelEngine,
    pub interactions: &'a mut PanelInteractions,
    pub settings: &'a Settings,
    /// Panel-local mouse position, if the mouse is over the chart.
    pub mouse: Option<Mouse>,
    requests: &'a mut Vec<(PanelId, Request)>,
}

impl<'a> PluginContext<'a> {
    pub(crate) fn new(
        id: PanelId,
        engine: &'a mut PanelEngine,
        interactions: &'a mut PanelInteractions,
        settings: &'a Settings,
        mouse: Option<Mouse>,
        requests: &'a mut Vec<(PanelId, Request)>,
    ) -> Self {
        Self {
            id,
            engine,
            interactions,
            settings,
            mouse,
            requests,
        }
    }

    pub fn request(&mut self, request: Request) {
        self.requests.push((self.id, request));
    }

    pub fn render(&mut self) {
        self.request(Request::Render);
    }

    pub fn partial_render(&mut self) {
        self.request(Request::PartialRender);
    }

    pub fn try_to_change_position(&mut self, delta: f64) {
        self.request(Request::TryChangePosition(delta));
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.request(Request::SetCursor(cursor));
    }

    pub fn clear_cursor(&mut self) {
        self.request(Request::ClearCursor);
    }

    pub fn emit(&mut self, event: ChartEvent) {
        self.request(Request::Emit(event));
    }
}

/// Drawing directly on the composed root canvas, after every panel was
/// copied in.
pub struct OverlayContext<'a> {
    pub root: &'a mut RenderEngine,
    pub panel: &'a PanelEngine,
    pub settings: &'a Settings,
    /// Root coordinates.
    pub mouse: Option<Mouse>,
}

pub trait Plugin {
    fn name(&self) -> &str;

    /// Fixed panel height in pixels. `None` lets the panel share the free
    /// space with the other flexible panels.
    fn height(&self) -> Option<f64> {
        None
    }

    fn init(&mut self, _ctx: &mut PluginContext<'_>) {}

    fn post_init(&mut self, _ctx: &mut PluginContext<'_>) {}

    /// Data bounds this plugin contributes to the shared viewport.
    fn min_max(&self) -> Option<MinMax> {
        None
    }

    fn set_settings(&mut self, _settings: &Settings, _ctx: &mut PluginContext<'_>) {}

    fn set_data(&mut self, _nodes: &[TimelineNode], _update: DataUpdate, _ctx: &mut PluginContext<'_>) {}

    /// Draw the panel. Return `true` if everything was drawn and flushed;
    /// `false` asks the engine to flush the queued draws.
    fn render(&mut self, ctx: &mut PluginContext<'_>) -> bool;

    /// Called shortly after the last render to register hit regions that
    /// were skipped while drawing.
    fn rebuild_hit_regions(&mut self, _ctx: &mut PluginContext<'_>) {}

    fn on_event(&mut self, _event: &PanelEvent, _ctx: &mut PluginContext<'_>) {}

    fn post_render(&mut self, _ctx: &mut OverlayContext<'_>) {}

    fn render_selected_node_mask(&mut self, _ctx: &mut OverlayContext<'_>) {}

    /// Return `true` if a tooltip was drawn (or deliberately suppressed).
    fn render_tooltip(&mut self, _ctx: &mut OverlayContext<'_>) -> bool {
        false
    }
}
