pub mod chart;
pub mod color;
pub mod container;
pub mod error;
pub mod events;
pub mod interactions;
pub mod model;
pub mod plugins;
pub mod render;
pub mod settings;

pub use chart::{FlameChart, FlameChartOptions, parse_data};
pub use container::{Container, ContainerOptions};
pub use error::FlameChartError;
pub use events::{Emitter, Subscription};
pub use interactions::{
    Cursor, HitRegion, InteractionEvent, InteractionsEngine, Mouse, MouseButton, PanelEvent,
    PointerInput, RegionData, RegionKind,
};
pub use plugins::{
    ChartEvent, DataUpdate, FlameChartPlugin, NodeInfo, NodeKind, OverlayContext, Plugin,
    PluginContext, Request, TimeGridPlugin, TimeframeSelectorPlugin,
};
pub use render::{
    Canvas, CompositeEngine, FixedWidthMetrics, FrameHandle, FrameSource, ManualFrames,
    PanelEngine, PanelId, RenderEngine, TextMetrics, TimeGrid, Viewport, ViewportControl, ZoomGate,
};
pub use settings::{Options, Settings, Styles, TooltipOption};
