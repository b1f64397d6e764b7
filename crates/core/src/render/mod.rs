//! Render-engine hierarchy.
//!
//! ```text
//!   CompositeEngine ── root RenderEngine (visible canvas)
//!     ├─ Panel 0: PanelEngine (offscreen canvas) + Plugin
//!     ├─ Panel 1: PanelEngine ─┬─ child PanelEngine (make_child)
//!     └─ ...
//! ```
//!
//! There is no engine inheritance: every engine composes a [`Viewport`]
//! (the time ↔ pixel transform) with a recording [`Canvas`]. The composite
//! owns the authoritative viewport and pushes copies down to its panels.

pub mod canvas;
pub mod composite;
pub mod engine;
pub mod panel;
pub mod scheduler;
pub mod time_grid;
pub mod viewport;

pub use canvas::{Canvas, FixedWidthMetrics, TextMetrics};
pub use composite::{CompositeEngine, Panel, PanelId, PanelSize, ViewportControl, ZoomGate};
pub use engine::{RenderEngine, TooltipField};
pub use panel::PanelEngine;
pub use scheduler::{Debounce, FrameHandle, FrameSource, ManualFrames};
pub use time_grid::{TimeGrid, accuracy, precision_zoom_gate};
pub use viewport::Viewport;
