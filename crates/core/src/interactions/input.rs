use flame_chart_protocol::Point;

use super::region::HitRegion;
use crate::render::PanelId;

/// Mouse position in pixels. Root coordinates unless stated otherwise.
pub type Mouse = Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Raw pointer input in root-canvas coordinates, as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Move { x: f64, y: f64 },
    Down { x: f64, y: f64, button: MouseButton },
    Up { x: f64, y: f64 },
    DoubleClick { x: f64, y: f64 },
    /// `modifier` is true while the zoom modifier key (ctrl/meta) is held.
    Wheel {
        x: f64,
        y: f64,
        delta_x: f64,
        delta_y: f64,
        modifier: bool,
    },
    Leave,
}

/// Root-level events, in root coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    Down {
        region: Option<HitRegion>,
        mouse: Mouse,
    },
    /// `is_click` is true when the mouse did not move since `Down`.
    Up {
        region: Option<HitRegion>,
        mouse: Mouse,
        is_click: bool,
    },
    Move {
        region: Option<HitRegion>,
        mouse: Mouse,
    },
    Click {
        region: Option<HitRegion>,
        mouse: Mouse,
    },
    Double {
        region: Option<HitRegion>,
        mouse: Mouse,
    },
    RightClick {
        region: Option<HitRegion>,
        mouse: Mouse,
    },
    /// Hovered region changed, possibly to nothing.
    Hover {
        region: Option<HitRegion>,
        mouse: Option<Mouse>,
    },
    /// `delta_x` is in time units, `delta_y` in pixels. `panel` is the panel
    /// that was under the mouse when the gesture started.
    ChangePosition {
        delta_x: f64,
        delta_y: f64,
        start: Mouse,
        mouse: Mouse,
        panel: Option<PanelId>,
        dragging: bool,
    },
    MouseOut,
}

/// Events as one panel sees them, with panel-local mouse coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    Down {
        region: Option<HitRegion>,
        mouse: Mouse,
    },
    Up {
        region: Option<HitRegion>,
        mouse: Mouse,
        is_click: bool,
    },
    Move {
        region: Option<HitRegion>,
        mouse: Mouse,
    },
    Click {
        region: Option<HitRegion>,
        mouse: Mouse,
    },
    Double {
        region: Option<HitRegion>,
        mouse: Mouse,
    },
    RightClick {
        region: Option<HitRegion>,
        mouse: Mouse,
    },
    Hover {
        region: Option<HitRegion>,
        mouse: Option<Mouse>,
    },
    ChangePosition {
        delta_x: f64,
        delta_y: f64,
        dragging: bool,
    },
    MouseOut,
}
