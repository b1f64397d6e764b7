use serde::{Deserialize, Serialize};

use crate::shared_str::SharedStr;
use crate::types::{Color, Point, Rect};

/// A single, stateless render instruction.
///
/// Canvases record a `Vec<RenderCommand>` per frame. Renderers consume
/// this list sequentially; each command carries all the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    /// Fill a rectangle with a solid color.
    FillRect { rect: Rect, color: Color },

    /// Outline a rectangle. The stroke is centered on the rectangle edges.
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f64,
    },

    /// Draw a single line of text. `position.y` is the vertical center of
    /// the line; `position.x` is interpreted according to `align`.
    DrawText {
        position: Point,
        text: SharedStr,
        color: Color,
        font_size: f64,
        align: TextAlign,
    },

    /// Draw a line segment.
    DrawLine {
        from: Point,
        to: Point,
        color: Color,
        width: f64,
    },

    /// Restrict subsequent drawing to a rectangular region.
    SetClip { rect: Rect },

    /// Remove the active clip region.
    ClearClip,

    /// Push an affine transform (applied to all subsequent commands until
    /// the matching `PopTransform`).
    PushTransform { translate: Point, scale: Point },

    /// Pop the most recent transform.
    PopTransform,

    /// Begin a logical group (e.g. one panel's copied bitmap). Renderers
    /// may use this for batching, layer separation, or accessibility.
    BeginGroup {
        id: SharedStr,
        label: Option<SharedStr>,
    },

    /// End the current group.
    EndGroup,
}

impl RenderCommand {
    /// Whether the command paints pixels (as opposed to changing state).
    pub fn is_paint(&self) -> bool {
        matches!(
            self,
            Self::FillRect { .. }
                | Self::StrokeRect { .. }
                | Self::DrawText { .. }
                | Self::DrawLine { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_commands_are_distinguished_from_state() {
        let fill = RenderCommand::FillRect {
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            color: Color::BLACK,
        };
        assert!(fill.is_paint());
        assert!(!RenderCommand::PopTransform.is_paint());
        assert!(!RenderCommand::ClearClip.is_paint());
    }

    #[test]
    fn text_command_serializes_with_plain_string() {
        let cmd = RenderCommand::DrawText {
            position: Point::new(1.0, 2.0),
            text: SharedStr::from("main"),
            color: Color::BLACK,
            font_size: 10.0,
            align: TextAlign::Left,
        };
        let json = serde_json::to_string(&cmd).unwrap_or_default();
        assert!(json.contains("\"text\":\"main\""), "{json}");
    }
}
