//! Recording 2D surface.
//!
//! Drawing appends [`RenderCommand`]s in CSS pixels. The device pixel ratio
//! only affects the backing size and is applied as one scale transform when
//! the frame is handed to a renderer.

use flame_chart_protocol::{Color, Point, Rect, RenderCommand, SharedStr, TextAlign};

/// Text measurement used for ellipsis and tooltip layout.
pub trait TextMetrics {
    fn measure(&self, text: &str, font_size: f64) -> f64;
}

/// Every glyph is `char_width` em wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedWidthMetrics {
    pub char_width: f64,
}

impl Default for FixedWidthMetrics {
    fn default() -> Self {
        Self { char_width: 0.6 }
    }
}

impl TextMetrics for FixedWidthMetrics {
    fn measure(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * self.char_width
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: f64,
    height: f64,
    pixel_ratio: f64,
    commands: Vec<RenderCommand>,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            pixel_ratio: 1.0,
            commands: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Size of the device-pixel buffer.
    pub fn backing_size(&self) -> (f64, f64) {
        (
            (self.width * self.pixel_ratio).round(),
            (self.height * self.pixel_ratio).round(),
        )
    }

    /// Resizing drops whatever was recorded.
    pub fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.pixel_ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        self.commands.clear();
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// The recorded commands, wrapped in the pixel-ratio transform when it
    /// is not 1.
    pub fn frame(&self) -> Vec<RenderCommand> {
        if self.pixel_ratio == 1.0 {
            return self.commands.clone();
        }
        let mut out = Vec::with_capacity(self.commands.len() + 2);
        out.push(RenderCommand::PushTransform {
            translate: Point::new(0.0, 0.0),
            scale: Point::new(self.pixel_ratio, self.pixel_ratio),
        });
        out.extend(self.commands.iter().cloned());
        out.push(RenderCommand::PopTransform);
        out
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(RenderCommand::FillRect { rect, color });
    }

    pub fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) {
        self.commands
            .push(RenderCommand::StrokeRect { rect, color, width });
    }

    /// `position.y` is the vertical center of the line of text.
    pub fn fill_text(
        &mut self,
        text: impl Into<SharedStr>,
        position: Point,
        color: Color,
        font_size: f64,
        align: TextAlign,
    ) {
        self.commands.push(RenderCommand::DrawText {
            position,
            text: text.into(),
            color,
            font_size,
            align,
        });
    }

    pub fn line(&mut self, from: Point, to: Point, color: Color, width: f64) {
        self.commands.push(RenderCommand::DrawLine {
            from,
            to,
            color,
            width,
        });
    }

    pub fn clip(&mut self, rect: Rect) {
        self.commands.push(RenderCommand::SetClip { rect });
    }

    pub fn clear_clip(&mut self) {
        self.commands.push(RenderCommand::ClearClip);
    }

    /// Copy `other` with its top-left corner at `(x, y)`, clipped to its
    /// own bounds.
    pub fn draw_canvas(&mut self, other: &Canvas, x: f64, y: f64, id: &str) {
        if other.commands.is_empty() || other.width <= 0.0 || other.height <= 0.0 {
            return;
        }
        self.commands.reserve(other.commands.len() + 6);
        self.commands.push(RenderCommand::BeginGroup {
            id: SharedStr::from(id),
            label: None,
        });
        self.commands.push(RenderCommand::PushTransform {
            translate: Point::new(x, y),
            scale: Point::new(1.0, 1.0),
        });
        self.commands.push(RenderCommand::SetClip {
            rect: Rect::new(0.0, 0.0, other.width, other.height),
        });
        self.commands.extend(other.commands.iter().cloned());
        self.commands.push(RenderCommand::ClearClip);
        self.commands.push(RenderCommand::PopTransform);
        self.commands.push(RenderCommand::EndGroup);
    }
}
