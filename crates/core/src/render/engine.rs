//! The basic render engine: one canvas, one viewport, per-frame draw queues.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use flame_chart_protocol::{Color, Point, Rect, TextAlign};
use tracing::{debug, warn};

use super::canvas::{Canvas, TextMetrics};
use super::time_grid::TimeGrid;
use super::viewport::Viewport;
use crate::color::parse_color;
use crate::events::{Emitter, Subscription};
use crate::settings::{Settings, Styles};

const PLACEHOLDER: &str = "…";

#[derive(Debug, Clone, PartialEq)]
struct QueuedText {
    text: String,
    x: f64,
    y: f64,
    max_width: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct QueuedStroke {
    color: String,
    rect: Rect,
}

/// One tooltip line; lines without a color use the header color for the
/// first line and the body color for the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipField {
    pub text: String,
    pub color: Option<String>,
}

impl TooltipField {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }
}

/// Emitted after a resize actually changed the size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeEvent {
    pub width: f64,
    pub height: f64,
}

pub struct RenderEngine {
    pub(crate) canvas: Canvas,
    pub(crate) view: Viewport,
    pub(crate) styles: Styles,
    pub(crate) time_units: String,
    pub(crate) inverted: bool,
    pub(crate) grid: TimeGrid,
    metrics: Rc<dyn TextMetrics>,
    pixel_ratio: f64,
    char_width: f64,
    placeholder_width: f64,
    rect_queue: Vec<(String, Vec<Rect>)>,
    rect_slots: HashMap<String, usize>,
    text_queue: Vec<QueuedText>,
    stroke_queue: Vec<QueuedStroke>,
    colors: HashMap<String, Color>,
    resized: Emitter<ResizeEvent>,
}

impl fmt::Debug for RenderEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderEngine")
            .field("view", &self.view)
            .field("width", &self.canvas.width())
            .field("height", &self.canvas.height())
            .field("queued_rects", &self.rect_queue.len())
            .field("queued_texts", &self.text_queue.len())
            .finish_non_exhaustive()
    }
}

impl RenderEngine {
    pub fn new(
        width: f64,
        height: f64,
        pixel_ratio: f64,
        settings: &Settings,
        metrics: Rc<dyn TextMetrics>,
    ) -> Self {
        let mut canvas = Canvas::new(width, height);
        canvas.resize(width, height, pixel_ratio);
        let mut engine = Self {
            canvas,
            view: Viewport::new(width.max(0.0)),
            styles: settings.styles.clone(),
            time_units: settings.options.time_units.clone(),
            inverted: settings.options.inverted,
            grid: TimeGrid::default(),
            metrics,
            pixel_ratio,
            char_width: 0.0,
            placeholder_width: 0.0,
            rect_queue: Vec::new(),
            rect_slots: HashMap::new(),
            text_queue: Vec::new(),
            stroke_queue: Vec::new(),
            colors: HashMap::new(),
            resized: Emitter::new(),
        };
        engine.measure_font();
        engine
    }

    /// A new engine of the given height sharing this one's settings,
    /// metrics and viewport.
    pub(crate) fn spawn(&self, height: f64) -> Self {
        let mut child = Self {
            canvas: Canvas::new(self.width(), height),
            view: self.view,
            styles: self.styles.clone(),
            time_units: self.time_units.clone(),
            inverted: self.inverted,
            grid: self.grid,
            metrics: Rc::clone(&self.metrics),
            pixel_ratio: self.pixel_ratio,
            char_width: self.char_width,
            placeholder_width: self.placeholder_width,
            rect_queue: Vec::new(),
            rect_slots: HashMap::new(),
            text_queue: Vec::new(),
            stroke_queue: Vec::new(),
            colors: HashMap::new(),
            resized: Emitter::new(),
        };
        child
            .canvas
            .resize(self.width(), height, self.pixel_ratio);
        child
    }

    fn measure_font(&mut self) {
        let font_size = self.styles.main.font_size;
        self.char_width = self.metrics.measure("Sample text", font_size) / 11.0;
        self.placeholder_width = self.metrics.measure(PLACEHOLDER, font_size);
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn view(&self) -> &Viewport {
        &self.view
    }

    pub fn styles(&self) -> &Styles {
        &self.styles
    }

    pub fn time_units(&self) -> &str {
        &self.time_units
    }

    pub fn inverted(&self) -> bool {
        self.inverted
    }

    pub fn time_grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Decimal places needed to tell two neighbouring grid lines apart.
    pub fn accuracy(&self) -> usize {
        self.grid.accuracy
    }

    pub fn width(&self) -> f64 {
        self.canvas.width()
    }

    pub fn height(&self) -> f64 {
        self.canvas.height()
    }

    pub fn zoom(&self) -> f64 {
        self.view.zoom
    }

    pub fn position_x(&self) -> f64 {
        self.view.position_x
    }

    pub fn block_height(&self) -> f64 {
        self.styles.main.block_height
    }

    pub fn char_height(&self) -> f64 {
        self.styles.main.font_size
    }

    /// Narrowest block that can show at least one character.
    pub fn min_text_width(&self) -> f64 {
        self.char_width + self.placeholder_width
    }

    pub fn time_to_position(&self, time: f64) -> f64 {
        self.view.time_to_position(time)
    }

    pub fn pixel_to_time(&self, pixels: f64) -> f64 {
        self.view.pixel_to_time(pixels)
    }

    pub fn real_view(&self) -> f64 {
        self.view.real_view()
    }

    pub fn initial_zoom(&self) -> f64 {
        self.view.initial_zoom()
    }

    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        self.view.set_zoom(zoom)
    }

    pub fn set_position_x(&mut self, x: f64) -> f64 {
        self.view.set_position_x(x)
    }

    pub fn set_min_max(&mut self, min: f64, max: f64) {
        self.view.set_min_max(min, max);
    }

    pub fn try_to_change_position(&mut self, delta: f64) -> bool {
        self.view.try_to_change_position(delta)
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    pub(crate) fn set_view(&mut self, view: Viewport) {
        let width = self.view.width;
        self.view = Viewport { width, ..view };
    }

    pub fn set_settings(&mut self, settings: &Settings) {
        self.styles = settings.styles.clone();
        self.time_units = settings.options.time_units.clone();
        self.inverted = settings.options.inverted;
        self.measure_font();
    }

    pub fn subscribe_resize(&mut self, handler: impl FnMut(&ResizeEvent) + 'static) -> Subscription {
        self.resized.subscribe(handler)
    }

    /// Returns whether the height changed.
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let height_changed = height != self.canvas.height();
        if width == self.canvas.width() && !height_changed {
            return false;
        }
        debug!(width, height, "resize");
        self.canvas.resize(width, height, self.pixel_ratio);
        self.view.width = width;
        self.resized.emit(&ResizeEvent { width, height });
        height_changed
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        self.pixel_ratio = pixel_ratio;
        let (w, h) = (self.canvas.width(), self.canvas.height());
        self.canvas.resize(w, h, pixel_ratio);
    }

    /// Resolve a CSS color, caching the result. Unparseable colors fall
    /// back to black.
    pub fn resolve_color(&mut self, css: &str) -> Color {
        if let Some(color) = self.colors.get(css) {
            return *color;
        }
        let color = parse_color(css).unwrap_or_else(|err| {
            warn!(%err, "falling back to black");
            Color::BLACK
        });
        self.colors.insert(css.to_string(), color);
        color
    }

    /// Wipe the canvas to the background color.
    pub fn clear(&mut self) {
        self.canvas.clear();
        let background = self.styles.main.background_color.clone();
        let rect = Rect::new(0.0, 0.0, self.width(), self.height());
        self.fill_rect(&background, rect);
    }

    pub fn fill_rect(&mut self, color: &str, rect: Rect) {
        let color = self.resolve_color(color);
        self.canvas.fill_rect(rect, color);
    }

    pub fn stroke_rect(&mut self, color: &str, rect: Rect, width: f64) {
        let color = self.resolve_color(color);
        self.canvas.stroke_rect(rect, color, width);
    }

    pub fn fill_text(&mut self, text: &str, x: f64, y: f64, color: &str, font_size: f64) {
        let color = self.resolve_color(color);
        self.canvas
            .fill_text(text, Point::new(x, y), color, font_size, TextAlign::Left);
    }

    pub fn text_width(&self, text: &str) -> f64 {
        self.metrics.measure(text, self.styles.main.font_size)
    }

    /// Queue a block-height rectangle; rectangles are batched per color.
    pub fn add_rect_to_render_queue(&mut self, color: &str, x: f64, y: f64, w: f64) {
        let rect = Rect::new(x, y, w, self.block_height());
        match self.rect_slots.get(color) {
            Some(&slot) => self.rect_queue[slot].1.push(rect),
            None => {
                self.rect_slots
                    .insert(color.to_string(), self.rect_queue.len());
                self.rect_queue.push((color.to_string(), vec![rect]));
            }
        }
    }

    /// Queue a block label. Text that has no room at all is dropped here;
    /// text that is merely too long is shortened when flushed.
    pub fn add_text_to_render_queue(&mut self, text: &str, x: f64, y: f64, w: f64) {
        if text.is_empty() {
            return;
        }
        let padding = self.styles.main.block_padding_left_right;
        let max_width = w - (padding * 2.0 - x.min(0.0));
        if max_width > 0.0 {
            self.text_queue.push(QueuedText {
                text: text.to_string(),
                x,
                y,
                max_width,
            });
        }
    }

    pub fn add_stroke_to_render_queue(&mut self, color: &str, x: f64, y: f64, w: f64, h: f64) {
        self.stroke_queue.push(QueuedStroke {
            color: color.to_string(),
            rect: Rect::new(x, y, w, h),
        });
    }

    pub fn resolve_rect_render_queue(&mut self) {
        let queue = std::mem::take(&mut self.rect_queue);
        self.rect_slots.clear();
        for (css, rects) in queue {
            let color = self.resolve_color(&css);
            for rect in rects {
                self.canvas.fill_rect(rect, color);
            }
        }
    }

    pub fn resolve_text_render_queue(&mut self) {
        let queue = std::mem::take(&mut self.text_queue);
        if queue.is_empty() {
            return;
        }
        let font_color = self.styles.main.font_color.clone();
        let color = self.resolve_color(&font_color);
        let padding = self.styles.main.block_padding_left_right;
        let font_size = self.styles.main.font_size;
        let center = self.block_height() / 2.0;
        for item in queue {
            let Some(text) = self.fit_text(&item.text, item.max_width) else {
                continue;
            };
            let position = Point::new(item.x.max(0.0) + padding, item.y + center);
            self.canvas
                .fill_text(text, position, color, font_size, TextAlign::Left);
        }
    }

    pub fn resolve_stroke_render_queue(&mut self) {
        let queue = std::mem::take(&mut self.stroke_queue);
        for item in queue {
            let color = self.resolve_color(&item.color);
            self.canvas.stroke_rect(item.rect, color, 1.0);
        }
    }

    /// Flush every queue in paint order.
    pub fn flush_queues(&mut self) {
        self.resolve_rect_render_queue();
        self.resolve_text_render_queue();
        self.resolve_stroke_render_queue();
    }

    pub fn has_queued(&self) -> bool {
        !self.rect_queue.is_empty() || !self.text_queue.is_empty() || !self.stroke_queue.is_empty()
    }

    /// Shorten `text` to `max_width` by cutting the middle and inserting one
    /// placeholder glyph. `None` for empty text or when not even one
    /// character fits.
    pub fn fit_text(&self, text: &str, max_width: f64) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        let width = self.text_width(text);
        if width <= max_width {
            return Some(text.to_string());
        }
        let len = text.chars().count();
        let avg_char_width = width / len as f64;
        let max_chars = ((max_width - self.placeholder_width) / avg_char_width).floor();
        let half = (max_chars - 1.0) / 2.0;
        if half <= 0.0 {
            return None;
        }
        let head = half.ceil() as usize;
        let tail = half.floor() as usize;
        let mut out: String = text.chars().take(head).collect();
        out.push_str(PLACEHOLDER);
        out.extend(text.chars().skip(len.saturating_sub(tail)));
        Some(out)
    }

    /// Draw a tooltip box next to `mouse`, flipped to stay on the canvas.
    pub fn render_tooltip_from_data(&mut self, fields: &[TooltipField], mouse: Point) {
        if fields.is_empty() {
            return;
        }
        let main = self.styles.main.clone();
        let padding = main.block_padding_left_right;
        let line_height = self.char_height() + 2.0;
        let max_width = fields
            .iter()
            .map(|field| self.text_width(&field.text))
            .fold(0.0, f64::max);
        let box_width = max_width + padding * 4.0;
        let box_height = line_height * fields.len() as f64 + padding * 2.0;

        let mut x = mouse.x + 10.0;
        let mut y = mouse.y + 10.0;
        if x + box_width > self.width() {
            x = (mouse.x - 10.0 - box_width).max(0.0);
        }
        if y + box_height > self.height() {
            y = (mouse.y - 10.0 - box_height).max(0.0);
        }

        self.fill_rect(
            &main.tooltip_background_color,
            Rect::new(x, y, box_width, box_height),
        );
        for (index, field) in fields.iter().enumerate() {
            let color = match (&field.color, index) {
                (Some(color), _) => color.clone(),
                (None, 0) => main.tooltip_header_font_color.clone(),
                (None, _) => main.tooltip_body_font_color.clone(),
            };
            let text_y = y + padding + line_height * index as f64 + line_height / 2.0;
            self.fill_text(&field.text, x + padding, text_y, &color, main.font_size);
        }
    }
}
