use super::composite::ZoomGate;
use super::engine::RenderEngine;
use super::viewport::Viewport;
use crate::settings::TimeGridStyles;

/// Vertical grid lines for the visible range.
///
/// Line `i` sits at time `min + i * delta`, for `i` in `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeGrid {
    pub delta: f64,
    pub start: i64,
    pub end: i64,
    /// Decimal places the labels are printed with.
    pub accuracy: usize,
}

impl TimeGrid {
    pub fn recalc(view: &Viewport, styles: &TimeGridStyles) -> Self {
        let real_view = view.real_view();
        if !real_view.is_finite() || real_view <= 0.0 || view.width <= 0.0 {
            return Self::default();
        }
        let spacing = if styles.min_line_spacing > 0.0 {
            styles.min_line_spacing
        } else {
            TimeGridStyles::default().min_line_spacing
        };
        let target_count = (view.width / spacing).max(2.0);
        let delta = nice_interval(real_view / target_count);
        let start = ((view.position_x - view.min) / delta).floor() as i64;
        let end = (real_view / delta).ceil() as i64 + start;
        Self {
            delta,
            start,
            end,
            accuracy: accuracy(delta),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.delta <= 0.0
    }

    /// `(pixel, time)` for every line, left to right.
    pub fn lines<'a>(&'a self, view: &'a Viewport) -> impl Iterator<Item = (f64, f64)> + 'a {
        let count = if self.is_empty() { 0 } else { self.end - self.start + 1 };
        (0..count.max(0)).map(move |offset| {
            let time = (self.start + offset) as f64 * self.delta + view.min;
            (view.time_to_position(round_to(time, self.accuracy)), time)
        })
    }

    /// One-pixel lines from `top` down `height` pixels.
    pub fn render_lines(&self, engine: &mut RenderEngine, top: f64, height: f64) {
        if height <= 0.0 || self.is_empty() {
            return;
        }
        let color = engine.styles().time_grid.color.clone();
        let view = *engine.view();
        for (pixel, _) in self.lines(&view) {
            engine.fill_rect(
                &color,
                flame_chart_protocol::Rect::new(pixel, top, 1.0, height),
            );
        }
    }

    /// Time labels along the top edge.
    pub fn render_times(&self, engine: &mut RenderEngine) {
        if self.is_empty() {
            return;
        }
        let styles = engine.styles().time_grid.clone();
        let padding = engine.styles().main.block_padding_left_right;
        let units = engine.time_units().to_string();
        let view = *engine.view();
        let y = styles.height / 2.0;
        for (pixel, time) in self.lines(&view) {
            let label = format!("{:.*}{units}", self.accuracy, time);
            engine.fill_text(&label, pixel + padding, y, &styles.font_color, styles.font_size);
        }
    }
}

/// Pick a 1-2-5 step no smaller than `raw`.
fn nice_interval(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let magnitude = 10.0_f64.powf(raw.log10().floor());
    for step in [1.0, 2.0, 5.0, 10.0] {
        if step * magnitude >= raw {
            return step * magnitude;
        }
    }
    magnitude * 10.0
}

fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10.0_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Decimal places needed to print half of `value`.
pub fn accuracy(value: f64) -> usize {
    let half = (value / 2.0).abs();
    if half == 0.0 || half >= 1.0 || !half.is_finite() {
        return 0;
    }
    (-half.log10()).ceil() as usize
}

/// Refuse zooming in once a single pixel would need more than
/// `max_accuracy` decimals. Zooming out is always allowed.
pub fn precision_zoom_gate(max_accuracy: usize) -> ZoomGate {
    Box::new(move |view: &Viewport, zoom: f64| {
        zoom <= view.zoom || accuracy(1.0 / zoom) <= max_accuracy
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(width: f64, min: f64, max: f64) -> Viewport {
        let mut view = Viewport::new(width);
        view.set_min_max(min, max);
        view.reset();
        view
    }

    #[test]
    fn nice_interval_selects_reasonable_value() {
        assert_eq!(nice_interval(0.7), 1.0);
        assert_eq!(nice_interval(1.3), 2.0);
        assert_eq!(nice_interval(37.0), 50.0);
        assert_eq!(nice_interval(60.0), 100.0);
        assert!((nice_interval(0.0013) - 0.002).abs() < 1e-12);
    }

    #[test]
    fn accuracy_counts_decimals_of_half_step() {
        assert_eq!(accuracy(10.0), 0);
        assert_eq!(accuracy(1.0), 1);
        assert_eq!(accuracy(0.2), 1);
        assert_eq!(accuracy(0.02), 2);
        assert_eq!(accuracy(0.0), 0);
    }

    #[test]
    fn lines_cover_visible_range() {
        let view = view(800.0, 0.0, 1000.0);
        let grid = TimeGrid::recalc(&view, &TimeGridStyles::default());
        // 1000 over 10 slots of 80px
        assert_eq!(grid.delta, 100.0);
        let lines: Vec<(f64, f64)> = grid.lines(&view).collect();
        assert_eq!(lines.first(), Some(&(0.0, 0.0)));
        assert_eq!(lines.last(), Some(&(800.0, 1000.0)));
        assert!(lines.windows(2).all(|w| w[1].0 - w[0].0 >= 80.0 - 1e-9));
    }

    #[test]
    fn empty_view_has_no_lines() {
        let view = Viewport::new(0.0);
        let grid = TimeGrid::recalc(&view, &TimeGridStyles::default());
        assert!(grid.is_empty());
        assert_eq!(grid.lines(&view).count(), 0);
    }

    #[test]
    fn precision_gate_blocks_only_deep_zoom_in() {
        let gate = precision_zoom_gate(2);
        let view = view(100.0, 0.0, 100.0);
        assert!(gate(&view, 10.0));
        assert!(!gate(&view, 1000.0));
        assert!(gate(&view, 0.5));
    }
}
