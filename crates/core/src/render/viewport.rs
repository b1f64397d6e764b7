use tracing::warn;

/// The shared time ↔ pixel transform.
///
/// `zoom` is pixels per time unit, `position_x` is the time at the left
/// edge, `min`/`max` bound the data and `width` is the visible width in
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    pub position_x: f64,
    pub min: f64,
    pub max: f64,
    pub width: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            position_x: 0.0,
            min: 0.0,
            max: 0.0,
            width: 0.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Store a new zoom. Non-positive or non-finite values are refused.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        if !zoom.is_finite() || zoom <= 0.0 {
            warn!(zoom, "refusing invalid zoom");
            return false;
        }
        self.zoom = zoom;
        true
    }

    /// Store a new left edge and return how far it moved.
    pub fn set_position_x(&mut self, x: f64) -> f64 {
        let delta = x - self.position_x;
        self.position_x = x;
        delta
    }

    pub fn set_min_max(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
    }

    pub fn time_to_position(&self, time: f64) -> f64 {
        time * self.zoom - self.position_x * self.zoom
    }

    pub fn pixel_to_time(&self, pixels: f64) -> f64 {
        pixels / self.zoom
    }

    /// Visible duration.
    pub fn real_view(&self) -> f64 {
        self.width / self.zoom
    }

    /// Time at the right edge.
    pub fn view_end(&self) -> f64 {
        self.position_x + self.real_view()
    }

    /// Zoom that fits `[min, max]` into the width.
    pub fn initial_zoom(&self) -> f64 {
        if self.max > self.min {
            let zoom = self.width / (self.max - self.min);
            if zoom.is_finite() && zoom > 0.0 {
                return zoom;
            }
        }
        1.0
    }

    /// Move the left edge by `delta`, clamped to `[min, max - real_view]`.
    ///
    /// Returns whether the position changed.
    pub fn try_to_change_position(&mut self, delta: f64) -> bool {
        let real_view = self.real_view();
        let target = self.position_x + delta;
        let next = if target + real_view <= self.max && target >= self.min {
            target
        } else if target <= self.min {
            self.min
        } else {
            self.max - real_view
        };
        self.set_position_x(next) != 0.0
    }

    /// Fit the whole data range.
    pub fn reset(&mut self) {
        self.zoom = self.initial_zoom();
        self.position_x = self.min;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(width: f64, min: f64, max: f64) -> Viewport {
        let mut view = Viewport::new(width);
        view.set_min_max(min, max);
        view.reset();
        view
    }

    #[test]
    fn pixel_to_time_inverts_time_to_position() {
        for &(zoom, position) in &[(1.0, 0.0), (0.37, 120.0), (250.0, -3.5), (1e-4, 1e6)] {
            let view = Viewport {
                zoom,
                position_x: position,
                ..Viewport::new(800.0)
            };
            for &t in &[0.0, 1.0, 17.25, 4096.0] {
                let back = view.pixel_to_time(view.time_to_position(t) - view.time_to_position(0.0));
                assert!((back - t).abs() <= 1e-9 * t.abs().max(1.0), "zoom={zoom} t={t} back={back}");
            }
        }
    }

    #[test]
    fn initial_zoom_fits_data() {
        let view = viewport(800.0, 100.0, 500.0);
        assert_eq!(view.zoom, 2.0);
        assert_eq!(view.position_x, 100.0);
        assert_eq!(view.real_view(), 400.0);
        assert_eq!(viewport(800.0, 5.0, 5.0).initial_zoom(), 1.0);
    }

    #[test]
    fn set_position_returns_delta() {
        let mut view = Viewport::new(100.0);
        assert_eq!(view.set_position_x(10.0), 10.0);
        assert_eq!(view.set_position_x(4.0), -6.0);
    }

    #[test]
    fn change_position_clamps_to_data() {
        let mut view = viewport(100.0, 0.0, 1000.0);
        assert!(view.set_zoom(1.0));

        assert!(view.try_to_change_position(50.0));
        assert_eq!(view.position_x, 50.0);

        view.try_to_change_position(-500.0);
        assert_eq!(view.position_x, 0.0);
        assert!(!view.try_to_change_position(-1.0));

        view.try_to_change_position(5000.0);
        assert_eq!(view.position_x, 900.0);
        assert_eq!(view.view_end(), 1000.0);
    }

    #[test]
    fn invalid_zoom_is_rejected() {
        let mut view = viewport(100.0, 0.0, 10.0);
        let before = view.zoom;
        assert!(!view.set_zoom(0.0));
        assert!(!view.set_zoom(-2.0));
        assert!(!view.set_zoom(f64::NAN));
        assert!(!view.set_zoom(f64::INFINITY));
        assert_eq!(view.zoom, before);
    }
}
