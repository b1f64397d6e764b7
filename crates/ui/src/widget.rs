use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use egui::{CursorIcon, PointerButton, Pos2, Rect, Sense, Vec2};
use flame_chart_core::{
    Cursor, FlameChart, FlameChartError, FlameChartOptions, ManualFrames, MouseButton,
    PointerInput, Settings,
};
use flame_chart_protocol::TimelineNode;

use crate::renderer;

/// Zoom factor of a pinch/ctrl-scroll gesture expressed as a wheel delta.
const PINCH_WHEEL_SCALE: f64 = 1000.0;

pub fn cursor_icon(cursor: Cursor) -> CursorIcon {
    match cursor {
        Cursor::Default => CursorIcon::Default,
        Cursor::Pointer => CursorIcon::PointingHand,
        Cursor::Grab => CursorIcon::Grab,
        Cursor::Grabbing => CursorIcon::Grabbing,
        Cursor::EwResize => CursorIcon::ResizeHorizontal,
        Cursor::Text => CursorIcon::Text,
    }
}

fn mouse_button(button: PointerButton) -> Option<MouseButton> {
    match button {
        PointerButton::Primary => Some(MouseButton::Left),
        PointerButton::Secondary => Some(MouseButton::Right),
        PointerButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

/// Translate one frame of egui input into chart pointer input, in
/// coordinates relative to `rect`.
///
/// `inside` tracks whether the pointer was over the chart last frame so a
/// single `Leave` is produced when it exits.
pub fn pointer_input(input: &egui::InputState, rect: Rect, inside: &mut bool) -> Vec<PointerInput> {
    let mut out = Vec::new();
    let local = |pos: Pos2| (f64::from(pos.x - rect.min.x), f64::from(pos.y - rect.min.y));

    for event in &input.events {
        match event {
            egui::Event::PointerMoved(pos) if rect.contains(*pos) => {
                *inside = true;
                let (x, y) = local(*pos);
                out.push(PointerInput::Move { x, y });
            }
            egui::Event::PointerMoved(_) | egui::Event::PointerGone => {
                if *inside {
                    *inside = false;
                    out.push(PointerInput::Leave);
                }
            }
            egui::Event::PointerButton {
                pos,
                button,
                pressed,
                ..
            } if rect.contains(*pos) => {
                let (x, y) = local(*pos);
                if !*pressed {
                    out.push(PointerInput::Up { x, y });
                } else if let Some(button) = mouse_button(*button) {
                    out.push(PointerInput::Down { x, y, button });
                }
            }
            _ => {}
        }
    }

    let Some(pos) = input.pointer.hover_pos().filter(|pos| rect.contains(*pos)) else {
        return out;
    };
    let (x, y) = local(pos);

    if input.pointer.button_double_clicked(PointerButton::Primary) {
        out.push(PointerInput::DoubleClick { x, y });
    }

    let zoom = input.zoom_delta();
    if (zoom - 1.0).abs() > f32::EPSILON {
        out.push(PointerInput::Wheel {
            x,
            y,
            delta_x: 0.0,
            delta_y: (1.0 - f64::from(zoom)) * PINCH_WHEEL_SCALE,
            modifier: true,
        });
    }

    let scroll = input.raw_scroll_delta;
    if scroll != Vec2::ZERO {
        out.push(PointerInput::Wheel {
            x,
            y,
            delta_x: -f64::from(scroll.x),
            delta_y: -f64::from(scroll.y),
            modifier: false,
        });
    }

    out
}

/// An embeddable egui widget hosting a [`FlameChart`].
///
/// The chart renders through a [`ManualFrames`] source which the widget
/// drains every egui frame, so all chart work happens on the UI thread.
pub struct FlameChartView {
    chart: FlameChart,
    frames: Rc<ManualFrames>,
    size: Vec2,
    inside: bool,
}

impl std::fmt::Debug for FlameChartView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlameChartView")
            .field("size", &self.size)
            .field("inside", &self.inside)
            .finish_non_exhaustive()
    }
}

impl FlameChartView {
    pub fn new(
        data: Vec<TimelineNode>,
        colors: HashMap<String, String>,
        settings: Settings,
    ) -> Result<Self, FlameChartError> {
        let frames = Rc::new(ManualFrames::new());
        let size = Vec2::new(800.0, 400.0);
        let options = FlameChartOptions::new(
            data,
            f64::from(size.x),
            f64::from(size.y),
            frames.clone(),
        )
        .with_colors(colors)
        .with_settings(settings);
        Ok(Self {
            chart: FlameChart::new(options)?,
            frames,
            size,
            inside: false,
        })
    }

    pub fn chart(&self) -> &FlameChart {
        &self.chart
    }

    pub fn chart_mut(&mut self) -> &mut FlameChart {
        &mut self.chart
    }

    /// Deliver every pending frame callback, including ones scheduled by
    /// the renders they trigger.
    fn run_frames(&mut self) {
        while self.frames.has_pending() {
            for handle in self.frames.take_pending() {
                self.chart.on_animation_frame(handle);
            }
        }
    }

    /// Lay the chart out over all available space.
    pub fn show(&mut self, ui: &mut egui::Ui) -> egui::Response {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        self.frames.set_now(ui.input(|i| i.time) * 1000.0);

        if (rect.size() - self.size).length() > 0.5 {
            self.size = rect.size();
            self.chart
                .resize(f64::from(self.size.x), f64::from(self.size.y));
        }

        let inputs = ui.input(|i| pointer_input(i, rect, &mut self.inside));
        for input in inputs {
            self.chart.handle_input(input);
        }

        self.run_frames();
        if self.chart.poll_timers() {
            self.run_frames();
        }

        let mut painter = ui.painter_at(rect);
        renderer::render_commands(&mut painter, self.chart.canvas().commands(), rect.min);

        if response.hovered() {
            ui.ctx().set_cursor_icon(cursor_icon(self.chart.cursor()));
        }
        if self.chart.is_busy() {
            ui.ctx().request_repaint_after(Duration::from_millis(16));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> Rect {
        Rect::from_min_size(Pos2::new(100.0, 50.0), Vec2::new(400.0, 300.0))
    }

    #[test]
    fn moves_are_relative_to_the_widget() {
        let mut input = egui::InputState::default();
        input.events.push(egui::Event::PointerMoved(Pos2::new(150.0, 60.0)));
        let mut inside = false;

        let out = pointer_input(&input, rect(), &mut inside);
        assert_eq!(out, vec![PointerInput::Move { x: 50.0, y: 10.0 }]);
        assert!(inside);
    }

    #[test]
    fn leaving_is_reported_once() {
        let mut input = egui::InputState::default();
        input.events.push(egui::Event::PointerMoved(Pos2::new(10.0, 10.0)));
        input.events.push(egui::Event::PointerGone);
        let mut inside = true;

        let out = pointer_input(&input, rect(), &mut inside);
        assert_eq!(out, vec![PointerInput::Leave]);
        assert!(!inside);
    }

    #[test]
    fn cursors_map_to_egui_icons() {
        assert_eq!(cursor_icon(Cursor::EwResize), CursorIcon::ResizeHorizontal);
        assert_eq!(cursor_icon(Cursor::Pointer), CursorIcon::PointingHand);
    }

    #[test]
    fn view_builds_from_plain_data() {
        let data = vec![TimelineNode::new("main", 0.0, 10.0)];
        let Ok(view) = FlameChartView::new(data, HashMap::new(), Settings::default()) else {
            panic!("view builds");
        };
        assert_eq!(view.chart().view().max, 10.0);
    }
}
