use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use flame_chart_core::{
    ChartEvent, DataUpdate, FlameChart, FlameChartOptions, ManualFrames, MouseButton,
    PointerInput, Settings, parse_data,
};
use wasm_bindgen::prelude::*;

struct Instance {
    chart: FlameChart,
    frames: Rc<ManualFrames>,
    events: Rc<RefCell<Vec<ChartEvent>>>,
}

thread_local! {
    static CHARTS: RefCell<Vec<Option<Instance>>> = const { RefCell::new(Vec::new()) };
}

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn with_chart<T>(handle: usize, f: impl FnOnce(&mut Instance) -> T) -> Result<T, JsError> {
    CHARTS.with(|charts| {
        let mut charts = charts.borrow_mut();
        let instance = charts
            .get_mut(handle)
            .and_then(Option::as_mut)
            .ok_or_else(|| JsError::new("invalid chart handle"))?;
        Ok(f(instance))
    })
}

fn button(code: u8) -> MouseButton {
    match code {
        1 => MouseButton::Middle,
        2 => MouseButton::Right,
        _ => MouseButton::Left,
    }
}

/// Create a chart from a JSON node tree. `colors` maps node types to CSS
/// colors and `settings` is a partial settings object; both are JSON and
/// optional. Returns a handle for later calls.
#[wasm_bindgen]
pub fn create_chart(
    data: &str,
    colors: Option<String>,
    settings: Option<String>,
    width: f64,
    height: f64,
    pixel_ratio: f64,
) -> Result<usize, JsError> {
    let nodes = parse_data(data).map_err(js_error)?;
    let colors: HashMap<String, String> = match colors {
        Some(json) => serde_json::from_str(&json).map_err(js_error)?,
        None => HashMap::new(),
    };
    let settings = match settings {
        Some(json) => Settings::from_json(&json).map_err(js_error)?,
        None => Settings::default(),
    };

    let frames = Rc::new(ManualFrames::new());
    let options = FlameChartOptions::new(nodes, width, height, frames.clone())
        .with_colors(colors)
        .with_settings(settings)
        .with_pixel_ratio(pixel_ratio);
    let mut chart = FlameChart::new(options).map_err(js_error)?;

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    chart.subscribe(move |event: &ChartEvent| sink.borrow_mut().push(event.clone()));

    let instance = Instance {
        chart,
        frames,
        events,
    };
    Ok(CHARTS.with(|charts| {
        let mut charts = charts.borrow_mut();
        charts.push(Some(instance));
        charts.len() - 1
    }))
}

/// Drop a chart. Its handle is never reused.
#[wasm_bindgen]
pub fn destroy_chart(handle: usize) -> bool {
    CHARTS.with(|charts| {
        charts
            .borrow_mut()
            .get_mut(handle)
            .and_then(Option::take)
            .is_some()
    })
}

#[wasm_bindgen]
pub fn pointer_move(handle: usize, x: f64, y: f64) -> Result<(), JsError> {
    with_chart(handle, |instance| {
        instance.chart.handle_input(PointerInput::Move { x, y });
    })
}

/// `button_code` follows `MouseEvent.button`: 0 left, 1 middle, 2 right.
#[wasm_bindgen]
pub fn pointer_down(handle: usize, x: f64, y: f64, button_code: u8) -> Result<(), JsError> {
    with_chart(handle, |instance| {
        instance.chart.handle_input(PointerInput::Down {
            x,
            y,
            button: button(button_code),
        });
    })
}

#[wasm_bindgen]
pub fn pointer_up(handle: usize, x: f64, y: f64) -> Result<(), JsError> {
    with_chart(handle, |instance| {
        instance.chart.handle_input(PointerInput::Up { x, y });
    })
}

#[wasm_bindgen]
pub fn double_click(handle: usize, x: f64, y: f64) -> Result<(), JsError> {
    with_chart(handle, |instance| {
        instance.chart.handle_input(PointerInput::DoubleClick { x, y });
    })
}

#[wasm_bindgen]
pub fn wheel(
    handle: usize,
    x: f64,
    y: f64,
    delta_x: f64,
    delta_y: f64,
    modifier: bool,
) -> Result<(), JsError> {
    with_chart(handle, |instance| {
        instance.chart.handle_input(PointerInput::Wheel {
            x,
            y,
            delta_x,
            delta_y,
            modifier,
        });
    })
}

#[wasm_bindgen]
pub fn pointer_leave(handle: usize) -> Result<(), JsError> {
    with_chart(handle, |instance| {
        instance.chart.handle_input(PointerInput::Leave);
    })
}

/// Call from `requestAnimationFrame` with its timestamp. Runs every pending
/// render and due timer; returns whether the chart wants another callback.
#[wasm_bindgen]
pub fn tick(handle: usize, now: f64) -> Result<bool, JsError> {
    with_chart(handle, |instance| {
        instance.frames.set_now(now);
        loop {
            while instance.frames.has_pending() {
                for frame in instance.frames.take_pending() {
                    instance.chart.on_animation_frame(frame);
                }
            }
            if !instance.chart.poll_timers() {
                break;
            }
        }
        instance.chart.is_busy()
    })
}

/// The composed canvas as a JSON array of render commands.
#[wasm_bindgen]
pub fn render_commands(handle: usize) -> Result<String, JsError> {
    with_chart(handle, |instance| serde_json::to_string(&instance.chart.frame()))?
        .map_err(js_error)
}

/// CSS cursor for the current hover state.
#[wasm_bindgen]
pub fn cursor(handle: usize) -> Result<String, JsError> {
    with_chart(handle, |instance| instance.chart.cursor().as_css().to_string())
}

/// Chart events emitted since the last call, as a JSON array.
#[wasm_bindgen]
pub fn take_events(handle: usize) -> Result<String, JsError> {
    with_chart(handle, |instance| {
        let events = std::mem::take(&mut *instance.events.borrow_mut());
        serde_json::to_string(&events)
    })?
    .map_err(js_error)
}

#[wasm_bindgen]
pub fn set_data(handle: usize, data: &str, keep_y_position: bool) -> Result<(), JsError> {
    let nodes = parse_data(data).map_err(js_error)?;
    with_chart(handle, |instance| {
        let update = DataUpdate {
            keep_y_position,
            ..DataUpdate::default()
        };
        instance.chart.set_data(&nodes, update);
    })
}

#[wasm_bindgen]
pub fn resize(handle: usize, width: f64, height: f64) -> Result<bool, JsError> {
    with_chart(handle, |instance| instance.chart.resize(width, height))
}

#[wasm_bindgen]
pub fn set_zoom(handle: usize, start: f64, end: f64) -> Result<(), JsError> {
    with_chart(handle, |instance| instance.chart.set_zoom(start, end))?.map_err(js_error)
}

#[wasm_bindgen]
pub fn reset_view(handle: usize) -> Result<(), JsError> {
    with_chart(handle, |instance| instance.chart.reset_view())
}
