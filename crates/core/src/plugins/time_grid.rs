use super::{Plugin, PluginContext};
use crate::settings::Settings;

/// A ruler panel: tick lines plus time labels along the top.
#[derive(Debug, Clone)]
pub struct TimeGridPlugin {
    height: f64,
}

impl TimeGridPlugin {
    pub fn new(settings: &Settings) -> Self {
        Self {
            height: settings.styles.time_grid.height,
        }
    }
}

impl Default for TimeGridPlugin {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Plugin for TimeGridPlugin {
    fn name(&self) -> &str {
        "time-grid"
    }

    fn height(&self) -> Option<f64> {
        Some(self.height)
    }

    fn set_settings(&mut self, settings: &Settings, _ctx: &mut PluginContext<'_>) {
        self.height = settings.styles.time_grid.height;
    }

    fn render(&mut self, ctx: &mut PluginContext<'_>) -> bool {
        let engine = &mut ctx.engine.base;
        let grid = *engine.time_grid();
        let height = engine.height();
        grid.render_lines(engine, 0.0, height);
        grid.render_times(engine);
        true
    }
}
