use tracing::debug;

use super::engine::RenderEngine;
use super::time_grid::TimeGrid;
use super::viewport::Viewport;
use crate::settings::Settings;

/// One horizontal strip of the composite, rendered offscreen.
///
/// A panel never owns the time viewport: the composite pushes it down with
/// [`PanelEngine::sync_view`], and plugins ask the composite to move it.
#[derive(Debug)]
pub struct PanelEngine {
    pub base: RenderEngine,
    position: f64,
    collapsed: bool,
    flexible: bool,
    children: Vec<PanelEngine>,
}

impl PanelEngine {
    pub fn new(base: RenderEngine) -> Self {
        Self {
            base,
            position: 0.0,
            collapsed: false,
            flexible: false,
            children: Vec::new(),
        }
    }

    /// Top edge inside the composite.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    pub fn height(&self) -> f64 {
        self.base.height()
    }

    pub fn width(&self) -> f64 {
        self.base.width()
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn is_flexible(&self) -> bool {
        self.flexible
    }

    /// Opt into the composite's flexible sizing pool.
    pub fn set_flexible(&mut self) {
        self.flexible = true;
    }

    pub fn collapse(&mut self) {
        debug!("collapse panel");
        self.collapsed = true;
        self.base.canvas_mut().clear();
    }

    pub fn expand(&mut self) {
        self.collapsed = false;
    }

    /// Returns whether the height changed. Children follow the width only.
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        for child in &mut self.children {
            let child_height = child.height();
            child.resize(width, child_height);
        }
        self.base.resize(width, height)
    }

    /// A nested offscreen engine sharing this panel's data bounds.
    pub fn make_child(&mut self, height: f64) -> usize {
        let child = PanelEngine::new(self.base.spawn(height));
        self.children.push(child);
        self.children.len() - 1
    }

    pub fn child(&self, index: usize) -> Option<&PanelEngine> {
        self.children.get(index)
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut PanelEngine> {
        self.children.get_mut(index)
    }

    /// Copy a child's canvas into this panel at `(x, y)`.
    pub fn draw_child(&mut self, index: usize, x: f64, y: f64) {
        if let Some(child) = self.children.get(index) {
            let id = format!("child-{index}");
            self.base.canvas.draw_canvas(child.base.canvas(), x, y, &id);
        }
    }

    pub fn set_min_max(&mut self, min: f64, max: f64) {
        self.base.set_min_max(min, max);
        for child in &mut self.children {
            child.set_min_max(min, max);
        }
    }

    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        let applied = self.base.set_zoom(zoom);
        for child in &mut self.children {
            child.set_zoom(zoom);
        }
        applied
    }

    pub fn set_position_x(&mut self, x: f64) -> f64 {
        for child in &mut self.children {
            child.set_position_x(x);
        }
        self.base.set_position_x(x)
    }

    /// Copy zoom, position and bounds from the authoritative viewport.
    pub(crate) fn sync_view(&mut self, view: &Viewport) {
        self.base.set_view(*view);
        for child in &mut self.children {
            child.sync_view(view);
        }
    }

    pub(crate) fn set_time_grid(&mut self, grid: TimeGrid) {
        self.base.grid = grid;
    }

    pub fn set_settings(&mut self, settings: &Settings) {
        self.base.set_settings(settings);
        for child in &mut self.children {
            child.set_settings(settings);
        }
    }

    pub fn clear(&mut self) {
        self.base.clear();
    }

    /// Grid lines, then whatever the plugin queued.
    pub fn standard_render(&mut self) {
        let grid = self.base.grid;
        let height = self.height();
        grid.render_lines(&mut self.base, 0.0, height);
        self.base.flush_queues();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::render::canvas::FixedWidthMetrics;
    use flame_chart_protocol::RenderCommand;

    fn panel(height: f64) -> PanelEngine {
        let base = RenderEngine::new(
            200.0,
            height,
            1.0,
            &Settings::default(),
            Rc::new(FixedWidthMetrics::default()),
        );
        PanelEngine::new(base)
    }

    #[test]
    fn children_follow_view_changes() {
        let mut panel = panel(40.0);
        let child = panel.make_child(10.0);
        panel.set_min_max(0.0, 50.0);
        assert!(panel.set_zoom(4.0));
        panel.set_position_x(12.0);

        let child = panel.child(child).unwrap();
        assert_eq!(child.base.view().max, 50.0);
        assert_eq!(child.base.zoom(), 4.0);
        assert_eq!(child.base.position_x(), 12.0);
        assert_eq!(child.height(), 10.0);
    }

    #[test]
    fn resize_keeps_child_heights() {
        let mut panel = panel(40.0);
        let child = panel.make_child(10.0);
        assert!(panel.resize(300.0, 60.0));
        let child = panel.child(child).unwrap();
        assert_eq!(child.width(), 300.0);
        assert_eq!(child.height(), 10.0);
    }

    #[test]
    fn collapse_clears_canvas() {
        let mut panel = panel(40.0);
        panel.clear();
        assert!(!panel.base.canvas().is_empty());
        panel.collapse();
        assert!(panel.is_collapsed());
        assert!(panel.base.canvas().is_empty());
        panel.expand();
        assert!(!panel.is_collapsed());
    }

    #[test]
    fn standard_render_flushes_queues() {
        let mut panel = panel(40.0);
        panel.base.add_rect_to_render_queue("red", 1.0, 2.0, 3.0);
        panel.standard_render();
        assert!(!panel.base.has_queued());
        assert!(panel
            .base
            .canvas()
            .commands()
            .iter()
            .any(|cmd| matches!(cmd, RenderCommand::FillRect { rect, .. } if rect.x == 1.0)));
    }
}
