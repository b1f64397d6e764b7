//! Pointer state, hit-testing and event routing.
//!
//! The root [`InteractionsEngine`] owns the only mouse state. It turns raw
//! [`PointerInput`] into [`InteractionEvent`]s; each panel's
//! [`PanelInteractions`] then filters those down to the events inside its
//! band or aimed at its own regions.

mod input;
mod panel;
mod region;

pub use input::{InteractionEvent, Mouse, MouseButton, PanelEvent, PointerInput};
pub use panel::PanelInteractions;
pub use region::{Cursor, Edge, HitRegion, RegionData, RegionKind};

use flame_chart_protocol::{Point, Rect};
use tracing::trace;

use crate::render::{PanelId, ViewportControl};

/// Wheel delta that changes the zoom by 100%.
const WHEEL_ZOOM_SCALE: f64 = 1000.0;

#[derive(Debug, Default)]
pub struct InteractionsEngine {
    mouse: Option<Mouse>,
    mouse_down: Option<Mouse>,
    drag_panel: Option<PanelId>,
    drag_active: bool,
    hovered: Option<HitRegion>,
    cursor: Option<Cursor>,
    regions: Vec<HitRegion>,
    panels: Vec<PanelInteractions>,
}

impl InteractionsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_panel(&mut self, id: PanelId) {
        self.panels.push(PanelInteractions::new(id));
    }

    pub fn panels(&self) -> &[PanelInteractions] {
        &self.panels
    }

    pub fn panel(&self, id: PanelId) -> Option<&PanelInteractions> {
        self.panels.iter().find(|panel| panel.id() == id)
    }

    pub fn panel_mut(&mut self, id: PanelId) -> Option<&mut PanelInteractions> {
        self.panels.iter_mut().find(|panel| panel.id() == id)
    }

    pub(crate) fn set_panel_band(&mut self, id: PanelId, position: f64, height: f64) {
        if let Some(panel) = self.panel_mut(id) {
            panel.set_band(position, height);
        }
    }

    /// Root-owned region, in root coordinates.
    pub fn add_hit_region(
        &mut self,
        kind: RegionKind,
        data: RegionData,
        rect: Rect,
        cursor: Option<Cursor>,
    ) {
        self.regions.push(HitRegion {
            kind,
            data,
            rect,
            cursor,
            owner: None,
        });
    }

    pub fn clear_hit_regions(&mut self) {
        self.regions.clear();
    }

    pub fn mouse(&self) -> Option<Mouse> {
        self.mouse
    }

    pub fn local_mouse(&self, id: PanelId) -> Option<Mouse> {
        let panel = self.panel(id)?;
        self.mouse.map(|mouse| panel.to_local(mouse))
    }

    pub fn hovered_region(&self) -> Option<&HitRegion> {
        self.hovered.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_active
    }

    fn panel_at(&self, y: f64) -> Option<&PanelInteractions> {
        self.panels.iter().find(|panel| panel.contains_y(y))
    }

    /// Root regions first, then the regions of the panel under the mouse.
    pub fn hit_test(&self, mouse: Mouse) -> Option<HitRegion> {
        if let Some(region) = self
            .regions
            .iter()
            .find(|region| region.rect.contains(mouse.x, mouse.y))
        {
            return Some(region.clone());
        }
        let panel = self.panel_at(mouse.y)?;
        panel
            .region_at(mouse.x, mouse.y - panel.position())
            .cloned()
    }

    /// The explicitly set cursor, else the hovered region's, else default.
    pub fn cursor(&self) -> Cursor {
        self.cursor
            .or_else(|| self.hovered.as_ref().and_then(|region| region.cursor))
            .unwrap_or_default()
    }

    /// A panel may only set the cursor while the mouse is over it.
    pub fn set_cursor(&mut self, requester: Option<PanelId>, cursor: Cursor) -> bool {
        if let Some(id) = requester {
            let hovered = self
                .mouse
                .zip(self.panel(id))
                .is_some_and(|(mouse, panel)| panel.contains_y(mouse.y));
            if !hovered {
                return false;
            }
        }
        self.cursor = Some(cursor);
        true
    }

    /// Falls back to the hovered region's cursor.
    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    /// Re-run hit-testing at the current mouse position; emits `Hover` when
    /// the hovered region changed. Used after hit regions were rebuilt.
    pub fn check_region_hover(
        &mut self,
        control: &mut dyn ViewportControl,
        events: &mut Vec<InteractionEvent>,
    ) {
        let region = self.mouse.and_then(|mouse| self.hit_test(mouse));
        if region != self.hovered {
            trace!(kind = ?region.as_ref().map(|r| r.kind), "hover changed");
            self.hovered = region.clone();
            events.push(InteractionEvent::Hover {
                region,
                mouse: self.mouse,
            });
            control.partial_render(None);
        }
    }

    pub fn handle_input(
        &mut self,
        input: PointerInput,
        control: &mut dyn ViewportControl,
    ) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        match input {
            PointerInput::Move { x, y } => self.handle_move(Point::new(x, y), control, &mut events),
            PointerInput::Down { x, y, button } => {
                self.handle_down(Point::new(x, y), button, control, &mut events);
            }
            PointerInput::Up { x, y } => self.handle_up(Point::new(x, y), control, &mut events),
            PointerInput::DoubleClick { x, y } => {
                let mouse = Point::new(x, y);
                self.mouse = Some(mouse);
                self.check_region_hover(control, &mut events);
                events.push(InteractionEvent::Double {
                    region: self.hovered.clone(),
                    mouse,
                });
            }
            PointerInput::Wheel {
                x,
                y,
                delta_x,
                delta_y,
                modifier,
            } => self.handle_wheel(Point::new(x, y), delta_x, delta_y, modifier, control, &mut events),
            PointerInput::Leave => self.handle_leave(control, &mut events),
        }
        events
    }

    fn handle_move(
        &mut self,
        mouse: Mouse,
        control: &mut dyn ViewportControl,
        events: &mut Vec<InteractionEvent>,
    ) {
        if let Some(prev) = self.mouse.filter(|_| self.drag_active) {
            let delta_x = (prev.x - mouse.x) / control.view().zoom;
            let delta_y = prev.y - mouse.y;
            if delta_x != 0.0 || delta_y != 0.0 {
                events.push(InteractionEvent::ChangePosition {
                    delta_x,
                    delta_y,
                    start: self.mouse_down.unwrap_or(prev),
                    mouse,
                    panel: self.drag_panel,
                    dragging: true,
                });
            }
        }
        self.mouse = Some(mouse);
        self.check_region_hover(control, events);
        events.push(InteractionEvent::Move {
            region: self.hovered.clone(),
            mouse,
        });
        // overlays such as the tooltip follow the mouse
        control.partial_render(None);
    }

    fn handle_down(
        &mut self,
        mouse: Mouse,
        button: MouseButton,
        control: &mut dyn ViewportControl,
        events: &mut Vec<InteractionEvent>,
    ) {
        self.mouse = Some(mouse);
        self.check_region_hover(control, events);
        let region = self.hovered.clone();
        if button == MouseButton::Right {
            events.push(InteractionEvent::RightClick { region, mouse });
            return;
        }
        self.mouse_down = Some(mouse);
        self.drag_panel = self.panel_at(mouse.y).map(PanelInteractions::id);
        self.drag_active = true;
        events.push(InteractionEvent::Down { region, mouse });
    }

    fn handle_up(
        &mut self,
        mouse: Mouse,
        control: &mut dyn ViewportControl,
        events: &mut Vec<InteractionEvent>,
    ) {
        let is_click = self.drag_active && self.mouse_down == Some(mouse);
        self.drag_active = false;
        self.mouse_down = None;
        self.drag_panel = None;
        self.mouse = Some(mouse);
        self.check_region_hover(control, events);
        let region = self.hovered.clone();
        events.push(InteractionEvent::Up {
            region: region.clone(),
            mouse,
            is_click,
        });
        if is_click {
            events.push(InteractionEvent::Click { region, mouse });
        }
    }

    fn handle_wheel(
        &mut self,
        mouse: Mouse,
        delta_x: f64,
        delta_y: f64,
        modifier: bool,
        control: &mut dyn ViewportControl,
        events: &mut Vec<InteractionEvent>,
    ) {
        self.mouse = Some(mouse);
        let before = *control.view();

        if delta_x != 0.0 {
            control.try_to_change_position(delta_x / before.zoom);
        }
        if modifier {
            let initial = before.initial_zoom();
            let mut zoom_delta = delta_y / WHEEL_ZOOM_SCALE * before.zoom;
            if before.zoom - zoom_delta < initial {
                zoom_delta = before.zoom - initial;
            }
            if zoom_delta != 0.0 && control.set_zoom(before.zoom - zoom_delta) {
                // keep the time under the cursor in place
                let after = *control.view();
                let proportion = if after.width > 0.0 {
                    mouse.x / after.width
                } else {
                    0.0
                };
                let time_delta = before.real_view() - after.real_view();
                control.try_to_change_position(time_delta * proportion);
            }
        } else if delta_y != 0.0 {
            events.push(InteractionEvent::ChangePosition {
                delta_x: 0.0,
                delta_y,
                start: mouse,
                mouse,
                panel: self.panel_at(mouse.y).map(PanelInteractions::id),
                dragging: false,
            });
        }

        self.check_region_hover(control, events);
        let after = control.view();
        if after.position_x != before.position_x || after.zoom != before.zoom {
            control.render();
        }
    }

    fn handle_leave(&mut self, control: &mut dyn ViewportControl, events: &mut Vec<InteractionEvent>) {
        self.mouse = None;
        self.mouse_down = None;
        self.drag_active = false;
        self.drag_panel = None;
        if self.hovered.take().is_some() {
            events.push(InteractionEvent::Hover {
                region: None,
                mouse: None,
            });
        }
        events.push(InteractionEvent::MouseOut);
        control.partial_render(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Viewport;

    #[derive(Default)]
    struct FakeControl {
        view: Viewport,
        renders: usize,
        partials: usize,
    }

    impl FakeControl {
        fn new(width: f64, min: f64, max: f64) -> Self {
            let mut view = Viewport::new(width);
            view.set_min_max(min, max);
            view.reset();
            Self {
                view,
                ..Self::default()
            }
        }
    }

    impl ViewportControl for FakeControl {
        fn view(&self) -> &Viewport {
            &self.view
        }

        fn set_zoom(&mut self, zoom: f64) -> bool {
            self.view.set_zoom(zoom)
        }

        fn try_to_change_position(&mut self, delta: f64) -> bool {
            self.view.try_to_change_position(delta)
        }

        fn render(&mut self) {
            self.renders += 1;
        }

        fn partial_render(&mut self, _panel: Option<PanelId>) {
            self.partials += 1;
        }
    }

    fn engine() -> InteractionsEngine {
        let mut engine = InteractionsEngine::new();
        engine.add_panel(PanelId(0));
        engine.add_panel(PanelId(1));
        engine.set_panel_band(PanelId(0), 0.0, 20.0);
        engine.set_panel_band(PanelId(1), 20.0, 100.0);
        engine
    }

    fn add_node(engine: &mut InteractionsEngine, panel: u32, rect: Rect) {
        if let Some(panel) = engine.panel_mut(PanelId(panel)) {
            panel.add_hit_region(RegionKind::Node, RegionData::Empty, rect, Some(Cursor::Pointer));
        }
    }

    #[test]
    fn root_regions_win_over_panel_regions() {
        let mut engine = engine();
        add_node(&mut engine, 1, Rect::new(0.0, 0.0, 50.0, 10.0));
        assert_eq!(
            engine.hit_test(Point::new(5.0, 25.0)).and_then(|r| r.owner),
            Some(PanelId(1))
        );
        engine.add_hit_region(
            RegionKind::Node,
            RegionData::Empty,
            Rect::new(0.0, 20.0, 10.0, 10.0),
            None,
        );
        assert_eq!(engine.hit_test(Point::new(5.0, 25.0)).map(|r| r.owner), Some(None));
    }

    #[test]
    fn hover_fires_on_change_only() {
        let mut engine = engine();
        let mut control = FakeControl::new(100.0, 0.0, 100.0);
        add_node(&mut engine, 1, Rect::new(0.0, 0.0, 50.0, 10.0));

        let events = engine.handle_input(PointerInput::Move { x: 5.0, y: 25.0 }, &mut control);
        assert!(matches!(events[0], InteractionEvent::Hover { region: Some(_), .. }));
        assert!(matches!(events[1], InteractionEvent::Move { .. }));

        let events = engine.handle_input(PointerInput::Move { x: 6.0, y: 26.0 }, &mut control);
        assert_eq!(events.len(), 1);

        let events = engine.handle_input(PointerInput::Move { x: 80.0, y: 26.0 }, &mut control);
        assert!(matches!(events[0], InteractionEvent::Hover { region: None, .. }));
        assert_eq!(engine.cursor(), Cursor::Default);
    }

    #[test]
    fn click_requires_a_still_mouse() {
        let mut engine = engine();
        let mut control = FakeControl::new(100.0, 0.0, 100.0);

        engine.handle_input(
            PointerInput::Down {
                x: 10.0,
                y: 30.0,
                button: MouseButton::Left,
            },
            &mut control,
        );
        let events = engine.handle_input(PointerInput::Up { x: 10.0, y: 30.0 }, &mut control);
        assert!(matches!(events[0], InteractionEvent::Up { is_click: true, .. }));
        assert!(matches!(events[1], InteractionEvent::Click { .. }));

        engine.handle_input(
            PointerInput::Down {
                x: 10.0,
                y: 30.0,
                button: MouseButton::Left,
            },
            &mut control,
        );
        engine.handle_input(PointerInput::Move { x: 12.0, y: 30.0 }, &mut control);
        let events = engine.handle_input(PointerInput::Up { x: 12.0, y: 30.0 }, &mut control);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], InteractionEvent::Up { is_click: false, .. }));
    }

    #[test]
    fn drag_reports_time_delta_and_start_panel() {
        let mut engine = engine();
        // zoom 2px per unit
        let mut control = FakeControl::new(200.0, 0.0, 100.0);
        engine.handle_input(
            PointerInput::Down {
                x: 50.0,
                y: 10.0,
                button: MouseButton::Left,
            },
            &mut control,
        );
        let events = engine.handle_input(PointerInput::Move { x: 40.0, y: 50.0 }, &mut control);
        let change = events
            .iter()
            .find(|e| matches!(e, InteractionEvent::ChangePosition { .. }));
        assert_eq!(
            change,
            Some(&InteractionEvent::ChangePosition {
                delta_x: 5.0,
                delta_y: -40.0,
                start: Point::new(50.0, 10.0),
                mouse: Point::new(40.0, 50.0),
                panel: Some(PanelId(0)),
                dragging: true,
            })
        );
    }

    #[test]
    fn modifier_wheel_zooms_around_cursor() {
        let mut engine = engine();
        let mut control = FakeControl::new(100.0, 0.0, 100.0);
        // zoom in: negative delta
        engine.handle_input(
            PointerInput::Wheel {
                x: 50.0,
                y: 50.0,
                delta_x: 0.0,
                delta_y: -500.0,
                modifier: true,
            },
            &mut control,
        );
        assert!((control.view.zoom - 1.5).abs() < 1e-12);
        // time under the cursor stays at 50
        let time_at_cursor = control.view.position_x + control.view.pixel_to_time(50.0);
        assert!((time_at_cursor - 50.0).abs() < 1e-9, "{time_at_cursor}");
        assert_eq!(control.renders, 1);
    }

    #[test]
    fn wheel_never_zooms_out_past_initial() {
        let mut engine = engine();
        let mut control = FakeControl::new(100.0, 0.0, 100.0);
        engine.handle_input(
            PointerInput::Wheel {
                x: 10.0,
                y: 10.0,
                delta_x: 0.0,
                delta_y: 900.0,
                modifier: true,
            },
            &mut control,
        );
        assert_eq!(control.view.zoom, 1.0);
        assert_eq!(control.renders, 0);
    }

    #[test]
    fn plain_wheel_scrolls_vertically() {
        let mut engine = engine();
        let mut control = FakeControl::new(100.0, 0.0, 100.0);
        let events = engine.handle_input(
            PointerInput::Wheel {
                x: 10.0,
                y: 60.0,
                delta_x: 0.0,
                delta_y: 30.0,
                modifier: false,
            },
            &mut control,
        );
        assert_eq!(
            events[0],
            InteractionEvent::ChangePosition {
                delta_x: 0.0,
                delta_y: 30.0,
                start: Point::new(10.0, 60.0),
                mouse: Point::new(10.0, 60.0),
                panel: Some(PanelId(1)),
                dragging: false,
            }
        );
        assert_eq!(control.view.zoom, 1.0);
    }

    #[test]
    fn cursor_can_only_be_set_by_hovered_panel() {
        let mut engine = engine();
        let mut control = FakeControl::new(100.0, 0.0, 100.0);
        add_node(&mut engine, 1, Rect::new(0.0, 0.0, 50.0, 10.0));
        engine.handle_input(PointerInput::Move { x: 5.0, y: 25.0 }, &mut control);
        assert_eq!(engine.cursor(), Cursor::Pointer);

        assert!(!engine.set_cursor(Some(PanelId(0)), Cursor::Grabbing));
        assert!(engine.set_cursor(Some(PanelId(1)), Cursor::Grabbing));
        assert_eq!(engine.cursor(), Cursor::Grabbing);
        engine.clear_cursor();
        assert_eq!(engine.cursor(), Cursor::Pointer);
    }

    #[test]
    fn leave_clears_hover_and_mouse() {
        let mut engine = engine();
        let mut control = FakeControl::new(100.0, 0.0, 100.0);
        add_node(&mut engine, 1, Rect::new(0.0, 0.0, 50.0, 10.0));
        engine.handle_input(PointerInput::Move { x: 5.0, y: 25.0 }, &mut control);
        let events = engine.handle_input(PointerInput::Leave, &mut control);
        assert_eq!(
            events,
            vec![
                InteractionEvent::Hover {
                    region: None,
                    mouse: None
                },
                InteractionEvent::MouseOut
            ]
        );
        assert_eq!(engine.mouse(), None);
    }
}
