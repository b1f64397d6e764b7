use flame_chart_protocol::{Point, Rect};

use super::input::{InteractionEvent, Mouse, PanelEvent};
use super::region::{Cursor, HitRegion, RegionData, RegionKind};
use crate::render::PanelId;

/// Hit regions and the vertical band of one panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelInteractions {
    id: PanelId,
    position: f64,
    height: f64,
    regions: Vec<HitRegion>,
}

impl PanelInteractions {
    pub fn new(id: PanelId) -> Self {
        Self {
            id,
            position: 0.0,
            height: 0.0,
            regions: Vec::new(),
        }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub(crate) fn set_band(&mut self, position: f64, height: f64) {
        self.position = position;
        self.height = height;
    }

    /// Inclusive on both edges.
    pub fn contains_y(&self, y: f64) -> bool {
        self.position <= y && y <= self.position + self.height
    }

    pub fn to_local(&self, mouse: Mouse) -> Mouse {
        Point::new(mouse.x, mouse.y - self.position)
    }

    /// `rect` is panel-local.
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
            owner: Some(self.id),
        });
    }

    pub fn clear_hit_regions(&mut self) {
        self.regions.clear();
    }

    pub fn hit_regions(&self) -> &[HitRegion] {
        &self.regions
    }

    /// First region containing the panel-local point.
    pub fn region_at(&self, x: f64, local_y: f64) -> Option<&HitRegion> {
        self.regions.iter().find(|region| region.rect.contains(x, local_y))
    }

    /// Translate a root event into this panel's view of it, or `None` if
    /// the event is not for this panel.
    pub fn route(&self, event: &InteractionEvent) -> Option<PanelEvent> {
        let pointed = |region: &Option<HitRegion>, mouse: &Mouse| {
            let ours = region.as_ref().is_none_or(|r| r.is_owned_by(self.id));
            ours && self.contains_y(mouse.y)
        };
        match event {
            InteractionEvent::Down { region, mouse } if pointed(region, mouse) => {
                Some(PanelEvent::Down {
                    region: region.clone(),
                    mouse: self.to_local(*mouse),
                })
            }
            InteractionEvent::Up {
                region,
                mouse,
                is_click,
            } if pointed(region, mouse) => Some(PanelEvent::Up {
                region: region.clone(),
                mouse: self.to_local(*mouse),
                is_click: *is_click,
            }),
            InteractionEvent::Move { region, mouse } if pointed(region, mouse) => {
                Some(PanelEvent::Move {
                    region: region.clone(),
                    mouse: self.to_local(*mouse),
                })
            }
            InteractionEvent::Click { region, mouse } if pointed(region, mouse) => {
                Some(PanelEvent::Click {
                    region: region.clone(),
                    mouse: self.to_local(*mouse),
                })
            }
            InteractionEvent::Double { region, mouse } if pointed(region, mouse) => {
                Some(PanelEvent::Double {
                    region: region.clone(),
                    mouse: self.to_local(*mouse),
                })
            }
            InteractionEvent::RightClick { region, mouse } if pointed(region, mouse) => {
                Some(PanelEvent::RightClick {
                    region: region.clone(),
                    mouse: self.to_local(*mouse),
                })
            }
            InteractionEvent::Hover { region, mouse } => {
                let ours = region.as_ref().is_none_or(|r| r.is_owned_by(self.id));
                ours.then(|| PanelEvent::Hover {
                    region: region.clone(),
                    mouse: mouse.map(|m| self.to_local(m)),
                })
            }
            InteractionEvent::ChangePosition {
                delta_x,
                delta_y,
                panel,
                dragging,
                ..
            } if *panel == Some(self.id) => Some(PanelEvent::ChangePosition {
                delta_x: *delta_x,
                delta_y: *delta_y,
                dragging: *dragging,
            }),
            InteractionEvent::MouseOut => Some(PanelEvent::MouseOut),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(id: u32, position: f64, height: f64) -> PanelInteractions {
        let mut panel = PanelInteractions::new(PanelId(id));
        panel.set_band(position, height);
        panel
    }

    fn region(owner: u32) -> HitRegion {
        HitRegion {
            kind: RegionKind::Node,
            data: RegionData::Empty,
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            cursor: None,
            owner: Some(PanelId(owner)),
        }
    }

    #[test]
    fn pointer_events_need_band_and_ownership() {
        let panel = band(1, 100.0, 50.0);
        let inside = Point::new(5.0, 120.0);
        let outside = Point::new(5.0, 20.0);

        let down = InteractionEvent::Down {
            region: None,
            mouse: inside,
        };
        assert_eq!(
            panel.route(&down),
            Some(PanelEvent::Down {
                region: None,
                mouse: Point::new(5.0, 20.0)
            })
        );

        let elsewhere = InteractionEvent::Down {
            region: None,
            mouse: outside,
        };
        assert_eq!(panel.route(&elsewhere), None);

        let foreign = InteractionEvent::Click {
            region: Some(region(2)),
            mouse: inside,
        };
        assert_eq!(panel.route(&foreign), None);
    }

    #[test]
    fn hover_ignores_band() {
        let panel = band(1, 100.0, 50.0);
        let own = InteractionEvent::Hover {
            region: Some(region(1)),
            mouse: Some(Point::new(0.0, 0.0)),
        };
        assert!(panel.route(&own).is_some());

        let cleared = InteractionEvent::Hover {
            region: None,
            mouse: None,
        };
        assert_eq!(
            panel.route(&cleared),
            Some(PanelEvent::Hover {
                region: None,
                mouse: None
            })
        );

        let foreign = InteractionEvent::Hover {
            region: Some(region(3)),
            mouse: None,
        };
        assert_eq!(panel.route(&foreign), None);
    }

    #[test]
    fn change_position_goes_to_drag_start_panel_only() {
        let panel = band(1, 0.0, 50.0);
        let event = |owner| InteractionEvent::ChangePosition {
            delta_x: 1.0,
            delta_y: 2.0,
            start: Point::new(0.0, 10.0),
            mouse: Point::new(0.0, 200.0),
            panel: Some(PanelId(owner)),
            dragging: true,
        };
        assert!(panel.route(&event(1)).is_some());
        assert_eq!(panel.route(&event(2)), None);
    }

    #[test]
    fn region_lookup_uses_local_coordinates() {
        let mut panel = band(4, 30.0, 40.0);
        panel.add_hit_region(
            RegionKind::Cluster,
            RegionData::Empty,
            Rect::new(10.0, 0.0, 20.0, 16.0),
            Some(Cursor::Pointer),
        );
        assert!(panel.region_at(15.0, 8.0).is_some());
        assert!(panel.region_at(15.0, 38.0).is_none());
        assert_eq!(panel.hit_regions()[0].owner, Some(PanelId(4)));
        panel.clear_hit_regions();
        assert!(panel.hit_regions().is_empty());
    }
}
