use std::rc::Rc;

use flame_chart_protocol::Rect;
use serde::Serialize;

use crate::model::{Cluster, FlatNode};
use crate::render::PanelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
    Grab,
    Grabbing,
    EwResize,
    Text,
}

impl Cursor {
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Pointer => "pointer",
            Self::Grab => "grab",
            Self::Grabbing => "grabbing",
            Self::EwResize => "ew-resize",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Cluster,
    Node,
    TimeframeArea,
    TimeframeKnob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// What a hit region points at.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionData {
    Empty,
    Cluster(Rc<Cluster>),
    Node(Rc<FlatNode>),
    Edge(Edge),
}

/// A rectangle with an interactive payload, rebuilt on every render pass.
///
/// `rect` is in the owner's coordinates: panel-local for panel regions,
/// root coordinates when `owner` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRegion {
    pub kind: RegionKind,
    pub data: RegionData,
    pub rect: Rect,
    pub cursor: Option<Cursor>,
    pub owner: Option<PanelId>,
}

impl HitRegion {
    pub fn cluster(&self) -> Option<&Rc<Cluster>> {
        match &self.data {
            RegionData::Cluster(cluster) => Some(cluster),
            _ => None,
        }
    }

    pub fn is_owned_by(&self, panel: PanelId) -> bool {
        self.owner == Some(panel)
    }
}
