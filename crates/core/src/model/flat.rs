use std::rc::{Rc, Weak};

use flame_chart_protocol::{SharedStr, TimelineNode};
use serde::Serialize;

/// The node's own fields, detached from its subtree.
///
/// Children are summarized (count and summed duration) so that tooltips can
/// report self time without holding on to the input tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSource {
    pub name: SharedStr,
    pub start: f64,
    pub duration: f64,
    pub color: Option<SharedStr>,
    #[serde(rename = "type")]
    pub kind: Option<SharedStr>,
    pub special_type: Option<SharedStr>,
    pub is_third_party: bool,
    pub is_highlighted: Option<bool>,
    pub matched: Option<bool>,
    pub child_count: usize,
    pub children_duration: f64,
}

impl NodeSource {
    fn from_node(node: &TimelineNode) -> Self {
        Self {
            name: SharedStr::from(node.name.as_str()),
            start: node.start,
            duration: node.duration,
            color: node.color.as_deref().map(SharedStr::from),
            kind: node.kind.as_deref().map(SharedStr::from),
            special_type: node.special_type.as_deref().map(SharedStr::from),
            is_third_party: node.is_third_party,
            is_highlighted: node.is_highlighted,
            matched: node.matched,
            child_count: node.children.len(),
            children_duration: node.children.iter().map(|c| c.duration).sum(),
        }
    }

    pub fn self_time(&self) -> f64 {
        self.duration - self.children_duration
    }
}

/// One input node placed in the flattened list.
#[derive(Debug)]
pub struct FlatNode {
    pub source: NodeSource,
    /// `source.start + source.duration`.
    pub end: f64,
    /// Back-reference only; the flat list owns every node.
    pub parent: Option<Weak<FlatNode>>,
    /// Depth in the input tree, roots are level 0.
    pub level: usize,
    /// Depth-first pre-order visit index. Stable identity, not a sort key.
    pub index: usize,
}

impl FlatNode {
    pub fn parent(&self) -> Option<Rc<FlatNode>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn start(&self) -> f64 {
        self.source.start
    }

    pub fn duration(&self) -> f64 {
        self.source.duration
    }
}

// Two flat nodes are the same node when they were produced by the same visit.
impl PartialEq for FlatNode {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

/// Flattened nodes ordered by `(level, start)`.
pub type FlatTree = Vec<Rc<FlatNode>>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

/// Flatten a forest into one list sorted by level, then by start time.
///
/// Every node is visited exactly once, depth-first pre-order; `index` records
/// the visit order and breaks ties between equal `(level, start)` keys.
pub fn flatten(roots: &[TimelineNode]) -> FlatTree {
    let mut out: FlatTree = Vec::with_capacity(flame_chart_protocol::node_count(roots));
    // (node, parent, level), pushed in reverse so pops come out in order.
    let mut stack: Vec<(&TimelineNode, Option<Weak<FlatNode>>, usize)> =
        roots.iter().rev().map(|n| (n, None, 0)).collect();

    while let Some((node, parent, level)) = stack.pop() {
        let flat = Rc::new(FlatNode {
            source: NodeSource::from_node(node),
            end: node.start + node.duration,
            parent,
            level,
            index: out.len(),
        });
        let weak = Rc::downgrade(&flat);
        stack.extend(
            node.children
                .iter()
                .rev()
                .map(|child| (child, Some(weak.clone()), level + 1)),
        );
        out.push(flat);
    }

    out.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| a.source.start.total_cmp(&b.source.start))
    });
    out
}

/// Time bounds of a flat list: earliest start and latest end. `{0, 0}` when empty.
pub fn min_max(nodes: &[Rc<FlatNode>]) -> MinMax {
    if nodes.is_empty() {
        return MinMax::default();
    }
    nodes.iter().fold(
        MinMax {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        },
        |acc, node| MinMax {
            min: acc.min.min(node.source.start),
            max: acc.max.max(node.end),
        },
    )
}
