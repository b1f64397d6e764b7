//! Zoom-dependent level-of-detail grouping of flat nodes.
//!
//! ```text
//!   FlatTree ──meta_clusterize──▶ MetaCluster[] ──clusterize──▶ Cluster[]
//!   (per dataset)                  (per dataset)    (per view)    │
//!                                                                 ▼
//!                                            reclusterize (every pan/zoom tick)
//! ```
//!
//! A meta-cluster is a maximal run of same-level, style-equivalent nodes.
//! Clusters slice meta-clusters: neighbouring nodes narrower than
//! `min_block_size` pixels and closer than `stick_distance` pixels collapse
//! into one drawable block. Clusters never cross a meta-cluster boundary.

use std::rc::Rc;

use flame_chart_protocol::SharedStr;

use super::flat::FlatNode;

/// Pixel thresholds driving the merge rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Maximum gap, in pixels, across which two slivers still stick together.
    pub stick_distance: f64,
    /// Nodes at least this wide, in pixels, are always their own block.
    pub min_block_size: f64,
}

impl ClusterParams {
    /// Clusters narrower than this (in pixels) cannot split any further.
    pub fn min_cluster_size(&self) -> f64 {
        self.min_block_size * 2.0 + self.stick_distance
    }
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            stick_distance: 0.25,
            min_block_size: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetaCluster {
    pub nodes: Vec<Rc<FlatNode>>,
}

/// One drawable block: a contiguous, time-ordered run of a meta-cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub kind: Option<SharedStr>,
    pub color: Option<SharedStr>,
    pub special_type: Option<SharedStr>,
    pub level: usize,
    pub is_third_party: bool,
    pub is_highlighted: bool,
    pub is_inactive: bool,
    pub nodes: Vec<Rc<FlatNode>>,
}

impl Cluster {
    /// Build from a non-empty run; style fields come from the first node.
    fn from_nodes(nodes: Vec<Rc<FlatNode>>) -> Option<Self> {
        let first = nodes.first()?;
        let last = nodes.last()?;
        let duration = last.source.start + last.source.duration - first.source.start;
        let source = &first.source;
        Some(Self {
            start: source.start,
            end: source.start + duration,
            duration,
            kind: source.kind.clone(),
            color: source.color.clone(),
            special_type: source.special_type.clone(),
            level: first.level,
            is_third_party: source.is_third_party,
            is_highlighted: source.is_highlighted.unwrap_or(false),
            is_inactive: source.matched == Some(false) || source.is_highlighted == Some(false),
            nodes,
        })
    }

    pub fn is_single(&self) -> bool {
        self.nodes.len() == 1
    }
}

/// Same color and same type.
pub fn default_equivalence(a: &FlatNode, b: &FlatNode) -> bool {
    a.source.color == b.source.color && a.source.kind == b.source.kind
}

/// Split the flat list into maximal runs of same-level, equivalent neighbours.
///
/// Single O(n) pass in input order; never reorders nodes.
pub fn meta_clusterize<F>(flat: &[Rc<FlatNode>], equivalent: F) -> Vec<MetaCluster>
where
    F: Fn(&FlatNode, &FlatNode) -> bool,
{
    let mut out: Vec<MetaCluster> = Vec::new();
    for node in flat {
        let joins = out
            .last()
            .and_then(|cluster| cluster.nodes.last())
            .is_some_and(|prev| prev.level == node.level && equivalent(&**prev, &**node));
        match out.last_mut() {
            Some(cluster) if joins => cluster.nodes.push(Rc::clone(node)),
            _ => out.push(MetaCluster {
                nodes: vec![Rc::clone(node)],
            }),
        }
    }
    out
}

/// Overlap test between `[start, end]` and the view window.
///
/// The second clause also admits spans strictly inside the window.
fn overlaps_view(start: f64, end: f64, view_start: f64, view_end: f64) -> bool {
    (start < view_end && end > view_start) || (start > view_start && end < view_end)
}

fn clusterize_nodes(
    nodes: &[Rc<FlatNode>],
    zoom: f64,
    view_start: f64,
    view_end: f64,
    params: &ClusterParams,
    out: &mut Vec<Cluster>,
) {
    let mut run: Vec<Rc<FlatNode>> = Vec::new();
    let mut prev: Option<&Rc<FlatNode>> = None;

    for node in nodes {
        if !overlaps_view(node.source.start, node.end, view_start, view_end) {
            continue;
        }
        let sticks = prev.is_some_and(|prev| {
            let gap = (node.source.start - (prev.source.start + prev.source.duration)) * zoom;
            gap < params.stick_distance
                && node.source.duration * zoom < params.min_block_size
                && prev.source.duration * zoom < params.min_block_size
        });
        if !sticks && !run.is_empty() {
            out.extend(Cluster::from_nodes(std::mem::take(&mut run)));
        }
        run.push(Rc::clone(node));
        prev = Some(node);
    }
    out.extend(Cluster::from_nodes(run));
}

/// Slice every meta-cluster into clusters for the given zoom and view window.
pub fn clusterize(
    meta_clusters: &[MetaCluster],
    zoom: f64,
    view_start: f64,
    view_end: f64,
    params: &ClusterParams,
) -> Vec<Cluster> {
    let mut out = Vec::new();
    for meta in meta_clusters {
        clusterize_nodes(&meta.nodes, zoom, view_start, view_end, params, &mut out);
    }
    out
}

/// Incrementally refine clusters after a pan or zoom.
///
/// Clusters outside the window are dropped; clusters already below
/// [`ClusterParams::min_cluster_size`] pixels are kept as they are; the rest
/// are re-clusterized from their own nodes. Cost is bounded by the clusters
/// near the viewport, not by the dataset.
pub fn reclusterize(
    clusters: &[Cluster],
    zoom: f64,
    view_start: f64,
    view_end: f64,
    params: &ClusterParams,
) -> Vec<Cluster> {
    let min_size = params.min_cluster_size();
    let mut out = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        if !overlaps_view(cluster.start, cluster.end, view_start, view_end) {
            continue;
        }
        if cluster.duration * zoom <= min_size {
            out.push(cluster.clone());
        } else {
            clusterize_nodes(&cluster.nodes, zoom, view_start, view_end, params, &mut out);
        }
    }
    out
}
