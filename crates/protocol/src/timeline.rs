use serde::{Deserialize, Serialize};

/// One timed event of the input tree.
///
/// This is the externally supplied, read-only data the chart visualizes.
/// Children are not required to nest inside their parent's time range.
///
/// ```text
///   [{ "name": "main", "start": 0, "duration": 10, "type": "task",
///      "children": [{ "name": "parse", "start": 0, "duration": 5 }] }]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineNode {
    pub name: String,
    pub start: f64,
    pub duration: f64,
    /// Explicit color; wins over the per-type color map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Category used for coloring and style equivalence.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_type: Option<String>,
    #[serde(default)]
    pub is_third_party: bool,
    /// `Some(false)` marks the node as explicitly not highlighted (faded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_highlighted: Option<bool>,
    /// Search result flag; `Some(false)` fades the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TimelineNode>,
}

impl TimelineNode {
    pub fn new(name: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            name: name.into(),
            start,
            duration,
            color: None,
            kind: None,
            special_type: None,
            is_third_party: false,
            is_highlighted: None,
            matched: None,
            children: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_children(mut self, children: Vec<TimelineNode>) -> Self {
        self.children = children;
        self
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Duration not covered by direct children.
    pub fn self_time(&self) -> f64 {
        self.duration - self.children.iter().map(|c| c.duration).sum::<f64>()
    }

    /// Total number of nodes in this subtree, the node itself included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }
}

/// Total number of nodes in a forest.
pub fn node_count(roots: &[TimelineNode]) -> usize {
    roots.iter().map(TimelineNode::subtree_len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TimelineNode {
        TimelineNode::new("root", 0.0, 10.0).with_children(vec![
            TimelineNode::new("a", 0.0, 5.0),
            TimelineNode::new("b", 5.0, 3.0).with_children(vec![TimelineNode::new("c", 5.0, 1.0)]),
        ])
    }

    #[test]
    fn self_time_subtracts_direct_children_only() {
        assert!((sample().self_time() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn counts_whole_forest() {
        assert_eq!(sample().subtree_len(), 4);
        assert_eq!(node_count(&[sample(), TimelineNode::new("x", 20.0, 1.0)]), 5);
    }

    #[test]
    fn deserializes_camel_case_with_type_field() {
        let json = r##"[{"name":"main","start":1,"duration":2,"type":"task",
            "isHighlighted":false,"color":"#fff",
            "children":[{"name":"child","start":1,"duration":1}]}]"##;
        let nodes: Vec<TimelineNode> = serde_json::from_str(json).expect("valid tree");
        assert_eq!(nodes[0].kind.as_deref(), Some("task"));
        assert_eq!(nodes[0].is_highlighted, Some(false));
        assert_eq!(nodes[0].children.len(), 1);
        assert!(nodes[0].children[0].children.is_empty());
        assert!((nodes[0].end() - 3.0).abs() < f64::EPSILON);
    }
}
