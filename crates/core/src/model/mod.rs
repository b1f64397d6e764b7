pub mod cluster;
pub mod flat;

pub use cluster::{
    Cluster, ClusterParams, MetaCluster, clusterize, default_equivalence, meta_clusterize,
    reclusterize,
};
pub use flat::{FlatNode, FlatTree, MinMax, NodeSource, flatten, min_max};
