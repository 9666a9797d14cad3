//! Cluster hierarchy.
//!
//! The tree is an explicit node arena: leaves are clusters, internal nodes
//! record a merge height and the ordered leaf labels beneath them. Parent and
//! child links plus the bottom-up order are fixed at build time, so consumers
//! iterate [`ClusterHierarchy::bottom_up`] instead of recursing.

mod builder;
mod tree;


pub use builder::HierarchyBuilder;
pub use tree::{ClusterHierarchy, HierarchyNode};
