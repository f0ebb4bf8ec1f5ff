// Package model provides the centroid table, assignment vectors and the
// persistable cluster result.

pub mod assignments;
pub mod centroids;
pub mod result;

#[cfg(test)]
mod centroids_test;
#[cfg(test)]
mod result_test;

pub use assignments::{Assignments, IndexWidth};
pub use centroids::CentroidTable;
pub use result::ClusterResult;
