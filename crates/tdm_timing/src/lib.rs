//! Timing graph of the TDM ratio optimizer.
//!
//! The graph models every design instance as a node and every driver-to-sink
//! connection of a TdmNet as an edge. Inter-device edges are delayed by
//! `tdm_coef · ratio`; intra-device edges carry gate and wire delay.
//!
//! # Usage
//!
//! ```ignore
//! use tdm_timing::TimingGraph;
//!
//! let mut graph = TimingGraph::build(&db, &config.timing)?;
//! db.set_value(var, 16.0);
//! graph.update_timing(&db);
//! let path = graph.critical_path(&sink);
//! ```
//!
//! # Architecture
//!
//! - [`graph`]: node/edge arena and timing state vectors
//! - [`build`]: construction, cycle breaking, levelization
//! - [`sta`]: level-parallel propagation, slack, critical path
//! - [`report`]: structural summary

#![warn(missing_docs)]

pub mod build;
pub mod error;
pub mod graph;
pub mod ids;
pub mod report;
pub mod sta;

#[cfg(test)]
mod test_util;

pub use error::TimingError;
pub use graph::{NodeRole, TimingEdge, TimingGraph, TimingNode};
pub use ids::{EdgeId, NodeId};
pub use report::{DelayQuantiles, GraphSummary};
