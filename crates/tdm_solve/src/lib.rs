//! Ratio optimization for the TDM channels of a multi-FPGA design.
//!
//! Every phase works on a [`TdmContext`], which bundles the resource model,
//! its timing graph and the worker pool. The phases run in this order:
//!
//! 1. [`solve_lagrangian`]: continuous ratios minimizing the critical delay
//!    under relaxed channel limits.
//! 2. [`legalize`]: snapping each troncon's ratios to discrete choices while
//!    fitting its limit.
//! 3. [`refine`]: swapping ratios along the critical path while the delay
//!    drops.
//!
//! [`run_flow`] chains them with checkpoints; [`LpModel`] exports the
//! problem for an external solver.
//!
//! # Usage
//!
//! ```ignore
//! use tdm_solve::{load_context, run_flow, FlowInputs};
//!
//! let mut ctx = load_context(&inputs, config, DiagnosticSink::new())?;
//! let summary = run_flow(&mut ctx, Path::new("out/bench.tdm"))?;
//! println!("critical delay {}", summary.solution.at);
//! ```
//!
//! # Architecture
//!
//! - [`context`]: shared state and thread pool
//! - [`lagrangian`]: multipliers, subproblem, dual bound
//! - [`legalize`]: per-troncon interval-partition program
//! - [`refine`]: critical-path swap search
//! - [`lp`]: model export and solution import
//! - [`flow`]: the end-to-end driver

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod flow;
pub mod lagrangian;
pub mod legalize;
pub mod lp;
pub mod refine;

#[cfg(test)]
mod test_util;

pub use context::TdmContext;
pub use error::SolveError;
pub use flow::{
    evaluate_solution, export_model, load_context, run_flow, FlowInputs, FlowPaths, FlowSummary,
    SolutionReport,
};
pub use lagrangian::{solve_lagrangian, LagData, LagOutcome, LagSolver};
pub use legalize::{legalize, LegalizeReport};
pub use lp::{import_solution, solve_external, ExternalSolver, LpModel};
pub use refine::{refine, GreedyRefiner, RefineReport, SwapHistory, SwapRecord};
