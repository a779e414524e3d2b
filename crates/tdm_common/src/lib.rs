//! Shared foundational types used across the TDM ratio optimizer.
//!
//! This crate provides the internal-error result type shared by every phase
//! and the floating-point comparison helpers used wherever arrival times or
//! multiplier sums are compared.

#![warn(missing_docs)]

pub mod float;
pub mod result;

pub use float::{nearly_equal, TIME_EPSILON};
pub use result::{InternalError, TdmResult};
