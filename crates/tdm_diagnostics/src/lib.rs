//! Diagnostic creation, severity management, and terminal rendering.
//!
//! This crate provides structured [`Diagnostic`] messages with severity levels,
//! category codes, and the subject they concern (a troncon, a net, a phase).
//! The thread-safe [`DiagnosticSink`] accumulates diagnostics while solver
//! phases run in parallel, and [`TerminalRenderer`] formats them for the
//! final summary.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
