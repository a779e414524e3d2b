//! How bad a reported condition is for the produced solution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a condition was recovered from or spoils the solution.
///
/// A `Warning` covers repairs the optimizer made on its own (a widened
/// choice set, an unabsorbed multiplier decrease, a troncon left at its
/// continuous values). An `Error` means the written solution violates a
/// channel limit. `Error` orders above `Warning`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Severity {
    /// A condition the optimizer recovered from or left in place.
    Warning,
    /// A condition that invalidates the produced solution.
    Error,
}

impl Severity {
    /// Returns `true` if this severity is [`Error`](Severity::Error).
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// SGR color code for terminal output.
    pub(crate) fn ansi_color(self) -> &'static str {
        match self {
            Severity::Warning => "33",
            Severity::Error => "31",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}
