//! Error types for loading inputs and checkpoints into the resource model.

use std::path::PathBuf;

/// Errors raised while reading the design, the device map, the placement,
/// or a solution checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A file could not be read or written.
    #[error("cannot access '{path}': {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The design netlist is not valid JSON for the expected schema.
    #[error("malformed design netlist: {0}")]
    Design(String),

    /// A line of a whitespace-separated input file could not be parsed.
    #[error("{file}:{line}: {message}")]
    Parse {
        /// The file (or `<input>` for in-memory content).
        file: String,
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// An input refers to an instance the design does not contain.
    #[error("unknown instance '{0}'")]
    UnknownInstance(String),

    /// Two design instances share a name.
    #[error("duplicate instance '{0}'")]
    DuplicateInstance(String),

    /// An input file does not cover every instance of the design.
    #[error("no {what} given for instance '{name}'")]
    MissingInstance {
        /// Which input is incomplete (e.g., "device", "placement").
        what: &'static str,
        /// The first instance without an entry.
        name: String,
    },

    /// A checkpoint does not hold one value per ratio variable.
    #[error("solution has {found} values, expected {expected}")]
    SolutionLength {
        /// Number of ratio variables.
        expected: usize,
        /// Number of values found.
        found: usize,
    },
}
