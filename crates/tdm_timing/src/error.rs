//! Error types for timing graph construction.

/// Errors that make a timing graph unusable.
#[derive(Debug, thiserror::Error)]
pub enum TimingError {
    /// Splitting sequential and macro instances left a combinational cycle.
    #[error("timing graph still has a cycle through instance '{instance}' after breaking registers")]
    Cycle {
        /// An instance on the cycle.
        instance: String,
    },

    /// Levelization did not reach every node.
    #[error("levelization reached {reached} of {total} nodes")]
    Unlevelized {
        /// Nodes placed in a level.
        reached: usize,
        /// Nodes in the graph.
        total: usize,
    },
}
