//! Error types for the solver phases and the end-to-end flow.

use std::path::PathBuf;

use tdm_common::InternalError;
use tdm_db::DbError;
use tdm_timing::TimingError;

/// Errors raised while running the optimizer.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    /// Loading or saving resource-model data failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The timing graph could not be built.
    #[error(transparent)]
    Timing(#[from] TimingError),

    /// An output file (curve, model) could not be written.
    #[error("cannot write '{path}': {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be created.
    #[error("cannot start {threads} worker threads: {message}")]
    ThreadPool {
        /// Requested thread count.
        threads: usize,
        /// Reason reported by the pool builder.
        message: String,
    },

    /// An exported model could not be serialized.
    #[error("cannot serialize model: {0}")]
    Model(String),

    /// An external solver failed or returned an unusable solution.
    #[error("external solver: {0}")]
    External(String),

    /// A solver invariant was broken.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl SolveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SolveError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_pass_through() {
        let err: SolveError = DbError::SolutionLength {
            expected: 2,
            found: 1,
        }
        .into();
        assert_eq!(format!("{err}"), "solution has 1 values, expected 2");
    }

    #[test]
    fn internal_errors_pass_through() {
        let err: SolveError = InternalError::new("no legalization decision").into();
        assert!(matches!(err, SolveError::Internal(_)));
        assert_eq!(
            format!("{err}"),
            "internal optimizer error: no legalization decision"
        );
    }

    #[test]
    fn display_thread_pool() {
        let err = SolveError::ThreadPool {
            threads: 4,
            message: "boom".to_string(),
        };
        assert_eq!(format!("{err}"), "cannot start 4 worker threads: boom");
    }

    #[test]
    fn display_io() {
        let err = SolveError::io(
            "out/bench.curve",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(format!("{err}"), "cannot write 'out/bench.curve': denied");
    }
}
