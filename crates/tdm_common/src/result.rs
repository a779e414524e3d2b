//! The error raised when a solver phase breaks one of its own invariants.

/// Result of an internal step whose failure would be an optimizer bug.
///
/// Infeasible channels, disconnected timing and similar input conditions
/// never take this path: they are emitted as diagnostics and the phase
/// carries on. `Err` is reserved for states the algorithms guarantee cannot
/// occur, such as a legalization walk that meets a position the dynamic
/// program never decided.
pub type TdmResult<T> = Result<T, InternalError>;

/// A broken optimizer invariant.
#[derive(Debug, thiserror::Error)]
#[error("internal optimizer error: {message}")]
pub struct InternalError {
    /// What was expected to hold.
    pub message: String,
}

impl InternalError {
    /// Creates an internal error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_decision(decisions: &[Option<usize>]) -> TdmResult<usize> {
        decisions
            .first()
            .copied()
            .flatten()
            .ok_or_else(|| InternalError::new("memo table not filled"))
    }

    #[test]
    fn display_names_the_invariant() {
        let err = InternalError::new("memo table not filled");
        assert_eq!(
            err.to_string(),
            "internal optimizer error: memo table not filled"
        );
    }

    #[test]
    fn missing_entry_becomes_error() {
        assert_eq!(first_decision(&[Some(3)]).unwrap(), 3);
        let err = first_decision(&[None]).unwrap_err();
        assert_eq!(err.message, "memo table not filled");
    }
}
