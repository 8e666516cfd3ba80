//! Assessment error types.
//!
//! Every failure the engine can report synchronously lives here so callers can
//! match on the variant instead of inspecting message text.

use thiserror::Error;

/// Errors raised by grading, sessions and the progression machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssessmentError {
    /// A value was non-finite, negative where a non-negative value is required,
    /// or a required estimate was missing.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The ground-truth collection holds fewer gradable items than a unit needs.
    #[error("insufficient data: unit needs {required} items, only {available} available")]
    InsufficientData { required: usize, available: usize },

    /// The ground-truth collection has not been loaded.
    #[error("ground-truth data unavailable: {0}")]
    DataUnavailable(String),

    /// The progress store could not be read or written.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// An average was requested over zero recorded results.
    #[error("cannot aggregate an empty result set")]
    AggregationOnEmptySet,

    /// The requested transition is not allowed from the current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// No curriculum with this id exists in the catalog.
    #[error("unknown curriculum: {0}")]
    UnknownCurriculum(String),
}

impl AssessmentError {
    /// Returns `true` for failures caused by a collaborator rather than the caller.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            AssessmentError::DataUnavailable(_) | AssessmentError::PersistenceUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AssessmentError>;

/// Reject NaN and infinities.
pub(crate) fn ensure_finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AssessmentError::InvalidInput(format!(
            "{what} must be a finite number, got {value}"
        )))
    }
}

/// Reject NaN, infinities and negative values.
pub(crate) fn ensure_non_negative(value: f64, what: &str) -> Result<f64> {
    let value = ensure_finite(value, what)?;
    if value < 0.0 {
        return Err(AssessmentError::InvalidInput(format!(
            "{what} must not be negative, got {value}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_classification() {
        assert!(AssessmentError::DataUnavailable("offline".into()).is_external());
        assert!(AssessmentError::PersistenceUnavailable("disk".into()).is_external());
        assert!(!AssessmentError::AggregationOnEmptySet.is_external());
    }

    #[test]
    fn finite_checks() {
        assert!(ensure_finite(f64::NAN, "estimate").is_err());
        assert!(ensure_finite(f64::INFINITY, "estimate").is_err());
        assert_eq!(ensure_non_negative(0.0, "estimate").unwrap(), 0.0);
        let err = ensure_non_negative(-1.0, "estimate").unwrap_err();
        assert!(err.to_string().contains("must not be negative"));
    }
}
