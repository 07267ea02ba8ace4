use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures returned by every engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An argument is missing, negative, zero where a positive value is required,
    /// or otherwise out of domain.
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// An inverse computation has no finite solution for the supplied values.
    #[error("Unsolvable: {0}")]
    Unsolvable(String),
}

impl EngineError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A value that is mathematically valid but semantically suspicious.
///
/// Warnings travel with the result instead of failing the calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculationWarning {
    /// The land value equals or exceeds the purchase price, leaving nothing to depreciate.
    LandValueConsumesPurchasePrice,
}

impl CalculationWarning {
    pub fn message(&self) -> &'static str {
        match self {
            CalculationWarning::LandValueConsumesPurchasePrice => {
                "land value consumes the entire purchase price; building value clamped to zero"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = EngineError::invalid("term_months", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid input: term_months: must be greater than zero"
        );
    }

    #[test]
    fn test_warning_serializes_by_name() {
        let json = serde_json::to_string(&CalculationWarning::LandValueConsumesPurchasePrice).unwrap();
        assert_eq!(json, "\"LandValueConsumesPurchasePrice\"");
    }
}
