use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CreError {
    /// True for errors raised while a run was in progress, as opposed to
    /// inputs rejected up front or storage failures.
    pub fn is_computation_error(&self) -> bool {
        matches!(
            self,
            CreError::FinancialImpossibility(_)
                | CreError::ConvergenceFailure { .. }
                | CreError::InsufficientData(_)
                | CreError::DivisionByZero { .. }
        )
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        CreError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// A value that left the representable decimal range mid-run.
    pub(crate) fn overflow(context: &str) -> Self {
        CreError::FinancialImpossibility(format!("{context} is outside the representable range"))
    }
}

impl From<serde_json::Error> for CreError {
    fn from(e: serde_json::Error) -> Self {
        CreError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for CreError {
    fn from(e: std::io::Error) -> Self {
        CreError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(!CreError::invalid("building_area", "must be positive").is_computation_error());
        assert!(CreError::DivisionByZero {
            context: "DSCR".into()
        }
        .is_computation_error());
        assert!(CreError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: 10,
            last_delta: Decimal::ONE,
        }
        .is_computation_error());
        assert!(!CreError::Io("disk full".into()).is_computation_error());
        assert!(CreError::overflow("PMT factor").is_computation_error());
    }

    #[test]
    fn test_display_invalid_input() {
        let e = CreError::invalid("hold_period_years", "Hold period must be at least 1 year");
        assert_eq!(
            e.to_string(),
            "Invalid input: hold_period_years — Hold period must be at least 1 year"
        );
    }
}
