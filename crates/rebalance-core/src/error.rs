use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which side of the box constraints makes the required total unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundSide {
    /// The lower bounds already add up to more than the target.
    Lower,
    /// The upper bounds cannot add up to the target.
    Upper,
}

impl fmt::Display for BoundSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundSide::Lower => write!(f, "sum of lower bounds exceeds"),
            BoundSide::Upper => write!(f, "sum of upper bounds falls short of"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RebalanceError {
    #[error("Length mismatch: {field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid period: elapsed ({elapsed}) must satisfy 0 < elapsed < total ({total})")]
    InvalidPeriod { elapsed: u32, total: u32 },

    #[error("Infeasible bounds: {side} the target sum ({bound_total} vs {target_sum})")]
    InfeasibleBounds {
        side: BoundSide,
        bound_total: Decimal,
        target_sum: Decimal,
    },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RebalanceError {
    fn from(e: serde_json::Error) -> Self {
        RebalanceError::SerializationError(e.to_string())
    }
}
