use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RebalanceError;
use crate::RebalanceResult;

/// Allocation values (targets, shares, bounds). Unit is up to the caller:
/// percentages summing to 100 or proportions summing to 1, never mixed.
pub type Share = Decimal;

/// The allocation horizon, counted in discrete units (weeks, sprints, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub elapsed: u32,
    pub total: u32,
}

impl Period {
    /// Build a period, rejecting anything outside `0 < elapsed < total`.
    pub fn new(elapsed: u32, total: u32) -> RebalanceResult<Self> {
        if elapsed == 0 || elapsed >= total {
            return Err(RebalanceError::InvalidPeriod { elapsed, total });
        }
        Ok(Self { elapsed, total })
    }

    pub fn remaining(&self) -> u32 {
        self.total - self.elapsed
    }

    /// elapsed / remaining: how hard the remaining period has to lean
    /// against the drift accumulated so far.
    pub fn catch_up_factor(&self) -> Decimal {
        Decimal::from(self.elapsed) / Decimal::from(self.remaining())
    }

    /// elapsed / total
    pub fn elapsed_weight(&self) -> Decimal {
        Decimal::from(self.elapsed) / Decimal::from(self.total)
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> RebalanceResult<ComputationOutput<T>> {
    Ok(ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions)?,
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    })
}
