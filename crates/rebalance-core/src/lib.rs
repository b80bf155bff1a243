pub mod error;
pub mod numeric;
pub mod types;

#[cfg(feature = "rebalance")]
pub mod rebalance;

pub use error::{BoundSide, RebalanceError};
pub use types::*;

/// Standard result type for all rebalancing operations
pub type RebalanceResult<T> = Result<T, RebalanceError>;
