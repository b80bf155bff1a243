//! Rebalancing of proportional allocation targets after partial progress.
//!
//! `reference` computes the unconstrained catch-up targets for the remaining
//! period, `projection` pulls them back onto the box bounds and the fixed
//! total, `forecast` reports where each category is expected to finish, and
//! `plan` chains the three behind a single serde input.

pub mod forecast;
pub mod plan;
pub mod projection;
pub mod reference;
