use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::RebalanceError;
use crate::numeric::{ensure_len, ensure_non_empty, squared_distance, DEFAULT_TOLERANCE};
use crate::rebalance::forecast::{final_share, tracking_error};
use crate::rebalance::projection::{project_detailed, BoundStatus};
use crate::rebalance::reference::compute_reference;
use crate::types::{with_metadata, ComputationOutput, Period, Share};
use crate::RebalanceResult;

/// Final shares missing their target by more than this fraction of the
/// allocation total are flagged.
const FINAL_GAP_WARNING: Decimal = dec!(0.01);

/// Input slack when checking that targets and current shares add up.
const TOTAL_MISMATCH_SLACK: Decimal = dec!(0.0001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything needed to rebalance a set of allocation targets mid-horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceInput {
    /// Display names (default `category_1`, `category_2`, ...).
    pub category_names: Option<Vec<String>>,
    /// Long-run target share per category.
    pub original_targets: Vec<Share>,
    /// Share achieved so far over the elapsed part of the horizon.
    pub current_shares: Vec<Share>,
    /// Allocation units already consumed.
    pub elapsed: u32,
    /// Allocation units in the whole horizon.
    pub total: u32,
    pub lower_bounds: Vec<Share>,
    pub upper_bounds: Vec<Share>,
    /// Required total of the new targets (100 for percentages, 1 for proportions).
    pub target_sum: Share,
    /// Relative tolerance on the total (default 1e-9).
    pub tolerance: Option<Decimal>,
}

/// One category's path from original target to projected finish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAllocation {
    pub name: String,
    pub original_target: Share,
    pub current_share: Share,
    /// Unconstrained value needed for the remaining period.
    pub reference_target: Share,
    /// Feasible value for the remaining period.
    pub new_target: Share,
    /// End-of-horizon share if `new_target` is hit.
    pub projected_final_share: Share,
    /// `projected_final_share - original_target`.
    pub final_gap: Decimal,
    pub bound_status: BoundStatus,
}

/// Output of a rebalance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceOutput {
    pub categories: Vec<CategoryAllocation>,
    pub new_target_total: Share,
    pub projected_final_total: Share,
    /// Largest absolute `final_gap`; zero when no bound binds.
    pub max_abs_final_gap: Decimal,
    /// Squared distance between reference and new targets.
    pub sum_squared_adjustment: Decimal,
    pub lambda: Decimal,
    pub iterations: u32,
    pub remaining_periods: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute feasible targets for the rest of the horizon and the shares they
/// are expected to finish on.
pub fn rebalance_targets(
    input: &RebalanceInput,
) -> RebalanceResult<ComputationOutput<RebalanceOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let n = input.original_targets.len();
    validate_input(input, n)?;
    let period = Period::new(input.elapsed, input.total)?;
    let tolerance = input.tolerance.unwrap_or(DEFAULT_TOLERANCE);
    let names = category_names(input, n);

    let reference = compute_reference(
        &input.original_targets,
        &input.current_shares,
        period.elapsed,
        period.total,
    )?;
    let projection = project_detailed(
        &reference,
        &input.lower_bounds,
        &input.upper_bounds,
        input.target_sum,
        tolerance,
    )?;
    let finals = final_share(
        &projection.targets,
        &input.current_shares,
        period.elapsed,
        period.total,
    )?;
    let gaps = tracking_error(&finals, &input.original_targets)?;

    // --- Input sanity warnings ---
    let target_total: Decimal = input.original_targets.iter().sum();
    if (target_total - input.target_sum).abs() > TOTAL_MISMATCH_SLACK {
        warnings.push(format!(
            "Original targets sum to {} but target_sum is {}",
            target_total, input.target_sum
        ));
    }
    let current_total: Decimal = input.current_shares.iter().sum();
    if (current_total - input.target_sum).abs() > TOTAL_MISMATCH_SLACK {
        warnings.push(format!(
            "Current shares sum to {} but target_sum is {}",
            current_total, input.target_sum
        ));
    }

    let categories: Vec<CategoryAllocation> = (0..n)
        .map(|i| CategoryAllocation {
            name: names[i].clone(),
            original_target: input.original_targets[i],
            current_share: input.current_shares[i],
            reference_target: reference[i],
            new_target: projection.targets[i],
            projected_final_share: finals[i],
            final_gap: gaps[i],
            bound_status: projection.bound_status[i],
        })
        .collect();

    // --- Per-category warnings ---
    let gap_limit = FINAL_GAP_WARNING * input.target_sum.abs();
    for (i, c) in categories.iter().enumerate() {
        if c.reference_target < input.lower_bounds[i] {
            warnings.push(format!(
                "{} needs {:.4} but is held at its lower bound {:.4}",
                c.name, c.reference_target, c.new_target
            ));
        } else if c.reference_target > input.upper_bounds[i] {
            warnings.push(format!(
                "{} needs {:.4} but is held at its upper bound {:.4}",
                c.name, c.reference_target, c.new_target
            ));
        }
        if c.final_gap.abs() > gap_limit {
            warnings.push(format!(
                "{} is projected to finish at {:.4} against a target of {:.4}",
                c.name, c.projected_final_share, c.original_target
            ));
        }
    }

    let max_abs_final_gap = gaps
        .iter()
        .map(|g| g.abs())
        .fold(Decimal::ZERO, Decimal::max);

    let output = RebalanceOutput {
        new_target_total: projection.targets.iter().sum(),
        projected_final_total: finals.iter().sum(),
        max_abs_final_gap,
        sum_squared_adjustment: squared_distance(&projection.targets, &reference)?,
        lambda: projection.lambda,
        iterations: projection.iterations,
        remaining_periods: period.remaining(),
        categories,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Catch-up reference targets projected onto bounded fixed-sum allocations",
        &serde_json::json!({
            "n_categories": n,
            "elapsed": period.elapsed,
            "total": period.total,
            "target_sum": input.target_sum.to_string(),
            "tolerance": tolerance.to_string(),
        }),
        warnings,
        elapsed,
        output,
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn category_names(input: &RebalanceInput, n: usize) -> Vec<String> {
    match input.category_names {
        Some(ref names) => names.clone(),
        None => (1..=n).map(|i| format!("category_{i}")).collect(),
    }
}

fn validate_input(input: &RebalanceInput, n: usize) -> RebalanceResult<()> {
    ensure_non_empty("original_targets", &input.original_targets)?;
    ensure_len("current_shares", &input.current_shares, n)?;
    ensure_len("lower_bounds", &input.lower_bounds, n)?;
    ensure_len("upper_bounds", &input.upper_bounds, n)?;

    if let Some(ref names) = input.category_names {
        if names.len() != n {
            return Err(RebalanceError::LengthMismatch {
                field: "category_names".into(),
                expected: n,
                actual: names.len(),
            });
        }
    }

    Ok(())
}
