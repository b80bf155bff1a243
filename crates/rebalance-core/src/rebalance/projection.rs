use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{BoundSide, RebalanceError};
use crate::numeric::{
    absolute_tolerance, clip, ensure_len, ensure_non_empty, squared_distance, DEFAULT_TOLERANCE,
};
use crate::types::{with_metadata, ComputationOutput, Share};
use crate::RebalanceResult;

/// Bisection budget on the multiplier. Far more than a 128-bit decimal
/// bracket needs to shrink below any sensible tolerance.
pub const MAX_BISECTION_ITERATIONS: u32 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a projected coordinate ended up relative to its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundStatus {
    Free,
    AtLower,
    AtUpper,
}

/// Projected vector plus the solver state that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub targets: Vec<Share>,
    /// Lagrange multiplier of the sum constraint: `x_i = clip(r_i - lambda)`.
    pub lambda: Decimal,
    /// Bisection steps taken (0 for a degenerate bracket).
    pub iterations: u32,
    /// Whether the closed-form free-set solve replaced the bisection result.
    pub refined: bool,
    pub bound_status: Vec<BoundStatus>,
}

/// Input to a standalone bounded projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionInput {
    /// Unconstrained vector to pull onto the feasible set.
    pub reference: Vec<Share>,
    pub lower_bounds: Vec<Share>,
    pub upper_bounds: Vec<Share>,
    /// Required total (100 for percentages, 1 for proportions).
    pub target_sum: Share,
    /// Relative tolerance on the total (default 1e-9).
    pub tolerance: Option<Decimal>,
}

/// Output of a standalone bounded projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub new_targets: Vec<Share>,
    pub total: Share,
    pub lambda: Decimal,
    pub iterations: u32,
    pub refined: bool,
    pub bound_status: Vec<BoundStatus>,
    /// Sum of squared adjustments away from the reference.
    pub squared_distance: Decimal,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Closest point (least squares) to `reference` inside the box
/// `[lower, upper]` whose components add up to `target_sum`.
pub fn project(
    reference: &[Share],
    lower: &[Share],
    upper: &[Share],
    target_sum: Share,
    tolerance: Decimal,
) -> RebalanceResult<Vec<Share>> {
    Ok(project_detailed(reference, lower, upper, target_sum, tolerance)?.targets)
}

/// `S(lambda) = sum_i clip(r_i - lambda, lower_i, upper_i)`.
///
/// Continuous, piecewise linear and non-increasing in `lambda`; the
/// projection is the point where it crosses the target sum.
pub fn allocation_sum(
    reference: &[Share],
    lower: &[Share],
    upper: &[Share],
    lambda: Decimal,
) -> Decimal {
    reference
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .map(|(r, (lo, hi))| clip(*r - lambda, *lo, *hi))
        .sum()
}

/// Same as [`project`], also reporting the multiplier, iteration count and
/// which coordinates ended up pinned to a bound.
pub fn project_detailed(
    reference: &[Share],
    lower: &[Share],
    upper: &[Share],
    target_sum: Share,
    tolerance: Decimal,
) -> RebalanceResult<Projection> {
    validate_bounds(reference, lower, upper, tolerance)?;

    let lower_total: Decimal = lower.iter().sum();
    let upper_total: Decimal = upper.iter().sum();
    if lower_total > target_sum {
        return Err(RebalanceError::InfeasibleBounds {
            side: BoundSide::Lower,
            bound_total: lower_total,
            target_sum,
        });
    }
    if upper_total < target_sum {
        return Err(RebalanceError::InfeasibleBounds {
            side: BoundSide::Upper,
            bound_total: upper_total,
            target_sum,
        });
    }

    // Bracket: every coordinate at its upper bound at `lo`, at its lower
    // bound at `hi`.
    let lo = reference
        .iter()
        .zip(upper.iter())
        .map(|(r, u)| *r - *u)
        .fold(Decimal::MAX, Decimal::min);
    let hi = reference
        .iter()
        .zip(lower.iter())
        .map(|(r, l)| *r - *l)
        .fold(Decimal::MIN, Decimal::max);

    // Degenerate bracket: the box has a single point with the right total.
    if lower_total == target_sum {
        return Ok(pinned(lower, hi, BoundStatus::AtLower));
    }
    if upper_total == target_sum {
        return Ok(pinned(upper, lo, BoundStatus::AtUpper));
    }

    let tol = absolute_tolerance(tolerance, target_sum);
    let (mut lambda, delta, iterations) = bisect(
        reference,
        lower,
        upper,
        target_sum,
        tol,
        (lo, hi),
        MAX_BISECTION_ITERATIONS,
    )?;

    let mut targets = allocate(reference, lower, upper, lambda);
    let mut refined = false;
    if let Some((exact, candidate)) = refine_free_set(reference, lower, upper, &targets, target_sum)
    {
        let candidate_delta = candidate.iter().sum::<Decimal>() - target_sum;
        if candidate_delta.abs() <= delta.abs() {
            lambda = exact;
            targets = candidate;
            refined = true;
        }
    }

    let bound_status = classify(&targets, lower, upper);
    Ok(Projection {
        targets,
        lambda,
        iterations,
        refined,
        bound_status,
    })
}

/// Project an allocation and wrap the result in the standard envelope.
pub fn project_allocation(
    input: &ProjectionInput,
) -> RebalanceResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let tolerance = input.tolerance.unwrap_or(DEFAULT_TOLERANCE);
    let projection = project_detailed(
        &input.reference,
        &input.lower_bounds,
        &input.upper_bounds,
        input.target_sum,
        tolerance,
    )?;

    for (i, status) in projection.bound_status.iter().enumerate() {
        let r = input.reference[i];
        match status {
            BoundStatus::AtLower if r < input.lower_bounds[i] => warnings.push(format!(
                "Category {} clamped at lower bound {} (reference {})",
                i + 1,
                input.lower_bounds[i],
                r
            )),
            BoundStatus::AtUpper if r > input.upper_bounds[i] => warnings.push(format!(
                "Category {} clamped at upper bound {} (reference {})",
                i + 1,
                input.upper_bounds[i],
                r
            )),
            _ => {}
        }
    }

    let output = ProjectionOutput {
        total: projection.targets.iter().sum(),
        squared_distance: squared_distance(&projection.targets, &input.reference)?,
        new_targets: projection.targets,
        lambda: projection.lambda,
        iterations: projection.iterations,
        refined: projection.refined,
        bound_status: projection.bound_status,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Bounded sum-constrained least-squares projection (Lagrangian bisection)",
        &serde_json::json!({
            "n_categories": input.reference.len(),
            "target_sum": input.target_sum.to_string(),
            "tolerance": tolerance.to_string(),
            "max_iterations": MAX_BISECTION_ITERATIONS,
        }),
        warnings,
        elapsed,
        output,
    )
}

// ---------------------------------------------------------------------------
// Solver internals
// ---------------------------------------------------------------------------

/// Halve `(lo, hi)` until `S(lambda)` is within `tol` of the target.
/// Returns `(lambda, S(lambda) - target_sum, steps)`.
fn bisect(
    reference: &[Share],
    lower: &[Share],
    upper: &[Share],
    target_sum: Share,
    tol: Decimal,
    (mut lo, mut hi): (Decimal, Decimal),
    max_iterations: u32,
) -> RebalanceResult<(Decimal, Decimal, u32)> {
    let mut lambda = (lo + hi) / dec!(2);
    let mut delta = allocation_sum(reference, lower, upper, lambda) - target_sum;
    let mut iterations = 0u32;

    while delta.abs() > tol {
        if iterations == max_iterations {
            return Err(RebalanceError::ConvergenceFailure {
                function: "bounded projection bisection".into(),
                iterations,
                last_delta: delta,
            });
        }
        if delta > Decimal::ZERO {
            lo = lambda;
        } else {
            hi = lambda;
        }
        lambda = (lo + hi) / dec!(2);
        delta = allocation_sum(reference, lower, upper, lambda) - target_sum;
        iterations += 1;
    }

    Ok((lambda, delta, iterations))
}

fn allocate(reference: &[Share], lower: &[Share], upper: &[Share], lambda: Decimal) -> Vec<Share> {
    reference
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .map(|(r, (lo, hi))| clip(*r - lambda, *lo, *hi))
        .collect()
}

/// Re-solve lambda in closed form over the coordinates strictly inside
/// their box. `S` is linear with slope `-|free|` there, so the crossing is
/// exact as long as no coordinate changes side.
fn refine_free_set(
    reference: &[Share],
    lower: &[Share],
    upper: &[Share],
    targets: &[Share],
    target_sum: Share,
) -> Option<(Decimal, Vec<Share>)> {
    let mut free_count = 0i64;
    let mut free_reference = Decimal::ZERO;
    let mut fixed_total = Decimal::ZERO;
    for i in 0..targets.len() {
        if targets[i] > lower[i] && targets[i] < upper[i] {
            free_count += 1;
            free_reference += reference[i];
        } else {
            fixed_total += targets[i];
        }
    }
    if free_count == 0 {
        return None;
    }

    let exact = (free_reference - (target_sum - fixed_total)) / Decimal::from(free_count);
    Some((exact, allocate(reference, lower, upper, exact)))
}

fn classify(targets: &[Share], lower: &[Share], upper: &[Share]) -> Vec<BoundStatus> {
    targets
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .map(|(x, (lo, hi))| {
            if x <= lo {
                BoundStatus::AtLower
            } else if x >= hi {
                BoundStatus::AtUpper
            } else {
                BoundStatus::Free
            }
        })
        .collect()
}

fn pinned(bounds: &[Share], lambda: Decimal, status: BoundStatus) -> Projection {
    Projection {
        targets: bounds.to_vec(),
        lambda,
        iterations: 0,
        refined: false,
        bound_status: vec![status; bounds.len()],
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_bounds(
    reference: &[Share],
    lower: &[Share],
    upper: &[Share],
    tolerance: Decimal,
) -> RebalanceResult<()> {
    ensure_non_empty("reference", reference)?;
    ensure_len("lower_bounds", lower, reference.len())?;
    ensure_len("upper_bounds", upper, reference.len())?;

    for (i, (lo, hi)) in lower.iter().zip(upper.iter()).enumerate() {
        if lo > hi {
            return Err(RebalanceError::InvalidInput {
                field: format!("bounds[{i}]"),
                reason: format!("lower bound {lo} exceeds upper bound {hi}"),
            });
        }
    }

    if tolerance <= Decimal::ZERO {
        return Err(RebalanceError::InvalidInput {
            field: "tolerance".into(),
            reason: "Tolerance must be positive".into(),
        });
    }

    Ok(())
}
