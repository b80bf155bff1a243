use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::RebalanceError;
use crate::types::Share;
use crate::RebalanceResult;

/// Default convergence tolerance for the sum constraint (relative).
pub const DEFAULT_TOLERANCE: Decimal = dec!(0.000000001);

/// `max(lo, min(hi, v))`
pub fn clip(value: Decimal, lo: Decimal, hi: Decimal) -> Decimal {
    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}

/// Sum of squared component differences. References far outside the box
/// can push this past the 96-bit mantissa, which is reported rather than
/// panicking.
pub fn squared_distance(a: &[Decimal], b: &[Decimal]) -> RebalanceResult<Decimal> {
    let mut total = Decimal::ZERO;
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        total = x
            .checked_sub(*y)
            .and_then(|d| d.checked_mul(d))
            .and_then(|sq| total.checked_add(sq))
            .ok_or_else(|| RebalanceError::InvalidInput {
                field: format!("reference[{i}]"),
                reason: format!("squared distance between {x} and {y} overflows"),
            })?;
    }
    Ok(total)
}

/// Broadcast a single bound value to every category.
pub fn uniform(n: usize, value: Share) -> Vec<Share> {
    vec![value; n]
}

/// Absolute tolerance for a sum constraint: `tolerance * max(1, |target|)`.
pub fn absolute_tolerance(tolerance: Decimal, target_sum: Decimal) -> Decimal {
    tolerance * target_sum.abs().max(Decimal::ONE)
}

/// Fail with `LengthMismatch` unless `values` has exactly `expected` entries.
pub fn ensure_len(field: &str, values: &[Decimal], expected: usize) -> RebalanceResult<()> {
    if values.len() != expected {
        return Err(RebalanceError::LengthMismatch {
            field: field.into(),
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

pub fn ensure_non_empty(field: &str, values: &[Decimal]) -> RebalanceResult<()> {
    if values.is_empty() {
        return Err(RebalanceError::InsufficientData(format!(
            "{field} must contain at least one category"
        )));
    }
    Ok(())
}
