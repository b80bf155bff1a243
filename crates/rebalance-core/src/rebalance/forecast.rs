use rust_decimal::Decimal;

use crate::numeric::{ensure_len, ensure_non_empty};
use crate::types::{Period, Share};
use crate::RebalanceResult;

/// Expected end-of-horizon share per category if `new_targets` are hit
/// exactly for the remaining period:
/// `(cs_i * elapsed + nt_i * (total - elapsed)) / total`.
pub fn final_share(
    new_targets: &[Share],
    current_shares: &[Share],
    elapsed: u32,
    total: u32,
) -> RebalanceResult<Vec<Share>> {
    ensure_non_empty("new_targets", new_targets)?;
    ensure_len("current_shares", current_shares, new_targets.len())?;
    let period = Period::new(elapsed, total)?;

    let done = Decimal::from(period.elapsed);
    let left = Decimal::from(period.remaining());
    let horizon = Decimal::from(period.total);
    Ok(new_targets
        .iter()
        .zip(current_shares.iter())
        .map(|(nt, cs)| (*cs * done + *nt * left) / horizon)
        .collect())
}

/// Signed miss per category, `final_i - target_i`.
pub fn tracking_error(
    final_shares: &[Share],
    original_targets: &[Share],
) -> RebalanceResult<Vec<Decimal>> {
    ensure_len("original_targets", original_targets, final_shares.len())?;
    Ok(final_shares
        .iter()
        .zip(original_targets.iter())
        .map(|(f, t)| *f - *t)
        .collect())
}
