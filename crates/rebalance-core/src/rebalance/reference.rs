use crate::numeric::{ensure_len, ensure_non_empty};
use crate::types::{Period, Share};
use crate::RebalanceResult;

/// Unconstrained catch-up targets for the remaining period.
///
/// For each category, `r_i = (elapsed / remaining) * (t_i - cs_i) + t_i`:
/// the value that, averaged with the current share (weighted by `elapsed`)
/// over the whole horizon, lands exactly on the original target. No bounds
/// are applied, so entries can be negative or exceed the allocation total.
pub fn compute_reference(
    original_targets: &[Share],
    current_shares: &[Share],
    elapsed: u32,
    total: u32,
) -> RebalanceResult<Vec<Share>> {
    ensure_non_empty("original_targets", original_targets)?;
    ensure_len("current_shares", current_shares, original_targets.len())?;
    let period = Period::new(elapsed, total)?;

    let factor = period.catch_up_factor();
    Ok(original_targets
        .iter()
        .zip(current_shares.iter())
        .map(|(t, cs)| factor * (*t - *cs) + *t)
        .collect())
}
