use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rebalance_core::rebalance::{forecast, plan, projection, reference};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
struct PeriodVectors {
    values: Vec<Decimal>,
    current_shares: Vec<Decimal>,
    elapsed: u32,
    total: u32,
}

#[derive(Serialize)]
struct VectorOutput {
    values: Vec<Decimal>,
}

// ---------------------------------------------------------------------------
// Rebalancing
// ---------------------------------------------------------------------------

#[napi]
pub fn rebalance_targets(input_json: String) -> NapiResult<String> {
    let input: plan::RebalanceInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = plan::rebalance_targets(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn project_allocation(input_json: String) -> NapiResult<String> {
    let input: projection::ProjectionInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = projection::project_allocation(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// `values` are the original targets.
#[napi]
pub fn compute_reference(input_json: String) -> NapiResult<String> {
    let input: PeriodVectors = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let values = reference::compute_reference(
        &input.values,
        &input.current_shares,
        input.elapsed,
        input.total,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&VectorOutput { values }).map_err(to_napi_error)
}

/// `values` are the new targets for the remaining period.
#[napi]
pub fn final_share(input_json: String) -> NapiResult<String> {
    let input: PeriodVectors = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let values = forecast::final_share(
        &input.values,
        &input.current_shares,
        input.elapsed,
        input.total,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&VectorOutput { values }).map_err(to_napi_error)
}
