use napi::Result as NapiResult;
use napi_derive::napi;

use finplan_core::diagnostics::{AlertInputs, CascadeRequest};
use finplan_core::three_statement::{
    generate_request, run_series_request, SeriesRequest, StatementsRequest,
};
use finplan_core::working_capital::CccInputs;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_statements(input_json: String) -> NapiResult<String> {
    let request: StatementsRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = generate_request(&request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn run_series(input_json: String) -> NapiResult<String> {
    let request: SeriesRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = run_series_request(&request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Working capital
// ---------------------------------------------------------------------------

#[napi]
pub fn cash_conversion(input_json: String) -> NapiResult<String> {
    let inputs: CccInputs = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    serde_json::to_string(&inputs.compute()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Returns the alert list, most severe first.
#[napi]
pub fn evaluate_alerts(input_json: String) -> NapiResult<String> {
    let inputs: AlertInputs = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    serde_json::to_string(&inputs.evaluate()).map_err(to_napi_error)
}

#[napi]
pub fn trace_unit_cascade(input_json: String) -> NapiResult<String> {
    let request: CascadeRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let cascade = request.trace().map_err(to_napi_error)?;
    serde_json::to_string(&cascade).map_err(to_napi_error)
}
