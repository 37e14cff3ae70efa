use clap::Args;
use serde_json::Value;

use finplan_core::three_statement::{run_series_request, SeriesRequest};
use finplan_core::ModelConfig;

use crate::input;

/// Arguments for a multi-year projection
#[derive(Args)]
pub struct SeriesArgs {
    /// Path to JSON/YAML series request (years, capital, projections, assumptions)
    #[arg(long)]
    pub input: Option<String>,

    /// First year to generate; overrides the request
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Last year to generate (inclusive); overrides the request
    #[arg(long)]
    pub end_year: Option<i32>,
}

pub fn run_series(
    args: SeriesArgs,
    config: Option<ModelConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: SeriesRequest = input::read_request(args.input.as_deref(), "series")?;
    if let Some(config) = config {
        request.config = config;
    }
    if let Some(year) = args.start_year {
        request.start_year = year;
    }
    if let Some(year) = args.end_year {
        request.end_year = year;
    }
    if request.end_year < request.start_year {
        log::warn!(
            "end year {} precedes start year {}; nothing to generate",
            request.end_year,
            request.start_year
        );
    }
    let output = run_series_request(&request)?;
    Ok(serde_json::to_value(output)?)
}
