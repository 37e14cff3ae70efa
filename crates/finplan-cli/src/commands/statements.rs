use clap::Args;
use serde_json::Value;

use finplan_core::three_statement::{generate_request, StatementsRequest};
use finplan_core::ModelConfig;

use crate::input;

/// Arguments for a single-year three-statement model
#[derive(Args)]
pub struct StatementsArgs {
    /// Path to JSON/YAML request: { inputs, opening?, config? }
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_statements(
    args: StatementsArgs,
    config: Option<ModelConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: StatementsRequest = input::read_request(args.input.as_deref(), "statements")?;
    if let Some(config) = config {
        request.config = config;
    }
    let output = generate_request(&request)?;
    Ok(serde_json::to_value(output)?)
}
