use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Instant;

use finplan_core::types::with_metadata;
use finplan_core::working_capital::CccInputs;
use finplan_core::ModelConfig;

use crate::input;

/// Arguments for the cash conversion cycle
#[derive(Args)]
pub struct CccArgs {
    /// Path to JSON/YAML file with balances and daily flows
    #[arg(long)]
    pub input: Option<String>,

    /// Average daily sales
    #[arg(long)]
    pub daily_sales: Option<Decimal>,

    /// Accounts receivable balance
    #[arg(long)]
    pub receivables: Option<Decimal>,

    /// Accounts payable balance
    #[arg(long)]
    pub payables: Option<Decimal>,

    /// Average daily cost of sales
    #[arg(long)]
    pub daily_cost_of_sales: Option<Decimal>,
}

pub fn run_ccc(args: CccArgs, config: Option<ModelConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let mut inputs: CccInputs = match (
        args.daily_sales,
        args.receivables,
        args.payables,
        args.daily_cost_of_sales,
    ) {
        (Some(daily_sales), Some(receivables), Some(payables), Some(daily_cost_of_sales)) => {
            CccInputs {
                daily_sales,
                receivables,
                payables,
                daily_cost_of_sales,
                bands: Default::default(),
            }
        }
        (None, None, None, None) => input::read_request(args.input.as_deref(), "ccc")?,
        _ => {
            return Err(
                "--daily-sales, --receivables, --payables and --daily-cost-of-sales must be given together"
                    .into(),
            )
        }
    };
    if let Some(config) = config {
        inputs.bands = config.ccc;
    }

    let cycle = inputs.compute();
    let elapsed = start.elapsed().as_micros() as u64;
    let output = with_metadata(
        "Cash conversion cycle: DSO - DPO (no inventory days)",
        &inputs.bands,
        Vec::new(),
        elapsed,
        cycle,
    );
    Ok(serde_json::to_value(output)?)
}
