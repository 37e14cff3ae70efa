use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Instant;

use finplan_core::diagnostics::CascadeRequest;
use finplan_core::types::with_metadata;
use finplan_core::ModelConfig;

use crate::input;

/// Arguments for the unit cost cascade
#[derive(Args)]
pub struct CascadeArgs {
    /// Path to JSON/YAML request: { catalog, sku, quantity?, digital_mix_fraction, config? }
    #[arg(long)]
    pub input: Option<String>,

    /// SKU to trace; overrides the request
    #[arg(long)]
    pub sku: Option<String>,

    /// Units in the transaction; overrides the request
    #[arg(long)]
    pub quantity: Option<Decimal>,

    /// Share of the payment routed through the digital channel (0 to 1); overrides the request
    #[arg(long)]
    pub digital_mix: Option<Decimal>,
}

pub fn run_cascade(
    args: CascadeArgs,
    config: Option<ModelConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut request: CascadeRequest = input::read_request(args.input.as_deref(), "cascade")?;
    if let Some(config) = config {
        request.config = config.cascade;
    }
    if let Some(sku) = args.sku {
        request.sku = sku;
    }
    if let Some(quantity) = args.quantity {
        request.quantity = quantity;
    }
    if let Some(mix) = args.digital_mix {
        request.digital_mix_fraction = mix;
    }

    let cascade = request.trace()?;
    let warnings = cascade.alerts.clone();
    let elapsed = start.elapsed().as_micros() as u64;
    let output = with_metadata(
        "Unit cost cascade: gross price through VAT, channel fees, payout, direct costs and taxes",
        &request.config,
        warnings,
        elapsed,
        cascade,
    );
    Ok(serde_json::to_value(output)?)
}
