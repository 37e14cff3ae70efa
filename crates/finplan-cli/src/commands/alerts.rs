use clap::Args;
use serde_json::Value;
use std::time::Instant;

use finplan_core::diagnostics::{AlertInputs, Severity};
use finplan_core::types::with_metadata;
use finplan_core::ModelConfig;

use crate::input;

/// Arguments for financial-health alerts
#[derive(Args)]
pub struct AlertsArgs {
    /// Path to JSON/YAML file: { unit_economics?, balance_sheet?, kpis?, consecutive_negative_cash_months? }
    #[arg(long)]
    pub input: Option<String>,

    /// Fail the command when any CRITICAL alert fires
    #[arg(long)]
    pub fail_on_critical: bool,
}

pub fn run_alerts(
    args: AlertsArgs,
    config: Option<ModelConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut inputs: AlertInputs = input::read_request(args.input.as_deref(), "alerts")?;
    if let Some(config) = config {
        inputs.benchmarks = config.alerts;
    }

    let alerts = inputs.evaluate();
    let critical = alerts
        .iter()
        .filter(|a| a.severity == Severity::Critical)
        .count();
    log::info!("{} alert(s), {critical} critical", alerts.len());

    if args.fail_on_critical && critical > 0 {
        return Err(format!("{critical} critical alert(s) fired").into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let output = with_metadata(
        "Threshold-based financial health rules, sorted by severity",
        &inputs.benchmarks,
        Vec::new(),
        elapsed,
        alerts,
    );
    Ok(serde_json::to_value(output)?)
}
