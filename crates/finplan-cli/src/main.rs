mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::alerts::AlertsArgs;
use commands::cascade::CascadeArgs;
use commands::ccc::CccArgs;
use commands::series::SeriesArgs;
use commands::statements::StatementsArgs;

/// Three-statement planning engine
#[derive(Parser)]
#[command(
    name = "finplan",
    version,
    about = "Three-statement financial planning with triangulation checks",
    long_about = "Generates interconnected income statements, balance sheets and cash flow \
                  statements with decimal precision, runs multi-year projections, and \
                  diagnoses working capital, financial health and unit economics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Model configuration file (JSON or YAML); overrides any config embedded in the input
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the three statements for a single year
    Statements(StatementsArgs),
    /// Run a multi-year projection with carry-forward balances
    Series(SeriesArgs),
    /// Compute DSO, DPO and the cash conversion cycle
    Ccc(CccArgs),
    /// Evaluate financial-health alerts
    Alerts(AlertsArgs),
    /// Trace the unit cost cascade of one SKU
    Cascade(CascadeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map(input::config::read_config).transpose() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Statements(args) => commands::statements::run_statements(args, config),
        Commands::Series(args) => commands::series::run_series(args, config),
        Commands::Ccc(args) => commands::ccc::run_ccc(args, config),
        Commands::Alerts(args) => commands::alerts::run_alerts(args, config),
        Commands::Cascade(args) => commands::cascade::run_cascade(args, config),
        Commands::Version => {
            println!("finplan {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
