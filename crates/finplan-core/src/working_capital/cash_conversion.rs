use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::CccBands;
use crate::numeric::{format_days, safe_divide};
use crate::types::{Days, Money};

#[cfg(feature = "three_statement")]
use crate::config::ModelConfig;
#[cfg(feature = "three_statement")]
use crate::three_statement::ThreeStatementModel;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Qualitative reading of the cash conversion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CccBand {
    /// Negative cycle: suppliers finance operations
    Favorable,
    Balanced,
    /// Long positive cycle: operations tie up cash
    CashIntensive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashConversionCycle {
    /// Days Sales Outstanding = receivables / daily sales
    pub dso: Days,
    /// Days Payable Outstanding = payables / daily cost of sales
    pub dpo: Days,
    /// DSO - DPO (no inventory in a services business)
    pub ccc: Days,
    pub band: CccBand,
    pub description: String,
}

/// Balances and daily flows for a standalone cycle computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CccInputs {
    pub daily_sales: Money,
    pub receivables: Money,
    pub payables: Money,
    pub daily_cost_of_sales: Money,
    #[serde(default)]
    pub bands: CccBands,
}

impl CccInputs {
    pub fn compute(&self) -> CashConversionCycle {
        compute_ccc(
            self.daily_sales,
            self.receivables,
            self.payables,
            self.daily_cost_of_sales,
            &self.bands,
        )
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive DSO, DPO and the cash conversion cycle. A zero daily base yields a
/// zero day count for that side.
pub fn compute_ccc(
    daily_sales: Money,
    receivables: Money,
    payables: Money,
    daily_cost_of_sales: Money,
    bands: &CccBands,
) -> CashConversionCycle {
    let dso = safe_divide(receivables, daily_sales);
    let dpo = safe_divide(payables, daily_cost_of_sales);
    let ccc = dso - dpo;

    let band = if ccc < Decimal::ZERO {
        CccBand::Favorable
    } else if ccc > bands.cash_intensive_above_days {
        CccBand::CashIntensive
    } else {
        CccBand::Balanced
    };

    let description = match band {
        CccBand::Favorable => format!(
            "Favorable: cash cycle of {}; suppliers finance operations",
            format_days(ccc)
        ),
        CccBand::Balanced => format!(
            "Balanced: cash is tied up for {} between paying suppliers and collecting from customers",
            format_days(ccc)
        ),
        CccBand::CashIntensive => format!(
            "Cash-intensive: {} cycle exceeds {}; collections lag supplier payments",
            format_days(ccc),
            format_days(bands.cash_intensive_above_days)
        ),
    };

    CashConversionCycle {
        dso,
        dpo,
        ccc,
        band,
        description,
    }
}

/// Cash conversion cycle of a generated year, using the same day-count
/// basis the generator used to derive its receivables and payables.
#[cfg(feature = "three_statement")]
pub fn cash_conversion_for(model: &ThreeStatementModel, config: &ModelConfig) -> CashConversionCycle {
    let is = &model.income_statement;
    let bs = &model.balance_sheet;
    compute_ccc(
        config.day_count.daily(is.gross_revenue),
        bs.assets.current.receivables,
        bs.liabilities.payables,
        config.day_count.daily(is.cost_of_sales),
        &config.ccc,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
