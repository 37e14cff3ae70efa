use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FinPlanError;
use crate::types::{Days, Money, Rate};
use crate::FinPlanResult;

// ---------------------------------------------------------------------------
// Day-count convention
// ---------------------------------------------------------------------------

/// Day-count basis used to turn annual flows into daily flows.
///
/// One value drives both the receivable/payable derivation in the generator
/// and the DSO/DPO derivation in the cash conversion analyzer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayCount {
    /// Banker's year: 12 months of 30 days.
    #[default]
    Banker360,
    Actual365,
}

impl DayCount {
    pub fn days_in_year(self) -> Days {
        match self {
            DayCount::Banker360 => dec!(360),
            DayCount::Actual365 => dec!(365),
        }
    }

    /// Annual amount expressed per day.
    pub fn daily(self, annual: Money) -> Money {
        annual / self.days_in_year()
    }

    /// Year-end balance equal to `days` of an annual flow, i.e.
    /// `daily(annual) * days`. Multiplies first to keep whole-day results exact.
    /// `None` when the product leaves the decimal range.
    pub fn balance_for_days(self, annual: Money, days: Days) -> Option<Money> {
        annual
            .checked_mul(days)
            .map(|balance| balance / self.days_in_year())
    }
}

// ---------------------------------------------------------------------------
// Benchmarks and bands
// ---------------------------------------------------------------------------

/// Thresholds for the financial-health alert rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertBenchmarks {
    /// Runway below this many months is critical
    pub min_runway_months: Decimal,
    /// LTV/CAC below this ratio is critical (a ratio of zero is ignored)
    pub min_ltv_cac_ratio: Decimal,
    /// Monthly churn above this rate is high severity
    pub max_monthly_churn: Rate,
    /// Customer acquisition cost above this amount is high severity
    pub max_cac: Money,
    /// CAC payback above this many months is medium severity
    pub max_cac_payback_months: Decimal,
    /// Gross margin below this rate is medium severity
    pub min_gross_margin: Rate,
    /// Consecutive negative operating cash months that trigger an alert
    pub negative_cash_months_threshold: u32,
}

impl Default for AlertBenchmarks {
    fn default() -> Self {
        Self {
            min_runway_months: dec!(6),
            min_ltv_cac_ratio: dec!(3),
            max_monthly_churn: dec!(0.05),
            max_cac: dec!(500_000),
            max_cac_payback_months: dec!(12),
            min_gross_margin: dec!(0.30),
            negative_cash_months_threshold: 3,
        }
    }
}

/// Banding for the qualitative cash conversion description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CccBands {
    /// A cycle longer than this many days is described as cash-intensive
    pub cash_intensive_above_days: Days,
}

impl Default for CccBands {
    fn default() -> Self {
        Self {
            cash_intensive_above_days: dec!(60),
        }
    }
}

/// Goals and warning levels for the unit cost cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Contribution margin share of net revenue the target volume must reach
    pub target_margin_pct: Rate,
    /// A single fee step above this share of the gross price is flagged
    pub fee_warning_pct: Rate,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            target_margin_pct: dec!(0.20),
            fee_warning_pct: dec!(0.10),
        }
    }
}

impl CascadeConfig {
    pub fn validate(&self) -> FinPlanResult<()> {
        validate_config_rate("cascade.target_margin_pct", self.target_margin_pct)?;
        validate_config_rate("cascade.fee_warning_pct", self.fee_warning_pct)
    }
}

// ---------------------------------------------------------------------------
// Model configuration
// ---------------------------------------------------------------------------

/// Named, overridable constants of the planning engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Flat income tax rate applied to positive EBIT
    pub tax_rate: Rate,
    /// Annual depreciation as a share of gross fixed assets
    pub depreciation_rate: Rate,
    /// Annual amortization as a share of gross software
    pub amortization_rate: Rate,
    /// Year-end escrow liability as a share of one month of gross revenue
    pub escrow_fraction_of_monthly_revenue: Rate,
    pub day_count: DayCount,
    /// Absolute tolerance for every triangulation check
    pub balance_tolerance: Money,
    pub alerts: AlertBenchmarks,
    pub ccc: CccBands,
    pub cascade: CascadeConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            tax_rate: dec!(0.35),
            depreciation_rate: dec!(0.10),
            amortization_rate: dec!(0.20),
            escrow_fraction_of_monthly_revenue: dec!(0.40),
            day_count: DayCount::Banker360,
            balance_tolerance: dec!(1),
            alerts: AlertBenchmarks::default(),
            ccc: CccBands::default(),
            cascade: CascadeConfig::default(),
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> FinPlanResult<()> {
        validate_config_rate("tax_rate", self.tax_rate)?;
        validate_config_rate("depreciation_rate", self.depreciation_rate)?;
        validate_config_rate("amortization_rate", self.amortization_rate)?;
        validate_config_rate(
            "escrow_fraction_of_monthly_revenue",
            self.escrow_fraction_of_monthly_revenue,
        )?;
        validate_config_rate("alerts.max_monthly_churn", self.alerts.max_monthly_churn)?;
        validate_config_rate("alerts.min_gross_margin", self.alerts.min_gross_margin)?;
        self.cascade.validate()?;

        if self.balance_tolerance <= Decimal::ZERO {
            return Err(FinPlanError::Configuration(format!(
                "balance_tolerance must be positive, got {}",
                self.balance_tolerance
            )));
        }
        if self.alerts.min_ltv_cac_ratio < Decimal::ZERO {
            return Err(FinPlanError::Configuration(
                "alerts.min_ltv_cac_ratio must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

fn validate_config_rate(field: &str, value: Rate) -> FinPlanResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(FinPlanError::Configuration(format!(
            "{field} must be between 0 and 1, got {value}"
        )));
    }
    Ok(())
}
