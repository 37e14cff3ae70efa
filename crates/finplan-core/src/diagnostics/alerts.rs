use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::AlertBenchmarks;
use crate::numeric::{format_money, format_pct, safe_divide};
use crate::projection::AnnualProjection;
use crate::three_statement::ThreeStatementModel;
use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    /// Sort key: lower is more severe.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCategory {
    Liquidity,
    UnitEconomics,
    ModelIntegrity,
    Retention,
    Profitability,
}

/// A single finding. Created fresh on each evaluation and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Rule identifier; each rule fires at most once per evaluation
    pub id: String,
    pub severity: Severity,
    pub category: AlertCategory,
    pub title: String,
    pub description: String,
    pub current_value: Decimal,
    pub benchmark_value: Decimal,
    pub recommended_action: String,
    pub timestamp: DateTime<Utc>,
}

/// Customer-level economics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitEconomics {
    /// Customer lifetime value
    pub ltv: Money,
    /// Customer acquisition cost
    pub cac: Money,
    /// LTV / CAC; 0 while CAC is unknown
    pub ltv_cac_ratio: Decimal,
    /// Months of contribution needed to recover CAC, when computable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cac_payback_months: Option<Decimal>,
}

impl UnitEconomics {
    pub fn from_parts(ltv: Money, cac: Money, cac_payback_months: Option<Decimal>) -> Self {
        Self {
            ltv,
            cac,
            ltv_cac_ratio: safe_divide(ltv, cac),
            cac_payback_months,
        }
    }

    /// LTV = monthly contribution per customer / monthly churn.
    /// Without churn the lifetime is unbounded, so LTV is reported as 0.
    pub fn from_subscription(
        monthly_revenue_per_customer: Money,
        gross_margin: Rate,
        monthly_churn: Rate,
        cac: Money,
    ) -> Self {
        let monthly_contribution = monthly_revenue_per_customer * gross_margin;
        let ltv = safe_divide(monthly_contribution, monthly_churn);
        let payback = if monthly_contribution > Decimal::ZERO {
            Some(cac / monthly_contribution)
        } else {
            None
        };
        Self::from_parts(ltv, cac, payback)
    }
}

/// Balance-sheet validity as seen by the alert engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheetStatus {
    pub year: i32,
    /// Triangulation's balance-equation check
    pub balance_equation_holds: bool,
    /// Assets minus liabilities and equity
    pub difference: Money,
}

impl From<&ThreeStatementModel> for BalanceSheetStatus {
    fn from(model: &ThreeStatementModel) -> Self {
        Self {
            year: model.year,
            balance_equation_holds: model.triangulation.balance_equation_holds,
            difference: model.balance_sheet.difference,
        }
    }
}

/// Dashboard KPIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiSnapshot {
    /// Months of cash left at the current burn; `None` when not burning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runway_months: Option<Decimal>,
    pub monthly_churn: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_margin: Option<Rate>,
}

impl KpiSnapshot {
    /// KPIs of a generated year. Burn is the monthly average of operating
    /// plus investing cash flow; financing does not extend runway.
    pub fn from_model(model: &ThreeStatementModel, monthly_churn: Rate) -> Self {
        let cf = &model.cash_flow;
        let monthly_burn = -(cf.operating.total + cf.investing.total) / dec!(12);
        Self {
            runway_months: runway_months(model.balance_sheet.assets.current.cash, monthly_burn),
            monthly_churn,
            gross_margin: Some(model.income_statement.gross_margin_pct),
        }
    }
}

/// Everything one evaluation reads, as received from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertInputs {
    pub unit_economics: Option<UnitEconomics>,
    pub balance_sheet: Option<BalanceSheetStatus>,
    pub kpis: Option<KpiSnapshot>,
    pub consecutive_negative_cash_months: u32,
    pub benchmarks: AlertBenchmarks,
}

impl AlertInputs {
    pub fn evaluate(&self) -> Vec<Alert> {
        evaluate(
            self.unit_economics.as_ref(),
            self.balance_sheet.as_ref(),
            self.kpis.as_ref(),
            self.consecutive_negative_cash_months,
            &self.benchmarks,
        )
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Months until `cash` runs out at `monthly_net_burn`. `None` when the
/// business is not burning cash; zero when cash is already exhausted.
pub fn runway_months(cash: Money, monthly_net_burn: Money) -> Option<Decimal> {
    if monthly_net_burn <= Decimal::ZERO {
        return None;
    }
    if cash <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    Some(cash / monthly_net_burn)
}

/// Length of the run of negative values at the end of `monthly_cash_flows`.
pub fn consecutive_negative_months(monthly_cash_flows: &[Money]) -> u32 {
    monthly_cash_flows
        .iter()
        .rev()
        .take_while(|flow| **flow < Decimal::ZERO)
        .count() as u32
}

/// Trailing streak of negative-EBITDA months in a projection year.
pub fn consecutive_negative_cash_months(projection: &AnnualProjection) -> u32 {
    let flows: Vec<Money> = projection.months.iter().map(|m| m.ebitda).collect();
    consecutive_negative_months(&flows)
}

/// Stable sort by severity: critical first, ties keep detection order.
pub fn sort_by_severity(mut alerts: Vec<Alert>) -> Vec<Alert> {
    alerts.sort_by_key(|a| a.severity.rank());
    alerts
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Evaluate every rule whose input is present, stamped with the current time.
pub fn evaluate(
    unit_economics: Option<&UnitEconomics>,
    balance_sheet: Option<&BalanceSheetStatus>,
    kpis: Option<&KpiSnapshot>,
    consecutive_negative_cash_months: u32,
    benchmarks: &AlertBenchmarks,
) -> Vec<Alert> {
    evaluate_at(
        unit_economics,
        balance_sheet,
        kpis,
        consecutive_negative_cash_months,
        benchmarks,
        Utc::now(),
    )
}

/// [`evaluate`] with an explicit timestamp.
///
/// An absent input suppresses exactly the rules that read it: unit
/// economics drives LTV/CAC, CAC and payback; the balance sheet drives the
/// integrity rule; KPIs drive runway, churn and gross margin.
pub fn evaluate_at(
    unit_economics: Option<&UnitEconomics>,
    balance_sheet: Option<&BalanceSheetStatus>,
    kpis: Option<&KpiSnapshot>,
    consecutive_negative_cash_months: u32,
    benchmarks: &AlertBenchmarks,
    timestamp: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let mut emit = |id: &str,
                    severity: Severity,
                    category: AlertCategory,
                    title: &str,
                    description: String,
                    current_value: Decimal,
                    benchmark_value: Decimal,
                    recommended_action: &str| {
        alerts.push(Alert {
            id: id.to_string(),
            severity,
            category,
            title: title.to_string(),
            description,
            current_value,
            benchmark_value,
            recommended_action: recommended_action.to_string(),
            timestamp,
        });
    };

    // -- Runway ---------------------------------------------------------------
    if let Some(kpis) = kpis {
        if let Some(runway) = kpis.runway_months {
            if runway < benchmarks.min_runway_months {
                emit(
                    "runway_below_minimum",
                    Severity::Critical,
                    AlertCategory::Liquidity,
                    "Cash runway below minimum",
                    format!(
                        "{runway:.1} months of cash left at the current burn; minimum is {} months",
                        benchmarks.min_runway_months
                    ),
                    runway,
                    benchmarks.min_runway_months,
                    "Cut monthly burn or raise capital before runway falls further",
                );
            }
        }
    }

    // -- LTV / CAC ------------------------------------------------------------
    if let Some(ue) = unit_economics {
        let ratio = ue.ltv_cac_ratio;
        // Zero means the ratio cannot be computed yet, not that it is bad.
        if ratio > Decimal::ZERO && ratio < benchmarks.min_ltv_cac_ratio {
            emit(
                "ltv_cac_unsustainable",
                Severity::Critical,
                AlertCategory::UnitEconomics,
                "Unsustainable unit economics",
                format!(
                    "LTV/CAC of {ratio:.2}x is below the {}x minimum",
                    benchmarks.min_ltv_cac_ratio
                ),
                ratio,
                benchmarks.min_ltv_cac_ratio,
                "Lower acquisition cost or raise customer lifetime value",
            );
        }
    }

    // -- Balance sheet integrity ----------------------------------------------
    if let Some(bs) = balance_sheet {
        if !bs.balance_equation_holds {
            emit(
                "balance_sheet_invalid",
                Severity::Critical,
                AlertCategory::ModelIntegrity,
                "Balance sheet does not close",
                format!(
                    "Year {}: assets differ from liabilities plus equity by {}",
                    bs.year,
                    format_money(bs.difference)
                ),
                bs.difference,
                Decimal::ZERO,
                "Review the triangulation errors; the projection is not internally consistent",
            );
        }
    }

    // -- Churn ------------------------------------------------------------------
    if let Some(kpis) = kpis {
        if kpis.monthly_churn > benchmarks.max_monthly_churn {
            emit(
                "churn_above_maximum",
                Severity::High,
                AlertCategory::Retention,
                "Monthly churn above maximum",
                format!(
                    "Monthly churn of {} exceeds the {} maximum",
                    format_pct(kpis.monthly_churn),
                    format_pct(benchmarks.max_monthly_churn)
                ),
                kpis.monthly_churn,
                benchmarks.max_monthly_churn,
                "Investigate cancellations and strengthen retention",
            );
        }
    }

    // -- CAC ------------------------------------------------------------------
    if let Some(ue) = unit_economics {
        if ue.cac > benchmarks.max_cac {
            emit(
                "cac_above_maximum",
                Severity::High,
                AlertCategory::UnitEconomics,
                "Customer acquisition cost above maximum",
                format!(
                    "CAC of {} exceeds the {} maximum",
                    format_money(ue.cac),
                    format_money(benchmarks.max_cac)
                ),
                ue.cac,
                benchmarks.max_cac,
                "Shift spend to lower-cost acquisition channels",
            );
        }
    }

    // -- Negative operating cash streak -----------------------------------------
    let threshold = benchmarks.negative_cash_months_threshold;
    if consecutive_negative_cash_months >= threshold {
        emit(
            "negative_operating_cash_streak",
            Severity::High,
            AlertCategory::Liquidity,
            "Sustained negative operating cash flow",
            format!(
                "{consecutive_negative_cash_months} consecutive months of negative operating cash flow"
            ),
            Decimal::from(consecutive_negative_cash_months),
            Decimal::from(threshold),
            "Review the cost base and collection terms",
        );
    }

    // -- CAC payback --------------------------------------------------------------
    if let Some(ue) = unit_economics {
        if let Some(payback) = ue.cac_payback_months {
            if payback > benchmarks.max_cac_payback_months {
                emit(
                    "cac_payback_too_long",
                    Severity::Medium,
                    AlertCategory::UnitEconomics,
                    "CAC payback period too long",
                    format!(
                        "Acquisition cost takes {payback:.1} months to recover; maximum is {} months",
                        benchmarks.max_cac_payback_months
                    ),
                    payback,
                    benchmarks.max_cac_payback_months,
                    "Raise first-order margin or lower acquisition cost",
                );
            }
        }
    }

    // -- Gross margin -------------------------------------------------------------
    if let Some(kpis) = kpis {
        if let Some(margin) = kpis.gross_margin {
            if margin < benchmarks.min_gross_margin {
                emit(
                    "gross_margin_below_minimum",
                    Severity::Medium,
                    AlertCategory::Profitability,
                    "Gross margin below minimum",
                    format!(
                        "Gross margin of {} is below the {} minimum",
                        format_pct(margin),
                        format_pct(benchmarks.min_gross_margin)
                    ),
                    margin,
                    benchmarks.min_gross_margin,
                    "Review pricing and direct cost per service",
                );
            }
        }
    }

    sort_by_severity(alerts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
