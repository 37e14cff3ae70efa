use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::generator::generate;
use super::model::{CarryForwardState, ThreeStatementModel, YearInputs};
use crate::config::ModelConfig;
use crate::error::FinPlanError;
use crate::numeric::non_negative;
use crate::projection::{AnnualProjection, ProjectionProvider, StaticProjections};
use crate::types::{with_metadata, ComputationOutput, Days, Money};
use crate::FinPlanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-year assumptions that do not come from the annual projection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YearAssumptions {
    pub capex: Money,
    pub software_investment: Money,
    pub equity_issuance: Money,
    pub partner_contributions: Money,
    pub financial_expenses: Money,
    pub days_receivable: Days,
    pub days_payable: Days,
}

/// Generated years of a multi-year run.
///
/// A year missing from `models` was not computed; it must never be read as
/// a year of zeros.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionSeries {
    pub models: BTreeMap<i32, ThreeStatementModel>,
    /// Requested years the projection provider had no data for
    pub skipped_years: Vec<i32>,
    /// Balances after the last computed year
    pub closing_state: CarryForwardState,
}

impl ProjectionSeries {
    pub fn model(&self, year: i32) -> Option<&ThreeStatementModel> {
        self.models.get(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.models.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Every computed year passed triangulation.
    pub fn all_valid(&self) -> bool {
        self.models.values().all(|m| m.triangulation.valid)
    }
}

/// Self-contained request for a multi-year run, as read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRequest {
    pub start_year: i32,
    pub end_year: i32,
    pub initial_capital: Money,
    #[serde(default)]
    pub legal_reserve: Money,
    pub projections: Vec<AnnualProjection>,
    /// Assumptions applied to every year without an override
    #[serde(default)]
    pub assumptions: YearAssumptions,
    #[serde(default)]
    pub year_overrides: BTreeMap<i32, YearAssumptions>,
    #[serde(default)]
    pub config: ModelConfig,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate every year from `start_year` to `end_year` inclusive, threading
/// the closing balances of each year into the next.
///
/// Years are strictly sequential: year n+1 is generated only after year n's
/// balances have been carried forward. Years without projection data are
/// skipped and the next year opens from the last computed year.
pub fn run_series<P, F>(
    start_year: i32,
    end_year: i32,
    provider: &P,
    assumptions: F,
    seed: CarryForwardState,
    config: &ModelConfig,
) -> FinPlanResult<ComputationOutput<ProjectionSeries>>
where
    P: ProjectionProvider + ?Sized,
    F: Fn(i32) -> YearAssumptions,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate()?;
    seed.validate()?;

    let mut state = seed;
    let mut models = BTreeMap::new();
    let mut skipped_years = Vec::new();

    for year in start_year..=end_year {
        let Some(projection) = provider.projection(year) else {
            log::warn!("year {year}: no projection data, skipping");
            warnings.push(format!("Year {year}: no projection data; year not computed"));
            skipped_years.push(year);
            continue;
        };
        if projection.year != year {
            return Err(FinPlanError::invalid(
                "projection.year",
                format!("Provider returned year {} for requested year {year}", projection.year),
            ));
        }

        let inputs = derive_year_inputs(&projection, &assumptions(year), &state, config);
        let model = generate(&inputs, &state, config)?;

        if !model.triangulation.valid {
            log::warn!(
                "year {year}: triangulation failed with {} error(s)",
                model.triangulation.errors.len()
            );
            for e in &model.triangulation.errors {
                warnings.push(format!("Year {year}: {}", e.message));
            }
        }
        if model.cash_flow.ending_cash < Decimal::ZERO {
            warnings.push(format!(
                "Year {year}: negative ending cash ({})",
                model.cash_flow.ending_cash
            ));
        }

        state.advance(&model);
        models.insert(year, model);
    }

    log::info!(
        "series {start_year}-{end_year}: {} year(s) computed, {} skipped",
        models.len(),
        skipped_years.len()
    );

    let series = ProjectionSeries {
        models,
        skipped_years,
        closing_state: state,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Interconnected three-statement projection with year-over-year carry-forward",
        config,
        warnings,
        elapsed,
        series,
    ))
}

/// Run a [`SeriesRequest`] against its embedded projections.
pub fn run_series_request(
    request: &SeriesRequest,
) -> FinPlanResult<ComputationOutput<ProjectionSeries>> {
    if request.initial_capital < Decimal::ZERO {
        return Err(FinPlanError::invalid(
            "initial_capital",
            format!("Value must be non-negative, got {}", request.initial_capital),
        ));
    }
    let provider = StaticProjections::new(request.projections.iter().cloned());
    let seed =
        CarryForwardState::seed(request.initial_capital).with_legal_reserve(request.legal_reserve);

    run_series(
        request.start_year,
        request.end_year,
        &provider,
        |year| {
            request
                .year_overrides
                .get(&year)
                .cloned()
                .unwrap_or_else(|| request.assumptions.clone())
        },
        seed,
        &request.config,
    )
}

/// Turn one year's projection and assumptions into generator inputs.
///
/// Depreciation and amortization are fixed rates of the gross balances
/// (including this year's additions), capped so accumulated charges never
/// exceed cost. Escrow is a fraction of one average month of revenue.
pub fn derive_year_inputs(
    projection: &AnnualProjection,
    assumptions: &YearAssumptions,
    state: &CarryForwardState,
    config: &ModelConfig,
) -> YearInputs {
    let fixed_assets_gross = state.fixed_assets_gross + assumptions.capex;
    let depreciation = straight_line_charge(
        fixed_assets_gross,
        state.accumulated_depreciation,
        config.depreciation_rate,
    );

    let software_gross = state.software_gross + assumptions.software_investment;
    let amortization = straight_line_charge(
        software_gross,
        state.accumulated_amortization,
        config.amortization_rate,
    );

    YearInputs {
        year: projection.year,
        gross_revenue: projection.gross_revenue,
        cost_of_sales: projection.direct_cost,
        operating_expenses: projection.opex,
        financial_expenses: assumptions.financial_expenses,
        depreciation,
        amortization,
        capex: assumptions.capex,
        software_investment: assumptions.software_investment,
        equity_issuance: assumptions.equity_issuance,
        partner_contributions: assumptions.partner_contributions,
        days_receivable: assumptions.days_receivable,
        days_payable: assumptions.days_payable,
        escrow_balance: projection.monthly_revenue() * config.escrow_fraction_of_monthly_revenue,
    }
}

fn straight_line_charge(gross: Money, accumulated: Money, rate: Decimal) -> Money {
    let remaining = non_negative(gross - accumulated);
    (gross * rate).min(remaining)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn provider(years: &[i32]) -> StaticProjections {
        StaticProjections::new(years.iter().map(|&y| {
            AnnualProjection::from_totals(
                y,
                dec!(1_200_000_000),
                dec!(700_000_000),
                dec!(300_000_000),
            )
        }))
    }

    fn assumptions(_year: i32) -> YearAssumptions {
        YearAssumptions {
            capex: dec!(100_000_000),
            software_investment: dec!(50_000_000),
            days_receivable: dec!(30),
            days_payable: dec!(45),
            ..YearAssumptions::default()
        }
    }

    #[test]
    fn test_empty_range_returns_empty_series() {
        let out = run_series(
            2028,
            2026,
            &provider(&[2026]),
            assumptions,
            CarryForwardState::seed(dec!(500_000_000)),
            &ModelConfig::default(),
        )
        .unwrap();
        assert!(out.result.is_empty());
        assert!(out.result.skipped_years.is_empty());
        assert_eq!(out.result.closing_state.cash, dec!(500_000_000));
    }

    #[test]
    fn test_single_year_range() {
        let out = run_series(
            2026,
            2026,
            &provider(&[2026]),
            assumptions,
            CarryForwardState::seed(dec!(500_000_000)),
            &ModelConfig::default(),
        )
        .unwrap();
        assert_eq!(out.result.years().collect::<Vec<_>>(), vec![2026]);
    }

    #[test]
    fn test_opening_cash_is_prior_closing_cash() {
        let out = run_series(
            2026,
            2028,
            &provider(&[2026, 2027, 2028]),
            assumptions,
            CarryForwardState::seed(dec!(500_000_000)),
            &ModelConfig::default(),
        )
        .unwrap();
        let s = &out.result;
        assert_eq!(
            s.model(2028).unwrap().cash_flow.opening_cash,
            s.model(2027).unwrap().cash_flow.ending_cash
        );
        assert_eq!(
            s.model(2027).unwrap().cash_flow.opening_cash,
            s.model(2026).unwrap().cash_flow.ending_cash
        );
        assert!(s.all_valid());
    }

    #[test]
    fn test_depreciation_and_amortization_rates() {
        let out = run_series(
            2026,
            2027,
            &provider(&[2026, 2027]),
            assumptions,
            CarryForwardState::seed(dec!(500_000_000)),
            &ModelConfig::default(),
        )
        .unwrap();
        let y1 = &out.result.model(2026).unwrap().income_statement;
        let y2 = &out.result.model(2027).unwrap().income_statement;
        // 10% of 100M gross, then 10% of 200M gross
        assert_eq!(y1.depreciation, dec!(10_000_000));
        assert_eq!(y2.depreciation, dec!(20_000_000));
        // 20% of 50M, then 20% of 100M
        assert_eq!(y1.amortization, dec!(10_000_000));
        assert_eq!(y2.amortization, dec!(20_000_000));

        let nc = &out.result.model(2027).unwrap().balance_sheet.assets.non_current;
        assert_eq!(nc.accumulated_depreciation, dec!(30_000_000));
        assert_eq!(nc.net_fixed_assets, dec!(170_000_000));
    }

    #[test]
    fn test_depreciation_capped_at_cost() {
        let state = CarryForwardState {
            fixed_assets_gross: dec!(100),
            accumulated_depreciation: dec!(95),
            ..CarryForwardState::seed(dec!(1000))
        };
        let projection = AnnualProjection::from_totals(2030, dec!(10), dec!(1), dec!(1));
        let inputs = derive_year_inputs(
            &projection,
            &YearAssumptions::default(),
            &state,
            &ModelConfig::default(),
        );
        assert_eq!(inputs.depreciation, dec!(5));
    }

    #[test]
    fn test_escrow_is_fraction_of_monthly_revenue() {
        let projection = AnnualProjection::from_totals(2026, dec!(1_200_000_000), dec!(0), dec!(0));
        let inputs = derive_year_inputs(
            &projection,
            &YearAssumptions::default(),
            &CarryForwardState::default(),
            &ModelConfig::default(),
        );
        // 40% of 100M
        assert_eq!(inputs.escrow_balance, dec!(40_000_000));
    }

    #[test]
    fn test_missing_year_is_absent_not_zero() {
        let out = run_series(
            2026,
            2028,
            &provider(&[2026, 2028]),
            assumptions,
            CarryForwardState::seed(dec!(500_000_000)),
            &ModelConfig::default(),
        )
        .unwrap();
        let s = &out.result;
        assert!(s.model(2027).is_none());
        assert_eq!(s.skipped_years, vec![2027]);
        assert_eq!(
            s.model(2028).unwrap().cash_flow.opening_cash,
            s.model(2026).unwrap().cash_flow.ending_cash
        );
        assert!(out.warnings.iter().any(|w| w.contains("2027")));
    }

    #[test]
    fn test_retained_earnings_roll_forward() {
        let out = run_series(
            2026,
            2029,
            &provider(&[2026, 2027, 2028, 2029]),
            assumptions,
            CarryForwardState::seed(dec!(500_000_000)),
            &ModelConfig::default(),
        )
        .unwrap();
        let s = &out.result;
        for year in 2026..2029 {
            let this = s.model(year).unwrap();
            let next = s.model(year + 1).unwrap();
            assert_eq!(
                next.balance_sheet.equity.retained_earnings,
                this.balance_sheet.equity.retained_earnings + this.income_statement.net_income
            );
        }
    }

    #[test]
    fn test_series_request_with_override() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            2027,
            YearAssumptions {
                equity_issuance: dec!(200_000_000),
                ..YearAssumptions::default()
            },
        );
        let request = SeriesRequest {
            start_year: 2026,
            end_year: 2027,
            initial_capital: dec!(500_000_000),
            legal_reserve: Decimal::ZERO,
            projections: vec![
                AnnualProjection::from_totals(2026, dec!(1_200), dec!(700), dec!(300)),
                AnnualProjection::from_totals(2027, dec!(1_200), dec!(700), dec!(300)),
            ],
            assumptions: YearAssumptions::default(),
            year_overrides: overrides,
            config: ModelConfig::default(),
        };
        let out = run_series_request(&request).unwrap();
        let y2 = out.result.model(2027).unwrap();
        assert_eq!(y2.cash_flow.financing.equity_issuance, dec!(200_000_000));
        assert_eq!(
            y2.balance_sheet.equity.paid_in_capital,
            dec!(700_000_000)
        );
        assert!(out.result.all_valid());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ModelConfig {
            depreciation_rate: dec!(-0.1),
            ..ModelConfig::default()
        };
        let result = run_series(
            2026,
            2026,
            &provider(&[2026]),
            assumptions,
            CarryForwardState::seed(dec!(1)),
            &config,
        );
        assert!(result.is_err());
    }
}
