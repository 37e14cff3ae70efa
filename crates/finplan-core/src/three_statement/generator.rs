use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::model::{
    Assets, BalanceSheet, CarryForwardState, CashFlowStatement, CurrentAssets, Equity,
    FinancingCashFlow, IncomeStatement, InvestingCashFlow, Liabilities, NonCurrentAssets,
    OperatingCashFlow, ThreeStatementModel, YearInputs,
};
use super::triangulation::triangulate;
use crate::config::ModelConfig;
use crate::error::FinPlanError;
use crate::numeric::{non_negative, safe_divide};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::FinPlanResult;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the income statement, balance sheet and cash flow statement of one
/// year from its inputs and the prior year's closing balances, then
/// triangulate them.
///
/// Balance-sheet cash and cash-flow ending cash come from separate
/// derivations (direct and indirect method). Neither is a plug, so a
/// disagreement surfaces in the triangulation result.
pub fn generate(
    inputs: &YearInputs,
    carry_forward: &CarryForwardState,
    config: &ModelConfig,
) -> FinPlanResult<ThreeStatementModel> {
    config.validate()?;
    validate_inputs(inputs)?;
    carry_forward.validate()?;

    let income_statement = build_income_statement(inputs, config);

    // -- Working capital ------------------------------------------------------
    let receivables = working_capital_balance(
        config,
        "days_receivable",
        inputs.gross_revenue,
        inputs.days_receivable,
    )?;
    let payables = working_capital_balance(
        config,
        "days_payable",
        inputs.cost_of_sales,
        inputs.days_payable,
    )?;
    let tax_payable = income_statement.income_tax;
    let escrow = inputs.escrow_balance;

    let balance_sheet = build_balance_sheet(
        inputs,
        carry_forward,
        &income_statement,
        WorkingCapital {
            receivables,
            payables,
            tax_payable,
            escrow,
        },
        config.balance_tolerance,
    );

    let cash_flow = build_cash_flow(
        inputs,
        carry_forward,
        &income_statement,
        &balance_sheet,
        config.balance_tolerance,
    );

    let triangulation = triangulate(
        &income_statement,
        &balance_sheet,
        &cash_flow,
        carry_forward,
        config.balance_tolerance,
    );

    log::debug!(
        "year {}: net income {}, ending cash {}, triangulation valid: {}",
        inputs.year,
        income_statement.net_income,
        cash_flow.ending_cash,
        triangulation.valid
    );

    Ok(ThreeStatementModel {
        year: inputs.year,
        income_statement,
        balance_sheet,
        cash_flow,
        triangulation,
    })
}

/// Self-contained request for one year, as read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementsRequest {
    pub inputs: YearInputs,
    /// Prior year's closing balances; all zero for a company's first year
    #[serde(default)]
    pub opening: CarryForwardState,
    #[serde(default)]
    pub config: ModelConfig,
}

/// Run a [`StatementsRequest`] and wrap the model in the output envelope.
/// Failed triangulation checks become warnings; the model is still returned.
pub fn generate_request(
    request: &StatementsRequest,
) -> FinPlanResult<ComputationOutput<ThreeStatementModel>> {
    let start = Instant::now();

    let model = generate(&request.inputs, &request.opening, &request.config)?;
    let warnings: Vec<String> = model
        .triangulation
        .errors
        .iter()
        .map(|e| e.message.clone())
        .collect();

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Three-statement model: direct-method balance sheet cash, indirect-method cash flow, triangulated",
        &request.config,
        warnings,
        elapsed,
        model,
    ))
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

struct WorkingCapital {
    receivables: Money,
    payables: Money,
    tax_payable: Money,
    escrow: Money,
}

fn build_income_statement(inputs: &YearInputs, config: &ModelConfig) -> IncomeStatement {
    let revenue = inputs.gross_revenue;
    let gross_profit = revenue - inputs.cost_of_sales;
    let ebitda = gross_profit - inputs.operating_expenses;
    let ebit = ebitda - inputs.depreciation - inputs.amortization - inputs.financial_expenses;
    let income_tax = non_negative(ebit * config.tax_rate);
    let net_income = ebit - income_tax;

    IncomeStatement {
        year: inputs.year,
        gross_revenue: revenue,
        cost_of_sales: inputs.cost_of_sales,
        gross_profit,
        gross_margin_pct: safe_divide(gross_profit, revenue),
        operating_expenses: inputs.operating_expenses,
        ebitda,
        ebitda_margin_pct: safe_divide(ebitda, revenue),
        depreciation: inputs.depreciation,
        amortization: inputs.amortization,
        financial_expenses: inputs.financial_expenses,
        ebit,
        ebit_margin_pct: safe_divide(ebit, revenue),
        tax_rate: config.tax_rate,
        income_tax,
        net_income,
        net_margin_pct: safe_divide(net_income, revenue),
    }
}

fn build_balance_sheet(
    inputs: &YearInputs,
    opening: &CarryForwardState,
    income: &IncomeStatement,
    wc: WorkingCapital,
    tolerance: Money,
) -> BalanceSheet {
    // Direct method: cash actually received and paid during the year.
    let customer_receipts = income.gross_revenue - (wc.receivables - opening.receivables);
    let escrow_collected = wc.escrow - opening.escrow_balance;
    let supplier_payments = income.cost_of_sales - (wc.payables - opening.payables);
    let taxes_paid = opening.tax_payable + income.income_tax - wc.tax_payable;
    let cash = opening.cash + customer_receipts + escrow_collected
        - supplier_payments
        - income.operating_expenses
        - income.financial_expenses
        - taxes_paid
        - inputs.capex
        - inputs.software_investment
        + inputs.equity_issuance
        + inputs.partner_contributions;

    let fixed_assets_gross = opening.fixed_assets_gross + inputs.capex;
    let accumulated_depreciation = opening.accumulated_depreciation + income.depreciation;
    let software_gross = opening.software_gross + inputs.software_investment;
    let accumulated_amortization = opening.accumulated_amortization + income.amortization;
    let net_fixed_assets = fixed_assets_gross - accumulated_depreciation;
    let net_software = software_gross - accumulated_amortization;

    let current = CurrentAssets {
        cash,
        receivables: wc.receivables,
        total: cash + wc.receivables,
    };
    let non_current = NonCurrentAssets {
        fixed_assets_gross,
        accumulated_depreciation,
        net_fixed_assets,
        software_gross,
        accumulated_amortization,
        net_software,
        total: net_fixed_assets + net_software,
    };
    let total_assets = current.total + non_current.total;

    let liabilities = Liabilities {
        payables: wc.payables,
        escrow_liability: wc.escrow,
        tax_payable: wc.tax_payable,
        total: wc.payables + wc.escrow + wc.tax_payable,
    };

    let paid_in_capital =
        opening.paid_in_capital + inputs.equity_issuance + inputs.partner_contributions;
    let equity = Equity {
        paid_in_capital,
        legal_reserve: opening.legal_reserve,
        retained_earnings: opening.retained_earnings,
        net_income: income.net_income,
        total: paid_in_capital
            + opening.legal_reserve
            + opening.retained_earnings
            + income.net_income,
    };

    let total_liabilities_and_equity = liabilities.total + equity.total;
    let difference = total_assets - total_liabilities_and_equity;

    BalanceSheet {
        year: inputs.year,
        assets: Assets {
            current,
            non_current,
            total: total_assets,
        },
        liabilities,
        equity,
        total_liabilities_and_equity,
        balanced: difference.abs() <= tolerance,
        difference,
    }
}

fn build_cash_flow(
    inputs: &YearInputs,
    opening: &CarryForwardState,
    income: &IncomeStatement,
    balance: &BalanceSheet,
    tolerance: Money,
) -> CashFlowStatement {
    // Indirect method: start from net income and reverse non-cash items.
    let change_in_receivables = balance.assets.current.receivables - opening.receivables;
    let change_in_payables = balance.liabilities.payables - opening.payables;
    let change_in_tax_payable = balance.liabilities.tax_payable - opening.tax_payable;
    let change_in_escrow = inputs.escrow_balance - opening.escrow_balance;

    let operating_total = income.net_income + income.depreciation + income.amortization
        - change_in_receivables
        + change_in_payables
        + change_in_tax_payable
        + change_in_escrow;
    let investing_total = -(inputs.capex + inputs.software_investment);
    let financing_total = inputs.equity_issuance + inputs.partner_contributions;

    let net_change_in_cash = operating_total + investing_total + financing_total;
    let ending_cash = opening.cash + net_change_in_cash;
    let reconciliation_difference = ending_cash - balance.assets.current.cash;

    CashFlowStatement {
        year: inputs.year,
        opening_cash: opening.cash,
        operating: OperatingCashFlow {
            net_income: income.net_income,
            depreciation: income.depreciation,
            amortization: income.amortization,
            change_in_receivables,
            change_in_payables,
            change_in_tax_payable,
            change_in_escrow,
            total: operating_total,
        },
        investing: InvestingCashFlow {
            capex: inputs.capex,
            software_investment: inputs.software_investment,
            total: investing_total,
        },
        financing: FinancingCashFlow {
            equity_issuance: inputs.equity_issuance,
            partner_contributions: inputs.partner_contributions,
            total: financing_total,
        },
        net_change_in_cash,
        ending_cash,
        reconciles: reconciliation_difference.abs() <= tolerance,
        reconciliation_difference,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn working_capital_balance(
    config: &ModelConfig,
    field: &str,
    annual: Money,
    days: Decimal,
) -> FinPlanResult<Money> {
    config.day_count.balance_for_days(annual, days).ok_or_else(|| {
        FinPlanError::invalid(
            field,
            format!("{days} days of {annual} exceeds the supported decimal range"),
        )
    })
}

fn validate_inputs(inputs: &YearInputs) -> FinPlanResult<()> {
    validate_non_negative("gross_revenue", inputs.gross_revenue)?;
    validate_non_negative("cost_of_sales", inputs.cost_of_sales)?;
    validate_non_negative("operating_expenses", inputs.operating_expenses)?;
    validate_non_negative("financial_expenses", inputs.financial_expenses)?;
    validate_non_negative("depreciation", inputs.depreciation)?;
    validate_non_negative("amortization", inputs.amortization)?;
    validate_non_negative("capex", inputs.capex)?;
    validate_non_negative("software_investment", inputs.software_investment)?;
    validate_non_negative("equity_issuance", inputs.equity_issuance)?;
    validate_non_negative("partner_contributions", inputs.partner_contributions)?;
    validate_non_negative("escrow_balance", inputs.escrow_balance)?;
    validate_non_negative("days_receivable", inputs.days_receivable)?;
    validate_non_negative("days_payable", inputs.days_payable)?;
    Ok(())
}

fn validate_non_negative(field: &str, value: Decimal) -> FinPlanResult<()> {
    if value < Decimal::ZERO {
        return Err(FinPlanError::InvalidInput {
            field: field.into(),
            reason: format!("Value must be non-negative, got {value}"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn scenario_inputs() -> YearInputs {
        YearInputs {
            year: 2026,
            gross_revenue: dec!(1_200_000_000),
            cost_of_sales: dec!(700_000_000),
            operating_expenses: dec!(300_000_000),
            ..YearInputs::default()
        }
    }

    /// A year that touches every balance: working capital, escrow, capex,
    /// software, D&A, financial expenses and new equity.
    fn busy_inputs() -> YearInputs {
        YearInputs {
            year: 2027,
            gross_revenue: dec!(950_000_000),
            cost_of_sales: dec!(510_000_000),
            operating_expenses: dec!(260_000_000),
            financial_expenses: dec!(4_500_000),
            depreciation: dec!(12_000_000),
            amortization: dec!(6_000_000),
            capex: dec!(40_000_000),
            software_investment: dec!(25_000_000),
            equity_issuance: dec!(100_000_000),
            partner_contributions: dec!(15_000_000),
            days_receivable: dec!(45),
            days_payable: dec!(30),
            escrow_balance: dec!(31_666_666.67),
        }
    }

    #[test]
    fn test_scenario_income_statement() {
        let config = ModelConfig::default();
        let model = generate(
            &scenario_inputs(),
            &CarryForwardState::seed(dec!(500_000_000)),
            &config,
        )
        .unwrap();
        let is = &model.income_statement;

        assert_eq!(is.ebitda, dec!(200_000_000));
        assert_eq!(is.ebit, dec!(200_000_000));
        assert_eq!(is.income_tax, dec!(70_000_000));
        assert_eq!(is.net_income, dec!(130_000_000));
        assert_eq!(is.net_income, is.ebit - is.income_tax);
    }

    #[test]
    fn test_scenario_balance_sheet_closes() {
        let config = ModelConfig::default();
        let model = generate(
            &scenario_inputs(),
            &CarryForwardState::seed(dec!(500_000_000)),
            &config,
        )
        .unwrap();
        let bs = &model.balance_sheet;

        assert!(bs.balanced);
        assert!(bs.difference.abs() <= config.balance_tolerance);
        // 500M capital + 130M earnings, tax still owed at year end
        assert_eq!(bs.equity.total, dec!(630_000_000));
        assert_eq!(bs.liabilities.tax_payable, dec!(70_000_000));
        assert_eq!(bs.assets.current.cash, dec!(700_000_000));
        assert!(model.cash_flow.reconciles);
        assert!(model.triangulation.valid, "{:?}", model.triangulation.errors);
    }

    #[test]
    fn test_busy_year_triangulates() {
        let opening = CarryForwardState {
            cash: dec!(180_000_000),
            paid_in_capital: dec!(300_000_000),
            legal_reserve: dec!(10_000_000),
            fixed_assets_gross: dec!(80_000_000),
            software_gross: dec!(30_000_000),
            accumulated_depreciation: dec!(8_000_000),
            accumulated_amortization: dec!(6_000_000),
            receivables: dec!(90_000_000),
            payables: dec!(35_000_000),
            tax_payable: dec!(12_000_000),
            escrow_balance: dec!(25_000_000),
            retained_earnings: dec!(-16_000_000),
        };
        // Opening balance sheet must itself close for the test to mean anything.
        let opening_assets =
            opening.cash + opening.receivables + opening.net_fixed_assets() + opening.net_software();
        let opening_claims = opening.payables
            + opening.tax_payable
            + opening.escrow_balance
            + opening.paid_in_capital
            + opening.legal_reserve
            + opening.retained_earnings;
        assert_eq!(opening_assets, opening_claims);

        let model = generate(&busy_inputs(), &opening, &ModelConfig::default()).unwrap();
        let t = &model.triangulation;
        assert!(t.balance_equation_holds);
        assert!(t.cash_reconciles);
        assert!(t.retained_earnings_roll_forward);
        assert!(t.escrow_consistent);
        assert!(t.valid, "{:?}", t.errors);
        assert!(t.errors.is_empty());
    }

    #[test]
    fn test_working_capital_uses_banker_year() {
        let inputs = YearInputs {
            days_receivable: dec!(30),
            days_payable: dec!(60),
            ..scenario_inputs()
        };
        let model = generate(
            &inputs,
            &CarryForwardState::seed(dec!(500_000_000)),
            &ModelConfig::default(),
        )
        .unwrap();
        // 1.2B / 360 * 30 and 700M / 360 * 60
        assert_eq!(
            model.balance_sheet.assets.current.receivables,
            dec!(100_000_000)
        );
        assert_eq!(
            model.balance_sheet.liabilities.payables.round_dp(2),
            dec!(116_666_666.67)
        );
        assert!(model.triangulation.valid);
    }

    #[test]
    fn test_escrow_is_liability_not_revenue() {
        let inputs = YearInputs {
            escrow_balance: dec!(40_000_000),
            ..scenario_inputs()
        };
        let model = generate(
            &inputs,
            &CarryForwardState::seed(dec!(500_000_000)),
            &ModelConfig::default(),
        )
        .unwrap();
        assert_eq!(model.income_statement.net_income, dec!(130_000_000));
        assert_eq!(
            model.balance_sheet.liabilities.escrow_liability,
            dec!(40_000_000)
        );
        assert_eq!(model.cash_flow.operating.change_in_escrow, dec!(40_000_000));
        assert_eq!(model.cash_flow.ending_cash, dec!(740_000_000));
        assert!(model.triangulation.escrow_consistent);
    }

    #[test]
    fn test_negative_ebit_pays_no_tax() {
        let inputs = YearInputs {
            gross_revenue: dec!(100),
            cost_of_sales: dec!(80),
            operating_expenses: dec!(50),
            ..YearInputs::default()
        };
        let model = generate(
            &inputs,
            &CarryForwardState::seed(dec!(1000)),
            &ModelConfig::default(),
        )
        .unwrap();
        assert_eq!(model.income_statement.ebit, dec!(-30));
        assert_eq!(model.income_statement.income_tax, Decimal::ZERO);
        assert_eq!(model.income_statement.net_income, dec!(-30));
        assert!(model.triangulation.valid);
    }

    #[test]
    fn test_zero_ebit_pays_no_tax() {
        let inputs = YearInputs {
            gross_revenue: dec!(100),
            cost_of_sales: dec!(60),
            operating_expenses: dec!(40),
            ..YearInputs::default()
        };
        let model = generate(
            &inputs,
            &CarryForwardState::seed(dec!(10)),
            &ModelConfig::default(),
        )
        .unwrap();
        assert_eq!(model.income_statement.ebit, Decimal::ZERO);
        assert_eq!(model.income_statement.income_tax, Decimal::ZERO);
    }

    #[test]
    fn test_zero_revenue_margins_are_zero() {
        let inputs = YearInputs {
            operating_expenses: dec!(10_000_000),
            ..YearInputs::default()
        };
        let model = generate(
            &inputs,
            &CarryForwardState::seed(dec!(50_000_000)),
            &ModelConfig::default(),
        )
        .unwrap();
        let is = &model.income_statement;
        assert_eq!(is.gross_margin_pct, Decimal::ZERO);
        assert_eq!(is.ebitda_margin_pct, Decimal::ZERO);
        assert_eq!(is.ebit_margin_pct, Decimal::ZERO);
        assert_eq!(is.net_margin_pct, Decimal::ZERO);
        assert!(model.triangulation.valid);
    }

    #[test]
    fn test_negative_days_receivable_rejected() {
        let inputs = YearInputs {
            days_receivable: dec!(-1),
            ..scenario_inputs()
        };
        let err = generate(&inputs, &CarryForwardState::seed(dec!(1)), &ModelConfig::default())
            .unwrap_err();
        match err {
            FinPlanError::InvalidInput { field, .. } => assert_eq!(field, "days_receivable"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_days_payable_rejected() {
        let inputs = YearInputs {
            days_payable: dec!(-30),
            ..scenario_inputs()
        };
        assert!(
            generate(&inputs, &CarryForwardState::seed(dec!(1)), &ModelConfig::default()).is_err()
        );
    }

    #[test]
    fn test_negative_revenue_rejected() {
        let inputs = YearInputs {
            gross_revenue: dec!(-5),
            ..YearInputs::default()
        };
        assert!(
            generate(&inputs, &CarryForwardState::seed(dec!(1)), &ModelConfig::default()).is_err()
        );
    }

    #[test]
    fn test_negative_tax_rate_rejected() {
        let inputs = YearInputs {
            gross_revenue: dec!(100),
            cost_of_sales: dec!(80),
            operating_expenses: dec!(50),
            ..YearInputs::default()
        };
        let config = ModelConfig {
            tax_rate: dec!(-0.35),
            ..ModelConfig::default()
        };
        let err = generate(&inputs, &CarryForwardState::seed(dec!(1000)), &config).unwrap_err();
        assert!(matches!(err, FinPlanError::Configuration(_)), "{err:?}");
    }

    #[test]
    fn test_oversized_working_capital_is_an_error() {
        let inputs = YearInputs {
            gross_revenue: dec!(100_000_000_000_000_000_000_000_000),
            days_receivable: dec!(1000),
            ..YearInputs::default()
        };
        let err = generate(&inputs, &CarryForwardState::seed(dec!(1)), &ModelConfig::default())
            .unwrap_err();
        match err {
            FinPlanError::InvalidInput { field, .. } => assert_eq!(field, "days_receivable"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_tax_rate() {
        let config = ModelConfig {
            tax_rate: dec!(0.25),
            ..ModelConfig::default()
        };
        let model = generate(
            &scenario_inputs(),
            &CarryForwardState::seed(dec!(500_000_000)),
            &config,
        )
        .unwrap();
        assert_eq!(model.income_statement.income_tax, dec!(50_000_000));
        assert_eq!(model.income_statement.tax_rate, dec!(0.25));
    }

    #[test]
    fn test_prior_tax_payable_is_paid_in_cash() {
        let mut state = CarryForwardState::seed(dec!(500_000_000));
        let config = ModelConfig::default();
        let first = generate(&scenario_inputs(), &state, &config).unwrap();
        state.advance(&first);

        let second_inputs = YearInputs {
            year: 2027,
            ..scenario_inputs()
        };
        let second = generate(&second_inputs, &state, &config).unwrap();
        // Year-two tax equals year-one tax, so the payable does not move and
        // cash grows by net income only.
        assert_eq!(second.cash_flow.operating.change_in_tax_payable, Decimal::ZERO);
        assert_eq!(
            second.cash_flow.ending_cash,
            first.cash_flow.ending_cash + dec!(130_000_000)
        );
        assert!(second.triangulation.valid);
    }
}
