use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FinPlanError;
use crate::types::{Days, Money, Rate};
use crate::FinPlanResult;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Everything the generator needs for one fiscal year beyond the opening
/// balances. Depreciation and amortization are computed by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YearInputs {
    pub year: i32,
    pub gross_revenue: Money,
    pub cost_of_sales: Money,
    pub operating_expenses: Money,
    /// Bank and payment charges; deducted before EBIT
    pub financial_expenses: Money,
    pub depreciation: Money,
    pub amortization: Money,
    pub capex: Money,
    pub software_investment: Money,
    pub equity_issuance: Money,
    pub partner_contributions: Money,
    /// Days of revenue held as receivables at year end
    pub days_receivable: Days,
    /// Days of cost of sales held as payables at year end
    pub days_payable: Days,
    /// Closing escrow liability (funds held for third parties)
    pub escrow_balance: Money,
}

// ---------------------------------------------------------------------------
// Carry-forward state
// ---------------------------------------------------------------------------

/// Year-end balances handed to the next year as opening balances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarryForwardState {
    pub cash: Money,
    pub paid_in_capital: Money,
    pub legal_reserve: Money,
    pub fixed_assets_gross: Money,
    pub software_gross: Money,
    pub accumulated_depreciation: Money,
    pub accumulated_amortization: Money,
    pub receivables: Money,
    pub payables: Money,
    pub tax_payable: Money,
    pub escrow_balance: Money,
    /// Cumulative net income of all prior years
    pub retained_earnings: Money,
}

impl CarryForwardState {
    /// Opening state of a new company funded with `capital` in cash.
    pub fn seed(capital: Money) -> Self {
        Self {
            cash: capital,
            paid_in_capital: capital,
            ..Self::default()
        }
    }

    /// Add a legal reserve backed by cash.
    pub fn with_legal_reserve(mut self, reserve: Money) -> Self {
        self.cash += reserve;
        self.legal_reserve += reserve;
        self
    }

    pub fn net_fixed_assets(&self) -> Money {
        self.fixed_assets_gross - self.accumulated_depreciation
    }

    pub fn net_software(&self) -> Money {
        self.software_gross - self.accumulated_amortization
    }

    /// Roll the state forward with a finalized year.
    pub fn advance(&mut self, model: &ThreeStatementModel) {
        let bs = &model.balance_sheet;
        self.cash = model.cash_flow.ending_cash;
        self.paid_in_capital = bs.equity.paid_in_capital;
        self.legal_reserve = bs.equity.legal_reserve;
        self.fixed_assets_gross = bs.assets.non_current.fixed_assets_gross;
        self.accumulated_depreciation = bs.assets.non_current.accumulated_depreciation;
        self.software_gross = bs.assets.non_current.software_gross;
        self.accumulated_amortization = bs.assets.non_current.accumulated_amortization;
        self.receivables = bs.assets.current.receivables;
        self.payables = bs.liabilities.payables;
        self.tax_payable = bs.liabilities.tax_payable;
        self.escrow_balance = bs.liabilities.escrow_liability;
        self.retained_earnings += model.income_statement.net_income;
    }

    /// Balances other than cash and retained earnings cannot be negative.
    pub fn validate(&self) -> FinPlanResult<()> {
        let fields = [
            ("paid_in_capital", self.paid_in_capital),
            ("legal_reserve", self.legal_reserve),
            ("fixed_assets_gross", self.fixed_assets_gross),
            ("software_gross", self.software_gross),
            ("accumulated_depreciation", self.accumulated_depreciation),
            ("accumulated_amortization", self.accumulated_amortization),
            ("receivables", self.receivables),
            ("payables", self.payables),
            ("tax_payable", self.tax_payable),
            ("escrow_balance", self.escrow_balance),
        ];
        for (field, value) in fields {
            if value < Decimal::ZERO {
                return Err(FinPlanError::invalid(
                    &format!("carry_forward.{field}"),
                    format!("Balance must be non-negative, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Income statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub year: i32,
    pub gross_revenue: Money,
    pub cost_of_sales: Money,
    pub gross_profit: Money,
    pub gross_margin_pct: Rate,
    pub operating_expenses: Money,
    pub ebitda: Money,
    pub ebitda_margin_pct: Rate,
    pub depreciation: Money,
    pub amortization: Money,
    pub financial_expenses: Money,
    /// Taxable result: EBITDA less D&A and financial expenses
    pub ebit: Money,
    pub ebit_margin_pct: Rate,
    pub tax_rate: Rate,
    /// max(0, ebit * tax_rate); losses are not carried back
    pub income_tax: Money,
    pub net_income: Money,
    pub net_margin_pct: Rate,
}

// ---------------------------------------------------------------------------
// Balance sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentAssets {
    pub cash: Money,
    pub receivables: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonCurrentAssets {
    pub fixed_assets_gross: Money,
    pub accumulated_depreciation: Money,
    pub net_fixed_assets: Money,
    pub software_gross: Money,
    pub accumulated_amortization: Money,
    pub net_software: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assets {
    pub current: CurrentAssets,
    pub non_current: NonCurrentAssets,
    pub total: Money,
}

/// All liabilities are current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Liabilities {
    pub payables: Money,
    /// Funds collected on behalf of third parties; not revenue
    pub escrow_liability: Money,
    /// Current-year income tax, settled the following year
    pub tax_payable: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equity {
    pub paid_in_capital: Money,
    pub legal_reserve: Money,
    /// Cumulative net income of prior years
    pub retained_earnings: Money,
    /// Net income of the current year
    pub net_income: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub year: i32,
    pub assets: Assets,
    pub liabilities: Liabilities,
    pub equity: Equity,
    pub total_liabilities_and_equity: Money,
    /// `|difference| <= tolerance`
    pub balanced: bool,
    /// Total assets minus liabilities and equity
    pub difference: Money,
}

// ---------------------------------------------------------------------------
// Cash flow statement
// ---------------------------------------------------------------------------

/// Operating cash flow, indirect method. The `change_in_*` fields are
/// balance movements (positive = balance increased), not cash effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingCashFlow {
    pub net_income: Money,
    pub depreciation: Money,
    pub amortization: Money,
    pub change_in_receivables: Money,
    pub change_in_payables: Money,
    pub change_in_tax_payable: Money,
    pub change_in_escrow: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestingCashFlow {
    pub capex: Money,
    pub software_investment: Money,
    /// Negative: both items are outflows
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingCashFlow {
    pub equity_issuance: Money,
    pub partner_contributions: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub year: i32,
    pub opening_cash: Money,
    pub operating: OperatingCashFlow,
    pub investing: InvestingCashFlow,
    pub financing: FinancingCashFlow,
    pub net_change_in_cash: Money,
    pub ending_cash: Money,
    /// Ending cash agrees with the balance-sheet cash asset
    pub reconciles: bool,
    /// Ending cash minus balance-sheet cash
    pub reconciliation_difference: Money,
}

// ---------------------------------------------------------------------------
// Triangulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriangulationCheck {
    BalanceEquation,
    CashReconciliation,
    RetainedEarningsRollForward,
    EscrowConsistency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangulationError {
    pub check: TriangulationCheck,
    pub expected: Money,
    pub actual: Money,
    pub difference: Money,
    pub message: String,
}

/// Cross-statement consistency of one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangulationResult {
    pub balance_equation_holds: bool,
    pub cash_reconciles: bool,
    pub retained_earnings_roll_forward: bool,
    pub escrow_consistent: bool,
    /// No check failed. `false` means the generator is defective.
    pub valid: bool,
    pub errors: Vec<TriangulationError>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeStatementModel {
    pub year: i32,
    pub income_statement: IncomeStatement,
    pub balance_sheet: BalanceSheet,
    pub cash_flow: CashFlowStatement,
    pub triangulation: TriangulationResult,
}
