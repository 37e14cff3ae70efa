use super::model::{
    BalanceSheet, CarryForwardState, CashFlowStatement, IncomeStatement, TriangulationCheck,
    TriangulationError, TriangulationResult,
};
use crate::numeric::format_money;
use crate::types::Money;

/// Cross-check the three statements of one year against each other and the
/// opening balances they were built from.
///
/// Every check recomputes its totals from line items instead of trusting the
/// `balanced` / `reconciles` flags stored on the statements.
pub fn triangulate(
    income: &IncomeStatement,
    balance: &BalanceSheet,
    cash_flow: &CashFlowStatement,
    opening: &CarryForwardState,
    tolerance: Money,
) -> TriangulationResult {
    let mut errors = Vec::new();

    // -- Assets = Liabilities + Equity ---------------------------------------
    let assets = balance.assets.current.cash
        + balance.assets.current.receivables
        + balance.assets.non_current.net_fixed_assets
        + balance.assets.non_current.net_software;
    let liabilities = balance.liabilities.payables
        + balance.liabilities.escrow_liability
        + balance.liabilities.tax_payable;
    let equity = balance.equity.paid_in_capital
        + balance.equity.legal_reserve
        + balance.equity.retained_earnings
        + balance.equity.net_income;
    let balance_equation_holds = check(
        &mut errors,
        TriangulationCheck::BalanceEquation,
        liabilities + equity,
        assets,
        tolerance,
        "Total assets do not equal liabilities plus equity",
    );

    // -- Cash flow ending cash = balance sheet cash --------------------------
    let cf_ending = cash_flow.opening_cash
        + cash_flow.operating.total
        + cash_flow.investing.total
        + cash_flow.financing.total;
    let mut cash_reconciles = check(
        &mut errors,
        TriangulationCheck::CashReconciliation,
        balance.assets.current.cash,
        cf_ending,
        tolerance,
        "Cash flow ending cash does not match balance sheet cash",
    );
    cash_reconciles &= check(
        &mut errors,
        TriangulationCheck::CashReconciliation,
        opening.cash,
        cash_flow.opening_cash,
        tolerance,
        "Cash flow opening cash does not match the prior year's closing cash",
    );

    // -- Net income -> retained earnings --------------------------------------
    let mut roll_forward = check(
        &mut errors,
        TriangulationCheck::RetainedEarningsRollForward,
        opening.retained_earnings,
        balance.equity.retained_earnings,
        tolerance,
        "Opening retained earnings differ from cumulative prior net income",
    );
    let earned_equity = balance.equity.total
        - balance.equity.paid_in_capital
        - balance.equity.legal_reserve
        - opening.retained_earnings;
    roll_forward &= check(
        &mut errors,
        TriangulationCheck::RetainedEarningsRollForward,
        income.net_income,
        earned_equity,
        tolerance,
        "Equity growth from earnings differs from income statement net income",
    );
    roll_forward &= check(
        &mut errors,
        TriangulationCheck::RetainedEarningsRollForward,
        income.net_income,
        cash_flow.operating.net_income,
        tolerance,
        "Cash flow does not start from income statement net income",
    );

    // -- Escrow liability movement = cash flow escrow delta -------------------
    let escrow_movement = balance.liabilities.escrow_liability - opening.escrow_balance;
    let escrow_consistent = check(
        &mut errors,
        TriangulationCheck::EscrowConsistency,
        escrow_movement,
        cash_flow.operating.change_in_escrow,
        tolerance,
        "Escrow liability movement differs from cash flow escrow delta",
    );

    TriangulationResult {
        balance_equation_holds,
        cash_reconciles,
        retained_earnings_roll_forward: roll_forward,
        escrow_consistent,
        valid: errors.is_empty(),
        errors,
    }
}

fn check(
    errors: &mut Vec<TriangulationError>,
    kind: TriangulationCheck,
    expected: Money,
    actual: Money,
    tolerance: Money,
    what: &str,
) -> bool {
    let difference = actual - expected;
    if difference.abs() <= tolerance {
        return true;
    }
    errors.push(TriangulationError {
        check: kind,
        expected,
        actual,
        difference,
        message: format!(
            "{what}: expected {}, got {} (difference {})",
            format_money(expected),
            format_money(actual),
            format_money(difference)
        ),
    });
    false
}
