//! Financial health alerts and the unit cost cascade audit.

pub mod alerts;
pub mod unit_cascade;

pub use alerts::{
    consecutive_negative_cash_months, consecutive_negative_months, evaluate, evaluate_at,
    runway_months, sort_by_severity, Alert, AlertCategory, AlertInputs, BalanceSheetStatus,
    KpiSnapshot, Severity, UnitEconomics,
};
pub use unit_cascade::{
    codes, trace, verify, CascadeRequest, StepKind, UnitCascade, UnitCascadeStep, Verification,
    VolumeTarget,
};
