//! Unit cost cascade: replays the fee, tax and payout waterfall of one sale
//! down to its contribution margin.
//!
//! This is an audit tool for the pricing model, not a statement. Amounts are
//! stored as positive magnitudes; `kind` says which way they move the
//! running total.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ChannelFees, PaymentChannels, RevenueTerms, TaxBase};
use crate::config::CascadeConfig;
use crate::error::FinPlanError;
use crate::numeric::{
    ceil_units, checked_product, format_money, format_pct, safe_divide, within_tolerance,
};
use crate::types::{Money, Rate};
use crate::FinPlanResult;

/// Step codes. Direct costs and taxes use `DIRECT:<code>` and `TAX:<code>`.
pub mod codes {
    pub const GROSS_PRICE: &str = "GROSS_PRICE";
    pub const VAT: &str = "VAT";
    pub const NET_REVENUE: &str = "NET_REVENUE";
    pub const FEE_DIGITAL: &str = "FEE_DIGITAL";
    pub const FEE_CASH: &str = "FEE_CASH";
    pub const PROVIDER_PAYOUT: &str = "PROVIDER_PAYOUT";
    pub const WITHHOLDING: &str = "WITHHOLDING";
    pub const CONTRIBUTION_MARGIN: &str = "CONTRIBUTION_MARGIN";
}

// Rounding noise allowed in the self-checks.
const AUDIT_TOLERANCE: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Inflow,
    Outflow,
    Tax,
    /// Reported for reference; does not move the running total
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCascadeStep {
    pub concept: String,
    pub code: String,
    pub kind: StepKind,
    pub formula: String,
    pub amount: Money,
    pub running_total: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// A unit count goal, or the fact that no volume reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "units")]
pub enum VolumeTarget {
    Units(Decimal),
    Unreachable,
}

impl VolumeTarget {
    pub fn units(self) -> Option<Decimal> {
        match self {
            VolumeTarget::Units(u) => Some(u),
            VolumeTarget::Unreachable => None,
        }
    }
}

/// One line of the audit checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub check: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCascade {
    pub sku: String,
    pub quantity: Decimal,
    pub digital_mix_fraction: Rate,
    pub steps: Vec<UnitCascadeStep>,
    pub contribution_margin: Money,
    pub contribution_margin_per_unit: Money,
    /// Contribution margin over net revenue
    pub contribution_margin_pct: Rate,
    pub monthly_fixed_costs: Money,
    pub break_even_units: VolumeTarget,
    pub target_volume_units: VolumeTarget,
    pub verifications: Vec<Verification>,
    pub alerts: Vec<String>,
}

impl UnitCascade {
    pub fn step(&self, code: &str) -> Option<&UnitCascadeStep> {
        self.steps.iter().find(|s| s.code == code)
    }

    pub fn amount(&self, code: &str) -> Option<Money> {
        self.step(code).map(|s| s.amount)
    }

    pub fn all_verified(&self) -> bool {
        self.verifications.iter().all(|v| v.passed)
    }
}

/// A trace request as received from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeRequest {
    pub catalog: Catalog,
    pub sku: String,
    #[serde(default = "one")]
    pub quantity: Decimal,
    pub digital_mix_fraction: Rate,
    #[serde(default)]
    pub config: CascadeConfig,
}

fn one() -> Decimal {
    Decimal::ONE
}

impl CascadeRequest {
    pub fn trace(&self) -> FinPlanResult<UnitCascade> {
        trace(
            &self.catalog,
            &self.sku,
            self.quantity,
            self.digital_mix_fraction,
            &self.config,
        )
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

struct Waterfall {
    steps: Vec<UnitCascadeStep>,
    running_total: Money,
}

impl Waterfall {
    fn push(&mut self, code: &str, concept: &str, kind: StepKind, formula: String, amount: Money) {
        match kind {
            StepKind::Inflow => self.running_total += amount,
            StepKind::Outflow | StepKind::Tax => self.running_total -= amount,
            StepKind::Info => {}
        }
        self.steps.push(UnitCascadeStep {
            concept: concept.to_string(),
            code: code.to_string(),
            kind,
            formula,
            amount,
            running_total: self.running_total,
            warning: None,
        });
    }

    fn warn_last(&mut self, warning: String) {
        if let Some(step) = self.steps.last_mut() {
            step.warning = Some(warning);
        }
    }
}

fn channel_fee(fees: &ChannelFees, gross: Money, share: Rate) -> Money {
    share * (gross * fees.percent_fee) + share * fees.fixed_fee
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Trace `quantity` units of `sku_code` sold in one transaction, with
/// `digital_mix_fraction` of the payment routed through the digital channel.
pub fn trace(
    catalog: &Catalog,
    sku_code: &str,
    quantity: Decimal,
    digital_mix_fraction: Rate,
    config: &CascadeConfig,
) -> FinPlanResult<UnitCascade> {
    catalog.validate()?;
    config.validate()?;
    if quantity <= Decimal::ZERO {
        return Err(FinPlanError::invalid(
            "quantity",
            format!("Quantity must be positive, got {quantity}"),
        ));
    }
    if digital_mix_fraction < Decimal::ZERO || digital_mix_fraction > Decimal::ONE {
        return Err(FinPlanError::invalid(
            "digital_mix_fraction",
            format!("Mix must be between 0 and 1, got {digital_mix_fraction}"),
        ));
    }
    let terms = catalog.revenue_terms(sku_code).ok_or_else(|| {
        FinPlanError::invalid("sku_code", format!("Unknown SKU '{sku_code}'"))
    })?;

    let mix = digital_mix_fraction;
    let cash_share = Decimal::ONE - mix;
    let channels = &catalog.channels;
    let fee_limit = config.fee_warning_pct;
    let mut alerts = Vec::new();
    let mut w = Waterfall {
        steps: Vec::new(),
        running_total: Decimal::ZERO,
    };

    // -- Revenue ----------------------------------------------------------------
    let gross = checked_product("quantity", terms.unit_price, quantity)?;
    w.push(
        codes::GROSS_PRICE,
        "Gross price",
        StepKind::Inflow,
        format!("{} x {quantity}", format_money(terms.unit_price)),
        gross,
    );

    let net_revenue = gross / (Decimal::ONE + terms.vat_rate);
    let vat = gross - net_revenue;
    w.push(
        codes::VAT,
        "VAT",
        StepKind::Tax,
        format!("gross - gross / (1 + {})", terms.vat_rate),
        vat,
    );
    w.push(
        codes::NET_REVENUE,
        "Net revenue",
        StepKind::Info,
        format!("gross / (1 + {})", terms.vat_rate),
        net_revenue,
    );

    // -- Payment channel fees -------------------------------------------------------
    let fee_steps = [
        (codes::FEE_DIGITAL, "Digital payment fee", &channels.digital, mix, "mix"),
        (codes::FEE_CASH, "Cash payment fee", &channels.cash, cash_share, "(1 - mix)"),
    ];
    for (code, concept, fees, share, share_label) in fee_steps {
        let fee = channel_fee(fees, gross, share);
        w.push(
            code,
            concept,
            StepKind::Outflow,
            format!(
                "{share_label} x (gross x {} + {})",
                fees.percent_fee,
                format_money(fees.fixed_fee)
            ),
            fee,
        );
        if fee > gross * fee_limit {
            let warning = format!(
                "{concept} is {} of the gross price, above the {} limit",
                format_pct(safe_divide(fee, gross)),
                format_pct(fee_limit)
            );
            w.warn_last(warning.clone());
            alerts.push(warning);
        }
    }

    // -- Provider ---------------------------------------------------------------------
    let payout = net_revenue * terms.provider_payout_rate;
    w.push(
        codes::PROVIDER_PAYOUT,
        "Provider payout",
        StepKind::Outflow,
        format!("net revenue x {}", terms.provider_payout_rate),
        payout,
    );
    let withholding = payout * terms.withholding_rate;
    w.push(
        codes::WITHHOLDING,
        "Withholding on payout",
        StepKind::Info,
        format!("provider payout x {}", terms.withholding_rate),
        withholding,
    );

    // -- Direct costs and taxes ---------------------------------------------------------
    for (entry, per_unit) in catalog.direct_costs_for(sku_code) {
        let cost = checked_product("quantity", per_unit, quantity)?;
        w.push(
            &format!("DIRECT:{}", entry.code),
            &entry.name,
            StepKind::Outflow,
            format!("{} x {quantity}", format_money(per_unit)),
            cost,
        );
    }

    let commission = net_revenue - payout;
    for (entry, rate, base) in catalog.taxes() {
        let (base_amount, base_label) = match base {
            TaxBase::GrossPrice => (gross, "gross"),
            TaxBase::NetRevenue => (net_revenue, "net revenue"),
            TaxBase::Commission => (commission, "net revenue - provider payout"),
        };
        w.push(
            &format!("TAX:{}", entry.code),
            &entry.name,
            StepKind::Tax,
            format!("{base_label} x {rate}"),
            base_amount * rate,
        );
    }

    // -- Margin ---------------------------------------------------------------------------
    let contribution_margin = w.running_total;
    w.push(
        codes::CONTRIBUTION_MARGIN,
        "Contribution margin",
        StepKind::Info,
        "gross - taxes - fees - payout - direct costs".into(),
        contribution_margin,
    );

    let cm_per_unit = contribution_margin / quantity;
    let net_per_unit = net_revenue / quantity;
    let contribution_margin_pct = safe_divide(contribution_margin, net_revenue);
    let monthly_fixed_costs = catalog.monthly_fixed_costs();

    let break_even_units = volume_for(monthly_fixed_costs, cm_per_unit);
    let target_volume_units = volume_for(
        monthly_fixed_costs,
        cm_per_unit - config.target_margin_pct * net_per_unit,
    );

    if contribution_margin < Decimal::ZERO {
        alerts.push(format!(
            "Each unit loses {} before fixed costs",
            format_money(-cm_per_unit)
        ));
    }
    if break_even_units == VolumeTarget::Unreachable {
        alerts.push("Break-even is unreachable: contribution margin per unit is not positive".into());
    }
    if contribution_margin_pct < config.target_margin_pct {
        alerts.push(format!(
            "Contribution margin of {} is below the {} target",
            format_pct(contribution_margin_pct),
            format_pct(config.target_margin_pct)
        ));
    }

    let verifications = verify(&w.steps, &terms, channels, mix);
    for v in verifications.iter().filter(|v| !v.passed) {
        alerts.push(format!("Verification failed: {}", v.check));
    }

    log::debug!(
        "unit cascade for {sku_code}: contribution margin {} ({})",
        format_money(contribution_margin),
        format_pct(contribution_margin_pct)
    );

    Ok(UnitCascade {
        sku: sku_code.to_string(),
        quantity,
        digital_mix_fraction: mix,
        steps: w.steps,
        contribution_margin,
        contribution_margin_per_unit: cm_per_unit,
        contribution_margin_pct,
        monthly_fixed_costs,
        break_even_units,
        target_volume_units,
        verifications,
        alerts,
    })
}

/// Audit a finished waterfall using nothing but its steps. Each expected
/// amount is rebuilt from the step it is based on, so a step taken on the
/// wrong base, at the wrong rate, or left out of the running total fails
/// its check.
pub fn verify(
    steps: &[UnitCascadeStep],
    terms: &RevenueTerms,
    channels: &PaymentChannels,
    digital_mix_fraction: Rate,
) -> Vec<Verification> {
    let amount_of = |code: &str| {
        steps
            .iter()
            .find(|s| s.code == code)
            .map_or(Decimal::ZERO, |s| s.amount)
    };
    let gross = amount_of(codes::GROSS_PRICE);
    let vat = amount_of(codes::VAT);
    let net_revenue = amount_of(codes::NET_REVENUE);
    let payout = amount_of(codes::PROVIDER_PAYOUT);

    // A channel's fee base is its own share of the gross price.
    let expected_fee = |fees: &ChannelFees, share: Rate| {
        (gross * share) * fees.percent_fee + share * fees.fixed_fee
    };
    let cash_share = Decimal::ONE - digital_mix_fraction;

    let mut replayed = Decimal::ZERO;
    let mut replays = true;
    for step in steps {
        match step.kind {
            StepKind::Inflow => replayed += step.amount,
            StepKind::Outflow | StepKind::Tax => replayed -= step.amount,
            StepKind::Info => {}
        }
        replays &= within_tolerance(step.running_total, replayed, AUDIT_TOLERANCE);
    }
    replays &= within_tolerance(
        amount_of(codes::CONTRIBUTION_MARGIN),
        replayed,
        AUDIT_TOLERANCE,
    );

    vec![
        Verification {
            check: "VAT extracted from the VAT-inclusive price".into(),
            passed: within_tolerance(vat + net_revenue, gross, AUDIT_TOLERANCE)
                && within_tolerance(vat, net_revenue * terms.vat_rate, AUDIT_TOLERANCE),
        },
        Verification {
            check: "Digital fee applied only to digital-channel volume".into(),
            passed: within_tolerance(
                amount_of(codes::FEE_DIGITAL),
                expected_fee(&channels.digital, digital_mix_fraction),
                AUDIT_TOLERANCE,
            ),
        },
        Verification {
            check: "Cash fee applied only to cash-channel volume".into(),
            passed: within_tolerance(
                amount_of(codes::FEE_CASH),
                expected_fee(&channels.cash, cash_share),
                AUDIT_TOLERANCE,
            ),
        },
        Verification {
            check: "Provider payout based on net revenue".into(),
            passed: within_tolerance(
                payout,
                net_revenue * terms.provider_payout_rate,
                AUDIT_TOLERANCE,
            ),
        },
        Verification {
            check: "Withholding base is the provider payout".into(),
            passed: within_tolerance(
                amount_of(codes::WITHHOLDING),
                payout * terms.withholding_rate,
                AUDIT_TOLERANCE,
            ),
        },
        Verification {
            check: "Running total replays every step down to the contribution margin".into(),
            passed: replays,
        },
    ]
}

/// Units needed for `margin_per_unit` to cover `fixed_costs`.
fn volume_for(fixed_costs: Money, margin_per_unit: Money) -> VolumeTarget {
    if margin_per_unit <= Decimal::ZERO {
        return VolumeTarget::Unreachable;
    }
    VolumeTarget::Units(ceil_units(fixed_costs / margin_per_unit))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
