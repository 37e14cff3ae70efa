//! Pricing and cost catalog consumed by the unit cost cascade.
//!
//! Each entry shares a code and name; the kind-specific fields live in a
//! closed set of variants so a revenue line can never carry a tax base and a
//! tax can never carry a unit price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FinPlanError;
use crate::types::{Money, Rate};
use crate::FinPlanResult;

/// Base on which a catalog tax is levied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxBase {
    /// VAT-inclusive price paid by the customer
    GrossPrice,
    /// Price net of VAT
    NetRevenue,
    /// Net revenue minus the provider payout (the company's own commission)
    Commission,
}

/// Kind-specific data of a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EntryKind {
    /// A sellable service; the entry code is the SKU.
    Revenue {
        /// Price per unit, VAT included
        unit_price: Money,
        vat_rate: Rate,
        /// Share of net revenue paid out to the service provider
        provider_payout_rate: Rate,
        /// Withholding retained from the provider payout
        withholding_rate: Rate,
    },
    /// Variable cost per unit. Applies to every SKU when `sku` is `None`.
    DirectCost {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sku: Option<String>,
        per_unit: Money,
    },
    /// Fixed monthly operating expense.
    Opex { monthly_amount: Money },
    /// Transaction tax applied to every SKU.
    Tax { rate: Rate, base: TaxBase },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: EntryKind,
}

/// Fee structure of one payment channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFees {
    /// Percentage fee on the gross transaction amount
    pub percent_fee: Rate,
    /// Fixed surcharge per transaction
    pub fixed_fee: Money,
}

/// Digital (cards, wallets, transfers) and cash/rural-agent channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentChannels {
    pub digital: ChannelFees,
    pub cash: ChannelFees,
}

/// A revenue line resolved from the catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevenueTerms {
    pub unit_price: Money,
    pub vat_rate: Rate,
    pub provider_payout_rate: Rate,
    pub withholding_rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    pub channels: PaymentChannels,
}

impl Catalog {
    /// Check rates and amounts of every entry.
    pub fn validate(&self) -> FinPlanResult<()> {
        for entry in &self.entries {
            match &entry.kind {
                EntryKind::Revenue {
                    unit_price,
                    vat_rate,
                    provider_payout_rate,
                    withholding_rate,
                } => {
                    validate_amount(&entry.code, "unit_price", *unit_price)?;
                    validate_rate(&entry.code, "vat_rate", *vat_rate)?;
                    validate_rate(&entry.code, "provider_payout_rate", *provider_payout_rate)?;
                    validate_rate(&entry.code, "withholding_rate", *withholding_rate)?;
                }
                EntryKind::DirectCost { per_unit, .. } => {
                    validate_amount(&entry.code, "per_unit", *per_unit)?;
                }
                EntryKind::Opex { monthly_amount } => {
                    validate_amount(&entry.code, "monthly_amount", *monthly_amount)?;
                }
                EntryKind::Tax { rate, .. } => validate_rate(&entry.code, "rate", *rate)?,
            }
        }
        for (label, fees) in [("digital", &self.channels.digital), ("cash", &self.channels.cash)] {
            validate_rate(label, "percent_fee", fees.percent_fee)?;
            validate_amount(label, "fixed_fee", fees.fixed_fee)?;
        }
        Ok(())
    }

    pub fn revenue_terms(&self, sku: &str) -> Option<RevenueTerms> {
        self.entries.iter().find_map(|e| match e.kind {
            EntryKind::Revenue {
                unit_price,
                vat_rate,
                provider_payout_rate,
                withholding_rate,
            } if e.code == sku => Some(RevenueTerms {
                unit_price,
                vat_rate,
                provider_payout_rate,
                withholding_rate,
            }),
            _ => None,
        })
    }

    /// Direct costs applying to `sku`, in catalog order.
    pub fn direct_costs_for<'a>(
        &'a self,
        sku: &'a str,
    ) -> impl Iterator<Item = (&'a CatalogEntry, Money)> + 'a {
        self.entries.iter().filter_map(move |e| match &e.kind {
            EntryKind::DirectCost { sku: scope, per_unit } => match scope {
                Some(s) if s != sku => None,
                _ => Some((e, *per_unit)),
            },
            _ => None,
        })
    }

    /// Catalog taxes, in catalog order.
    pub fn taxes(&self) -> impl Iterator<Item = (&CatalogEntry, Rate, TaxBase)> + '_ {
        self.entries.iter().filter_map(|e| match e.kind {
            EntryKind::Tax { rate, base } => Some((e, rate, base)),
            _ => None,
        })
    }

    /// Sum of fixed monthly operating expenses.
    pub fn monthly_fixed_costs(&self) -> Money {
        self.entries
            .iter()
            .map(|e| match e.kind {
                EntryKind::Opex { monthly_amount } => monthly_amount,
                _ => Decimal::ZERO,
            })
            .sum()
    }
}

fn validate_rate(code: &str, field: &str, value: Rate) -> FinPlanResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(FinPlanError::invalid(
            &format!("{code}.{field}"),
            format!("Rate must be between 0 and 1, got {value}"),
        ));
    }
    Ok(())
}

fn validate_amount(code: &str, field: &str, value: Money) -> FinPlanResult<()> {
    if value < Decimal::ZERO {
        return Err(FinPlanError::invalid(
            &format!("{code}.{field}"),
            format!("Value must be non-negative, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Catalog {
        Catalog {
            entries: vec![
                CatalogEntry {
                    code: "CLEAN-STD".into(),
                    name: "Standard cleaning".into(),
                    kind: EntryKind::Revenue {
                        unit_price: dec!(119_000),
                        vat_rate: dec!(0.19),
                        provider_payout_rate: dec!(0.70),
                        withholding_rate: dec!(0.04),
                    },
                },
                CatalogEntry {
                    code: "INS".into(),
                    name: "Service insurance".into(),
                    kind: EntryKind::DirectCost {
                        sku: None,
                        per_unit: dec!(1_500),
                    },
                },
                CatalogEntry {
                    code: "KIT".into(),
                    name: "Deep-clean kit".into(),
                    kind: EntryKind::DirectCost {
                        sku: Some("CLEAN-DEEP".into()),
                        per_unit: dec!(8_000),
                    },
                },
                CatalogEntry {
                    code: "RENT".into(),
                    name: "Office rent".into(),
                    kind: EntryKind::Opex {
                        monthly_amount: dec!(4_000_000),
                    },
                },
                CatalogEntry {
                    code: "ICA".into(),
                    name: "Municipal turnover tax".into(),
                    kind: EntryKind::Tax {
                        rate: dec!(0.00966),
                        base: TaxBase::NetRevenue,
                    },
                },
            ],
            channels: PaymentChannels {
                digital: ChannelFees {
                    percent_fee: dec!(0.0299),
                    fixed_fee: dec!(900),
                },
                cash: ChannelFees {
                    percent_fee: dec!(0.015),
                    fixed_fee: dec!(2_500),
                },
            },
        }
    }

    #[test]
    fn test_lookup_revenue_terms() {
        let c = sample();
        let terms = c.revenue_terms("CLEAN-STD").unwrap();
        assert_eq!(terms.unit_price, dec!(119_000));
        assert!(c.revenue_terms("INS").is_none());
        assert!(c.revenue_terms("NOPE").is_none());
    }

    #[test]
    fn test_direct_costs_respect_sku_scope() {
        let c = sample();
        let codes: Vec<&str> = c
            .direct_costs_for("CLEAN-STD")
            .map(|(e, _)| e.code.as_str())
            .collect();
        assert_eq!(codes, vec!["INS"]);
        assert_eq!(c.direct_costs_for("CLEAN-DEEP").count(), 2);
    }

    #[test]
    fn test_monthly_fixed_costs() {
        assert_eq!(sample().monthly_fixed_costs(), dec!(4_000_000));
    }

    #[test]
    fn test_tagged_json_shape() {
        let json = r#"{
            "code": "ICA", "name": "Municipal turnover tax",
            "kind": "Tax", "rate": "0.01", "base": "NetRevenue"
        }"#;
        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(
            entry.kind,
            EntryKind::Tax {
                rate: dec!(0.01),
                base: TaxBase::NetRevenue
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_rate() {
        let mut c = sample();
        c.channels.digital.percent_fee = dec!(1.5);
        assert!(c.validate().is_err());
        assert!(sample().validate().is_ok());
    }
}
