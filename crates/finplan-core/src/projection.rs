//! Annual projection inputs.
//!
//! The per-SKU monthly aggregation lives upstream; the engine only consumes
//! its output through [`ProjectionProvider`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::FinPlanError;
use crate::numeric::safe_divide;
use crate::types::{Money, Rate};
use crate::FinPlanResult;

const MONTHS_IN_YEAR: usize = 12;

/// One month of aggregated revenue and cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProjection {
    /// Calendar month, 1-12
    pub month: u32,
    pub gross_revenue: Money,
    pub direct_cost: Money,
    pub opex: Money,
    pub ebitda: Money,
}

/// One fiscal year of aggregated revenue and cost, as produced upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualProjection {
    pub year: i32,
    pub months: Vec<MonthlyProjection>,
    pub gross_revenue: Money,
    pub direct_cost: Money,
    pub opex: Money,
    pub ebitda: Money,
    /// (revenue - direct cost) / revenue, 0 when revenue is 0
    pub gross_margin_pct: Rate,
    /// EBITDA / revenue, 0 when revenue is 0
    pub ebitda_margin_pct: Rate,
}

impl AnnualProjection {
    /// Build annual totals from exactly twelve monthly records.
    pub fn from_months(year: i32, months: Vec<MonthlyProjection>) -> FinPlanResult<Self> {
        if months.len() != MONTHS_IN_YEAR {
            return Err(FinPlanError::invalid(
                "months",
                format!("Expected 12 monthly records, got {}", months.len()),
            ));
        }

        let gross_revenue: Money = months.iter().map(|m| m.gross_revenue).sum();
        let direct_cost: Money = months.iter().map(|m| m.direct_cost).sum();
        let opex: Money = months.iter().map(|m| m.opex).sum();
        let ebitda: Money = months.iter().map(|m| m.ebitda).sum();

        Ok(Self {
            year,
            gross_margin_pct: safe_divide(gross_revenue - direct_cost, gross_revenue),
            ebitda_margin_pct: safe_divide(ebitda, gross_revenue),
            months,
            gross_revenue,
            direct_cost,
            opex,
            ebitda,
        })
    }

    /// Build a projection from annual totals, spreading them evenly across
    /// the twelve months. Totals are kept exactly as given.
    pub fn from_totals(year: i32, gross_revenue: Money, direct_cost: Money, opex: Money) -> Self {
        let twelve = Decimal::from(MONTHS_IN_YEAR as u32);
        let ebitda = gross_revenue - direct_cost - opex;
        let months = (1..=MONTHS_IN_YEAR as u32)
            .map(|month| MonthlyProjection {
                month,
                gross_revenue: gross_revenue / twelve,
                direct_cost: direct_cost / twelve,
                opex: opex / twelve,
                ebitda: ebitda / twelve,
            })
            .collect();

        Self {
            year,
            months,
            gross_revenue,
            direct_cost,
            opex,
            ebitda,
            gross_margin_pct: safe_divide(gross_revenue - direct_cost, gross_revenue),
            ebitda_margin_pct: safe_divide(ebitda, gross_revenue),
        }
    }

    /// Average monthly gross revenue.
    pub fn monthly_revenue(&self) -> Money {
        self.gross_revenue / Decimal::from(MONTHS_IN_YEAR as u32)
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Source of annual projections. Returning `None` means the year has no data
/// and will not be computed.
pub trait ProjectionProvider {
    fn projection(&self, year: i32) -> Option<AnnualProjection>;
}

impl<F> ProjectionProvider for F
where
    F: Fn(i32) -> Option<AnnualProjection>,
{
    fn projection(&self, year: i32) -> Option<AnnualProjection> {
        self(year)
    }
}

/// Projections held in memory, keyed by year.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticProjections {
    years: BTreeMap<i32, AnnualProjection>,
}

impl StaticProjections {
    pub fn new(projections: impl IntoIterator<Item = AnnualProjection>) -> Self {
        Self {
            years: projections.into_iter().map(|p| (p.year, p)).collect(),
        }
    }

    pub fn insert(&mut self, projection: AnnualProjection) {
        self.years.insert(projection.year, projection);
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }
}

impl ProjectionProvider for StaticProjections {
    fn projection(&self, year: i32) -> Option<AnnualProjection> {
        self.years.get(&year).cloned()
    }
}
