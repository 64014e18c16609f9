//! Discounted cash flow break-even pricing.
//!
//! The break-even price is the revenue per kg of recovered nutrient (N+P+K)
//! at which the after-tax net present value over the asset lifetime is zero.

use serde::{Deserialize, Serialize};

use crate::error::NumericalIssue;
use crate::model::CostBreakdown;

/// Discount factors `(1 + r)^-t` for `t = 1..=lifetime`, computed once per scenario
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountSchedule {
    rate: f64,
    factors: Vec<f64>,
    maintenance_year: u32,
}

impl DiscountSchedule {
    #[must_use]
    pub fn new(rate: f64, lifetime_years: u32, maintenance_year: u32) -> Self {
        let factors = (1..=lifetime_years)
            .map(|t| (1.0 + rate).powi(-(t as i32)))
            .collect();
        Self {
            rate,
            factors,
            maintenance_year,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn lifetime(&self) -> u32 {
        self.factors.len() as u32
    }

    pub fn maintenance_year(&self) -> u32 {
        self.maintenance_year
    }

    /// `(year, factor)` pairs starting at year 1
    pub fn years(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.factors
            .iter()
            .enumerate()
            .map(|(i, &di)| (i as u32 + 1, di))
    }

    /// Sum of all factors (the annuity factor of the schedule)
    pub fn annuity(&self) -> f64 {
        self.factors.iter().sum()
    }
}

/// Costs and output of one system under one financing arrangement
#[derive(Debug, Clone, PartialEq)]
pub struct CashFlowBasis {
    /// Every asset, with payments received as negated breakdowns
    pub assets: Vec<CostBreakdown>,
    /// USD/yr
    pub land_lease: f64,
    /// kg N+P+K per year
    pub annual_nutrient_mass: f64,
}

impl CashFlowBasis {
    #[must_use]
    pub fn totals(&self) -> CostBreakdown {
        self.assets.iter().copied().sum()
    }
}

/// Break-even price with the quantities that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakEven {
    /// USD/kg
    pub price: f64,
    /// Material plus labor, USD
    pub capital: f64,
    /// Discounted after-tax ongoing flows, USD
    pub discount_total: f64,
    /// Discounted after-tax nutrient mass, kg
    pub discount_nutrient_total: f64,
}

/// Solve the zero-NPV price for an arbitrary asset set
pub fn break_even_price(
    basis: &CashFlowBasis,
    income_tax: f64,
    schedule: &DiscountSchedule,
) -> Result<BreakEven, NumericalIssue> {
    let totals = basis.totals();
    let lifetime = f64::from(schedule.lifetime());
    let capital = totals.capital();
    let depreciation = totals.material / lifetime;
    let annual_ongoing = totals.annual() + basis.land_lease;

    let mut discount_total = 0.0;
    let mut discount_nutrient_total = 0.0;
    for (year, di) in schedule.years() {
        let ongoing = if year == schedule.maintenance_year() {
            annual_ongoing + totals.maintenance
        } else {
            annual_ongoing
        };
        discount_total += di * ((ongoing + depreciation) * (1.0 - income_tax) - depreciation);
        discount_nutrient_total += di * basis.annual_nutrient_mass * (1.0 - income_tax);
    }

    if !discount_total.is_finite() {
        return Err(NumericalIssue::NonFinite("discounted cost"));
    }
    if discount_nutrient_total == 0.0 || !discount_nutrient_total.is_finite() {
        return Err(NumericalIssue::NoRecoveredNutrients);
    }

    let price = (capital + discount_total) / discount_nutrient_total;
    if !price.is_finite() {
        return Err(NumericalIssue::NonFinite("break-even price"));
    }

    Ok(BreakEven {
        price,
        capital,
        discount_total,
        discount_nutrient_total,
    })
}

/// Break-even when the implementer carries every cost
pub fn break_even_unsubsidized(
    basis: &CashFlowBasis,
    income_tax: f64,
    schedule: &DiscountSchedule,
) -> Result<BreakEven, NumericalIssue> {
    break_even_price(basis, income_tax, schedule)
}

/// Break-even when a third party pays what the baseline toilet would have cost.
///
/// The baseline enters as a payment received: its capital, yearly operation,
/// one-off maintenance and depreciation all carry a negative sign.
pub fn break_even_subsidized(
    basis: &CashFlowBasis,
    baseline: &CostBreakdown,
    income_tax: f64,
    schedule: &DiscountSchedule,
) -> Result<BreakEven, NumericalIssue> {
    let mut subsidized = basis.clone();
    subsidized.assets.push(baseline.negated());
    break_even_price(&subsidized, income_tax, schedule)
}
