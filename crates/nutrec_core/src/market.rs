//! Fertilizer market value of recovered nutrients.
//!
//! Sack prices in local currency become USD per kg of pure nutrient, then a
//! blended price is weighted by the N:P:K mix a system actually recovers.

use serde::{Deserialize, Serialize};

use crate::config::{CurrencyConversion, FertilizerConfig};
use crate::error::NumericalIssue;
use crate::model::NutrientTriple;

/// Sampled sack prices, local currency per sack
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FertilizerPrices {
    pub urea: f64,
    /// Calcium ammonium nitrate
    pub can: f64,
    /// Single superphosphate
    pub ssp: f64,
    /// Triple superphosphate
    pub tsp: f64,
    /// Potassium chloride
    pub kcl: f64,
}

/// USD per kg of nutrient for each commercial product
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketValue {
    pub urea_n: f64,
    pub can_n: f64,
    pub ssp_p: f64,
    pub tsp_p: f64,
    pub kcl_k: f64,
}

/// Blended price for one recovered mix, USD/kg
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedMarketValue {
    pub n: f64,
    pub p: f64,
    pub k: f64,
    pub total: f64,
}

impl MarketValue {
    /// Missing prices count as zero
    #[must_use]
    pub fn from_prices(
        prices: &FertilizerPrices,
        fertilizer: &FertilizerConfig,
        currency: &CurrencyConversion,
    ) -> Self {
        let per_kg = |sack: f64, content: f64| {
            let sack = if sack.is_nan() { 0.0 } else { sack };
            currency.to_usd(sack) / content / fertilizer.sack_kg
        };
        Self {
            urea_n: per_kg(prices.urea, fertilizer.urea_n),
            can_n: per_kg(prices.can, fertilizer.can_n),
            ssp_p: fertilizer.p2o5_per_p * per_kg(prices.ssp, fertilizer.ssp_p2o5),
            tsp_p: fertilizer.p2o5_per_p * per_kg(prices.tsp, fertilizer.tsp_p2o5),
            kcl_k: fertilizer.k2o_per_k * per_kg(prices.kcl, fertilizer.kcl_k2o),
        }
    }

    /// Weight CAN, SSP and KCl prices by the share of each nutrient recovered
    pub fn weighted(&self, recovered: NutrientTriple) -> Result<WeightedMarketValue, NumericalIssue> {
        let total = recovered.total();
        if total == 0.0 || !total.is_finite() {
            return Err(NumericalIssue::NoRecoveredNutrients);
        }
        let n = recovered.n / total * self.can_n;
        let p = recovered.p / total * self.ssp_p;
        let k = recovered.k / total * self.kcl_k;
        Ok(WeightedMarketValue {
            n,
            p,
            k,
            total: n + p + k,
        })
    }
}
