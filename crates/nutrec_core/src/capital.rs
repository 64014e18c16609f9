//! Construction material costs.
//!
//! The material catalog is a deterministic bill of quantities: for each
//! material line, the quantity used by each catalog item (toilet slab, pit,
//! UDDT unit, ...). Unit costs and the reuse ratio are sampled per scenario.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::CurrencyConversion;
use crate::error::ConfigError;
use crate::model::{CostBreakdown, CostRatios};

/// One material and its quantity per catalog item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    /// Column name of the sampled unit cost
    pub label: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub quantities: FxHashMap<String, f64>,
    /// Reuse weight per item. Items not listed do not reuse the material.
    #[serde(default)]
    pub reuse: FxHashMap<String, f64>,
}

impl MaterialLine {
    fn quantity(&self, item: &str) -> f64 {
        self.quantities.get(item).copied().unwrap_or(0.0)
    }

    /// Quantity multiplier from reuse; anything undefined leaves quantity unchanged
    fn reuse_multiplier(&self, item: &str, reuse_ratio: f64) -> f64 {
        match self.reuse.get(item) {
            Some(weight) => {
                let m = reuse_ratio * weight;
                if m.is_nan() { 1.0 } else { m }
            }
            None => 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialCatalog {
    /// Catalog item names, in output order
    pub items: Vec<String>,
    pub materials: Vec<MaterialLine>,
}

impl MaterialCatalog {
    pub fn has_item(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.materials.iter().map(|m| m.label.as_str())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.materials.is_empty() {
            return Err(ConfigError::InvalidSetting {
                setting: "materials",
                reason: "material catalog is empty".to_string(),
            });
        }
        for line in &self.materials {
            if let Some(item) = line.quantities.keys().find(|i| !self.has_item(i)) {
                return Err(ConfigError::InvalidSetting {
                    setting: "materials",
                    reason: format!(
                        "material '{}' lists quantities for unknown item '{item}'",
                        line.label
                    ),
                });
            }
        }
        Ok(())
    }

    /// Material cost of one item in local currency.
    ///
    /// `unit_costs` follows catalog material order. A missing or NaN unit cost
    /// counts as zero.
    #[must_use]
    pub fn item_material_cost(&self, item: &str, unit_costs: &[f64], reuse_ratio: f64) -> f64 {
        self.materials
            .iter()
            .zip(unit_costs)
            .map(|(line, &cost)| {
                let cost = if cost.is_nan() { 0.0 } else { cost };
                cost * line.quantity(item) * line.reuse_multiplier(item, reuse_ratio)
            })
            .sum()
    }

    /// Per-material cost of one item, before reuse, in local currency
    #[must_use]
    pub fn detailed_costs(&self, item: &str, unit_costs: &[f64]) -> Vec<f64> {
        self.materials
            .iter()
            .zip(unit_costs)
            .map(|(line, &cost)| {
                let cost = if cost.is_nan() { 0.0 } else { cost };
                line.quantity(item) * cost
            })
            .collect()
    }
}

/// One catalog item's material cost with its sampled ratios
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemCost {
    /// Local currency
    pub material: f64,
    pub ratios: CostRatios,
}

/// USD cost of one unit assembled from several catalog items
#[must_use]
pub fn assembly_breakdown(parts: &[ItemCost], currency: &CurrencyConversion) -> CostBreakdown {
    parts
        .iter()
        .map(|part| CostBreakdown::from_ratios(currency.to_usd(part.material), part.ratios))
        .sum()
}

/// Per-unit costs of the two toilet options
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ToiletCosts {
    pub uddt: CostBreakdown,
    /// Slab plus pit
    pub pit: CostBreakdown,
}
