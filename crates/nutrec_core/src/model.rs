//! Value types shared by every stage

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Nitrogen, phosphorus and potassium quantities with a common unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTriple {
    pub n: f64,
    pub p: f64,
    pub k: f64,
}

impl NutrientTriple {
    #[must_use]
    pub const fn new(n: f64, p: f64, k: f64) -> Self {
        Self { n, p, k }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.n + self.p + self.k
    }

    #[must_use]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.n), f(self.p), f(self.k))
    }

    #[must_use]
    pub fn zip_with(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::new(f(self.n, other.n), f(self.p, other.p), f(self.k, other.k))
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.n.is_finite() && self.p.is_finite() && self.k.is_finite()
    }
}

impl Mul<f64> for NutrientTriple {
    type Output = NutrientTriple;

    fn mul(self, rhs: f64) -> Self::Output {
        self.map(|v| v * rhs)
    }
}

impl Sub for NutrientTriple {
    type Output = NutrientTriple;

    fn sub(self, rhs: Self) -> Self::Output {
        self.zip_with(rhs, |a, b| a - b)
    }
}

/// Per-asset cost record in USD.
///
/// `operating` and `consumable` are annual; `maintenance` is a one-off charge
/// at half the asset lifetime. Negative values are payments received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub material: f64,
    pub labor: f64,
    pub operating: f64,
    pub maintenance: f64,
    pub consumable: f64,
}

impl CostBreakdown {
    /// Material plus construction labor
    #[must_use]
    pub fn capital(&self) -> f64 {
        self.material + self.labor
    }

    /// Recurring yearly outlay
    #[must_use]
    pub fn annual(&self) -> f64 {
        self.operating + self.consumable
    }

    /// Flip the sign so the breakdown counts as a payment received
    #[must_use]
    pub fn negated(&self) -> Self {
        *self * -1.0
    }

    /// Costs derived from material by fixed ratios
    #[must_use]
    pub fn from_ratios(material: f64, ratios: CostRatios) -> Self {
        Self {
            material,
            labor: material * ratios.labor,
            operating: material * ratios.operating,
            maintenance: material * ratios.maintenance,
            consumable: 0.0,
        }
    }
}

impl Add for CostBreakdown {
    type Output = CostBreakdown;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            material: self.material + rhs.material,
            labor: self.labor + rhs.labor,
            operating: self.operating + rhs.operating,
            maintenance: self.maintenance + rhs.maintenance,
            consumable: self.consumable + rhs.consumable,
        }
    }
}

impl Mul<f64> for CostBreakdown {
    type Output = CostBreakdown;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            material: self.material * rhs,
            labor: self.labor * rhs,
            operating: self.operating * rhs,
            maintenance: self.maintenance * rhs,
            consumable: self.consumable * rhs,
        }
    }
}

impl std::iter::Sum for CostBreakdown {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(CostBreakdown::default(), Add::add)
    }
}

/// Sampled labor/operating/maintenance multipliers of material cost
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostRatios {
    pub labor: f64,
    pub operating: f64,
    pub maintenance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Uddt,
    StorageTank,
    OffSiteTank,
    OnSiteTank,
    Struvite,
    IonExchange,
}

/// Sanitation system layouts under evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemKind {
    /// UDDTs with long-term urine storage, no treatment
    StorageOnly,
    /// UDDTs with struvite precipitation and ion exchange
    FullTreatment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Financing {
    Unsubsidized,
    /// A third party pays what the pit latrine baseline would have cost
    Subsidized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioCase {
    pub system: SystemKind,
    pub financing: Financing,
}

impl ScenarioCase {
    pub const ALL: [ScenarioCase; 4] = [
        ScenarioCase::new(SystemKind::StorageOnly, Financing::Unsubsidized),
        ScenarioCase::new(SystemKind::StorageOnly, Financing::Subsidized),
        ScenarioCase::new(SystemKind::FullTreatment, Financing::Unsubsidized),
        ScenarioCase::new(SystemKind::FullTreatment, Financing::Subsidized),
    ];

    #[must_use]
    pub const fn new(system: SystemKind, financing: Financing) -> Self {
        Self { system, financing }
    }

    /// Stable identifier used for column and sheet names
    pub fn key(&self) -> &'static str {
        match (self.system, self.financing) {
            (SystemKind::StorageOnly, Financing::Unsubsidized) => "storage_only_unsubsidized",
            (SystemKind::StorageOnly, Financing::Subsidized) => "storage_only_subsidized",
            (SystemKind::FullTreatment, Financing::Unsubsidized) => "full_treatment_unsubsidized",
            (SystemKind::FullTreatment, Financing::Subsidized) => "full_treatment_subsidized",
        }
    }
}

impl fmt::Display for ScenarioCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
