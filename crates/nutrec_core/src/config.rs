//! Analysis configuration.
//!
//! Every field defaults to the reference study: 10,000 scenarios for a camp of
//! 500 two-seat UDDT units, costs in Ugandan shillings converted at the
//! published August 2018 rate.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sampling::SamplingMethod;

/// Complete configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Monte Carlo iterations (rows per sample table)
    #[serde(default = "default_samples")]
    pub samples: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub sampling: SamplingMethod,

    #[serde(default)]
    pub currency: CurrencyConversion,

    #[serde(default)]
    pub sanitation: SanitationConfig,

    #[serde(default)]
    pub treatment: TreatmentConfig,

    #[serde(default)]
    pub fertilizer: FertilizerConfig,

    #[serde(default)]
    pub finance: FinanceConfig,

    #[serde(default)]
    pub rate_of_return: RateOfReturnConfig,
}

fn default_samples() -> usize {
    10_000
}

fn default_seed() -> u64 {
    42
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            seed: default_seed(),
            sampling: SamplingMethod::default(),
            currency: CurrencyConversion::default(),
            sanitation: SanitationConfig::default(),
            treatment: TreatmentConfig::default(),
            fertilizer: FertilizerConfig::default(),
            finance: FinanceConfig::default(),
            rate_of_return: RateOfReturnConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Check every setting once, before any sampling happens
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::ZeroSampleCount);
        }
        positive("currency.local_per_usd", self.currency.local_per_usd)?;

        let s = &self.sanitation;
        positive("sanitation.tank_capacity_l", s.tank_capacity_l)?;
        if s.tanks_per_plot == 0 {
            return Err(invalid("sanitation.tanks_per_plot", "must be at least 1"));
        }
        if s.uddt_items.is_empty() {
            return Err(invalid("sanitation.uddt_items", "must name at least one item"));
        }
        if s.pit_items.is_empty() {
            return Err(invalid("sanitation.pit_items", "must name at least one item"));
        }

        let t = &self.treatment;
        positive("treatment.tank_capacity_l", t.tank_capacity_l)?;
        positive("treatment.struvite.cycles_per_day", t.struvite.cycles_per_day)?;
        positive("treatment.struvite.reactor_volume_l", t.struvite.reactor_volume_l)?;
        positive("treatment.struvite.mg_dose", t.struvite.mg_dose)?;
        positive("treatment.struvite.filter_pack_size", t.struvite.filter_pack_size)?;
        if !(0.0..=1.0).contains(&t.struvite.p_recovery) {
            return Err(invalid("treatment.struvite.p_recovery", "must lie in [0, 1]"));
        }
        positive(
            "treatment.ion_exchange.column_loading_l_per_day",
            t.ion_exchange.column_loading_l_per_day,
        )?;

        if self.finance.lifetime_years == 0 {
            return Err(invalid("finance.lifetime_years", "must be at least 1"));
        }

        self.rate_of_return.validate()
    }
}

fn invalid(setting: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        setting,
        reason: reason.to_string(),
    }
}

fn positive(setting: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSetting {
            setting,
            reason: format!("must be positive and finite, got {value}"),
        })
    }
}

/// Fixed conversion from the local currency to USD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyConversion {
    pub currency: String,
    /// Local currency units per USD
    pub local_per_usd: f64,
    /// Publication date of the rate
    pub as_of: Date,
}

impl Default for CurrencyConversion {
    fn default() -> Self {
        Self {
            currency: "UGX".to_string(),
            local_per_usd: 3693.8,
            as_of: jiff::civil::date(2018, 8, 7),
        }
    }
}

impl CurrencyConversion {
    #[must_use]
    pub fn to_usd(&self, local: f64) -> f64 {
        local / self.local_per_usd
    }
}

/// Toilet fleet and long-term storage sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitationConfig {
    /// Two-seat UDDT units in the camp
    pub uddt_units: f64,
    pub users_per_unit: f64,
    /// Pit latrines the baseline would have built
    pub pit_units: f64,
    /// Days of urine held in storage-only systems
    pub storage_days: f64,
    pub tank_capacity_l: f64,
    /// Storage tanks fitting on one leased 50'x100' plot
    pub tanks_per_plot: u64,
    /// Catalog items composing one UDDT unit
    pub uddt_items: Vec<String>,
    /// Catalog items composing one pit latrine (slab + pit)
    pub pit_items: Vec<String>,
}

impl Default for SanitationConfig {
    fn default() -> Self {
        Self {
            uddt_units: 500.0,
            users_per_unit: 40.0,
            pit_units: 500.0,
            storage_days: 80.0,
            tank_capacity_l: 1000.0,
            tanks_per_plot: 154,
            uddt_items: vec!["D406".to_string()],
            pit_items: vec!["D402".to_string(), "D403".to_string()],
        }
    }
}

impl SanitationConfig {
    #[must_use]
    pub fn population(&self) -> f64 {
        self.uddt_units * self.users_per_unit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnesiumSource {
    /// Mg(OH)2 powder
    #[default]
    Hydroxide,
    /// MgCO3 powder
    Carbonate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StruviteConfig {
    /// Fraction of influent P precipitated
    pub p_recovery: f64,
    /// Mol N per mol P in struvite
    pub n_p_ratio: f64,
    pub cycles_per_day: f64,
    pub reactor_volume_l: f64,
    /// Mg:P molar dosing ratio
    pub mg_dose: f64,
    /// Filter bags per priced pack
    pub filter_pack_size: f64,
    pub magnesium_source: MagnesiumSource,
}

impl Default for StruviteConfig {
    fn default() -> Self {
        Self {
            p_recovery: 0.90,
            n_p_ratio: 1.0,
            cycles_per_day: 8.0,
            reactor_volume_l: 500.0,
            mg_dose: 1.1,
            filter_pack_size: 20.0,
            magnesium_source: MagnesiumSource::Hydroxide,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IonExchangeConfig {
    pub column_loading_l_per_day: f64,
    /// PVC column length, priced per foot
    pub column_length_ft: f64,
    /// 98% H2SO4 regenerant volume per gram of resin per cycle
    pub regenerant_l_per_g: f64,
}

impl Default for IonExchangeConfig {
    fn default() -> Self {
        Self {
            column_loading_l_per_day: 100.0,
            column_length_ft: 15.7 / 12.0,
            regenerant_l_per_g: 0.000135,
        }
    }
}

/// Community collection and central treatment plant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatmentConfig {
    /// Toilets served by the plant
    pub reference_flow: f64,
    pub users_per_toilet: f64,
    /// Days before community tanks are emptied
    pub community_storage_days: u32,
    /// Fraction of a day's urine held per day of storage
    pub daily_fill_fraction: f64,
    pub tank_capacity_l: f64,
    pub struvite: StruviteConfig,
    pub ion_exchange: IonExchangeConfig,
}

impl Default for TreatmentConfig {
    fn default() -> Self {
        Self {
            reference_flow: 1000.0,
            users_per_toilet: 20.0,
            community_storage_days: 3,
            daily_fill_fraction: 0.33,
            tank_capacity_l: 1000.0,
            struvite: StruviteConfig::default(),
            ion_exchange: IonExchangeConfig::default(),
        }
    }
}

impl TreatmentConfig {
    #[must_use]
    pub fn population(&self) -> f64 {
        self.reference_flow * self.users_per_toilet
    }
}

/// Nutrient content of commercial fertilizers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FertilizerConfig {
    pub sack_kg: f64,
    pub urea_n: f64,
    pub can_n: f64,
    pub ssp_p2o5: f64,
    pub tsp_p2o5: f64,
    pub kcl_k2o: f64,
    /// kg P2O5 per kg P
    pub p2o5_per_p: f64,
    /// kg K2O per kg K
    pub k2o_per_k: f64,
}

impl Default for FertilizerConfig {
    fn default() -> Self {
        Self {
            sack_kg: 50.0,
            urea_n: 0.46,
            can_n: 0.26,
            ssp_p2o5: 0.20,
            tsp_p2o5: 0.46,
            kcl_k2o: 0.60,
            p2o5_per_p: 2.29,
            k2o_per_k: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceConfig {
    /// Nominal asset lifetime and project horizon
    pub lifetime_years: u32,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self { lifetime_years: 8 }
    }
}

impl FinanceConfig {
    /// Year in which the one-off maintenance charge falls
    #[must_use]
    pub fn maintenance_year(&self) -> u32 {
        self.lifetime_years / 2
    }
}

/// Candidate prices and root-finder settings for rate-of-return curves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateOfReturnConfig {
    /// First candidate price (USD/kg)
    pub price_start: f64,
    pub price_step: f64,
    pub price_points: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub initial_guess: f64,
    /// Relative residual accepted as a root
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RateOfReturnConfig {
    fn default() -> Self {
        Self {
            price_start: 0.0,
            price_step: 0.05,
            price_points: 101,
            lower_bound: 0.0,
            upper_bound: 50.0,
            initial_guess: 1.0,
            tolerance: 1e-10,
            max_iterations: 100,
        }
    }
}

impl RateOfReturnConfig {
    /// Candidate prices, computed by index so the grid does not drift
    #[must_use]
    pub fn prices(&self) -> Vec<f64> {
        (0..self.price_points)
            .map(|j| self.price_start + j as f64 * self.price_step)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.price_points == 0 {
            return Err(invalid("rate_of_return.price_points", "must be at least 1"));
        }
        if !self.price_start.is_finite() || !self.price_step.is_finite() {
            return Err(invalid("rate_of_return.price_step", "must be finite"));
        }
        if !(self.lower_bound.is_finite()
            && self.upper_bound.is_finite()
            && self.lower_bound >= 0.0
            && self.lower_bound < self.upper_bound)
        {
            return Err(invalid(
                "rate_of_return.upper_bound",
                "bounds must satisfy 0 <= lower < upper",
            ));
        }
        if !(self.lower_bound..=self.upper_bound).contains(&self.initial_guess) {
            return Err(invalid(
                "rate_of_return.initial_guess",
                "must lie within the bounds",
            ));
        }
        positive("rate_of_return.tolerance", self.tolerance)?;
        if self.max_iterations == 0 {
            return Err(invalid("rate_of_return.max_iterations", "must be at least 1"));
        }
        Ok(())
    }
}
