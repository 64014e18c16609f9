//! Resource recovery at a central treatment plant.
//!
//! Urine from community tanks is trucked to on-site tanks, then passes
//! through struvite precipitation (P, some N) and ion exchange (N) in series.
//! The effluent of precipitation is the influent of ion exchange. Potassium
//! stays in the residual liquid, which is reused as fertilizer.

use serde::{Deserialize, Serialize};

use crate::config::{CurrencyConversion, MagnesiumSource, TreatmentConfig};
use crate::model::{CostBreakdown, CostRatios, NutrientTriple};
use crate::sizing::{community_tank_volume, units_required};

const DAYS_PER_YEAR: f64 = 365.0;
const LITERS_PER_M3: f64 = 1000.0;

/// g/mol
pub const MW_P: f64 = 30.973762;
pub const MW_N: f64 = 14.01;
pub const MW_MGOH2: f64 = 58.3197;
pub const MW_MGCO3: f64 = 84.3139;

/// Sampled inputs of the recovery model for one scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryInputs {
    /// L/cap/d
    pub urine_volume: f64,
    /// kg/cap/d reaching the plant
    pub urine_nutrients: NutrientTriple,

    /// USD per community tank
    pub cost_urine_tank1: f64,
    /// USD per on-site tank
    pub cost_urine_tank2: f64,
    /// USD/cap/d
    pub cart: f64,
    /// Local currency per m3
    pub truck: f64,

    pub cost_p_reactor: f64,
    pub material_p_stirrer: f64,
    /// Local currency per unit of stirrer material
    pub cost_p_stirrer: f64,
    pub material_p_pipe: f64,
    pub cost_p_pipe: f64,
    /// Uses per filter bag
    pub filter_reuse: f64,
    /// USD per pack of bags
    pub cost_filter_bag: f64,
    /// USD per tonne
    pub cost_mgoh2_powder: f64,
    pub cost_mgco3_powder: f64,

    /// Percent of influent N adsorbed
    pub n_rec_2: f64,
    /// USD per foot
    pub cost_pvc_column: f64,
    pub material_tubing: f64,
    pub cost_tubing: f64,
    /// USD/kg
    pub cost_resin: f64,
    /// USD per tonne
    pub cost_h2so4: f64,
    /// Uses before replacement
    pub resin_lifetime: f64,
    /// mmol N per g resin
    pub ad_density: f64,

    pub tank_ratios: CostRatios,
    pub struvite_ratios: CostRatios,
    pub ion_exchange_ratios: CostRatios,
}

/// Annualised transport costs, USD/yr
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportCosts {
    pub cart: f64,
    pub truck: f64,
}

/// Struvite train sizing and consumables
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StruviteDetail {
    pub reactors: u64,
    pub reactor_cost: f64,
    pub stirrer_cost: f64,
    pub pipe_cost: f64,
    pub daily_filter_bags: f64,
    /// USD/yr
    pub annual_filter_cost: f64,
    /// kg/d
    pub daily_mgoh2_dose: f64,
    pub annual_mgoh2_cost: f64,
    pub daily_mgco3_dose: f64,
    pub annual_mgco3_cost: f64,
}

/// Ion-exchange train sizing and consumables
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IonExchangeDetail {
    pub columns: u64,
    pub column_cost: f64,
    /// g N per L
    pub n_concentration: f64,
    pub annual_resin_cost: f64,
    pub annual_acid_cost: f64,
}

/// Cost and recovery basis of the treatment plant for one scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    /// L/d
    pub daily_urine: f64,
    pub community_tanks: u64,
    pub on_site_tanks: u64,
    pub off_site: CostBreakdown,
    pub on_site: CostBreakdown,
    pub struvite: CostBreakdown,
    pub ion_exchange: CostBreakdown,
    pub transport: TransportCosts,
    pub struvite_detail: StruviteDetail,
    pub ion_exchange_detail: IonExchangeDetail,
    /// kg/d into precipitation
    pub influent_precipitation: NutrientTriple,
    /// kg/d into ion exchange
    pub influent_ion_exchange: NutrientTriple,
    /// kg/d leaving ion exchange
    pub effluent: NutrientTriple,
    /// kg/yr
    pub annual_recovered: NutrientTriple,
}

/// Mass split of one process step, kg/d
#[derive(Debug, Clone, Copy, PartialEq)]
struct ProcessStep {
    recovered: NutrientTriple,
    effluent: NutrientTriple,
}

fn precipitate(influent: NutrientTriple, p_recovery: f64, n_p_ratio: f64) -> ProcessStep {
    let p = p_recovery * influent.p;
    // N co-precipitates with P; cannot exceed what is present
    let n = (p / MW_P * n_p_ratio * MW_N).min(influent.n.max(0.0));
    let recovered = NutrientTriple::new(n, p, 0.0);
    ProcessStep {
        recovered,
        effluent: influent - recovered,
    }
}

fn adsorb(influent: NutrientTriple, n_percent: f64) -> ProcessStep {
    let n = influent.n * n_percent.clamp(0.0, 100.0) / 100.0;
    let recovered = NutrientTriple::new(n, 0.0, 0.0);
    ProcessStep {
        recovered,
        effluent: influent - recovered,
    }
}

/// Size the plant and cost every process for one scenario
#[must_use]
pub fn recovery_costs(
    inputs: &RecoveryInputs,
    config: &TreatmentConfig,
    currency: &CurrencyConversion,
) -> RecoveryOutcome {
    let population = config.population();
    let daily_urine = inputs.urine_volume * population;

    // Community tanks and transport
    let community_volume = community_tank_volume(
        daily_urine,
        config.community_storage_days,
        config.daily_fill_fraction,
    );
    let community_tanks = units_required(community_volume, config.tank_capacity_l);
    let off_site = CostBreakdown::from_ratios(
        community_tanks as f64 * inputs.cost_urine_tank1,
        inputs.tank_ratios,
    );
    let transport = TransportCosts {
        cart: population * inputs.cart * DAYS_PER_YEAR,
        truck: daily_urine / LITERS_PER_M3 * currency.to_usd(inputs.truck) * DAYS_PER_YEAR,
    };

    // One day of urine held at the plant
    let on_site_tanks = units_required(daily_urine, config.tank_capacity_l);
    let on_site = CostBreakdown::from_ratios(
        on_site_tanks as f64 * inputs.cost_urine_tank2,
        inputs.tank_ratios,
    );

    // Struvite precipitation
    let sc = &config.struvite;
    let influent_precipitation = inputs.urine_nutrients * population;
    let step1 = precipitate(influent_precipitation, sc.p_recovery, sc.n_p_ratio);

    let reactors = units_required(daily_urine / sc.cycles_per_day, sc.reactor_volume_l);
    let n_reactors = reactors as f64;
    let reactor_cost = n_reactors * inputs.cost_p_reactor;
    let stirrer_cost =
        n_reactors * inputs.material_p_stirrer * currency.to_usd(inputs.cost_p_stirrer);
    let pipe_cost = n_reactors * inputs.material_p_pipe * inputs.cost_p_pipe;

    let daily_filter_bags = n_reactors * sc.cycles_per_day / inputs.filter_reuse;
    let annual_filter_cost =
        daily_filter_bags * (inputs.cost_filter_bag / sc.filter_pack_size) * DAYS_PER_YEAR;

    let mg_moles = influent_precipitation.p / MW_P / sc.mg_dose;
    let daily_mgoh2_dose = mg_moles * MW_MGOH2;
    let daily_mgco3_dose = mg_moles * MW_MGCO3;
    let annual_mgoh2_cost = daily_mgoh2_dose * inputs.cost_mgoh2_powder / 1000.0 * DAYS_PER_YEAR;
    let annual_mgco3_cost = daily_mgco3_dose * inputs.cost_mgco3_powder / 1000.0 * DAYS_PER_YEAR;
    let magnesium_cost = match sc.magnesium_source {
        MagnesiumSource::Hydroxide => annual_mgoh2_cost,
        MagnesiumSource::Carbonate => annual_mgco3_cost,
    };

    let mut struvite = CostBreakdown::from_ratios(
        reactor_cost + stirrer_cost + pipe_cost,
        inputs.struvite_ratios,
    );
    struvite.consumable = annual_filter_cost + magnesium_cost;

    // Ion exchange on the precipitation effluent
    let ic = &config.ion_exchange;
    let influent_ion_exchange = step1.effluent;
    let step2 = adsorb(influent_ion_exchange, inputs.n_rec_2);

    let columns = units_required(daily_urine, ic.column_loading_l_per_day);
    let column_cost = columns as f64
        * (inputs.cost_pvc_column * ic.column_length_ft
            + inputs.material_tubing * inputs.cost_tubing);

    let n_concentration = influent_ion_exchange.n / daily_urine * 1000.0;
    let resin_uses = inputs.resin_lifetime.ceil();
    let resin_per_m3 =
        inputs.cost_resin * n_concentration * 1000.0 / (resin_uses * inputs.ad_density * MW_N);
    let acid_per_m3 = (inputs.cost_h2so4 / 1000.0) * ic.regenerant_l_per_g * n_concentration * 1e6
        / (inputs.ad_density * MW_N);
    let annual_resin_cost = resin_per_m3 / LITERS_PER_M3 * daily_urine * DAYS_PER_YEAR;
    let annual_acid_cost = acid_per_m3 / LITERS_PER_M3 * daily_urine * DAYS_PER_YEAR;

    let mut ion_exchange = CostBreakdown::from_ratios(column_cost, inputs.ion_exchange_ratios);
    ion_exchange.consumable = annual_resin_cost + annual_acid_cost;

    // N and P recovered across both steps; K recovered with the residual liquid
    let effluent = step2.effluent;
    let recovered = influent_precipitation - effluent;
    let annual_recovered =
        NutrientTriple::new(recovered.n, recovered.p, effluent.k) * DAYS_PER_YEAR;

    RecoveryOutcome {
        daily_urine,
        community_tanks,
        on_site_tanks,
        off_site,
        on_site,
        struvite,
        ion_exchange,
        transport,
        struvite_detail: StruviteDetail {
            reactors,
            reactor_cost,
            stirrer_cost,
            pipe_cost,
            daily_filter_bags,
            annual_filter_cost,
            daily_mgoh2_dose,
            annual_mgoh2_cost,
            daily_mgco3_dose,
            annual_mgco3_cost,
        },
        ion_exchange_detail: IonExchangeDetail {
            columns,
            column_cost,
            n_concentration,
            annual_resin_cost,
            annual_acid_cost,
        },
        influent_precipitation,
        influent_ion_exchange,
        effluent,
        annual_recovered,
    }
}
