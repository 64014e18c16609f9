//! Per-scenario input records assembled from stored sample sheets.
//!
//! Every column is read back through the [`TableStore`], checked for exactly
//! `N` rows, and every sheet's iteration column is checked to run `0..N` in
//! order. Row `i` of every column then becomes field values of record `i`.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::capital::MaterialCatalog;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::market::FertilizerPrices;
use crate::model::{CostRatios, NutrientTriple};
use crate::nutrients::{DietInputs, StageEfficiencies};
use crate::recovery::RecoveryInputs;
use crate::schema::*;
use crate::store::{ITERATION_COLUMN, TableStore, check_iteration_order, check_len};

/// Every sampled value one scenario needs, by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInputs {
    pub iteration: usize,
    pub diet: DietInputs,
    pub efficiencies: StageEfficiencies,
    /// Local currency, in material catalog order
    pub unit_costs: Vec<f64>,
    pub reuse_ratio: f64,
    /// One entry per UDDT item, in configured order
    pub uddt_ratios: Vec<CostRatios>,
    /// One entry per pit latrine item, in configured order
    pub pit_ratios: Vec<CostRatios>,
    /// Plant inputs; `urine_nutrients` is filled by the nutrient model
    pub recovery: RecoveryInputs,
    /// USD per plot per year
    pub lease: f64,
    pub fertilizer: FertilizerPrices,
    pub income_tax: f64,
    pub discount_rate: f64,
}

/// Column reader enforcing the iteration-index join
struct SampleReader<'a, S: TableStore + ?Sized> {
    store: &'a S,
    samples: usize,
    checked: FxHashSet<String>,
}

impl<'a, S: TableStore + ?Sized> SampleReader<'a, S> {
    fn new(store: &'a S, samples: usize) -> Self {
        Self {
            store,
            samples,
            checked: FxHashSet::default(),
        }
    }

    fn column(&mut self, group: &str, label: &str) -> Result<Vec<f64>> {
        let sheet = format!("{SAMPLES_TABLE}/{group}");
        if !self.checked.contains(group) {
            let iterations = self.store.read(SAMPLES_TABLE, group, ITERATION_COLUMN)?;
            check_iteration_order(&sheet, &iterations, self.samples)?;
            self.checked.insert(group.to_string());
        }
        let values = self.store.read(SAMPLES_TABLE, group, label)?;
        check_len(&sheet, label, &values, self.samples)?;
        Ok(values)
    }

    fn triple(&mut self, group: &str, labels: [&str; 3]) -> Result<[Vec<f64>; 3]> {
        Ok([
            self.column(group, labels[0])?,
            self.column(group, labels[1])?,
            self.column(group, labels[2])?,
        ])
    }

    /// Labor, operating and maintenance ratio columns for one asset label
    fn ratios(&mut self, label: &str) -> Result<RatioColumns> {
        Ok(RatioColumns {
            labor: self.column(LABOR_COST_RATIO, label)?,
            operating: self.column(OP_COST_RATIO, label)?,
            maintenance: self.column(MAINT_COST_RATIO, label)?,
        })
    }
}

struct RatioColumns {
    labor: Vec<f64>,
    operating: Vec<f64>,
    maintenance: Vec<f64>,
}

impl RatioColumns {
    fn at(&self, i: usize) -> CostRatios {
        CostRatios {
            labor: self.labor[i],
            operating: self.operating[i],
            maintenance: self.maintenance[i],
        }
    }
}

fn triple_at(columns: &[Vec<f64>; 3], i: usize) -> NutrientTriple {
    NutrientTriple::new(columns[0][i], columns[1][i], columns[2][i])
}

impl ScenarioInputs {
    /// Read every sample column the pipeline consumes and build `config.samples` records
    pub fn read_all<S: TableStore + ?Sized>(
        store: &S,
        materials: &MaterialCatalog,
        config: &AnalysisConfig,
    ) -> Result<Vec<ScenarioInputs>> {
        let n = config.samples;
        let mut r = SampleReader::new(store, n);

        // Capital costs
        let unit_costs = materials
            .labels()
            .map(|label| r.column(MATERIAL_UNIT_COSTS, label))
            .collect::<Result<Vec<_>>>()?;
        let reuse = r.column(MATERIAL_REUSE_RATIO, REUSE_RATIO)?;
        let uddt_ratios = config
            .sanitation
            .uddt_items
            .iter()
            .map(|item| r.ratios(item))
            .collect::<Result<Vec<_>>>()?;
        let pit_ratios = config
            .sanitation
            .pit_items
            .iter()
            .map(|item| r.ratios(item))
            .collect::<Result<Vec<_>>>()?;
        let tank_ratios = r.ratios(RATIO_TANK)?;
        let struvite_ratios = r.ratios(RATIO_STRUVITE)?;
        let ion_exchange_ratios = r.ratios(RATIO_ION_EXCHANGE)?;

        // Diet and excretion
        let e_cal = r.column(RR_UNIFORM, E_CAL)?;
        let p_veg = r.column(RR_UNIFORM, P_VEG)?;
        let p_anim = r.column(RR_UNIFORM, P_ANIM)?;
        let n_prot = r.column(RR_UNIFORM, N_PROT)?;
        let k_cal = r.column(RR_UNIFORM, K_CAL)?;
        let excreted = r.triple(RR_UNIFORM, [N_EXC, P_EXC, K_EXC])?;
        let loss_cons = r.column(RR_TRIANGLE, LOSS_CONS)?;
        let p_prot_v = r.column(RR_TRIANGLE, P_PROT_V)?;
        let p_prot_a = r.column(RR_TRIANGLE, P_PROT_A)?;
        let urine_percent = r.triple(RR_TRIANGLE, [N_URINE, P_URINE, K_URINE])?;
        let urine_volume = r.column(RR_TRIANGLE, URINE_VOLUME)?;

        let collection = r.triple(NUTRIENT_RECOVERY_EFFICIENCY, [UDDT_N, UDDT_P, UDDT_K])?;
        let transport_loss = r.triple(
            NUTRIENT_RECOVERY_EFFICIENCY,
            [TRANSPORT_N, TRANSPORT_P, TRANSPORT_K],
        )?;
        let storage_loss =
            r.triple(NUTRIENT_RECOVERY_EFFICIENCY, [STORAGE_N, STORAGE_P, STORAGE_K])?;

        // Tanks, land and transport
        let cost_urine_tank1 = r.column(RR_UNIFORM, COST_URINE_TANK1)?;
        let cost_urine_tank2 = r.column(RR_UNIFORM, COST_URINE_TANK2)?;
        let lease = r.column(RR_UNIFORM, LEASE_50_100)?;
        let cart = r.column(TRANSPORT_COSTS, CART)?;
        let truck = r.column(TRANSPORT_COSTS, TRUCK)?;

        // Struvite
        let cost_p_reactor = r.column(RR_P_RECOVERY_UNIFORM, COST_P_REACTOR)?;
        let material_p_stirrer = r.column(RR_P_RECOVERY_UNIFORM, MATERIAL_P_STIRRER)?;
        let cost_p_stirrer = r.column(RR_P_RECOVERY_UNIFORM, COST_P_STIRRER)?;
        let material_p_pipe = r.column(RR_P_RECOVERY_UNIFORM, MATERIAL_P_PIPE)?;
        let cost_p_pipe = r.column(RR_P_RECOVERY_UNIFORM, COST_P_PIPE)?;
        let filter_reuse = r.column(RR_P_RECOVERY_UNIFORM, FILTER_REUSE)?;
        let cost_filter_bag = r.column(RR_P_RECOVERY_UNIFORM, COST_FILTER_BAG)?;
        let cost_mgoh2_powder = r.column(RR_P_RECOVERY_UNIFORM, COST_MGOH2_POWDER)?;
        let cost_mgco3_powder = r.column(RR_P_RECOVERY_UNIFORM, COST_MGCO3_POWDER)?;

        // Ion exchange
        let n_rec_2 = r.column(RR_N_RECOVERY_UNIFORM, N_REC_2)?;
        let cost_pvc_column = r.column(RR_N_RECOVERY_UNIFORM, COST_PVC_COLUMN)?;
        let material_tubing = r.column(RR_N_RECOVERY_UNIFORM, MATERIAL_TUBING)?;
        let cost_tubing = r.column(RR_N_RECOVERY_UNIFORM, COST_TUBING)?;
        let cost_resin = r.column(RR_N_RECOVERY_UNIFORM, COST_RESIN)?;
        let cost_h2so4 = r.column(RR_N_RECOVERY_UNIFORM, COST_H2SO4)?;
        let resin_lifetime = r.column(RR_N_RECOVERY_TRIANGLE, RESIN_LIFETIME)?;
        let ad_density = r.column(RR_N_RECOVERY_TRIANGLE, AD_DENSITY)?;

        // Market and finance
        let urea = r.column(FERTILIZER_COST, UREA)?;
        let can = r.column(FERTILIZER_COST, CAN)?;
        let ssp = r.column(FERTILIZER_COST, SSP)?;
        let tsp = r.column(FERTILIZER_COST, TSP)?;
        let kcl = r.column(FERTILIZER_COST, KCL)?;
        let income_tax = r.column(DCA_PARAMETERS, INCOME_TAX)?;
        let discount_rate = r.column(DCA_PARAMETERS, DISCOUNT_RATE)?;

        tracing::debug!(samples = n, groups = r.checked.len(), "sample sheets aligned");

        let records = (0..n)
            .map(|i| ScenarioInputs {
                iteration: i,
                diet: DietInputs {
                    e_cal: e_cal[i],
                    p_veg: p_veg[i],
                    p_anim: p_anim[i],
                    loss_cons: loss_cons[i],
                    n_prot: n_prot[i],
                    p_prot_v: p_prot_v[i],
                    p_prot_a: p_prot_a[i],
                    k_cal: k_cal[i],
                    excreted: triple_at(&excreted, i),
                    urine_percent: triple_at(&urine_percent, i),
                },
                efficiencies: StageEfficiencies {
                    collection: triple_at(&collection, i),
                    transport_loss: triple_at(&transport_loss, i),
                    storage_loss: triple_at(&storage_loss, i),
                },
                unit_costs: unit_costs.iter().map(|c| c[i]).collect(),
                reuse_ratio: reuse[i],
                uddt_ratios: uddt_ratios.iter().map(|c| c.at(i)).collect(),
                pit_ratios: pit_ratios.iter().map(|c| c.at(i)).collect(),
                recovery: RecoveryInputs {
                    urine_volume: urine_volume[i],
                    urine_nutrients: NutrientTriple::default(),
                    cost_urine_tank1: cost_urine_tank1[i],
                    cost_urine_tank2: cost_urine_tank2[i],
                    cart: cart[i],
                    truck: truck[i],
                    cost_p_reactor: cost_p_reactor[i],
                    material_p_stirrer: material_p_stirrer[i],
                    cost_p_stirrer: cost_p_stirrer[i],
                    material_p_pipe: material_p_pipe[i],
                    cost_p_pipe: cost_p_pipe[i],
                    filter_reuse: filter_reuse[i],
                    cost_filter_bag: cost_filter_bag[i],
                    cost_mgoh2_powder: cost_mgoh2_powder[i],
                    cost_mgco3_powder: cost_mgco3_powder[i],
                    n_rec_2: n_rec_2[i],
                    cost_pvc_column: cost_pvc_column[i],
                    material_tubing: material_tubing[i],
                    cost_tubing: cost_tubing[i],
                    cost_resin: cost_resin[i],
                    cost_h2so4: cost_h2so4[i],
                    resin_lifetime: resin_lifetime[i],
                    ad_density: ad_density[i],
                    tank_ratios: tank_ratios.at(i),
                    struvite_ratios: struvite_ratios.at(i),
                    ion_exchange_ratios: ion_exchange_ratios.at(i),
                },
                lease: lease[i],
                fertilizer: FertilizerPrices {
                    urea: urea[i],
                    can: can[i],
                    ssp: ssp[i],
                    tsp: tsp[i],
                    kcl: kcl[i],
                },
                income_tax: income_tax[i],
                discount_rate: discount_rate[i],
            })
            .collect();

        Ok(records)
    }
}
