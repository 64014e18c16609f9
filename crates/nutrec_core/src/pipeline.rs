//! End-to-end run: sample, read back, evaluate every scenario, write results.
//!
//! Stages communicate only through the [`TableStore`]. Sampling writes one
//! sheet per parameter group; the model reads those sheets back and joins
//! them by iteration index, so a run over stored samples reproduces the same
//! results without regenerating anything.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::capital::{ItemCost, MaterialCatalog, ToiletCosts, assembly_breakdown};
use crate::config::AnalysisConfig;
use crate::dcf::DiscountSchedule;
use crate::error::{ConfigError, NumericalIssue, Result, StoreError};
use crate::inputs::ScenarioInputs;
use crate::market::{MarketValue, WeightedMarketValue};
use crate::model::{CostBreakdown, CostRatios, ScenarioCase, SystemKind};
use crate::nutrients::{NutrientFlow, nutrient_flow};
use crate::recovery::{RecoveryOutcome, recovery_costs};
use crate::ror::RootStatus;
use crate::sampling::{ParameterCatalog, SampleSet, draw_samples};
use crate::schema::*;
use crate::store::{Table, TableStore};
use crate::systems::{
    CaseResult, CaseSettings, FleetCosts, SystemLayout, evaluate_case, full_treatment_layout,
    storage_only_layout,
};

/// Everything computed for one Monte Carlo iteration
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRecord {
    pub iteration: usize,
    pub flow: NutrientFlow,
    /// Material cost per catalog item, local currency
    pub item_costs: Vec<f64>,
    pub toilets: ToiletCosts,
    pub plant: RecoveryOutcome,
    pub storage_only: SystemLayout,
    pub full_treatment: SystemLayout,
    pub market: MarketValue,
    pub storage_only_market: std::result::Result<WeightedMarketValue, NumericalIssue>,
    pub full_treatment_market: std::result::Result<WeightedMarketValue, NumericalIssue>,
    /// One entry per [`ScenarioCase::ALL`], in that order
    pub cases: Vec<CaseResult>,
}

impl ScenarioRecord {
    pub fn case(&self, case: ScenarioCase) -> Option<&CaseResult> {
        self.cases.iter().find(|c| c.case == case)
    }

    pub fn layout(&self, system: SystemKind) -> &SystemLayout {
        match system {
            SystemKind::StorageOnly => &self.storage_only,
            SystemKind::FullTreatment => &self.full_treatment,
        }
    }

    /// Every numerical issue recorded for this scenario
    pub fn issues(&self) -> impl Iterator<Item = NumericalIssue> + '_ {
        self.cases
            .iter()
            .filter_map(CaseResult::issue)
            .chain(self.storage_only_market.err())
            .chain(self.full_treatment_market.err())
    }
}

/// Records of a completed run, in iteration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    pub records: Vec<ScenarioRecord>,
    /// Candidate rate-of-return prices, USD/kg
    pub prices: Vec<f64>,
}

impl PipelineOutput {
    /// Scenarios with at least one numerical issue
    pub fn scenarios_with_issues(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.issues().next().is_some())
            .count()
    }
}

/// Read-only inputs shared by every scenario of a run
#[derive(Debug, Clone)]
pub struct ModelContext<'a> {
    pub config: &'a AnalysisConfig,
    pub materials: &'a MaterialCatalog,
    pub prices: Vec<f64>,
}

impl<'a> ModelContext<'a> {
    #[must_use]
    pub fn new(config: &'a AnalysisConfig, materials: &'a MaterialCatalog) -> Self {
        Self {
            config,
            materials,
            prices: config.rate_of_return.prices(),
        }
    }

    fn toilet(
        &self,
        items: &[String],
        ratios: &[CostRatios],
        inputs: &ScenarioInputs,
    ) -> CostBreakdown {
        let parts: Vec<ItemCost> = items
            .iter()
            .zip(ratios)
            .map(|(item, &ratios)| ItemCost {
                material: self.materials.item_material_cost(
                    item,
                    &inputs.unit_costs,
                    inputs.reuse_ratio,
                ),
                ratios,
            })
            .collect();
        assembly_breakdown(&parts, &self.config.currency)
    }
}

/// Run the deterministic model chain for one scenario
#[must_use]
pub fn evaluate_scenario(inputs: &ScenarioInputs, ctx: &ModelContext<'_>) -> ScenarioRecord {
    let config = ctx.config;
    let sanitation = &config.sanitation;

    let flow = nutrient_flow(&inputs.diet, &inputs.efficiencies);

    let item_costs = ctx
        .materials
        .items
        .iter()
        .map(|item| {
            ctx.materials
                .item_material_cost(item, &inputs.unit_costs, inputs.reuse_ratio)
        })
        .collect();
    let toilets = ToiletCosts {
        uddt: ctx.toilet(&sanitation.uddt_items, &inputs.uddt_ratios, inputs),
        pit: ctx.toilet(&sanitation.pit_items, &inputs.pit_ratios, inputs),
    };
    let fleet = FleetCosts {
        uddt: toilets.uddt,
        pit: toilets.pit,
        lease: inputs.lease,
    };

    let mut plant_inputs = inputs.recovery;
    plant_inputs.urine_nutrients = flow.after_transport_storage;
    let plant = recovery_costs(&plant_inputs, &config.treatment, &config.currency);

    let storage_only = storage_only_layout(
        &fleet,
        plant_inputs.urine_volume,
        plant_inputs.cost_urine_tank1,
        plant_inputs.tank_ratios,
        flow.after_transport_storage,
        sanitation,
    );
    let full_treatment = full_treatment_layout(&fleet, &plant, sanitation);

    let market = MarketValue::from_prices(&inputs.fertilizer, &config.fertilizer, &config.currency);
    let storage_only_market = market.weighted(storage_only.annual_recovered);
    let full_treatment_market = market.weighted(full_treatment.annual_recovered);

    let schedule = DiscountSchedule::new(
        inputs.discount_rate,
        config.finance.lifetime_years,
        config.finance.maintenance_year(),
    );
    let baseline = fleet.baseline(sanitation);
    let settings = CaseSettings {
        finance: &config.finance,
        rate_of_return: &config.rate_of_return,
        prices: &ctx.prices,
    };
    let cases = ScenarioCase::ALL
        .iter()
        .map(|case| {
            let layout = match case.system {
                SystemKind::StorageOnly => &storage_only,
                SystemKind::FullTreatment => &full_treatment,
            };
            evaluate_case(
                layout,
                case.financing,
                &baseline,
                inputs.income_tax,
                &schedule,
                &settings,
            )
        })
        .collect();

    let record = ScenarioRecord {
        iteration: inputs.iteration,
        flow,
        item_costs,
        toilets,
        plant,
        storage_only,
        full_treatment,
        market,
        storage_only_market,
        full_treatment_market,
        cases,
    };
    for issue in record.issues() {
        tracing::debug!(iteration = record.iteration, %issue, "numerical issue");
    }
    record
}

/// Evaluate every scenario; output order always matches input order
#[must_use]
pub fn evaluate_all(inputs: &[ScenarioInputs], ctx: &ModelContext<'_>) -> Vec<ScenarioRecord> {
    #[cfg(feature = "parallel")]
    let records = inputs
        .par_iter()
        .map(|scenario| evaluate_scenario(scenario, ctx))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let records = inputs
        .iter()
        .map(|scenario| evaluate_scenario(scenario, ctx))
        .collect();

    records
}

// ============================================================================
// Entry points
// ============================================================================

/// Draw every parameter group and write one sample sheet per group
pub fn sample_into<S: TableStore + ?Sized>(
    store: &mut S,
    catalog: &ParameterCatalog,
    config: &AnalysisConfig,
) -> Result<SampleSet> {
    config.validate()?;
    tracing::info!(
        samples = config.samples,
        parameters = catalog.parameter_count(),
        method = ?config.sampling,
        seed = config.seed,
        "Drawing samples"
    );
    let set = draw_samples(catalog, config.samples, config.sampling, config.seed)?;
    for table in &set.tables {
        store.write(SAMPLES_TABLE, &table.group, &table.to_table()?)?;
    }
    tracing::info!(groups = set.tables.len(), "Sample sheets written");
    Ok(set)
}

/// Evaluate all scenarios from stored sample sheets and write result sheets
pub fn run_pipeline<S: TableStore + ?Sized>(
    store: &mut S,
    config: &AnalysisConfig,
    materials: &MaterialCatalog,
) -> Result<PipelineOutput> {
    config.validate()?;
    materials.validate()?;
    check_toilet_items(config, materials)?;
    for group in REQUIRED_GROUPS {
        if !store.has_table(SAMPLES_TABLE, group) {
            return Err(StoreError::MissingTable(format!("{SAMPLES_TABLE}/{group}")).into());
        }
    }

    let inputs = ScenarioInputs::read_all(&*store, materials, config)?;
    let ctx = ModelContext::new(config, materials);
    tracing::info!(scenarios = inputs.len(), "Evaluating scenarios");
    let records = evaluate_all(&inputs, &ctx);

    let output = PipelineOutput {
        records,
        prices: ctx.prices.clone(),
    };
    let flagged = output.scenarios_with_issues();
    if flagged > 0 {
        tracing::warn!(
            scenarios = flagged,
            "Scenarios carry numerical issues; see issue columns"
        );
    }

    write_results(store, &inputs, &output, &ctx)?;
    tracing::info!("Result sheets written");
    Ok(output)
}

/// Sample, then run the model over the fresh samples
pub fn sample_and_run<S: TableStore + ?Sized>(
    store: &mut S,
    catalog: &ParameterCatalog,
    config: &AnalysisConfig,
    materials: &MaterialCatalog,
) -> Result<PipelineOutput> {
    sample_into(store, catalog, config)?;
    run_pipeline(store, config, materials)
}

fn check_toilet_items(config: &AnalysisConfig, materials: &MaterialCatalog) -> Result<()> {
    let s = &config.sanitation;
    let checks = [
        ("sanitation.uddt_items", &s.uddt_items),
        ("sanitation.pit_items", &s.pit_items),
    ];
    for (setting, items) in checks {
        if let Some(item) = items.iter().find(|i| !materials.has_item(i)) {
            return Err(ConfigError::InvalidSetting {
                setting,
                reason: format!("item '{item}' is not in the material catalog"),
            }
            .into());
        }
    }
    Ok(())
}

// ============================================================================
// Result sheets
// ============================================================================

const NPK: [&str; 3] = ["N", "P", "K"];
const BREAKDOWN_FIELDS: [&str; 5] = ["material", "labor", "operating", "maintenance", "consumable"];

fn breakdown_values(c: &CostBreakdown) -> [f64; 5] {
    [c.material, c.labor, c.operating, c.maintenance, c.consumable]
}

fn prefixed(prefix: &str, fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| format!("{prefix}_{f}")).collect()
}

fn issue_code<T>(result: &std::result::Result<T, NumericalIssue>) -> f64 {
    result.as_ref().err().map_or(0.0, NumericalIssue::code)
}

fn write_sheet<S, F>(
    store: &mut S,
    sheet: &str,
    columns: Vec<String>,
    records: &[ScenarioRecord],
    row: F,
) -> Result<()>
where
    S: TableStore + ?Sized,
    F: Fn(&ScenarioRecord) -> Vec<f64>,
{
    let mut table = Table::new(columns);
    for record in records {
        table.push_row(row(record));
    }
    store.write(RESULTS_TABLE, sheet, &table)?;
    Ok(())
}

fn write_results<S: TableStore + ?Sized>(
    store: &mut S,
    inputs: &[ScenarioInputs],
    output: &PipelineOutput,
    ctx: &ModelContext<'_>,
) -> Result<()> {
    let records = &output.records;

    let stages = [
        "excreted_total",
        "excreted_urine",
        "excreted_feces",
        "after_collection",
        "after_transport_storage",
    ];
    let columns = stages.iter().flat_map(|s| prefixed(s, &NPK)).collect();
    write_sheet(store, SHEET_PER_CAPITA_NUTRIENTS, columns, records, |r| {
        let f = &r.flow;
        [
            f.excreted_total,
            f.excreted_urine,
            f.excreted_feces,
            f.after_collection,
            f.after_transport_storage,
        ]
        .iter()
        .flat_map(|t| [t.n, t.p, t.k])
        .collect()
    })?;

    write_sheet(
        store,
        SHEET_MATERIAL_COSTS,
        ctx.materials.items.clone(),
        records,
        |r| r.item_costs.clone(),
    )?;

    let material_labels: Vec<String> = ctx.materials.labels().map(str::to_string).collect();
    for item in &ctx.materials.items {
        let mut table = Table::new(material_labels.clone());
        for scenario in inputs {
            table.push_row(ctx.materials.detailed_costs(item, &scenario.unit_costs));
        }
        store.write(RESULTS_TABLE, &detailed_material_sheet(item), &table)?;
    }

    let mut columns = prefixed("uddt", &BREAKDOWN_FIELDS[..4]);
    columns.extend(prefixed("pit", &BREAKDOWN_FIELDS[..4]));
    write_sheet(store, SHEET_TOILET_COSTS, columns, records, |r| {
        let u = breakdown_values(&r.toilets.uddt);
        let p = breakdown_values(&r.toilets.pit);
        u[..4].iter().chain(&p[..4]).copied().collect()
    })?;

    let columns = [
        "storage_tanks",
        "storage_land_plots",
        "community_tanks",
        "on_site_tanks",
        "treatment_land_plots",
    ]
    .map(String::from)
    .to_vec();
    write_sheet(store, SHEET_TANKS, columns, records, |r| {
        vec![
            r.storage_only.leased_tanks as f64,
            r.storage_only.land_plots as f64,
            r.plant.community_tanks as f64,
            r.plant.on_site_tanks as f64,
            r.full_treatment.land_plots as f64,
        ]
    })?;

    let mut columns = [
        "daily_urine",
        "struvite_reactors",
        "ion_exchange_columns",
        "cart_transport",
        "truck_transport",
    ]
    .map(String::from)
    .to_vec();
    for asset in ["off_site_tank", "on_site_tank", "struvite", "ion_exchange"] {
        columns.extend(prefixed(asset, &BREAKDOWN_FIELDS));
    }
    columns.extend(prefixed("annual_recovered", &NPK));
    columns.extend(
        [
            "annual_filter_cost",
            "annual_mgoh2_cost",
            "annual_mgco3_cost",
            "annual_resin_cost",
            "annual_acid_cost",
        ]
        .map(String::from),
    );
    write_sheet(store, SHEET_RECOVERY, columns, records, |r| {
        let p = &r.plant;
        let mut row = vec![
            p.daily_urine,
            p.struvite_detail.reactors as f64,
            p.ion_exchange_detail.columns as f64,
            p.transport.cart,
            p.transport.truck,
        ];
        for asset in [&p.off_site, &p.on_site, &p.struvite, &p.ion_exchange] {
            row.extend(breakdown_values(asset));
        }
        row.extend([p.annual_recovered.n, p.annual_recovered.p, p.annual_recovered.k]);
        row.extend([
            p.struvite_detail.annual_filter_cost,
            p.struvite_detail.annual_mgoh2_cost,
            p.struvite_detail.annual_mgco3_cost,
            p.ion_exchange_detail.annual_resin_cost,
            p.ion_exchange_detail.annual_acid_cost,
        ]);
        row
    })?;

    let mut columns = ["urea_N_cost", "CAN_N_cost", "SSP_P_cost", "TSP_P_cost", "KCl_K_cost"]
        .map(String::from)
        .to_vec();
    for system in ["storage_only", "full_treatment"] {
        columns.extend(prefixed(
            &format!("{system}_weighted"),
            &["N", "P", "K", "total"],
        ));
        columns.push(format!("{system}_market_issue"));
    }
    write_sheet(store, SHEET_MARKET_VALUE, columns, records, |r| {
        let m = &r.market;
        let mut row = vec![m.urea_n, m.can_n, m.ssp_p, m.tsp_p, m.kcl_k];
        for weighted in [&r.storage_only_market, &r.full_treatment_market] {
            match weighted {
                Ok(w) => row.extend([w.n, w.p, w.k, w.total]),
                Err(_) => row.extend([f64::NAN; 4]),
            }
            row.push(issue_code(weighted));
        }
        row
    })?;

    let columns = ScenarioCase::ALL
        .iter()
        .flat_map(|c| [c.key().to_string(), issue_column(c.key())])
        .collect();
    write_sheet(store, SHEET_BREAK_EVEN, columns, records, |r| {
        r.cases
            .iter()
            .flat_map(|c| [c.price(), issue_code(&c.break_even)])
            .collect()
    })?;

    let price_columns: Vec<String> = output.prices.iter().map(|p| format!("{p:.2}")).collect();
    for (index, case) in ScenarioCase::ALL.iter().enumerate() {
        write_sheet(
            store,
            &rate_of_return_sheet(case.key()),
            price_columns.clone(),
            records,
            |r| r.cases[index].rate_of_return.rates().collect(),
        )?;
        write_sheet(
            store,
            &rate_of_return_status_sheet(case.key()),
            price_columns.clone(),
            records,
            |r| r.cases[index].rate_of_return.statuses().collect(),
        )?;
    }

    let columns = ScenarioCase::ALL
        .iter()
        .flat_map(|c| {
            [
                format!("{}_converged", c.key()),
                format!("{}_at_bound", c.key()),
                format!("{}_no_root", c.key()),
                issue_column(c.key()),
            ]
        })
        .collect();
    write_sheet(store, SHEET_RATE_OF_RETURN_STATUS, columns, records, |r| {
        r.cases
            .iter()
            .flat_map(|c| {
                let curve = &c.rate_of_return;
                let at_bound = curve
                    .points
                    .iter()
                    .filter(|p| {
                        matches!(
                            p.solution.status,
                            RootStatus::AtLowerBound | RootStatus::AtUpperBound
                        )
                    })
                    .count();
                [
                    curve.converged_count() as f64,
                    at_bound as f64,
                    curve.no_root_count() as f64,
                    curve.first_issue().map_or(0.0, |i| i.code()),
                ]
            })
            .collect()
    })?;

    Ok(())
}
