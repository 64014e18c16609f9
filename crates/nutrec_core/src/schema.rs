//! Table, sheet and column names of the data store interface.
//!
//! Sample sheets keep the group and label names of the input workbook so
//! existing parameter catalogs load unchanged.

/// Table holding every sampled parameter group
pub const SAMPLES_TABLE: &str = "uncertainty_ranges";
/// Table holding per-scenario results
pub const RESULTS_TABLE: &str = "results";

// ============================================================================
// Sample groups
// ============================================================================

pub const MATERIAL_UNIT_COSTS: &str = "material_unit_costs";
pub const MATERIAL_REUSE_RATIO: &str = "material_reuse_ratio";
pub const TECH_LIFE_SPAN: &str = "tech_life_span";
pub const TECH_MAINT_TIME: &str = "tech_maint_time";
pub const MAINT_COST_RATIO: &str = "maint_cost_ratio";
pub const OP_COST_RATIO: &str = "op_cost_ratio";
pub const LABOR_COST_RATIO: &str = "labor_cost_ratio";
pub const NUTRIENT_RECOVERY_EFFICIENCY: &str = "nutrient_recovery_efficiency";
pub const TRANSPORT_COSTS: &str = "transport_costs";
pub const RR_TRIANGLE: &str = "RR_triangle";
pub const RR_UNIFORM: &str = "RR_uniform";
pub const FERTILIZER_COST: &str = "fertilizer_cost";
pub const RR_P_RECOVERY_UNIFORM: &str = "RR_P_recovery_uniform";
pub const RR_N_RECOVERY_UNIFORM: &str = "RR_N_recovery_uniform";
pub const RR_N_RECOVERY_TRIANGLE: &str = "RR_N_recovery_triangle";
pub const DCA_PARAMETERS: &str = "DCA_parameters";

/// Groups the pipeline reads; other groups are sampled and stored only
pub const REQUIRED_GROUPS: [&str; 14] = [
    MATERIAL_UNIT_COSTS,
    MATERIAL_REUSE_RATIO,
    MAINT_COST_RATIO,
    OP_COST_RATIO,
    LABOR_COST_RATIO,
    NUTRIENT_RECOVERY_EFFICIENCY,
    TRANSPORT_COSTS,
    RR_TRIANGLE,
    RR_UNIFORM,
    FERTILIZER_COST,
    RR_P_RECOVERY_UNIFORM,
    RR_N_RECOVERY_UNIFORM,
    RR_N_RECOVERY_TRIANGLE,
    DCA_PARAMETERS,
];

// ============================================================================
// Sample columns
// ============================================================================

pub const REUSE_RATIO: &str = "reuse_ratio";

/// Cost ratio columns for treatment assets
pub const RATIO_TANK: &str = "tank";
pub const RATIO_STRUVITE: &str = "struvite";
pub const RATIO_ION_EXCHANGE: &str = "ion_exchange";

// Diet and excretion
pub const URINE_VOLUME: &str = "urine_volume";
pub const LOSS_CONS: &str = "loss_cons";
pub const P_PROT_V: &str = "P_prot_v";
pub const P_PROT_A: &str = "P_prot_a";
pub const N_URINE: &str = "N_urine";
pub const P_URINE: &str = "P_urine";
pub const K_URINE: &str = "K_urine";
pub const E_CAL: &str = "e_cal";
pub const P_VEG: &str = "p_veg";
pub const P_ANIM: &str = "p_anim";
pub const N_PROT: &str = "N_prot";
pub const K_CAL: &str = "K_cal";
pub const N_EXC: &str = "N_exc";
pub const P_EXC: &str = "P_exc";
pub const K_EXC: &str = "K_exc";

// Tanks and land
pub const COST_URINE_TANK1: &str = "cost_urine_tank1";
pub const COST_URINE_TANK2: &str = "cost_urine_tank2";
pub const LEASE_50_100: &str = "lease_50_100";

// Stage efficiencies (percent)
pub const UDDT_N: &str = "UDDT_N";
pub const UDDT_P: &str = "UDDT_P";
pub const UDDT_K: &str = "UDDT_K";
pub const TRANSPORT_N: &str = "transport_N";
pub const TRANSPORT_P: &str = "transport_P";
pub const TRANSPORT_K: &str = "transport_K";
pub const STORAGE_N: &str = "storage_N";
pub const STORAGE_P: &str = "storage_P";
pub const STORAGE_K: &str = "storage_K";

pub const CART: &str = "cart";
pub const TRUCK: &str = "truck";

// Fertilizer prices (local currency per sack)
pub const UREA: &str = "urea";
pub const CAN: &str = "calcium_ammonium_nitrate";
pub const SSP: &str = "single_superphosphate";
pub const TSP: &str = "triple_superphosphate";
pub const KCL: &str = "potassium_chloride";

// Struvite precipitation
pub const COST_P_REACTOR: &str = "cost_P_reactor";
pub const MATERIAL_P_STIRRER: &str = "material_P_stirrer";
pub const COST_P_STIRRER: &str = "cost_P_stirrer";
pub const MATERIAL_P_PIPE: &str = "material_P_pipe";
pub const COST_P_PIPE: &str = "cost_P_pipe";
pub const FILTER_REUSE: &str = "filter_reuse";
pub const COST_FILTER_BAG: &str = "cost_filter_bag";
pub const COST_MGOH2_POWDER: &str = "cost_MgOH2_powder";
pub const COST_MGCO3_POWDER: &str = "cost_MgCO3_powder";

// Ion exchange
pub const N_REC_2: &str = "N_rec_2";
pub const COST_PVC_COLUMN: &str = "cost_PVC_column";
pub const MATERIAL_TUBING: &str = "material_tubing";
pub const COST_TUBING: &str = "cost_tubing";
pub const COST_RESIN: &str = "cost_resin";
pub const COST_H2SO4: &str = "cost_H2SO4";
pub const RESIN_LIFETIME: &str = "resin_lifetime";
pub const AD_DENSITY: &str = "ad_density";

pub const INCOME_TAX: &str = "income_tax";
pub const DISCOUNT_RATE: &str = "discount_rate";

// ============================================================================
// Result sheets
// ============================================================================

pub const SHEET_PER_CAPITA_NUTRIENTS: &str = "per_capita_nutrients";
pub const SHEET_TOILET_COSTS: &str = "toilet_costs";
pub const SHEET_MATERIAL_COSTS: &str = "material_costs";
pub const SHEET_TANKS: &str = "tank_quantity";
pub const SHEET_RECOVERY: &str = "resource_recovery";
pub const SHEET_MARKET_VALUE: &str = "market_value";
pub const SHEET_BREAK_EVEN: &str = "break_even";
pub const SHEET_RATE_OF_RETURN_STATUS: &str = "rate_of_return_status";

/// Sheet holding one case's rate-of-return curves
#[must_use]
pub fn rate_of_return_sheet(case_key: &str) -> String {
    format!("rate_of_return_{case_key}")
}

/// Sheet holding one case's per-price root-finder status codes
#[must_use]
pub fn rate_of_return_status_sheet(case_key: &str) -> String {
    format!("rate_of_return_status_{case_key}")
}

/// Sheet holding per-material costs of one catalog item
#[must_use]
pub fn detailed_material_sheet(item: &str) -> String {
    format!("detailed_material_{item}")
}

/// Column holding the issue code next to a case's break-even price
#[must_use]
pub fn issue_column(case_key: &str) -> String {
    format!("{case_key}_issue")
}
