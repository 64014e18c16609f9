//! Sanitation system layouts and their evaluation under each financing case.

use serde::{Deserialize, Serialize};

use crate::config::{FinanceConfig, RateOfReturnConfig, SanitationConfig};
use crate::dcf::{
    BreakEven, CashFlowBasis, DiscountSchedule, break_even_subsidized, break_even_unsubsidized,
};
use crate::error::NumericalIssue;
use crate::model::{
    AssetKind, CostBreakdown, CostRatios, Financing, NutrientTriple, ScenarioCase, SystemKind,
};
use crate::recovery::RecoveryOutcome;
use crate::ror::{RateOfReturnCurve, RateOfReturnProblem, rate_of_return_curve};
use crate::sizing::{land_plots, storage_tank_count};

const DAYS_PER_YEAR: f64 = 365.0;

/// Assets, land and nutrient output of one system for one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLayout {
    pub system: SystemKind,
    pub assets: Vec<(AssetKind, CostBreakdown)>,
    /// Tanks that occupy leased land
    pub leased_tanks: u64,
    pub land_plots: u64,
    /// USD/yr
    pub land_lease: f64,
    /// kg/yr
    pub annual_recovered: NutrientTriple,
}

/// Inputs shared by both layouts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleetCosts {
    /// Per UDDT unit
    pub uddt: CostBreakdown,
    /// Per pit latrine
    pub pit: CostBreakdown,
    /// USD per plot per year
    pub lease: f64,
}

impl FleetCosts {
    #[must_use]
    pub fn uddt_fleet(&self, sanitation: &SanitationConfig) -> CostBreakdown {
        self.uddt * sanitation.uddt_units
    }

    /// Pit latrines the subsidy pays for
    #[must_use]
    pub fn baseline(&self, sanitation: &SanitationConfig) -> CostBreakdown {
        self.pit * sanitation.pit_units
    }
}

/// UDDTs with long-term urine storage tanks on leased land
#[must_use]
pub fn storage_only_layout(
    fleet: &FleetCosts,
    urine_volume: f64,
    tank_cost: f64,
    tank_ratios: CostRatios,
    per_capita_recovered: NutrientTriple,
    sanitation: &SanitationConfig,
) -> SystemLayout {
    let tanks = storage_tank_count(
        urine_volume,
        sanitation.uddt_units,
        sanitation.users_per_unit,
        sanitation.storage_days,
        sanitation.tank_capacity_l,
    );
    let plots = land_plots(tanks, sanitation.tanks_per_plot);
    let storage = CostBreakdown::from_ratios(tanks as f64 * tank_cost, tank_ratios);

    SystemLayout {
        system: SystemKind::StorageOnly,
        assets: vec![
            (AssetKind::Uddt, fleet.uddt_fleet(sanitation)),
            (AssetKind::StorageTank, storage),
        ],
        leased_tanks: tanks,
        land_plots: plots,
        land_lease: plots as f64 * fleet.lease,
        annual_recovered: per_capita_recovered * (DAYS_PER_YEAR * sanitation.population()),
    }
}

/// UDDTs feeding community tanks, trucked to a struvite and ion-exchange plant
#[must_use]
pub fn full_treatment_layout(
    fleet: &FleetCosts,
    plant: &RecoveryOutcome,
    sanitation: &SanitationConfig,
) -> SystemLayout {
    let plots = land_plots(plant.community_tanks, sanitation.tanks_per_plot);
    SystemLayout {
        system: SystemKind::FullTreatment,
        assets: vec![
            (AssetKind::Uddt, fleet.uddt_fleet(sanitation)),
            (AssetKind::OffSiteTank, plant.off_site),
            (AssetKind::OnSiteTank, plant.on_site),
            (AssetKind::Struvite, plant.struvite),
            (AssetKind::IonExchange, plant.ion_exchange),
        ],
        leased_tanks: plant.community_tanks,
        land_plots: plots,
        land_lease: plots as f64 * fleet.lease,
        annual_recovered: plant.annual_recovered,
    }
}

impl SystemLayout {
    #[must_use]
    pub fn totals(&self) -> CostBreakdown {
        self.assets.iter().map(|(_, c)| *c).sum()
    }

    #[must_use]
    pub fn cash_flow(&self) -> CashFlowBasis {
        CashFlowBasis {
            assets: self.assets.iter().map(|(_, c)| *c).collect(),
            land_lease: self.land_lease,
            annual_nutrient_mass: self.annual_recovered.total(),
        }
    }

    /// Rate-of-return equation; land lease stays out of the ongoing cost
    #[must_use]
    pub fn rate_of_return_problem(
        &self,
        financing: Financing,
        baseline: &CostBreakdown,
        finance: &FinanceConfig,
    ) -> RateOfReturnProblem {
        let totals = match financing {
            Financing::Unsubsidized => self.totals(),
            Financing::Subsidized => self.totals() + baseline.negated(),
        };
        RateOfReturnProblem {
            capital: totals.capital(),
            annual_ongoing: totals.annual(),
            maintenance: totals.maintenance,
            maintenance_year: finance.maintenance_year(),
            lifetime: finance.lifetime_years,
            annual_nutrient_mass: self.annual_recovered.total(),
        }
    }
}

/// Break-even and rate-of-return results for one case of one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct CaseResult {
    pub case: ScenarioCase,
    pub break_even: Result<BreakEven, NumericalIssue>,
    pub rate_of_return: RateOfReturnCurve,
}

impl CaseResult {
    /// Break-even price, NaN when undefined
    pub fn price(&self) -> f64 {
        self.break_even.as_ref().map_or(f64::NAN, |b| b.price)
    }

    /// First numerical issue of the case, break-even first
    pub fn issue(&self) -> Option<NumericalIssue> {
        self.break_even
            .as_ref()
            .err()
            .copied()
            .or_else(|| self.rate_of_return.first_issue())
    }
}

/// Solver settings shared by every case of a run
#[derive(Debug, Clone, Copy)]
pub struct CaseSettings<'a> {
    pub finance: &'a FinanceConfig,
    pub rate_of_return: &'a RateOfReturnConfig,
    /// Candidate prices, computed once per run
    pub prices: &'a [f64],
}

/// Evaluate one layout under one financing arrangement
#[must_use]
pub fn evaluate_case(
    layout: &SystemLayout,
    financing: Financing,
    baseline: &CostBreakdown,
    income_tax: f64,
    schedule: &DiscountSchedule,
    settings: &CaseSettings<'_>,
) -> CaseResult {
    let basis = layout.cash_flow();
    let break_even = match financing {
        Financing::Unsubsidized => break_even_unsubsidized(&basis, income_tax, schedule),
        Financing::Subsidized => break_even_subsidized(&basis, baseline, income_tax, schedule),
    };
    let problem = layout.rate_of_return_problem(financing, baseline, settings.finance);
    CaseResult {
        case: ScenarioCase::new(layout.system, financing),
        break_even,
        rate_of_return: rate_of_return_curve(&problem, settings.prices, settings.rate_of_return),
    }
}
