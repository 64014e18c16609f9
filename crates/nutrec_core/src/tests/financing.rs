//! Tests for subsidized versus unsubsidized break-even prices
//!
//! These tests verify that:
//! - Paying for the baseline latrines always lowers the break-even price
//! - Without tax or baseline running costs, the gap is exactly the baseline
//!   capital spread over discounted nutrient mass
//! - Zero recovered nutrients flag the scenario instead of aborting the run

use super::fixtures::{fix_parameter, reference_catalog, reference_materials, small_config};
use crate::error::NumericalIssue;
use crate::model::{Financing, ScenarioCase, SystemKind};
use crate::pipeline::sample_and_run;
use crate::schema::*;
use crate::store::{MemoryStore, TableStore};

#[test]
fn test_subsidy_lowers_break_even_for_both_systems() {
    let config = small_config(30);
    let mut store = MemoryStore::new();
    let output =
        sample_and_run(&mut store, &reference_catalog(), &config, &reference_materials()).unwrap();

    for record in &output.records {
        for system in [SystemKind::StorageOnly, SystemKind::FullTreatment] {
            let unsub = record
                .case(ScenarioCase::new(system, Financing::Unsubsidized))
                .unwrap();
            let sub = record
                .case(ScenarioCase::new(system, Financing::Subsidized))
                .unwrap();
            assert!(unsub.price().is_finite());
            assert!(
                sub.price() < unsub.price(),
                "iteration {}: {} !< {}",
                record.iteration,
                sub.price(),
                unsub.price()
            );
        }
    }
}

#[test]
fn test_untaxed_subsidy_gap_is_baseline_capital() {
    let mut catalog = reference_catalog();
    fix_parameter(&mut catalog, DCA_PARAMETERS, INCOME_TAX, 0.0);
    for item in ["D402", "D403"] {
        fix_parameter(&mut catalog, OP_COST_RATIO, item, 0.0);
        fix_parameter(&mut catalog, MAINT_COST_RATIO, item, 0.0);
    }
    let config = small_config(20);
    let mut store = MemoryStore::new();
    let output = sample_and_run(&mut store, &catalog, &config, &reference_materials()).unwrap();

    for record in &output.records {
        let baseline = record.toilets.pit * config.sanitation.pit_units;
        for system in [SystemKind::StorageOnly, SystemKind::FullTreatment] {
            let unsub = record
                .case(ScenarioCase::new(system, Financing::Unsubsidized))
                .and_then(|c| c.break_even.ok())
                .unwrap();
            let sub = record
                .case(ScenarioCase::new(system, Financing::Subsidized))
                .and_then(|c| c.break_even.ok())
                .unwrap();
            let expected = baseline.capital() / unsub.discount_nutrient_total;
            let gap = unsub.price - sub.price;
            assert!(
                (gap - expected).abs() <= 1e-9 * expected.abs().max(1.0),
                "iteration {}: gap {gap} expected {expected}",
                record.iteration
            );
        }
    }
}

#[test]
fn test_no_collection_flags_every_case() {
    let mut catalog = reference_catalog();
    for label in [UDDT_N, UDDT_P, UDDT_K] {
        fix_parameter(&mut catalog, NUTRIENT_RECOVERY_EFFICIENCY, label, 0.0);
    }
    let config = small_config(6);
    let mut store = MemoryStore::new();
    let output = sample_and_run(&mut store, &catalog, &config, &reference_materials()).unwrap();

    assert_eq!(output.scenarios_with_issues(), 6);
    for record in &output.records {
        for case in &record.cases {
            assert_eq!(case.issue(), Some(NumericalIssue::NoRecoveredNutrients));
            assert!(case.price().is_nan());
        }
    }

    let codes = store
        .read(RESULTS_TABLE, SHEET_BREAK_EVEN, &issue_column("storage_only_unsubsidized"))
        .unwrap();
    assert!(codes.iter().all(|&c| c == NumericalIssue::NoRecoveredNutrients.code()));
}
