//! Tests for a complete sample-then-run pass
//!
//! These tests verify that:
//! - Every result sheet is written with one row per scenario
//! - Rows stay in iteration order through the parallel stage
//! - Tank counts follow the urine volume
//! - The same seed reproduces identical results
//! - Re-running over stored samples does not resample

use super::fixtures::{fix_parameter, reference_catalog, reference_materials, small_config};
use crate::model::{ScenarioCase, SystemKind};
use crate::pipeline::{run_pipeline, sample_and_run};
use crate::schema::*;
use crate::store::{ITERATION_COLUMN, MemoryStore, TableStore};

#[test]
fn test_every_result_sheet_has_one_row_per_scenario() {
    let config = small_config(40);
    let mut store = MemoryStore::new();
    let output =
        sample_and_run(&mut store, &reference_catalog(), &config, &reference_materials()).unwrap();
    assert_eq!(output.records.len(), 40);
    assert_eq!(output.prices.len(), 101);

    let mut sheets = vec![
        SHEET_PER_CAPITA_NUTRIENTS.to_string(),
        SHEET_MATERIAL_COSTS.to_string(),
        SHEET_TOILET_COSTS.to_string(),
        SHEET_TANKS.to_string(),
        SHEET_RECOVERY.to_string(),
        SHEET_MARKET_VALUE.to_string(),
        SHEET_BREAK_EVEN.to_string(),
        SHEET_RATE_OF_RETURN_STATUS.to_string(),
    ];
    sheets.extend(["D402", "D403", "D406"].iter().map(|item| detailed_material_sheet(item)));
    sheets.extend(ScenarioCase::ALL.iter().map(|c| rate_of_return_sheet(c.key())));
    sheets.extend(ScenarioCase::ALL.iter().map(|c| rate_of_return_status_sheet(c.key())));

    for sheet in &sheets {
        let iterations = store
            .read(RESULTS_TABLE, sheet, ITERATION_COLUMN)
            .unwrap_or_else(|e| panic!("{sheet}: {e}"));
        let expected: Vec<f64> = (0..40).map(f64::from).collect();
        assert_eq!(iterations, expected, "{sheet} rows out of order");
    }

    let curve = store
        .sheet(RESULTS_TABLE, &rate_of_return_sheet("storage_only_subsidized"))
        .unwrap();
    // iteration column plus one per candidate price
    assert_eq!(curve.columns.len(), 102);
    assert!(curve.column("0.00").is_some());
    assert!(curve.column("5.00").is_some());
}

#[test]
fn test_records_follow_input_order() {
    let config = small_config(32);
    let mut store = MemoryStore::new();
    let output =
        sample_and_run(&mut store, &reference_catalog(), &config, &reference_materials()).unwrap();
    for (i, record) in output.records.iter().enumerate() {
        assert_eq!(record.iteration, i);
    }

    let stored = store
        .read(RESULTS_TABLE, SHEET_BREAK_EVEN, "full_treatment_unsubsidized")
        .unwrap();
    for (record, price) in output.records.iter().zip(&stored) {
        let case = record
            .case(ScenarioCase::ALL[2])
            .map(|c| c.price())
            .unwrap();
        assert!(case == *price || (case.is_nan() && price.is_nan()));
    }
}

#[test]
fn test_storage_tanks_follow_urine_volume() {
    let mut catalog = reference_catalog();
    fix_parameter(&mut catalog, RR_TRIANGLE, URINE_VOLUME, 1.0);
    let config = small_config(10);
    let mut store = MemoryStore::new();
    let output = sample_and_run(&mut store, &catalog, &config, &reference_materials()).unwrap();

    for record in &output.records {
        let layout = record.layout(SystemKind::StorageOnly);
        // 500 units * 40 users * 80 days * 1 L / 1000 L
        assert_eq!(layout.leased_tanks, 1600);
        assert_eq!(layout.land_plots, 11);
        // 20 000 users on a 1 000 L/day plant: 3-day community fill
        assert_eq!(record.plant.community_tanks, 40);
        assert_eq!(record.plant.on_site_tanks, 20);
    }
}

#[test]
fn test_recovered_mass_never_exceeds_urine_reaching_the_plant() {
    let config = small_config(50);
    let mut store = MemoryStore::new();
    let output =
        sample_and_run(&mut store, &reference_catalog(), &config, &reference_materials()).unwrap();
    for record in &output.records {
        let flow = record.flow;
        assert!(flow.after_transport_storage.n <= flow.after_collection.n);
        assert!(flow.after_collection.n <= flow.excreted_urine.n);
        assert!(flow.excreted_urine.n <= flow.excreted_total.n);

        let influent = record.plant.influent_precipitation * 365.0;
        let recovered = record.plant.annual_recovered;
        assert!(recovered.n <= influent.n * (1.0 + 1e-12));
        assert!(recovered.p <= influent.p * (1.0 + 1e-12));
        assert!(recovered.k <= influent.k * (1.0 + 1e-12));
    }
}

#[test]
fn test_same_seed_reproduces_results() {
    let config = small_config(25);
    let mut first = MemoryStore::new();
    let mut second = MemoryStore::new();
    sample_and_run(&mut first, &reference_catalog(), &config, &reference_materials()).unwrap();
    sample_and_run(&mut second, &reference_catalog(), &config, &reference_materials()).unwrap();

    for case in ScenarioCase::ALL {
        let a = first.read(RESULTS_TABLE, SHEET_BREAK_EVEN, case.key()).unwrap();
        let b = second.read(RESULTS_TABLE, SHEET_BREAK_EVEN, case.key()).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert!(x.to_bits() == y.to_bits(), "{case}: {x} != {y}");
        }
    }
}

#[test]
fn test_rerun_reuses_stored_samples() {
    let config = small_config(20);
    let materials = reference_materials();
    let mut store = MemoryStore::new();
    let sampled = sample_and_run(&mut store, &reference_catalog(), &config, &materials).unwrap();

    let reseeded = crate::config::AnalysisConfig {
        seed: 9_999,
        ..config.clone()
    };
    let rerun = run_pipeline(&mut store, &reseeded, &materials).unwrap();

    for (a, b) in sampled.records.iter().zip(&rerun.records) {
        assert_eq!(a.toilets, b.toilets);
        assert_eq!(a.flow, b.flow);
    }
}

#[test]
fn test_market_value_is_weighted_per_system() {
    let config = small_config(15);
    let mut store = MemoryStore::new();
    let output =
        sample_and_run(&mut store, &reference_catalog(), &config, &reference_materials()).unwrap();
    for record in &output.records {
        let storage = record.storage_only_market.unwrap();
        let full = record.full_treatment_market.unwrap();
        assert!(storage.total > 0.0);
        assert!(full.total > 0.0);
        assert!((storage.n + storage.p + storage.k - storage.total).abs() < 1e-12);
    }
    let stored = store
        .read(RESULTS_TABLE, SHEET_MARKET_VALUE, "full_treatment_weighted_total")
        .unwrap();
    assert_eq!(stored.len(), 15);
}
