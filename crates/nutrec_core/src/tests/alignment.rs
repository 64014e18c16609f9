//! Tests for stage inputs that cannot be joined by iteration index
//!
//! These tests verify that a run aborts, before writing any result, when:
//! - A stored column is shorter than the configured sample count
//! - A sheet's iteration column is out of order
//! - A required sample group was never written
//! - A toilet item is missing from the material catalog

use super::fixtures::{reference_catalog, reference_materials, small_config};
use crate::error::{AlignmentError, ConfigError, PipelineError, StoreError};
use crate::pipeline::{run_pipeline, sample_into};
use crate::schema::*;
use crate::store::{ITERATION_COLUMN, MemoryStore, Table, TableStore};

fn sampled_store(samples: usize) -> MemoryStore {
    let mut store = MemoryStore::new();
    sample_into(&mut store, &reference_catalog(), &small_config(samples)).unwrap();
    store
}

#[test]
fn test_short_column_is_a_row_count_error() {
    let mut store = sampled_store(12);
    let cart = [0.003; 11];
    let truck = [20_000.0; 11];
    let truncated = Table::from_columns(
        vec![CART.to_string(), TRUCK.to_string()],
        &[&cart[..], &truck[..]],
    )
    .unwrap();
    store.write(SAMPLES_TABLE, TRANSPORT_COSTS, &truncated).unwrap();

    let err = run_pipeline(&mut store, &small_config(12), &reference_materials()).unwrap_err();
    match err {
        PipelineError::Alignment(AlignmentError::RowCount {
            expected, found, ..
        }) => {
            assert_eq!(expected, 12);
            assert_eq!(found, 11);
        }
        other => panic!("expected a row count error, got {other}"),
    }
    assert!(!store.has_table(RESULTS_TABLE, SHEET_BREAK_EVEN));
}

#[test]
fn test_swapped_iterations_are_rejected() {
    let mut store = sampled_store(5);
    let mut table = Table::new(vec![
        ITERATION_COLUMN.to_string(),
        INCOME_TAX.to_string(),
        DISCOUNT_RATE.to_string(),
    ]);
    for iteration in [0.0, 1.0, 3.0, 2.0, 4.0] {
        table.push_row(vec![iteration, 0.2, 0.1]);
    }
    store.write(SAMPLES_TABLE, DCA_PARAMETERS, &table).unwrap();

    let err = run_pipeline(&mut store, &small_config(5), &reference_materials()).unwrap_err();
    assert!(
        matches!(
            err,
            PipelineError::Alignment(AlignmentError::Misordered {
                row: 2,
                iteration: 3,
                ..
            })
        ),
        "got {err}"
    );
}

#[test]
fn test_sample_count_mismatch_with_config_is_rejected() {
    let mut store = sampled_store(10);
    let err = run_pipeline(&mut store, &small_config(20), &reference_materials()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Alignment(AlignmentError::RowCount { .. })
    ));
}

#[test]
fn test_missing_group_is_reported_by_name() {
    let mut catalog = reference_catalog();
    catalog.groups.retain(|g| g.name != RR_N_RECOVERY_TRIANGLE);
    let mut store = MemoryStore::new();
    sample_into(&mut store, &catalog, &small_config(8)).unwrap();

    let err = run_pipeline(&mut store, &small_config(8), &reference_materials()).unwrap_err();
    match err {
        PipelineError::Store(StoreError::MissingTable(name)) => {
            assert!(name.ends_with(RR_N_RECOVERY_TRIANGLE), "{name}");
        }
        other => panic!("expected a missing table, got {other}"),
    }
}

#[test]
fn test_missing_label_is_a_missing_column() {
    let mut catalog = reference_catalog();
    for group in &mut catalog.groups {
        if group.name == FERTILIZER_COST {
            group.parameters.retain(|p| p.label != KCL);
        }
    }
    let mut store = MemoryStore::new();
    sample_into(&mut store, &catalog, &small_config(8)).unwrap();

    let err = run_pipeline(&mut store, &small_config(8), &reference_materials()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Store(StoreError::MissingColumn { ref column, .. }) if column == KCL
    ));
}

#[test]
fn test_unknown_toilet_item_is_a_config_error() {
    let mut store = sampled_store(4);
    let mut config = small_config(4);
    config.sanitation.pit_items.push("D999".to_string());

    let err = run_pipeline(&mut store, &config, &reference_materials()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::InvalidSetting {
            setting: "sanitation.pit_items",
            ..
        })
    ));
}
