//! CSV directory store
//!
//! Layout:
//! <root>/
//!   uncertainty_ranges/
//!     RR_triangle.csv
//!     ...
//!   results/
//!     break_even.csv
//!     ...
//!
//! Every sheet starts with an `iteration` column.

use std::fs;
use std::path::{Path, PathBuf};

use nutrec_core::error::StoreError;
use nutrec_core::store::{Table, TableStore};

/// Reads and writes one CSV file per sheet under a root directory
#[derive(Debug, Clone)]
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sheet_path(&self, table: &str, sheet: &str) -> PathBuf {
        self.root.join(table).join(format!("{sheet}.csv"))
    }
}

fn parse_value(field: &str) -> Result<f64, StoreError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field
        .parse()
        .map_err(|e| StoreError::Parse(format!("'{field}' is not a number: {e}")))
}

impl TableStore for CsvStore {
    fn read(&self, table: &str, sheet: &str, column: &str) -> Result<Vec<f64>, StoreError> {
        let path = self.sheet_path(table, sheet);
        if !path.exists() {
            return Err(StoreError::MissingTable(format!("{table}/{sheet}")));
        }

        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| StoreError::Io(format!("Failed to open {}: {e}", path.display())))?;
        let headers = reader
            .headers()
            .map_err(|e| StoreError::Parse(format!("Failed to read {} header: {e}", path.display())))?
            .clone();
        let index = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| StoreError::MissingColumn {
                table: format!("{table}/{sheet}"),
                column: column.to_string(),
            })?;

        let mut values = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| StoreError::Parse(format!("Failed to read {}: {e}", path.display())))?;
            values.push(parse_value(record.get(index).unwrap_or(""))?);
        }
        Ok(values)
    }

    fn write(&mut self, table: &str, sheet: &str, data: &Table) -> Result<(), StoreError> {
        data.check_shape(table, sheet)?;
        let data = data.with_iteration();

        let dir = self.root.join(table);
        fs::create_dir_all(&dir).map_err(|e| {
            StoreError::Io(format!("Failed to create {}: {e}", dir.display()))
        })?;

        let path = self.sheet_path(table, sheet);
        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| StoreError::Io(format!("Failed to create {}: {e}", path.display())))?;
        let write_err = |e: csv::Error| StoreError::Io(format!("Failed to write {}: {e}", path.display()));

        writer.write_record(&data.columns).map_err(write_err)?;
        for row in &data.rows {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|e| StoreError::Io(format!("Failed to flush {}: {e}", path.display())))?;

        tracing::debug!(table, sheet, rows = data.rows.len(), "sheet written");
        Ok(())
    }

    fn has_table(&self, table: &str, sheet: &str) -> bool {
        self.sheet_path(table, sheet).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutrec_core::store::ITERATION_COLUMN;

    #[test]
    fn test_round_trip_keeps_iteration_and_special_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvStore::new(dir.path());
        let table = Table::from_columns(
            vec!["cart".into(), "truck".into()],
            &[&[0.25, f64::NAN, 1e-9], &[20_000.0, 18_500.5, f64::INFINITY]],
        )
        .unwrap();
        store.write("uncertainty_ranges", "transport_costs", &table).unwrap();

        assert!(
            dir.path()
                .join("uncertainty_ranges")
                .join("transport_costs.csv")
                .exists()
        );
        assert_eq!(
            store
                .read("uncertainty_ranges", "transport_costs", ITERATION_COLUMN)
                .unwrap(),
            vec![0.0, 1.0, 2.0]
        );
        let cart = store
            .read("uncertainty_ranges", "transport_costs", "cart")
            .unwrap();
        assert_eq!(cart[0], 0.25);
        assert!(cart[1].is_nan());
        assert_eq!(cart[2], 1e-9);
        let truck = store
            .read("uncertainty_ranges", "transport_costs", "truck")
            .unwrap();
        assert_eq!(truck, vec![20_000.0, 18_500.5, f64::INFINITY]);
    }

    #[test]
    fn test_missing_sheet_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvStore::new(dir.path());
        assert!(!store.has_table("results", "break_even"));
        assert!(matches!(
            store.read("results", "break_even", "x"),
            Err(StoreError::MissingTable(_))
        ));

        let table = Table::from_columns(vec!["a".into()], &[&[1.0]]).unwrap();
        store.write("results", "break_even", &table).unwrap();
        assert!(store.has_table("results", "break_even"));
        assert!(matches!(
            store.read("results", "break_even", "x"),
            Err(StoreError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_hand_edited_file_with_bad_number_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("uncertainty_ranges");
        fs::create_dir_all(&sheet).unwrap();
        fs::write(
            sheet.join("DCA_parameters.csv"),
            "iteration,income_tax\n0,0.3\n1,thirty\n",
        )
        .unwrap();

        let store = CsvStore::new(dir.path());
        assert!(matches!(
            store.read("uncertainty_ranges", "DCA_parameters", "income_tax"),
            Err(StoreError::Parse(_))
        ));
    }

    #[test]
    fn test_rewrite_replaces_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvStore::new(dir.path());
        let long = Table::from_columns(vec!["a".into()], &[&[1.0, 2.0, 3.0]]).unwrap();
        let short = Table::from_columns(vec!["a".into()], &[&[9.0]]).unwrap();
        store.write("results", "s", &long).unwrap();
        store.write("results", "s", &short).unwrap();
        assert_eq!(store.read("results", "s", "a").unwrap(), vec![9.0]);
    }
}
