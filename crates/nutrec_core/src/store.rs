//! Tabular data store contract.
//!
//! Stages exchange data through named tables split into sheets of numeric
//! columns. Rows are identified by iteration index: every stored sheet carries
//! an [`ITERATION_COLUMN`] that must read back as exactly `0..N`.

use rustc_hash::FxHashMap;

use crate::error::{AlignmentError, StoreError};

pub const ITERATION_COLUMN: &str = "iteration";

/// Row-major numeric sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build from equally long columns
    pub fn from_columns(names: Vec<String>, columns: &[&[f64]]) -> Result<Self, StoreError> {
        if names.len() != columns.len() {
            return Err(StoreError::UnequalColumns {
                column: names.last().cloned().unwrap_or_default(),
                expected: names.len(),
                found: columns.len(),
            });
        }
        let len = columns.first().map_or(0, |c| c.len());
        if let Some((name, column)) = names.iter().zip(columns).find(|(_, c)| c.len() != len) {
            return Err(StoreError::UnequalColumns {
                column: name.clone(),
                expected: len,
                found: column.len(),
            });
        }
        let rows = (0..len)
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();
        Ok(Self {
            columns: names,
            rows,
        })
    }

    pub fn push_row(&mut self, row: Vec<f64>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).copied().unwrap_or(f64::NAN))
                .collect(),
        )
    }

    /// Reject rows whose width differs from the header
    pub fn check_shape(&self, table: &str, sheet: &str) -> Result<(), StoreError> {
        let expected = self.columns.len();
        match self.rows.iter().find(|r| r.len() != expected) {
            Some(row) => Err(StoreError::RaggedRows {
                table: table.to_string(),
                sheet: sheet.to_string(),
                expected,
                found: row.len(),
            }),
            None => Ok(()),
        }
    }

    /// Copy with a leading iteration column, unless one is already present
    #[must_use]
    pub fn with_iteration(&self) -> Table {
        if self.column_index(ITERATION_COLUMN).is_some() {
            return self.clone();
        }
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(ITERATION_COLUMN.to_string());
        columns.extend(self.columns.iter().cloned());
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let mut row = Vec::with_capacity(r.len() + 1);
                row.push(i as f64);
                row.extend_from_slice(r);
                row
            })
            .collect();
        Table { columns, rows }
    }
}

/// Storage back-end for stage inputs and outputs
pub trait TableStore {
    /// Read one column of a sheet, in stored row order
    fn read(&self, table: &str, sheet: &str, column: &str) -> Result<Vec<f64>, StoreError>;

    /// Replace a sheet. Rows without an iteration column are numbered in order.
    fn write(&mut self, table: &str, sheet: &str, data: &Table) -> Result<(), StoreError>;

    fn has_table(&self, table: &str, sheet: &str) -> bool;
}

/// Check that a column read back has exactly `expected` rows
pub fn check_len(
    table: &str,
    column: &str,
    values: &[f64],
    expected: usize,
) -> Result<(), AlignmentError> {
    if values.len() != expected {
        return Err(AlignmentError::RowCount {
            table: table.to_string(),
            column: column.to_string(),
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

/// Check that a stored iteration column runs `0..expected` in order
pub fn check_iteration_order(
    table: &str,
    iterations: &[f64],
    expected: usize,
) -> Result<(), AlignmentError> {
    check_len(table, ITERATION_COLUMN, iterations, expected)?;
    for (row, &it) in iterations.iter().enumerate() {
        if it != row as f64 {
            return Err(AlignmentError::Misordered {
                table: table.to_string(),
                row,
                iteration: if it.is_finite() && it >= 0.0 {
                    it as usize
                } else {
                    usize::MAX
                },
            });
        }
    }
    Ok(())
}

/// In-process store keyed by `(table, sheet)`
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sheets: FxHashMap<(String, String), Table>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, table: &str, sheet: &str) -> Option<&Table> {
        self.sheets.get(&(table.to_string(), sheet.to_string()))
    }

    pub fn sheet_names(&self, table: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .sheets
            .keys()
            .filter(|(t, _)| t == table)
            .map(|(_, s)| s.clone())
            .collect();
        names.sort();
        names
    }
}

impl TableStore for MemoryStore {
    fn read(&self, table: &str, sheet: &str, column: &str) -> Result<Vec<f64>, StoreError> {
        let data = self
            .sheet(table, sheet)
            .ok_or_else(|| StoreError::MissingTable(format!("{table}/{sheet}")))?;
        data.column(column).ok_or_else(|| StoreError::MissingColumn {
            table: format!("{table}/{sheet}"),
            column: column.to_string(),
        })
    }

    fn write(&mut self, table: &str, sheet: &str, data: &Table) -> Result<(), StoreError> {
        data.check_shape(table, sheet)?;
        self.sheets
            .insert((table.to_string(), sheet.to_string()), data.with_iteration());
        Ok(())
    }

    fn has_table(&self, table: &str, sheet: &str) -> bool {
        self.sheet(table, sheet).is_some()
    }
}
