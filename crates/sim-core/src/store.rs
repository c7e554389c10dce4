//! Key-value cell store: the simulation's only interface to persistent state.
//!
//! Tables are addressed by name, rows by their first-column label and cells
//! by column header, mirroring the spreadsheet exports the game is run from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure while persisting a value.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("table {0} is read-only")]
    ReadOnly(String),
}

/// Named-table, named-row, named-column storage.
pub trait CellStore {
    /// Look up a cell. `None` when the table, row or column is absent.
    fn read_value(&self, table: &str, row: &str, column: &str) -> Option<String>;

    /// Upsert a cell. Absent rows are appended and absent columns added.
    fn write_value(
        &mut self,
        table: &str,
        row: &str,
        column: &str,
        value: &str,
    ) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub label: String,
    pub cells: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Column headers in first-seen order.
    pub columns: Vec<String>,
    /// Rows in insertion order.
    pub rows: Vec<Row>,
}

impl Table {
    pub fn row(&self, label: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.label == label)
    }

    fn upsert(&mut self, row: &str, column: &str, value: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
        let idx = match self.rows.iter().position(|r| r.label == row) {
            Some(idx) => idx,
            None => {
                self.rows.push(Row {
                    label: row.to_string(),
                    cells: BTreeMap::new(),
                });
                self.rows.len() - 1
            }
        };
        self.rows[idx]
            .cells
            .insert(column.to_string(), value.to_string());
    }
}

/// In-memory store; also the serialisable body of on-disk snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Seed a row with several cells at once.
    pub fn insert_row<'a>(
        &mut self,
        table: &str,
        row: &str,
        cells: impl IntoIterator<Item = (&'a str, String)>,
    ) {
        let t = self.tables.entry(table.to_string()).or_default();
        for (column, value) in cells {
            t.upsert(row, column, &value);
        }
    }
}

impl CellStore for MemoryStore {
    fn read_value(&self, table: &str, row: &str, column: &str) -> Option<String> {
        self.tables
            .get(table)?
            .row(row)?
            .cells
            .get(column)
            .cloned()
    }

    fn write_value(
        &mut self,
        table: &str,
        row: &str,
        column: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.tables
            .entry(table.to_string())
            .or_default()
            .upsert(row, column, value);
        Ok(())
    }
}
