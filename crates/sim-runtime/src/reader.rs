//! Numeric cell reads with a per-cycle issue log.

use std::collections::BTreeSet;

use sim_core::{parse_number, CellError, CellRef, CellStore, ReadPolicy, StoreError};

/// A value that could not be persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteFailure {
    pub cell: CellRef,
    pub error: StoreError,
}

/// Cells defaulted during one cycle, each recorded once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadLog {
    issues: Vec<CellError>,
    seen: BTreeSet<CellRef>,
}

impl ReadLog {
    /// Record `error`, warning the first time its cell fails. Returns whether
    /// the cell was new to the log.
    pub fn record(&mut self, error: CellError) -> bool {
        if !self.seen.insert(error.cell().clone()) {
            return false;
        }
        tracing::warn!(error = %error, "defaulting cell to 0");
        self.issues.push(error);
        true
    }

    pub fn issues(&self) -> &[CellError] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn into_issues(self) -> Vec<CellError> {
        self.issues
    }
}

/// Reads numbers from a store, applying the configured [`ReadPolicy`].
///
/// In lenient mode a missing or malformed cell reads as `0.0` and goes into
/// the [`ReadLog`], which warns once per cell however often it is read. In
/// strict mode the error is returned to the caller.
pub struct CellReader<'a, S: CellStore + ?Sized> {
    store: &'a S,
    policy: ReadPolicy,
    log: ReadLog,
}

impl<'a, S: CellStore + ?Sized> CellReader<'a, S> {
    pub fn new(store: &'a S, policy: ReadPolicy) -> Self {
        Self::with_log(store, policy, ReadLog::default())
    }

    /// Continue a cycle's log, so cells already reported stay silent.
    pub fn with_log(store: &'a S, policy: ReadPolicy, log: ReadLog) -> Self {
        Self { store, policy, log }
    }

    /// Read without applying the policy.
    pub fn try_number(&self, table: &str, row: &str, column: &str) -> Result<f64, CellError> {
        let cell = || CellRef::new(table, row, column);
        let raw = self
            .store
            .read_value(table, row, column)
            .ok_or_else(|| CellError::MissingCell(cell()))?;
        parse_number(&raw).map_err(|e| CellError::MalformedNumber {
            cell: cell(),
            raw: e.0,
        })
    }

    pub fn number(&mut self, table: &str, row: &str, column: &str) -> Result<f64, CellError> {
        match self.try_number(table, row, column) {
            Ok(v) => Ok(v),
            Err(e) => match self.policy {
                ReadPolicy::Strict => Err(e),
                ReadPolicy::Lenient => {
                    self.log.record(e);
                    Ok(0.0)
                }
            },
        }
    }

    pub fn issues(&self) -> &[CellError] {
        self.log.issues()
    }

    pub fn into_log(self) -> ReadLog {
        self.log
    }

    pub fn into_issues(self) -> Vec<CellError> {
        self.log.into_issues()
    }
}

/// Write one value, recording rather than propagating a failure.
pub fn write_logged<S: CellStore + ?Sized>(
    store: &mut S,
    failures: &mut Vec<WriteFailure>,
    table: &str,
    row: &str,
    column: &str,
    value: &str,
) {
    if let Err(error) = store.write_value(table, row, column, value) {
        let cell = CellRef::new(table, row, column);
        tracing::warn!(%cell, %error, "failed to persist value");
        failures.push(WriteFailure { cell, error });
    }
}
