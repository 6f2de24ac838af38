// ==============================================================================
// parsers/mod.rs - Upload row parsers
// ==============================================================================
// Description: Row validators and batch processing for each upload file type
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

pub mod markers;
pub mod individuals;
pub mod phenotypes;
pub mod genotypes;

pub use markers::{process_markers, MarkerRowValidator};
pub use individuals::{process_individuals, IndividualRowValidator};
pub use phenotypes::{process_phenotypes, PhenotypeHeader, PhenotypeRowValidator};
pub use genotypes::{process_genotypes, GenotypeRowValidator};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identifier::{self, IndividualId};
use crate::lookup::LookupError;
use crate::models::FileType;
use crate::report::{ErrorKind, RowError, RowErrorReport, ValidationError};

/// One decoded line of an upload
pub type Row = Vec<String>;

/// What a valid row contributes to the batch
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome<T> {
    /// Records to insert
    Insert(T),
    /// Row is valid but there is nothing to store (e.g. fully missing genotype)
    Nothing,
}

/// How many rows ended up where
///
/// `accepted + skipped + rejected` always equals `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    pub total: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub rejected: usize,
}

/// Accumulates row outcomes for one batch
///
/// Every row is offered to the collector; invalid rows become reports and
/// the batch keeps going. Only lookup failures stop it.
pub(crate) struct BatchCollector<T> {
    file_type: FileType,
    records: Vec<T>,
    reports: Vec<RowErrorReport>,
    counts: RowCounts,
}

impl<T> BatchCollector<T> {
    pub(crate) fn new(file_type: FileType) -> Self {
        Self {
            file_type,
            records: Vec::new(),
            reports: Vec::new(),
            counts: RowCounts::default(),
        }
    }

    pub(crate) fn push(
        &mut self,
        row_number: usize,
        row: &[String],
        outcome: Result<RowOutcome<T>, RowError>,
    ) -> Result<(), LookupError> {
        self.counts.total += 1;

        match outcome {
            Ok(RowOutcome::Insert(record)) => {
                self.counts.accepted += 1;
                self.records.push(record);
            }
            Ok(RowOutcome::Nothing) => {
                self.counts.skipped += 1;
            }
            Err(RowError::Invalid(error)) => {
                debug!(
                    "{} row {} rejected (column {:?}): {}",
                    self.file_type, row_number, error.column, error
                );
                self.counts.rejected += 1;
                self.reports.push(RowErrorReport::new(row_number, row, &error));
            }
            Err(RowError::Lookup(e)) => return Err(e),
        }

        Ok(())
    }

    /// Record a failure detected outside of row validation (e.g. a bad header)
    pub(crate) fn reject(&mut self, row_number: usize, row: &[String], error: &ValidationError) {
        self.counts.total += 1;
        self.counts.rejected += 1;
        self.reports.push(RowErrorReport::new(row_number, row, error));
    }

    pub(crate) fn counts(&self) -> RowCounts {
        self.counts
    }

    /// Accepted records if no row failed, otherwise every row report
    pub(crate) fn finish(self) -> Result<Vec<T>, Vec<RowErrorReport>> {
        if self.reports.is_empty() {
            Ok(self.records)
        } else {
            Err(self.reports)
        }
    }
}

/// Check a row has exactly the expected number of columns
pub(crate) fn expect_columns(row: &[String], expected: usize) -> Result<(), ValidationError> {
    if row.len() != expected {
        return Err(ErrorKind::ColumnCount {
            expected,
            found: row.len(),
        }
        .for_row());
    }
    Ok(())
}

/// Decode the full individual ID held in `column`
pub(crate) fn decode_id(row: &[String], column: usize) -> Result<IndividualId, ValidationError> {
    identifier::decode(&row[column]).map_err(|e| ErrorKind::from(e).at(column))
}

#[cfg(test)]
pub(crate) fn row(cells: &[&str]) -> Row {
    cells.iter().map(|c| c.to_string()).collect()
}
