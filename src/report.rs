// ==============================================================================
// report.rs - Validation Errors and Upload Error Reports
// ==============================================================================
// Description: Error taxonomy for upload rows and the per-row reports that are
//              handed back to users when a batch is rejected
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::IdError;
use crate::lookup::LookupError;
use crate::models::Records;

/// Broad class of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Wrong shape of row
    Structural,
    /// Cell could not be parsed
    Format,
    /// Something expected to be stored is not
    Referential,
    /// Something already stored (or already in this file)
    Uniqueness,
    /// Parsed fine but breaks a rule of the domain
    DomainRule,
}

/// Everything that can be wrong with a single upload row
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Expected {expected} columns, got {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("Expected a minimum of {minimum} columns, got {found}")]
    TooFewColumns { minimum: usize, found: usize },

    #[error("Phenotype file must start with a header row")]
    MissingHeader,

    #[error("Phenotype name cannot be blank")]
    BlankPhenotypeName,

    #[error("Phenotype '{0}' is named more than once")]
    RepeatedPhenotypeName(String),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error("Given number of alleles ({0}) must be a number")]
    AlleleCountNotANumber(String),

    #[error("Given number of alleles ({0}) does not match the number given")]
    AlleleCountMismatch(i64),

    #[error("Chromosome ({0}) must be a number")]
    Chromosome(String),

    #[error("Position ({0}) must be a number")]
    Position(String),

    #[error("An allele can only be a single character")]
    AlleleLength,

    #[error("Alleles must be letters or numbers")]
    AlleleNotAlphanumeric,

    #[error("Cannot be the missing data symbol")]
    AlleleIsMissingSymbol,

    #[error("Allele '{0}' is listed more than once")]
    RepeatedAllele(char),

    #[error("Marker already in database")]
    MarkerExists,

    #[error("An individual with this ID already exists in this project")]
    IndividualExists,

    #[error("Phenotype '{0}' is already stored for this individual")]
    PhenotypeExists(String),

    #[error("A genotype for this marker is already stored for this individual")]
    GenotypeExists,

    #[error("Duplicates row {first_row} of this file")]
    DuplicateInBatch { first_row: usize },

    #[error("No individual stored with the ID {0}")]
    IndividualNotFound(String),

    #[error("Invalid marker - not stored in marker management system")]
    MarkerNotFound,

    #[error("Not a valid gender value")]
    InvalidGender,

    #[error("Father's gender should be male")]
    FatherNotMale,

    #[error("Mother's gender should be female")]
    MotherNotFemale,

    #[error("Phenotype value cannot be blank")]
    BlankPhenotypeValue,

    #[error("Either both alleles must be missing, or neither")]
    PartialGenotype,

    #[error("Not a valid allele for this marker")]
    UnknownAllele,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::ColumnCount { .. }
            | ErrorKind::TooFewColumns { .. }
            | ErrorKind::MissingHeader => ErrorCategory::Structural,

            ErrorKind::Id(_)
            | ErrorKind::AlleleCountNotANumber(_)
            | ErrorKind::AlleleCountMismatch(_)
            | ErrorKind::Chromosome(_)
            | ErrorKind::Position(_) => ErrorCategory::Format,

            ErrorKind::IndividualNotFound(_) | ErrorKind::MarkerNotFound => {
                ErrorCategory::Referential
            }

            ErrorKind::MarkerExists
            | ErrorKind::IndividualExists
            | ErrorKind::PhenotypeExists(_)
            | ErrorKind::GenotypeExists
            | ErrorKind::DuplicateInBatch { .. }
            | ErrorKind::RepeatedAllele(_)
            | ErrorKind::RepeatedPhenotypeName(_) => ErrorCategory::Uniqueness,

            ErrorKind::BlankPhenotypeName
            | ErrorKind::AlleleLength
            | ErrorKind::AlleleNotAlphanumeric
            | ErrorKind::AlleleIsMissingSymbol
            | ErrorKind::InvalidGender
            | ErrorKind::FatherNotMale
            | ErrorKind::MotherNotFemale
            | ErrorKind::BlankPhenotypeValue
            | ErrorKind::PartialGenotype
            | ErrorKind::UnknownAllele => ErrorCategory::DomainRule,
        }
    }

    /// Attach the error to a single column of the row
    pub fn at(self, column: usize) -> ValidationError {
        ValidationError {
            column: Some(column),
            kind: self,
        }
    }

    /// Attach the error to the row as a whole
    pub fn for_row(self) -> ValidationError {
        ValidationError { column: None, kind: self }
    }
}

/// Validation failure located within a row
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct ValidationError {
    /// Offending column, or `None` when the row as a whole is at fault
    pub column: Option<usize>,
    pub kind: ErrorKind,
}

/// Outcome of validating one row that did not produce records
#[derive(Error, Debug)]
pub enum RowError {
    /// Row is invalid; reported back and the batch carries on
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Lookup failed; the batch cannot continue
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// One original cell of a rejected row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellReport {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the user needs to fix a rejected row
///
/// Row-level failures (wrong number of columns) carry `message` and no cells;
/// cell-level failures carry every original cell, exactly one of which has an
/// error attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowErrorReport {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub cells: Vec<CellReport>,
}

impl RowErrorReport {
    pub fn new(row: usize, cells: &[String], error: &ValidationError) -> Self {
        let message = error.kind.to_string();

        match error.column {
            None => Self {
                row,
                message: Some(message),
                cells: Vec::new(),
            },
            Some(column) => Self {
                row,
                message: None,
                cells: cells
                    .iter()
                    .enumerate()
                    .map(|(index, value)| CellReport {
                        value: value.clone(),
                        error: (index == column).then(|| message.clone()),
                    })
                    .collect(),
            },
        }
    }

    /// Message attached to the row or to its offending cell
    pub fn error_message(&self) -> Option<&str> {
        self.message.as_deref().or_else(|| {
            self.cells
                .iter()
                .find_map(|cell| cell.error.as_deref())
        })
    }

    /// Index of the cell carrying the error, if the failure is cell-scoped
    pub fn error_column(&self) -> Option<usize> {
        self.cells.iter().position(|cell| cell.error.is_some())
    }
}

/// Rejected upload: column headings plus one entry per bad row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub headers: Vec<String>,
    pub rows: Vec<RowErrorReport>,
}

impl ErrorReport {
    /// Plain-text rendering, one line per rejected row
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if !self.headers.is_empty() {
            out.push_str(&format!("Columns: {}\n", self.headers.join(", ")));
        }
        for report in &self.rows {
            let message = report.error_message().unwrap_or("invalid row");
            match report.error_column() {
                Some(column) => {
                    let value = report.cells[column].value.as_str();
                    out.push_str(&format!(
                        "Row {}, column {} ('{}'): {}\n",
                        report.row,
                        column + 1,
                        value,
                        message
                    ));
                }
                None => out.push_str(&format!("Row {}: {}\n", report.row, message)),
            }
        }
        out
    }
}

/// Result of validating a whole upload
///
/// Either every row was valid and the records can be inserted, or nothing
/// should be inserted and the report explains why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum BatchResult {
    Success(Records),
    Failure(ErrorReport),
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchResult::Success(_))
    }
}
