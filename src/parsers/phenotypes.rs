// ==============================================================================
// phenotypes.rs - Phenotype File Parser
// ==============================================================================
// Description: Validates phenotype uploads (wide format, one row per individual)
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format: CSV with header naming the phenotypes
// Example:
//   ID,Height,Weight
//   CLN_FAM_1,180,x
//   CLN_FAM_2,165,61
// A value of "x" means not measured and produces no record. Row numbers in
// reports count the header as row 1.
// ==============================================================================

use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use super::{decode_id, expect_columns, BatchCollector, Row, RowOutcome};
use crate::lookup::{LookupError, LookupService};
use crate::models::{
    FileType, IndividualDbId, Phenotype, ProjectId, Records, MISSING_DATA_SYMBOL,
};
use crate::report::{BatchResult, ErrorKind, ErrorReport, RowError, ValidationError};

/// Phenotype names declared by the header row (column 0 is the ID column)
#[derive(Debug, Clone, PartialEq)]
pub struct PhenotypeHeader {
    row: Row,
}

impl PhenotypeHeader {
    pub fn new(row: Row) -> Self {
        Self { row }
    }

    /// Names of the phenotypes, in column order
    pub fn names(&self) -> &[String] {
        self.row.get(1..).unwrap_or(&[])
    }

    /// Every header cell, including the ID column
    pub fn columns(&self) -> &[String] {
        &self.row
    }

    /// Phenotype names must be present and distinct
    pub fn check(&self) -> Result<(), ValidationError> {
        let mut names = HashSet::new();
        for (offset, name) in self.names().iter().enumerate() {
            let column = offset + 1;
            if name.trim().is_empty() {
                return Err(ErrorKind::BlankPhenotypeName.at(column));
            }
            if !names.insert(name.as_str()) {
                return Err(ErrorKind::RepeatedPhenotypeName(name.clone()).at(column));
            }
        }
        Ok(())
    }
}

/// Validates phenotype rows against the header and stored individuals
pub struct PhenotypeRowValidator<'a> {
    project_id: ProjectId,
    header: &'a PhenotypeHeader,
    lookup: &'a dyn LookupService,
    /// Row that first supplied each (individual, phenotype) value
    seen: HashMap<(IndividualDbId, String), usize>,
}

impl<'a> PhenotypeRowValidator<'a> {
    pub fn new(
        project_id: ProjectId,
        header: &'a PhenotypeHeader,
        lookup: &'a dyn LookupService,
    ) -> Self {
        Self {
            project_id,
            header,
            lookup,
            seen: HashMap::new(),
        }
    }

    /// Validate one data row into zero or more phenotypes
    pub fn validate(
        &mut self,
        row: &[String],
        row_number: usize,
    ) -> Result<RowOutcome<Vec<Phenotype>>, RowError> {
        let names = self.header.names();
        expect_columns(row, names.len() + 1)?;

        let id = decode_id(row, 0)?;
        let individual_id = self
            .lookup
            .find_individual(self.project_id, &id)?
            .ok_or_else(|| ErrorKind::IndividualNotFound(row[0].clone()).at(0))?;

        let mut phenotypes = Vec::new();
        for (offset, (name, value)) in names.iter().zip(&row[1..]).enumerate() {
            let column = offset + 1;

            if value.trim().is_empty() {
                return Err(ErrorKind::BlankPhenotypeValue.at(column).into());
            }
            if value == MISSING_DATA_SYMBOL {
                continue;
            }
            if self.lookup.phenotype_exists(individual_id, name)? {
                return Err(ErrorKind::PhenotypeExists(name.clone()).at(column).into());
            }
            if let Some(&first_row) = self.seen.get(&(individual_id, name.clone())) {
                return Err(ErrorKind::DuplicateInBatch { first_row }.at(column).into());
            }

            phenotypes.push(Phenotype {
                individual_id,
                name: name.clone(),
                value: value.clone(),
            });
        }

        for phenotype in &phenotypes {
            self.seen
                .insert((individual_id, phenotype.name.clone()), row_number);
        }
        Ok(RowOutcome::Insert(phenotypes))
    }
}

/// Validate a whole phenotype upload for `project_id`
///
/// The first row is the header. A file without one fails outright; a header
/// with blank or repeated names is reported as row 1 while the data rows are
/// still validated.
pub fn process_phenotypes(
    rows: &[Row],
    project_id: ProjectId,
    lookup: &dyn LookupService,
) -> Result<BatchResult, LookupError> {
    let mut collector = BatchCollector::new(FileType::Phenotypes);

    let Some((header_row, data_rows)) = rows.split_first() else {
        warn!("Phenotype upload for project {} has no header row", project_id);
        collector.reject(1, &[], &ErrorKind::MissingHeader.for_row());
        return Ok(BatchResult::Failure(ErrorReport {
            headers: Vec::new(),
            rows: collector.finish().err().unwrap_or_default(),
        }));
    };

    let header = PhenotypeHeader::new(header_row.clone());
    if let Err(error) = header.check() {
        collector.reject(1, header.columns(), &error);
    }

    let mut validator = PhenotypeRowValidator::new(project_id, &header, lookup);
    for (index, row) in data_rows.iter().enumerate() {
        // Header is row 1
        let row_number = index + 2;
        let outcome = validator.validate(row, row_number);
        collector.push(row_number, row, outcome)?;
    }

    let counts = collector.counts();
    info!(
        "Phenotype batch validated for project {}: {} phenotypes, {} rows, {} accepted, {} rejected",
        project_id,
        header.names().len(),
        counts.total,
        counts.accepted,
        counts.rejected
    );

    Ok(match collector.finish() {
        Ok(per_row) => BatchResult::Success(Records::Phenotypes(
            per_row.into_iter().flatten().collect(),
        )),
        Err(rows) => BatchResult::Failure(ErrorReport {
            headers: header.columns().to_vec(),
            rows,
        }),
    })
}
