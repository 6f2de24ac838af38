// ==============================================================================
// genotypes.rs - Genotype File Parser
// ==============================================================================
// Description: Validates genotype uploads (long format, one call pair per row)
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format: CSV without header, four columns
// Example:
//   CLN_FAM_1,rs12345,A,G
//   CLN_FAM_2,rs12345,x,x
// Both calls must be registered alleles of the marker, or both must be "x".
// A fully missing pair is not stored and is not an error.
// ==============================================================================

use std::collections::HashMap;
use tracing::info;

use super::{decode_id, expect_columns, BatchCollector, Row, RowOutcome};
use crate::lookup::{LookupError, LookupService};
use crate::models::{
    FileType, Genotype, IndividualDbId, ProjectId, Records, MISSING_DATA_SYMBOL,
};
use crate::report::{BatchResult, ErrorKind, ErrorReport, RowError};

const COLUMNS: usize = 4;
const CALL_1_COLUMN: usize = 2;
const CALL_2_COLUMN: usize = 3;

/// Validates genotype rows for one project
pub struct GenotypeRowValidator<'a> {
    project_id: ProjectId,
    lookup: &'a dyn LookupService,
    seen: HashMap<(IndividualDbId, String), usize>,
}

impl<'a> GenotypeRowValidator<'a> {
    pub fn new(project_id: ProjectId, lookup: &'a dyn LookupService) -> Self {
        Self {
            project_id,
            lookup,
            seen: HashMap::new(),
        }
    }

    /// Validate one row into a genotype
    ///
    /// # Returns
    /// * `Ok(RowOutcome::Insert(_))` - both calls present and registered for the marker
    /// * `Ok(RowOutcome::Nothing)` - both calls are the missing-data symbol
    /// * `Err(RowError)` - invalid row, or a lookup failure
    pub fn validate(
        &mut self,
        row: &[String],
        row_number: usize,
    ) -> Result<RowOutcome<Genotype>, RowError> {
        expect_columns(row, COLUMNS)?;

        let id = decode_id(row, 0)?;
        let individual_id = self
            .lookup
            .find_individual(self.project_id, &id)?
            .ok_or_else(|| ErrorKind::IndividualNotFound(row[0].clone()).at(0))?;

        let marker = &row[1];
        if !self.lookup.marker_exists(marker)? {
            return Err(ErrorKind::MarkerNotFound.at(1).into());
        }

        let (call_1, call_2) = (&row[CALL_1_COLUMN], &row[CALL_2_COLUMN]);
        match (call_1 == MISSING_DATA_SYMBOL, call_2 == MISSING_DATA_SYMBOL) {
            (true, true) => return Ok(RowOutcome::Nothing),
            (true, false) => return Err(ErrorKind::PartialGenotype.at(CALL_1_COLUMN).into()),
            (false, true) => return Err(ErrorKind::PartialGenotype.at(CALL_2_COLUMN).into()),
            (false, false) => {}
        }

        let call_1 = self.registered_allele(marker, call_1, CALL_1_COLUMN)?;
        let call_2 = self.registered_allele(marker, call_2, CALL_2_COLUMN)?;

        if self.lookup.genotype_exists(individual_id, marker)? {
            return Err(ErrorKind::GenotypeExists.at(1).into());
        }
        let key = (individual_id, marker.clone());
        if let Some(&first_row) = self.seen.get(&key) {
            return Err(ErrorKind::DuplicateInBatch { first_row }.at(1).into());
        }
        self.seen.insert(key, row_number);

        Ok(RowOutcome::Insert(Genotype {
            individual_id,
            marker: marker.clone(),
            call_1,
            call_2,
        }))
    }

    /// Resolve a call to an allele registered for `marker`
    fn registered_allele(&self, marker: &str, call: &str, column: usize) -> Result<char, RowError> {
        let mut chars = call.chars();
        let allele = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return Err(ErrorKind::UnknownAllele.at(column).into()),
        };

        if !self.lookup.allele_exists(marker, allele)? {
            return Err(ErrorKind::UnknownAllele.at(column).into());
        }
        Ok(allele)
    }
}

/// Validate a whole genotype upload for `project_id`
///
/// Rows whose calls are both missing are skipped: they appear neither in the
/// records nor in the error report.
pub fn process_genotypes(
    rows: &[Row],
    project_id: ProjectId,
    lookup: &dyn LookupService,
) -> Result<BatchResult, LookupError> {
    let mut validator = GenotypeRowValidator::new(project_id, lookup);
    let mut collector = BatchCollector::new(FileType::Genotypes);

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;
        let outcome = validator.validate(row, row_number);
        collector.push(row_number, row, outcome)?;
    }

    let counts = collector.counts();
    info!(
        "Genotype batch validated for project {}: {} rows, {} accepted, {} skipped, {} rejected",
        project_id, counts.total, counts.accepted, counts.skipped, counts.rejected
    );

    Ok(match collector.finish() {
        Ok(genotypes) => BatchResult::Success(Records::Genotypes(genotypes)),
        Err(rows) => BatchResult::Failure(ErrorReport {
            headers: FileType::Genotypes.report_headers(),
            rows,
        }),
    })
}
