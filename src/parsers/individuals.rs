// ==============================================================================
// individuals.rs - Individuals File Parser
// ==============================================================================
// Description: Validates individual upload rows for a project
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format: CSV without header, two columns
// Example:
//   CLN_FAM_1,1
//   CLN_FAM_2,2
//   CLN_FAM_3,0
// Gender codes: 0 = unknown, 1 = male, 2 = female. Member 1 is the father
// and must be male, member 2 is the mother and must be female.
// ==============================================================================

use std::collections::HashMap;
use tracing::info;

use super::{decode_id, expect_columns, BatchCollector, Row, RowOutcome};
use crate::identifier::IndividualId;
use crate::lookup::{LookupError, LookupService};
use crate::models::{FileType, Gender, Individual, ProjectId, Records};
use crate::report::{BatchResult, ErrorKind, ErrorReport, RowError};

const COLUMNS: usize = 2;

/// Validates individual rows for one project
pub struct IndividualRowValidator<'a> {
    project_id: ProjectId,
    lookup: &'a dyn LookupService,
    seen: HashMap<IndividualId, usize>,
}

impl<'a> IndividualRowValidator<'a> {
    pub fn new(project_id: ProjectId, lookup: &'a dyn LookupService) -> Self {
        Self {
            project_id,
            lookup,
            seen: HashMap::new(),
        }
    }

    pub fn validate(
        &mut self,
        row: &[String],
        row_number: usize,
    ) -> Result<RowOutcome<Individual>, RowError> {
        expect_columns(row, COLUMNS)?;

        let id = decode_id(row, 0)?;

        if self.lookup.find_individual(self.project_id, &id)?.is_some() {
            return Err(ErrorKind::IndividualExists.at(0).into());
        }

        let gender = Gender::from_code(&row[1]).ok_or_else(|| ErrorKind::InvalidGender.at(1))?;
        if id.is_father() && gender != Gender::Male {
            return Err(ErrorKind::FatherNotMale.at(1).into());
        }
        if id.is_mother() && gender != Gender::Female {
            return Err(ErrorKind::MotherNotFemale.at(1).into());
        }

        if let Some(&first_row) = self.seen.get(&id) {
            return Err(ErrorKind::DuplicateInBatch { first_row }.at(0).into());
        }

        self.seen.insert(id.clone(), row_number);

        Ok(RowOutcome::Insert(Individual {
            project_id: self.project_id,
            clinic_id: id.clinic,
            family_id: id.family,
            member_id: id.member,
            gender,
        }))
    }
}

/// Validate a whole individuals upload for `project_id`
pub fn process_individuals(
    rows: &[Row],
    project_id: ProjectId,
    lookup: &dyn LookupService,
) -> Result<BatchResult, LookupError> {
    let mut validator = IndividualRowValidator::new(project_id, lookup);
    let mut collector = BatchCollector::new(FileType::Individuals);

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;
        let outcome = validator.validate(row, row_number);
        collector.push(row_number, row, outcome)?;
    }

    let counts = collector.counts();
    info!(
        "Individuals batch validated for project {}: {} rows, {} accepted, {} rejected",
        project_id, counts.total, counts.accepted, counts.rejected
    );

    Ok(match collector.finish() {
        Ok(individuals) => BatchResult::Success(Records::Individuals(individuals)),
        Err(rows) => BatchResult::Failure(ErrorReport {
            headers: FileType::Individuals.report_headers(),
            rows,
        }),
    })
}
