// ==============================================================================
// dispatcher.rs - Upload Dispatch by File Type
// ==============================================================================
// Description: Routes decoded upload rows to the batch processor for their type
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use thiserror::Error;
use tracing::debug;

use crate::lookup::{LookupError, LookupService};
use crate::models::{FileType, ProjectId};
use crate::parsers::{
    process_genotypes, process_individuals, process_markers, process_phenotypes, Row,
};
use crate::report::BatchResult;

/// Failures that stop an upload before or during validation
///
/// Validation problems with the rows themselves are never reported here;
/// they come back inside `BatchResult::Failure`.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported file type: '{0}'")]
    UnsupportedType(String),

    #[error("{0} uploads must belong to a project")]
    ProjectRequired(FileType),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Validate `rows` as a file of type `file_type`
///
/// `project_id` is ignored for markers, which are shared by all projects,
/// and required for every other type.
pub fn process(
    file_type: FileType,
    rows: &[Row],
    project_id: Option<ProjectId>,
    lookup: &dyn LookupService,
) -> Result<BatchResult, IngestError> {
    debug!("Dispatching {} upload with {} rows", file_type, rows.len());

    let project = || project_id.ok_or(IngestError::ProjectRequired(file_type));

    let result = match file_type {
        FileType::Markers => process_markers(rows, lookup)?,
        FileType::Individuals => process_individuals(rows, project()?, lookup)?,
        FileType::Phenotypes => process_phenotypes(rows, project()?, lookup)?,
        FileType::Genotypes => process_genotypes(rows, project()?, lookup)?,
    };

    Ok(result)
}

/// Validate rows for a file type given by name (e.g. "MARKERS")
pub fn process_tagged(
    type_tag: &str,
    rows: &[Row],
    project_id: Option<ProjectId>,
    lookup: &dyn LookupService,
) -> Result<BatchResult, IngestError> {
    let file_type: FileType = type_tag.parse().map_err(IngestError::UnsupportedType)?;
    process(file_type, rows, project_id, lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::IndividualId;
    use crate::lookup::{InMemoryLookup, UnavailableLookup};
    use crate::models::Records;
    use crate::parsers::row;

    #[test]
    fn test_dispatch_each_type() {
        let lookup = InMemoryLookup::new()
            .with_marker("M1", &['A', 'G'])
            .with_individual(1, IndividualId::new("CLN", "FAM", 1), 10);

        let result = process_tagged("MARKERS", &[row(&["M2", "1", "5", "1", "C"])], None, &lookup).unwrap();
        assert!(matches!(result, BatchResult::Success(Records::Markers { .. })));

        let result = process_tagged("INDIVIDUALS", &[row(&["CLN_FAM_3", "0"])], Some(1), &lookup).unwrap();
        assert!(matches!(result, BatchResult::Success(Records::Individuals(_))));

        let rows = vec![row(&["ID", "Height"]), row(&["CLN_FAM_1", "180"])];
        let result = process_tagged("PHENOTYPES", &rows, Some(1), &lookup).unwrap();
        assert!(matches!(result, BatchResult::Success(Records::Phenotypes(_))));

        let result = process_tagged("GENOTYPES", &[row(&["CLN_FAM_1", "M1", "A", "A"])], Some(1), &lookup).unwrap();
        assert!(matches!(result, BatchResult::Success(Records::Genotypes(_))));
    }

    #[test]
    fn test_unsupported_type() {
        let result = process_tagged("GROUP", &[], Some(1), &InMemoryLookup::new());
        match result {
            Err(IngestError::UnsupportedType(tag)) => assert_eq!(tag, "GROUP"),
            other => panic!("Expected unsupported type, got {:?}", other),
        }
    }

    #[test]
    fn test_project_required() {
        let result = process(FileType::Genotypes, &[], None, &InMemoryLookup::new());
        assert!(matches!(result, Err(IngestError::ProjectRequired(FileType::Genotypes))));

        // Markers are not project scoped
        assert!(process(FileType::Markers, &[], None, &InMemoryLookup::new()).is_ok());
    }

    #[test]
    fn test_lookup_failure_is_not_a_validation_result() {
        let result = process(FileType::Markers, &[row(&["M1", "1", "1", "1", "A"])], None, &UnavailableLookup);
        assert!(matches!(result, Err(IngestError::Lookup(_))));
    }
}
