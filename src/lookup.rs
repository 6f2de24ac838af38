// ==============================================================================
// lookup.rs - Read-Only Lookups Against Stored Data
// ==============================================================================
// Description: Existence checks used by row validation (markers, alleles,
//              individuals, phenotypes, genotypes)
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::identifier::IndividualId;
use crate::models::{IndividualDbId, ProjectId};

/// Infrastructure failure while querying stored data
///
/// Never a validation outcome: a batch that hits one of these is aborted.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Lookup backend unavailable: {0}")]
    Unavailable(String),

    #[error("Lookup query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

/// Read-only queries consulted while validating upload rows
pub trait LookupService {
    fn marker_exists(&self, marker_id: &str) -> Result<bool, LookupError>;

    fn allele_exists(&self, marker_id: &str, allele: char) -> Result<bool, LookupError>;

    /// Database ID of the individual, if one is stored in the project
    fn find_individual(
        &self,
        project_id: ProjectId,
        id: &IndividualId,
    ) -> Result<Option<IndividualDbId>, LookupError>;

    fn phenotype_exists(
        &self,
        individual_id: IndividualDbId,
        name: &str,
    ) -> Result<bool, LookupError>;

    fn genotype_exists(
        &self,
        individual_id: IndividualDbId,
        marker_id: &str,
    ) -> Result<bool, LookupError>;
}

/// Lookup backed by plain collections
///
/// Used for dry runs and tests where no database is available.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLookup {
    markers: HashMap<String, HashSet<char>>,
    individuals: HashMap<(ProjectId, IndividualId), IndividualDbId>,
    phenotypes: HashSet<(IndividualDbId, String)>,
    genotypes: HashSet<(IndividualDbId, String)>,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker(mut self, marker_id: &str, alleles: &[char]) -> Self {
        self.markers
            .entry(marker_id.to_string())
            .or_default()
            .extend(alleles.iter().copied());
        self
    }

    pub fn with_individual(
        mut self,
        project_id: ProjectId,
        id: IndividualId,
        db_id: IndividualDbId,
    ) -> Self {
        self.individuals.insert((project_id, id), db_id);
        self
    }

    pub fn with_phenotype(mut self, individual_id: IndividualDbId, name: &str) -> Self {
        self.phenotypes.insert((individual_id, name.to_string()));
        self
    }

    pub fn with_genotype(mut self, individual_id: IndividualDbId, marker_id: &str) -> Self {
        self.genotypes.insert((individual_id, marker_id.to_string()));
        self
    }
}

impl LookupService for InMemoryLookup {
    fn marker_exists(&self, marker_id: &str) -> Result<bool, LookupError> {
        Ok(self.markers.contains_key(marker_id))
    }

    fn allele_exists(&self, marker_id: &str, allele: char) -> Result<bool, LookupError> {
        Ok(self
            .markers
            .get(marker_id)
            .is_some_and(|alleles| alleles.contains(&allele)))
    }

    fn find_individual(
        &self,
        project_id: ProjectId,
        id: &IndividualId,
    ) -> Result<Option<IndividualDbId>, LookupError> {
        Ok(self.individuals.get(&(project_id, id.clone())).copied())
    }

    fn phenotype_exists(
        &self,
        individual_id: IndividualDbId,
        name: &str,
    ) -> Result<bool, LookupError> {
        Ok(self.phenotypes.contains(&(individual_id, name.to_string())))
    }

    fn genotype_exists(
        &self,
        individual_id: IndividualDbId,
        marker_id: &str,
    ) -> Result<bool, LookupError> {
        Ok(self.genotypes.contains(&(individual_id, marker_id.to_string())))
    }
}

/// Lookup whose every query fails, for exercising infrastructure errors
#[cfg(test)]
pub(crate) struct UnavailableLookup;

#[cfg(test)]
impl LookupService for UnavailableLookup {
    fn marker_exists(&self, _: &str) -> Result<bool, LookupError> {
        Err(LookupError::Unavailable("connection refused".to_string()))
    }

    fn allele_exists(&self, _: &str, _: char) -> Result<bool, LookupError> {
        Err(LookupError::Unavailable("connection refused".to_string()))
    }

    fn find_individual(
        &self,
        _: ProjectId,
        _: &IndividualId,
    ) -> Result<Option<IndividualDbId>, LookupError> {
        Err(LookupError::Unavailable("connection refused".to_string()))
    }

    fn phenotype_exists(&self, _: IndividualDbId, _: &str) -> Result<bool, LookupError> {
        Err(LookupError::Unavailable("connection refused".to_string()))
    }

    fn genotype_exists(&self, _: IndividualDbId, _: &str) -> Result<bool, LookupError> {
        Err(LookupError::Unavailable("connection refused".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_markers_and_alleles() {
        let lookup = InMemoryLookup::new().with_marker("M1", &['A', 'G']);

        assert!(lookup.marker_exists("M1").unwrap());
        assert!(!lookup.marker_exists("M2").unwrap());
        assert!(lookup.allele_exists("M1", 'G').unwrap());
        assert!(!lookup.allele_exists("M1", 'T').unwrap());
        assert!(!lookup.allele_exists("M2", 'A').unwrap());
    }

    #[test]
    fn test_in_memory_individuals_are_project_scoped() {
        let id = IndividualId::new("CLN", "FAM", 1);
        let lookup = InMemoryLookup::new().with_individual(1, id.clone(), 10);

        assert_eq!(lookup.find_individual(1, &id).unwrap(), Some(10));
        assert_eq!(lookup.find_individual(2, &id).unwrap(), None);
    }

    #[test]
    fn test_in_memory_phenotypes_and_genotypes() {
        let lookup = InMemoryLookup::new()
            .with_phenotype(10, "Height")
            .with_genotype(10, "M1");

        assert!(lookup.phenotype_exists(10, "Height").unwrap());
        assert!(!lookup.phenotype_exists(10, "Weight").unwrap());
        assert!(lookup.genotype_exists(10, "M1").unwrap());
        assert!(!lookup.genotype_exists(11, "M1").unwrap());
    }
}
