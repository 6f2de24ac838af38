// ==============================================================================
// models.rs - Genetics Database Records
// ==============================================================================
// Description: Domain records produced by upload validation
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Literal used in any data cell to mark an intentionally absent value
pub const MISSING_DATA_SYMBOL: &str = "x";

/// Project primary key
pub type ProjectId = i64;

/// Database primary key of a stored individual
pub type IndividualDbId = i64;

/// Kind of file being uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Markers,
    Individuals,
    Phenotypes,
    Genotypes,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Markers => "MARKERS",
            FileType::Individuals => "INDIVIDUALS",
            FileType::Phenotypes => "PHENOTYPES",
            FileType::Genotypes => "GENOTYPES",
        }
    }

    /// Whether records of this type belong to a project
    ///
    /// Markers are shared by every project; everything else is scoped.
    pub fn requires_project(&self) -> bool {
        !matches!(self, FileType::Markers)
    }

    /// Column headings shown alongside an error report
    ///
    /// Phenotype files carry their own header row, so there is nothing fixed
    /// to return for them.
    pub fn report_headers(&self) -> Vec<String> {
        let headers: &[&str] = match self {
            FileType::Markers => &[
                "Marker",
                "Chromosome",
                "Position",
                "Number of possible alleles",
                "Possible alleles",
            ],
            FileType::Individuals => &["ID", "Gender"],
            FileType::Genotypes => &["ID", "Marker", "Allele 1", "Allele 2"],
            FileType::Phenotypes => &[],
        };
        headers.iter().map(|h| h.to_string()).collect()
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MARKERS" => Ok(FileType::Markers),
            "INDIVIDUALS" => Ok(FileType::Individuals),
            "PHENOTYPES" => Ok(FileType::Phenotypes),
            "GENOTYPES" => Ok(FileType::Genotypes),
            _ => Err(s.to_string()),
        }
    }
}

/// Genetic marker (e.g. an rsID) at a fixed chromosome position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub chromosome: i64,
    pub position: i64,
}

/// One possible allele of a marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerAllele {
    pub marker: String,
    pub allele: char,
}

/// Recorded gender of an individual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Unknown = 0,
    Male = 1,
    Female = 2,
}

impl Gender {
    /// Parse the single-digit code used in upload files
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Gender::Unknown),
            "1" => Some(Gender::Male),
            "2" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        *self as i64
    }
}

/// Person within a project, addressed by clinic, family and member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub project_id: ProjectId,
    pub clinic_id: String,
    pub family_id: String,
    pub member_id: u32,
    pub gender: Gender,
}

/// Named trait measurement of a stored individual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phenotype {
    pub individual_id: IndividualDbId,
    pub name: String,
    pub value: String,
}

/// Pair of allele calls for one individual at one marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genotype {
    pub individual_id: IndividualDbId,
    pub marker: String,
    pub call_1: char,
    pub call_2: char,
}

/// Validated contents of a whole upload, ready for insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "records", rename_all = "lowercase")]
pub enum Records {
    Markers {
        markers: Vec<Marker>,
        alleles: Vec<MarkerAllele>,
    },
    Individuals(Vec<Individual>),
    Phenotypes(Vec<Phenotype>),
    Genotypes(Vec<Genotype>),
}

impl Records {
    pub fn file_type(&self) -> FileType {
        match self {
            Records::Markers { .. } => FileType::Markers,
            Records::Individuals(_) => FileType::Individuals,
            Records::Phenotypes(_) => FileType::Phenotypes,
            Records::Genotypes(_) => FileType::Genotypes,
        }
    }

    /// Total number of rows that will be inserted
    pub fn len(&self) -> usize {
        match self {
            Records::Markers { markers, alleles } => markers.len() + alleles.len(),
            Records::Individuals(v) => v.len(),
            Records::Phenotypes(v) => v.len(),
            Records::Genotypes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_str() {
        assert_eq!("MARKERS".parse::<FileType>(), Ok(FileType::Markers));
        assert_eq!("genotypes".parse::<FileType>(), Ok(FileType::Genotypes));
        assert_eq!(" Phenotypes ".parse::<FileType>(), Ok(FileType::Phenotypes));
        assert_eq!("GROUP".parse::<FileType>(), Err("GROUP".to_string()));
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_code("0"), Some(Gender::Unknown));
        assert_eq!(Gender::from_code("1"), Some(Gender::Male));
        assert_eq!(Gender::from_code("2"), Some(Gender::Female));
        assert_eq!(Gender::from_code("3"), None);
        assert_eq!(Gender::from_code("M"), None);
        assert_eq!(Gender::Female.code(), 2);
    }

    #[test]
    fn test_records_len_counts_alleles() {
        let records = Records::Markers {
            markers: vec![Marker {
                id: "M1".to_string(),
                chromosome: 1,
                position: 1000,
            }],
            alleles: vec![
                MarkerAllele { marker: "M1".to_string(), allele: 'A' },
                MarkerAllele { marker: "M1".to_string(), allele: 'G' },
            ],
        };

        assert_eq!(records.len(), 3);
        assert_eq!(records.file_type(), FileType::Markers);
        assert!(Records::Genotypes(Vec::new()).is_empty());
    }

    #[test]
    fn test_project_scoping() {
        assert!(!FileType::Markers.requires_project());
        assert!(FileType::Individuals.requires_project());
        assert!(FileType::Phenotypes.report_headers().is_empty());
        assert_eq!(FileType::Genotypes.report_headers().len(), 4);
    }
}
