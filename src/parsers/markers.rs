// ==============================================================================
// markers.rs - Marker File Parser
// ==============================================================================
// Description: Validates marker upload rows into markers and their alleles
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format: CSV without header, one marker per row
// Example:
//   rs12345,1,1000,2,A,G
//   rs67890,7,55000,3,A,C,T
// Columns: id, chromosome, position, number of alleles N, then N allele symbols
// ==============================================================================

use std::collections::{HashMap, HashSet};
use tracing::info;

use super::{BatchCollector, Row, RowOutcome};
use crate::lookup::{LookupError, LookupService};
use crate::models::{FileType, Marker, MarkerAllele, Records, MISSING_DATA_SYMBOL};
use crate::report::{BatchResult, ErrorKind, ErrorReport, RowError};

/// Columns preceding the allele symbols
const FIXED_COLUMNS: usize = 4;

/// Validates marker rows, remembering markers already accepted in this batch
pub struct MarkerRowValidator<'a> {
    lookup: &'a dyn LookupService,
    seen: HashMap<String, usize>,
}

impl<'a> MarkerRowValidator<'a> {
    pub fn new(lookup: &'a dyn LookupService) -> Self {
        Self {
            lookup,
            seen: HashMap::new(),
        }
    }

    /// Validate one row into a marker and its N alleles
    ///
    /// Checks run in order and the first failure wins:
    /// column count, allele count, already stored, already in this file,
    /// chromosome, position, then each allele symbol.
    pub fn validate(
        &mut self,
        row: &[String],
        row_number: usize,
    ) -> Result<RowOutcome<(Marker, Vec<MarkerAllele>)>, RowError> {
        if row.len() < FIXED_COLUMNS {
            return Err(ErrorKind::TooFewColumns {
                minimum: FIXED_COLUMNS,
                found: row.len(),
            }
            .for_row()
            .into());
        }

        let num_alleles: i64 = row[3]
            .parse()
            .map_err(|_| ErrorKind::AlleleCountNotANumber(row[3].clone()).at(3))?;

        if usize::try_from(num_alleles).ok() != Some(row.len() - FIXED_COLUMNS) {
            return Err(ErrorKind::AlleleCountMismatch(num_alleles).at(3).into());
        }

        let marker_id = &row[0];
        if self.lookup.marker_exists(marker_id)? {
            return Err(ErrorKind::MarkerExists.at(0).into());
        }
        if let Some(&first_row) = self.seen.get(marker_id) {
            return Err(ErrorKind::DuplicateInBatch { first_row }.at(0).into());
        }

        let chromosome = parse_non_negative(&row[1])
            .ok_or_else(|| ErrorKind::Chromosome(row[1].clone()).at(1))?;
        let position = parse_non_negative(&row[2])
            .ok_or_else(|| ErrorKind::Position(row[2].clone()).at(2))?;

        let mut symbols = HashSet::new();
        let mut alleles = Vec::with_capacity(row.len() - FIXED_COLUMNS);
        for (offset, symbol) in row[FIXED_COLUMNS..].iter().enumerate() {
            let allele = parse_allele(symbol).map_err(|kind| kind.at(FIXED_COLUMNS + offset))?;

            if !symbols.insert(allele) {
                return Err(ErrorKind::RepeatedAllele(allele)
                    .at(FIXED_COLUMNS + offset)
                    .into());
            }

            alleles.push(MarkerAllele {
                marker: marker_id.clone(),
                allele,
            });
        }

        self.seen.insert(marker_id.clone(), row_number);

        let marker = Marker {
            id: marker_id.clone(),
            chromosome,
            position,
        };
        Ok(RowOutcome::Insert((marker, alleles)))
    }
}

fn parse_non_negative(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().filter(|v| *v >= 0)
}

/// Check a marker allele symbol: one alphanumeric character, not `x`
fn parse_allele(symbol: &str) -> Result<char, ErrorKind> {
    let mut chars = symbol.chars();
    let allele = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Err(ErrorKind::AlleleLength),
    };

    if !allele.is_alphanumeric() {
        return Err(ErrorKind::AlleleNotAlphanumeric);
    }
    if symbol == MISSING_DATA_SYMBOL {
        return Err(ErrorKind::AlleleIsMissingSymbol);
    }

    Ok(allele)
}

/// Validate a whole marker upload
///
/// # Returns
/// * `Ok(BatchResult::Success)` - every row valid; one marker plus N alleles per row
/// * `Ok(BatchResult::Failure)` - one report per invalid row, nothing to insert
/// * `Err(LookupError)` - stored data could not be queried
pub fn process_markers(
    rows: &[Row],
    lookup: &dyn LookupService,
) -> Result<BatchResult, LookupError> {
    let mut validator = MarkerRowValidator::new(lookup);
    let mut collector = BatchCollector::new(FileType::Markers);

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;
        let outcome = validator.validate(row, row_number);
        collector.push(row_number, row, outcome)?;
    }

    let counts = collector.counts();
    info!(
        "Marker batch validated: {} rows, {} accepted, {} rejected",
        counts.total, counts.accepted, counts.rejected
    );

    Ok(match collector.finish() {
        Ok(parsed) => {
            let mut markers = Vec::with_capacity(parsed.len());
            let mut alleles = Vec::new();
            for (marker, marker_alleles) in parsed {
                markers.push(marker);
                alleles.extend(marker_alleles);
            }
            BatchResult::Success(Records::Markers { markers, alleles })
        }
        Err(rows) => BatchResult::Failure(ErrorReport {
            headers: FileType::Markers.report_headers(),
            rows,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{InMemoryLookup, UnavailableLookup};
    use crate::parsers::row;
    use crate::report::ValidationError;

    type MarkerOutcome = Result<RowOutcome<(Marker, Vec<MarkerAllele>)>, RowError>;

    fn validate_one(cells: &[&str], lookup: &InMemoryLookup) -> MarkerOutcome {
        MarkerRowValidator::new(lookup).validate(&row(cells), 1)
    }

    fn invalid(result: MarkerOutcome) -> ValidationError {
        match result {
            Err(RowError::Invalid(e)) => e,
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_marker_row() {
        let lookup = InMemoryLookup::new();
        let result = process_markers(&[row(&["M1", "1", "1000", "2", "A", "G"])], &lookup).unwrap();

        match result {
            BatchResult::Success(Records::Markers { markers, alleles }) => {
                assert_eq!(
                    markers,
                    vec![Marker { id: "M1".to_string(), chromosome: 1, position: 1000 }]
                );
                assert_eq!(
                    alleles,
                    vec![
                        MarkerAllele { marker: "M1".to_string(), allele: 'A' },
                        MarkerAllele { marker: "M1".to_string(), allele: 'G' },
                    ]
                );
            }
            other => panic!("Expected marker records, got {:?}", other),
        }
    }

    #[test]
    fn test_allele_count_yields_matching_records() {
        let lookup = InMemoryLookup::new();
        let symbols = ["A", "C", "G", "T", "1", "2"];

        for n in 0..=symbols.len() {
            let mut cells = vec!["M1".to_string(), "3".to_string(), "10".to_string(), n.to_string()];
            cells.extend(symbols[..n].iter().map(|s| s.to_string()));

            match process_markers(&[cells], &lookup).unwrap() {
                BatchResult::Success(Records::Markers { markers, alleles }) => {
                    assert_eq!(markers.len(), 1);
                    assert_eq!(alleles.len(), n);
                }
                other => panic!("Expected success for {} alleles, got {:?}", n, other),
            }
        }
    }

    #[test]
    fn test_too_few_columns_is_row_level() {
        let error = invalid(validate_one(&["M1", "1", "1000"], &InMemoryLookup::new()));
        assert_eq!(error.column, None);
        assert_eq!(error.to_string(), "Expected a minimum of 4 columns, got 3");
    }

    #[test]
    fn test_allele_count_errors() {
        let lookup = InMemoryLookup::new();

        let error = invalid(validate_one(&["M1", "1", "1000", "two", "A", "G"], &lookup));
        assert_eq!(error.column, Some(3));
        assert_eq!(error.kind, ErrorKind::AlleleCountNotANumber("two".to_string()));

        let error = invalid(validate_one(&["M1", "1", "1000", "3", "A", "G"], &lookup));
        assert_eq!(error.column, Some(3));
        assert_eq!(error.kind, ErrorKind::AlleleCountMismatch(3));

        let error = invalid(validate_one(&["M1", "1", "1000", "-1"], &lookup));
        assert_eq!(error.kind, ErrorKind::AlleleCountMismatch(-1));
    }

    #[test]
    fn test_huge_allele_count_is_a_mismatch() {
        let count = i64::MAX.to_string();
        let rows = vec![row(&["M1", "1", "1000", count.as_str(), "A"])];

        match process_markers(&rows, &InMemoryLookup::new()).unwrap() {
            BatchResult::Failure(report) => {
                assert_eq!(report.rows.len(), 1);
                assert_eq!(report.rows[0].error_column(), Some(3));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_marker_already_stored() {
        let lookup = InMemoryLookup::new().with_marker("M1", &['A']);
        let error = invalid(validate_one(&["M1", "1", "1000", "1", "A"], &lookup));

        assert_eq!(error.column, Some(0));
        assert_eq!(error.kind, ErrorKind::MarkerExists);
    }

    #[test]
    fn test_bad_chromosome_and_position() {
        let lookup = InMemoryLookup::new();

        let error = invalid(validate_one(&["M1", "chr1", "1000", "1", "A"], &lookup));
        assert_eq!(error.column, Some(1));

        let error = invalid(validate_one(&["M1", "1", "-5", "1", "A"], &lookup));
        assert_eq!(error.column, Some(2));
        assert_eq!(error.kind, ErrorKind::Position("-5".to_string()));
    }

    #[test]
    fn test_bad_allele_symbols() {
        let lookup = InMemoryLookup::new();

        let error = invalid(validate_one(&["M1", "1", "1000", "2", "A", "GT"], &lookup));
        assert_eq!(error.column, Some(5));
        assert_eq!(error.kind, ErrorKind::AlleleLength);

        let error = invalid(validate_one(&["M1", "1", "1000", "2", "-", "G"], &lookup));
        assert_eq!(error.column, Some(4));
        assert_eq!(error.kind, ErrorKind::AlleleNotAlphanumeric);

        let error = invalid(validate_one(&["M1", "1", "1000", "2", "A", "x"], &lookup));
        assert_eq!(error.column, Some(5));
        assert_eq!(error.kind, ErrorKind::AlleleIsMissingSymbol);

        let error = invalid(validate_one(&["M1", "1", "1000", "2", "A", ""], &lookup));
        assert_eq!(error.kind, ErrorKind::AlleleLength);

        let error = invalid(validate_one(&["M1", "1", "1000", "3", "A", "G", "A"], &lookup));
        assert_eq!(error.column, Some(6));
        assert_eq!(error.kind, ErrorKind::RepeatedAllele('A'));
    }

    #[test]
    fn test_duplicate_within_file() {
        let lookup = InMemoryLookup::new();
        let rows = vec![
            row(&["M1", "1", "1000", "1", "A"]),
            row(&["M2", "1", "2000", "1", "A"]),
            row(&["M1", "2", "3000", "1", "C"]),
        ];

        match process_markers(&rows, &lookup).unwrap() {
            BatchResult::Failure(report) => {
                assert_eq!(report.rows.len(), 1);
                assert_eq!(report.rows[0].row, 3);
                assert_eq!(report.rows[0].error_column(), Some(0));
                assert_eq!(report.rows[0].error_message(), Some("Duplicates row 1 of this file"));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_every_bad_row_is_reported() {
        let lookup = InMemoryLookup::new().with_marker("OLD", &['A']);
        let rows = vec![
            row(&["M1", "1", "1000", "2", "A", "G"]),
            row(&["M2"]),
            row(&["OLD", "1", "5", "1", "A"]),
            row(&["M3", "2", "7", "1", "C"]),
            row(&["M4", "2", "7", "1", "x"]),
        ];

        match process_markers(&rows, &lookup).unwrap() {
            BatchResult::Failure(report) => {
                let numbers: Vec<usize> = report.rows.iter().map(|r| r.row).collect();
                assert_eq!(numbers, vec![2, 3, 5]);
                assert_eq!(report.headers.len(), 5);

                // Column count: message only
                assert!(report.rows[0].cells.is_empty());

                // Already stored: first cell carries the error, the rest plain
                let stored = &report.rows[1];
                assert_eq!(stored.cells.len(), 5);
                assert_eq!(stored.cells[0].error.as_deref(), Some("Marker already in database"));
                assert!(stored.cells[1..].iter().all(|c| c.error.is_none()));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_failure_aborts_batch() {
        let rows = vec![row(&["M1", "1", "1000", "1", "A"])];
        assert!(process_markers(&rows, &UnavailableLookup).is_err());
    }
}
