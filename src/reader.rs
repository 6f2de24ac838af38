// ==============================================================================
// reader.rs - Upload File Decoding
// ==============================================================================
// Description: Reads uploaded CSV files (plain or gzip) into rows of cells
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// Security: Size limits on raw and decompressed data, sanitised file names
// ==============================================================================

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::parsers::Row;

/// Default upload limit (50 MB)
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];
const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid file name: '{0}'")]
    InvalidFileName(String),
}

/// Upload decoded into rows, with what the audit trail needs to know about it
#[derive(Debug, Clone)]
pub struct DecodedUpload {
    pub file_name: String,
    pub sha256: String,
    /// Size in bytes as uploaded (before decompression)
    pub size: u64,
    pub compressed: bool,
    pub rows: Vec<Row>,
}

pub struct UploadReader {
    max_file_size: u64,
}

impl UploadReader {
    pub fn new() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Read and decode an upload from disk
    ///
    /// Gzip input is recognised by its magic number and decompressed; the
    /// decompressed text is held to the same size limit as the upload.
    pub fn read(&self, path: &Path) -> Result<DecodedUpload, ReadError> {
        let raw_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_name = sanitize_filename(&raw_name)?;

        let size = std::fs::metadata(path)?.len();
        self.check_size(size)?;

        let mut bytes = Vec::with_capacity(size as usize);
        File::open(path)?.read_to_end(&mut bytes)?;
        debug!("Read {} bytes from {}", bytes.len(), file_name);

        let sha256 = format!("{:x}", Sha256::digest(&bytes));

        let compressed = bytes.starts_with(&GZIP_MAGIC);
        let text = if compressed {
            debug!("Decompressing gzip upload {}", file_name);
            let mut text = Vec::new();
            flate2::read::GzDecoder::new(bytes.as_slice())
                .take(self.max_file_size + 1)
                .read_to_end(&mut text)?;
            self.check_size(text.len() as u64)?;
            text
        } else {
            bytes
        };

        let rows = decode_rows(text.as_slice())?;
        info!("Decoded {} rows from {}", rows.len(), file_name);

        Ok(DecodedUpload {
            file_name,
            sha256,
            size,
            compressed,
            rows,
        })
    }

    fn check_size(&self, size: u64) -> Result<(), ReadError> {
        if size > self.max_file_size {
            return Err(ReadError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }
}

impl Default for UploadReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode comma-separated text into rows of trimmed cells
///
/// No header handling happens here: the first line is returned like any
/// other. Rows may have differing lengths. A blank line between records
/// becomes an empty row, so row `n` of the result is line `n` of the file
/// unless a quoted cell spans lines. Blank lines after the last record are
/// dropped.
pub fn decode_rows<R: Read>(mut input: R) -> Result<Vec<Row>, ReadError> {
    let mut text = Vec::new();
    input.read_to_end(&mut text)?;
    let body = text.strip_prefix(&UTF8_BOM).unwrap_or(&text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    let mut lines = LineCounter::new(body);
    let mut next_line = 1;
    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();

    while reader.read_record(&mut record)? {
        // Reported start is where scanning began, before any blank lines
        let scanned_from = record.position().map_or(0, |p| p.byte() as usize);
        let start = skip_terminators(body, scanned_from);
        let end = trim_terminators(body, start, reader.position().byte() as usize);

        let first_line = lines.line_at(start);
        while next_line < first_line {
            rows.push(Row::new());
            next_line += 1;
        }

        rows.push(record.iter().map(str::to_string).collect());
        next_line = lines.line_at(end) + 1;
    }
    Ok(rows)
}

fn is_terminator(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

fn skip_terminators(text: &[u8], from: usize) -> usize {
    let mut offset = from.min(text.len());
    while offset < text.len() && is_terminator(text[offset]) {
        offset += 1;
    }
    offset
}

fn trim_terminators(text: &[u8], start: usize, end: usize) -> usize {
    let mut end = end.min(text.len());
    while end > start && is_terminator(text[end - 1]) {
        end -= 1;
    }
    end
}

/// 1-based line numbers for increasing byte offsets
struct LineCounter<'a> {
    text: &'a [u8],
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a [u8]) -> Self {
        Self {
            text,
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        let offset = offset.min(self.text.len());
        if offset > self.offset {
            self.line += self.text[self.offset..offset]
                .iter()
                .filter(|b| **b == b'\n')
                .count();
            self.offset = offset;
        }
        self.line
    }
}

fn sanitize_filename(name: &str) -> Result<String, ReadError> {
    // Remove path separators, null bytes, control characters
    let safe = name
        .replace(['/', '\\', '\0'], "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.' || *c == '-')
        .take(255)
        .collect::<String>();

    if safe.is_empty() {
        return Err(ReadError::InvalidFileName(name.to_string()));
    }

    Ok(safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_decode_rows() {
        let rows = decode_rows("M1,1,1000,2,A,G\nM2, 3 ,50,1,C\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["M1", "1", "1000", "2", "A", "G"]);
        assert_eq!(rows[1], vec!["M2", "3", "50", "1", "C"]);
    }

    #[test]
    fn test_blank_lines_keep_row_numbers() {
        let rows = decode_rows("CLN_FAM_3,0\n\nCLN_FAM_4,0\nCLN_FAM_1,0\n\n\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[1].is_empty());
        assert_eq!(rows[3], vec!["CLN_FAM_1", "0"]);
    }

    #[test]
    fn test_blank_lines_with_crlf() {
        let rows = decode_rows("a,b\r\n\r\n\r\nc,d\r\ne,f".as_bytes()).unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows[1].is_empty() && rows[2].is_empty());
        assert_eq!(rows[3], vec!["c", "d"]);
        assert_eq!(rows[4], vec!["e", "f"]);
    }

    #[test]
    fn test_quoted_newline_spans_lines() {
        let rows = decode_rows("\"two\nlines\",1\n\nc,2\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["two\nlines", "1"]);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec!["c", "2"]);
    }

    #[test]
    fn test_decode_quoted_and_bom() {
        let mut input = UTF8_BOM.to_vec();
        input.extend_from_slice(b"ID,\"Eye, left\"\nCLN_FAM_1,\"blue\"\n");

        let rows = decode_rows(input.as_slice()).unwrap();
        assert_eq!(rows[0], vec!["ID", "Eye, left"]);
        assert_eq!(rows[1], vec!["CLN_FAM_1", "blue"]);
    }

    #[test]
    fn test_read_plain_file() {
        let file = create_test_file(b"CLN_FAM_1,1\nCLN_FAM_2,2\n");
        let upload = UploadReader::new().read(file.path()).unwrap();

        assert_eq!(upload.rows.len(), 2);
        assert!(!upload.compressed);
        assert_eq!(upload.size, 24);
        assert_eq!(upload.sha256.len(), 64);
    }

    #[test]
    fn test_read_gzip_file() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"CLN_FAM_1,M1,A,G\nCLN_FAM_1,M2,x,x\n").unwrap();
        let file = create_test_file(&encoder.finish().unwrap());

        let upload = UploadReader::new().read(file.path()).unwrap();
        assert!(upload.compressed);
        assert_eq!(upload.rows[1], vec!["CLN_FAM_1", "M2", "x", "x"]);
    }

    #[test]
    fn test_size_limit() {
        let file = create_test_file(b"CLN_FAM_1,1\nCLN_FAM_2,2\n");
        let result = UploadReader::with_max_file_size(10).read(file.path());
        assert!(matches!(result, Err(ReadError::TooLarge { size: 24, max: 10 })));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("markers.csv").unwrap(), "markers.csv");
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), ".._.._etc_passwd");
        assert!(sanitize_filename("\n\t").is_err());
    }
}
