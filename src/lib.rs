// ==============================================================================
// lib.rs - Genetics Database Ingest Library
// ==============================================================================
// Description: Validation and loading of marker, individual, phenotype and
//              genotype uploads
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

pub mod audit;
pub mod config;
pub mod dispatcher;
pub mod identifier;
pub mod lookup;
pub mod models;
pub mod parsers;
pub mod processor;
pub mod reader;
pub mod report;
pub mod store;

pub use dispatcher::{process, process_tagged, IngestError};
pub use lookup::{InMemoryLookup, LookupError, LookupService};
pub use models::{FileType, Records};
pub use processor::{UploadOutcome, UploadProcessor, UploadRequest};
pub use report::{BatchResult, ErrorReport, RowErrorReport};
pub use store::SqliteStore;
