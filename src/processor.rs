// ==============================================================================
// processor.rs - Upload Processing Pipeline
// ==============================================================================
// Description: Reads an upload, validates it against the database and either
//              stores every record or returns the full error report
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::audit::{AuditEvent, AuditEventType};
use crate::dispatcher;
use crate::models::{FileType, ProjectId};
use crate::reader::{DecodedUpload, UploadReader};
use crate::report::{BatchResult, ErrorReport};
use crate::store::SqliteStore;

/// One file to ingest
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub file_type: FileType,
    pub project_id: Option<ProjectId>,
    pub user: Option<String>,
    /// Validate only; never write to the database
    pub dry_run: bool,
}

/// What happened to an upload
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// Every row was valid and all records were stored
    Accepted {
        file_name: String,
        file_type: FileType,
        records: usize,
    },
    /// Dry run: every row was valid, nothing was stored
    Validated {
        file_name: String,
        file_type: FileType,
        records: usize,
    },
    /// At least one row was invalid; nothing was stored
    Rejected {
        file_name: String,
        file_type: FileType,
        report: ErrorReport,
    },
}

impl UploadOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, UploadOutcome::Rejected { .. })
    }
}

pub struct UploadProcessor {
    store: SqliteStore,
    reader: UploadReader,
}

impl UploadProcessor {
    pub fn new(store: SqliteStore, reader: UploadReader) -> Self {
        Self { store, reader }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SqliteStore {
        &mut self.store
    }

    /// Main processing pipeline
    pub fn ingest(&mut self, request: &UploadRequest) -> Result<UploadOutcome> {
        info!(
            "Processing {} upload {:?} (project: {:?}, dry run: {})",
            request.file_type, request.path, request.project_id, request.dry_run
        );

        // 1. Project must exist before anything is read
        if request.file_type.requires_project() {
            if let Some(project_id) = request.project_id {
                self.store
                    .require_project(project_id)
                    .context("Cannot upload to project")?;
            }
        }

        // 2. Decode the file
        let upload = match self.reader.read(&request.path) {
            Ok(upload) => upload,
            Err(e) => {
                let name = request.path.to_string_lossy().to_string();
                self.log_failure(request, &name, &e.to_string());
                return Err(e).with_context(|| format!("Failed to read upload {:?}", request.path));
            }
        };

        // 3. Validate every row
        let result = match dispatcher::process(
            request.file_type,
            &upload.rows,
            request.project_id,
            &self.store,
        ) {
            Ok(result) => result,
            Err(e) => {
                self.log_failure(request, &upload.file_name, &e.to_string());
                return Err(e).context("Upload validation could not complete");
            }
        };

        // 4. Store everything, or report everything
        match result {
            BatchResult::Success(records) if request.dry_run => {
                info!("Dry run: {} would insert {} records", upload.file_name, records.len());
                Ok(UploadOutcome::Validated {
                    file_name: upload.file_name,
                    file_type: request.file_type,
                    records: records.len(),
                })
            }
            BatchResult::Success(records) => {
                let event = self.event(
                    AuditEventType::UploadAccepted,
                    request,
                    &upload,
                    serde_json::json!({ "records": records.len() }),
                );
                let inserted = self
                    .store
                    .insert_records(&records, &event)
                    .with_context(|| format!("Failed to store records from {}", upload.file_name))?;

                info!("Stored {} records from {}", inserted, upload.file_name);
                Ok(UploadOutcome::Accepted {
                    file_name: upload.file_name,
                    file_type: request.file_type,
                    records: inserted,
                })
            }
            BatchResult::Failure(report) => {
                warn!(
                    "Rejected {}: {} invalid rows",
                    upload.file_name,
                    report.rows.len()
                );

                if !request.dry_run {
                    let event = self.event(
                        AuditEventType::UploadRejected,
                        request,
                        &upload,
                        serde_json::json!({ "rejected_rows": report.rows.len() }),
                    );
                    self.store
                        .log_event(&event)
                        .context("Failed to record rejected upload")?;
                }

                Ok(UploadOutcome::Rejected {
                    file_name: upload.file_name,
                    file_type: request.file_type,
                    report,
                })
            }
        }
    }

    fn event(
        &self,
        event_type: AuditEventType,
        request: &UploadRequest,
        upload: &DecodedUpload,
        mut details: serde_json::Value,
    ) -> AuditEvent {
        details["file_type"] = serde_json::json!(request.file_type);
        details["sha256"] = serde_json::json!(upload.sha256);
        details["size"] = serde_json::json!(upload.size);
        details["compressed"] = serde_json::json!(upload.compressed);
        details["rows"] = serde_json::json!(upload.rows.len());

        AuditEvent::new(
            event_type,
            request.project_id,
            request.user.clone(),
            Some(upload.file_name.clone()),
            details,
        )
    }

    /// Best-effort record of an upload that could not be processed
    fn log_failure(&self, request: &UploadRequest, resource: &str, error: &str) {
        if request.dry_run {
            return;
        }

        let event = AuditEvent::new(
            AuditEventType::UploadFailed,
            request.project_id,
            request.user.clone(),
            Some(resource.to_string()),
            serde_json::json!({ "file_type": request.file_type, "error": error }),
        );
        if let Err(e) = self.store.log_event(&event) {
            warn!("Failed to record upload failure: {}", e);
        }
    }
}
