// ==============================================================================
// audit.rs - Audit Logging for Upload Operations
// ==============================================================================
// Description: Audit trail of uploads and project changes, stored alongside
//              the data they describe
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ProjectId;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Upload events
    UploadAccepted,
    UploadRejected,
    UploadFailed,

    // Administrative events
    ProjectCreated,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::UploadAccepted => "upload_accepted",
            AuditEventType::UploadRejected => "upload_rejected",
            AuditEventType::UploadFailed => "upload_failed",
            AuditEventType::ProjectCreated => "project_created",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
}

impl LogSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSeverity::Info => "info",
            LogSeverity::Warning => "warning",
            LogSeverity::Error => "error",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub project_id: Option<ProjectId>,
    pub user: Option<String>,
    /// File name or other resource the event is about
    pub resource: Option<String>,
    pub message: String,
    pub details: serde_json::Value,
    pub severity: LogSeverity,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        project_id: Option<ProjectId>,
        user: Option<String>,
        resource: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        let severity = match event_type {
            AuditEventType::UploadRejected => LogSeverity::Warning,
            AuditEventType::UploadFailed => LogSeverity::Error,
            _ => LogSeverity::Info,
        };

        let message = match (&event_type, &resource) {
            (AuditEventType::UploadAccepted, Some(name)) => format!("Uploaded file: '{}'", name),
            (AuditEventType::UploadRejected, Some(name)) => format!("Rejected file: '{}'", name),
            (AuditEventType::UploadFailed, Some(name)) => format!("Failed to process file: '{}'", name),
            (AuditEventType::ProjectCreated, Some(title)) => format!("Created project: '{}'", title),
            (event_type, None) => event_type.as_str().to_string(),
        };

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            project_id,
            user,
            resource,
            message,
            details,
            severity,
        }
    }

    /// Write the event to the upload log table
    ///
    /// Accepts a plain connection or an open transaction, so accepted uploads
    /// are logged in the same commit as their records.
    pub fn log(&self, conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT INTO upload_log (
                id, timestamp, event_type, project_id, user_email,
                resource, message, details, severity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                self.id.to_string(),
                self.timestamp.to_rfc3339(),
                self.event_type.as_str(),
                self.project_id,
                self.user,
                self.resource,
                self.message,
                self.details.to_string(),
                self.severity.as_str(),
            ],
        )?;

        Ok(())
    }
}
