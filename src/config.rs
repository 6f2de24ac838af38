// ==============================================================================
// config.rs - Command Line Configuration
// ==============================================================================
// Description: CLI arguments and database location resolution
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::models::{FileType, ProjectId};
use crate::processor::UploadRequest;
use crate::reader::MAX_FILE_SIZE;

/// Environment variable naming a file that holds the database path
pub const DATABASE_FILE_ENV: &str = "GENDB_DATABASE_FILE";

#[derive(Parser, Debug)]
#[command(author, version, about = "Validate and load genetics data uploads", long_about = None)]
pub struct Args {
    /// SQLite database file (or use GENDB_DATABASE_FILE env var)
    #[arg(long, env = "GENDB_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// Largest accepted upload in bytes, before and after decompression
    #[arg(long, default_value_t = MAX_FILE_SIZE, global = true)]
    pub max_file_size: u64,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    Init,

    /// Create a project and print its ID
    AddProject {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Recorded in the audit log
        #[arg(long, env = "GENDB_USER")]
        user: Option<String>,
    },

    /// Validate an upload and store it if every row is valid
    Upload(UploadArgs),
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// markers, individuals, phenotypes or genotypes
    #[arg(short = 't', long = "type")]
    pub file_type: FileType,

    /// Target project (required for everything except markers)
    #[arg(short, long)]
    pub project: Option<ProjectId>,

    /// Recorded in the audit log
    #[arg(long, env = "GENDB_USER")]
    pub user: Option<String>,

    /// Validate only; do not write to the database
    #[arg(long)]
    pub dry_run: bool,

    /// How to print a rejected upload's report
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,

    /// CSV file to upload (optionally gzip-compressed)
    pub file: PathBuf,
}

impl UploadArgs {
    pub fn to_request(&self) -> UploadRequest {
        UploadRequest {
            path: self.file.clone(),
            file_type: self.file_type,
            project_id: self.project,
            user: self.user.clone(),
            dry_run: self.dry_run,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl Args {
    /// Database path from `--database`/GENDB_DATABASE, else from the file
    /// named by GENDB_DATABASE_FILE
    pub fn database_path(&self) -> Result<PathBuf> {
        resolve_database_path(self.database.clone(), std::env::var(DATABASE_FILE_ENV).ok())
    }
}

fn resolve_database_path(explicit: Option<PathBuf>, path_file: Option<String>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let Some(file_path) = path_file else {
        anyhow::bail!("GENDB_DATABASE or {} must be provided", DATABASE_FILE_ENV);
    };

    let contents = std::fs::read_to_string(&file_path)
        .with_context(|| format!("Failed to read {}: {}", DATABASE_FILE_ENV, file_path))?;
    let path = contents.trim();
    if path.is_empty() {
        anyhow::bail!("{} ({}) is empty", DATABASE_FILE_ENV, file_path);
    }

    Ok(PathBuf::from(path))
}
