// ==============================================================================
// main.rs - Genetics Database Ingest Entry Point
// ==============================================================================
// Description: Command line entry point for validating and loading uploads
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gendb_ingest::config::{Args, Command, LogFormat, ReportFormat};
use gendb_ingest::processor::{UploadOutcome, UploadProcessor};
use gendb_ingest::reader::UploadReader;
use gendb_ingest::store::SqliteStore;

/// Exit status for an upload that was rejected row by row
const EXIT_REJECTED: u8 = 2;

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    init_tracing(args.log_format);
    info!("Genetics database ingest starting...");

    let database = args.database_path()?;
    let mut store = SqliteStore::open(&database)
        .with_context(|| format!("Failed to open database {:?}", database))?;

    match args.command {
        Command::Init => {
            info!("Database ready: {:?}", database);
            println!("Initialised {}", database.display());
        }
        Command::AddProject {
            title,
            description,
            user,
        } => {
            let project_id = store
                .create_project(&title, &description, user.as_deref())
                .context("Failed to create project")?;
            println!("{}", project_id);
        }
        Command::Upload(upload) => {
            let reader = UploadReader::with_max_file_size(args.max_file_size);
            let mut processor = UploadProcessor::new(store, reader);

            let outcome = processor.ingest(&upload.to_request())?;
            print_outcome(&outcome, upload.report)?;

            if outcome.is_rejected() {
                warn!("Upload rejected, nothing was stored");
                return Ok(ExitCode::from(EXIT_REJECTED));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gendb_ingest=info".into());

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn print_outcome(outcome: &UploadOutcome, format: ReportFormat) -> Result<()> {
    if format == ReportFormat::Json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match outcome {
        UploadOutcome::Accepted {
            file_name,
            file_type,
            records,
        } => println!("Stored {} {} records from {}", records, file_type, file_name),
        UploadOutcome::Validated {
            file_name,
            file_type,
            records,
        } => println!(
            "{} is a valid {} file ({} records); dry run, nothing stored",
            file_name, file_type, records
        ),
        UploadOutcome::Rejected {
            file_name,
            file_type,
            report,
        } => {
            println!(
                "Rejected {} file {}: {} invalid rows",
                file_type,
                file_name,
                report.rows.len()
            );
            print!("{}", report.to_text());
        }
    }

    Ok(())
}
