// ==============================================================================
// store.rs - SQLite Genetics Database
// ==============================================================================
// Description: Relational store for markers, individuals, phenotypes and
//              genotypes; answers validation lookups and inserts accepted
//              uploads atomically
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::audit::{AuditEvent, AuditEventType};
use crate::identifier::IndividualId;
use crate::lookup::{LookupError, LookupService};
use crate::models::{IndividualDbId, ProjectId, Records};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Project {0} does not exist")]
    ProjectNotFound(ProjectId),
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS project (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS marker (
        id TEXT PRIMARY KEY,
        chromosome INTEGER NOT NULL,
        position INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS marker_allele (
        marker TEXT NOT NULL REFERENCES marker(id),
        allele TEXT NOT NULL,
        PRIMARY KEY (marker, allele)
    );

    CREATE TABLE IF NOT EXISTS individual (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES project(id) ON DELETE CASCADE,
        clinic_id TEXT NOT NULL,
        family_id TEXT NOT NULL,
        member_id INTEGER NOT NULL,
        gender INTEGER NOT NULL,
        UNIQUE (project_id, clinic_id, family_id, member_id)
    );

    CREATE TABLE IF NOT EXISTS phenotype (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ind_id INTEGER NOT NULL REFERENCES individual(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        value TEXT NOT NULL,
        UNIQUE (ind_id, name)
    );

    CREATE TABLE IF NOT EXISTS genotype (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ind_id INTEGER NOT NULL REFERENCES individual(id) ON DELETE CASCADE,
        marker TEXT NOT NULL REFERENCES marker(id),
        call_1 TEXT NOT NULL,
        call_2 TEXT NOT NULL,
        UNIQUE (ind_id, marker)
    );

    CREATE TABLE IF NOT EXISTS upload_log (
        id TEXT PRIMARY KEY,
        timestamp TEXT NOT NULL,
        event_type TEXT NOT NULL,
        project_id INTEGER,
        user_email TEXT,
        resource TEXT,
        message TEXT NOT NULL,
        details TEXT NOT NULL,
        severity TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_upload_log_project ON upload_log(project_id);
";

/// Genetics database backed by a single SQLite file
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        info!("Opening genetics database: {:?}", path.as_ref());
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Create a project and return its ID
    pub fn create_project(
        &mut self,
        title: &str,
        description: &str,
        user: Option<&str>,
    ) -> Result<ProjectId, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO project (title, description) VALUES (?1, ?2)",
            params![title, description],
        )?;
        let project_id = tx.last_insert_rowid();

        AuditEvent::new(
            AuditEventType::ProjectCreated,
            Some(project_id),
            user.map(str::to_string),
            Some(title.to_string()),
            serde_json::json!({ "description": description }),
        )
        .log(&tx)?;

        tx.commit()?;
        info!("Created project {}: {}", project_id, title);
        Ok(project_id)
    }

    pub fn project_exists(&self, project_id: ProjectId) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM project WHERE id = ?1",
                params![project_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Fail with `ProjectNotFound` unless the project exists
    pub fn require_project(&self, project_id: ProjectId) -> Result<(), StoreError> {
        if self.project_exists(project_id)? {
            Ok(())
        } else {
            Err(StoreError::ProjectNotFound(project_id))
        }
    }

    /// Insert a validated upload together with its audit entry
    ///
    /// Everything is written in one transaction: on any error nothing from
    /// the upload is stored.
    pub fn insert_records(
        &mut self,
        records: &Records,
        event: &AuditEvent,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;

        match records {
            Records::Markers { markers, alleles } => {
                let mut stmt = tx.prepare(
                    "INSERT INTO marker (id, chromosome, position) VALUES (?1, ?2, ?3)",
                )?;
                for marker in markers {
                    stmt.execute(params![marker.id, marker.chromosome, marker.position])?;
                }

                let mut stmt =
                    tx.prepare("INSERT INTO marker_allele (marker, allele) VALUES (?1, ?2)")?;
                for allele in alleles {
                    stmt.execute(params![allele.marker, allele.allele.to_string()])?;
                }
            }
            Records::Individuals(individuals) => {
                let mut stmt = tx.prepare(
                    "INSERT INTO individual (project_id, clinic_id, family_id, member_id, gender)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for ind in individuals {
                    stmt.execute(params![
                        ind.project_id,
                        ind.clinic_id,
                        ind.family_id,
                        ind.member_id,
                        ind.gender.code(),
                    ])?;
                }
            }
            Records::Phenotypes(phenotypes) => {
                let mut stmt = tx
                    .prepare("INSERT INTO phenotype (ind_id, name, value) VALUES (?1, ?2, ?3)")?;
                for pheno in phenotypes {
                    stmt.execute(params![pheno.individual_id, pheno.name, pheno.value])?;
                }
            }
            Records::Genotypes(genotypes) => {
                let mut stmt = tx.prepare(
                    "INSERT INTO genotype (ind_id, marker, call_1, call_2) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for geno in genotypes {
                    stmt.execute(params![
                        geno.individual_id,
                        geno.marker,
                        geno.call_1.to_string(),
                        geno.call_2.to_string(),
                    ])?;
                }
            }
        }

        event.log(&tx)?;
        tx.commit()?;

        debug!("Inserted {} {} records", records.len(), records.file_type());
        Ok(records.len())
    }

    /// Record an audit event on its own (e.g. a rejected upload)
    pub fn log_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        event.log(&self.conn)?;
        Ok(())
    }

    /// Number of rows in one of the data tables
    pub fn count(&self, table: Table) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn exists(&self, sql: &str, params: impl rusqlite::Params) -> Result<bool, LookupError> {
        let found = self.conn.query_row(sql, params, |_| Ok(())).optional()?;
        Ok(found.is_some())
    }
}

/// Tables that can be counted with [`SqliteStore::count`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Project,
    Marker,
    MarkerAllele,
    Individual,
    Phenotype,
    Genotype,
    UploadLog,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Table::Project => "project",
            Table::Marker => "marker",
            Table::MarkerAllele => "marker_allele",
            Table::Individual => "individual",
            Table::Phenotype => "phenotype",
            Table::Genotype => "genotype",
            Table::UploadLog => "upload_log",
        }
    }
}

impl LookupService for SqliteStore {
    fn marker_exists(&self, marker_id: &str) -> Result<bool, LookupError> {
        self.exists("SELECT 1 FROM marker WHERE id = ?1", params![marker_id])
    }

    fn allele_exists(&self, marker_id: &str, allele: char) -> Result<bool, LookupError> {
        self.exists(
            "SELECT 1 FROM marker_allele WHERE marker = ?1 AND allele = ?2",
            params![marker_id, allele.to_string()],
        )
    }

    fn find_individual(
        &self,
        project_id: ProjectId,
        id: &IndividualId,
    ) -> Result<Option<IndividualDbId>, LookupError> {
        let found = self
            .conn
            .query_row(
                "SELECT id FROM individual
                 WHERE project_id = ?1 AND clinic_id = ?2 AND family_id = ?3 AND member_id = ?4",
                params![project_id, id.clinic, id.family, id.member],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found)
    }

    fn phenotype_exists(
        &self,
        individual_id: IndividualDbId,
        name: &str,
    ) -> Result<bool, LookupError> {
        self.exists(
            "SELECT 1 FROM phenotype WHERE ind_id = ?1 AND name = ?2",
            params![individual_id, name],
        )
    }

    fn genotype_exists(
        &self,
        individual_id: IndividualDbId,
        marker_id: &str,
    ) -> Result<bool, LookupError> {
        self.exists(
            "SELECT 1 FROM genotype WHERE ind_id = ?1 AND marker = ?2",
            params![individual_id, marker_id],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Genotype, Individual, Marker, MarkerAllele, Phenotype};
    use tempfile::tempdir;

    fn event() -> AuditEvent {
        AuditEvent::new(
            AuditEventType::UploadAccepted,
            None,
            None,
            Some("test.csv".to_string()),
            serde_json::json!({}),
        )
    }

    fn individual(project_id: ProjectId, member_id: u32, gender: Gender) -> Individual {
        Individual {
            project_id,
            clinic_id: "CLN".to_string(),
            family_id: "FAM".to_string(),
            member_id,
            gender,
        }
    }

    fn markers() -> Records {
        Records::Markers {
            markers: vec![Marker { id: "M1".to_string(), chromosome: 1, position: 1000 }],
            alleles: vec![
                MarkerAllele { marker: "M1".to_string(), allele: 'A' },
                MarkerAllele { marker: "M1".to_string(), allele: 'G' },
            ],
        }
    }

    #[test]
    fn test_marker_lookups() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(!store.marker_exists("M1").unwrap());

        assert_eq!(store.insert_records(&markers(), &event()).unwrap(), 3);

        assert!(store.marker_exists("M1").unwrap());
        assert!(store.allele_exists("M1", 'G').unwrap());
        assert!(!store.allele_exists("M1", 'T').unwrap());
        assert_eq!(store.count(Table::UploadLog).unwrap(), 1);
    }

    #[test]
    fn test_individual_lookups() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let project = store.create_project("Study", "", None).unwrap();
        assert!(store.project_exists(project).unwrap());
        assert!(!store.project_exists(project + 1).unwrap());

        let records = Records::Individuals(vec![individual(project, 1, Gender::Male)]);
        store.insert_records(&records, &event()).unwrap();

        let id = IndividualId::new("CLN", "FAM", 1);
        let db_id = store.find_individual(project, &id).unwrap();
        assert!(db_id.is_some());
        assert_eq!(store.find_individual(project + 1, &id).unwrap(), None);

        let db_id = db_id.unwrap();
        store.insert_records(&markers(), &event()).unwrap();
        store
            .insert_records(
                &Records::Phenotypes(vec![Phenotype {
                    individual_id: db_id,
                    name: "Height".to_string(),
                    value: "180".to_string(),
                }]),
                &event(),
            )
            .unwrap();
        store
            .insert_records(
                &Records::Genotypes(vec![Genotype {
                    individual_id: db_id,
                    marker: "M1".to_string(),
                    call_1: 'A',
                    call_2: 'G',
                }]),
                &event(),
            )
            .unwrap();

        assert!(store.phenotype_exists(db_id, "Height").unwrap());
        assert!(!store.phenotype_exists(db_id, "Weight").unwrap());
        assert!(store.genotype_exists(db_id, "M1").unwrap());
    }

    #[test]
    fn test_insert_is_all_or_nothing() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let project = store.create_project("Study", "", None).unwrap();

        // Second row breaks the unique constraint
        let records = Records::Individuals(vec![
            individual(project, 3, Gender::Unknown),
            individual(project, 3, Gender::Female),
        ]);

        assert!(store.insert_records(&records, &event()).is_err());
        assert_eq!(store.count(Table::Individual).unwrap(), 0);
        // Only the project creation was logged
        assert_eq!(store.count(Table::UploadLog).unwrap(), 1);
    }

    #[test]
    fn test_require_project() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(store.require_project(5), Err(StoreError::ProjectNotFound(5))));
    }

    #[test]
    fn test_reopen_file_keeps_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gendb.sqlite");

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.insert_records(&markers(), &event()).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.marker_exists("M1").unwrap());
        assert_eq!(store.count(Table::MarkerAllele).unwrap(), 2);
    }
}
