//! Clinic Records Core Library
//!
//! Local-first patient record storage for a small clinic.
//!
//! # Architecture
//!
//! ```text
//!        GUI shell / CLI
//!              │
//!      ┌───────▼────────┐
//!      │  PatientStore  │   create · update · upsert · delete
//!      │                │   list_all · search · find_by_identity
//!      └───────┬────────┘
//!              │  one connection per operation
//!      ┌───────▼────────┐
//!      │ SQLite patients│
//!      └────────────────┘
//!
//!   selected record ──► PatientDocument (export)
//!   selected row    ──► FolderProvisioner (per-patient folder)
//! ```
//!
//! # Core Principle
//!
//! **The surrogate id is the identity.** Names are display and search data and
//! resolve to a record only when exactly one record carries them.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (PatientRecord, PatientSummary, Identity, etc.)
//! - [`store`]: The patient record store
//! - [`export`]: Printable patient documents
//! - [`folders`]: Per-patient folder provisioning
//! - [`config`]: Paths from the environment

pub mod config;
pub mod db;
pub mod export;
pub mod folders;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::{ClinicConfig, ConfigError};
pub use db::Database;
pub use export::{ExportError, PatientDocument};
pub use folders::{FolderError, FolderProvisioner};
pub use models::{
    Identity, MatchPolicy, PatientRecord, PatientSummary, RecordId, StoredPatient,
    ValidationError,
};
pub use store::{PatientStore, StoreError, StoreResult};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::PathBuf;
use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous identity: {0}")]
    AmbiguousIdentity(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Folder error: {0}")]
    FolderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StoreError> for ClinicError {
    fn from(e: StoreError) -> Self {
        let message = e.to_string();
        match e {
            StoreError::Validation(_) => ClinicError::ValidationError(message),
            StoreError::NotFound(_) => ClinicError::NotFound(message),
            StoreError::AmbiguousIdentity { .. } => ClinicError::AmbiguousIdentity(message),
            StoreError::StorageUnavailable { .. } => ClinicError::StorageUnavailable(message),
            StoreError::Storage(_) => ClinicError::StorageError(message),
        }
    }
}

impl From<ExportError> for ClinicError {
    fn from(e: ExportError) -> Self {
        ClinicError::ExportError(e.to_string())
    }
}

impl From<FolderError> for ClinicError {
    fn from(e: FolderError) -> Self {
        ClinicError::FolderError(e.to_string())
    }
}

impl From<ConfigError> for ClinicError {
    fn from(e: ConfigError) -> Self {
        ClinicError::ConfigError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a patient store at the given path.
#[uniffi::export]
pub fn open_store(path: String) -> Result<Arc<ClinicCore>, ClinicError> {
    ClinicCore::open(ClinicConfig::default().with_database_path(path))
}

/// Open a store with folder and export locations.
#[uniffi::export]
pub fn open_store_with_config(
    database_path: String,
    folder_root: Option<String>,
    export_dir: Option<String>,
) -> Result<Arc<ClinicCore>, ClinicError> {
    let mut config = ClinicConfig::default().with_database_path(database_path);
    if let Some(root) = folder_root {
        config = config.with_folder_root(root);
    }
    if let Some(dir) = export_dir {
        config = config.with_export_dir(dir);
    }
    ClinicCore::open(config)
}

/// Open a store configured from `CLINIC_*` environment variables.
#[uniffi::export]
pub fn open_store_from_env() -> Result<Arc<ClinicCore>, ClinicError> {
    ClinicCore::open(ClinicConfig::from_env())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Patient store handle for FFI. Created once and shared with the GUI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    store: PatientStore,
    config: ClinicConfig,
}

impl ClinicCore {
    fn open(config: ClinicConfig) -> Result<Arc<Self>, ClinicError> {
        let store = config.store();
        store.initialize()?;
        Ok(Arc::new(Self { store, config }))
    }

    fn stored(&self, id: i64) -> Result<StoredPatient, ClinicError> {
        Ok(self.store.find_by_identity(&Identity::Id(RecordId(id)))?)
    }
}

#[uniffi::export]
impl ClinicCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Ensure the database and table exist.
    pub fn initialize(&self) -> Result<(), ClinicError> {
        Ok(self.store.initialize()?)
    }

    /// Add a new patient record, returning its id.
    pub fn create_patient(&self, record: FfiPatientRecord) -> Result<i64, ClinicError> {
        Ok(self.store.create(record.into())?.get())
    }

    /// Replace every field of the patient with this id.
    pub fn update_patient(&self, id: i64, record: FfiPatientRecord) -> Result<(), ClinicError> {
        Ok(self.store.update(&Identity::Id(RecordId(id)), record.into())?)
    }

    /// Save by name: replace the patient with the same name or add a new one.
    pub fn upsert_patient(&self, record: FfiPatientRecord) -> Result<i64, ClinicError> {
        Ok(self.store.upsert(record.into())?.get())
    }

    /// Delete the patient with this id.
    pub fn delete_patient(&self, id: i64) -> Result<(), ClinicError> {
        Ok(self.store.delete(&Identity::Id(RecordId(id)))?)
    }

    /// All patients, in insertion order.
    pub fn list_patients(&self) -> Result<Vec<FfiPatientSummary>, ClinicError> {
        let summaries = self.store.list_all()?;
        Ok(summaries.into_iter().map(|s| s.into()).collect())
    }

    /// Search patients by name (case-insensitive substring, or prefix).
    pub fn search_patients(
        &self,
        query: String,
        prefix: bool,
    ) -> Result<Vec<FfiPatientSummary>, ClinicError> {
        let policy = if prefix {
            MatchPolicy::Prefix
        } else {
            MatchPolicy::Substring
        };
        let store = self.store.clone().with_match_policy(policy);
        let summaries = store.search(&query)?;
        Ok(summaries.into_iter().map(|s| s.into()).collect())
    }

    /// Get a patient by id.
    pub fn find_patient(&self, id: i64) -> Result<FfiStoredPatient, ClinicError> {
        Ok(self.stored(id)?.into())
    }

    /// Get the single patient with exactly this name.
    pub fn find_patient_by_name(&self, name: String) -> Result<FfiStoredPatient, ClinicError> {
        let patient = self.store.find_by_identity(&Identity::Name(name))?;
        Ok(patient.into())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Write the patient's details PDF; returns the written path.
    ///
    /// Without `path` the document goes into the configured export directory.
    pub fn export_document(&self, id: i64, path: Option<String>) -> Result<String, ClinicError> {
        let patient = self.stored(id)?;
        let document = PatientDocument::from_record(&patient.record);
        let written = match path {
            Some(path) => document.write_to(PathBuf::from(path))?,
            None => document.write_into(self.config.export_dir())?,
        };
        Ok(written.display().to_string())
    }

    /// Create the patient's folder under the configured root; returns its path.
    pub fn provision_folder(&self, id: i64) -> Result<String, ClinicError> {
        let provisioner = self.config.folder_provisioner()?;
        let summary = self.stored(id)?.summary();
        let path = provisioner.provision(&summary)?;
        Ok(path.display().to_string())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientRecord {
    pub name: String,
    pub date: String,
    pub complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub next_visit: Option<String>,
}

impl From<FfiPatientRecord> for PatientRecord {
    fn from(record: FfiPatientRecord) -> Self {
        PatientRecord {
            name: record.name,
            date: record.date,
            complaint: record.complaint,
            diagnosis: record.diagnosis,
            treatment: record.treatment,
            next_visit: record.next_visit,
        }
    }
}

impl From<PatientRecord> for FfiPatientRecord {
    fn from(record: PatientRecord) -> Self {
        Self {
            name: record.name,
            date: record.date,
            complaint: record.complaint,
            diagnosis: record.diagnosis,
            treatment: record.treatment,
            next_visit: record.next_visit,
        }
    }
}

/// FFI-safe stored patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStoredPatient {
    pub id: i64,
    pub record: FfiPatientRecord,
    pub created_at: String,
    pub updated_at: String,
}

impl From<StoredPatient> for FfiStoredPatient {
    fn from(patient: StoredPatient) -> Self {
        Self {
            id: patient.id.get(),
            record: patient.record.into(),
            created_at: patient.created_at,
            updated_at: patient.updated_at,
        }
    }
}

/// FFI-safe list row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientSummary {
    pub id: i64,
    pub name: String,
    pub date: String,
}

impl From<PatientSummary> for FfiPatientSummary {
    fn from(summary: PatientSummary) -> Self {
        Self {
            id: summary.id.get(),
            name: summary.name,
            date: summary.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, date: &str) -> FfiPatientRecord {
        FfiPatientRecord {
            name: name.into(),
            date: date.into(),
            complaint: None,
            diagnosis: None,
            treatment: None,
            next_visit: None,
        }
    }

    #[test]
    fn test_ffi_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db").display().to_string();
        let core = open_store(path).unwrap();

        let id = core.create_patient(record("Ali Khan", "23/03/2025")).unwrap();
        let found = core.find_patient(id).unwrap();
        assert_eq!(found.record.name, "Ali Khan");

        let rows = core.search_patients("khan".into(), false).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(core.search_patients("khan".into(), true).unwrap().is_empty());

        core.delete_patient(id).unwrap();
        assert!(matches!(
            core.find_patient(id).unwrap_err(),
            ClinicError::NotFound(_)
        ));
    }

    #[test]
    fn test_ffi_error_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db").display().to_string();
        let core = open_store(path).unwrap();

        assert!(matches!(
            core.create_patient(record("", "x")).unwrap_err(),
            ClinicError::ValidationError(_)
        ));

        core.create_patient(record("Sam", "1")).unwrap();
        core.create_patient(record("Sam", "2")).unwrap();
        assert!(matches!(
            core.find_patient_by_name("Sam".into()).unwrap_err(),
            ClinicError::AmbiguousIdentity(_)
        ));

        let missing = dir.path().join("nope").join("clinic.db").display().to_string();
        assert!(matches!(
            open_store(missing).err(),
            Some(ClinicError::StorageUnavailable(_))
        ));
    }

    #[test]
    fn test_ffi_export_and_folder() {
        let dir = tempfile::tempdir().unwrap();
        let core = open_store_with_config(
            dir.path().join("clinic.db").display().to_string(),
            Some(dir.path().join("folders").display().to_string()),
            Some(dir.path().display().to_string()),
        )
        .unwrap();

        let id = core.create_patient(record("Ahmad Ali", "23/03/2025")).unwrap();

        let exported = core.export_document(id, None).unwrap();
        assert!(exported.ends_with("patient_Ahmad_Ali.pdf"));
        assert!(std::fs::read(&exported).unwrap().starts_with(b"%PDF"));

        let folder = core.provision_folder(id).unwrap();
        assert!(folder.ends_with("Ahmad_Ali_23032025"));
        assert!(PathBuf::from(folder).is_dir());
    }

    #[test]
    fn test_ffi_folder_requires_root() {
        let dir = tempfile::tempdir().unwrap();
        let core = open_store(dir.path().join("clinic.db").display().to_string()).unwrap();
        let id = core.create_patient(record("Ali", "1")).unwrap();

        assert!(matches!(
            core.provision_folder(id).unwrap_err(),
            ClinicError::ConfigError(_)
        ));
    }
}
