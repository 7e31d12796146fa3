//! Patient record store.
//!
//! [`PatientStore`] is the single entry point callers use for patient
//! records. It holds only the database location: every operation opens its
//! own connection and drops it before returning, on success and error alike.
//!
//! Identity is the surrogate [`RecordId`]. Names are display and search data;
//! they resolve to a record only when exactly one record carries the name.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{Database, DbError, UpsertOutcome};
use crate::models::{
    Identity, MatchPolicy, PatientRecord, PatientSummary, RecordId, StoredPatient,
    ValidationError,
};

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Patient not found: {0}")]
    NotFound(Identity),

    #[error("{identity} matches {count} patients")]
    AmbiguousIdentity { identity: Identity, count: usize },

    #[error("Storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable { path: PathBuf, source: DbError },

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// File-backed patient record store.
#[derive(Debug, Clone)]
pub struct PatientStore {
    path: PathBuf,
    policy: MatchPolicy,
}

impl PatientStore {
    /// Create a store for the database at `path`. Nothing is opened yet.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            policy: MatchPolicy::default(),
        }
    }

    /// Use a different name matching policy for [`PatientStore::search`].
    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn match_policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Create the database file and table if missing. Safe to call on every start.
    pub fn initialize(&self) -> StoreResult<()> {
        Database::open(&self.path).map_err(|source| StoreError::StorageUnavailable {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "patient store initialized");
        Ok(())
    }

    /// Insert a new record.
    pub fn create(&self, record: PatientRecord) -> StoreResult<RecordId> {
        let record = Self::checked(record)?;
        let id = self.with_db(|db| db.insert_patient(&record))?;
        info!(%id, "patient created");
        Ok(id)
    }

    /// Overwrite every field of the record resolved by `identity`.
    pub fn update(&self, identity: &Identity, record: PatientRecord) -> StoreResult<()> {
        let record = Self::checked(record)?;
        let db = self.open()?;
        let id = Self::resolve(&db, identity)?;
        if !db.update_patient(id, &record)? {
            return Err(StoreError::NotFound(identity.clone()));
        }
        info!(%id, "patient updated");
        Ok(())
    }

    /// Replace the record with the same name, or insert if there is none.
    pub fn upsert(&self, record: PatientRecord) -> StoreResult<RecordId> {
        let record = Self::checked(record)?;
        let outcome = self.with_db_mut(|db| db.upsert_patient_by_name(&record))?;
        match outcome {
            UpsertOutcome::Inserted(id) => {
                info!(%id, "patient created by upsert");
                Ok(id)
            }
            UpsertOutcome::Updated(id) => {
                info!(%id, "patient replaced by upsert");
                Ok(id)
            }
            UpsertOutcome::Ambiguous(count) => {
                warn!(count, "upsert rejected: name is not unique");
                Err(StoreError::AmbiguousIdentity {
                    identity: Identity::Name(record.name),
                    count,
                })
            }
        }
    }

    /// Remove the record resolved by `identity`.
    pub fn delete(&self, identity: &Identity) -> StoreResult<()> {
        let db = self.open()?;
        let id = Self::resolve(&db, identity)?;
        if !db.delete_patient(id)? {
            return Err(StoreError::NotFound(identity.clone()));
        }
        info!(%id, "patient deleted");
        Ok(())
    }

    /// Every record as a (name, date) summary, in insertion order.
    pub fn list_all(&self) -> StoreResult<Vec<PatientSummary>> {
        let summaries = self.with_db(|db| db.list_patient_summaries())?;
        debug!(count = summaries.len(), "listed patients");
        Ok(summaries)
    }

    /// Summaries whose name matches `query` under the store's policy.
    pub fn search(&self, query: &str) -> StoreResult<Vec<PatientSummary>> {
        let policy = self.policy;
        let summaries = self.with_db(|db| db.search_patient_summaries(query, policy))?;
        debug!(query, ?policy, count = summaries.len(), "searched patients");
        Ok(summaries)
    }

    /// The full record resolved by `identity`.
    pub fn find_by_identity(&self, identity: &Identity) -> StoreResult<StoredPatient> {
        let db = self.open()?;
        let id = Self::resolve(&db, identity)?;
        db.get_patient(id)?
            .ok_or_else(|| StoreError::NotFound(identity.clone()))
    }

    /// Number of stored records.
    pub fn count(&self) -> StoreResult<usize> {
        self.with_db(|db| db.count_patients())
    }

    fn checked(record: PatientRecord) -> StoreResult<PatientRecord> {
        if let Err(e) = record.validate() {
            warn!(error = %e, "patient write rejected");
            return Err(e.into());
        }
        Ok(record.normalized())
    }

    fn resolve(db: &Database, identity: &Identity) -> StoreResult<RecordId> {
        match identity {
            Identity::Id(id) => Ok(*id),
            Identity::Name(name) => {
                let ids = db.find_patient_ids_by_name(name.trim())?;
                match ids.as_slice() {
                    [] => Err(StoreError::NotFound(identity.clone())),
                    [id] => Ok(*id),
                    many => Err(StoreError::AmbiguousIdentity {
                        identity: identity.clone(),
                        count: many.len(),
                    }),
                }
            }
        }
    }

    fn open(&self) -> StoreResult<Database> {
        Ok(Database::open_existing(&self.path)?)
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T, DbError>) -> StoreResult<T> {
        let db = self.open()?;
        Ok(f(&db)?)
    }

    fn with_db_mut<T>(
        &self,
        f: impl FnOnce(&mut Database) -> Result<T, DbError>,
    ) -> StoreResult<T> {
        let mut db = self.open()?;
        Ok(f(&mut db)?)
    }
}
