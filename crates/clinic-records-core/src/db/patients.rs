//! Patient database operations.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{MatchPolicy, PatientRecord, PatientSummary, RecordId, StoredPatient};

impl ToSql for RecordId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for RecordId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(RecordId)
    }
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(RecordId),
    Updated(RecordId),
    /// More than one record carries the name; nothing was written.
    Ambiguous(usize),
}

const PATIENT_COLUMNS: &str = "id, name, date, complaint, diagnosis, treatment, next_visit, \
                               created_at, updated_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<StoredPatient> {
    Ok(StoredPatient {
        id: row.get(0)?,
        record: PatientRecord {
            name: row.get(1)?,
            date: row.get(2)?,
            complaint: row.get(3)?,
            diagnosis: row.get(4)?,
            treatment: row.get(5)?,
            next_visit: row.get(6)?,
        },
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<PatientSummary> {
    Ok(PatientSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        date: row.get(2)?,
    })
}

fn insert(conn: &Connection, record: &PatientRecord) -> rusqlite::Result<RecordId> {
    conn.execute(
        r#"
        INSERT INTO patients (
            name, date, complaint, diagnosis, treatment, next_visit
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            record.name,
            record.date,
            record.complaint,
            record.diagnosis,
            record.treatment,
            record.next_visit,
        ],
    )?;
    Ok(RecordId(conn.last_insert_rowid()))
}

fn update(conn: &Connection, id: RecordId, record: &PatientRecord) -> rusqlite::Result<bool> {
    let rows_affected = conn.execute(
        r#"
        UPDATE patients SET
            name = ?2,
            date = ?3,
            complaint = ?4,
            diagnosis = ?5,
            treatment = ?6,
            next_visit = ?7,
            updated_at = datetime('now')
        WHERE id = ?1
        "#,
        params![
            id,
            record.name,
            record.date,
            record.complaint,
            record.diagnosis,
            record.treatment,
            record.next_visit,
        ],
    )?;
    Ok(rows_affected > 0)
}

fn ids_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Vec<RecordId>> {
    let mut stmt = conn.prepare("SELECT id FROM patients WHERE name = ? ORDER BY id")?;
    let rows = stmt.query_map([name], |row| row.get(0))?;
    rows.collect()
}

impl Database {
    /// Insert a new patient, returning the assigned id.
    pub fn insert_patient(&self, record: &PatientRecord) -> DbResult<RecordId> {
        Ok(insert(&self.conn, record)?)
    }

    /// Overwrite every editable field of an existing patient.
    pub fn update_patient(&self, id: RecordId, record: &PatientRecord) -> DbResult<bool> {
        Ok(update(&self.conn, id, record)?)
    }

    /// Insert, or replace the fields of the single record with the same name.
    ///
    /// Lookup and write share one transaction.
    pub fn upsert_patient_by_name(&mut self, record: &PatientRecord) -> DbResult<UpsertOutcome> {
        let tx = self.conn.transaction()?;
        let ids = ids_by_name(&tx, &record.name)?;
        let outcome = match ids.as_slice() {
            [] => UpsertOutcome::Inserted(insert(&tx, record)?),
            [id] => {
                update(&tx, *id, record)?;
                UpsertOutcome::Updated(*id)
            }
            many => return Ok(UpsertOutcome::Ambiguous(many.len())),
        };
        tx.commit()?;
        Ok(outcome)
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: RecordId) -> DbResult<Option<StoredPatient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Ids of every patient with exactly this name, oldest first.
    pub fn find_patient_ids_by_name(&self, name: &str) -> DbResult<Vec<RecordId>> {
        Ok(ids_by_name(&self.conn, name)?)
    }

    /// List all patients as summaries, in insertion order.
    pub fn list_patient_summaries(&self) -> DbResult<Vec<PatientSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, date FROM patients ORDER BY id")?;

        let rows = stmt.query_map([], summary_from_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search patient summaries by name.
    ///
    /// Matching runs in Rust so case folding covers non-ASCII names,
    /// which SQLite's `LIKE` and `lower()` do not.
    pub fn search_patient_summaries(
        &self,
        query: &str,
        policy: MatchPolicy,
    ) -> DbResult<Vec<PatientSummary>> {
        let lowered = query.to_lowercase();
        let mut summaries = self.list_patient_summaries()?;
        summaries.retain(|s| policy.matches(&s.name, &lowered));
        Ok(summaries)
    }

    /// Number of stored patients.
    pub fn count_patients(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete a patient.
    pub fn delete_patient(&self, id: RecordId) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
