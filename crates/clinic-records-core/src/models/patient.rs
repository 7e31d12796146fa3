//! Patient models.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Surrogate identifier assigned by storage on first insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Required-field violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// The user-editable fields of a patient visit record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientRecord {
    /// Patient name (required)
    pub name: String,
    /// Visit date, free text (required)
    pub date: String,
    /// Presenting complaint
    pub complaint: Option<String>,
    /// Diagnosis
    pub diagnosis: Option<String>,
    /// Treatment given
    pub treatment: Option<String>,
    /// Next visit, free text
    pub next_visit: Option<String>,
}

impl PatientRecord {
    /// Create a record with the required fields only.
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
            ..Self::default()
        }
    }

    pub fn with_complaint(mut self, complaint: impl Into<String>) -> Self {
        self.complaint = Some(complaint.into());
        self
    }

    pub fn with_diagnosis(mut self, diagnosis: impl Into<String>) -> Self {
        self.diagnosis = Some(diagnosis.into());
        self
    }

    pub fn with_treatment(mut self, treatment: impl Into<String>) -> Self {
        self.treatment = Some(treatment.into());
        self
    }

    pub fn with_next_visit(mut self, next_visit: impl Into<String>) -> Self {
        self.next_visit = Some(next_visit.into());
        self
    }

    /// Check the required fields. Whitespace-only counts as missing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.date.trim().is_empty() {
            return Err(ValidationError::MissingField("date"));
        }
        Ok(())
    }

    /// Required fields are trimmed and blank optional fields become absent,
    /// matching what storage returns.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.date = self.date.trim().to_string();
        for field in [
            &mut self.complaint,
            &mut self.diagnosis,
            &mut self.treatment,
            &mut self.next_visit,
        ] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
        self
    }
}

/// A record as it exists in storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredPatient {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: PatientRecord,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl StoredPatient {
    pub fn summary(&self) -> PatientSummary {
        PatientSummary {
            id: self.id,
            name: self.record.name.clone(),
            date: self.record.date.clone(),
        }
    }
}

/// The (name, date) projection shown in patient lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientSummary {
    pub id: RecordId,
    pub name: String,
    pub date: String,
}

/// How a caller refers to an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// Surrogate id; always unambiguous.
    Id(RecordId),
    /// Exact patient name; resolves only when a single record carries it.
    Name(String),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Id(id) => write!(f, "id {}", id),
            Identity::Name(name) => write!(f, "name {:?}", name),
        }
    }
}

impl From<RecordId> for Identity {
    fn from(id: RecordId) -> Self {
        Identity::Id(id)
    }
}

/// Name matching used by search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPolicy {
    /// Case-insensitive substring match.
    #[default]
    Substring,
    /// Case-insensitive prefix match.
    Prefix,
}

impl MatchPolicy {
    /// Match a name against a query that is already lowercased.
    pub fn matches(self, name: &str, lowered_query: &str) -> bool {
        let name = name.to_lowercase();
        match self {
            MatchPolicy::Substring => name.contains(lowered_query),
            MatchPolicy::Prefix => name.starts_with(lowered_query),
        }
    }
}
