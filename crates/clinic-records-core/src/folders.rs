//! Per-patient folder provisioning.
//!
//! Folders are named from a summary row, e.g. `Ahmad Ali` seen on
//! `23/03/2025` becomes `Ahmad_Ali_23032025`, and always live under a
//! configured root.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::models::PatientSummary;

/// Folder provisioning errors.
#[derive(Error, Debug)]
pub enum FolderError {
    #[error("Invalid folder name derived from {0:?}")]
    InvalidName(String),

    #[error("Failed to create {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type FolderResult<T> = Result<T, FolderError>;

/// Folder name for a patient visit.
pub fn folder_name(name: &str, date: &str) -> FolderResult<String> {
    let name_part: String = name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    let date_part: String = date
        .trim()
        .chars()
        .filter(|c| *c != '/')
        .map(|c| if c == '\\' { '_' } else { c })
        .collect();

    if name_part.is_empty() || name_part == "." || name_part == ".." {
        return Err(FolderError::InvalidName(name.to_string()));
    }
    if date_part.is_empty() {
        return Err(FolderError::InvalidName(date.to_string()));
    }

    Ok(format!("{}_{}", name_part, date_part))
}

/// Creates patient folders under a fixed root.
#[derive(Debug, Clone)]
pub struct FolderProvisioner {
    root: PathBuf,
}

impl FolderProvisioner {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the folder for `summary` would have.
    pub fn folder_path(&self, summary: &PatientSummary) -> FolderResult<PathBuf> {
        Ok(self.root.join(folder_name(&summary.name, &summary.date)?))
    }

    /// Create the folder for `summary`. Existing folders are left as they are.
    pub fn provision(&self, summary: &PatientSummary) -> FolderResult<PathBuf> {
        let path = self.folder_path(summary)?;
        fs::create_dir_all(&path).map_err(|source| FolderError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "patient folder ready");
        Ok(path)
    }
}
