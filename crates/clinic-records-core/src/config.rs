//! Runtime configuration.
//!
//! # Environment Variables
//! - `CLINIC_DB_PATH`: database file (default: `clinic.db`)
//! - `CLINIC_FOLDER_ROOT`: root for patient folders (no default)
//! - `CLINIC_EXPORT_DIR`: directory for exported documents (default: `.`)

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::folders::FolderProvisioner;
use crate::store::PatientStore;

pub const DB_PATH_VAR: &str = "CLINIC_DB_PATH";
pub const FOLDER_ROOT_VAR: &str = "CLINIC_FOLDER_ROOT";
pub const EXPORT_DIR_VAR: &str = "CLINIC_EXPORT_DIR";

pub const DEFAULT_DB_PATH: &str = "clinic.db";
pub const DEFAULT_EXPORT_DIR: &str = ".";

/// Configuration errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No patient folder root configured (set CLINIC_FOLDER_ROOT)")]
    MissingFolderRoot,
}

/// Paths the application works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicConfig {
    pub database_path: PathBuf,
    pub folder_root: Option<PathBuf>,
    pub export_dir: PathBuf,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            folder_root: None,
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
        }
    }
}

impl ClinicConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        let defaults = Self::default();

        Self {
            database_path: get(DB_PATH_VAR).unwrap_or(defaults.database_path),
            folder_root: get(FOLDER_ROOT_VAR),
            export_dir: get(EXPORT_DIR_VAR).unwrap_or(defaults.export_dir),
        }
    }

    pub fn with_database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_folder_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.folder_root = Some(root.into());
        self
    }

    pub fn with_export_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Store for the configured database.
    pub fn store(&self) -> PatientStore {
        PatientStore::new(&self.database_path)
    }

    /// Folder provisioner for the configured root.
    pub fn folder_provisioner(&self) -> Result<FolderProvisioner, ConfigError> {
        self.folder_root
            .as_deref()
            .map(FolderProvisioner::new)
            .ok_or(ConfigError::MissingFolderRoot)
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClinicConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ClinicConfig::default());
        assert_eq!(config.database_path, PathBuf::from("clinic.db"));
        assert_eq!(
            config.folder_provisioner().unwrap_err(),
            ConfigError::MissingFolderRoot
        );
    }

    #[test]
    fn test_from_lookup() {
        let config = ClinicConfig::from_lookup(lookup(&[
            (DB_PATH_VAR, "/data/patients.db"),
            (FOLDER_ROOT_VAR, "/data/folders"),
            (EXPORT_DIR_VAR, "/data/exports"),
        ]));

        assert_eq!(config.store().path(), Path::new("/data/patients.db"));
        assert_eq!(
            config.folder_provisioner().unwrap().root(),
            Path::new("/data/folders")
        );
        assert_eq!(config.export_dir(), Path::new("/data/exports"));
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = ClinicConfig::from_lookup(lookup(&[(FOLDER_ROOT_VAR, "  ")]));
        assert!(config.folder_root.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClinicConfig::default()
            .with_database_path("a.db")
            .with_folder_root("roots")
            .with_export_dir("out");
        assert_eq!(config.database_path, PathBuf::from("a.db"));
        assert_eq!(config.folder_root, Some(PathBuf::from("roots")));
        assert_eq!(config.export_dir, PathBuf::from("out"));
    }
}
