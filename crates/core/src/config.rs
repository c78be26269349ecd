//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the connection and
//! every routine as an `Arc<CoreConfig>`. Nothing in this crate reads environment variables;
//! the binary is responsible for turning its environment and flags into a `CoreConfig`.

use crate::constants::{
    COLLECTIONS_DIR_NAME, DEFAULT_CREDENTIALS_FILE, DEFAULT_DATA_DIR, IDENTITIES_DIR_NAME,
};
use crate::{AdminError, AdminResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    credentials_path: PathBuf,
    data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The credential path is only checked for emptiness here; whether it exists is decided
    /// when the connection is established, so a missing file is reported as `Fatal` there.
    pub fn new(credentials_path: PathBuf, data_dir: PathBuf) -> AdminResult<Self> {
        if credentials_path.as_os_str().is_empty() {
            return Err(AdminError::Fatal("credential file path cannot be empty".into()));
        }
        if data_dir.as_os_str().is_empty() {
            return Err(AdminError::Fatal("data directory cannot be empty".into()));
        }

        Ok(Self {
            credentials_path,
            data_dir,
        })
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Root directory of one project's data.
    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.data_dir.join(project_id)
    }

    pub fn collections_dir(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join(COLLECTIONS_DIR_NAME)
    }

    pub fn identities_dir(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join(IDENTITIES_DIR_NAME)
    }
}

/// Resolve the credential file path without reading environment variables.
///
/// An explicit override wins; otherwise the default file name in the working directory is used.
/// Existence is not checked here.
pub fn resolve_credentials_path(override_path: Option<PathBuf>) -> PathBuf {
    override_path
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE))
}

/// Resolve the data directory without reading environment variables.
///
/// If an override is given and already exists it must be a directory.
pub fn resolve_data_dir(override_dir: Option<PathBuf>) -> AdminResult<PathBuf> {
    match override_dir.filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) if dir.exists() && !dir.is_dir() => Err(AdminError::Fatal(format!(
            "data directory {} exists but is not a directory",
            dir.display()
        ))),
        Some(dir) => Ok(dir),
        None => Ok(PathBuf::from(DEFAULT_DATA_DIR)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_rejects_empty_paths() {
        let err = CoreConfig::new(PathBuf::new(), PathBuf::from("data")).unwrap_err();
        assert!(matches!(err, AdminError::Fatal(_)));

        let err = CoreConfig::new(PathBuf::from("key.json"), PathBuf::new()).unwrap_err();
        assert!(matches!(err, AdminError::Fatal(_)));
    }

    #[test]
    fn test_project_layout() {
        let cfg = CoreConfig::new(PathBuf::from("key.json"), PathBuf::from("/srv/portal")).unwrap();

        assert_eq!(cfg.project_dir("clinic-a"), PathBuf::from("/srv/portal/clinic-a"));
        assert_eq!(
            cfg.collections_dir("clinic-a"),
            PathBuf::from("/srv/portal/clinic-a/collections")
        );
        assert_eq!(
            cfg.identities_dir("clinic-a"),
            PathBuf::from("/srv/portal/clinic-a/identities")
        );
    }

    #[test]
    fn test_resolve_credentials_path_defaults() {
        assert_eq!(
            resolve_credentials_path(None),
            PathBuf::from(DEFAULT_CREDENTIALS_FILE)
        );
        assert_eq!(
            resolve_credentials_path(Some(PathBuf::new())),
            PathBuf::from(DEFAULT_CREDENTIALS_FILE)
        );
        assert_eq!(
            resolve_credentials_path(Some(PathBuf::from("/etc/portal/key.json"))),
            PathBuf::from("/etc/portal/key.json")
        );
    }

    #[test]
    fn test_resolve_data_dir_rejects_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, "x").expect("should write file");

        let err = resolve_data_dir(Some(file)).unwrap_err();
        assert!(matches!(err, AdminError::Fatal(_)));

        let ok = resolve_data_dir(Some(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(ok, temp_dir.path());
        assert_eq!(resolve_data_dir(None).unwrap(), PathBuf::from(DEFAULT_DATA_DIR));
    }
}
