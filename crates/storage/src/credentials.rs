//! Credential resolution for storage clients.
//!
//! Precedence: explicit configuration, then the
//! `GOOGLE_APPLICATION_CREDENTIALS` / `GOOGLE_PROJECT_ID` environment, then
//! the application-default credentials of the runtime environment. The
//! resolved value is hashable so the provider can memoize one client per
//! distinct (credentials, project) pair.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::StorageError;

/// Environment variable naming a service-account key file.
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Environment variable naming the project.
pub const ENV_PROJECT_ID: &str = "GOOGLE_PROJECT_ID";

/// Where the credentials come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialsSource {
    /// A service-account key file.
    ServiceAccount(PathBuf),
    /// Implicit credentials of the runtime environment.
    ApplicationDefault,
}

/// Parsed fields of a service-account key file. Only the fields the
/// filesystem needs are retained.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Project the key belongs to.
    pub project_id: Option<String>,
    /// Service-account identity.
    pub client_email: Option<String>,
}

/// Resolved credentials plus project identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GcsCredentials {
    source: CredentialsSource,
    project_id: Option<String>,
}

impl GcsCredentials {
    /// Resolve credentials from explicit configuration, the environment, or
    /// the application default, in that order.
    ///
    /// # Arguments
    /// * `credentials` - Explicitly configured key-file path, if any
    /// * `project_id` - Explicitly configured project, if any
    ///
    /// When a key file is used and no project is configured, the project is
    /// taken from the key file itself.
    pub fn resolve(
        credentials: Option<&Path>,
        project_id: Option<&str>,
    ) -> Result<Self, StorageError> {
        let mut project: Option<String> = project_id
            .map(str::to_string)
            .or_else(|| env::var(ENV_PROJECT_ID).ok().filter(|v| !v.is_empty()));

        let key_path: Option<PathBuf> = credentials.map(Path::to_path_buf).or_else(|| {
            env::var(ENV_CREDENTIALS)
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });

        let source: CredentialsSource = match key_path {
            Some(path) => {
                if project.is_none() {
                    let key: ServiceAccountKey = Self::read_key_file(&path)?;
                    project = key.project_id;
                }
                CredentialsSource::ServiceAccount(path)
            }
            None => CredentialsSource::ApplicationDefault,
        };

        Ok(Self {
            source,
            project_id: project,
        })
    }

    /// Application-default credentials with no project configured.
    pub fn application_default() -> Self {
        Self {
            source: CredentialsSource::ApplicationDefault,
            project_id: None,
        }
    }

    /// Parse a service-account key file.
    pub fn read_key_file(path: &Path) -> Result<ServiceAccountKey, StorageError> {
        let raw: Vec<u8> = std::fs::read(path).map_err(|source| StorageError::Io {
            context: path.display().to_string(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|e| StorageError::InvalidConfig {
            message: format!("Malformed service-account key {}: {}", path.display(), e),
        })
    }

    /// The credential source.
    pub fn source(&self) -> &CredentialsSource {
        &self.source
    }

    /// The resolved project, if any.
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_key_file(dir: &tempfile::TempDir, project: &str) -> PathBuf {
        let path: PathBuf = dir.path().join("key.json");
        let mut file: std::fs::File = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"type":"service_account","project_id":"{}","client_email":"sa@{}.iam"}}"#,
            project, project
        )
        .unwrap();
        path
    }

    #[test]
    fn test_explicit_credentials_take_precedence() {
        let dir: tempfile::TempDir = tempfile::TempDir::new().unwrap();
        let path: PathBuf = write_key_file(&dir, "key-project");

        let creds: GcsCredentials =
            GcsCredentials::resolve(Some(&path), Some("explicit-project")).unwrap();
        assert_eq!(
            creds.source(),
            &CredentialsSource::ServiceAccount(path.clone())
        );
        assert_eq!(creds.project_id(), Some("explicit-project"));
    }

    #[test]
    fn test_project_read_from_key_file() {
        let dir: tempfile::TempDir = tempfile::TempDir::new().unwrap();
        let path: PathBuf = write_key_file(&dir, "key-project");

        let creds: GcsCredentials = GcsCredentials::resolve(Some(&path), None).unwrap();
        assert_eq!(creds.project_id(), Some("key-project"));
    }

    #[test]
    fn test_missing_key_file_is_io_error() {
        let result: Result<GcsCredentials, StorageError> =
            GcsCredentials::resolve(Some(Path::new("/no/such/key.json")), None);
        assert!(matches!(result, Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_credentials_are_hashable_identity() {
        use std::collections::HashSet;

        let a: GcsCredentials = GcsCredentials::application_default();
        let b: GcsCredentials = GcsCredentials::application_default();
        let mut set: HashSet<GcsCredentials> = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}
