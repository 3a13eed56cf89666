//! File-backed [`SecretStore`].
//!
//! Each identity ref is stored as `<dir>/<escaped ref>.json`. Identity refs are
//! usually ARN-like (`arn:aws:secretsmanager:...`), so anything outside
//! `[A-Za-z0-9._-]` is escaped as `%XX`.

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{SecretStore, SecretValue, StoreError};

/// Application name used for the default secrets directory
const APP_NAME: &str = "crmsession";

/// Subdirectory of the cache dir holding secret files
const SECRETS_DIR: &str = "secrets";

pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<cache_dir>/crmsession/secrets`, if the platform has a cache dir.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join(APP_NAME).join(SECRETS_DIR))
    }

    fn secret_path(&self, identity_ref: &str) -> PathBuf {
        self.dir.join(format!("{}.json", escape_file_name(identity_ref)))
    }
}

fn escape_file_name(identity_ref: &str) -> String {
    let mut out = String::with_capacity(identity_ref.len());
    for byte in identity_ref.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

impl SecretStore for FileSecretStore {
    fn get_secret_value(&self, identity_ref: &str) -> Result<SecretValue, StoreError> {
        let path = self.secret_path(identity_ref);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(SecretValue::new(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(identity_ref.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn put_secret_value(&self, identity_ref: &str, secret_string: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.secret_path(identity_ref);
        // Write-then-rename so a reader never sees a half-written record.
        let tmp = path.with_extension("json.tmp");
        if let Err(e) = write_owner_only(&tmp, secret_string)
            .and_then(|()| std::fs::rename(&tmp, &path))
        {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(path = %path.display(), "Wrote secret file");
        Ok(())
    }
}

/// Create `path` readable by the owner only, then write `contents`.
fn write_owner_only(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARN: &str = "arn:aws:secretsmanager:us-east-1:123456789012:secret:CrmCredential";

    #[test]
    fn test_escape_file_name() {
        assert_eq!(escape_file_name("plain-name_1.0"), "plain-name_1.0");
        assert_eq!(escape_file_name("a:b/c"), "a%3Ab%2Fc");
        assert_eq!(escape_file_name("100%"), "100%25");
        // distinct refs never share a file
        assert_ne!(escape_file_name("a:b"), escape_file_name("a_b"));
    }

    #[test]
    fn test_put_then_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("nested"));

        store.put_secret_value(ARN, r#"{"Domain":"x.my"}"#).unwrap();
        let value = store.get_secret_value(ARN).unwrap();
        assert_eq!(value.secret_string, r#"{"Domain":"x.my"}"#);
    }

    #[test]
    fn test_put_overwrites_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path());

        store.put_secret_value(ARN, "a much longer first value").unwrap();
        store.put_secret_value(ARN, "short").unwrap();
        assert_eq!(store.get_secret_value(ARN).unwrap().secret_string, "short");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path());
        let err = store.get_secret_value(ARN).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref id) if id == ARN));
    }

    #[test]
    fn test_secret_stays_inside_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path());
        store.put_secret_value("../escape", "x").unwrap();

        let path = store.secret_path("../escape");
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_secret_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path());
        store.put_secret_value(ARN, r#"{"ConsumerSecret":"S"}"#).unwrap();

        let mode = std::fs::metadata(store.secret_path(ARN)).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "mode was {:o}", mode);
    }

    #[test]
    fn test_put_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path());
        store.put_secret_value(ARN, "v1").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names[0].to_string_lossy().ends_with(".tmp"));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path());
        // a directory where the record should go makes the rename fail
        std::fs::create_dir(store.secret_path(ARN)).unwrap();
        std::fs::write(store.secret_path(ARN).join("occupied"), "x").unwrap();

        assert!(store.put_secret_value(ARN, "v1").is_err());
        assert!(!store.secret_path(ARN).with_extension("json.tmp").exists());
    }
}
