//! File-backed identity provider.
//!
//! ## Storage Layout
//!
//! ```text
//! <identities_dir>/
//!   <s1>/
//!     <s2>/
//!       <uid>.json    # identity record with an Argon2id password hash
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the uid. Password hashes are stored
//! as PHC strings, so the salt and parameters travel with the hash.

use super::{IdentityProvider, NewIdentity, UserIdentity};
use crate::constants::RECORD_EXTENSION;
use crate::store::write_new;
use crate::validation::validate_password;
use crate::{AdminError, AdminResult};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use portal_types::EmailAddress;
use portal_uuid::UuidService;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

const MAX_UID_ALLOCATION_ATTEMPTS: usize = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredIdentity {
    uid: String,
    email: EmailAddress,
    #[serde(default)]
    display_name: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    disabled: bool,
}

impl StoredIdentity {
    fn to_identity(&self) -> UserIdentity {
        UserIdentity {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            created_at: self.created_at,
            disabled: self.disabled,
        }
    }
}

/// Hashes a password with Argon2id and a fresh random salt, returning the PHC string.
fn hash_password(password: &str) -> AdminResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AdminError::Transient(format!("argon2: {e}")))
}

fn list_error(e: io::Error) -> AdminError {
    AdminError::from_io("list identities", e)
}

#[derive(Debug)]
pub struct FsIdentityProvider {
    root: PathBuf,
    // Serialises the email-uniqueness check with the write that follows it.
    write_lock: Mutex<()>,
}

impl FsIdentityProvider {
    pub fn open(root: impl Into<PathBuf>) -> AdminResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            AdminError::from_io(format!("create identity directory {}", root.display()), e)
        })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, uid: &UuidService) -> PathBuf {
        uid.sharded_file(&self.root, RECORD_EXTENSION)
    }

    fn read_record(&self, path: &Path, uid: &str) -> AdminResult<StoredIdentity> {
        let raw = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AdminError::NotFound(format!("no identity with uid {uid}")),
            _ => AdminError::from_io(format!("read identity {uid}"), e),
        })?;
        serde_json::from_slice(&raw)
            .map_err(|e| AdminError::from_json(format!("identity record {uid}"), e))
    }

    fn load(&self, uid: &str) -> AdminResult<(PathBuf, StoredIdentity)> {
        let parsed = UuidService::parse(uid)?;
        let path = self.record_path(&parsed);
        let record = self.read_record(&path, uid)?;
        Ok((path, record))
    }

    fn write_record(&self, path: &Path, record: &StoredIdentity) -> AdminResult<()> {
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| AdminError::from_json("encode identity", e))?;
        let tmp = path.with_extension(format!("{RECORD_EXTENSION}.tmp"));
        let result = fs::write(&tmp, &bytes).and_then(|()| fs::rename(&tmp, path));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(AdminError::from_io(format!("write identity {}", record.uid), e));
        }
        Ok(())
    }

    /// Walks `<root>/<s1>/<s2>/*.json` and returns every record.
    ///
    /// Any I/O failure aborts the walk, since a record that cannot be read might be the one being
    /// looked for. Only records that read fine but fail to parse are logged and skipped.
    fn all_records(&self) -> AdminResult<Vec<StoredIdentity>> {
        let mut records = Vec::new();

        let s1_iter = match fs::read_dir(&self.root) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(list_error(e)),
        };
        for s1 in s1_iter {
            let s1_path = s1.map_err(list_error)?.path();
            if !s1_path.is_dir() {
                continue;
            }

            for s2 in fs::read_dir(&s1_path).map_err(list_error)? {
                let s2_path = s2.map_err(list_error)?.path();
                if !s2_path.is_dir() {
                    continue;
                }

                for file in fs::read_dir(&s2_path).map_err(list_error)? {
                    let path = file.map_err(list_error)?.path();
                    if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                        continue;
                    }
                    let raw = match fs::read(&path) {
                        Ok(raw) => raw,
                        // Deleted between listing and reading.
                        Err(e) if e.kind() == ErrorKind::NotFound => continue,
                        Err(e) => {
                            return Err(AdminError::from_io(
                                format!("read identity record {}", path.display()),
                                e,
                            ))
                        }
                    };
                    match serde_json::from_slice::<StoredIdentity>(&raw) {
                        Ok(record) => records.push(record),
                        Err(_) => {
                            tracing::warn!("failed to parse identity record: {}", path.display())
                        }
                    }
                }
            }
        }

        Ok(records)
    }

    fn find_record_by_email(&self, email: &EmailAddress) -> AdminResult<Option<StoredIdentity>> {
        Ok(self
            .all_records()?
            .into_iter()
            .find(|record| &record.email == email))
    }
}

impl IdentityProvider for FsIdentityProvider {
    fn find_by_email(&self, email: &EmailAddress) -> AdminResult<UserIdentity> {
        self.find_record_by_email(email)?
            .map(|record| record.to_identity())
            .ok_or_else(|| AdminError::NotFound(format!("no user with email {email}")))
    }

    fn get_user(&self, uid: &str) -> AdminResult<UserIdentity> {
        self.load(uid).map(|(_, record)| record.to_identity())
    }

    fn create_user(&self, new_identity: NewIdentity) -> AdminResult<UserIdentity> {
        validate_password(&new_identity.password)?;
        let _guard = self.write_lock.lock();

        if self.find_record_by_email(&new_identity.email)?.is_some() {
            return Err(AdminError::Validation(format!(
                "email {} is already in use by another account",
                new_identity.email
            )));
        }

        let password_hash = hash_password(&new_identity.password)?;
        for _attempt in 0..MAX_UID_ALLOCATION_ATTEMPTS {
            let uid = UuidService::new();
            let path = self.record_path(&uid);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| AdminError::from_io("create identity shard", e))?;
            }

            let record = StoredIdentity {
                uid: uid.to_string(),
                email: new_identity.email.clone(),
                display_name: new_identity
                    .display_name
                    .as_ref()
                    .map(|name| name.as_str().to_owned()),
                password_hash: password_hash.clone(),
                created_at: Utc::now(),
                disabled: false,
            };
            let bytes = serde_json::to_vec_pretty(&record)
                .map_err(|e| AdminError::from_json("encode identity", e))?;

            let created =
                write_new(&path, &bytes).map_err(|e| AdminError::from_io("create identity", e))?;
            if !created {
                continue;
            }

            tracing::info!(uid = %record.uid, "identity created");
            return Ok(record.to_identity());
        }

        Err(AdminError::Transient(format!(
            "failed to allocate a unique uid after {MAX_UID_ALLOCATION_ATTEMPTS} attempts"
        )))
    }

    fn update_password(&self, uid: &str, new_password: &str) -> AdminResult<()> {
        validate_password(new_password)?;
        let _guard = self.write_lock.lock();
        let (path, mut record) = self.load(uid)?;
        record.password_hash = hash_password(new_password)?;
        self.write_record(&path, &record)
    }

    fn delete_user(&self, uid: &str) -> AdminResult<()> {
        let parsed = UuidService::parse(uid)?;
        let _guard = self.write_lock.lock();
        fs::remove_file(self.record_path(&parsed)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AdminError::NotFound(format!("no identity with uid {uid}")),
            _ => AdminError::from_io(format!("delete identity {uid}"), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHash, PasswordVerifier};
    use portal_types::NonEmptyText;
    use tempfile::TempDir;

    fn password_matches(record: &StoredIdentity, password: &str) -> bool {
        let parsed = PasswordHash::new(&record.password_hash).expect("hash should be a PHC string");
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    fn new_identity(email: &str, password: &str) -> NewIdentity {
        NewIdentity {
            email: EmailAddress::parse(email).unwrap(),
            password: password.into(),
            display_name: Some(NonEmptyText::new("Test User").unwrap()),
        }
    }

    fn stored(provider: &FsIdentityProvider, uid: &str) -> StoredIdentity {
        provider.load(uid).expect("record should load").1
    }

    #[test]
    fn test_create_and_find_by_email() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let provider = FsIdentityProvider::open(temp_dir.path()).unwrap();

        let created = provider
            .create_user(new_identity("nurse@example.com", "secret1"))
            .expect("create should succeed");
        assert!(UuidService::is_canonical(&created.uid));
        assert_eq!(created.display_name.as_deref(), Some("Test User"));

        let found = provider
            .find_by_email(&EmailAddress::parse("nurse@example.com").unwrap())
            .expect("lookup should succeed");
        assert_eq!(found, created);

        let uid = UuidService::parse(&created.uid).unwrap();
        assert!(uid.sharded_file(temp_dir.path(), "json").is_file());
    }

    #[test]
    fn test_find_by_email_is_exact_match() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let provider = FsIdentityProvider::open(temp_dir.path()).unwrap();
        provider
            .create_user(new_identity("nurse@example.com", "secret1"))
            .unwrap();

        let err = provider
            .find_by_email(&EmailAddress::parse("Nurse@example.com").unwrap())
            .unwrap_err();
        assert!(matches!(err, AdminError::NotFound(_)));
    }

    #[test]
    fn test_password_is_never_stored_in_plaintext() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let provider = FsIdentityProvider::open(temp_dir.path()).unwrap();
        let created = provider
            .create_user(new_identity("a@example.com", "hunter22"))
            .unwrap();

        let path = provider.record_path(&UuidService::parse(&created.uid).unwrap());
        let raw = fs::read_to_string(path).unwrap();
        assert!(!raw.contains("hunter22"));

        let record = stored(&provider, &created.uid);
        assert!(record.password_hash.starts_with("$argon2id$"));
        assert!(password_matches(&record, "hunter22"));
        assert!(!password_matches(&record, "hunter23"));
    }

    #[test]
    fn test_duplicate_email_is_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let provider = FsIdentityProvider::open(temp_dir.path()).unwrap();
        provider
            .create_user(new_identity("a@example.com", "secret1"))
            .unwrap();

        let err = provider
            .create_user(new_identity("a@example.com", "secret2"))
            .unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
    }

    #[test]
    fn test_update_password_enforces_policy_and_rehashes() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let provider = FsIdentityProvider::open(temp_dir.path()).unwrap();
        let created = provider
            .create_user(new_identity("a@example.com", "secret1"))
            .unwrap();
        let before = stored(&provider, &created.uid);

        let err = provider.update_password(&created.uid, "123").unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
        assert_eq!(stored(&provider, &created.uid).password_hash, before.password_hash);

        provider
            .update_password(&created.uid, "new-secret")
            .expect("update should succeed");
        let after = stored(&provider, &created.uid);
        assert!(password_matches(&after, "new-secret"));
        assert!(!password_matches(&after, "secret1"));
    }

    #[test]
    fn test_delete_user_removes_identity() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let provider = FsIdentityProvider::open(temp_dir.path()).unwrap();
        let created = provider
            .create_user(new_identity("a@example.com", "secret1"))
            .unwrap();

        provider.delete_user(&created.uid).expect("delete should succeed");

        assert!(matches!(
            provider.get_user(&created.uid).unwrap_err(),
            AdminError::NotFound(_)
        ));
        assert!(matches!(
            provider.delete_user(&created.uid).unwrap_err(),
            AdminError::NotFound(_)
        ));
    }

    #[test]
    fn test_malformed_uid_is_validation_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let provider = FsIdentityProvider::open(temp_dir.path()).unwrap();

        assert!(matches!(
            provider.get_user("../../etc/passwd").unwrap_err(),
            AdminError::Validation(_)
        ));
    }

    fn break_record(provider: &FsIdentityProvider, uid: &str) {
        let path = provider.record_path(&UuidService::parse(uid).unwrap());
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
    }

    #[test]
    fn test_unreadable_record_is_not_reported_as_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let provider = FsIdentityProvider::open(temp_dir.path()).unwrap();
        let created = provider
            .create_user(new_identity("a@example.com", "secret1"))
            .unwrap();
        break_record(&provider, &created.uid);

        let err = provider
            .find_by_email(&EmailAddress::parse("a@example.com").unwrap())
            .unwrap_err();
        assert!(
            matches!(err, AdminError::Transient(_)),
            "read failure must surface as a provider error, got {err:?}"
        );
    }

    #[test]
    fn test_unreadable_record_blocks_duplicate_email() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let provider = FsIdentityProvider::open(temp_dir.path()).unwrap();
        let created = provider
            .create_user(new_identity("a@example.com", "secret1"))
            .unwrap();
        break_record(&provider, &created.uid);

        assert!(provider
            .create_user(new_identity("a@example.com", "secret2"))
            .is_err());

        let mut shard_files = 0;
        for s1 in fs::read_dir(temp_dir.path()).unwrap() {
            for s2 in fs::read_dir(s1.unwrap().path()).unwrap() {
                shard_files += fs::read_dir(s2.unwrap().path()).unwrap().count();
            }
        }
        assert_eq!(shard_files, 1, "no second identity may be written");
    }

    #[test]
    fn test_unparseable_record_is_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let provider = FsIdentityProvider::open(temp_dir.path()).unwrap();
        provider
            .create_user(new_identity("a@example.com", "secret1"))
            .unwrap();
        let junk = UuidService::new();
        let path = junk.sharded_file(temp_dir.path(), "json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let found = provider
            .find_by_email(&EmailAddress::parse("a@example.com").unwrap())
            .expect("valid records are still found");
        assert_eq!(found.email.as_str(), "a@example.com");
    }
}
