//! Identity provider access.
//!
//! Accounts, credentials and stable user ids are owned by an external identity provider. The
//! toolkit consumes lookup-by-email, create, password update and delete through
//! [`IdentityProvider`]; [`FsIdentityProvider`] is the file-backed implementation.

mod fs;

pub use fs::FsIdentityProvider;

use crate::AdminResult;
use chrono::{DateTime, Utc};
use portal_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An account as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub uid: String,
    pub email: EmailAddress,
    #[serde(default)]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub disabled: bool,
}

/// Input for issuing a new identity.
#[derive(Clone)]
pub struct NewIdentity {
    pub email: EmailAddress,
    pub password: String,
    pub display_name: Option<NonEmptyText>,
}

impl fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewIdentity")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Operations consumed from the identity provider, keyed by the provider's stable uid.
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    /// Exact-match lookup. Misses are `AdminError::NotFound`.
    fn find_by_email(&self, email: &EmailAddress) -> AdminResult<UserIdentity>;

    fn get_user(&self, uid: &str) -> AdminResult<UserIdentity>;

    /// Issues a new identity. Emails are unique across identities.
    fn create_user(&self, new_identity: NewIdentity) -> AdminResult<UserIdentity>;

    /// Replaces the password. Violations of the strength policy are `AdminError::Validation`.
    fn update_password(&self, uid: &str, new_password: &str) -> AdminResult<()>;

    /// Irreversibly deletes the identity. A missing identity is `AdminError::NotFound`.
    fn delete_user(&self, uid: &str) -> AdminResult<()>;
}
