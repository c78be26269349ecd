//! Identity and profile routines.
//!
//! A user exists twice: as an identity in the identity provider and as a profile document in the
//! `users` collection keyed by the identity's uid. The routines here keep the two in step.
//!
//! Deletion removes the profile first and the identity second. An identity without a profile can
//! still be found by email and deleted again later; a profile without an identity cannot be
//! traced back to anything, so the profile goes first.

use crate::identity::{NewIdentity, UserIdentity};
use crate::records::{get_record, Record, Role, Stored, UserProfile};
use crate::store::Collection;
use crate::validation::validate_password;
use crate::{AdminError, AdminResult, Connection};
use chrono::Utc;
use portal_types::{EmailAddress, NonEmptyText};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

const STEP_DELETE_PROFILE: &str = "delete profile";
const STEP_DELETE_IDENTITY: &str = "delete identity";
const STEP_WRITE_PROFILE: &str = "write profile";

/// Validated input for [`UserService::create_user`].
#[derive(Clone)]
pub struct NewUser {
    pub email: EmailAddress,
    pub password: String,
    pub name: NonEmptyText,
    pub role: Role,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish()
    }
}

/// Outcome of a completed delete-user routine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletedUser {
    pub uid: String,
    pub email: EmailAddress,
    /// `false` when the profile was already gone, e.g. on a re-run after a partial failure.
    pub profile_existed: bool,
}

/// How the identity and profile for one email relate to each other.
#[derive(Clone, Debug, PartialEq)]
pub enum UserState {
    /// Identity and profile both present.
    Consistent {
        identity: UserIdentity,
        profile: UserProfile,
    },
    /// Identity present, profile gone. Left behind by an interrupted delete-user routine;
    /// re-running the deletion finishes it.
    ProfileMissing { identity: UserIdentity },
    /// Profile documents with this email but no identity behind them.
    OrphanedProfiles { profiles: Vec<Stored<UserProfile>> },
}

pub struct UserService {
    conn: Arc<Connection>,
}

impl UserService {
    pub fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    /// Exact-match lookup of an identity by email.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if no identity has this email. Nothing is written.
    pub fn find_user_by_email(&self, email: &EmailAddress) -> AdminResult<UserIdentity> {
        self.conn.identity().find_by_email(email)
    }

    /// Replaces the password of the identity registered under `email`.
    ///
    /// The password policy is checked before the identity is looked up, so a weak password
    /// fails with `Validation` even for an unknown email.
    pub fn reset_password(
        &self,
        email: &EmailAddress,
        new_password: &str,
    ) -> AdminResult<UserIdentity> {
        validate_password(new_password)?;

        let identity = self.find_user_by_email(email)?;
        self.conn
            .identity()
            .update_password(&identity.uid, new_password)?;

        tracing::info!(uid = %identity.uid, "password reset");
        Ok(identity)
    }

    /// Deletes the profile document and then the identity for `email`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no identity has this email. Nothing is deleted.
    /// - The profile-delete error unchanged if that step fails. The identity is left intact.
    /// - `PartialFailure` naming the uid and the identity-delete step if the profile is gone
    ///   but the identity could not be deleted.
    pub fn delete_user(&self, email: &EmailAddress) -> AdminResult<DeletedUser> {
        let identity = self.find_user_by_email(email)?;
        let uid = identity.uid;

        let profile_existed = self
            .conn
            .store()
            .delete_document(Collection::Users, &uid)
            .inspect_err(|e| {
                tracing::warn!(uid = %uid, step = STEP_DELETE_PROFILE, error = %e, "delete-user aborted, identity untouched");
            })?;
        if !profile_existed {
            tracing::warn!(uid = %uid, "profile document already absent");
        }

        if let Err(e) = self.conn.identity().delete_user(&uid) {
            tracing::error!(
                uid = %uid,
                step = STEP_DELETE_IDENTITY,
                error = %e,
                "profile deleted but identity remains; re-run delete-user to finish"
            );
            return Err(AdminError::partial(uid, STEP_DELETE_IDENTITY, e));
        }

        tracing::info!(uid = %uid, "user deleted");
        Ok(DeletedUser {
            uid,
            email: identity.email,
            profile_existed,
        })
    }

    /// Creates an identity and its profile document.
    ///
    /// If the profile cannot be written the new identity is deleted again. Should that
    /// compensation fail too, the result is a `PartialFailure` naming the uid.
    pub fn create_user(&self, new_user: NewUser) -> AdminResult<UserProfile> {
        validate_password(&new_user.password)?;

        let NewUser {
            email,
            password,
            name,
            role,
        } = new_user;

        let identity = self.conn.identity().create_user(NewIdentity {
            email,
            password,
            display_name: Some(name.clone()),
        })?;

        let profile = UserProfile {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            name: name.into_inner(),
            role,
            created_at: Utc::now(),
        };

        let written = profile
            .to_data()
            .and_then(|data| self.conn.store().set_document(Collection::Users, &profile.uid, data));

        if let Err(write_err) = written {
            return match self.conn.identity().delete_user(&identity.uid) {
                Ok(()) => {
                    tracing::warn!(uid = %identity.uid, error = %write_err, "profile write failed; identity rolled back");
                    Err(write_err)
                }
                Err(rollback_err) => {
                    tracing::error!(
                        uid = %identity.uid,
                        step = STEP_WRITE_PROFILE,
                        error = %write_err,
                        rollback_error = %rollback_err,
                        "profile write failed and identity could not be rolled back"
                    );
                    Err(AdminError::partial(
                        identity.uid,
                        STEP_WRITE_PROFILE,
                        write_err,
                    ))
                }
            };
        }

        tracing::info!(uid = %profile.uid, role = %profile.role, "user created");
        Ok(profile)
    }

    /// Reports how identity and profile for `email` relate.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` when there is neither an identity nor a profile.
    pub fn check_user(&self, email: &EmailAddress) -> AdminResult<UserState> {
        match self.find_user_by_email(email) {
            Ok(identity) => {
                match get_record::<UserProfile>(self.conn.store(), &identity.uid)? {
                    Some(profile) => Ok(UserState::Consistent { identity, profile }),
                    None => Ok(UserState::ProfileMissing { identity }),
                }
            }
            Err(AdminError::NotFound(_)) => {
                let documents = self.conn.store().query_by_field(
                    UserProfile::COLLECTION,
                    "email",
                    &Value::String(email.as_str().to_owned()),
                )?;
                let profiles = crate::records::decode_all::<UserProfile>(documents)?;
                if profiles.is_empty() {
                    return Err(AdminError::NotFound(format!(
                        "no identity or profile for {email}"
                    )));
                }
                Ok(UserState::OrphanedProfiles { profiles })
            }
            Err(e) => Err(e),
        }
    }
}
