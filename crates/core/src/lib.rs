//! # Portal Core
//!
//! Administrative data operations for the patient portal.
//!
//! This crate holds everything the `portal-admin` binary runs:
//! - Credential loading and the shared [`Connection`] handle, established once per [`AdminContext`]
//! - The [`AdminError`] taxonomy every operation reports through
//! - Document store and identity provider access behind traits, with file-backed implementations
//! - Typed records for each collection
//! - Routines: user lifecycle, sample billing records, counter and audit seeding, diagnostics
//!
//! **No CLI concerns**: argument parsing, logging setup and exit statuses belong in `portal-cli`.

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod records;
pub mod routines;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::CoreConfig;
pub use credentials::{AdminContext, Connection, ServiceCredentials};
pub use error::{AdminError, AdminResult};
pub use portal_types::{EmailAddress, NonEmptyText};
