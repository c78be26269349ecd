//! Constants used throughout the portal core crate.
//!
//! Collection and directory names live here so the on-disk layout and the wire contract with
//! other tooling are defined in one place.

/// Default credential file looked up in the working directory.
pub const DEFAULT_CREDENTIALS_FILE: &str = "serviceAccountKey.json";

/// Default directory backing the file-based store and identity provider.
pub const DEFAULT_DATA_DIR: &str = "portal_data";

/// Directory (under the project directory) holding one sub-directory per collection.
pub const COLLECTIONS_DIR_NAME: &str = "collections";

/// Directory (under the project directory) holding identity records.
pub const IDENTITIES_DIR_NAME: &str = "identities";

/// File extension of stored documents and identity records.
pub const RECORD_EXTENSION: &str = "json";

/// Only credential files of this type are accepted.
pub const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// Identity provider minimum password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Maximum length for explicit document ids and field names.
pub const MAX_KEY_LEN: usize = 128;

/// Invoices fall due this many days after creation.
pub const INVOICE_DUE_DAYS: i64 = 30;

/// Prefix for generated invoice numbers.
pub const INVOICE_NUMBER_PREFIX: &str = "INV-";

/// Counters seeded when none are named explicitly.
pub const DEFAULT_COUNTERS: &[&str] = &["supplierId", "purchaseOrderId"];

/// Field on counter documents holding the current value.
pub const COUNTER_VALUE_FIELD: &str = "value";

/// Actor recorded on entries written by the toolkit itself.
pub const SYSTEM_ACTOR: &str = "system";

/// Action recorded by the audit sentinel.
pub const AUDIT_SENTINEL_ACTION: &str = "audit_log_initialized";
