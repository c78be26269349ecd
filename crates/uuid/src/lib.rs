//! Identifier utilities.
//!
//! The portal uses a *canonical* UUID representation for every identifier it allocates itself
//! (generated document ids, identity uids): **32 lowercase hexadecimal characters** (no
//! hyphens).
//!
//! This crate provides:
//! - [`UuidService`], a wrapper that *guarantees* the canonical format once constructed, plus
//!   the sharded path derivation used by file-backed identity storage.
//! - [`TimestampId`] and [`TimestampIdGenerator`], a strictly increasing, human-readable
//!   timestamp used to derive invoice numbers.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! ## Sharded layout
//! For a canonical UUID `u`, records are stored under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>.<ext>`

mod service;

// Re-export public types
pub use service::{TimestampId, TimestampIdGenerator, Uuid, UuidService};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
