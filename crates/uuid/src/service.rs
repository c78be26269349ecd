//! Internal implementation of the identifier types.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// The portal's canonical UUID representation (32 lowercase hex characters, no hyphens).
///
/// Once constructed, the contained UUID is in canonical form, so it can be used directly as a
/// document id or a file name without further checks.
///
/// # Construction
/// - [`UuidService::new`] generates a new canonical UUID.
/// - [`UuidService::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UuidService(Uuid);

impl Default for UuidService {
    fn default() -> Self {
        Self::new()
    }
}

impl UuidService {
    /// Generates a new random (v4) UUID in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses a UUID string that must already be in canonical form.
    ///
    /// Hyphenated or uppercase forms are rejected rather than normalised.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("'{}': {}", input, e)))
    }

    /// Returns the inner `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical UUID form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>`, the shard directory for this UUID.
    ///
    /// `s1` is the first two hex characters and `s2` the next two.
    pub fn shard_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        parent_dir.join(&canonical[0..2]).join(&canonical[2..4])
    }

    /// Returns `parent_dir/<s1>/<s2>/<uuid>.<extension>`.
    pub fn sharded_file(&self, parent_dir: &Path, extension: &str) -> PathBuf {
        self.shard_dir(parent_dir)
            .join(format!("{}.{}", self.0.simple(), extension))
    }
}

impl fmt::Display for UuidService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for UuidService {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UuidService::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for UuidService {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for UuidService {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        UuidService::parse(&s).map_err(serde::de::Error::custom)
    }
}

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

/// A millisecond-precision UTC timestamp rendered as `YYYYMMDDTHHMMSS.mmmZ`.
///
/// Example: `20260111T143522.045Z`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestampId {
    timestamp: DateTime<Utc>,
}

impl TimestampId {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Generates a timestamp id strictly greater than `last` (by at least 1 ms).
    pub fn generate(last: Option<&TimestampId>) -> Self {
        Self::generate_at(Utc::now(), last)
    }

    fn generate_at(now: DateTime<Utc>, last: Option<&TimestampId>) -> Self {
        let now = truncate_to_millis(now);
        let timestamp = match last {
            Some(prev) if now <= prev.timestamp => prev.timestamp + Duration::milliseconds(1),
            _ => now,
        };
        Self { timestamp }
    }
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

impl fmt::Display for TimestampId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.timestamp.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for TimestampId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(ts_no_z) = s.strip_suffix('Z') else {
            return Err(UuidError::InvalidInput(format!(
                "Timestamp must end with 'Z': '{}'",
                s
            )));
        };

        let naive = NaiveDateTime::parse_from_str(ts_no_z, "%Y%m%dT%H%M%S%.3f").map_err(|e| {
            UuidError::InvalidInput(format!("Invalid timestamp format '{}': {}", s, e))
        })?;

        Ok(Self {
            timestamp: DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc),
        })
    }
}

/// Hands out strictly increasing [`TimestampId`]s.
///
/// The generator remembers the last id it issued, so two ids taken from the same generator never
/// collide even when requested within the same millisecond.
#[derive(Debug, Default)]
pub struct TimestampIdGenerator {
    last: Mutex<Option<TimestampId>>,
}

impl TimestampIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> TimestampId {
        let mut last = self.last.lock();
        let id = TimestampId::generate(last.as_ref());
        *last = Some(id);
        id
    }
}
