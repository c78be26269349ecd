//! Idempotent initializers: inventory counters and the audit sentinel.

use crate::constants::{AUDIT_SENTINEL_ACTION, COUNTER_VALUE_FIELD, SYSTEM_ACTOR};
use crate::records::{create_record, get_record, AuditEntry, Counter, Record, Stored};
use crate::validation::validate_key;
use crate::{AdminError, AdminResult, Connection};
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Result of seeding one counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterSeed {
    pub name: String,
    /// `true` if the counter was created by this call.
    pub created: bool,
    /// Value after seeding; an existing counter keeps its value.
    pub value: i64,
}

pub struct SeedingService {
    conn: Arc<Connection>,
}

impl SeedingService {
    pub fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    /// Creates each named counter at zero unless it already exists.
    ///
    /// Existing counters are never reset, so re-running after increments is safe. All names are
    /// validated before the first write.
    pub fn seed_counters<S: AsRef<str>>(&self, names: &[S]) -> AdminResult<Vec<CounterSeed>> {
        for name in names {
            validate_key("counter name", name.as_ref())?;
        }

        let initial = Counter { value: 0 }.to_data()?;
        let mut seeded = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let created =
                self.conn
                    .store()
                    .insert_if_absent(Counter::COLLECTION, name, initial.clone())?;
            let value = self.counter(name)?.value;

            if created {
                tracing::info!(counter = name, "counter created");
            } else {
                tracing::info!(counter = name, value, "counter already present, left unchanged");
            }
            seeded.push(CounterSeed {
                name: name.to_owned(),
                created,
                value,
            });
        }
        Ok(seeded)
    }

    /// Reads a counter by name.
    pub fn counter(&self, name: &str) -> AdminResult<Counter> {
        validate_key("counter name", name)?;
        get_record::<Counter>(self.conn.store(), name)?
            .ok_or_else(|| AdminError::NotFound(format!("counter '{name}'")))
    }

    /// Adds `by` to a counter and returns the new value.
    pub fn increment_counter(&self, name: &str, by: i64) -> AdminResult<i64> {
        validate_key("counter name", name)?;
        let value =
            self.conn
                .store()
                .increment_field(Counter::COLLECTION, name, COUNTER_VALUE_FIELD, by)?;
        tracing::info!(counter = name, value, "counter incremented");
        Ok(value)
    }

    /// Appends the audit-log sentinel entry.
    ///
    /// The audit collection is append-only and never deduplicated, so calling this more than once
    /// simply adds another marker.
    pub fn seed_audit_sentinel(&self) -> AdminResult<Stored<AuditEntry>> {
        let mut details = Map::new();
        details.insert(
            "message".into(),
            Value::String("Audit log initialized".into()),
        );

        let entry = AuditEntry {
            user_id: SYSTEM_ACTOR.into(),
            action: AUDIT_SENTINEL_ACTION.into(),
            target_type: AuditEntry::COLLECTION.name().into(),
            timestamp: Utc::now(),
            details,
        };
        let id = create_record(self.conn.store(), &entry)?;
        tracing::info!(id = %id, "audit sentinel appended");
        Ok(Stored { id, record: entry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_COUNTERS;
    use crate::records::decode_all;
    use crate::store::DocumentStore;
    use crate::test_support::{test_backends, TestBackends};
    use tempfile::TempDir;

    fn setup() -> (TempDir, TestBackends, SeedingService) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backends = test_backends(temp_dir.path());
        let service = SeedingService::new(backends.connection.clone());
        (temp_dir, backends, service)
    }

    #[test]
    fn test_seeding_twice_leaves_zero() {
        let (_tmp, _backends, service) = setup();

        let first = service.seed_counters(&["supplierId"]).unwrap();
        assert!(first[0].created);
        let second = service.seed_counters(&["supplierId"]).unwrap();
        assert!(!second[0].created);

        assert_eq!(service.counter("supplierId").unwrap().value, 0);
    }

    #[test]
    fn test_reseed_does_not_reset_incremented_counter() {
        let (_tmp, _backends, service) = setup();
        service.seed_counters(&["purchaseOrderId"]).unwrap();

        assert_eq!(service.increment_counter("purchaseOrderId", 5).unwrap(), 5);

        let reseeded = service.seed_counters(&["purchaseOrderId"]).unwrap();
        assert_eq!(reseeded[0].value, 5);
        assert_eq!(service.counter("purchaseOrderId").unwrap().value, 5);
    }

    #[test]
    fn test_default_counters_end_to_end() {
        let (_tmp, backends, service) = setup();

        service.seed_counters(DEFAULT_COUNTERS).unwrap();
        for name in DEFAULT_COUNTERS {
            let doc = backends
                .store
                .get_document(Counter::COLLECTION, name)
                .unwrap()
                .expect("counter should exist");
            assert_eq!(doc.field("value"), Some(&Value::from(0)));
        }

        let writes = backends.store.writes();
        let again = service.seed_counters(DEFAULT_COUNTERS).unwrap();
        assert!(again.iter().all(|seed| !seed.created && seed.value == 0));
        assert_eq!(backends.store.writes(), writes);
    }

    #[test]
    fn test_invalid_counter_name_rejected_before_any_write() {
        let (_tmp, backends, service) = setup();

        let err = service
            .seed_counters(&["supplierId", "../escape"])
            .unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
        assert_eq!(backends.store.writes(), 0);
    }

    #[test]
    fn test_increment_missing_counter_is_not_found() {
        let (_tmp, _backends, service) = setup();
        assert!(matches!(
            service.increment_counter("supplierId", 1),
            Err(AdminError::NotFound(_))
        ));
    }

    #[test]
    fn test_audit_sentinel_allows_duplicates() {
        let (_tmp, backends, service) = setup();

        let first = service.seed_audit_sentinel().unwrap();
        let second = service.seed_audit_sentinel().unwrap();
        assert_ne!(first.id, second.id);

        let entries = decode_all::<AuditEntry>(
            backends
                .store
                .list_collection(AuditEntry::COLLECTION, None)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.record.action == AUDIT_SENTINEL_ACTION && e.record.user_id == "system"));
    }
}
