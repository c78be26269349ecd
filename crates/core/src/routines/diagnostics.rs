//! Read-only inspection routines.
//!
//! These never write. Empty results come back as empty vectors; the caller decides how to
//! report them.

use crate::records::{decode_all, Record, Stored, UserFacility, Visit};
use crate::store::Collection;
use crate::{AdminResult, Connection};
use portal_types::NonEmptyText;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionCount {
    pub collection: Collection,
    pub documents: usize,
}

impl CollectionCount {
    pub fn is_empty(&self) -> bool {
        self.documents == 0
    }
}

pub struct DiagnosticsService {
    conn: Arc<Connection>,
}

impl DiagnosticsService {
    pub fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    /// Counts the documents in every known collection.
    pub fn check_collections(&self) -> AdminResult<Vec<CollectionCount>> {
        Collection::ALL
            .into_iter()
            .map(|collection| {
                let documents = self.conn.store().list_collection(collection, None)?.len();
                Ok(CollectionCount {
                    collection,
                    documents,
                })
            })
            .collect()
    }

    /// Visits recorded for one patient.
    pub fn list_visits(&self, patient_id: &str) -> AdminResult<Vec<Stored<Visit>>> {
        self.query("patientId", patient_id)
    }

    /// Facilities linked to one user.
    pub fn list_facilities(&self, user_id: &str) -> AdminResult<Vec<Stored<UserFacility>>> {
        self.query("userId", user_id)
    }

    fn query<R: Record>(&self, field: &str, value: &str) -> AdminResult<Vec<Stored<R>>> {
        let value = NonEmptyText::new(value)?;
        let documents = self.conn.store().query_by_field(
            R::COLLECTION,
            field,
            &Value::String(value.into_inner()),
        )?;
        tracing::debug!(collection = %R::COLLECTION, field, matches = documents.len(), "query");
        decode_all(documents)
    }
}
