//! Document store access.
//!
//! The hosted document store is an external collaborator; this module defines the narrow surface
//! the routines need ([`DocumentStore`]) and the named collections that form the wire contract.
//! [`FsDocumentStore`] backs the trait with one JSON file per document.

mod fs;

pub use fs::FsDocumentStore;
pub(crate) use fs::write_new;

use crate::{AdminError, AdminResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Raw payload of a document: a JSON object.
pub type DocumentData = Map<String, Value>;

/// The named collections the toolkit reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Bills,
    Invoices,
    Payments,
    Disputes,
    Audit,
    InventoryCounters,
    Visits,
    UserFacilities,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::Users,
        Collection::Bills,
        Collection::Invoices,
        Collection::Payments,
        Collection::Disputes,
        Collection::Audit,
        Collection::InventoryCounters,
        Collection::Visits,
        Collection::UserFacilities,
    ];

    /// Collection name as stored; other tooling depends on these exact strings.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Bills => "bills",
            Collection::Invoices => "invoices",
            Collection::Payments => "payments",
            Collection::Disputes => "disputes",
            Collection::Audit => "audit",
            Collection::InventoryCounters => "inventory_counters",
            Collection::Visits => "visits",
            Collection::UserFacilities => "user_facilities",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| AdminError::Validation(format!("unknown collection '{s}'")))
    }
}

/// A stored document: its id plus its JSON payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: DocumentData,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Decodes the payload into a typed record.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` when the stored shape does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self, collection: Collection) -> AdminResult<T> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| {
            AdminError::Validation(format!(
                "document {}/{} does not match the expected shape: {e}",
                collection, self.id
            ))
        })
    }
}

/// Collection-scoped access to the document store.
///
/// Implementations re-classify backend failures into the [`AdminError`] taxonomy: transient
/// conditions as `Transient`, permission problems as `Authorization`.
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Creates a document with a store-assigned unique id and returns that id.
    fn create_document(&self, collection: Collection, data: DocumentData) -> AdminResult<String>;

    /// Upserts a document at an explicit id.
    fn set_document(&self, collection: Collection, id: &str, data: DocumentData)
        -> AdminResult<()>;

    /// Writes a document at `id` only if nothing exists there yet.
    ///
    /// Returns `true` if the document was written, `false` if one already existed.
    fn insert_if_absent(
        &self,
        collection: Collection,
        id: &str,
        data: DocumentData,
    ) -> AdminResult<bool>;

    fn get_document(&self, collection: Collection, id: &str) -> AdminResult<Option<Document>>;

    /// Deletes a document. Returns `false` if there was nothing to delete.
    fn delete_document(&self, collection: Collection, id: &str) -> AdminResult<bool>;

    /// Equality filter on one top-level field. The result is a snapshot taken at call time.
    fn query_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> AdminResult<Vec<Document>>;

    /// Bounded scan of a collection, ordered by document id.
    fn list_collection(
        &self,
        collection: Collection,
        limit: Option<usize>,
    ) -> AdminResult<Vec<Document>>;

    /// Atomically adds `delta` to an integer field and returns the new value.
    ///
    /// A missing field counts as zero; a missing document is `NotFound`.
    fn increment_field(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        delta: i64,
    ) -> AdminResult<i64>;
}
