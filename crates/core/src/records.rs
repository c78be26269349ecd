//! Typed document shapes, one per collection.
//!
//! Field names are camelCase on the wire; other tooling reads these collections directly, so the
//! serialised names must not change. Decoding a stored document into the wrong shape fails with
//! `AdminError::Validation` rather than passing an untyped value along.

use crate::store::{Collection, Document, DocumentData, DocumentStore};
use crate::{AdminError, AdminResult};
use chrono::{DateTime, Utc};
use portal_types::EmailAddress;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A document shape bound to the collection it lives in.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn to_data(&self) -> AdminResult<DocumentData> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AdminError::Validation(format!(
                "{} record did not serialise to an object",
                Self::COLLECTION
            ))),
            Err(e) => Err(AdminError::from_json(
                format!("encode {} record", Self::COLLECTION),
                e,
            )),
        }
    }

    fn from_document(doc: &Document) -> AdminResult<Self> {
        doc.decode(Self::COLLECTION)
    }
}

/// Creates a record with a store-assigned id.
pub fn create_record<R: Record>(store: &dyn DocumentStore, record: &R) -> AdminResult<String> {
    store.create_document(R::COLLECTION, record.to_data()?)
}

/// Reads a record by id, decoding it into its typed shape.
pub fn get_record<R: Record>(store: &dyn DocumentStore, id: &str) -> AdminResult<Option<R>> {
    store
        .get_document(R::COLLECTION, id)?
        .map(|doc| R::from_document(&doc))
        .transpose()
}

/// A decoded record together with its document id.
#[derive(Clone, Debug, PartialEq)]
pub struct Stored<R> {
    pub id: String,
    pub record: R,
}

/// Decodes every document, failing on the first one with the wrong shape.
pub fn decode_all<R: Record>(documents: Vec<Document>) -> AdminResult<Vec<Stored<R>>> {
    documents
        .into_iter()
        .map(|doc| {
            let record = R::from_document(&doc)?;
            Ok(Stored { id: doc.id, record })
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    FacilityAdmin,
    Doctor,
    Nurse,
    User,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::FacilityAdmin,
        Role::Doctor,
        Role::Nurse,
        Role::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::FacilityAdmin => "facility_admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| {
                AdminError::Validation(format!(
                    "unknown role '{s}' (expected one of admin, facility_admin, doctor, nurse, user)"
                ))
            })
    }
}

/// Profile document mirroring an identity, stored under the identity's uid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: EmailAddress,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Record for UserProfile {
    const COLLECTION: Collection = Collection::Users;
}

/// Bills are created outside this toolkit; only the fields it displays are typed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Bill {
    const COLLECTION: Collection = Collection::Bills;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub bill_id: String,
    pub invoice_number: String,
    pub amount_due: f64,
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
}

impl Record for Invoice {
    const COLLECTION: Collection = Collection::Invoices;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub bill_id: String,
    pub amount: f64,
    pub payment_date: DateTime<Utc>,
    pub payment_method: String,
    pub status: PaymentStatus,
}

impl Record for Payment {
    const COLLECTION: Collection = Collection::Payments;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    pub bill_id: String,
    pub reason: String,
    pub status: DisputeStatus,
    pub created_at: DateTime<Utc>,
}

impl Record for Dispute {
    const COLLECTION: Collection = Collection::Disputes;
}

/// Append-only audit log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub user_id: String,
    pub action: String,
    pub target_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl Record for AuditEntry {
    const COLLECTION: Collection = Collection::Audit;
}

/// Counter payload; the counter's name is its document id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub value: i64,
}

impl Record for Counter {
    const COLLECTION: Collection = Collection::InventoryCounters;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub patient_id: String,
    #[serde(default)]
    pub facility_id: Option<String>,
    #[serde(default)]
    pub visit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Record for Visit {
    const COLLECTION: Collection = Collection::Visits;
}

/// Links a user to a facility they can act for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFacility {
    pub user_id: String,
    pub facility_id: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Record for UserFacility {
    const COLLECTION: Collection = Collection::UserFacilities;
}
