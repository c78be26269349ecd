//! Sample billing records and bill listing.
//!
//! Invoices, payments and disputes are created against a bill id with a single `create_document`
//! call each. The referenced bill is not looked up: these records are seed and test data, and
//! referential integrity is left to the caller.

use crate::constants::{INVOICE_DUE_DAYS, INVOICE_NUMBER_PREFIX};
use crate::records::{
    create_record, decode_all, Bill, Dispute, DisputeStatus, Invoice, InvoiceStatus, Payment,
    PaymentStatus, Record, Stored,
};
use crate::validation::validate_amount;
use crate::{AdminError, AdminResult, Connection};
use chrono::{Duration, Utc};
use portal_types::NonEmptyText;
use portal_uuid::TimestampIdGenerator;
use std::sync::Arc;

pub const DEFAULT_INVOICE_AMOUNT: f64 = 150.0;
pub const DEFAULT_PAYMENT_AMOUNT: f64 = 150.0;
pub const DEFAULT_PAYMENT_METHOD: &str = "credit_card";
pub const DEFAULT_DISPUTE_REASON: &str = "Charge does not match services received";

pub struct BillingService {
    conn: Arc<Connection>,
    invoice_numbers: TimestampIdGenerator,
}

impl BillingService {
    pub fn new(conn: Arc<Connection>) -> Self {
        Self {
            conn,
            invoice_numbers: TimestampIdGenerator::new(),
        }
    }

    /// Bill ids are references to existing documents and are stored exactly as given.
    fn bill_reference(bill_id: &str) -> AdminResult<String> {
        if bill_id.trim().is_empty() {
            return Err(AdminError::Validation("billId cannot be empty".into()));
        }
        Ok(bill_id.to_owned())
    }

    fn next_invoice_number(&self) -> String {
        format!("{INVOICE_NUMBER_PREFIX}{}", self.invoice_numbers.next_id())
    }

    /// Creates a pending invoice due [`INVOICE_DUE_DAYS`] days from now.
    pub fn create_sample_invoice(
        &self,
        bill_id: &str,
        amount_due: Option<f64>,
    ) -> AdminResult<Stored<Invoice>> {
        let bill_id = Self::bill_reference(bill_id)?;
        let amount_due = amount_due.unwrap_or(DEFAULT_INVOICE_AMOUNT);
        validate_amount("amountDue", amount_due)?;

        let invoice = Invoice {
            bill_id,
            invoice_number: self.next_invoice_number(),
            amount_due,
            due_date: Utc::now() + Duration::days(INVOICE_DUE_DAYS),
            status: InvoiceStatus::Pending,
        };
        self.create(invoice)
    }

    /// Creates a completed payment dated now.
    pub fn create_sample_payment(
        &self,
        bill_id: &str,
        amount: Option<f64>,
        payment_method: Option<&str>,
    ) -> AdminResult<Stored<Payment>> {
        let bill_id = Self::bill_reference(bill_id)?;
        let amount = amount.unwrap_or(DEFAULT_PAYMENT_AMOUNT);
        validate_amount("amount", amount)?;
        let payment_method = NonEmptyText::new(payment_method.unwrap_or(DEFAULT_PAYMENT_METHOD))?;

        let payment = Payment {
            bill_id,
            amount,
            payment_date: Utc::now(),
            payment_method: payment_method.into_inner(),
            status: PaymentStatus::Completed,
        };
        self.create(payment)
    }

    /// Opens a dispute against a bill.
    pub fn create_sample_dispute(
        &self,
        bill_id: &str,
        reason: Option<&str>,
    ) -> AdminResult<Stored<Dispute>> {
        let bill_id = Self::bill_reference(bill_id)?;
        let reason = NonEmptyText::new(reason.unwrap_or(DEFAULT_DISPUTE_REASON))?;

        let dispute = Dispute {
            bill_id,
            reason: reason.into_inner(),
            status: DisputeStatus::Open,
            created_at: Utc::now(),
        };
        self.create(dispute)
    }

    /// Lists bills in id order, at most `limit` of them. A limit of zero is rejected.
    pub fn list_bills(&self, limit: Option<usize>) -> AdminResult<Vec<Stored<Bill>>> {
        if limit == Some(0) {
            return Err(AdminError::Validation("limit must be at least 1".into()));
        }
        let documents = self
            .conn
            .store()
            .list_collection(Bill::COLLECTION, limit)?;
        decode_all(documents)
    }

    fn create<R: Record>(&self, record: R) -> AdminResult<Stored<R>> {
        let id = create_record(self.conn.store(), &record)?;
        tracing::info!(collection = %R::COLLECTION, id = %id, "sample record created");
        Ok(Stored { id, record })
    }
}
