//! Member dues records.
//!
//! One record tracks the payment status of one member for one dues
//! cycle. Records are created `UNPAID`, never deleted, and only moved
//! between statuses; a missing record is read as `UNPAID` everywhere.

use crate::members::MembershipType;
use crate::utils::current_timestamp;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment status of a dues record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuesStatus {
    /// Dues owed, nothing recorded.
    Unpaid,
    /// Paid through the hosted checkout.
    Paid,
    /// Paid outside the hosted checkout, approved manually.
    PaidOffline,
    /// Marked as not owing for the cycle.
    Waived,
}

impl DuesStatus {
    /// Get the wire string for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Paid => "PAID",
            Self::PaidOffline => "PAID_OFFLINE",
            Self::Waived => "WAIVED",
        }
    }

    /// Check if the record counts toward collected dues.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid | Self::PaidOffline)
    }
}

impl fmt::Display for DuesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Hosted checkout.
    Stripe,
    /// Zelle transfer.
    Zelle,
    /// Venmo transfer.
    Venmo,
    /// Cash App transfer.
    Cashapp,
    /// Cash in hand.
    Cash,
    /// Paper check.
    Check,
}

impl PaymentMethod {
    /// Get the wire string for this method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Zelle => "zelle",
            Self::Venmo => "venmo",
            Self::Cashapp => "cashapp",
            Self::Cash => "cash",
            Self::Check => "check",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The dues state of one member for one cycle.
///
/// Keyed by `(member_id, cycle_id)`. The `version` counter backs
/// optimistic concurrency: writers submit the version they read, and
/// the store rejects the write if another approver got there first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDuesRecord {
    /// Unique record ID.
    pub id: String,
    /// The member this record belongs to.
    pub member_id: String,
    /// The cycle this record belongs to.
    pub cycle_id: String,
    /// Membership type the amount was priced against.
    pub membership_type: MembershipType,
    /// Amount owed or paid, in minor currency units.
    pub amount: i64,
    /// Current payment status.
    pub status: DuesStatus,
    /// Date the payment was made, if any.
    pub paid_on: Option<NaiveDate>,
    /// How the payment was made, if any.
    pub payment_method: Option<PaymentMethod>,
    /// Member ID of the approver, for offline payments and waivers.
    pub approved_by: Option<String>,
    /// Free-form approver notes.
    pub notes: Option<String>,
    /// Optimistic concurrency version, bumped on every write.
    pub version: u64,
    /// Created timestamp (Unix seconds).
    pub created_at: u64,
    /// Updated timestamp (Unix seconds).
    pub updated_at: u64,
}

impl MemberDuesRecord {
    /// Create a fresh `UNPAID` record for a member and cycle.
    #[must_use]
    pub fn new_unpaid(
        member_id: impl Into<String>,
        cycle_id: impl Into<String>,
        membership_type: MembershipType,
        amount: i64,
    ) -> Self {
        let now = current_timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            member_id: member_id.into(),
            cycle_id: cycle_id.into(),
            membership_type,
            amount,
            status: DuesStatus::Unpaid,
            paid_on: None,
            payment_method: None,
            approved_by: None,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to `PAID` after a confirmed checkout payment.
    pub fn record_checkout_payment(&mut self, paid_on: NaiveDate) {
        self.status = DuesStatus::Paid;
        self.paid_on = Some(paid_on);
        self.payment_method = Some(PaymentMethod::Stripe);
        self.updated_at = current_timestamp();
    }

    /// Transition to `PAID_OFFLINE` with full audit stamps.
    pub fn record_offline_payment(
        &mut self,
        amount: i64,
        method: PaymentMethod,
        paid_on: NaiveDate,
        approved_by: impl Into<String>,
        notes: Option<String>,
    ) {
        self.status = DuesStatus::PaidOffline;
        self.amount = amount;
        self.paid_on = Some(paid_on);
        self.payment_method = Some(method);
        self.approved_by = Some(approved_by.into());
        self.notes = notes;
        self.updated_at = current_timestamp();
    }

    /// Transition to `WAIVED`; a waived member owes nothing for the cycle.
    pub fn record_waiver(&mut self, approved_by: impl Into<String>) {
        self.status = DuesStatus::Waived;
        self.amount = 0;
        self.paid_on = None;
        self.payment_method = None;
        self.approved_by = Some(approved_by.into());
        self.updated_at = current_timestamp();
    }

    /// Reset to `UNPAID`, restoring the owed amount.
    ///
    /// Clears the payment stamps so stale approval fields cannot be
    /// misread as current; the prior transition survives in the audit
    /// log.
    pub fn reset_to_unpaid(&mut self, owed_amount: i64) {
        self.status = DuesStatus::Unpaid;
        self.amount = owed_amount;
        self.paid_on = None;
        self.payment_method = None;
        self.approved_by = None;
        self.notes = None;
        self.updated_at = current_timestamp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_record_is_unpaid() {
        let record = MemberDuesRecord::new_unpaid("mem_1", "cyc_1", MembershipType::Professional, 8500);
        assert_eq!(record.status, DuesStatus::Unpaid);
        assert_eq!(record.amount, 8500);
        assert_eq!(record.version, 0);
        assert!(record.paid_on.is_none());
        assert!(record.approved_by.is_none());
    }

    #[test]
    fn test_offline_payment_stamps_audit_fields() {
        let mut record =
            MemberDuesRecord::new_unpaid("mem_1", "cyc_1", MembershipType::Professional, 8500);
        record.record_offline_payment(
            8500,
            PaymentMethod::Zelle,
            date("2025-09-01"),
            "treasurer_1",
            Some("paid at meeting".to_string()),
        );

        assert_eq!(record.status, DuesStatus::PaidOffline);
        assert_eq!(record.payment_method, Some(PaymentMethod::Zelle));
        assert_eq!(record.paid_on, Some(date("2025-09-01")));
        assert_eq!(record.approved_by.as_deref(), Some("treasurer_1"));
        assert_eq!(record.notes.as_deref(), Some("paid at meeting"));
    }

    #[test]
    fn test_waiver_zeroes_amount() {
        let mut record =
            MemberDuesRecord::new_unpaid("mem_1", "cyc_1", MembershipType::Student, 6500);
        record.record_waiver("president_1");

        assert_eq!(record.status, DuesStatus::Waived);
        assert_eq!(record.amount, 0);
        assert!(record.payment_method.is_none());
    }

    #[test]
    fn test_reset_clears_payment_stamps() {
        let mut record =
            MemberDuesRecord::new_unpaid("mem_1", "cyc_1", MembershipType::Professional, 8500);
        record.record_offline_payment(
            8500,
            PaymentMethod::Cash,
            date("2025-09-01"),
            "treasurer_1",
            Some("cash at meeting".to_string()),
        );
        record.reset_to_unpaid(8500);

        assert_eq!(record.status, DuesStatus::Unpaid);
        assert_eq!(record.amount, 8500);
        assert!(record.paid_on.is_none());
        assert!(record.payment_method.is_none());
        assert!(record.approved_by.is_none());
        assert!(record.notes.is_none());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&DuesStatus::PaidOffline).unwrap(),
            "\"PAID_OFFLINE\""
        );
        assert_eq!(serde_json::to_string(&DuesStatus::Unpaid).unwrap(), "\"UNPAID\"");
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Cashapp).unwrap(),
            "\"cashapp\""
        );
    }

    #[test]
    fn test_is_paid() {
        assert!(DuesStatus::Paid.is_paid());
        assert!(DuesStatus::PaidOffline.is_paid());
        assert!(!DuesStatus::Unpaid.is_paid());
        assert!(!DuesStatus::Waived.is_paid());
    }
}
