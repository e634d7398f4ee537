//! Offline payment approval workflow.
//!
//! Authorized roles mark records `PAID_OFFLINE` or `WAIVED`, or reset
//! them to `UNPAID`. Records are created lazily on first approval, and
//! every write goes through a versioned compare-and-update so two
//! approvers acting at once cannot silently clobber each other.

use crate::audit::{DuesAuditEvent, DuesAuditLogger, TracingAuditLogger};
use crate::cycles::DuesCycle;
use crate::error::DuesError;
use crate::members::MembershipType;
use crate::records::{MemberDuesRecord, PaymentMethod};
use crate::roles::{Actor, DuesPermissions};
use crate::storage::DuesStore;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, instrument};

/// Request to approve an offline dues payment.
#[derive(Debug, Clone, Deserialize)]
pub struct ApproveOfflineRequest {
    /// The member who paid.
    pub member_id: String,
    /// The cycle being paid.
    pub cycle_id: String,
    /// Membership type, used when the record is created here.
    pub membership_type: MembershipType,
    /// Amount received, in minor currency units.
    pub amount: i64,
    /// How the payment was made.
    pub payment_method: PaymentMethod,
    /// Date the payment was made.
    pub payment_date: NaiveDate,
    /// Free-form approver notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Offline approval operations.
pub struct ApprovalManager<S: DuesStore, A: DuesAuditLogger = TracingAuditLogger> {
    store: S,
    audit: A,
}

impl<S: DuesStore> ApprovalManager<S> {
    /// Create a new approval manager.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            audit: TracingAuditLogger,
        }
    }
}

impl<S: DuesStore, A: DuesAuditLogger> ApprovalManager<S, A> {
    /// Create an approval manager with a custom audit logger.
    #[must_use]
    pub fn with_audit(store: S, audit: A) -> Self {
        Self { store, audit }
    }

    /// Mark a member's dues paid offline, stamping the audit fields.
    ///
    /// Creates the record if the member has none for the cycle.
    /// Requires dues management capability.
    #[instrument(skip(self, request), fields(member_id = %request.member_id, cycle_id = %request.cycle_id))]
    pub async fn approve_offline(
        &self,
        actor: &Actor,
        request: ApproveOfflineRequest,
    ) -> Result<MemberDuesRecord, DuesError> {
        if !actor.role.can_manage_dues() {
            return Err(DuesError::insufficient_permission("can_manage_dues"));
        }
        if request.amount < 0 {
            return Err(DuesError::validation("amount", "must not be negative"));
        }
        if request.payment_method == PaymentMethod::Stripe {
            return Err(DuesError::validation(
                "payment_method",
                "checkout payments are confirmed by the processor, not approved manually",
            ));
        }

        let cycle = self.cycle(&request.cycle_id).await?;
        let record = self
            .transition(
                &request.member_id,
                &cycle,
                request.membership_type,
                |record| {
                    record.record_offline_payment(
                        request.amount,
                        request.payment_method,
                        request.payment_date,
                        &actor.member_id,
                        request.notes.clone(),
                    );
                },
            )
            .await?;

        self.audit
            .log(DuesAuditEvent::OfflineApproved {
                member_id: record.member_id.clone(),
                cycle_id: record.cycle_id.clone(),
                approved_by: actor.member_id.clone(),
                amount: record.amount,
                method: request.payment_method.to_string(),
            })
            .await;
        info!(actor_id = %actor.member_id, "Offline payment approved");

        Ok(record)
    }

    /// Waive a member's dues for a cycle; a waived member owes nothing.
    ///
    /// Creates the record if absent. Requires dues management capability.
    #[instrument(skip(self))]
    pub async fn waive(
        &self,
        actor: &Actor,
        member_id: &str,
        cycle_id: &str,
        membership_type: MembershipType,
    ) -> Result<MemberDuesRecord, DuesError> {
        if !actor.role.can_manage_dues() {
            return Err(DuesError::insufficient_permission("can_manage_dues"));
        }

        let cycle = self.cycle(cycle_id).await?;
        let record = self
            .transition(member_id, &cycle, membership_type, |record| {
                record.record_waiver(&actor.member_id);
            })
            .await?;

        self.audit
            .log(DuesAuditEvent::Waived {
                member_id: record.member_id.clone(),
                cycle_id: record.cycle_id.clone(),
                approved_by: actor.member_id.clone(),
            })
            .await;
        info!(member_id, cycle_id, actor_id = %actor.member_id, "Dues waived");

        Ok(record)
    }

    /// Reset a record to `UNPAID`, restoring the cycle price for the
    /// member's type and clearing the payment stamps. The prior
    /// transition stays visible in the audit log.
    ///
    /// Requires dues management capability; unknown record id yields a
    /// not-found error.
    #[instrument(skip(self))]
    pub async fn mark_unpaid(
        &self,
        actor: &Actor,
        record_id: &str,
    ) -> Result<MemberDuesRecord, DuesError> {
        if !actor.role.can_manage_dues() {
            return Err(DuesError::insufficient_permission("can_manage_dues"));
        }

        let mut record = self
            .store
            .get_record_by_id(record_id)
            .await?
            .ok_or_else(|| DuesError::record_not_found(record_id))?;
        let cycle = self.cycle(&record.cycle_id).await?;
        let previous_status = record.status.to_string();

        let expected = record.version;
        record.reset_to_unpaid(cycle.amount_for(record.membership_type));
        if !self
            .store
            .compare_and_update_record(&record, expected)
            .await?
        {
            return Err(DuesError::ConcurrentModification {
                member_id: record.member_id.clone(),
            });
        }
        record.version = expected + 1;

        self.audit
            .log(DuesAuditEvent::ResetToUnpaid {
                member_id: record.member_id.clone(),
                cycle_id: record.cycle_id.clone(),
                reset_by: actor.member_id.clone(),
                previous_status,
            })
            .await;
        info!(record_id, actor_id = %actor.member_id, "Record reset to unpaid");

        Ok(record)
    }

    async fn cycle(&self, cycle_id: &str) -> Result<DuesCycle, DuesError> {
        self.store
            .get_cycle(cycle_id)
            .await?
            .ok_or_else(|| DuesError::cycle_not_found(cycle_id))
    }

    /// Get-or-create the record, apply the transition, write through
    /// the version check.
    async fn transition<F>(
        &self,
        member_id: &str,
        cycle: &DuesCycle,
        membership_type: MembershipType,
        apply: F,
    ) -> Result<MemberDuesRecord, DuesError>
    where
        F: FnOnce(&mut MemberDuesRecord),
    {
        let mut record = match self.store.get_record(member_id, &cycle.id).await? {
            Some(record) => record,
            None => {
                let record = MemberDuesRecord::new_unpaid(
                    member_id,
                    &cycle.id,
                    membership_type,
                    cycle.amount_for(membership_type),
                );
                self.store.insert_record(&record).await?;
                record
            }
        };

        let expected = record.version;
        apply(&mut record);
        if !self
            .store
            .compare_and_update_record(&record, expected)
            .await?
        {
            return Err(DuesError::ConcurrentModification {
                member_id: member_id.to_string(),
            });
        }
        record.version = expected + 1;
        Ok(record)
    }
}
