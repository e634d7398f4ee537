//! Audit logging for dues transitions.
//!
//! Every record transition emits an audit event. This is the durable
//! history of who did what: the record itself only holds the current
//! approval stamps, and a reset clears them.

use async_trait::async_trait;
use std::fmt;

/// Audit event types for dues operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuesAuditEvent {
    /// Checkout session created for a member.
    CheckoutCreated {
        member_id: String,
        cycle_id: String,
        session_id: String,
    },
    /// Checkout payment confirmed by the processor.
    PaymentConfirmed {
        member_id: String,
        cycle_id: String,
        amount: i64,
    },
    /// Offline payment approved.
    OfflineApproved {
        member_id: String,
        cycle_id: String,
        approved_by: String,
        amount: i64,
        method: String,
    },
    /// Dues waived for a member.
    Waived {
        member_id: String,
        cycle_id: String,
        approved_by: String,
    },
    /// Record reset to unpaid.
    ResetToUnpaid {
        member_id: String,
        cycle_id: String,
        reset_by: String,
        previous_status: String,
    },
}

impl fmt::Display for DuesAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckoutCreated { member_id, cycle_id, session_id } => {
                write!(f, "Checkout created: member={}, cycle={}, session={}", member_id, cycle_id, session_id)
            }
            Self::PaymentConfirmed { member_id, cycle_id, amount } => {
                write!(f, "Payment confirmed: member={}, cycle={}, amount={}", member_id, cycle_id, amount)
            }
            Self::OfflineApproved { member_id, cycle_id, approved_by, amount, method } => {
                write!(
                    f,
                    "Offline payment approved: member={}, cycle={}, by={}, amount={}, method={}",
                    member_id, cycle_id, approved_by, amount, method
                )
            }
            Self::Waived { member_id, cycle_id, approved_by } => {
                write!(f, "Dues waived: member={}, cycle={}, by={}", member_id, cycle_id, approved_by)
            }
            Self::ResetToUnpaid { member_id, cycle_id, reset_by, previous_status } => {
                write!(
                    f,
                    "Reset to unpaid: member={}, cycle={}, by={}, was={}",
                    member_id, cycle_id, reset_by, previous_status
                )
            }
        }
    }
}

/// Get the event kind as a string for structured logging.
fn event_kind(event: &DuesAuditEvent) -> &'static str {
    match event {
        DuesAuditEvent::CheckoutCreated { .. } => "checkout_created",
        DuesAuditEvent::PaymentConfirmed { .. } => "payment_confirmed",
        DuesAuditEvent::OfflineApproved { .. } => "offline_approved",
        DuesAuditEvent::Waived { .. } => "waived",
        DuesAuditEvent::ResetToUnpaid { .. } => "reset_to_unpaid",
    }
}

/// Trait for audit logging backends.
///
/// Implementations should handle failures gracefully so audit logging
/// never disrupts the dues operation itself.
#[async_trait]
pub trait DuesAuditLogger: Send + Sync {
    /// Log a dues audit event.
    async fn log(&self, event: DuesAuditEvent);
}

/// No-op audit logger that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

#[async_trait]
impl DuesAuditLogger for NoOpAuditLogger {
    async fn log(&self, _event: DuesAuditEvent) {
        // No-op
    }
}

/// Tracing-based audit logger.
///
/// Logs audit events using the `tracing` crate at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl DuesAuditLogger for TracingAuditLogger {
    async fn log(&self, event: DuesAuditEvent) {
        tracing::info!(
            target: "clubdues::audit",
            event_type = %event_kind(&event),
            "{}", event
        );
    }
}
