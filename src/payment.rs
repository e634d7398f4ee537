//! Member-facing dues payment.
//!
//! Resolves a member's status against the active cycle and initiates
//! hosted checkout. Settlement arrives asynchronously: the processor's
//! confirmation event lands in [`PaymentManager::confirm_payment`],
//! which transitions the record to `PAID`. When no checkout client is
//! configured the payment is recorded directly, which keeps small
//! clubs working without a processor account.

use crate::audit::{DuesAuditEvent, DuesAuditLogger, TracingAuditLogger};
use crate::checkout::{CheckoutClient, CheckoutConfig, CreateDuesCheckoutRequest};
use crate::cycles::DuesCycle;
use crate::error::DuesError;
use crate::members::MembershipType;
use crate::records::{DuesStatus, MemberDuesRecord, PaymentMethod};
use crate::roles::Actor;
use crate::storage::DuesStore;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument};

/// Cycle fields surfaced to members alongside their status.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    /// Cycle ID.
    pub id: String,
    /// Display name, e.g. "2025-2026".
    pub name: String,
    /// Professional dues, in minor currency units.
    pub amount_professional: i64,
    /// Student dues, in minor currency units.
    pub amount_student: i64,
    /// Last day of the cycle.
    pub end_date: NaiveDate,
    /// Days of grace after the end date.
    pub grace_period_days: u32,
}

impl From<&DuesCycle> for CycleSummary {
    fn from(cycle: &DuesCycle) -> Self {
        Self {
            id: cycle.id.clone(),
            name: cycle.name.clone(),
            amount_professional: cycle.amount_professional,
            amount_student: cycle.amount_student,
            end_date: cycle.end_date,
            grace_period_days: cycle.grace_period_days,
        }
    }
}

/// A member's own dues position for the active cycle.
#[derive(Debug, Clone, Serialize)]
pub struct MyDuesView {
    /// Current status and stamps.
    pub dues: DuesSnapshot,
    /// The active cycle, if one exists.
    pub cycle: Option<CycleSummary>,
}

/// The status slice of a dues record.
///
/// A member with no record under the active cycle reads as `UNPAID`
/// owing the cycle price for their membership type.
#[derive(Debug, Clone, Serialize)]
pub struct DuesSnapshot {
    /// Current status.
    pub status: DuesStatus,
    /// Amount owed or paid, in minor currency units.
    pub amount: i64,
    /// Date payment was made, if any.
    pub paid_on: Option<NaiveDate>,
    /// How payment was made, if any.
    pub payment_method: Option<PaymentMethod>,
}

impl DuesSnapshot {
    fn from_record(record: &MemberDuesRecord) -> Self {
        Self {
            status: record.status,
            amount: record.amount,
            paid_on: record.paid_on,
            payment_method: record.payment_method,
        }
    }

    fn unpaid(amount: i64) -> Self {
        Self {
            status: DuesStatus::Unpaid,
            amount,
            paid_on: None,
            payment_method: None,
        }
    }
}

/// Result of initiating a dues payment.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PaymentOutcome {
    /// Redirect the member to the hosted checkout page.
    Redirect {
        /// Checkout page URL.
        url: String,
    },
    /// No processor configured; payment was recorded directly.
    Recorded(MemberDuesRecord),
}

/// Member payment operations.
pub struct PaymentManager<S: DuesStore, C: CheckoutClient, A: DuesAuditLogger = TracingAuditLogger> {
    store: S,
    client: Option<C>,
    config: CheckoutConfig,
    audit: A,
}

impl<S: DuesStore, C: CheckoutClient> PaymentManager<S, C> {
    /// Create a new payment manager.
    ///
    /// Pass `None` for the client to record payments directly instead
    /// of redirecting to hosted checkout.
    #[must_use]
    pub fn new(store: S, client: Option<C>, config: CheckoutConfig) -> Self {
        Self {
            store,
            client,
            config,
            audit: TracingAuditLogger,
        }
    }
}

impl<S: DuesStore, C: CheckoutClient, A: DuesAuditLogger> PaymentManager<S, C, A> {
    /// Create a payment manager with a custom audit logger.
    #[must_use]
    pub fn with_audit(store: S, client: Option<C>, config: CheckoutConfig, audit: A) -> Self {
        Self {
            store,
            client,
            config,
            audit,
        }
    }

    /// Resolve the caller's dues position for the active cycle.
    ///
    /// Records under deactivated cycles are never surfaced here. With
    /// no active cycle the view carries no cycle and nothing owed.
    pub async fn my_dues_status(
        &self,
        actor: &Actor,
        membership_type: MembershipType,
    ) -> Result<MyDuesView, DuesError> {
        let Some(cycle) = self.store.get_active_cycle().await? else {
            return Ok(MyDuesView {
                dues: DuesSnapshot::unpaid(0),
                cycle: None,
            });
        };

        let dues = match self.store.get_record(&actor.member_id, &cycle.id).await? {
            Some(record) => DuesSnapshot::from_record(&record),
            None => DuesSnapshot::unpaid(cycle.amount_for(membership_type)),
        };

        Ok(MyDuesView {
            dues,
            cycle: Some(CycleSummary::from(&cycle)),
        })
    }

    /// Start a dues payment for the caller.
    ///
    /// Requires an active cycle. With a checkout client configured this
    /// returns a redirect URL and leaves the record untouched until the
    /// processor confirms; without one the record transitions to `PAID`
    /// immediately.
    #[instrument(skip(self, actor), fields(member_id = %actor.member_id))]
    pub async fn initiate_payment(
        &self,
        actor: &Actor,
        membership_type: MembershipType,
    ) -> Result<PaymentOutcome, DuesError> {
        let cycle = self
            .store
            .get_active_cycle()
            .await?
            .ok_or(DuesError::NoActiveCycle)?;
        let amount = cycle.amount_for(membership_type);

        if let Some(record) = self.store.get_record(&actor.member_id, &cycle.id).await? {
            if record.status != DuesStatus::Unpaid {
                return Err(DuesError::validation(
                    "status",
                    format!("dues already settled as {}", record.status),
                ));
            }
        }

        let Some(client) = &self.client else {
            let record = self
                .settle_checkout_payment(&actor.member_id, &cycle, membership_type)
                .await?;
            info!(cycle_id = %cycle.id, amount, "Dues recorded without processor");
            return Ok(PaymentOutcome::Recorded(record));
        };

        // The redirect URLs are operator configuration, so a bad one is
        // a checkout misconfiguration, not a caller error.
        for url in [&self.config.success_url, &self.config.cancel_url] {
            self.config
                .validate_redirect_url(url)
                .map_err(|err| DuesError::Checkout {
                    operation: "validate_redirect_urls".to_string(),
                    message: err.to_string(),
                })?;
        }

        let session = client
            .create_checkout_session(CreateDuesCheckoutRequest {
                member_id: actor.member_id.clone(),
                cycle_id: cycle.id.clone(),
                amount,
                description: format!("{} dues ({})", cycle.name, membership_type),
                success_url: self.config.success_url.clone(),
                cancel_url: self.config.cancel_url.clone(),
            })
            .await?;

        self.audit
            .log(DuesAuditEvent::CheckoutCreated {
                member_id: actor.member_id.clone(),
                cycle_id: cycle.id.clone(),
                session_id: session.id.clone(),
            })
            .await;
        info!(cycle_id = %cycle.id, session_id = %session.id, "Checkout session created");

        Ok(PaymentOutcome::Redirect { url: session.url })
    }

    /// Apply a confirmed payment event from the processor.
    ///
    /// Idempotent on `event_id`: a redelivered event returns `None`
    /// without touching the record.
    #[instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        event_id: &str,
        member_id: &str,
        cycle_id: &str,
        membership_type: MembershipType,
    ) -> Result<Option<MemberDuesRecord>, DuesError> {
        if self.store.is_event_processed(event_id).await? {
            info!(event_id, "Duplicate payment confirmation skipped");
            return Ok(None);
        }

        let cycle = self
            .store
            .get_cycle(cycle_id)
            .await?
            .ok_or_else(|| DuesError::cycle_not_found(cycle_id))?;

        let record = self
            .settle_checkout_payment(member_id, &cycle, membership_type)
            .await?;
        self.store.mark_event_processed(event_id).await?;

        info!(member_id, cycle_id, event_id, "Dues payment confirmed");

        Ok(Some(record))
    }

    /// Get-or-create the record and transition it to `PAID`.
    ///
    /// Only an `UNPAID` record may settle here; a record already waived
    /// or approved offline is left untouched and the event stays
    /// unprocessed for the operator to reconcile.
    async fn settle_checkout_payment(
        &self,
        member_id: &str,
        cycle: &DuesCycle,
        membership_type: MembershipType,
    ) -> Result<MemberDuesRecord, DuesError> {
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

        if record.status != DuesStatus::Unpaid {
            return Err(DuesError::validation(
                "status",
                format!("dues already settled as {}", record.status),
            ));
        }

        let expected = record.version;
        record.record_checkout_payment(Utc::now().date_naive());
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

        self.audit
            .log(DuesAuditEvent::PaymentConfirmed {
                member_id: member_id.to_string(),
                cycle_id: cycle.id.clone(),
                amount: record.amount,
            })
            .await;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalManager;
    use crate::audit::test::CapturingAuditLogger;
    use crate::checkout::test::MockCheckoutClient;
    use crate::cycles::{CreateCycleRequest, CycleManager};
    use crate::roles::ClubRole;
    use crate::storage::memory::InMemoryDuesStore;

    fn member(id: &str) -> Actor {
        Actor::new(id, ClubRole::Member)
    }

    async fn seed_active_cycle(store: &InMemoryDuesStore) -> DuesCycle {
        let cycles = CycleManager::new(store.clone());
        cycles
            .create_cycle(
                &Actor::new("treasurer_1", ClubRole::Treasurer),
                CreateCycleRequest {
                    name: "2025-2026".to_string(),
                    start_date: "2025-07-01".parse().unwrap(),
                    end_date: "2026-06-30".parse().unwrap(),
                    amount_professional: 8500,
                    amount_student: 6500,
                    grace_period_days: 30,
                    is_active: true,
                },
            )
            .await
            .unwrap()
    }

    fn manager(store: InMemoryDuesStore, client: Option<MockCheckoutClient>) -> PaymentManager<InMemoryDuesStore, MockCheckoutClient> {
        PaymentManager::new(store, client, CheckoutConfig::default())
    }

    #[tokio::test]
    async fn test_status_without_record_reads_unpaid_at_cycle_price() {
        let store = InMemoryDuesStore::new();
        seed_active_cycle(&store).await;
        let payments = manager(store, None);

        let view = payments
            .my_dues_status(&member("mem_1"), MembershipType::Professional)
            .await
            .unwrap();
        assert_eq!(view.dues.status, DuesStatus::Unpaid);
        assert_eq!(view.dues.amount, 8500);
        assert_eq!(view.cycle.as_ref().unwrap().name, "2025-2026");

        let view = payments
            .my_dues_status(&member("mem_2"), MembershipType::Student)
            .await
            .unwrap();
        assert_eq!(view.dues.amount, 6500);
    }

    #[tokio::test]
    async fn test_status_without_active_cycle() {
        let store = InMemoryDuesStore::new();
        let payments = manager(store, None);

        let view = payments
            .my_dues_status(&member("mem_1"), MembershipType::Professional)
            .await
            .unwrap();
        assert!(view.cycle.is_none());
        assert_eq!(view.dues.status, DuesStatus::Unpaid);
        assert_eq!(view.dues.amount, 0);
    }

    #[tokio::test]
    async fn test_initiate_without_active_cycle_fails() {
        let store = InMemoryDuesStore::new();
        let payments = manager(store, Some(MockCheckoutClient::new()));

        let err = payments
            .initiate_payment(&member("mem_1"), MembershipType::Professional)
            .await
            .unwrap_err();
        assert!(matches!(err, DuesError::NoActiveCycle));
    }

    #[tokio::test]
    async fn test_initiate_redirects_to_checkout() {
        let store = InMemoryDuesStore::new();
        let cycle = seed_active_cycle(&store).await;
        let payments = PaymentManager::new(
            store.clone(),
            Some(MockCheckoutClient::new()),
            CheckoutConfig::new()
                .success_url("https://club.example.com/dues/success")
                .cancel_url("https://club.example.com/dues"),
        );

        let outcome = payments
            .initiate_payment(&member("mem_1"), MembershipType::Professional)
            .await
            .unwrap();
        let PaymentOutcome::Redirect { url } = outcome else {
            panic!("expected redirect");
        };
        assert!(url.contains("checkout.example.com"));

        // Record is only written once the processor confirms
        assert!(store.get_record("mem_1", &cycle.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_initiate_without_processor_records_directly() {
        let store = InMemoryDuesStore::new();
        let cycle = seed_active_cycle(&store).await;
        let payments = manager(store.clone(), None);

        let outcome = payments
            .initiate_payment(&member("mem_1"), MembershipType::Student)
            .await
            .unwrap();
        let PaymentOutcome::Recorded(record) = outcome else {
            panic!("expected direct record");
        };
        assert_eq!(record.status, DuesStatus::Paid);
        assert_eq!(record.amount, 6500);
        assert_eq!(record.payment_method, Some(PaymentMethod::Stripe));

        let stored = store.get_record("mem_1", &cycle.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DuesStatus::Paid);
    }

    #[tokio::test]
    async fn test_initiate_rejects_settled_record() {
        let store = InMemoryDuesStore::new();
        seed_active_cycle(&store).await;
        let payments = manager(store, None);
        let actor = member("mem_1");

        payments
            .initiate_payment(&actor, MembershipType::Professional)
            .await
            .unwrap();
        let err = payments
            .initiate_payment(&actor, MembershipType::Professional)
            .await
            .unwrap_err();
        assert!(matches!(err, DuesError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_confirm_payment_is_idempotent() {
        let store = InMemoryDuesStore::new();
        let cycle = seed_active_cycle(&store).await;
        let audit = CapturingAuditLogger::new();
        let payments: PaymentManager<_, MockCheckoutClient, _> = PaymentManager::with_audit(
            store.clone(),
            None,
            CheckoutConfig::default(),
            audit.clone(),
        );

        let first = payments
            .confirm_payment("evt_1", "mem_1", &cycle.id, MembershipType::Professional)
            .await
            .unwrap();
        assert_eq!(first.unwrap().status, DuesStatus::Paid);

        let second = payments
            .confirm_payment("evt_1", "mem_1", &cycle.id, MembershipType::Professional)
            .await
            .unwrap();
        assert!(second.is_none());

        let events = audit.events().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DuesAuditEvent::PaymentConfirmed { amount: 8500, .. }));
    }

    #[tokio::test]
    async fn test_checkout_failure_leaves_no_record() {
        let store = InMemoryDuesStore::new();
        let cycle = seed_active_cycle(&store).await;
        let client = MockCheckoutClient::new();
        client.fail_next();
        let payments = PaymentManager::new(
            store.clone(),
            Some(client),
            CheckoutConfig::new()
                .success_url("https://club.example.com/dues/success")
                .cancel_url("https://club.example.com/dues"),
        );

        let err = payments
            .initiate_payment(&member("mem_1"), MembershipType::Professional)
            .await
            .unwrap_err();
        assert!(matches!(err, DuesError::Checkout { .. }));
        assert!(store.get_record("mem_1", &cycle.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_misconfigured_redirect_urls_are_a_checkout_error() {
        let store = InMemoryDuesStore::new();
        seed_active_cycle(&store).await;
        // Client configured, redirect URLs left empty
        let payments = manager(store, Some(MockCheckoutClient::new()));

        let err = payments
            .initiate_payment(&member("mem_1"), MembershipType::Professional)
            .await
            .unwrap_err();
        assert!(matches!(err, DuesError::Checkout { .. }));
    }

    #[tokio::test]
    async fn test_confirm_after_waiver_is_rejected() {
        let store = InMemoryDuesStore::new();
        let cycle = seed_active_cycle(&store).await;
        let approvals = ApprovalManager::new(store.clone());
        approvals
            .waive(
                &Actor::new("treasurer_1", ClubRole::Treasurer),
                "mem_1",
                &cycle.id,
                MembershipType::Professional,
            )
            .await
            .unwrap();

        let payments = manager(store.clone(), None);
        let err = payments
            .confirm_payment("evt_1", "mem_1", &cycle.id, MembershipType::Professional)
            .await
            .unwrap_err();
        assert!(matches!(err, DuesError::Validation { .. }));

        // The waiver stands and the event stays unprocessed
        let record = store.get_record("mem_1", &cycle.id).await.unwrap().unwrap();
        assert_eq!(record.status, DuesStatus::Waived);
        assert_eq!(record.amount, 0);
        assert!(!store.is_event_processed("evt_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_confirm_payment_unknown_cycle() {
        let store = InMemoryDuesStore::new();
        let payments = manager(store, None);

        let err = payments
            .confirm_payment("evt_1", "mem_1", "cyc_missing", MembershipType::Professional)
            .await
            .unwrap_err();
        assert!(matches!(err, DuesError::CycleNotFound { .. }));
    }
}
