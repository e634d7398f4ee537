//! Dues cycles.
//!
//! A cycle is a named membership-fee period ("2025-2026") with per-type
//! pricing and a grace period. At most one cycle is active at a time;
//! activation goes through a single store operation that deactivates
//! every other cycle, so the invariant holds no matter which client
//! performs the switch.

use crate::error::DuesError;
use crate::members::MembershipType;
use crate::roles::{Actor, DuesPermissions};
use crate::storage::DuesStore;
use crate::utils::current_timestamp;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// A named dues period with its own pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuesCycle {
    /// Unique cycle ID.
    pub id: String,
    /// Display name, e.g. "2025-2026".
    pub name: String,
    /// First day of the cycle.
    pub start_date: NaiveDate,
    /// Last day of the cycle.
    pub end_date: NaiveDate,
    /// Professional dues, in minor currency units.
    pub amount_professional: i64,
    /// Student dues, in minor currency units.
    pub amount_student: i64,
    /// Days after `end_date` before a member is considered delinquent.
    pub grace_period_days: u32,
    /// Whether this is the club's current cycle.
    pub is_active: bool,
    /// Created timestamp (Unix seconds).
    pub created_at: u64,
    /// Updated timestamp (Unix seconds).
    pub updated_at: u64,
}

impl DuesCycle {
    /// Get the dues amount for a membership type.
    #[must_use]
    pub fn amount_for(&self, membership_type: MembershipType) -> i64 {
        match membership_type {
            MembershipType::Professional => self.amount_professional,
            MembershipType::Student => self.amount_student,
        }
    }

    /// Last day of the grace period.
    #[must_use]
    pub fn grace_ends_on(&self) -> NaiveDate {
        self.end_date
            .checked_add_days(Days::new(u64::from(self.grace_period_days)))
            .unwrap_or(self.end_date)
    }

    /// Check if a member is delinquent as of `today` (cycle and grace
    /// period both over).
    #[must_use]
    pub fn is_past_grace(&self, today: NaiveDate) -> bool {
        today > self.grace_ends_on()
    }
}

/// Request to create a dues cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCycleRequest {
    /// Display name, e.g. "2025-2026".
    pub name: String,
    /// First day of the cycle.
    pub start_date: NaiveDate,
    /// Last day of the cycle.
    pub end_date: NaiveDate,
    /// Professional dues, in minor currency units.
    pub amount_professional: i64,
    /// Student dues, in minor currency units.
    pub amount_student: i64,
    /// Days of grace after the end date.
    #[serde(default)]
    pub grace_period_days: u32,
    /// Activate the new cycle immediately.
    #[serde(default)]
    pub is_active: bool,
}

/// Partial update to a dues cycle; unset fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCycleRequest {
    /// New display name.
    pub name: Option<String>,
    /// New first day.
    pub start_date: Option<NaiveDate>,
    /// New last day.
    pub end_date: Option<NaiveDate>,
    /// New professional amount.
    pub amount_professional: Option<i64>,
    /// New student amount.
    pub amount_student: Option<i64>,
    /// New grace period.
    pub grace_period_days: Option<u32>,
    /// Activate (`true`) or deactivate (`false`) the cycle.
    pub is_active: Option<bool>,
}

/// Cycle management with permission checks.
///
/// # Example
///
/// ```rust,ignore
/// use clubdues::cycles::{CycleManager, CreateCycleRequest};
///
/// let cycles = CycleManager::new(store);
/// let cycle = cycles.create_cycle(&treasurer, CreateCycleRequest {
///     name: "2025-2026".to_string(),
///     start_date: "2025-07-01".parse()?,
///     end_date: "2026-06-30".parse()?,
///     amount_professional: 8500,
///     amount_student: 6500,
///     grace_period_days: 30,
///     is_active: true,
/// }).await?;
/// ```
pub struct CycleManager<S: DuesStore> {
    store: S,
}

impl<S: DuesStore> CycleManager<S> {
    /// Create a new cycle manager.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// List all cycles. Requires cycle management capability.
    pub async fn list_cycles(&self, actor: &Actor) -> Result<Vec<DuesCycle>, DuesError> {
        if !actor.role.can_manage_cycles() {
            return Err(DuesError::insufficient_permission("can_manage_cycles"));
        }
        Ok(self.store.list_cycles().await?)
    }

    /// Get the single active cycle, if any.
    pub async fn get_active_cycle(&self) -> Result<Option<DuesCycle>, DuesError> {
        Ok(self.store.get_active_cycle().await?)
    }

    /// Create a new cycle. Requires cycle management capability.
    ///
    /// If the request asks for an active cycle, every other cycle is
    /// deactivated as part of the activation.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_cycle(
        &self,
        actor: &Actor,
        request: CreateCycleRequest,
    ) -> Result<DuesCycle, DuesError> {
        if !actor.role.can_manage_cycles() {
            return Err(DuesError::insufficient_permission("can_manage_cycles"));
        }
        validate_cycle_fields(
            &request.name,
            request.start_date,
            request.end_date,
            request.amount_professional,
            request.amount_student,
        )?;

        let now = current_timestamp();
        let cycle = DuesCycle {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name,
            start_date: request.start_date,
            end_date: request.end_date,
            amount_professional: request.amount_professional,
            amount_student: request.amount_student,
            grace_period_days: request.grace_period_days,
            is_active: false,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_cycle(&cycle).await?;

        info!(cycle_id = %cycle.id, actor_id = %actor.member_id, "Dues cycle created");

        if request.is_active {
            return self.activate_cycle(actor, &cycle.id).await;
        }
        Ok(cycle)
    }

    /// Merge a partial update into a cycle. Requires cycle management
    /// capability; unknown id yields a not-found error.
    #[instrument(skip(self, request))]
    pub async fn update_cycle(
        &self,
        actor: &Actor,
        cycle_id: &str,
        request: UpdateCycleRequest,
    ) -> Result<DuesCycle, DuesError> {
        if !actor.role.can_manage_cycles() {
            return Err(DuesError::insufficient_permission("can_manage_cycles"));
        }

        let mut cycle = self
            .store
            .get_cycle(cycle_id)
            .await?
            .ok_or_else(|| DuesError::cycle_not_found(cycle_id))?;

        if let Some(name) = request.name {
            cycle.name = name;
        }
        if let Some(start_date) = request.start_date {
            cycle.start_date = start_date;
        }
        if let Some(end_date) = request.end_date {
            cycle.end_date = end_date;
        }
        if let Some(amount) = request.amount_professional {
            cycle.amount_professional = amount;
        }
        if let Some(amount) = request.amount_student {
            cycle.amount_student = amount;
        }
        if let Some(days) = request.grace_period_days {
            cycle.grace_period_days = days;
        }
        if request.is_active == Some(false) {
            cycle.is_active = false;
        }
        validate_cycle_fields(
            &cycle.name,
            cycle.start_date,
            cycle.end_date,
            cycle.amount_professional,
            cycle.amount_student,
        )?;
        cycle.updated_at = current_timestamp();
        self.store.update_cycle(&cycle).await?;

        info!(cycle_id, actor_id = %actor.member_id, "Dues cycle updated");

        // Activation last, so the merged fields land before the switch.
        if request.is_active == Some(true) {
            return self.activate_cycle(actor, cycle_id).await;
        }
        Ok(cycle)
    }

    /// Make a cycle the club's current one, deactivating all others.
    #[instrument(skip(self))]
    pub async fn activate_cycle(
        &self,
        actor: &Actor,
        cycle_id: &str,
    ) -> Result<DuesCycle, DuesError> {
        if !actor.role.can_manage_cycles() {
            return Err(DuesError::insufficient_permission("can_manage_cycles"));
        }
        self.store.set_active_cycle(cycle_id).await?;

        info!(cycle_id, actor_id = %actor.member_id, "Dues cycle activated");

        self.store
            .get_cycle(cycle_id)
            .await?
            .ok_or_else(|| DuesError::cycle_not_found(cycle_id))
    }
}

fn validate_cycle_fields(
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    amount_professional: i64,
    amount_student: i64,
) -> Result<(), DuesError> {
    if name.trim().is_empty() {
        return Err(DuesError::validation("name", "must not be empty"));
    }
    if end_date < start_date {
        return Err(DuesError::validation(
            "end_date",
            "must not be before start_date",
        ));
    }
    if amount_professional < 0 || amount_student < 0 {
        return Err(DuesError::validation("amount", "must not be negative"));
    }
    Ok(())
}
