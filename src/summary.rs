//! Manage view and dues statistics.
//!
//! Read-only projection across the whole roster for the active cycle:
//! every record enriched with member details, the members who have no
//! record yet (read as `UNPAID`), and aggregate counts. Performs no
//! writes.

use crate::cycles::DuesCycle;
use crate::error::DuesError;
use crate::members::{MemberDirectory, MemberProfile};
use crate::records::{DuesStatus, MemberDuesRecord};
use crate::roles::{Actor, DuesPermissions};
use crate::storage::DuesStore;
use serde::Serialize;
use std::collections::HashMap;

/// A dues record enriched with member details.
#[derive(Debug, Clone, Serialize)]
pub struct MemberDuesEntry {
    /// The record itself.
    #[serde(flatten)]
    pub record: MemberDuesRecord,
    /// Member display name, if the member is still in the roster.
    pub member_name: Option<String>,
    /// Member email, if the member is still in the roster.
    pub member_email: Option<String>,
}

/// Aggregate dues counts for one cycle.
///
/// `paid + unpaid + waived` always equals `total_members`; members
/// without a record count as unpaid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuesStats {
    /// Size of the roster.
    pub total_members: usize,
    /// Members with status `PAID` or `PAID_OFFLINE`.
    pub paid: usize,
    /// Members unpaid, including those with no record.
    pub unpaid: usize,
    /// Members with status `WAIVED`.
    pub waived: usize,
    /// Sum of amounts across paid records, in minor currency units.
    pub collected: i64,
}

/// Full manage view for the active cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ManageView {
    /// The active cycle.
    pub cycle: DuesCycle,
    /// Every dues record under the cycle, enriched with member details.
    pub all_dues: Vec<MemberDuesEntry>,
    /// Roster members with no record yet.
    pub members_without_dues: Vec<MemberProfile>,
    /// Aggregate counts.
    pub stats: DuesStats,
}

/// Read-only dues reporting.
pub struct SummaryManager<S: DuesStore, M: MemberDirectory> {
    store: S,
    directory: M,
}

impl<S: DuesStore, M: MemberDirectory> SummaryManager<S, M> {
    /// Create a new summary manager.
    #[must_use]
    pub fn new(store: S, directory: M) -> Self {
        Self { store, directory }
    }

    /// Build the manage view for the active cycle.
    ///
    /// Requires report viewing capability; fails with a validation
    /// error when no cycle is active. Best-effort point-in-time read,
    /// not a snapshot isolated from concurrent writes.
    pub async fn manage_view(&self, actor: &Actor) -> Result<ManageView, DuesError> {
        if !actor.role.can_view_dues_reports() {
            return Err(DuesError::insufficient_permission("can_view_dues_reports"));
        }

        let cycle = self
            .store
            .get_active_cycle()
            .await?
            .ok_or(DuesError::NoActiveCycle)?;

        let members = self.directory.list_members().await?;
        let records = self.store.list_records_for_cycle(&cycle.id).await?;

        let roster: HashMap<&str, &MemberProfile> =
            members.iter().map(|m| (m.id.as_str(), m)).collect();

        let mut stats = DuesStats {
            total_members: members.len(),
            ..DuesStats::default()
        };
        let mut members_with_record = HashMap::new();

        let all_dues: Vec<MemberDuesEntry> = records
            .into_iter()
            .map(|record| {
                members_with_record.insert(record.member_id.clone(), record.status);
                let member = roster.get(record.member_id.as_str());
                MemberDuesEntry {
                    member_name: member.map(|m| m.name.clone()),
                    member_email: member.map(|m| m.email.clone()),
                    record,
                }
            })
            .collect();

        let members_without_dues: Vec<MemberProfile> = members
            .iter()
            .filter(|m| !members_with_record.contains_key(&m.id))
            .cloned()
            .collect();

        // Counts cover the roster, not records orphaned by departed
        // members.
        for member in &members {
            match members_with_record.get(&member.id) {
                Some(status) if status.is_paid() => stats.paid += 1,
                Some(DuesStatus::Waived) => stats.waived += 1,
                Some(_) | None => stats.unpaid += 1,
            }
        }
        stats.collected = all_dues
            .iter()
            .filter(|entry| entry.record.status.is_paid())
            .map(|entry| entry.record.amount)
            .sum();

        Ok(ManageView {
            cycle,
            all_dues,
            members_without_dues,
            stats,
        })
    }
}
