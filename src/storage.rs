//! Storage trait for dues data.
//!
//! Implement this trait to persist dues state to your database. An
//! in-memory implementation is provided as the reference and for
//! testing. Consistency is the backend's job; the only contracts the
//! trait adds are the atomic active-cycle switch and the versioned
//! record write.

use crate::cycles::DuesCycle;
use crate::error::{ApiError, Result};
use crate::records::MemberDuesRecord;
use crate::settings::PaymentSettings;
use async_trait::async_trait;

/// Trait for storing dues data.
#[async_trait]
pub trait DuesStore: Send + Sync {
    // Cycles

    /// List all dues cycles.
    async fn list_cycles(&self) -> Result<Vec<DuesCycle>>;

    /// Get a cycle by ID.
    async fn get_cycle(&self, cycle_id: &str) -> Result<Option<DuesCycle>>;

    /// Get the single active cycle, if any.
    async fn get_active_cycle(&self) -> Result<Option<DuesCycle>>;

    /// Insert a new cycle.
    async fn insert_cycle(&self, cycle: &DuesCycle) -> Result<()>;

    /// Update an existing cycle. Unknown id is a not-found error.
    async fn update_cycle(&self, cycle: &DuesCycle) -> Result<()>;

    /// Activate one cycle and deactivate every other, as a single
    /// atomic switch. Unknown id is a not-found error.
    ///
    /// Implementations MUST make the switch atomic (one transaction or
    /// one writer lock) so that readers never observe two active
    /// cycles.
    async fn set_active_cycle(&self, cycle_id: &str) -> Result<()>;

    // Dues records

    /// Get the record for a member under a cycle.
    async fn get_record(&self, member_id: &str, cycle_id: &str)
        -> Result<Option<MemberDuesRecord>>;

    /// Get a record by its own ID.
    async fn get_record_by_id(&self, record_id: &str) -> Result<Option<MemberDuesRecord>>;

    /// List all records under a cycle.
    async fn list_records_for_cycle(&self, cycle_id: &str) -> Result<Vec<MemberDuesRecord>>;

    /// Insert a new record. A record for the same `(member, cycle)`
    /// pair must not already exist.
    async fn insert_record(&self, record: &MemberDuesRecord) -> Result<()>;

    /// Update a record only if its stored version still matches
    /// `expected_version`; on success the stored version is bumped.
    ///
    /// Returns `Ok(true)` if the write landed, `Ok(false)` if another
    /// writer got there first (or the record vanished). Production
    /// implementations MUST make the compare-and-swap atomic, e.g.
    /// `UPDATE ... WHERE id = $1 AND version = $2`.
    async fn compare_and_update_record(
        &self,
        record: &MemberDuesRecord,
        expected_version: u64,
    ) -> Result<bool>;

    // Payment settings

    /// Read the singleton payment settings (defaults when unset).
    async fn get_payment_settings(&self) -> Result<PaymentSettings>;

    /// Replace the singleton payment settings.
    async fn save_payment_settings(&self, settings: &PaymentSettings) -> Result<()>;

    // Checkout confirmation idempotency

    /// Check if a processor event has already been applied.
    async fn is_event_processed(&self, event_id: &str) -> Result<bool>;

    /// Mark a processor event as applied.
    async fn mark_event_processed(&self, event_id: &str) -> Result<()>;
}

/// In-memory dues store, the reference implementation.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    /// In-memory dues store.
    ///
    /// Wraps data in `Arc` for cheap cloning; all invariants are held
    /// under per-collection writer locks.
    #[derive(Default, Clone)]
    pub struct InMemoryDuesStore {
        inner: Arc<InMemoryDuesStoreInner>,
    }

    #[derive(Default)]
    struct InMemoryDuesStoreInner {
        cycles: RwLock<Vec<DuesCycle>>,
        records: RwLock<HashMap<String, MemberDuesRecord>>,
        settings: RwLock<PaymentSettings>,
        processed_events: RwLock<HashMap<String, u64>>,
    }

    fn record_key(member_id: &str, cycle_id: &str) -> String {
        format!("{}:{}", member_id, cycle_id)
    }

    impl InMemoryDuesStore {
        /// Create a new in-memory store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl DuesStore for InMemoryDuesStore {
        async fn list_cycles(&self) -> Result<Vec<DuesCycle>> {
            Ok(self.inner.cycles.read().unwrap().clone())
        }

        async fn get_cycle(&self, cycle_id: &str) -> Result<Option<DuesCycle>> {
            Ok(self
                .inner
                .cycles
                .read()
                .unwrap()
                .iter()
                .find(|c| c.id == cycle_id)
                .cloned())
        }

        async fn get_active_cycle(&self) -> Result<Option<DuesCycle>> {
            Ok(self
                .inner
                .cycles
                .read()
                .unwrap()
                .iter()
                .find(|c| c.is_active)
                .cloned())
        }

        async fn insert_cycle(&self, cycle: &DuesCycle) -> Result<()> {
            self.inner.cycles.write().unwrap().push(cycle.clone());
            Ok(())
        }

        async fn update_cycle(&self, cycle: &DuesCycle) -> Result<()> {
            let mut cycles = self.inner.cycles.write().unwrap();
            match cycles.iter_mut().find(|c| c.id == cycle.id) {
                Some(existing) => {
                    *existing = cycle.clone();
                    Ok(())
                }
                None => Err(ApiError::not_found(format!(
                    "Dues cycle not found: {}",
                    cycle.id
                ))),
            }
        }

        async fn set_active_cycle(&self, cycle_id: &str) -> Result<()> {
            let mut cycles = self.inner.cycles.write().unwrap();
            if !cycles.iter().any(|c| c.id == cycle_id) {
                return Err(ApiError::not_found(format!(
                    "Dues cycle not found: {}",
                    cycle_id
                )));
            }
            // One writer lock covers the whole switch
            for cycle in cycles.iter_mut() {
                cycle.is_active = cycle.id == cycle_id;
            }
            Ok(())
        }

        async fn get_record(
            &self,
            member_id: &str,
            cycle_id: &str,
        ) -> Result<Option<MemberDuesRecord>> {
            Ok(self
                .inner
                .records
                .read()
                .unwrap()
                .get(&record_key(member_id, cycle_id))
                .cloned())
        }

        async fn get_record_by_id(&self, record_id: &str) -> Result<Option<MemberDuesRecord>> {
            Ok(self
                .inner
                .records
                .read()
                .unwrap()
                .values()
                .find(|r| r.id == record_id)
                .cloned())
        }

        async fn list_records_for_cycle(&self, cycle_id: &str) -> Result<Vec<MemberDuesRecord>> {
            let mut records: Vec<MemberDuesRecord> = self
                .inner
                .records
                .read()
                .unwrap()
                .values()
                .filter(|r| r.cycle_id == cycle_id)
                .cloned()
                .collect();
            records.sort_by(|a, b| a.member_id.cmp(&b.member_id));
            Ok(records)
        }

        async fn insert_record(&self, record: &MemberDuesRecord) -> Result<()> {
            let mut records = self.inner.records.write().unwrap();
            let key = record_key(&record.member_id, &record.cycle_id);
            if records.contains_key(&key) {
                return Err(ApiError::conflict(format!(
                    "Dues record already exists for member '{}' in cycle '{}'",
                    record.member_id, record.cycle_id
                )));
            }
            records.insert(key, record.clone());
            Ok(())
        }

        async fn compare_and_update_record(
            &self,
            record: &MemberDuesRecord,
            expected_version: u64,
        ) -> Result<bool> {
            let mut records = self.inner.records.write().unwrap();
            let key = record_key(&record.member_id, &record.cycle_id);
            match records.get(&key) {
                Some(current) if current.version == expected_version => {
                    let mut updated = record.clone();
                    updated.version = expected_version + 1;
                    records.insert(key, updated);
                    Ok(true)
                }
                // Stale version or record gone: the caller lost the race
                _ => Ok(false),
            }
        }

        async fn get_payment_settings(&self) -> Result<PaymentSettings> {
            Ok(self.inner.settings.read().unwrap().clone())
        }

        async fn save_payment_settings(&self, settings: &PaymentSettings) -> Result<()> {
            *self.inner.settings.write().unwrap() = settings.clone();
            Ok(())
        }

        async fn is_event_processed(&self, event_id: &str) -> Result<bool> {
            Ok(self
                .inner
                .processed_events
                .read()
                .unwrap()
                .contains_key(event_id))
        }

        async fn mark_event_processed(&self, event_id: &str) -> Result<()> {
            self.inner
                .processed_events
                .write()
                .unwrap()
                .insert(event_id.to_string(), crate::utils::current_timestamp());
            Ok(())
        }
    }
}
