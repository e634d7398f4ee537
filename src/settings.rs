//! Club payment settings.
//!
//! A process-wide singleton listing the club's peer-to-peer payment
//! handles. Members see only the channels that are enabled; only a
//! dues manager may change them.

use crate::error::DuesError;
use crate::roles::{Actor, DuesPermissions};
use crate::storage::DuesStore;
use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// One peer-to-peer payment channel, e.g. the club's Zelle address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineChannel {
    /// Whether this channel is shown to members.
    pub enabled: bool,
    /// The handle members should send to.
    pub handle: String,
}

impl OfflineChannel {
    /// Create an enabled channel with the given handle.
    #[must_use]
    pub fn enabled(handle: impl Into<String>) -> Self {
        Self {
            enabled: true,
            handle: handle.into(),
        }
    }
}

/// The club's offline payment instructions, one per club.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Zelle handle.
    #[serde(default)]
    pub zelle: OfflineChannel,
    /// Venmo handle.
    #[serde(default)]
    pub venmo: OfflineChannel,
    /// Cash App handle.
    #[serde(default)]
    pub cashapp: OfflineChannel,
    /// Updated timestamp (Unix seconds).
    #[serde(default)]
    pub updated_at: u64,
}

/// A channel as displayed to members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleChannel {
    /// Channel name: "zelle", "venmo", or "cashapp".
    pub channel: String,
    /// The handle to send to.
    pub handle: String,
}

impl PaymentSettings {
    /// The channels members should see, enabled ones only.
    #[must_use]
    pub fn visible_channels(&self) -> Vec<VisibleChannel> {
        let mut channels = Vec::new();
        for (name, channel) in [
            ("zelle", &self.zelle),
            ("venmo", &self.venmo),
            ("cashapp", &self.cashapp),
        ] {
            if channel.enabled && !channel.handle.is_empty() {
                channels.push(VisibleChannel {
                    channel: name.to_string(),
                    handle: channel.handle.clone(),
                });
            }
        }
        channels
    }
}

/// Payment settings management.
pub struct SettingsManager<S: DuesStore> {
    store: S,
}

impl<S: DuesStore> SettingsManager<S> {
    /// Create a new settings manager.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read the settings. Any member may call this.
    pub async fn get(&self) -> Result<PaymentSettings, DuesError> {
        Ok(self.store.get_payment_settings().await?)
    }

    /// Replace the settings. Requires cycle management capability.
    #[instrument(skip(self, settings))]
    pub async fn update(
        &self,
        actor: &Actor,
        mut settings: PaymentSettings,
    ) -> Result<PaymentSettings, DuesError> {
        if !actor.role.can_manage_cycles() {
            return Err(DuesError::insufficient_permission("can_manage_cycles"));
        }
        settings.updated_at = current_timestamp();
        self.store.save_payment_settings(&settings).await?;

        info!(actor_id = %actor.member_id, "Payment settings updated");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::ClubRole;
    use crate::storage::memory::InMemoryDuesStore;

    #[test]
    fn test_visible_channels_filters_disabled() {
        let settings = PaymentSettings {
            zelle: OfflineChannel::enabled("dues@club.org"),
            venmo: OfflineChannel {
                enabled: false,
                handle: "@club".to_string(),
            },
            cashapp: OfflineChannel {
                enabled: true,
                handle: String::new(),
            },
            updated_at: 0,
        };

        let visible = settings.visible_channels();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].channel, "zelle");
        assert_eq!(visible[0].handle, "dues@club.org");
    }

    #[tokio::test]
    async fn test_update_requires_capability() {
        let manager = SettingsManager::new(InMemoryDuesStore::new());
        let member = Actor::new("mem_1", ClubRole::Member);

        let err = manager
            .update(&member, PaymentSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DuesError::InsufficientPermission { .. }));
    }

    #[tokio::test]
    async fn test_update_and_read_back() {
        let manager = SettingsManager::new(InMemoryDuesStore::new());
        let treasurer = Actor::new("treasurer_1", ClubRole::Treasurer);

        let saved = manager
            .update(
                &treasurer,
                PaymentSettings {
                    venmo: OfflineChannel::enabled("@service-club"),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(saved.updated_at > 0);

        let read = manager.get().await.unwrap();
        assert_eq!(read.venmo.handle, "@service-club");
        assert!(read.venmo.enabled);
        assert!(!read.zelle.enabled);
    }
}
