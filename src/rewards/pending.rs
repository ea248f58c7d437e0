use std::sync::Arc;

use log::{info, warn};

use super::{RewardCatalog, RewardRecipient};
use crate::storage::{fields, PlayerStorage, StoreError, Value, PLAYER_DATA};

/// Result of trying to hand out a reward right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The recipient had room and received the item.
    Delivered,
    /// The recipient was offline or full; the reward now waits in the pending slot.
    Pending,
}

/// Result of a reconnect check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A pending reward was granted and the slot cleared.
    Granted(String),
    /// Nothing was owed.
    NothingPending,
    /// The slot holds an id the catalog does not know; it is left in place.
    Unrecognized(String),
}

/// Delivers rewards that could not be handed out immediately.
///
/// Each player has a single pending slot (`pendingRewardMaterial`). Storing a reward
/// while another is pending overwrites it. On the next check the pending reward is
/// granted without a capacity check and the slot is cleared. Read, grant and clear
/// are separate steps and not atomic as a whole.
#[derive(Clone)]
pub struct PendingRewards {
    catalog: Arc<RewardCatalog>,
}

impl PendingRewards {
    pub fn new(catalog: Arc<RewardCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    /// Give `reward` now if the recipient is reachable and has room, otherwise park it.
    pub async fn grant<R: RewardRecipient + ?Sized>(
        &self,
        storage: &PlayerStorage,
        recipient: Option<&mut R>,
        reward: &str,
    ) -> Result<GrantOutcome, StoreError> {
        match recipient {
            Some(player) if player.is_online() && player.has_free_slot() => {
                player.give(reward);
                info!("Delivered reward {} to {}", reward, storage.collection());
                Ok(GrantOutcome::Delivered)
            }
            _ => {
                self.store_pending(storage, reward).await?;
                Ok(GrantOutcome::Pending)
            }
        }
    }

    /// Write `reward` into the pending slot, replacing whatever was there.
    pub async fn store_pending(&self, storage: &PlayerStorage, reward: &str) -> Result<(), StoreError> {
        let updated = storage
            .set_field_value(PLAYER_DATA, fields::PENDING_REWARD, reward)
            .await
            .into_result()?;
        if updated != Some(true) {
            warn!(
                "Pending reward {} for {} was not stored: no player data",
                reward,
                storage.collection()
            );
        } else {
            info!("Reward {} pending for {}", reward, storage.collection());
        }
        Ok(())
    }

    /// Current pending reward id, if any. Empty and absent both mean none.
    pub async fn pending(&self, storage: &PlayerStorage) -> Result<Option<String>, StoreError> {
        let value = storage
            .get_field_value(PLAYER_DATA, fields::PENDING_REWARD)
            .await
            .into_result()?;
        Ok(match value {
            Some(Value::String(id)) if !id.is_empty() => Some(id),
            _ => None,
        })
    }

    /// Grant and clear the pending reward. Running it again afterwards grants nothing.
    pub async fn reconcile<R: RewardRecipient + ?Sized>(
        &self,
        storage: &PlayerStorage,
        recipient: &mut R,
    ) -> Result<ReconcileOutcome, StoreError> {
        let Some(id) = self.pending(storage).await? else {
            return Ok(ReconcileOutcome::NothingPending);
        };
        let Some(reward) = self.catalog.resolve(&id) else {
            warn!(
                "Unknown pending reward '{}' for {}; leaving it in place",
                crate::logutil::escape_log(&id),
                storage.collection()
            );
            return Ok(ReconcileOutcome::Unrecognized(id));
        };
        let reward = reward.to_string();

        recipient.give(&reward);
        storage
            .set_field_value(PLAYER_DATA, fields::PENDING_REWARD, "")
            .await
            .into_result()?;
        info!("Granted pending reward {} to {}", reward, storage.collection());
        Ok(ReconcileOutcome::Granted(reward))
    }
}
