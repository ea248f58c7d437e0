//! # Rewards
//!
//! Placement rewards for the top of the leaderboard and the pending-reward slot
//! that carries a reward over to a player's next visit.
//!
//! The host game server supplies the players through [`RewardRecipient`] and
//! [`Roster`]. Every async routine here resolves on the task that awaited it, so
//! `give` is always called from the caller's context and never from the storage
//! worker pool.

mod pending;

pub use pending::{GrantOutcome, PendingRewards, ReconcileOutcome};

use std::collections::BTreeSet;

use log::info;
use uuid::Uuid;

use crate::config::RewardsConfig;
use crate::leaderboard::{reset_kills_except, Leaderboard, LeaderboardEntry, Ranking};
use crate::storage::{PlayerStorage, StorageFacade, StoreError};

/// A player the host can hand items to.
pub trait RewardRecipient {
    fn is_online(&self) -> bool;
    /// Whether the holding has at least one free slot.
    fn has_free_slot(&self) -> bool;
    /// Place one item of `reward` into the holding.
    fn give(&mut self, reward: &str);
}

/// Lookup of players currently reachable by the host.
pub trait Roster {
    type Recipient: RewardRecipient;

    fn online(&mut self, uuid: &str) -> Option<&mut Self::Recipient>;
}

/// Known reward ids and which one each leaderboard position earns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardCatalog {
    placements: Vec<String>,
    fallback: String,
    known: BTreeSet<String>,
}

impl RewardCatalog {
    pub fn new(placements: Vec<String>, fallback: impl Into<String>, extra: impl IntoIterator<Item = String>) -> Self {
        let fallback = fallback.into();
        let mut known: BTreeSet<String> = extra.into_iter().collect();
        known.extend(placements.iter().cloned());
        known.insert(fallback.clone());
        Self {
            placements,
            fallback,
            known,
        }
    }

    pub fn from_config(config: &RewardsConfig) -> Self {
        Self::new(
            config.placements.clone(),
            config.fallback.clone(),
            config.catalog.iter().cloned(),
        )
    }

    /// Reward for a 1-based leaderboard position.
    pub fn for_position(&self, position: usize) -> &str {
        position
            .checked_sub(1)
            .and_then(|i| self.placements.get(i))
            .unwrap_or(&self.fallback)
    }

    /// The canonical id if `id` names a known reward.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.known.get(id.trim()).map(String::as_str)
    }
}

impl Default for RewardCatalog {
    fn default() -> Self {
        Self::from_config(&RewardsConfig::default())
    }
}

/// What one ranked player received from a reward run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementReward {
    pub position: usize,
    pub entry: LeaderboardEntry,
    pub reward: String,
    pub outcome: GrantOutcome,
}

/// Reward the top `n` players by position, then zero everyone else's kills.
///
/// Players the roster cannot reach, or who are full, get the reward parked in their
/// pending slot.
pub async fn reward_top_players<R, S>(
    leaderboard: &Leaderboard<R>,
    rewards: &PendingRewards,
    facade: &StorageFacade,
    database: &str,
    roster: &mut S,
    n: usize,
) -> Result<Vec<PlacementReward>, StoreError>
where
    R: Ranking,
    S: Roster,
{
    let top = leaderboard.fetch_top_n(n).await?;
    let mut results = Vec::with_capacity(top.len());

    for (i, entry) in top.iter().enumerate() {
        let position = i + 1;
        let uuid = Uuid::parse_str(&entry.uuid).map_err(|e| StoreError::Malformed {
            collection: entry.uuid.clone(),
            reason: format!("uuid field is not a uuid: {e}"),
        })?;
        let storage = PlayerStorage::new(facade.clone(), database, uuid);
        let reward = rewards.catalog().for_position(position).to_string();
        let outcome = rewards
            .grant(&storage, roster.online(&entry.uuid), &reward)
            .await?;
        info!("Rewarding {} (#{}) with a {}", entry.name, position, reward);
        results.push(PlacementReward {
            position,
            entry: entry.clone(),
            reward,
            outcome,
        });
    }

    reset_kills_except(facade, database, &top).await?;
    Ok(results)
}
