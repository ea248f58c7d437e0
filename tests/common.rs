//! Shared fixtures for the integration tests.

use mobboard::rewards::{RewardRecipient, Roster};
use mobboard::storage::{PlayerStorage, StorageFacade};
use mobboard::tracker::{initialize_player_data, PlayerIdentity};
use uuid::Uuid;

pub const DB: &str = "mbl-players";

/// Fresh throwaway store with the player database created.
pub async fn memory_facade() -> StorageFacade {
    let facade = StorageFacade::connect("memory://").expect("memory store");
    assert!(facade.ensure_database(DB).await.is_found());
    facade
}

/// Create a player with data and, when `kills > 0`, a preset kill count.
#[allow(dead_code)]
pub async fn seed_player(facade: &StorageFacade, name: &str, kills: i64) -> (PlayerIdentity, PlayerStorage) {
    let player = PlayerIdentity::new(Uuid::new_v4(), name);
    let storage = PlayerStorage::new(facade.clone(), DB, player.uuid);
    assert!(initialize_player_data(&storage, &player).await.unwrap());
    if kills != 0 {
        assert!(storage
            .set_field_value("playerdata", "kills", kills)
            .await
            .is_found());
    }
    (player, storage)
}

/// In-memory player with a fixed number of free slots.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct TestPlayer {
    pub online: bool,
    pub free_slots: usize,
    pub received: Vec<String>,
}

#[allow(dead_code)]
impl TestPlayer {
    pub fn online_with_slots(free_slots: usize) -> Self {
        Self {
            online: true,
            free_slots,
            received: Vec::new(),
        }
    }
}

impl RewardRecipient for TestPlayer {
    fn is_online(&self) -> bool {
        self.online
    }

    fn has_free_slot(&self) -> bool {
        self.free_slots > 0
    }

    fn give(&mut self, reward: &str) {
        self.free_slots = self.free_slots.saturating_sub(1);
        self.received.push(reward.to_string());
    }
}

/// Roster backed by a list of (uuid, player) pairs.
#[allow(dead_code)]
#[derive(Default)]
pub struct TestRoster {
    pub players: Vec<(String, TestPlayer)>,
}

impl Roster for TestRoster {
    type Recipient = TestPlayer;

    fn online(&mut self, uuid: &str) -> Option<&mut TestPlayer> {
        self.players
            .iter_mut()
            .find(|(id, p)| id == uuid && p.online)
            .map(|(_, p)| p)
    }
}
