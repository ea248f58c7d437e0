//! Player lifecycle on top of [`PlayerStorage`]: lazy creation of the `playerdata`
//! document on join and the kill counter.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{fields, Document, Outcome, PlayerStorage, StoreError, Value, PLAYER_DATA};

/// Identity the host hands us for a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub uuid: Uuid,
    pub name: String,
}

impl PlayerIdentity {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
        }
    }
}

/// Fresh `playerdata` document. No pending reward field until one is owed.
pub fn player_data_document(player: &PlayerIdentity) -> Document {
    Document::of_type(PLAYER_DATA)
        .with(fields::NAME, player.name.as_str())
        .with(fields::UUID, player.uuid.to_string())
        .with(fields::KILLS, 0i64)
}

/// Create the player's document if it is not there yet. Returns true when created.
///
/// The existence check and the insert are separate steps; two joins racing for the
/// same new player can both insert.
pub async fn initialize_player_data(
    storage: &PlayerStorage,
    player: &PlayerIdentity,
) -> Result<bool, StoreError> {
    if let Outcome::Fault(err) = storage.provision().await {
        return Err(err);
    }

    let probe = storage.clone();
    let exists = tokio::task::spawn_blocking(move || probe.exists(PLAYER_DATA))
        .await
        .map_err(|err| StoreError::Internal(format!("existence check failed: {err}")))?;
    if exists {
        debug!("player data already present for {}", player.uuid);
        return Ok(false);
    }

    info!("Initializing data for player: {}", player.name);
    storage
        .insert_document(player_data_document(player))
        .await
        .into_result()?;
    Ok(true)
}

/// Kill count before and after one increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillTally {
    pub before: i64,
    pub after: i64,
}

/// Add one kill by reading the counter and writing it back.
///
/// Not atomic: concurrent calls for the same player can each read the same value
/// and one increment is lost. A missing counter counts as zero. Returns `None`
/// when the player has no data to record the kill on.
pub async fn record_kill(storage: &PlayerStorage) -> Result<Option<KillTally>, StoreError> {
    let before = read_kills(storage).await?;
    let after = before + 1;
    let updated = storage
        .set_field_value(PLAYER_DATA, fields::KILLS, after)
        .await
        .into_result()?;
    if updated != Some(true) {
        warn!("Kill for {} not recorded: no player data", storage.collection());
        return Ok(None);
    }
    Ok(Some(KillTally { before, after }))
}

/// Current kill count; misses read as zero.
pub async fn read_kills(storage: &PlayerStorage) -> Result<i64, StoreError> {
    let kills = storage
        .get_field_value(PLAYER_DATA, fields::KILLS)
        .await
        .into_result()?;
    match kills {
        Some(Value::Integer(k)) => Ok(k),
        Some(other) => Err(StoreError::Malformed {
            collection: storage.collection().to_string(),
            reason: format!("kills is a {}, expected an integer", other.kind()),
        }),
        None => Ok(0),
    }
}
