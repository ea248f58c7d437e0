use log::info;

use super::LeaderboardEntry;
use crate::storage::{fields, Outcome, StorageFacade, StoreError, PLAYER_DATA, RESERVED_COLLECTION, TYPE_FIELD};

/// Set every player's kills to zero. Returns how many documents were updated.
pub async fn reset_all_kills(facade: &StorageFacade, database: &str) -> Result<usize, StoreError> {
    reset_kills_except(facade, database, &[]).await
}

/// Set kills to zero for every player not in `keep`. Returns how many were updated.
///
/// Stops at the first fault; players reset before it stay reset.
pub async fn reset_kills_except(
    facade: &StorageFacade,
    database: &str,
    keep: &[LeaderboardEntry],
) -> Result<usize, StoreError> {
    let collections = match facade.list_collection_names(database).await {
        Outcome::Found(names) => names,
        Outcome::NotFound(_) => return Ok(0),
        Outcome::Fault(err) => return Err(err),
    };

    let mut reset = 0;
    for collection in collections {
        if collection == RESERVED_COLLECTION || keep.iter().any(|e| e.uuid == collection) {
            continue;
        }
        let updated = facade
            .set_field_value(
                database,
                &collection,
                TYPE_FIELD,
                PLAYER_DATA,
                fields::KILLS,
                0i64,
            )
            .await
            .into_result()?;
        if updated == Some(true) {
            reset += 1;
        }
    }
    info!("Reset kills for {} players ({} kept)", reset, keep.len());
    Ok(reset)
}
