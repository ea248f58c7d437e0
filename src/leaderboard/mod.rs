//! # Leaderboard
//!
//! Ranked top-N view over every player collection in the database.
//!
//! Ranking sits behind the [`Ranking`] trait. [`FullScan`] recomputes from source on
//! every call: it lists all collections, drains every `playerdata` match into memory,
//! sorts by kills descending and truncates. Nothing is cached, so results are never
//! stale, and the cost grows with the number of players. Equal scores keep scan
//! order (collection name order), so repeated calls without writes agree.
//!
//! Any fault while scanning aborts the whole request; partial boards are never
//! returned.

mod reset;

pub use reset::{reset_all_kills, reset_kills_except};

use std::sync::Arc;

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::logutil::reference;
use crate::storage::{
    fields, Document, StorageFacade, StoreError, Value, PLAYER_DATA, RESERVED_COLLECTION, TYPE_FIELD,
};

/// One ranked player. Derived on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub uuid: String,
    pub kills: u64,
}

impl LeaderboardEntry {
    /// Project a `playerdata` document found in `collection`.
    pub fn from_document(collection: &str, document: &Document) -> Result<Self, StoreError> {
        let malformed = |reason: String| StoreError::Malformed {
            collection: collection.to_string(),
            reason,
        };
        let name = document
            .get_str(fields::NAME)
            .ok_or_else(|| malformed("missing name".into()))?;
        let uuid = document.get_str(fields::UUID).unwrap_or(collection);
        let kills = document
            .get_integer(fields::KILLS)
            .ok_or_else(|| malformed("missing or non-integer kills".into()))?;
        let kills = u64::try_from(kills).map_err(|_| malformed(format!("negative kills {kills}")))?;
        Ok(Self {
            name: name.to_string(),
            uuid: uuid.to_string(),
            kills,
        })
    }
}

/// True when the leader has at least one kill. An all-zero board has nothing to show.
pub fn has_scores(entries: &[LeaderboardEntry]) -> bool {
    entries.first().is_some_and(|leader| leader.kills > 0)
}

/// Source of a ranked board. Implementations block; [`Leaderboard`] moves them off
/// the async runtime.
pub trait Ranking: Send + Sync + 'static {
    fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

/// Recompute the board by scanning every player collection.
pub struct FullScan {
    facade: StorageFacade,
    database: String,
}

impl FullScan {
    pub fn new(facade: StorageFacade, database: impl Into<String>) -> Self {
        Self {
            facade,
            database: database.into(),
        }
    }
}

impl FullScan {
    fn scan_collection(&self, collection: &str, entries: &mut Vec<LeaderboardEntry>) -> Result<(), StoreError> {
        let player_data = Value::from(PLAYER_DATA);
        let cursor = self
            .facade
            .client()
            .find(&self.database, collection, TYPE_FIELD, &player_data)?;
        for document in cursor {
            entries.push(LeaderboardEntry::from_document(collection, &document?)?);
        }
        Ok(())
    }
}

/// Log reference for one collection of a scan, in the facade's `db;coll;...` form.
fn scan_reference(database: &str, collection: &str) -> String {
    reference([
        Some(database),
        Some(collection),
        Some(TYPE_FIELD),
        Some(PLAYER_DATA),
        Some(fields::KILLS),
        None,
    ])
}

impl Ranking for FullScan {
    fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let client = self.facade.client();
        let collections = match client.list_collection_names(&self.database) {
            Ok(names) => names,
            Err(StoreError::DatabaseNotFound(db)) => {
                debug!("leaderboard database {} not created yet", db);
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let mut entries = Vec::new();
        for collection in collections {
            if collection == RESERVED_COLLECTION {
                continue;
            }
            if let Err(err) = self.scan_collection(&collection, &mut entries) {
                error!(
                    "storage fault on leaderboardScan, reference -> {}: {}",
                    scan_reference(&self.database, &collection),
                    err
                );
                return Err(err);
            }
        }

        // stable: equal kills keep scan order
        entries.sort_by(|a, b| b.kills.cmp(&a.kills));
        entries.truncate(n);
        Ok(entries)
    }
}

/// Async front for a [`Ranking`].
pub struct Leaderboard<R = FullScan> {
    ranking: Arc<R>,
}

impl<R> Clone for Leaderboard<R> {
    fn clone(&self) -> Self {
        Self {
            ranking: Arc::clone(&self.ranking),
        }
    }
}

impl Leaderboard<FullScan> {
    pub fn full_scan(facade: StorageFacade, database: impl Into<String>) -> Self {
        Self::new(FullScan::new(facade, database))
    }
}

impl<R: Ranking> Leaderboard<R> {
    pub fn new(ranking: R) -> Self {
        Self {
            ranking: Arc::new(ranking),
        }
    }

    /// Top `n` players by kills, highest first; at most `n` entries.
    pub async fn fetch_top_n(&self, n: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let ranking = Arc::clone(&self.ranking);
        let result = tokio::task::spawn_blocking(move || ranking.top(n))
            .await
            .map_err(|err| StoreError::Internal(format!("leaderboard task failed: {err}")))
            .and_then(|r| r);
        if let Err(err) = &result {
            error!("leaderboard aggregation failed: {}", err);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kills: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            name: name.into(),
            uuid: format!("{name}-id"),
            kills,
        }
    }

    #[test]
    fn projects_player_document() {
        let doc = Document::of_type(PLAYER_DATA)
            .with(fields::NAME, "Alex")
            .with(fields::UUID, "u-1")
            .with(fields::KILLS, 7i64);
        assert_eq!(
            LeaderboardEntry::from_document("u-1", &doc).unwrap(),
            LeaderboardEntry {
                name: "Alex".into(),
                uuid: "u-1".into(),
                kills: 7
            }
        );
    }

    #[test]
    fn rejects_documents_without_usable_kills() {
        let missing = Document::of_type(PLAYER_DATA).with(fields::NAME, "Alex");
        assert!(matches!(
            LeaderboardEntry::from_document("c", &missing),
            Err(StoreError::Malformed { .. })
        ));
        let negative = missing.clone().with(fields::KILLS, -1i64);
        assert!(LeaderboardEntry::from_document("c", &negative).is_err());
    }

    #[test]
    fn empty_or_zero_board_has_no_scores() {
        assert!(!has_scores(&[]));
        assert!(!has_scores(&[entry("a", 0), entry("b", 0)]));
        assert!(has_scores(&[entry("a", 1), entry("b", 0)]));
    }

    #[test]
    fn scan_fault_reference_names_the_collection() {
        assert_eq!(
            scan_reference("mbl-players", "abc"),
            "mbl-players;abc;type;playerdata;kills;null"
        );
    }

    struct Fixed(Vec<LeaderboardEntry>);

    impl Ranking for Fixed {
        fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
            Ok(self.0.iter().take(n).cloned().collect())
        }
    }

    #[tokio::test]
    async fn leaderboard_accepts_any_ranking() {
        let board = Leaderboard::new(Fixed(vec![entry("a", 3), entry("b", 1)]));
        assert_eq!(board.fetch_top_n(1).await.unwrap(), vec![entry("a", 3)]);
    }
}
