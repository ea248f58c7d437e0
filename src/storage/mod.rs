//! # Storage Module - Document Persistence Layer
//!
//! Layers, leaves first:
//!
//! ```text
//! PlayerStorage      ← one collection per player, selected by `type`
//!      │
//! StorageFacade      ← async get/set/insert/find on the blocking pool
//!      │
//! DocumentStoreClient← sled-backed databases, collections and cursors
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mobboard::storage::{PlayerStorage, StorageFacade};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let facade = StorageFacade::connect("sled://./data/mobboard")?;
//!     let player = PlayerStorage::new(facade.clone(), "mbl-players", Uuid::new_v4());
//!     player.provision().await.into_result()?;
//!
//!     match player.get_field_value("playerdata", "kills").await {
//!         mobboard::storage::Outcome::Found(kills) => println!("kills: {kills}"),
//!         mobboard::storage::Outcome::NotFound(_) => println!("no data yet"),
//!         mobboard::storage::Outcome::Fault(err) => return Err(err.into()),
//!     }
//!
//!     facade.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Facade calls resolve to [`Outcome`]: `Found`, `NotFound` for a missing database,
//! collection, document or field, and `Fault` for anything the backend could not do.
//! Both non-found arms are logged with the operation and its parameters before the
//! call resolves.

pub mod client;
pub mod document;
pub mod errors;
pub mod facade;
pub mod player;

pub use client::{ConnectionString, DocumentCursor, DocumentStoreClient};
pub use document::{Document, Value, TYPE_FIELD};
pub use errors::{Outcome, StoreError};
pub use facade::StorageFacade;
pub use player::PlayerStorage;

/// Document type of the per-player record.
pub const PLAYER_DATA: &str = "playerdata";

/// Collection name the aggregator and bulk resets never treat as a player.
pub const RESERVED_COLLECTION: &str = "system.indexes";

/// Field names of the `playerdata` document.
pub mod fields {
    pub const NAME: &str = "name";
    pub const UUID: &str = "uuid";
    pub const KILLS: &str = "kills";
    pub const PENDING_REWARD: &str = "pendingRewardMaterial";
}
