//! # Mobboard - Mob Kill Leaderboard Persistence
//!
//! Mobboard keeps per-player kill counts and owed rewards for a game server in an
//! embedded document store, and computes a ranked top-N board across all players.
//!
//! ## Features
//!
//! - **Document Storage**: Async field-level get/set/insert/find over sled-backed databases and collections.
//! - **Per-Player Collections**: One collection per player UUID, selected by document type.
//! - **Leaderboard**: Full-scan top-N ranking behind a swappable [`leaderboard::Ranking`] seam.
//! - **Pending Rewards**: Rewards that cannot be delivered now wait in a slot until the player returns.
//! - **Explicit Outcomes**: Misses and backend faults are separate arms of [`storage::Outcome`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mobboard::leaderboard::Leaderboard;
//! use mobboard::storage::{PlayerStorage, StorageFacade};
//! use mobboard::tracker::{initialize_player_data, record_kill, PlayerIdentity};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let facade = StorageFacade::connect("sled://./data/mobboard")?;
//!     let player = PlayerIdentity::new(Uuid::new_v4(), "Steve");
//!     let storage = PlayerStorage::new(facade.clone(), "mbl-players", player.uuid);
//!
//!     initialize_player_data(&storage, &player).await?;
//!     record_kill(&storage).await?;
//!
//!     let board = Leaderboard::full_scan(facade.clone(), "mbl-players");
//!     for entry in board.fetch_top_n(10).await? {
//!         println!("{} {}", entry.name, entry.kills);
//!     }
//!
//!     facade.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`storage`] - Document store client, async facade and per-player adapter
//! - [`tracker`] - Player data creation and kill counting
//! - [`leaderboard`] - Top-N ranking and bulk kill resets
//! - [`rewards`] - Placement rewards and the pending-reward slot
//! - [`config`] - Configuration management and validation
//! - [`logutil`] - Single-line log escaping

pub mod config;
pub mod leaderboard;
pub mod logutil;
pub mod rewards;
pub mod storage;
pub mod tracker;
