//! Binary entrypoint for the mobboard CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml`
//! - `join --uuid <id> --name <name>` - create player data on first sight
//! - `kill --uuid <id>` - record one special mob kill
//! - `top [-n <count>] [--json]` - print the leaderboard
//! - `grant --uuid <id> --reward <id>` - park a reward for a player
//! - `claim --uuid <id>` - deliver a pending reward
//! - `reset-kills` - zero every player's kills
//! - `reward-top [-n <count>]` - reward the top players and reset everyone else
//!
//! The CLI stands in for the game server: every player is treated as offline
//! when rewards are handed out, and `claim` acts as the player reconnecting.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use uuid::Uuid;

use mobboard::config::Config;
use mobboard::leaderboard::{has_scores, reset_all_kills, Leaderboard};
use mobboard::rewards::{
    reward_top_players, GrantOutcome, PendingRewards, ReconcileOutcome, RewardCatalog, RewardRecipient, Roster,
};
use mobboard::storage::{PlayerStorage, StorageFacade};
use mobboard::tracker::{initialize_player_data, record_kill, PlayerIdentity};

#[derive(Parser)]
#[command(name = "mobboard")]
#[command(about = "Mob kill leaderboard and pending rewards")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Create player data if the player has none yet
    Join {
        #[arg(long)]
        uuid: Uuid,
        #[arg(long)]
        name: String,
    },
    /// Record one special mob kill for a player
    Kill {
        #[arg(long)]
        uuid: Uuid,
    },
    /// Show the leaderboard
    Top {
        /// Number of players (defaults to leaderboard.size)
        #[arg(short = 'n', long = "count")]
        n: Option<usize>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Store a reward as pending for a player
    Grant {
        #[arg(long)]
        uuid: Uuid,
        #[arg(long)]
        reward: String,
    },
    /// Deliver a player's pending reward
    Claim {
        #[arg(long)]
        uuid: Uuid,
    },
    /// Reset every player's kills to zero
    ResetKills,
    /// Reward the top players and reset the rest
    RewardTop {
        #[arg(short = 'n', long = "count")]
        n: Option<usize>,
    },
}

/// Console stand-in for a connected player with room in their inventory.
struct ConsoleRecipient {
    uuid: Uuid,
}

impl RewardRecipient for ConsoleRecipient {
    fn is_online(&self) -> bool {
        true
    }

    fn has_free_slot(&self) -> bool {
        true
    }

    fn give(&mut self, reward: &str) {
        println!("{} received 1x {}", self.uuid, reward);
    }
}

/// Nobody is online from the command line.
struct OfflineRoster;

impl Roster for OfflineRoster {
    type Recipient = ConsoleRecipient;

    fn online(&mut self, _uuid: &str) -> Option<&mut ConsoleRecipient> {
        None
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);

    info!("Establishing database connection...");
    let facade = StorageFacade::connect(&config.storage.connection_string)?;
    let database = config.storage.database.clone();
    facade.ensure_database(&database).await.into_result()?;

    let result = run(cli.command, &config, &facade).await;

    info!("Closing database connection...");
    match facade.close().await {
        Ok(()) => info!("Closed database connection."),
        Err(e) => warn!("Failed to close database connection: {}", e),
    }
    result
}

async fn run(command: Commands, config: &Config, facade: &StorageFacade) -> Result<()> {
    let database = config.storage.database.as_str();
    let rewards = PendingRewards::new(RewardCatalog::from_config(&config.rewards).into());
    let leaderboard = Leaderboard::full_scan(facade.clone(), database);

    match command {
        Commands::Init => return Err(anyhow!("init does not open the store")),
        Commands::Join { uuid, name } => {
            let player = PlayerIdentity::new(uuid, name);
            let storage = PlayerStorage::new(facade.clone(), database, uuid);
            if initialize_player_data(&storage, &player).await? {
                println!("Created player data for {}", player.name);
            } else {
                println!("Player data for {} already exists", player.name);
            }
        }
        Commands::Kill { uuid } => {
            let storage = PlayerStorage::new(facade.clone(), database, uuid);
            match record_kill(&storage).await? {
                Some(tally) => println!("Special mob kills: {} -> {}", tally.before, tally.after),
                None => println!("No player data for {}; run join first", uuid),
            }
        }
        Commands::Top { n, json } => {
            let n = n.unwrap_or(config.leaderboard.size);
            let top = leaderboard.fetch_top_n(n).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&top)?);
            } else if top.is_empty() {
                println!("No data available.");
            } else if !has_scores(&top) {
                println!("Everyone is still on 0 kills, no leaderboard to be shown!");
            } else {
                for (i, entry) in top.iter().enumerate() {
                    println!("#{:<3} {:<16} {}", i + 1, entry.name, entry.kills);
                }
            }
        }
        Commands::Grant { uuid, reward } => {
            let Some(reward) = rewards.catalog().resolve(&reward).map(str::to_string) else {
                return Err(anyhow!("unknown reward '{}'", reward));
            };
            let storage = PlayerStorage::new(facade.clone(), database, uuid);
            let outcome = rewards
                .grant::<ConsoleRecipient>(&storage, None, &reward)
                .await?;
            if outcome == GrantOutcome::Pending {
                println!("{} is pending for {}", reward, uuid);
            }
        }
        Commands::Claim { uuid } => {
            let storage = PlayerStorage::new(facade.clone(), database, uuid);
            let mut player = ConsoleRecipient { uuid };
            match rewards.reconcile(&storage, &mut player).await? {
                ReconcileOutcome::Granted(reward) => println!("You received a pending reward: {}", reward),
                ReconcileOutcome::NothingPending => println!("You're awaiting no pending rewards"),
                ReconcileOutcome::Unrecognized(id) => println!("Pending reward '{}' is not recognised", id),
            }
        }
        Commands::ResetKills => {
            let count = reset_all_kills(facade, database).await?;
            println!("All player kills reset ({} players).", count);
        }
        Commands::RewardTop { n } => {
            let n = n.unwrap_or(config.leaderboard.size);
            let placed =
                reward_top_players(&leaderboard, &rewards, facade, database, &mut OfflineRoster, n).await?;
            if placed.is_empty() {
                println!("No data found.");
            }
            for p in placed {
                println!(
                    "#{} {} -> {} ({:?})",
                    p.position, p.entry.name, p.reward, p.outcome
                );
            }
        }
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .map(|c| c.logging.level_filter())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Only echo to the console when someone is watching it
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
