mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use rps_core::{CoreError, Storage};
use rps_game::GameError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rps")]
#[command(about = "Escrowed Rock-Paper-Scissors for 2 players")]
#[command(version)]
struct Cli {
    /// Data directory for the arena database
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Arena name
    #[arg(short, long, global = true)]
    arena: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an arena with a fixed bet and reveal span
    Init {
        /// Minimum stake per commitment
        #[arg(long, default_value_t = 1)]
        bet: u64,
        /// Seconds both players get to reveal after the second commitment
        #[arg(long, default_value_t = 300)]
        reveal_span: u64,
        /// Seconds to wait for both commitments before refunding
        #[arg(long)]
        commit_span: Option<u64>,
    },
    /// Add funds to a player's balance
    Fund {
        /// Player identity
        player: String,
        /// Amount in base units
        amount: u64,
    },
    /// Show balances
    Balance {
        /// Player identity (all players if omitted)
        player: Option<String>,
    },
    /// Challenge another player
    Challenge {
        /// Player identity
        player: String,
        /// Opponent identity
        opponent: String,
    },
    /// Accept a pending challenge
    Accept {
        /// Player identity
        player: String,
        /// Identity of the challenger
        challenger: String,
    },
    /// Reject the challenge aimed at you
    Reject {
        /// Player identity
        player: String,
    },
    /// Print the commitment for a move without submitting it
    Hash {
        /// Player identity
        player: String,
        /// rock, paper or scissors
        choice: String,
        /// Secret (hex encoded)
        #[arg(long)]
        secret: Option<String>,
    },
    /// Commit to a hidden move and stake funds
    Commit {
        /// Player identity
        player: String,
        /// rock, paper or scissors
        choice: String,
        /// Stake (defaults to the arena's fixed bet)
        #[arg(long)]
        stake: Option<u64>,
        /// Commit without a secret
        #[arg(long)]
        no_secret: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Reveal your committed move
    Reveal {
        /// Player identity
        player: String,
        /// Move to reveal (defaults to the one remembered at commit time)
        #[arg(long)]
        choice: Option<String>,
        /// Secret (hex encoded, defaults to the one remembered at commit time)
        #[arg(long)]
        secret: Option<String>,
    },
    /// Settle your match and release the escrow
    Settle {
        /// Player identity
        player: String,
    },
    /// Show active matches and pending challenges
    Status {
        /// Player identity
        player: Option<String>,
    },
    /// Show settled matches
    History {
        /// Number of matches to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let defaults = CliConfig::default();
    let config = CliConfig {
        data_dir: cli.data_dir.unwrap_or(defaults.data_dir),
        arena: cli.arena.unwrap_or(defaults.arena),
        verbose: cli.verbose,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Ensure data directory exists
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let storage = Storage::new(&config.db_path()).await?;
    let arena = config.arena.as_str();

    // Execute command
    let result = match cli.command {
        Commands::Init {
            bet,
            reveal_span,
            commit_span,
        } => commands::init_arena(&storage, arena, bet, reveal_span, commit_span).await,
        Commands::Fund { player, amount } => commands::fund(&storage, &player, amount).await,
        Commands::Balance { player } => commands::show_balance(&storage, player.as_deref()).await,
        Commands::Challenge { player, opponent } => {
            commands::challenge(&storage, arena, &player, &opponent).await
        }
        Commands::Accept { player, challenger } => {
            commands::accept(&storage, arena, &player, &challenger).await
        }
        Commands::Reject { player } => commands::reject(&storage, arena, &player).await,
        Commands::Hash {
            player,
            choice,
            secret,
        } => commands::print_hash(&player, &choice, secret.as_deref()),
        Commands::Commit {
            player,
            choice,
            stake,
            no_secret,
            yes,
        } => commands::commit(&storage, arena, &player, &choice, stake, no_secret, yes).await,
        Commands::Reveal {
            player,
            choice,
            secret,
        } => {
            commands::reveal(
                &storage,
                arena,
                &player,
                choice.as_deref(),
                secret.as_deref(),
            )
            .await
        }
        Commands::Settle { player } => commands::settle(&storage, arena, &player).await,
        Commands::Status { player } => {
            commands::show_status(&storage, arena, player.as_deref()).await
        }
        Commands::History { limit, json } => {
            commands::show_history(&storage, arena, limit, json).await
        }
    };

    if let Err(e) = result {
        if let Some(err) = e.downcast_ref::<GameError>() {
            match err {
                GameError::NotChallenged => {
                    eprintln!("Error: {}", err);
                    eprintln!("Use 'rps challenge' and 'rps accept' to pair up first");
                }
                GameError::TooEarly(reason) => {
                    eprintln!("Error: too early, {}", reason);
                    eprintln!("Use 'rps status' to see the match stage");
                }
                GameError::Core(CoreError::InsufficientFunds { need, available }) => {
                    eprintln!("Error: Insufficient funds");
                    eprintln!("Need: {}, Available: {}", need, available);
                    eprintln!("Use 'rps fund' to add funds");
                }
                _ => eprintln!("Error: {}", err),
            }
        } else if let Some(CoreError::ArenaNotFound { name }) = e.downcast_ref::<CoreError>() {
            eprintln!("Error: Arena '{}' not found", name);
            eprintln!("Use 'rps init' to create it");
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}
