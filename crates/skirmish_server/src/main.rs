//! AR Skirmish - headless authoritative server.
//!
//! # Usage
//!
//! ```bash
//! # Serve a match: JSON lines on stdin/stdout, logs on stderr
//! cargo run -p skirmish_server -- serve
//!
//! # Play one bot-vs-bot match and print its summary
//! cargo run -p skirmish_server -- simulate --seed 3 --red turtle --blue rusher
//!
//! # Run a batch of seeded matches in parallel
//! cargo run -p skirmish_server -- batch --count 1000 --output results/
//!
//! # Check a config file
//! cargo run -p skirmish_server -- validate configs/skirmish.ron
//!
//! # Verify a recorded match log
//! cargo run -p skirmish_server -- replay --file match.bin
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish_core::config::GameConfig;
use skirmish_core::replay::MatchLog;
use skirmish_server::batch::{play_match, run_batch, BatchConfig, BatchResults, DEFAULT_MAX_TICKS};
use skirmish_server::bot::BotStrategy;
use skirmish_server::error::Result;
use skirmish_server::session::{run_server, ServeOptions};

#[derive(Parser)]
#[command(name = "skirmish_server")]
#[command(about = "Headless authoritative server for AR skirmish matches")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Match rules (RON). Defaults to the built-in rules.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve a match over stdin/stdout
    Serve {
        /// Stop after this many ticks
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Keep ticking after stdin closes
        #[arg(long)]
        linger: bool,
    },

    /// Play one bot-vs-bot match
    Simulate {
        /// Match seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick cap
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Red bot strategy
        #[arg(long, value_enum, default_value = "rusher")]
        red: BotStrategy,

        /// Blue bot strategy
        #[arg(long, value_enum, default_value = "economist")]
        blue: BotStrategy,

        /// Save the match input log here
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run a batch of matches for balance testing
    Batch {
        /// Number of matches to run
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick cap per match
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Red bot strategy
        #[arg(long, value_enum, default_value = "rusher")]
        red: BotStrategy,

        /// Blue bot strategy
        #[arg(long, value_enum, default_value = "economist")]
        blue: BotStrategy,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: usize,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Validate a match config file
    Validate {
        /// RON file to check
        path: PathBuf,
    },

    /// Replay a recorded match log and verify its final hash
    Replay {
        /// Log file path
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is the protocol channel.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = load_config(cli.config.as_ref()).and_then(|game| match cli.command {
        Some(Commands::Serve { max_ticks, linger }) => {
            cmd_serve(game, ServeOptions { max_ticks, linger })
        }
        Some(Commands::Simulate {
            seed,
            max_ticks,
            red,
            blue,
            record,
        }) => cmd_simulate(&game, seed, max_ticks, red, blue, record),
        Some(Commands::Batch {
            count,
            seed,
            max_ticks,
            red,
            blue,
            parallel,
            output,
        }) => {
            let config = BatchConfig {
                match_count: count,
                seed_start: seed,
                max_ticks,
                red,
                blue,
                parallel,
                game,
            };
            cmd_batch(config, output)
        }
        Some(Commands::Validate { path }) => cmd_validate(path),
        Some(Commands::Replay { file }) => cmd_replay(file),
        None => cmd_serve(game, ServeOptions::default()),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("FATAL: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<GameConfig> {
    match path {
        Some(path) => {
            let config = GameConfig::load(path)?;
            tracing::info!(path = %path.display(), seed = config.seed, "Loaded match config");
            Ok(config)
        }
        None => Ok(GameConfig::default()),
    }
}

/// Serve a match over stdio
fn cmd_serve(game: GameConfig, options: ServeOptions) -> Result<()> {
    tracing::info!(?options, "Starting server");
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        run_server(game, stdin, stdout, options).await
    })?;
    Ok(())
}

/// Play one bot match
fn cmd_simulate(
    game: &GameConfig,
    seed: u64,
    max_ticks: u64,
    red: BotStrategy,
    blue: BotStrategy,
    record: Option<PathBuf>,
) -> Result<()> {
    tracing::info!(seed, %red, %blue, max_ticks, "Simulating match");
    let (summary, log) = play_match(game, seed, red, blue, max_ticks)?;
    if let Some(path) = record {
        log.save(&path)?;
        tracing::info!(path = %path.display(), inputs = log.inputs.len(), "Match log saved");
    }
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

/// Run a batch of games for balance testing
fn cmd_batch(config: BatchConfig, output: PathBuf) -> Result<()> {
    std::fs::create_dir_all(&output)?;
    let results = run_batch(config);

    let results_path = BatchResults::default_path(&output);
    results.save(&results_path)?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", summary.total);
    if !results.errors.is_empty() {
        eprintln!("Matches failed: {}", results.errors.len());
    }
    eprintln!(
        "Red ({}) wins: {} ({:.1}%)",
        results.config.red,
        summary.red_wins,
        summary.win_rate(skirmish_core::team::Team::Red) * 100.0
    );
    eprintln!(
        "Blue ({}) wins: {} ({:.1}%)",
        results.config.blue,
        summary.blue_wins,
        summary.win_rate(skirmish_core::team::Team::Blue) * 100.0
    );
    eprintln!("Draws: {}", summary.draws);
    eprintln!("Average length: {:.0} ticks", summary.average_ticks);
    eprintln!("Results: {}", results_path.display());
    Ok(())
}

/// Validate a config file
fn cmd_validate(path: PathBuf) -> Result<()> {
    let config = GameConfig::load(&path)?;
    eprintln!(
        "OK: {} ({} troop kinds, {} upgrade tiers)",
        path.display(),
        config.troop_kinds.len(),
        config.upgrades.len()
    );
    Ok(())
}

/// Replay a recorded match and verify its final hash
fn cmd_replay(file: PathBuf) -> Result<()> {
    let log = MatchLog::load(&file)?;
    eprintln!("Loaded match log:");
    eprintln!("  Seed: {}", log.config.seed);
    eprintln!("  Inputs: {}", log.inputs.len());
    eprintln!("  Ticks: {}", log.final_tick);

    let simulation = log.replay()?;
    eprintln!(
        "PASS: replay reached tick {} with hash {}",
        simulation.get_tick(),
        simulation.state_hash()
    );
    Ok(())
}
