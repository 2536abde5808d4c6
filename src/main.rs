//! Binary entrypoint for the Wildcard CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` plus default ranges, weights and content documents
//! - `check` - load and validate every document, print the outcome table
//! - `simulate --draws <n> [--seed <s>]` - draw outcomes and print the observed distribution
//! - `start` - run the engine against the console host
//!
//! See the library crate docs for module-level details: `wildcard::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use wildcard::config::{Config, GameDocuments};
use wildcard::console::{run_console, ConsoleHost};
use wildcard::game::outcome::WEIGHT_TOTAL;
use wildcard::game::{start_engine, Engine, EngineOptions, JsonFileLedger, OutcomeKind};

#[derive(Parser)]
#[command(name = "wildcard")]
#[command(about = "Weighted random minigames for community chat")]
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
    /// Write default config and game documents
    Init,
    /// Validate config and game documents
    Check,
    /// Draw outcomes without touching any balance
    Simulate {
        /// Number of draws
        #[arg(short, long, default_value_t = 100_000)]
        draws: u64,
        /// RNG seed (defaults to the config seed, then entropy)
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Run the engine with the console host
    Start,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            if Path::new(&cli.config).exists() {
                warn!("{} already exists, leaving it alone", cli.config);
            } else {
                Config::create_default(&cli.config).await?;
                println!("Wrote {}", cli.config);
            }
            let config = Config::load(&cli.config).await?;
            config.create_default_documents().await?;
            println!(
                "Wrote {}, {} and {}",
                config.engine.ranges_file, config.engine.weights_file, config.engine.content_file
            );
            println!("Next: `wildcard check`, then `wildcard start`.");
        }
        Commands::Check => {
            let (_, documents) = load_all(&cli.config).await?;
            print_outcome_table(&documents);
            println!(
                "ranges ok: jackpot {}, steal {}..{}",
                documents.ranges.jackpot.amount,
                documents.ranges.steal.min,
                documents.ranges.steal.max
            );
            println!(
                "content ok: {} jokes, {} media links, {} trivia questions",
                documents.content.jokes.len(),
                documents.content.media.len(),
                documents.content.trivia.len()
            );
        }
        Commands::Simulate { draws, seed } => {
            let (config, documents) = load_all(&cli.config).await?;
            let mut rng = match seed.or(config.engine.seed) {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut counts: BTreeMap<OutcomeKind, u64> = BTreeMap::new();
            for _ in 0..draws {
                *counts.entry(documents.weights.draw(&mut rng)).or_insert(0) += 1;
            }
            println!("{:<20} {:>8} {:>9} {:>9}", "outcome", "count", "observed", "expected");
            for (kind, weight) in documents.weights.iter() {
                let count = counts.get(&kind).copied().unwrap_or(0);
                let observed = if draws == 0 {
                    0.0
                } else {
                    count as f64 * 100.0 / draws as f64
                };
                let expected = weight as f64 * 100.0 / WEIGHT_TOTAL as f64;
                println!(
                    "{:<20} {:>8} {:>8.2}% {:>8.2}%",
                    kind.key(),
                    count,
                    observed,
                    expected
                );
            }
        }
        Commands::Start => {
            let (config, documents) = load_all(&cli.config).await?;
            info!("Starting Wildcard v{}", env!("CARGO_PKG_VERSION"));
            let ledger = Arc::new(
                JsonFileLedger::open(&config.engine.data_dir, config.engine.starting_balance)
                    .map_err(|e| anyhow!("Failed to open ledger: {}", e))?,
            );
            let host = Arc::new(ConsoleHost::new());
            let (engine, expiries) = Engine::new(
                documents,
                EngineOptions::from(&config),
                ledger.clone(),
                host.clone(),
            );
            let handle = start_engine(engine, expiries);
            let outcome = run_console(handle.clone(), ledger, host).await;
            handle.shutdown().await;
            outcome?;
        }
    }

    Ok(())
}

async fn load_all(path: &str) -> Result<(Config, GameDocuments)> {
    let config = Config::load(path).await.map_err(|e| {
        error!("{}", e);
        e
    })?;
    let documents = config.load_documents().await.map_err(|e| {
        error!("Invalid game documents: {}", e);
        e
    })?;
    Ok((config, documents))
}

fn print_outcome_table(documents: &GameDocuments) {
    println!("{:<20} {:>6} {:>8} {:>12}", "outcome", "weight", "chance", "interactive");
    for (kind, weight) in documents.weights.iter() {
        println!(
            "{:<20} {:>6} {:>7.1}% {:>12}",
            kind.key(),
            weight,
            weight as f64 * 100.0 / WEIGHT_TOTAL as f64,
            if kind.is_interactive() { "yes" } else { "" }
        );
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    let file = log_file.and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match file {
        Some(f) => {
            let sink = std::sync::Mutex::new(f);
            // Mirror to the console only when someone is watching it
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = sink.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
