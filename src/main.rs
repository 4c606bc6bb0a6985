use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use seedscan::checkpoint::ProgressFile;
use seedscan::discovery::DiscoveryLog;
use seedscan::keys;
use seedscan::mnemonic::Wordlist;
use seedscan::search::{SearchEngine, SearchOptions, SearchOutcome};
use seedscan::stats::Statistics;
use seedscan::targets::TargetSet;
use seedscan::utils::{format_duration, format_number};
use seedscan::Config;

/// High-throughput BIP39 mnemonic collision scanner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Write a default config file and exit
    #[arg(long)]
    write_default_config: bool,

    /// Resume the attempt counter from the progress file
    #[arg(short, long)]
    resume: bool,

    /// Worker threads (overrides config; 0 = one per logical CPU)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Max attempts (overrides config; 0 = unbounded)
    #[arg(short, long)]
    max_attempts: Option<u64>,

    /// Keep searching after a match instead of halting
    #[arg(long)]
    continue_on_match: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    display_banner();

    if args.write_default_config {
        Config::save_default(&args.config)?;
        info!("Default configuration written to: {}", args.config);
        return Ok(());
    }

    let config = Config::load(&args.config)?;
    info!("Configuration loaded from: {}", args.config);

    // Known-answer check before burning CPU on a broken crypto stack
    keys::self_check().context("derivation self-check failed")?;
    info!("Derivation self-check passed");

    let wordlist = Wordlist::load(&config.files.wordlist)?;
    let targets = TargetSet::load(&config.files.targets)?;

    let progress = ProgressFile::new(config.files.progress.clone())?;
    let base_attempts = if args.resume {
        match progress.load()? {
            Some(state) => {
                info!(
                    "Resuming attempt counter at {} (last update {})",
                    format_number(state.stats.total_attempts),
                    state.last_update
                );
                state.stats.total_attempts
            }
            None => {
                warn!("No progress file found, starting fresh");
                0
            }
        }
    } else {
        0
    };

    let options = SearchOptions {
        workers: args.workers.unwrap_or(config.search.workers),
        checkpoint_interval: config.search.checkpoint_interval,
        halt_on_match: !args.continue_on_match && config.search.halt_on_match,
        max_attempts: match args.max_attempts {
            Some(0) => None,
            Some(n) => Some(n),
            None => config.max_attempts(),
        },
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_signal = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping...");
        cancel_signal.store(true, Ordering::Relaxed);
    })
    .context("failed to install Ctrl-C handler")?;

    let discoveries = DiscoveryLog::new(config.files.discoveries.clone())?;
    let engine = SearchEngine::new(
        wordlist,
        targets,
        Statistics::with_base(base_attempts),
        cancel,
        discoveries,
        progress,
        options,
    );

    info!("Press Ctrl+C to stop");
    let outcome = engine.run()?;

    let stats = engine.stats().snapshot();
    info!("═══════════════════════════════════════════════");
    info!("FINAL STATISTICS:");
    info!("Attempts: {}", format_number(stats.total_attempts));
    info!("Found: {}", stats.total_found);
    info!("Rate: {:.2} attempts/s", stats.attempts_per_second);
    info!("Elapsed: {}", format_duration(stats.elapsed_seconds));
    info!("═══════════════════════════════════════════════");

    match outcome {
        SearchOutcome::Found => {
            info!("Match found - details in {}", config.files.discoveries);
        }
        SearchOutcome::Interrupted => {
            info!("Search interrupted, progress saved to {}", config.files.progress);
        }
        SearchOutcome::AttemptLimit => {
            info!("Attempt budget exhausted without a match");
        }
    }

    Ok(())
}

fn display_banner() {
    println!(
        "
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║   SEEDSCAN v{}  -  BIP39 Mnemonic Collision Scanner    ║
║                                                           ║
║   Research tool: the 2^128 search space means a genuine   ║
║   collision is not a realistic expectation.               ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
    ",
        seedscan::VERSION
    );
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .init();

    Ok(())
}
