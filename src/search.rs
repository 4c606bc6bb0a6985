use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::checkpoint::{ProgressFile, KEPT_CHECKPOINTS};
use crate::discovery::{Discovery, DiscoveryLog};
use crate::keys::{self, KeyDeriver, MasterKey};
use crate::mnemonic::{Mnemonic, Wordlist};
use crate::stats::Statistics;
use crate::targets::TargetSet;
use crate::utils::format_number;

const MONITOR_TICK: Duration = Duration::from_millis(200);

/// Terminal states of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// At least one target matched
    Found,
    /// Cancellation signal received
    Interrupted,
    /// Configured attempt budget exhausted without a match
    AttemptLimit,
}

/// Engine-level policy knobs
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Worker thread count; 0 means one per logical CPU
    pub workers: usize,
    pub checkpoint_interval: u64,
    pub halt_on_match: bool,
    pub max_attempts: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            checkpoint_interval: 10_000,
            halt_on_match: true,
            max_attempts: None,
        }
    }
}

/// The search loop: generate a mnemonic, derive seed -> master key ->
/// address, test membership, repeat. Wordlist and target set are shared
/// read-only; attempt claiming is a single atomic; only the discovery and
/// progress writers are serialized.
pub struct SearchEngine {
    wordlist: Arc<Wordlist>,
    targets: Arc<TargetSet>,
    stats: Statistics,
    cancel: Arc<AtomicBool>,
    discoveries: Mutex<DiscoveryLog>,
    progress: ProgressFile,
    options: SearchOptions,
}

impl SearchEngine {
    pub fn new(
        wordlist: Wordlist,
        targets: TargetSet,
        stats: Statistics,
        cancel: Arc<AtomicBool>,
        discoveries: DiscoveryLog,
        progress: ProgressFile,
        options: SearchOptions,
    ) -> Self {
        Self {
            wordlist: Arc::new(wordlist),
            targets: Arc::new(targets),
            stats,
            cancel,
            discoveries: Mutex::new(discoveries),
            progress,
            options,
        }
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Run until a match (with halt-on-match policy), cancellation, the
    /// attempt budget, or a fatal worker error. Statistics are flushed to
    /// the progress file on every exit path.
    pub fn run(&self) -> Result<SearchOutcome> {
        let workers = if self.options.workers == 0 {
            num_cpus::get()
        } else {
            self.options.workers
        };
        info!(
            "Search running: {} workers, {} targets, checkpoint every {} attempts",
            workers,
            format_number(self.targets.len() as u64),
            format_number(self.options.checkpoint_interval)
        );

        let worker_errors: Vec<anyhow::Error> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut rng = OsRng;
                        self.worker(&mut rng)
                    })
                })
                .collect();

            self.monitor(&handles);

            let mut errors = Vec::new();
            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => errors.push(e),
                    Err(_) => errors.push(anyhow!("search worker panicked")),
                }
            }
            errors
        });

        // Final statistics flush happens even on cancellation or error.
        self.stats.record_checkpoint();
        self.flush_progress();

        if let Some(error) = worker_errors.into_iter().next() {
            return Err(error);
        }
        Ok(self.outcome())
    }

    fn outcome(&self) -> SearchOutcome {
        if self.stats.found() > 0 {
            SearchOutcome::Found
        } else if self.cancel.load(Ordering::Relaxed) {
            SearchOutcome::Interrupted
        } else {
            SearchOutcome::AttemptLimit
        }
    }

    /// Checkpoint emission while workers run. Crossing a checkpoint mark
    /// records a snapshot and rewrites the progress file.
    fn monitor(&self, handles: &[thread::ScopedJoinHandle<'_, Result<()>>]) {
        let interval = self.options.checkpoint_interval;
        let mut next_mark = (self.stats.attempts() / interval + 1) * interval;

        loop {
            if handles.iter().all(|handle| handle.is_finished()) {
                break;
            }
            thread::sleep(MONITOR_TICK);

            while self.stats.attempts() >= next_mark {
                let checkpoint = self.stats.record_checkpoint();
                info!(
                    "Checkpoint: {} attempts | {:.2}/s | {} found | {:.1}s elapsed",
                    format_number(checkpoint.attempts),
                    checkpoint.attempts_per_second,
                    checkpoint.found_count,
                    checkpoint.elapsed_seconds
                );
                self.flush_progress();
                next_mark += interval;
            }
        }
    }

    fn flush_progress(&self) {
        let snapshot = self.stats.snapshot();
        let checkpoints = self.stats.recent_checkpoints(KEPT_CHECKPOINTS);
        if let Err(e) = self.progress.save(&snapshot, &checkpoints) {
            // advisory state: a failed write must not stop the search
            warn!("Progress write failed: {:#}", e);
        }
    }

    /// One worker: cancellation is checked once per iteration, so the
    /// longest uninterruptible unit is a single generate-derive-check cycle.
    fn worker<R: RngCore>(&self, rng: &mut R) -> Result<()> {
        let deriver = KeyDeriver::new();
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return Ok(());
            }
            let Some(attempt) = self.stats.claim_attempt(self.options.max_attempts) else {
                return Ok(());
            };

            match self.check_one(&deriver, rng, attempt) {
                Ok(true) if self.options.halt_on_match => {
                    self.cancel.store(true, Ordering::Relaxed);
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => {
                    // entropy or persistence failure: stop everyone
                    self.cancel.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            }
        }
    }

    /// Returns Ok(true) on a target hit, after the discovery record is
    /// durably written.
    fn check_one<R: RngCore>(&self, deriver: &KeyDeriver, rng: &mut R, attempt: u64) -> Result<bool> {
        let mnemonic = Mnemonic::generate(rng, &self.wordlist)?;
        let seed = keys::mnemonic_to_seed(mnemonic.phrase(), "")?;
        let master = MasterKey::from_seed(&seed)?;

        let address = match deriver.p2pkh_address(&master.private_key) {
            Ok(address) => address,
            Err(e) => {
                warn!("Skipping attempt {}: {:#}", attempt, e);
                return Ok(false);
            }
        };

        if !self.targets.contains(&address) {
            return Ok(false);
        }

        let wif = keys::private_key_to_wif(&master.private_key);
        let record = Discovery::new(
            attempt,
            address,
            mnemonic.into_phrase(),
            wif,
            self.stats.elapsed(),
        );

        // persisted before the halt decision so a match is never lost
        self.discoveries.lock().append(&record)?;
        self.stats.increment_found();
        info!(
            "MATCH at attempt {}: {} ({})",
            format_number(attempt),
            record.address,
            record.mnemonic
        );
        Ok(true)
    }
}
