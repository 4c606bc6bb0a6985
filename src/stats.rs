// ============================================================================
// stats.rs - Search statistics tracking
// ============================================================================

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Periodic performance checkpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub timestamp: String,
    pub attempts: u64,
    pub elapsed_seconds: f64,
    pub attempts_per_second: f64,
    pub found_count: u64,
}

/// Aggregate snapshot handed to the persistence layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_attempts: u64,
    pub total_found: u64,
    pub elapsed_seconds: f64,
    pub attempts_per_second: f64,
}

/// Thread-safe statistics owned by the search engine. Workers touch only the
/// atomic counters; the checkpoint list sits behind a short-held lock on the
/// monitor path.
pub struct Statistics {
    attempts: AtomicU64,
    found: AtomicU64,
    session_base: u64,
    started: Instant,
    checkpoints: Mutex<Vec<Checkpoint>>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::with_base(0)
    }

    /// `base` carries the attempt counter of a resumed run forward.
    pub fn with_base(base: u64) -> Self {
        Self {
            attempts: AtomicU64::new(base),
            found: AtomicU64::new(0),
            session_base: base,
            started: Instant::now(),
            checkpoints: Mutex::new(Vec::new()),
        }
    }

    /// Claim the next attempt number, or None once `limit` is reached.
    /// A single relaxed fetch_update keeps numbering exact across workers;
    /// 2048 PBKDF2 rounds per attempt make its cost invisible.
    pub fn claim_attempt(&self, limit: Option<u64>) -> Option<u64> {
        self.attempts
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| match limit {
                Some(max) if n >= max => None,
                _ => Some(n + 1),
            })
            .ok()
            .map(|previous| previous + 1)
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    pub fn increment_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Session throughput, computed lazily on demand.
    pub fn rate(&self) -> f64 {
        let elapsed = self.elapsed();
        if elapsed > 0.0 {
            (self.attempts().saturating_sub(self.session_base)) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_attempts: self.attempts(),
            total_found: self.found(),
            elapsed_seconds: self.elapsed(),
            attempts_per_second: self.rate(),
        }
    }

    /// Capture a checkpoint record and append it to the history.
    pub fn record_checkpoint(&self) -> Checkpoint {
        let checkpoint = Checkpoint {
            timestamp: Utc::now().to_rfc3339(),
            attempts: self.attempts(),
            elapsed_seconds: self.elapsed(),
            attempts_per_second: self.rate(),
            found_count: self.found(),
        };
        self.checkpoints.lock().push(checkpoint.clone());
        checkpoint
    }

    /// Most recent `n` checkpoints, oldest first.
    pub fn recent_checkpoints(&self, n: usize) -> Vec<Checkpoint> {
        let checkpoints = self.checkpoints.lock();
        let skip = checkpoints.len().saturating_sub(n);
        checkpoints[skip..].to_vec()
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}
