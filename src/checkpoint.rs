use anyhow::{Context, Result};
use chrono::Utc;
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::stats::{Checkpoint, StatsSnapshot};

/// Trailing checkpoints kept in the progress file
pub const KEPT_CHECKPOINTS: usize = 10;

/// Durable progress snapshot. Advisory state: a fresh run is correct
/// without it, a resumed run reads the attempt counter back from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressState {
    pub last_update: String,
    pub stats: StatsSnapshot,
    pub checkpoints: Vec<Checkpoint>,
}

pub struct ProgressFile {
    path: PathBuf,
    write_lock: Mutex<()>, // process-level write serialization
}

impl ProgressFile {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the progress file (temp file + rename) under an
    /// exclusive lock, keeping the most recent checkpoints only.
    pub fn save(&self, stats: &StatsSnapshot, checkpoints: &[Checkpoint]) -> Result<()> {
        let _guard = self.write_lock.lock();

        let skip = checkpoints.len().saturating_sub(KEPT_CHECKPOINTS);
        let state = ProgressState {
            last_update: Utc::now().to_rfc3339(),
            stats: stats.clone(),
            checkpoints: checkpoints[skip..].to_vec(),
        };

        let temp_path = self
            .path
            .with_extension(format!("tmp.{}", std::process::id()));
        let file = File::create(&temp_path).context("failed to create temp progress file")?;
        file.lock_exclusive()
            .context("failed to lock temp progress file")?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &state).context("failed to write progress")?;
        writer.flush().context("failed to flush progress file")?;
        drop(writer);

        match fs::rename(&temp_path, &self.path) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e).context("failed to replace progress file")
            }
        }
    }

    /// Load the last saved state, if any.
    pub fn load(&self) -> Result<Option<ProgressState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path).context("failed to open progress file")?;
        file.lock_shared().context("failed to lock progress file")?;

        let state: ProgressState = serde_json::from_reader(BufReader::new(file))
            .context("failed to parse progress file")?;
        Ok(Some(state))
    }
}
