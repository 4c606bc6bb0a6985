use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::warn;

const WRITE_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Immutable record of a match, captured at the moment of discovery and
/// persisted before any halt decision is finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discovery {
    pub timestamp: String,
    pub attempt_number: u64,
    pub address: String,
    pub mnemonic: String,
    pub private_key_wif: String,
    pub elapsed_seconds: f64,
}

impl Discovery {
    pub fn new(
        attempt_number: u64,
        address: String,
        mnemonic: String,
        private_key_wif: String,
        elapsed_seconds: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            attempt_number,
            address,
            mnemonic,
            private_key_wif,
            elapsed_seconds,
        }
    }
}

/// Append-only JSON-lines log. Losing a match is the single most damaging
/// failure mode, so writes are retried and fsynced before returning; a
/// persistent failure is fatal to the search.
pub struct DiscoveryLog {
    path: PathBuf,
}

impl DiscoveryLog {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, discovery: &Discovery) -> Result<()> {
        let line = serde_json::to_string(discovery).context("failed to serialize discovery")?;

        let mut attempt = 1;
        loop {
            match self.write_line(&line) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < WRITE_ATTEMPTS => {
                    warn!(
                        "Discovery write attempt {}/{} failed: {:#}",
                        attempt, WRITE_ATTEMPTS, e
                    );
                    thread::sleep(RETRY_DELAY);
                    attempt += 1;
                }
                Err(e) => return Err(e.context("discovery record could not be persisted")),
            }
        }
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open discovery log: {}", self.path.display()))?;
        writeln!(file, "{}", line)?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let log = DiscoveryLog::new(dir.path().join("out/discoveries.jsonl")).unwrap();

        let first = Discovery::new(
            1,
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH".to_string(),
            "w0000 w0000 w0003".to_string(),
            "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn".to_string(),
            0.5,
        );
        let second = Discovery::new(42, "1abc".into(), "m".into(), "w".into(), 1.5);
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: Discovery = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.attempt_number, 1);
        assert_eq!(parsed.address, first.address);
        assert_eq!(parsed.private_key_wif, first.private_key_wif);

        let parsed: Discovery = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.attempt_number, 42);
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let log = DiscoveryLog {
            path: PathBuf::from("/nonexistent-root/discoveries.jsonl"),
        };
        let record = Discovery::new(1, "a".into(), "m".into(), "w".into(), 0.0);
        assert!(log.append(&record).is_err());
    }
}
