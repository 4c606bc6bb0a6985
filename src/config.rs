use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub files: FileConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// BIP39 wordlist, 2048 lines
    pub wordlist: String,

    /// Target address list, one per line
    pub targets: String,

    /// Append-only discovery log
    pub discoveries: String,

    /// Periodically rewritten progress snapshot
    pub progress: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Attempts between checkpoint snapshots
    pub checkpoint_interval: u64,

    /// Worker threads; 0 = one per logical CPU
    #[serde(default)]
    pub workers: usize,

    /// Stop after the first match, or keep searching
    #[serde(default = "default_halt_on_match")]
    pub halt_on_match: bool,

    /// Attempt budget; 0 = unbounded
    #[serde(default)]
    pub max_attempts: u64,
}

fn default_halt_on_match() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse TOML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.search.checkpoint_interval == 0 {
            bail!("search.checkpoint_interval must be >= 1");
        }
        if self.search.checkpoint_interval > 100_000_000 {
            bail!(
                "search.checkpoint_interval is too high (>{})",
                100_000_000
            );
        }
        if self.search.workers > 1024 {
            bail!("search.workers is too high (>{})", 1024);
        }

        for (name, path) in [
            ("files.wordlist", &self.files.wordlist),
            ("files.targets", &self.files.targets),
            ("files.discoveries", &self.files.discoveries),
            ("files.progress", &self.files.progress),
        ] {
            if path.trim().is_empty() {
                bail!("{} must not be empty", name);
            }
        }

        Ok(())
    }

    /// Attempt budget as an Option; 0 in the file means unbounded.
    pub fn max_attempts(&self) -> Option<u64> {
        (self.search.max_attempts > 0).then_some(self.search.max_attempts)
    }

    /// Create default configuration text
    pub fn default_toml() -> String {
        r#"[files]
wordlist = "wordlist.txt"
targets = "P2PKH.txt"
discoveries = "output/discoveries.jsonl"
progress = "output/progress.json"

[search]
# Attempts between checkpoint snapshots
checkpoint_interval = 10000
# Worker threads; 0 = one per logical CPU
workers = 0
# Stop after the first match
halt_on_match = true
# Attempt budget; 0 = unbounded
max_attempts = 0
"#
        .to_string()
    }

    /// Save default config to file
    pub fn save_default(path: &str) -> Result<()> {
        fs::write(path, Self::default_toml()).context("Failed to write default config")?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            files: FileConfig {
                wordlist: "wordlist.txt".to_string(),
                targets: "P2PKH.txt".to_string(),
                discoveries: "output/discoveries.jsonl".to_string(),
                progress: "output/progress.json".to_string(),
            },
            search: SearchConfig {
                checkpoint_interval: 10_000,
                workers: 0,
                halt_on_match: true,
                max_attempts: 0,
            },
        }
    }
}
