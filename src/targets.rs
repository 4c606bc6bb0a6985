use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::FinderError;
use crate::utils::format_number;

const REPORT_EVERY: u64 = 50_000;
const ADDRESS_PREFIX: char = '1';
const MIN_ADDRESS_LEN: usize = 26;

/// Candidate addresses loaded once at startup. Membership test only;
/// never mutated while the search runs.
pub struct TargetSet {
    addresses: HashSet<String>,
}

impl TargetSet {
    /// Load a newline-delimited target file. A line is accepted only if,
    /// after trimming, it is non-empty, starts with '1' and is at least
    /// 26 characters long.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open target file: {}", path.display()))?;

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}").unwrap());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(format!("Loading targets: {}", path.display()));

        let mut addresses = HashSet::new();
        let mut line_count = 0u64;
        for line in BufReader::new(file).lines() {
            let line =
                line.with_context(|| format!("failed to read target file: {}", path.display()))?;
            line_count += 1;

            let trimmed = line.trim();
            if !trimmed.is_empty()
                && trimmed.starts_with(ADDRESS_PREFIX)
                && trimmed.len() >= MIN_ADDRESS_LEN
            {
                addresses.insert(trimmed.to_string());
            }

            if line_count % REPORT_EVERY == 0 {
                spinner.set_message(format!(
                    "Loading targets: {} lines, {} accepted",
                    format_number(line_count),
                    format_number(addresses.len() as u64)
                ));
            }
        }
        spinner.finish_and_clear();

        if addresses.is_empty() {
            return Err(FinderError::EmptyTargets(path.display().to_string()).into());
        }

        info!(
            "Loaded {} target addresses from {} lines",
            format_number(addresses.len() as u64),
            format_number(line_count)
        );
        Ok(Self { addresses })
    }

    pub fn from_addresses(addresses: impl IntoIterator<Item = String>) -> Self {
        Self {
            addresses: addresses.into_iter().collect(),
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_acceptance_rules() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy").unwrap(); // wrong prefix
        writeln!(file, "1Short").unwrap(); // too short
        writeln!(file, "16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM").unwrap();
        writeln!(file, "16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM").unwrap(); // duplicate
        file.flush().unwrap();

        let targets = TargetSet::load(file.path()).unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets.contains("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"));
        assert!(targets.contains("16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM"));
        assert!(!targets.contains("1Short"));
    }

    #[test]
    fn test_empty_set_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not-an-address").unwrap();
        file.flush().unwrap();
        assert!(TargetSet::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(TargetSet::load("/nonexistent/targets.txt").is_err());
    }
}
