// lib.rs - BIP39 mnemonic collision scanner library

pub mod base58;
pub mod checkpoint;
pub mod config;
pub mod discovery;
pub mod keys;
pub mod mnemonic;
pub mod search;
pub mod stats;
pub mod targets;

// Re-exports for convenience
pub use checkpoint::{ProgressFile, ProgressState};
pub use config::Config;
pub use discovery::{Discovery, DiscoveryLog};
pub use keys::KeyDeriver;
pub use mnemonic::{Mnemonic, Wordlist};
pub use search::{SearchEngine, SearchOutcome};
pub use stats::{Checkpoint, Statistics};
pub use targets::TargetSet;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum FinderError {
        #[error("wordlist must contain exactly 2048 words, found {0}")]
        WordlistSize(usize),

        #[error("wordlist contains duplicate word {0:?}")]
        DuplicateWord(String),

        #[error("no usable target addresses in {0}")]
        EmptyTargets(String),

        #[error("invalid base58 character {0:?}")]
        InvalidBase58Char(char),

        #[error("base58check payload too short")]
        TruncatedPayload,

        #[error("base58check checksum mismatch")]
        ChecksumMismatch,
    }
}

/// Utilities module
pub mod utils {

    /// Format duration in human-readable format
    pub fn format_duration(seconds: f64) -> String {
        if seconds < 60.0 {
            format!("{:.1}s", seconds)
        } else if seconds < 3600.0 {
            format!("{:.1}m", seconds / 60.0)
        } else if seconds < 86400.0 {
            format!("{:.1}h", seconds / 3600.0)
        } else {
            format!("{:.1}d", seconds / 86400.0)
        }
    }

    /// Format number with thousands separator
    pub fn format_number(n: u64) -> String {
        let s = n.to_string();
        let mut result = String::new();
        for (i, c) in s.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }
        result.chars().rev().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(utils::format_duration(30.0), "30.0s");
        assert_eq!(utils::format_duration(120.0), "2.0m");
        assert_eq!(utils::format_duration(7200.0), "2.0h");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(utils::format_number(1000), "1,000");
        assert_eq!(utils::format_number(1234567), "1,234,567");
    }
}
