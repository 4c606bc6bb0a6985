use anyhow::{Context, Result};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

use crate::error::FinderError;

/// BIP39 english wordlist size; word indices are 11 bits wide.
pub const WORDLIST_LEN: usize = 2048;

/// Entropy for a 12-word phrase
pub const ENTROPY_BYTES: usize = 16;

pub const WORD_COUNT: usize = 12;

/// Ordered 2048-word dictionary. Index position defines the word <-> integer
/// mapping, so the list is validated once and immutable afterwards.
pub struct Wordlist {
    words: Vec<String>,
    index: HashMap<String, u16>,
}

impl Wordlist {
    /// Load a newline-delimited wordlist. Exactly 2048 non-empty trimmed
    /// lines are required; anything else aborts before the engine runs.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open wordlist: {}", path.display()))?;

        let mut words = Vec::with_capacity(WORDLIST_LEN);
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("failed to read wordlist: {}", path.display()))?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                words.push(trimmed.to_string());
            }
        }

        let wordlist = Self::from_words(words)?;
        info!("Loaded {} wordlist entries from {}", wordlist.len(), path.display());
        Ok(wordlist)
    }

    pub fn from_words(words: Vec<String>) -> Result<Self, FinderError> {
        if words.len() != WORDLIST_LEN {
            return Err(FinderError::WordlistSize(words.len()));
        }

        let mut index = HashMap::with_capacity(WORDLIST_LEN);
        for (i, word) in words.iter().enumerate() {
            if index.insert(word.clone(), i as u16).is_some() {
                return Err(FinderError::DuplicateWord(word.clone()));
            }
        }

        Ok(Self { words, index })
    }

    pub fn word(&self, index: u16) -> &str {
        &self.words[index as usize]
    }

    pub fn index_of(&self, word: &str) -> Option<u16> {
        self.index.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// A checksummed 12-word phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mnemonic {
    phrase: String,
}

impl Mnemonic {
    /// Draw 16 bytes from `rng` and build the phrase. An entropy-source
    /// failure is fatal; there is no weaker fallback.
    pub fn generate<R: RngCore>(rng: &mut R, wordlist: &Wordlist) -> Result<Self> {
        let mut entropy = [0u8; ENTROPY_BYTES];
        rng.try_fill_bytes(&mut entropy)
            .context("entropy source exhausted")?;
        Ok(Self::from_entropy(&entropy, wordlist))
    }

    /// Deterministic phrase construction: the twelve consecutive big-endian
    /// 11-bit groups of (entropy || top 4 bits of SHA-256(entropy)).
    pub fn from_entropy(entropy: &[u8; ENTROPY_BYTES], wordlist: &Wordlist) -> Self {
        let indices = word_indices(entropy);
        let words: Vec<&str> = indices.iter().map(|&i| wordlist.word(i)).collect();
        Self {
            phrase: words.join(" "),
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn into_phrase(self) -> String {
        self.phrase
    }

    /// Recompute the checksum nibble from the first 128 bits of the phrase
    /// and compare it with the last 4 bits.
    pub fn verify_phrase(phrase: &str, wordlist: &Wordlist) -> bool {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.len() != WORD_COUNT {
            return false;
        }

        let mut bits = [0u8; 17];
        for (group, word) in words.iter().enumerate() {
            let Some(index) = wordlist.index_of(word) else {
                return false;
            };
            for bit in 0..11 {
                if index & (1 << (10 - bit)) != 0 {
                    let pos = group * 11 + bit;
                    bits[pos / 8] |= 1 << (7 - (pos % 8));
                }
            }
        }

        let mut entropy = [0u8; ENTROPY_BYTES];
        entropy.copy_from_slice(&bits[..ENTROPY_BYTES]);
        let checksum = bits[16] >> 4;
        Sha256::digest(entropy)[0] >> 4 == checksum
    }
}

fn word_indices(entropy: &[u8; ENTROPY_BYTES]) -> [u16; WORD_COUNT] {
    // 132-bit stream: 128 entropy bits then the checksum nibble
    let mut bits = [0u8; 17];
    bits[..ENTROPY_BYTES].copy_from_slice(entropy);
    bits[16] = Sha256::digest(entropy)[0] & 0xf0;

    let mut indices = [0u16; WORD_COUNT];
    for (group, index) in indices.iter_mut().enumerate() {
        let start = group * 11;
        let mut value = 0u16;
        for pos in start..start + 11 {
            let bit = (bits[pos / 8] >> (7 - (pos % 8))) & 1;
            value = (value << 1) | bit as u16;
        }
        *index = value;
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use std::io::Write;

    fn test_wordlist() -> Wordlist {
        let words = (0..WORDLIST_LEN).map(|i| format!("w{:04}", i)).collect();
        Wordlist::from_words(words).unwrap()
    }

    #[test]
    fn test_zero_entropy_indices() {
        // SHA-256 of 16 zero bytes starts 0x37, so the checksum nibble is 3
        // and the last word index is 3 ("about" in the reference list).
        let indices = word_indices(&[0u8; ENTROPY_BYTES]);
        assert_eq!(&indices[..11], &[0u16; 11]);
        assert_eq!(indices[11], 3);
    }

    #[test]
    fn test_from_entropy_phrase() {
        let wordlist = test_wordlist();
        let mnemonic = Mnemonic::from_entropy(&[0u8; ENTROPY_BYTES], &wordlist);
        let words: Vec<&str> = mnemonic.phrase().split(' ').collect();
        assert_eq!(words.len(), WORD_COUNT);
        assert!(words[..11].iter().all(|&w| w == "w0000"));
        assert_eq!(words[11], "w0003");
    }

    #[test]
    fn test_checksum_property() {
        let wordlist = test_wordlist();
        let samples: Vec<[u8; ENTROPY_BYTES]> = vec![
            [0u8; ENTROPY_BYTES],
            [0xff; ENTROPY_BYTES],
            [0x5a; ENTROPY_BYTES],
            *b"0123456789abcdef",
            [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16],
        ];
        for entropy in samples {
            let mnemonic = Mnemonic::from_entropy(&entropy, &wordlist);
            assert!(
                Mnemonic::verify_phrase(mnemonic.phrase(), &wordlist),
                "checksum failed for {:?}",
                entropy
            );
        }
    }

    #[test]
    fn test_tampered_phrase_fails_checksum() {
        let wordlist = test_wordlist();
        let mnemonic = Mnemonic::from_entropy(b"0123456789abcdef", &wordlist);
        let mut words: Vec<&str> = mnemonic.phrase().split(' ').collect();

        // flip the lowest checksum bit: entropy is unchanged, so the
        // recomputed checksum can no longer match
        let last = wordlist.index_of(words[11]).unwrap();
        let tampered = wordlist.word(last ^ 1);
        words[11] = tampered;
        assert!(!Mnemonic::verify_phrase(&words.join(" "), &wordlist));
    }

    #[test]
    fn test_verify_rejects_unknown_words_and_bad_length() {
        let wordlist = test_wordlist();
        assert!(!Mnemonic::verify_phrase("nope nope nope", &wordlist));
        let eleven = vec!["w0000"; 11].join(" ");
        assert!(!Mnemonic::verify_phrase(&eleven, &wordlist));
    }

    #[test]
    fn test_generate_is_deterministic_for_fixed_rng() {
        let wordlist = test_wordlist();
        let mut rng = StepRng::new(0, 0);
        let mnemonic = Mnemonic::generate(&mut rng, &wordlist).unwrap();
        let expected = Mnemonic::from_entropy(&[0u8; ENTROPY_BYTES], &wordlist);
        assert_eq!(mnemonic, expected);
    }

    #[test]
    fn test_wordlist_size_is_hard_error() {
        let words: Vec<String> = (0..100).map(|i| format!("w{}", i)).collect();
        assert!(matches!(
            Wordlist::from_words(words),
            Err(FinderError::WordlistSize(100))
        ));
    }

    #[test]
    fn test_wordlist_rejects_duplicates() {
        let mut words: Vec<String> = (0..WORDLIST_LEN).map(|i| format!("w{:04}", i)).collect();
        words[2047] = "w0000".to_string();
        assert!(matches!(
            Wordlist::from_words(words),
            Err(FinderError::DuplicateWord(_))
        ));
    }

    #[test]
    fn test_wordlist_load_trims_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..WORDLIST_LEN {
            writeln!(file, "  w{:04}  ", i).unwrap();
            if i % 100 == 0 {
                writeln!(file).unwrap();
            }
        }
        file.flush().unwrap();

        let wordlist = Wordlist::load(file.path()).unwrap();
        assert_eq!(wordlist.len(), WORDLIST_LEN);
        assert_eq!(wordlist.word(42), "w0042");
        assert_eq!(wordlist.index_of("w2047"), Some(2047));
    }

    #[test]
    fn test_wordlist_load_rejects_short_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..100 {
            writeln!(file, "w{:04}", i).unwrap();
        }
        file.flush().unwrap();
        assert!(Wordlist::load(file.path()).is_err());
    }
}
