use sha2::{Digest, Sha256};

use crate::error::FinderError;

/// Bitcoin base58 alphabet: digits and letters minus 0, O, I, l.
const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Version prefixes for Base58Check encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    /// P2PKH address (mainnet)
    P2pkh,
    /// Private key WIF
    Wif,
}

impl Prefix {
    fn byte(self) -> u8 {
        match self {
            Prefix::P2pkh => 0x00,
            Prefix::Wif => 0x80,
        }
    }
}

/// First 4 bytes of SHA256(SHA256(data)).
pub fn checksum4(data: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Base58-encode the input interpreted as a big-endian unsigned integer.
/// Leading zero bytes map to leading '1' characters.
pub fn encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|&&b| b == 0).count();

    // base conversion over a little-endian digit buffer
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for &byte in &data[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    for _ in 0..zeros {
        out.push('1');
    }
    for &digit in digits.iter().rev() {
        out.push(ALPHABET[digit as usize] as char);
    }
    out
}

/// Inverse of `encode`, restoring leading zero bytes from leading '1's.
pub fn decode(encoded: &str) -> Result<Vec<u8>, FinderError> {
    let zeros = encoded.bytes().take_while(|&c| c == b'1').count();

    let mut bytes: Vec<u8> = Vec::with_capacity(encoded.len() * 733 / 1000 + 1);
    for c in encoded[zeros..].chars() {
        let value = digit_value(c).ok_or(FinderError::InvalidBase58Char(c))?;
        let mut carry = value as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}

/// Base58Check: version prefix + payload + 4-byte double-SHA256 checksum.
/// WIF callers append the 0x01 compressed-key marker to the payload first.
pub fn check_encode(prefix: Prefix, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 5);
    data.push(prefix.byte());
    data.extend_from_slice(payload);
    let check = checksum4(&data);
    data.extend_from_slice(&check);
    encode(&data)
}

/// Decode a Base58Check string, validating the checksum.
/// Returns version byte + payload with the checksum stripped.
pub fn check_decode(encoded: &str) -> Result<Vec<u8>, FinderError> {
    let raw = decode(encoded)?;
    if raw.len() < 5 {
        return Err(FinderError::TruncatedPayload);
    }
    let (data, check) = raw.split_at(raw.len() - 4);
    if checksum4(data).as_slice() != check {
        return Err(FinderError::ChecksumMismatch);
    }
    Ok(data.to_vec())
}

fn digit_value(c: char) -> Option<u8> {
    ALPHABET.iter().position(|&a| a as char == c).map(|i| i as u8)
}
