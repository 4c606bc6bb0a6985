use anyhow::{bail, Context, Result};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;
use ripemd::Ripemd160;
use secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256, Sha512};

use crate::base58::{self, Prefix};

type HmacSha512 = Hmac<Sha512>;

pub const SEED_BYTES: usize = 64;
pub const KEY_BYTES: usize = 32;

const PBKDF2_ROUNDS: u32 = 2048;
const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// Master key material. The chain code is retained for hierarchical
/// derivation but unused by the search pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKey {
    pub private_key: [u8; KEY_BYTES],
    pub chain_code: [u8; KEY_BYTES],
}

impl MasterKey {
    /// First half of HMAC-SHA512("Bitcoin seed", seed) is the private key,
    /// second half the chain code.
    pub fn from_seed(seed: &[u8; SEED_BYTES]) -> Result<Self> {
        let mut mac = HmacSha512::new_from_slice(MASTER_HMAC_KEY)
            .context("failed to key master HMAC")?;
        mac.update(seed);
        let digest = mac.finalize().into_bytes();

        let mut private_key = [0u8; KEY_BYTES];
        let mut chain_code = [0u8; KEY_BYTES];
        private_key.copy_from_slice(&digest[..KEY_BYTES]);
        chain_code.copy_from_slice(&digest[KEY_BYTES..]);
        Ok(Self {
            private_key,
            chain_code,
        })
    }
}

/// PBKDF2-HMAC-SHA512 over the phrase, salt "mnemonic" + passphrase,
/// 2048 rounds. Pure and deterministic.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<[u8; SEED_BYTES]> {
    let salt = format!("mnemonic{}", passphrase);
    let mut seed = [0u8; SEED_BYTES];
    pbkdf2::<HmacSha512>(phrase.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut seed)
        .context("PBKDF2 seed derivation failed")?;
    Ok(seed)
}

/// Base58Check(0x80 || key || 0x01) - compressed-key WIF.
pub fn private_key_to_wif(private_key: &[u8; KEY_BYTES]) -> String {
    let mut payload = Vec::with_capacity(KEY_BYTES + 1);
    payload.extend_from_slice(private_key);
    payload.push(0x01);
    base58::check_encode(Prefix::Wif, &payload)
}

/// Address derivation over a reusable secp256k1 context.
pub struct KeyDeriver {
    secp: Secp256k1<All>,
}

impl KeyDeriver {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// P2PKH address of the compressed secp256k1 public key:
    /// Base58Check(0x00 || RIPEMD160(SHA256(pubkey))).
    pub fn p2pkh_address(&self, private_key: &[u8; KEY_BYTES]) -> Result<String> {
        let secret = SecretKey::from_slice(private_key)
            .context("derived private key is outside the curve order")?;
        let public = PublicKey::from_secret_key(&self.secp, &secret);
        let hash160 = hash160(&public.serialize());
        Ok(base58::check_encode(Prefix::P2pkh, &hash160))
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new()
    }
}

fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Known-answer check of the whole derivation pipeline, run once at startup.
pub fn self_check() -> Result<()> {
    const REFERENCE_PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const REFERENCE_SEED: &str =
        "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
         9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";

    let seed = mnemonic_to_seed(REFERENCE_PHRASE, "")?;
    if hex::encode(seed) != REFERENCE_SEED {
        bail!("seed derivation self-check failed");
    }

    let master = MasterKey::from_seed(&seed)?;
    let wif = private_key_to_wif(&master.private_key);
    let decoded = base58::check_decode(&wif).context("WIF self-check decode failed")?;
    if decoded.len() != KEY_BYTES + 2
        || decoded[0] != 0x80
        || decoded[KEY_BYTES + 1] != 0x01
        || decoded[1..=KEY_BYTES] != master.private_key
    {
        bail!("WIF round-trip self-check failed");
    }

    let address = KeyDeriver::new().p2pkh_address(&master.private_key)?;
    if !address.starts_with('1') {
        bail!("address derivation self-check failed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_seed_golden_vector() {
        let seed = mnemonic_to_seed(REFERENCE_PHRASE, "").unwrap();
        assert_eq!(
            hex::encode(seed),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
             9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
    }

    #[test]
    fn test_passphrase_changes_seed() {
        let plain = mnemonic_to_seed(REFERENCE_PHRASE, "").unwrap();
        let salted = mnemonic_to_seed(REFERENCE_PHRASE, "TREZOR").unwrap();
        assert_ne!(plain, salted);
    }

    #[test]
    fn test_master_key_split() {
        let seed = mnemonic_to_seed(REFERENCE_PHRASE, "").unwrap();
        let master = MasterKey::from_seed(&seed).unwrap();
        assert_ne!(master.private_key, master.chain_code);
        assert_eq!(master, MasterKey::from_seed(&seed).unwrap());
    }

    #[test]
    fn test_wif_known_vector() {
        // compressed WIF of secret key 1
        let mut key = [0u8; KEY_BYTES];
        key[KEY_BYTES - 1] = 1;
        assert_eq!(
            private_key_to_wif(&key),
            "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn"
        );
    }

    #[test]
    fn test_wif_single_byte_sensitivity() {
        let key = [0x42u8; KEY_BYTES];
        let wif = private_key_to_wif(&key);
        assert_eq!(private_key_to_wif(&key), wif);

        let mut flipped = key;
        flipped[17] ^= 0x01;
        assert_ne!(private_key_to_wif(&flipped), wif);
    }

    #[test]
    fn test_p2pkh_known_vector() {
        // compressed P2PKH address of secret key 1
        let mut key = [0u8; KEY_BYTES];
        key[KEY_BYTES - 1] = 1;
        let deriver = KeyDeriver::new();
        assert_eq!(
            deriver.p2pkh_address(&key).unwrap(),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
    }

    #[test]
    fn test_p2pkh_rejects_zero_key() {
        let deriver = KeyDeriver::new();
        assert!(deriver.p2pkh_address(&[0u8; KEY_BYTES]).is_err());
    }

    #[test]
    fn test_self_check_passes() {
        self_check().unwrap();
    }
}
