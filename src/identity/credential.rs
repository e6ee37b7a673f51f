//! API-key minting and verification
//!
//! Keys have the shape `ethos_{agent_id}_{secret}` where the secret is 24
//! random bytes from the OS RNG, hex-encoded. Storage keeps only
//! `SHA-256(salt || secret)` with a fresh per-agent salt.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

const KEY_PREFIX: &str = "ethos";
const SECRET_BYTES: usize = 24;
const SALT_BYTES: usize = 16;

/// Stored credential material: per-agent salt and the salted key hash,
/// both hex-encoded. The plaintext key is never stored.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub salt: String,
    pub key_hash: String,
}

/// Mint a fresh API key for an agent. Returns the plaintext (shown to the
/// caller exactly once) and the record to store.
pub fn mint_api_key(agent_id: i64) -> (String, CredentialRecord) {
    let mut secret = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut secret);

    let mut salt = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt);

    let plaintext = format!("{}_{}_{}", KEY_PREFIX, agent_id, hex_encode(&secret));
    let record = CredentialRecord {
        salt: hex_encode(&salt),
        key_hash: salted_hash(&salt, &plaintext),
    };

    (plaintext, record)
}

/// Verify a presented key against a stored record. Constant-time over the
/// hash comparison.
pub fn verify_api_key(record: &CredentialRecord, presented: &str) -> bool {
    let salt = match hex_decode(&record.salt) {
        Some(salt) => salt,
        None => return false,
    };
    let expected = match hex_decode(&record.key_hash) {
        Some(hash) => hash,
        None => return false,
    };

    let presented_hash = Sha256::new()
        .chain_update(&salt)
        .chain_update(presented.as_bytes())
        .finalize();

    constant_time_eq(&expected, presented_hash.as_slice())
}

/// Extract the agent id embedded in a key, if the shape is plausible.
pub fn parse_agent_id(presented: &str) -> Option<i64> {
    let mut parts = presented.splitn(3, '_');
    if parts.next() != Some(KEY_PREFIX) {
        return None;
    }
    let id = parts.next()?.parse::<i64>().ok()?;
    // The secret segment must be present and non-empty.
    match parts.next() {
        Some(secret) if !secret.is_empty() => Some(id),
        _ => None,
    }
}

fn salted_hash(salt: &[u8], plaintext: &str) -> String {
    let digest = Sha256::new()
        .chain_update(salt)
        .chain_update(plaintext.as_bytes())
        .finalize();
    format!("{:x}", digest)
}

/// Byte-wise comparison that does not short-circuit on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_key_verifies() {
        let (plaintext, record) = mint_api_key(42);
        assert!(plaintext.starts_with("ethos_42_"));
        assert!(verify_api_key(&record, &plaintext));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (_, record) = mint_api_key(42);
        let (other, _) = mint_api_key(42);
        assert!(!verify_api_key(&record, &other));
        assert!(!verify_api_key(&record, "ethos_42_deadbeef"));
        assert!(!verify_api_key(&record, ""));
    }

    #[test]
    fn test_mint_is_unique_per_call() {
        let (a, _) = mint_api_key(1);
        let (b, _) = mint_api_key(1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_agent_id() {
        let (plaintext, _) = mint_api_key(99);
        assert_eq!(parse_agent_id(&plaintext), Some(99));

        assert_eq!(parse_agent_id("ethos_99"), None);
        assert_eq!(parse_agent_id("ethos_99_"), None);
        assert_eq!(parse_agent_id("other_99_abc"), None);
        assert_eq!(parse_agent_id("ethos_notanumber_abc"), None);
        assert_eq!(parse_agent_id(""), None);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abcd", b"abcd"));
        assert!(!constant_time_eq(b"abcd", b"abce"));
        assert!(!constant_time_eq(b"abcd", b"abc"));
    }

    #[test]
    fn test_hex_round_trip() {
        let bytes = [0u8, 15, 16, 255];
        let encoded = hex_encode(&bytes);
        assert_eq!(encoded, "000f10ff");
        assert_eq!(hex_decode(&encoded).unwrap(), bytes);
        assert!(hex_decode("0f0").is_none());
        assert!(hex_decode("zz").is_none());
    }
}
