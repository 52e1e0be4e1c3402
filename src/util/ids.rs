use chrono::Utc;
use rand::Rng;
use sha1::{Digest, Sha1};

const ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_LENGTH: usize = 8;

fn random_fragment(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

fn timestamp_fragment() -> String {
    let mut millis = Utc::now().timestamp_millis().max(0) as u64;
    if millis == 0 {
        return "0".to_string();
    }
    let mut encoded = Vec::new();
    while millis > 0 {
        encoded.push(ID_ALPHABET[(millis % 36) as usize]);
        millis /= 36;
    }
    encoded.reverse();
    encoded.into_iter().map(|byte| byte as char).collect()
}

/// Generates a fresh document identifier. Collisions within a collection are
/// not checked for; the random prefix plus millisecond timestamp makes them
/// unlikely enough for a single-writer store.
pub fn random_document_id() -> String {
    format!("doc-{}{}", random_fragment(RANDOM_LENGTH), timestamp_fragment())
}

/// Generates a random user identifier with the given prefix.
pub fn random_uid(prefix: &str) -> String {
    format!("{prefix}-{}{}", random_fragment(RANDOM_LENGTH), timestamp_fragment())
}

/// Derives a stable user identifier from a custom token. The same token always
/// produces the same uid, so test fixtures signed with a known token land on a
/// reproducible identity.
pub fn token_derived_uid(token: &str) -> String {
    let digest = Sha1::digest(token.as_bytes());
    let fragment: String = digest
        .iter()
        .take(8)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    format!("custom-{fragment}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_are_unique_and_prefixed() {
        let first = random_document_id();
        let second = random_document_id();
        assert!(first.starts_with("doc-"));
        assert_ne!(first, second);
    }

    #[test]
    fn uid_carries_prefix() {
        assert!(random_uid("anon").starts_with("anon-"));
    }

    #[test]
    fn token_uid_is_deterministic() {
        assert_eq!(token_derived_uid("abc"), token_derived_uid("abc"));
        assert_ne!(token_derived_uid("abc"), token_derived_uid("xyz"));
        assert!(token_derived_uid("abc").starts_with("custom-"));
    }
}
