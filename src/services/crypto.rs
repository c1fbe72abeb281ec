use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::prelude::*;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 and return as hexadecimal string
///
/// Used for backup-code digests: deterministic for lookup, keyed so a
/// database leak alone cannot forge codes.
pub fn hmac_sha256_hex(key: &str, value: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(value.as_bytes());
    let result = mac.finalize();
    format!("{:x}", result.into_bytes())
}

/// SHA-256 hex digest, used only to verify legacy password records before
/// they are migrated to Argon2id on first successful login.
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Constant-time equality for fixed-format digest strings
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Generate an opaque random reference (32 bytes, base64)
///
/// Used for pending second-factor challenge references.
pub fn generate_opaque_ref() -> String {
    let mut rng = rand::rng();
    let random_bytes: [u8; 32] = rng.random();
    general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Generate a single backup code in the form "XXXX-XXXX"
///
/// The alphabet omits characters that are easily confused when read from
/// paper (0/O, 1/I/L).
pub fn generate_backup_code() -> String {
    const CHARSET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

    let mut rng = rand::rng();
    let mut code = String::with_capacity(9);
    for i in 0..8 {
        if i == 4 {
            code.push('-');
        }
        let idx = rng.random_range(0..CHARSET.len());
        code.push(CHARSET[idx] as char);
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_is_deterministic() {
        let a = hmac_sha256_hex("key-one", "ABCD-EFGH");
        let b = hmac_sha256_hex("key-one", "ABCD-EFGH");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hmac_differs_by_key() {
        let a = hmac_sha256_hex("key-one", "ABCD-EFGH");
        let b = hmac_sha256_hex("key-two", "ABCD-EFGH");
        assert_ne!(a, b);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abcdef", "abcdef"));
        assert!(!constant_time_eq("abcdef", "abcdeg"));
        assert!(!constant_time_eq("abcdef", "abcde"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_opaque_refs_are_unique() {
        let a = generate_opaque_ref();
        let b = generate_opaque_ref();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43); // 32 bytes, unpadded base64
    }

    #[test]
    fn test_backup_code_format() {
        let code = generate_backup_code();
        assert_eq!(code.len(), 9);
        assert_eq!(code.chars().nth(4), Some('-'));
        assert!(!code.contains('0'));
        assert!(!code.contains('O'));
        assert!(!code.contains('1'));
        assert!(!code.contains('I'));
    }

    #[test]
    fn test_sha256_hex_known_value() {
        // sha256("abc")
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
