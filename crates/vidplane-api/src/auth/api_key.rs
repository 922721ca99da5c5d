//! API key generation, format validation, and hashing.

use regex::Regex;
use std::sync::OnceLock;
use vidplane_core::AppError;

/// Length of the prefix stored for lookup: `vp_live_` + first 8 hex chars.
const KEY_PREFIX_LEN: usize = 16;

fn key_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^vp_(live|test)_[0-9a-f]{64}$").expect("valid key regex"))
}

/// Whether a bearer token has the shape of one of our API keys. Run before
/// any store lookup; anything else is treated as a JWT.
pub fn is_api_key_format(token: &str) -> bool {
    key_format().is_match(token)
}

/// Generate a raw API key: `vp_live_` or `vp_test_` + 64 hex chars
/// (32 random bytes).
pub fn generate_api_key(live: bool) -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.random()).collect();
    let env = if live { "live" } else { "test" };
    format!("vp_{}_{}", env, hex::encode(random_bytes))
}

/// Extract the lookup prefix stored alongside the hash.
pub fn extract_key_prefix(key: &str) -> String {
    key.chars().take(KEY_PREFIX_LEN).collect()
}

/// Hash an API key for storage.
pub fn hash_api_key(key: &str) -> Result<String, AppError> {
    use argon2::{
        password_hash::{PasswordHasher, SaltString},
        Argon2,
    };
    use rand_core::OsRng;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(key.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash API key: {}", e)))
}

/// Verify an API key against a stored argon2 hash.
pub fn verify_api_key(key: &str, hash: &str) -> Result<bool, AppError> {
    use argon2::{
        password_hash::{PasswordHash, PasswordVerifier},
        Argon2,
    };

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(key.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_matches_format() {
        let live = generate_api_key(true);
        assert!(live.starts_with("vp_live_"));
        assert_eq!(live.len(), 8 + 64);
        assert!(is_api_key_format(&live));

        let test = generate_api_key(false);
        assert!(test.starts_with("vp_test_"));
        assert!(is_api_key_format(&test));
    }

    #[test]
    fn test_format_validation() {
        let valid = format!("vp_live_{}", "a".repeat(64));
        assert!(is_api_key_format(&valid));

        assert!(!is_api_key_format("vp_live_short"));
        assert!(!is_api_key_format(&format!("vp_prod_{}", "a".repeat(64))));
        assert!(!is_api_key_format(&format!("vp_live_{}", "A".repeat(64))));
        assert!(!is_api_key_format(&format!("mk_live_{}", "a".repeat(64))));
        assert!(!is_api_key_format("eyJhbGciOiJIUzI1NiJ9.payload.sig"));
    }

    #[test]
    fn test_hash_and_verify() {
        let key = generate_api_key(true);
        let hash = hash_api_key(&key).unwrap();

        assert!(verify_api_key(&key, &hash).unwrap());
        assert!(!verify_api_key(&generate_api_key(true), &hash).unwrap());
    }

    #[test]
    fn test_extract_key_prefix() {
        let key = format!("vp_live_{}", "0123456789abcdef".repeat(4));
        let prefix = extract_key_prefix(&key);
        assert_eq!(prefix, "vp_live_01234567");
        assert_eq!(prefix.len(), 16);
    }
}
