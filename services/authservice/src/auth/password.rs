//! Argon2id password hashing.
//!
//! Hashes are PHC strings. Verification goes through the PHC verifier, which
//! compares digests in constant time.
use anyhow::{Result, anyhow};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use std::sync::OnceLock;

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|err| anyhow!("encode salt: {err}"))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("hash password: {err}"))?
        .to_string();
    Ok(phc)
}

/// Check `password` against a stored PHC hash. Unparseable hashes never match.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| hash_password("brickx-dummy-password").ok())
        .as_deref()
}

/// Compute the dummy hash ahead of the first unknown-user login, so that login
/// costs one verification and not a hash plus a verification.
pub fn prime_dummy_hash() -> bool {
    dummy_hash().is_some()
}

/// Burn one verification against a fixed hash so a missing user costs about
/// as much as a wrong password.
pub fn verify_dummy(password: &str) {
    match dummy_hash() {
        Some(hash) => {
            let _ = verify_password(hash, password);
        }
        None => {
            let _ = hash_password(password);
        }
    }
}
