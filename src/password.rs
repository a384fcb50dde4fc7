//! Password Hashing
//!
//! Salted Argon2id hashing with fixed cost parameters. Both operations run on
//! the blocking pool so a slow hash never stalls unrelated requests.

use crate::error::AccountError;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Argon2 memory cost in KiB
const MEMORY_COST: u32 = 19 * 1024;
/// Argon2 iterations
const TIME_COST: u32 = 2;
/// Argon2 lanes
const PARALLELISM: u32 = 1;

/// One-way salted password hasher
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a plaintext password into a PHC string
    pub async fn hash(&self, plaintext: &str) -> Result<String, AccountError> {
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || hash_blocking(&plaintext))
            .await
            .map_err(|e| AccountError::Internal(format!("Hashing task failed: {e}")))?
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// Any internal failure, including a malformed stored hash, is a mismatch.
    pub async fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();
        match tokio::task::spawn_blocking(move || verify_blocking(&plaintext, &hash)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!("Password verification task failed: {:?}", e);
                false
            }
        }
    }
}

fn argon2() -> Result<Argon2<'static>, AccountError> {
    let params = Params::new(MEMORY_COST, TIME_COST, PARALLELISM, None)
        .map_err(|e| AccountError::Internal(format!("Invalid Argon2 parameters: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn hash_blocking(plaintext: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2()?
        .hash_password(plaintext.as_bytes(), &salt)?
        .to_string();
    Ok(hash)
}

fn verify_blocking(plaintext: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    let Ok(argon2) = argon2() else {
        return false;
    };
    argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok()
}
