//! Argon2id hashing for passwords and face PINs.
//!
//! Verification goes through the PHC `PasswordHash` machinery, which is
//! constant-time with respect to the candidate password. Both hashing and
//! verification are CPU-intensive, so async callers get `spawn_blocking`
//! wrappers to keep the runtime responsive.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::SecurityConfig;

/// Hash a secret using Argon2id with the configured cost parameters.
pub fn hash_secret(secret: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash secret: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a secret against a stored PHC hash string.
pub fn verify_secret(secret: &str, stored_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

/// `spawn_blocking` wrapper for [`hash_secret`].
pub async fn hash_secret_blocking(secret: String, config: SecurityConfig) -> Result<String> {
    task::spawn_blocking(move || hash_secret(&secret, &config))
        .await
        .context("Hashing task panicked")?
}

/// `spawn_blocking` wrapper for [`verify_secret`].
pub async fn verify_secret_blocking(secret: String, stored_hash: String) -> Result<bool> {
    task::spawn_blocking(move || verify_secret(&secret, &stored_hash))
        .await
        .context("Verification task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SecurityConfig {
        // Minimal cost so unit tests stay quick.
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        }
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let config = fast_config();
        let hash = hash_secret("p4ssword", &config).unwrap();
        assert!(verify_secret("p4ssword", &hash).unwrap());
        assert!(!verify_secret("wrong", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let config = fast_config();
        let a = hash_secret("1234", &config).unwrap();
        let b = hash_secret("1234", &config).unwrap();
        assert_ne!(a, b);
        assert!(verify_secret("1234", &a).unwrap());
        assert!(verify_secret("1234", &b).unwrap());
    }

    #[test]
    fn invalid_stored_hash_is_an_error() {
        assert!(verify_secret("1234", "not-a-phc-hash").is_err());
    }

    #[tokio::test]
    async fn blocking_wrappers_agree_with_sync_versions() {
        let config = fast_config();
        let hash = hash_secret_blocking("pin".to_string(), config).await.unwrap();
        assert!(
            verify_secret_blocking("pin".to_string(), hash)
                .await
                .unwrap()
        );
    }
}
