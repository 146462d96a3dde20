use std::sync::Arc;

use anyhow::Context;
use argon2::{
    password_hash::{self, PasswordHash, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use tracing::error;

use crate::config::HashingConfig;

/// Turns plaintext passwords into stored credentials and checks them.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> anyhow::Result<String>;

    fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool>;

    /// A valid hash of a random secret; verifying against it costs the same
    /// as verifying a real credential.
    fn dummy_hash(&self) -> &str;

    /// Verifies against `hash`, or against the dummy hash when there is no
    /// stored credential. Always `false` in the latter case.
    fn verify_or_dummy(&self, plain: &str, hash: Option<&str>) -> anyhow::Result<bool> {
        match hash {
            Some(h) => self.verify(plain, h),
            None => {
                let _ = self.verify(plain, self.dummy_hash())?;
                Ok(false)
            }
        }
    }
}

/// Hashes on the blocking pool so the executor keeps serving other requests
/// and request deadlines can fire while argon2 runs.
pub async fn hash_blocking(hasher: Arc<dyn PasswordHasher>, plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&plain))
        .await
        .context("password hashing task")?
}

/// Blocking-pool counterpart of `PasswordHasher::verify_or_dummy`.
pub async fn verify_or_dummy_blocking(
    hasher: Arc<dyn PasswordHasher>,
    plain: String,
    hash: Option<String>,
) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || hasher.verify_or_dummy(&plain, hash.as_deref()))
        .await
        .context("password verification task")?
}

#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl Argon2Hasher {
    pub fn new(cfg: &HashingConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let secret: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let dummy_hash = hash_with(&argon2, &secret)?;

        Ok(Self { argon2, dummy_hash })
    }
}

fn hash_with(argon2: &Argon2<'_>, plain: &str) -> anyhow::Result<String> {
    use argon2::password_hash::PasswordHasher as _;

    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        hash_with(&self.argon2, plain)
    }

    fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(anyhow::anyhow!(e.to_string()))
            }
        }
    }

    fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }
}

#[cfg(test)]
pub(crate) fn cheap_hasher() -> Argon2Hasher {
    Argon2Hasher::new(&HashingConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .expect("cheap argon2 params are valid")
}
