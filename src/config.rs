use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: u64,
}

/// One year.
const MAX_JWT_TTL_MINUTES: u64 = 60 * 24 * 365;

/// Argon2 cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// No URL means users live in process memory.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub hashing: HashingConfig,
    pub password_min_length: usize,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str, default: u64| -> anyhow::Result<u64> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a non-negative integer")),
                None => Ok(default),
            }
        };

        let ttl_minutes = parsed("JWT_TTL_MINUTES", 60)?;
        anyhow::ensure!(
            (1..=MAX_JWT_TTL_MINUTES).contains(&ttl_minutes),
            "JWT_TTL_MINUTES must be between 1 and {MAX_JWT_TTL_MINUTES}"
        );

        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "ecommerce-users".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "ecommerce-clients".into()),
            ttl_minutes,
        };

        let hashing = HashingConfig {
            memory_kib: u32::try_from(parsed("ARGON2_MEMORY_KIB", 19 * 1024)?)
                .context("ARGON2_MEMORY_KIB out of range")?,
            iterations: u32::try_from(parsed("ARGON2_ITERATIONS", 2)?)
                .context("ARGON2_ITERATIONS out of range")?,
            parallelism: u32::try_from(parsed("ARGON2_PARALLELISM", 1)?)
                .context("ARGON2_PARALLELISM out of range")?,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: u16::try_from(parsed("APP_PORT", 8080)?).context("APP_PORT out of range")?,
            jwt,
            hashing,
            password_min_length: usize::try_from(parsed("PASSWORD_MIN_LENGTH", 8)?)
                .context("PASSWORD_MIN_LENGTH out of range")?,
            request_timeout: Duration::from_secs(parsed("REQUEST_TIMEOUT_SECS", 10)?),
        })
    }
}
