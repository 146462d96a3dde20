use std::sync::Arc;

use crate::auth::{
    jwt::JwtKeys,
    memory::InMemoryUserRepository,
    password::{Argon2Hasher, PasswordHasher},
    repo::{PgUserRepository, UserRepository},
    services::{AuthService, UserService},
};
use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::new(&config.hashing)?);

        let repo: Arc<dyn UserRepository> = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url).await?;
                db::migrate(&pool).await?;
                Arc::new(PgUserRepository::new(pool, hasher.clone()))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; users are kept in memory");
                Arc::new(InMemoryUserRepository::new(hasher.clone()))
            }
        };

        Ok(Self::from_parts(config, repo, hasher))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        repo: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let keys = Arc::new(JwtKeys::from_config(&config.jwt));
        let users = Arc::new(AuthService::new(
            repo,
            hasher,
            keys,
            config.password_min_length,
        ));
        Self { config, users }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::auth::password::cheap_hasher;

        let config = Arc::new(test_config(std::time::Duration::from_secs(5)));
        let hasher: Arc<dyn PasswordHasher> = Arc::new(cheap_hasher());
        let repo = Arc::new(InMemoryUserRepository::new(hasher.clone()));
        Self::from_parts(config, repo, hasher)
    }
}

#[cfg(test)]
pub(crate) fn test_config(request_timeout: std::time::Duration) -> AppConfig {
    use crate::config::{HashingConfig, JwtConfig};

    AppConfig {
        database_url: None,
        host: "127.0.0.1".into(),
        port: 0,
        jwt: JwtConfig {
            secret: "test".into(),
            issuer: "test".into(),
            audience: "test".into(),
            ttl_minutes: 5,
        },
        hashing: HashingConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        password_min_length: 8,
        request_timeout,
    }
}
