use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use crate::auth::{
    password::{self, PasswordHasher},
    repo_types::{NewUser, User},
};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("email {0} is already registered")]
    Conflict(String),
    #[error("user storage failure")]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Credential(#[from] anyhow::Error),
}

/// Storage of user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a new user; fails with `Conflict` when the email is taken.
    async fn add_user(&self, user: NewUser) -> Result<User, RepoError>;

    /// Finds the user whose email matches and whose credential verifies.
    /// Unknown email and wrong password both give `Ok(None)` at equal cost.
    async fn get_user_by_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, RepoError>;
}

/// PostgreSQL backed users table.
#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
    hasher: Arc<dyn PasswordHasher>,
}

impl PgUserRepository {
    pub fn new(db: PgPool, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { db, hasher }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn add_user(&self, user: NewUser) -> Result<User, RepoError> {
        // dropping the future before commit rolls the insert back
        let mut tx = self.db.begin().await?;
        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, person_name, gender)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, person_name, gender, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.person_name)
        .bind(&user.gender)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                RepoError::Conflict(user.email.clone())
            }
            _ => RepoError::Storage(e),
        })?;
        tx.commit().await?;

        debug!(user_id = %inserted.id, "user row inserted");
        Ok(inserted)
    }

    async fn get_user_by_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, person_name, gender, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        let matched = password::verify_or_dummy_blocking(
            self.hasher.clone(),
            password.to_string(),
            user.as_ref().map(|u| u.password_hash.clone()),
        )
        .await?;

        Ok(user.filter(|_| matched))
    }
}
