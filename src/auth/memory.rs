use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    password::{self, PasswordHasher},
    repo::{RepoError, UserRepository},
    repo_types::{NewUser, User},
};

/// Process-local user store keyed by normalized email.
///
/// Used when no `DATABASE_URL` is configured and by the tests. Contents are
/// lost on restart.
#[derive(Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
    hasher: Arc<dyn PasswordHasher>,
}

impl InMemoryUserRepository {
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            hasher,
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn add_user(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(RepoError::Conflict(user.email));
        }
        let stored = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            person_name: user.person_name,
            gender: user.gender,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(stored.email.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_user_by_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, RepoError> {
        let user = self.users.read().await.get(email).cloned();
        let matched = password::verify_or_dummy_blocking(
            self.hasher.clone(),
            password.to_string(),
            user.as_ref().map(|u| u.password_hash.clone()),
        )
        .await?;
        Ok(user.filter(|_| matched))
    }
}
