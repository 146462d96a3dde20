use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,                // trimmed + lowercased
    #[serde(skip_serializing)]
    pub password_hash: String,        // PHC string, not exposed in JSON
    pub person_name: Option<String>,
    pub gender: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Everything needed to insert a user; id and timestamp come from storage.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub person_name: Option<String>,
    pub gender: Option<String>,
}
