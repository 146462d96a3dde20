use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::User;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Others,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Others => "Others",
        };
        f.write_str(s)
    }
}

/// Request body for user registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub person_name: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
}

/// Request body for login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Outcome of every login and registration.
///
/// A token is present exactly when `success` is true. A failed result carries
/// no identity: the id is nil and the email empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResult {
    id: Uuid,
    email: String,
    person_name: Option<String>,
    gender: Option<String>,
    token: Option<String>,
    success: bool,
}

impl AuthenticationResult {
    pub fn succeeded(user: User, token: String) -> Self {
        Self {
            id: user.id,
            email: user.email,
            person_name: user.person_name,
            gender: user.gender,
            token: Some(token),
            success: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            id: Uuid::nil(),
            email: String::new(),
            person_name: None,
            gender: None,
            token: None,
            success: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn person_name(&self) -> Option<&str> {
        self.person_name.as_deref()
    }

    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            password_hash: "$argon2id$...".into(),
            person_name: Some("Ada".into()),
            gender: Some(Gender::Female.to_string()),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn succeeded_result_serializes_with_camel_case_fields() {
        let u = user();
        let id = u.id;
        let json = serde_json::to_value(AuthenticationResult::succeeded(u, "tok".into())).unwrap();
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["email"], "a@b.com");
        assert_eq!(json["personName"], "Ada");
        assert_eq!(json["gender"], "Female");
        assert_eq!(json["token"], "tok");
        assert_eq!(json["success"], true);
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn failed_result_has_no_token_and_no_identity() {
        let json = serde_json::to_value(AuthenticationResult::failed()).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["token"].is_null());
        assert!(json["personName"].is_null());
        assert_eq!(json["email"], "");
        assert_eq!(json["id"], Uuid::nil().to_string());
    }

    #[test]
    fn register_request_accepts_optional_fields() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@b.com","password":"secret123"}"#).unwrap();
        assert!(req.person_name.is_none());
        assert!(req.gender.is_none());

        let req: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@b.com","password":"secret123","personName":"Ada","gender":"Others"}"#,
        )
        .unwrap();
        assert_eq!(req.person_name.as_deref(), Some("Ada"));
        assert_eq!(req.gender, Some(Gender::Others));
    }

    #[test]
    fn unknown_gender_is_rejected() {
        let res = serde_json::from_str::<RegisterRequest>(
            r#"{"email":"a@b.com","password":"secret123","gender":"Robot"}"#,
        );
        assert!(res.is_err());
    }
}
