use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthenticationResult, RegisterRequest},
        jwt::TokenIssuer,
        password::{self, PasswordHasher},
        repo::UserRepository,
        repo_types::NewUser,
    },
    error::AppError,
};

const MAX_PERSON_NAME_LEN: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Login and registration.
///
/// Wrong credentials are a normal outcome: `login` answers them with a failed
/// `AuthenticationResult`, never an `Err`. A duplicate email on `register`
/// is reported as `AppError::Conflict`.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthenticationResult, AppError>;

    async fn register(&self, request: RegisterRequest) -> Result<AuthenticationResult, AppError>;
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    password_min_length: usize,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
        password_min_length: usize,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            password_min_length,
        }
    }

    fn validate(
        &self,
        email: &str,
        password: &str,
        person_name: Option<&str>,
    ) -> Result<(), AppError> {
        if email.is_empty() {
            return Err(AppError::Validation("Email is required".into()));
        }
        if !is_valid_email(email) {
            return Err(AppError::Validation("Invalid email".into()));
        }
        if password.chars().count() < self.password_min_length {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                self.password_min_length
            )));
        }
        if let Some(name) = person_name {
            if name.chars().count() > MAX_PERSON_NAME_LEN {
                return Err(AppError::Validation(format!(
                    "Person name must be at most {MAX_PERSON_NAME_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserService for AuthService {
    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<AuthenticationResult, AppError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            warn!("login with empty credentials");
            return Ok(AuthenticationResult::failed());
        }

        let Some(user) = self
            .users
            .get_user_by_email_and_password(&email, password)
            .await?
        else {
            warn!(%email, "login rejected");
            return Ok(AuthenticationResult::failed());
        };

        let token = self.tokens.issue(&user)?;
        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(AuthenticationResult::succeeded(user, token))
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn register(&self, request: RegisterRequest) -> Result<AuthenticationResult, AppError> {
        let email = normalize_email(&request.email);
        let person_name = request
            .person_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if let Err(e) = self.validate(&email, &request.password, person_name.as_deref()) {
            warn!(error = %e, "registration rejected");
            return Err(e);
        }

        let password_hash = password::hash_blocking(self.hasher.clone(), request.password).await?;

        let user = self
            .users
            .add_user(NewUser {
                email,
                password_hash,
                person_name,
                gender: request.gender.map(|g| g.to_string()),
            })
            .await?;

        let token = self.tokens.issue(&user)?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(AuthenticationResult::succeeded(user, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        dto::Gender,
        jwt::{test_keys, JwtKeys},
        memory::InMemoryUserRepository,
        password::cheap_hasher,
    };

    fn service() -> (AuthService, JwtKeys) {
        let hasher: Arc<dyn PasswordHasher> = Arc::new(cheap_hasher());
        let keys = test_keys("test-secret", "test-issuer", "test-aud");
        let repo = Arc::new(InMemoryUserRepository::new(hasher.clone()));
        (
            AuthService::new(repo, hasher, Arc::new(keys.clone()), 8),
            keys,
        )
    }

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            person_name: None,
            gender: None,
        }
    }

    fn assert_token_matches_success(result: &AuthenticationResult) {
        assert_eq!(result.token().is_some(), result.success());
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email(""));
        assert_eq!(normalize_email("  A@B.Com "), "a@b.com");
    }

    #[tokio::test]
    async fn register_then_login_succeeds() {
        let (svc, keys) = service();

        let registered = svc
            .register(register_request("a@b.com", "secret123"))
            .await
            .unwrap();
        assert!(registered.success());
        assert!(!registered.token().unwrap().is_empty());
        assert_token_matches_success(&registered);

        let logged_in = svc.login("a@b.com", "secret123").await.unwrap();
        assert!(logged_in.success());
        assert_eq!(logged_in.id(), registered.id());
        assert_token_matches_success(&logged_in);

        let claims = keys.verify(logged_in.token().unwrap()).unwrap();
        assert_eq!(claims.sub, registered.id());
    }

    #[tokio::test]
    async fn wrong_password_is_a_failed_result_not_an_error() {
        let (svc, _) = service();
        svc.register(register_request("a@b.com", "secret123"))
            .await
            .unwrap();

        let result = svc.login("a@b.com", "wrong").await.unwrap();
        assert!(!result.success());
        assert!(result.token().is_none());
        assert!(result.id().is_nil());
        assert_token_matches_success(&result);
    }

    #[tokio::test]
    async fn unknown_email_and_empty_credentials_fail_quietly() {
        let (svc, _) = service();
        assert!(!svc.login("ghost@b.com", "secret123").await.unwrap().success());
        assert!(!svc.login("", "secret123").await.unwrap().success());
        assert!(!svc.login("a@b.com", "").await.unwrap().success());
    }

    #[tokio::test]
    async fn email_is_case_normalized() {
        let (svc, _) = service();
        let registered = svc
            .register(register_request("  Ada@Example.COM ", "secret123"))
            .await
            .unwrap();
        assert_eq!(registered.email(), "ada@example.com");
        assert!(svc.login("ADA@example.com", "secret123").await.unwrap().success());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_and_keeps_original() {
        let (svc, _) = service();
        let first = svc
            .register(register_request("a@b.com", "secret123"))
            .await
            .unwrap();

        let err = svc
            .register(register_request("A@b.com", "different-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref e) if e == "a@b.com"));

        let login = svc.login("a@b.com", "secret123").await.unwrap();
        assert_eq!(login.id(), first.id());
        assert!(!svc.login("a@b.com", "different-pass").await.unwrap().success());
    }

    #[tokio::test]
    async fn invalid_registrations_are_validation_errors() {
        let (svc, _) = service();
        for (email, password) in [("", "secret123"), ("not-an-email", "secret123"), ("a@b.com", "short")] {
            let err = svc
                .register(register_request(email, password))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{email}/{password}: {err}");
        }

        let mut long_name = register_request("a@b.com", "secret123");
        long_name.person_name = Some("x".repeat(MAX_PERSON_NAME_LEN + 1));
        assert!(matches!(
            svc.register(long_name).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn person_name_limit_applies_after_trimming() {
        let (svc, _) = service();
        let mut req = register_request("a@b.com", "secret123");
        let name = "y".repeat(MAX_PERSON_NAME_LEN);
        req.person_name = Some(format!("   {name}   "));

        let result = svc.register(req).await.unwrap();
        assert_eq!(result.person_name(), Some(name.as_str()));
    }

    #[tokio::test]
    async fn profile_fields_are_carried_into_the_result() {
        let (svc, _) = service();
        let mut req = register_request("a@b.com", "secret123");
        req.person_name = Some("  Ada Lovelace ".into());
        req.gender = Some(Gender::Female);

        let result = svc.register(req).await.unwrap();
        assert_eq!(result.person_name(), Some("Ada Lovelace"));
        assert_eq!(result.gender(), Some("Female"));

        let login = svc.login("a@b.com", "secret123").await.unwrap();
        assert_eq!(login.person_name(), Some("Ada Lovelace"));
    }
}
