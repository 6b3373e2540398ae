use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use tokio::sync::RwLock;

use crate::api::{ApiError, AuthResponse, LoginRequest, RegisterRequest, Role, TokenSource, User};
use crate::validation::ValidationError;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User
}

impl From<AuthResponse> for AuthSession {
    fn from(value: AuthResponse) -> Self {
        AuthSession {
            token: value.token,
            user: value.user
        }
    }
}

/// Holds the signed-in session. Handed to the API client as its token source.
pub struct AuthContext {
    session: RwLock<Option<AuthSession>>
}

impl AuthContext {
    pub fn new(session: Option<AuthSession>) -> Self {
        AuthContext { session: RwLock::new(session) }
    }

    pub async fn set(&self, session: AuthSession) {
        *self.session.write().await = Some(session);
    }

    pub async fn clear(&self) {
        *self.session.write().await = None;
    }

    pub async fn token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.token.clone())
    }

    pub async fn user(&self) -> Option<User> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn is_admin(&self) -> bool {
        self.session.read().await
            .as_ref()
            .map(|s| s.user.role == Role::Admin)
            .unwrap_or(false)
    }
}

#[async_trait]
impl TokenSource for AuthContext {
    async fn token(&self) -> Result<String, ApiError> {
        AuthContext::token(self).await
            .ok_or_else(|| ApiError::Auth("not logged in".to_string()))
    }
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') => Ok(()),
        _ => Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    Ok(())
}

pub fn login_request(email: &str, password: &str) -> Result<LoginRequest, ValidationError> {
    let email = email.trim();
    validate_email(email)?;
    if password.is_empty() {
        return Err(ValidationError::Missing("password"));
    }
    Ok(LoginRequest { email: email.to_string(), password: password.to_string() })
}

pub fn register_request(name: &str, email: &str, password: &str) -> Result<RegisterRequest, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Missing("name"));
    }
    let email = email.trim();
    validate_email(email)?;
    validate_password(password)?;
    Ok(RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string()
    })
}
