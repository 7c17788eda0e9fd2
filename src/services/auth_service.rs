//! Authentication service - login, token issuance and verification.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::{Config, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::{Password, User, UserChanges};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

/// Hash verified when the username is unknown, so both failure paths cost the same.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| {
    Password::new("timing-equalizer-password")
        .ok()
        .map(Password::into_string)
});

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub username: String,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned after successful authentication
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Seconds until expiry
    #[schema(example = 86400)]
    pub expires_in: i64,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check credentials, record the login and issue a token
    async fn login(&self, username: String, password: String) -> AppResult<TokenResponse>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// Verify the token and load its user; deleted users are rejected
    async fn authenticate(&self, token: &str) -> AppResult<User>;
}

fn generate_token(user: &User, config: &Config) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        is_admin: user.is_admin,
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(TokenResponse {
        access_token: token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.jwt_expiration_hours * SECONDS_PER_HOUR,
    })
}

fn verify_token_internal(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, config: Config) -> Self {
        Self { uow, config }
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn login(&self, username: String, password: String) -> AppResult<TokenResponse> {
        let user = self.uow.users().find_by_username(username.trim()).await?;

        let stored = match &user {
            Some(user) => Some(user.hashed_password.clone()),
            None => DUMMY_HASH.clone(),
        };
        let password_valid = stored
            .map(|hash| Password::from_hash(hash).verify(&password))
            .unwrap_or(false);

        let user = match user {
            Some(user) if password_valid => user,
            _ => {
                tracing::info!(username = %username, "Rejected login");
                return Err(AppError::InvalidCredentials);
            }
        };

        let user = self
            .uow
            .users()
            .apply(user.id, UserChanges::login(Utc::now()))
            .await?;
        tracing::info!(user_id = user.id, "User logged in");

        generate_token(&user, &self.config)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        verify_token_internal(token, &self.config)
    }

    async fn authenticate(&self, token: &str) -> AppResult<User> {
        let claims = self.verify_token(token)?;
        self.uow
            .users()
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            username: "alice".to_string(),
            email: None,
            phone: None,
            hashed_password: "hash".to_string(),
            target_url: None,
            is_admin: true,
            owner_id: None,
            state: crate::domain::UserState::Inactive,
            instance_id: None,
            instance_uuid: None,
            bearer_token: None,
            last_heartbeat: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let config = Config::with_jwt_secret("test-secret-key-for-testing-only-32chars");
        let token = generate_token(&test_user(), &config).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 24 * 3600);

        let claims = verify_token_internal(&token.access_token, &config).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "alice");
        assert!(claims.is_admin);
    }

    #[test]
    fn test_token_with_other_secret_is_rejected() {
        let issuer = Config::with_jwt_secret("test-secret-key-for-testing-only-32chars");
        let verifier = Config::with_jwt_secret("another-secret-key-for-testing-32chars!");
        let token = generate_token(&test_user(), &issuer).unwrap();
        assert!(matches!(
            verify_token_internal(&token.access_token, &verifier),
            Err(AppError::Jwt(_))
        ));
    }

    #[test]
    fn test_dummy_hash_is_valid_phc() {
        let hash = DUMMY_HASH.clone().unwrap();
        assert!(!Password::from_hash(hash).verify("admin"));
    }
}
