//! Sign-in and session tokens.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use keyward_common::{AppError, AppResult};
use keyward_db::{entities::user, repositories::UserRepository};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::auth_gate::AuthGate;
use super::password::{hash_password, verify_password};

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id.
    pub sub: String,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issue time, seconds since the epoch.
    pub iat: i64,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The signed-in account.
    pub user: user::Model,
    /// HS256 bearer token.
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// Input for changing the account password.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    /// Re-checked through the auth gate.
    pub current_password: String,

    /// Replacement password, hashed before storage.
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    auth_gate: AuthGate,
    jwt_secret: String,
    token_ttl_secs: u64,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        auth_gate: AuthGate,
        jwt_secret: String,
        token_ttl_secs: u64,
    ) -> Self {
        Self {
            user_repo,
            auth_gate,
            jwt_secret,
            token_ttl_secs,
        }
    }

    /// Sign in with email and password.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<IssuedSession> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Password sign-in rejected");
            return Err(AppError::InvalidCredentials);
        }

        self.issue(user)
    }

    /// Replace the account password after re-checking the current one.
    pub async fn change_password(&self, user_id: &str, input: ChangePasswordInput) -> AppResult<()> {
        input.validate()?;

        let user = self
            .auth_gate
            .require(user_id, &input.current_password)
            .await?;
        let hash = hash_password(&input.new_password)?;
        self.user_repo.update_password_hash(user, hash).await?;

        tracing::info!(user_id = %user_id, "Account password changed");
        Ok(())
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> AppResult<user::Model> {
        let claims = self.verify_token(token)?;
        self.user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Sign a token for `user_id`.
    pub fn issue_token(&self, user_id: &str) -> AppResult<String> {
        let now = Utc::now();
        let ttl = i64::try_from(self.token_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| AppError::Config("token_ttl_secs out of range".to_string()))?;

        let claims = SessionClaims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Check signature and expiry.
    pub fn verify_token(&self, token: &str) -> AppResult<SessionClaims> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            AppError::Unauthorized
        })
    }

    fn issue(&self, user: user::Model) -> AppResult<IssuedSession> {
        let token = self.issue_token(&user.id)?;
        tracing::info!(user_id = %user.id, "User signed in");
        Ok(IssuedSession {
            user,
            token,
            expires_in: self.token_ttl_secs,
        })
    }
}
