//! Password hashing and bearer-token authentication.
//!
//! Passwords are hashed with Argon2id (random [`OsRng`] salt, PHC string
//! format) and only the hash is stored. Login and signup issue an opaque
//! bearer token held server-side in `auth_tokens` with a one hour expiry;
//! protected routes pull the calling user out of the `Authorization` header
//! via the [`AuthUser`] extractor.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{async_trait, extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::User;
use crate::store;

const TOKEN_TTL_MINUTES: i64 = 60;

/// Hash a password with Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
}

/// Verify a password against a stored PHC-format hash.
///
/// `Ok(false)` on mismatch; `Err` only if the stored hash itself is
/// malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("malformed password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Mint a fresh opaque bearer token for `user_id`.
pub async fn issue_token(pool: &SqlitePool, user_id: Uuid) -> Result<String, ApiError> {
    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES);
    store::insert_token(pool, &token, user_id, expires_at).await?;
    Ok(token)
}

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<SqlitePool> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        pool: &SqlitePool,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

        let user = store::find_user_by_token(pool, token, Utc::now())
            .await?
            .ok_or(ApiError::InvalidToken)?;
        Ok(AuthUser(user))
    }
}
