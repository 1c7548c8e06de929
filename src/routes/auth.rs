use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth;
use crate::error::ApiError;
use crate::models::{AuthResponse, LoginRequest, SignupRequest, User, UserResponse};
use crate::store;

pub fn routes(pool: SqlitePool) -> Router {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .with_state(pool)
}

async fn signup(
    State(pool): State<SqlitePool>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = body.email.trim().to_string();
    let username = body.username.trim().to_lowercase();
    let name = body.name.trim().to_string();

    if email.is_empty() || username.is_empty() || name.is_empty() {
        return Err(ApiError::Validation(
            "Email, username and name are required".into(),
        ));
    }
    if body.password.chars().count() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }
    if store::find_user_by_email(&pool, &email).await?.is_some() {
        return Err(ApiError::Validation("User already exists".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        email,
        username,
        password_hash: auth::hash_password(&body.password)?,
        name,
        created_at: Utc::now(),
    };
    store::create_user(&pool, &user).await?;
    let token = auth::issue_token(&pool, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

async fn login(
    State(pool): State<SqlitePool>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Some(user) = store::find_user_by_email(&pool, body.email.trim()).await? else {
        return Err(ApiError::InvalidCredentials);
    };
    if !auth::verify_password(&body.password, &user.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }
    let token = auth::issue_token(&pool, user.id).await?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(&user),
    }))
}
