use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ApiError, ApiJson, ValidationErrorBuilder};
use super::validation::{validate_email, validate_password, validate_username};
use crate::config::Config;
use crate::db::{AuthResponse, LoginRequest, SignupRequest, User, UserResponse};
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Signed token payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Issue an HS256 token for the user, valid for `ttl_hours`
pub fn issue_token(
    secret: &str,
    user: &User,
    ttl_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        user_id: user.id.clone(),
        username: user.username.clone(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Check signature and expiry
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

fn cookie_path(config: &Config) -> String {
    if config.server.base_path.is_empty() {
        "/".to_string()
    } else {
        config.server.base_path.clone()
    }
}

/// The HTTP-only cookie carrying a freshly issued token
pub fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((config.auth.cookie_name.clone(), token))
        .path(cookie_path(config))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.server.production)
        .max_age(time::Duration::hours(config.auth.token_ttl_hours))
        .build()
}

/// An empty, already expired cookie that makes the browser drop the token
pub fn cleared_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((config.auth.cookie_name.clone(), String::new()))
        .path(cookie_path(config))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.server.production)
        .max_age(time::Duration::ZERO)
        .build()
}

fn issue_cookie(state: &AppState, user: &User) -> Result<Cookie<'static>, ApiError> {
    let token = issue_token(
        &state.config.auth.jwt_secret,
        user,
        state.config.auth.token_ttl_hours,
    )
    .map_err(|e| ApiError::internal(format!("Failed to issue token: {}", e)))?;
    Ok(session_cookie(&state.config, token))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::invalid_input("Email and password are required"));
    }

    let user = User::get_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    if !verify_password(&request.password, &user.password_hash) {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let cookie = issue_cookie(&state, &user)?;
    info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            message: "Logged in!".to_string(),
            user: UserResponse::from(user),
        }),
    ))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Logout endpoint, always succeeds
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.add(cleared_cookie(&state.config)),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// Create an account and log it in
pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_lowercase();

    let mut errors = ValidationErrorBuilder::new();
    errors.check("username", validate_username(&username));
    errors.check("email", validate_email(&email));
    errors.check("password", validate_password(&request.password));
    errors.finish()?;

    if User::get_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::validation_field("email", "Email is already registered"));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let user = match User::create(&state.db, &username, &email, &password_hash).await {
        Ok(user) => user,
        // Lost a race with a concurrent signup for the same email
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::validation_field("email", "Email is already registered"));
        }
        Err(e) => return Err(e.into()),
    };

    let cookie = issue_cookie(&state, &user)?;
    info!(user_id = %user.id, username = %user.username, "User signed up");

    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(AuthResponse {
            message: "Signed up!".to_string(),
            user: UserResponse::from(user),
        }),
    ))
}

/// Profile of the authenticated user
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Token from the session cookie, falling back to an `Authorization: Bearer` header
fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve a token to a user that still exists
pub async fn get_current_user(state: &AppState, token: &str) -> Result<User, ApiError> {
    let claims = decode_token(&state.config.auth.jwt_secret, token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    User::get_by_id(&state.db, &claims.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))
}

/// Extractor for getting the current authenticated user from a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers, &state.config.auth.cookie_name)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
        get_current_user(state, &token).await
    }
}
