use axum::{
    extract::State,
    http::header::{COOKIE, SET_COOKIE},
    http::HeaderMap,
    response::AppendHeaders,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{TimeDelta, Utc};
use parley_core::{normalize_username, validate_password};
use parley_schema::User;
use rand::RngCore;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::state::AppState;

const SESSION_COOKIE: &str = "parley_session";
const SESSION_TTL_DAYS: i64 = 7;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
}

/// Fresh session token plus the digest we persist. Only the digest ever
/// touches the database.
fn new_session_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let digest = hex::encode(Sha256::digest(token.as_bytes()));
    (token, digest)
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

/// Pull the session token out of the Cookie header, if any.
fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|part| {
        part.trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_owned)
    })
}

async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
    let Some(token) = cookie_token(headers) else {
        return Ok(None);
    };
    Ok(state.users.session_user(&token_digest(&token)).await?)
}

async fn issue_session(state: &AppState, user: &User) -> Result<String, ApiError> {
    let (token, digest) = new_session_token();
    let expires_at = Utc::now() + TimeDelta::days(SESSION_TTL_DAYS);
    state
        .users
        .create_session(user.id, &digest, expires_at)
        .await?;
    Ok(token)
}

/// POST /api/auth/register: create an account and log it in.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(AppendHeaders<[(axum::http::HeaderName, String); 1]>, Json<Value>), ApiError> {
    let username_raw = body
        .get("username")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("Username is required and must be a string"))?;
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("Password is required and must be a string"))?;

    let username = normalize_username(username_raw)?;
    validate_password(password)?;

    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(anyhow::Error::new)?;
    let user = state.users.create(&username, &hash).await?;
    tracing::info!(username = %user.username, "registered new user");

    let token = issue_session(&state, &user).await?;
    Ok((
        AppendHeaders([(
            SET_COOKIE,
            session_cookie(&token, SESSION_TTL_DAYS * 24 * 60 * 60),
        )]),
        Json(json!({ "success": true, "data": { "user": user } })),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(AppendHeaders<[(axum::http::HeaderName, String); 1]>, Json<Value>), ApiError> {
    let username = body
        .get("username")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("Username is required and must be a string"))?;
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("Password is required and must be a string"))?;

    let Some(user) = state.users.find_by_username(username).await? else {
        return Err(ApiError::unauthorized("Invalid username or password"));
    };
    if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    let token = issue_session(&state, &user).await?;
    Ok((
        AppendHeaders([(
            SET_COOKIE,
            session_cookie(&token, SESSION_TTL_DAYS * 24 * 60 * 60),
        )]),
        Json(json!({ "success": true, "data": { "user": user } })),
    ))
}

/// POST /api/auth/logout: drop the session row and expire the cookie.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(AppendHeaders<[(axum::http::HeaderName, String); 1]>, Json<Value>), ApiError> {
    if let Some(token) = cookie_token(&headers) {
        state.users.delete_session(&token_digest(&token)).await?;
    }
    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie("", 0))]),
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    ))
}

/// GET /api/auth/me: the logged-in user, or 401.
async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let user = current_user(&state, &headers)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Not logged in"))?;
    Ok(Json(json!({ "success": true, "data": { "user": user } })))
}

/// PUT /api/auth/profile: update display name and/or email.
async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let user = current_user(&state, &headers)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Not logged in"))?;

    let display_name = body
        .get("displayName")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    let email = body
        .get("email")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let updated = state
        .users
        .update_profile(user.id, display_name, email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({ "success": true, "data": { "user": updated } })))
}
