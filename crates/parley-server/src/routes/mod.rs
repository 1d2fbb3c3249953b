pub mod admin;
pub mod auth;
pub mod chat;

use axum::Router;

use crate::error::ApiError;
use crate::state::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/chat", chat::router())
        .nest("/admin", admin::router())
        .nest("/auth", auth::router())
        .fallback(api_not_found)
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
