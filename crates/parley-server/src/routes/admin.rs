use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use parley_core::{normalize_keyword, normalize_response};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rules", get(list_rules).post(upsert_rule))
        .route("/rules/{id}", delete(remove_rule))
}

/// POST /api/admin/rules: create a rule, or update the response of an
/// existing keyword. 201 on create, 200 on update.
async fn upsert_rule(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let keyword_raw = body
        .get("keyword")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("Keyword is required and must be a string"))?;
    let response_raw = body
        .get("response")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("Response is required and must be a string"))?;

    let keyword = normalize_keyword(keyword_raw)?;
    let response = normalize_response(response_raw)?;

    // The upsert itself is atomic; this lookup only picks the status code.
    let existed = state.rules.find_by_keyword(&keyword).await?.is_some();
    let rule = state.rules.upsert(&keyword, &response).await?;

    let (status, message) = if existed {
        (
            StatusCode::OK,
            "Rule updated successfully (keyword already existed)",
        )
    } else {
        (StatusCode::CREATED, "Rule added successfully")
    };

    Ok((
        status,
        Json(json!({
            "success": true,
            "data": { "rule": rule },
            "message": message,
        })),
    ))
}

/// GET /api/admin/rules: all rules, newest first.
async fn list_rules(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let rules = state.rules.list_recent_first().await?;
    let total = rules.len();
    Ok(Json(json!({
        "success": true,
        "data": { "rules": rules, "total": total }
    })))
}

/// DELETE /api/admin/rules/{id}
async fn remove_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::not_found("Rule not found"))?;

    if !state.rules.remove(id).await? {
        return Err(ApiError::not_found("Rule not found"));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Rule deleted successfully"
    })))
}
