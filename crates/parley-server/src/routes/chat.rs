use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use parley_core::{resolve, validate_chat_message};
use parley_schema::ConversationTurn;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(process_message))
        .route("/history", get(history))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

/// POST /api/chat: resolve one message against the current rule snapshot
/// and record the exchange. The user always gets a reply string; "no
/// match" degrades to the fixed fallback, never to an error.
async fn process_message(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let raw = body
        .get("message")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("Message is required and must be a string"))?;
    let user_message = validate_chat_message(raw)?;

    let rules = state.rules.list().await?;
    let resolution = resolve(&user_message, &rules);

    let turn = ConversationTurn::new(user_message, resolution.reply, resolution.matched);
    state.log.record(turn.clone()).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "userMessage": turn.user_message,
            "botReply": turn.bot_reply,
            "timestamp": turn.timestamp,
        }
    })))
}

/// GET /api/chat/history: paged conversation log, oldest first within the
/// page.
async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let skip = query.skip.unwrap_or(0);

    let page = state.log.history(limit, skip).await?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "chats": page.turns,
            "total": page.total,
            "limit": limit,
            "skip": skip,
        }
    })))
}
