use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored keyword/response pair. The keyword is kept normalized
/// (trimmed, lowercased) and is unique within the rule store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: Uuid,
    pub keyword: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// One resolved exchange between a user and the bot. Insert-only; the log
/// is wiped at server start, never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub id: Uuid,
    pub user_message: String,
    pub bot_reply: String,
    pub matched: bool,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(
        user_message: impl Into<String>,
        bot_reply: impl Into<String>,
        matched: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_message: user_message.into(),
            bot_reply: bot_reply.into(),
            matched,
            timestamp: Utc::now(),
        }
    }
}

/// A registered account. The bcrypt hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
