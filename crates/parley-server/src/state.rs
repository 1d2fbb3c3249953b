use parley_memory::{ConversationLog, Database, RuleStore, UserStore};

/// Shared application state accessible from all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub rules: RuleStore,
    pub log: ConversationLog,
    pub users: UserStore,
}

impl AppState {
    pub fn new(db: &Database) -> Self {
        Self {
            rules: db.rules(),
            log: db.log(),
            users: db.users(),
        }
    }
}
