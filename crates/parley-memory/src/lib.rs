mod db;
pub mod log;
pub mod migrations;
pub mod seed;
pub mod store;
pub mod users;

pub use db::Database;
pub use log::{ConversationLog, HistoryPage};
pub use seed::{seed_defaults, DEFAULT_RULES};
pub use store::RuleStore;
pub use users::UserStore;
