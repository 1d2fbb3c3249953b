use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::Utc;
use parley_core::{normalize_keyword, normalize_response};
use parley_schema::Rule;
use rusqlite::{params, Connection, Row};
use tokio::task;
use uuid::Uuid;

/// Authoritative mapping from normalized keyword to canned response.
///
/// Every method snapshots or mutates through one SQL statement while the
/// connection mutex is held, so a concurrent `list` can never observe a
/// half-written rule and two upserts of the same keyword can never leave
/// two rows behind.
#[derive(Clone)]
pub struct RuleStore {
    db: Arc<Mutex<Connection>>,
}

impl RuleStore {
    pub(crate) fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Insert a rule, or replace the response of the rule that already owns
    /// this normalized keyword. `id` and `created_at` survive updates.
    pub async fn upsert(&self, keyword: &str, response: &str) -> Result<Rule> {
        let keyword = normalize_keyword(keyword)?;
        let response = normalize_response(response)?;
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            conn.execute(
                r#"
                INSERT INTO rules (id, keyword, response, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(keyword) DO UPDATE SET response = excluded.response
                "#,
                params![
                    Uuid::new_v4().to_string(),
                    keyword,
                    response,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            let rule = conn.query_row(
                "SELECT id, keyword, response, created_at FROM rules WHERE keyword = ?1",
                params![keyword],
                row_to_rule,
            )?;
            Ok::<Rule, anyhow::Error>(rule)
        })
        .await?
    }

    /// Delete by rule id. Absence is a normal outcome, reported as `false`.
    pub async fn remove(&self, id: Uuid) -> Result<bool> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let deleted =
                conn.execute("DELETE FROM rules WHERE id = ?1", params![id.to_string()])?;
            Ok::<bool, anyhow::Error>(deleted > 0)
        })
        .await?
    }

    /// Snapshot of all rules in insertion order (oldest first). The caller
    /// owns the returned Vec; later edits never touch it. Resolution runs
    /// against exactly this order.
    pub async fn list(&self) -> Result<Vec<Rule>> {
        self.select_rules("ORDER BY created_at ASC, rowid ASC").await
    }

    /// Snapshot sorted newest first, for the admin listing.
    pub async fn list_recent_first(&self) -> Result<Vec<Rule>> {
        self.select_rules("ORDER BY created_at DESC, rowid DESC")
            .await
    }

    pub async fn count(&self) -> Result<u64> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM rules", [], |row| row.get(0))?;
            Ok::<u64, anyhow::Error>(count as u64)
        })
        .await?
    }

    /// Look up a rule by keyword (normalized before the query). Used by the
    /// admin surface to distinguish create from update.
    pub async fn find_by_keyword(&self, keyword: &str) -> Result<Option<Rule>> {
        let keyword = keyword.trim().to_lowercase();
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let mut stmt = conn.prepare(
                "SELECT id, keyword, response, created_at FROM rules WHERE keyword = ?1 LIMIT 1",
            )?;
            let mut rows = stmt.query(params![keyword])?;
            if let Some(row) = rows.next()? {
                return Ok::<Option<Rule>, anyhow::Error>(Some(row_to_rule(row)?));
            }
            Ok::<Option<Rule>, anyhow::Error>(None)
        })
        .await?
    }

    async fn select_rules(&self, order_clause: &'static str) -> Result<Vec<Rule>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let sql = format!("SELECT id, keyword, response, created_at FROM rules {order_clause}");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_rule)?;
            let mut rules = Vec::new();
            for row in rows {
                rules.push(row?);
            }
            Ok::<Vec<Rule>, anyhow::Error>(rules)
        })
        .await?
    }
}

fn row_to_rule(row: &Row<'_>) -> rusqlite::Result<Rule> {
    let id_raw: String = row.get(0)?;
    let created_at_raw: String = row.get(3)?;
    Ok(Rule {
        id: crate::db::parse_uuid_sql(&id_raw)?,
        keyword: row.get(1)?,
        response: row.get(2)?,
        created_at: crate::db::parse_datetime_sql(&created_at_raw)?,
    })
}
