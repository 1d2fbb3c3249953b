use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use parley_schema::ConversationTurn;
use rusqlite::{params, Connection, Row};
use tokio::task;

/// One page of conversation history plus the total row count.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub turns: Vec<ConversationTurn>,
    pub total: u64,
}

/// Insert-only log of resolved exchanges. The server wipes it at startup;
/// nothing else ever mutates a recorded turn.
#[derive(Clone)]
pub struct ConversationLog {
    db: Arc<Mutex<Connection>>,
}

impl ConversationLog {
    pub(crate) fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub async fn record(&self, turn: ConversationTurn) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            conn.execute(
                r#"
                INSERT INTO turns (id, user_message, bot_reply, matched, ts)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    turn.id.to_string(),
                    turn.user_message,
                    turn.bot_reply,
                    turn.matched,
                    turn.timestamp.to_rfc3339(),
                ],
            )?;
            Ok::<(), anyhow::Error>(())
        })
        .await??;

        Ok(())
    }

    /// Page through history. The page is fetched newest-first and reversed,
    /// so within a page turns read oldest to newest.
    pub async fn history(&self, limit: usize, skip: usize) -> Result<HistoryPage> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let mut stmt = conn.prepare(
                r#"
                SELECT id, user_message, bot_reply, matched, ts
                FROM turns
                ORDER BY ts DESC, rowid DESC
                LIMIT ?1 OFFSET ?2
                "#,
            )?;
            let rows = stmt.query_map(params![limit as i64, skip as i64], row_to_turn)?;
            let mut turns = Vec::new();
            for row in rows {
                turns.push(row?);
            }
            turns.reverse();

            let total: i64 = conn.query_row("SELECT COUNT(*) FROM turns", [], |row| row.get(0))?;
            Ok::<HistoryPage, anyhow::Error>(HistoryPage {
                turns,
                total: total as u64,
            })
        })
        .await?
    }

    /// Wipe the log. Returns how many turns were deleted.
    pub async fn clear(&self) -> Result<usize> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let deleted = conn.execute("DELETE FROM turns", [])?;
            Ok::<usize, anyhow::Error>(deleted)
        })
        .await?
    }
}

fn row_to_turn(row: &Row<'_>) -> rusqlite::Result<ConversationTurn> {
    let id_raw: String = row.get(0)?;
    let ts_raw: String = row.get(4)?;
    Ok(ConversationTurn {
        id: crate::db::parse_uuid_sql(&id_raw)?,
        user_message: row.get(1)?,
        bot_reply: row.get(2)?,
        matched: row.get(3)?,
        timestamp: crate::db::parse_datetime_sql(&ts_raw)?,
    })
}
