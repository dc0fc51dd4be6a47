use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// One user message and the reply it received.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub id: i64,
    pub user_message: String,
    pub bot_response: String,
    pub timestamp: String,
}

pub struct ChatRepo {
    db: Database,
}

impl ChatRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip_all)]
    pub fn insert(&self, user_message: &str, bot_response: &str) -> Result<ChatExchange, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_history (user_message, bot_response, timestamp) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_message, bot_response, now],
            )?;
            Ok(ChatExchange {
                id: conn.last_insert_rowid(),
                user_message: user_message.to_string(),
                bot_response: bot_response.to_string(),
                timestamp: now,
            })
        })
    }

    /// The last `limit` exchanges, oldest first.
    #[instrument(skip(self))]
    pub fn recent(&self, limit: u32) -> Result<Vec<ChatExchange>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_message, bot_response, timestamp FROM chat_history
                 ORDER BY id DESC LIMIT ?1",
            )?;
            let mut rows = stmt.query([limit])?;
            let mut history = Vec::new();
            while let Some(row) = rows.next()? {
                history.push(ChatExchange {
                    id: row_helpers::get(row, 0, "chat_history", "id")?,
                    user_message: row_helpers::get(row, 1, "chat_history", "user_message")?,
                    bot_response: row_helpers::get(row, 2, "chat_history", "bot_response")?,
                    timestamp: row_helpers::get(row, 3, "chat_history", "timestamp")?,
                });
            }
            history.reverse();
            Ok(history)
        })
    }

    #[instrument(skip(self))]
    pub fn count(&self) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM chat_history", [], |row| row.get(0))?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ChatRepo {
        ChatRepo::new(Database::in_memory().unwrap())
    }

    #[test]
    fn insert_and_count() {
        let repo = setup();
        assert_eq!(repo.count().unwrap(), 0);
        let exchange = repo.insert("hello", "hi there").unwrap();
        assert!(exchange.id > 0);
        assert_eq!(exchange.user_message, "hello");
        assert_eq!(exchange.bot_response, "hi there");
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn recent_returns_tail_in_chronological_order() {
        let repo = setup();
        for i in 0..25 {
            repo.insert(&format!("q{i}"), &format!("a{i}")).unwrap();
        }
        let history = repo.recent(20).unwrap();
        assert_eq!(history.len(), 20);
        assert_eq!(history.first().unwrap().user_message, "q5");
        assert_eq!(history.last().unwrap().user_message, "q24");
    }

    #[test]
    fn recent_on_empty_table() {
        assert!(setup().recent(20).unwrap().is_empty());
    }
}
