use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub text: String,
    pub reminder_time: String,
    pub is_active: bool,
    pub created_at: String,
}

pub struct ReminderRepo {
    db: Database,
}

impl ReminderRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert an active reminder. `reminder_time` is stored as given (RFC 3339).
    #[instrument(skip(self, text))]
    pub fn insert(&self, text: &str, reminder_time: &str) -> Result<Reminder, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reminders (text, reminder_time, is_active, created_at) VALUES (?1, ?2, 1, ?3)",
                rusqlite::params![text, reminder_time, now],
            )?;
            Ok(Reminder {
                id: conn.last_insert_rowid(),
                text: text.to_string(),
                reminder_time: reminder_time.to_string(),
                is_active: true,
                created_at: now,
            })
        })
    }

    /// Active reminders, soonest first.
    #[instrument(skip(self))]
    pub fn list_active(&self) -> Result<Vec<Reminder>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, text, reminder_time, is_active, created_at FROM reminders
                 WHERE is_active = 1 ORDER BY reminder_time ASC, id ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut reminders = Vec::new();
            while let Some(row) = rows.next()? {
                reminders.push(Reminder {
                    id: row_helpers::get(row, 0, "reminders", "id")?,
                    text: row_helpers::get(row, 1, "reminders", "text")?,
                    reminder_time: row_helpers::get(row, 2, "reminders", "reminder_time")?,
                    is_active: row_helpers::get(row, 3, "reminders", "is_active")?,
                    created_at: row_helpers::get(row, 4, "reminders", "created_at")?,
                });
            }
            Ok(reminders)
        })
    }

    /// Deactivate a reminder. Rows are never hard-deleted.
    #[instrument(skip(self))]
    pub fn dismiss(&self, id: i64) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute("UPDATE reminders SET is_active = 0 WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("reminder {id}")));
            }
            Ok(())
        })
    }
}
