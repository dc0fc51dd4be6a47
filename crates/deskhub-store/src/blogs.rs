use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: i64,
    pub topic: String,
    pub content: String,
    pub word_count: i64,
    pub created_at: String,
}

pub struct BlogRepo {
    db: Database,
}

impl BlogRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, content))]
    pub fn insert(&self, topic: &str, content: &str, word_count: usize) -> Result<BlogPost, StoreError> {
        let now = Utc::now().to_rfc3339();
        let word_count = row_helpers::to_sql_count(word_count);
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO blog_content (topic, content, word_count, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![topic, content, word_count, now],
            )?;
            Ok(BlogPost {
                id: conn.last_insert_rowid(),
                topic: topic.to_string(),
                content: content.to_string(),
                word_count,
                created_at: now,
            })
        })
    }

    /// Saved posts, newest first.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<BlogPost>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, topic, content, word_count, created_at FROM blog_content ORDER BY id DESC",
            )?;
            let mut rows = stmt.query([])?;
            let mut posts = Vec::new();
            while let Some(row) = rows.next()? {
                posts.push(BlogPost {
                    id: row_helpers::get(row, 0, "blog_content", "id")?,
                    topic: row_helpers::get(row, 1, "blog_content", "topic")?,
                    content: row_helpers::get(row, 2, "blog_content", "content")?,
                    word_count: row_helpers::get(row, 3, "blog_content", "word_count")?,
                    created_at: row_helpers::get(row, 4, "blog_content", "created_at")?,
                });
            }
            Ok(posts)
        })
    }
}
