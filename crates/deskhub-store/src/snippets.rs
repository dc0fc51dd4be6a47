use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// A saved code snippet. `description` holds the generated explanation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub id: i64,
    pub title: String,
    pub language: String,
    pub code: String,
    pub description: String,
    pub created_at: String,
}

pub struct SnippetRepo {
    db: Database,
}

impl SnippetRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, code, description))]
    pub fn insert(
        &self,
        title: &str,
        language: &str,
        code: &str,
        description: &str,
    ) -> Result<CodeSnippet, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO code_snippets (title, language, code, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![title, language, code, description, now],
            )?;
            Ok(CodeSnippet {
                id: conn.last_insert_rowid(),
                title: title.to_string(),
                language: language.to_string(),
                code: code.to_string(),
                description: description.to_string(),
                created_at: now,
            })
        })
    }

    /// Saved snippets, newest first.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<CodeSnippet>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, language, code, description, created_at
                 FROM code_snippets ORDER BY id DESC",
            )?;
            let mut rows = stmt.query([])?;
            let mut snippets = Vec::new();
            while let Some(row) = rows.next()? {
                snippets.push(CodeSnippet {
                    id: row_helpers::get(row, 0, "code_snippets", "id")?,
                    title: row_helpers::get(row, 1, "code_snippets", "title")?,
                    language: row_helpers::get(row, 2, "code_snippets", "language")?,
                    code: row_helpers::get(row, 3, "code_snippets", "code")?,
                    description: row_helpers::get(row, 4, "code_snippets", "description")?,
                    created_at: row_helpers::get(row, 5, "code_snippets", "created_at")?,
                });
            }
            Ok(snippets)
        })
    }
}
