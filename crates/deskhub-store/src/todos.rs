use chrono::Utc;
use tracing::instrument;

use deskhub_core::{Category, Priority, TodoItem};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const TODO_COLUMNS: &str = "id, task, completed, priority, category, created_at";

/// Completion counters over the whole todos table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TodoCounts {
    pub total: i64,
    pub completed: i64,
}

pub struct TodoRepo {
    db: Database,
}

impl TodoRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a todo. The caller is responsible for validating `task`.
    #[instrument(skip(self, task))]
    pub fn insert(
        &self,
        task: &str,
        priority: Priority,
        category: Category,
    ) -> Result<TodoItem, StoreError> {
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO todos (task, completed, priority, category, created_at)
                 VALUES (?1, 0, ?2, ?3, ?4)",
                rusqlite::params![task, priority.as_str(), category.as_str(), now],
            )?;

            Ok(TodoItem {
                id: conn.last_insert_rowid(),
                task: task.to_string(),
                completed: false,
                priority,
                category,
                created_at: now,
            })
        })
    }

    #[cfg(test)]
    fn get(&self, id: i64) -> Result<TodoItem, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => row_to_todo(row),
                None => Err(StoreError::NotFound(format!("todo {id}"))),
            }
        })
    }

    /// All todos, newest first. Ties on created_at fall back to id so the
    /// latest insert is always at the head.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<TodoItem>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TODO_COLUMNS} FROM todos ORDER BY created_at DESC, id DESC"
            ))?;
            let mut rows = stmt.query([])?;
            let mut todos = Vec::new();
            while let Some(row) = rows.next()? {
                todos.push(row_to_todo(row)?);
            }
            Ok(todos)
        })
    }

    /// Set the completion flag. Fails with NotFound when no row matched.
    #[instrument(skip(self))]
    pub fn set_completed(&self, id: i64, completed: bool) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE todos SET completed = ?1 WHERE id = ?2",
                rusqlite::params![completed, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("todo {id}")));
            }
            Ok(())
        })
    }

    /// Delete a todo. Returns whether a row was removed.
    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM todos WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    #[instrument(skip(self))]
    pub fn counts(&self) -> Result<TodoCounts, StoreError> {
        self.db.with_conn(|conn| {
            let (total, completed) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM todos",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(TodoCounts { total, completed })
        })
    }
}

fn row_to_todo(row: &rusqlite::Row<'_>) -> Result<TodoItem, StoreError> {
    let priority: String = row_helpers::get(row, 3, "todos", "priority")?;
    let category: String = row_helpers::get(row, 4, "todos", "category")?;

    Ok(TodoItem {
        id: row_helpers::get(row, 0, "todos", "id")?,
        task: row_helpers::get(row, 1, "todos", "task")?,
        completed: row_helpers::get(row, 2, "todos", "completed")?,
        priority: row_helpers::parse_enum(&priority, "todos", "priority")?,
        category: row_helpers::parse_enum(&category, "todos", "category")?,
        created_at: row_helpers::get(row, 5, "todos", "created_at")?,
    })
}
