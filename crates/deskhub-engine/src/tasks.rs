use serde::Serialize;
use tracing::{info, instrument};

use deskhub_core::{Category, Priority, TodoFilter, TodoItem};
use deskhub_store::{Database, TodoRepo};

use crate::error::{required, EngineError};

/// Result of a completion toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub id: i64,
    pub completed: bool,
}

/// Result of a delete. `deleted` is false when the id did not exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Deletion {
    pub id: i64,
    pub deleted: bool,
}

/// Completion summary over all todos.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    /// Percent, one decimal. Zero when there are no todos.
    pub completion_rate: f64,
}

/// Todo CRUD plus filtering. Holds no state of its own; every call reads
/// or writes the store directly.
pub struct TaskService {
    repo: TodoRepo,
}

impl TaskService {
    pub fn new(db: Database) -> Self {
        Self {
            repo: TodoRepo::new(db),
        }
    }

    /// All todos, newest first.
    pub fn list_todos(&self) -> Result<Vec<TodoItem>, EngineError> {
        Ok(self.repo.list()?)
    }

    #[instrument(skip(self, task))]
    pub fn add_todo(
        &self,
        task: &str,
        priority: Priority,
        category: Category,
    ) -> Result<TodoItem, EngineError> {
        let task = required("task", task)?;
        let todo = self.repo.insert(&task, priority, category)?;
        info!(todo_id = todo.id, "todo added");
        Ok(todo)
    }

    #[instrument(skip(self))]
    pub fn set_completed(&self, id: i64, completed: bool) -> Result<Completion, EngineError> {
        self.repo.set_completed(id, completed)?;
        Ok(Completion { id, completed })
    }

    #[instrument(skip(self))]
    pub fn delete_todo(&self, id: i64) -> Result<Deletion, EngineError> {
        let deleted = self.repo.delete(id)?;
        if deleted {
            info!(todo_id = id, "todo deleted");
        }
        Ok(Deletion { id, deleted })
    }

    /// Conjunctive filter over `list_todos()`, order preserved.
    pub fn filter(&self, filter: &TodoFilter) -> Result<Vec<TodoItem>, EngineError> {
        Ok(filter.apply(self.list_todos()?))
    }

    /// Filter from raw selector strings. Unknown values are validation errors.
    pub fn filter_by(
        &self,
        status: Option<&str>,
        priority: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<TodoItem>, EngineError> {
        let filter = TodoFilter::parse(status, priority, category)?;
        self.filter(&filter)
    }

    pub fn stats(&self) -> Result<TaskStats, EngineError> {
        let counts = self.repo.counts()?;
        let completion_rate = if counts.total == 0 {
            0.0
        } else {
            deskhub_core::num::round1(counts.completed as f64 * 100.0 / counts.total as f64)
        };
        Ok(TaskStats {
            total: counts.total,
            completed: counts.completed,
            pending: counts.total - counts.completed,
            completion_rate,
        })
    }
}
