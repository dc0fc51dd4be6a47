use serde::Serialize;

use crate::chat::ChatService;
use crate::error::EngineError;
use crate::tasks::TaskService;

/// Dashboard header counters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub completion_rate: f64,
    pub chat_messages: i64,
}

pub fn dashboard_stats(tasks: &TaskService, chat: &ChatService) -> Result<DashboardStats, EngineError> {
    let task_stats = tasks.stats()?;
    Ok(DashboardStats {
        total_tasks: task_stats.total,
        completed_tasks: task_stats.completed,
        pending_tasks: task_stats.pending,
        completion_rate: task_stats.completion_rate,
        chat_messages: chat.message_count()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhub_core::{Category, Priority};
    use deskhub_store::Database;

    #[tokio::test]
    async fn combines_task_and_chat_counts() {
        let db = Database::in_memory().unwrap();
        let tasks = TaskService::new(db.clone());
        let chat = ChatService::new(db, None);

        let done = tasks.add_todo("done", Priority::Low, Category::General).unwrap();
        tasks.add_todo("open", Priority::Low, Category::General).unwrap();
        tasks.set_completed(done.id, true).unwrap();
        chat.send("hi").await.unwrap();

        let stats = dashboard_stats(&tasks, &chat).unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_tasks: 2,
                completed_tasks: 1,
                pending_tasks: 1,
                completion_rate: 50.0,
                chat_messages: 1,
            }
        );
    }
}
