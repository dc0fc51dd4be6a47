pub mod budget;
pub mod chat;
pub mod code;
pub mod content;
pub mod error;
pub mod reminders;
pub mod stats;
pub mod tasks;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use deskhub_core::provider::GenerativeModel;
use deskhub_store::Database;

pub use budget::DEFAULT_GENERATION_BUDGET;
pub use chat::ChatService;
pub use code::CodeGenerator;
pub use content::BlogGenerator;
pub use error::EngineError;
pub use reminders::ReminderService;
pub use stats::{dashboard_stats, DashboardStats};
pub use tasks::{Completion, Deletion, TaskService, TaskStats};
pub use weather::{WeatherClient, WeatherError, WeatherService};

/// Every service the HTTP layer dispatches to, sharing one database.
///
/// Provider capabilities are fixed here: a missing model or weather client
/// selects the fallback behavior for the lifetime of the process.
/// `generation_budget` bounds the model work of each blog, code and chat
/// request.
pub struct Services {
    pub tasks: TaskService,
    pub blogs: BlogGenerator,
    pub code: CodeGenerator,
    pub chat: ChatService,
    pub reminders: ReminderService,
    pub weather: WeatherService,
    model_name: Option<String>,
}

impl Services {
    pub fn new(
        db: Database,
        model: Option<Arc<dyn GenerativeModel>>,
        weather: Option<WeatherClient>,
        generation_budget: Duration,
    ) -> Self {
        Self {
            model_name: model.as_ref().map(|m| m.display_name().to_string()),
            tasks: TaskService::new(db.clone()),
            blogs: BlogGenerator::new(db.clone(), model.clone()).with_budget(generation_budget),
            code: CodeGenerator::new(db.clone(), model.clone()).with_budget(generation_budget),
            chat: ChatService::new(db.clone(), model).with_budget(generation_budget),
            reminders: ReminderService::new(db),
            weather: WeatherService::new(weather),
        }
    }

    /// Display name of the configured generative model, if any.
    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn stats(&self) -> Result<DashboardStats, EngineError> {
        dashboard_stats(&self.tasks, &self.chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhub_llm::{MockModel, MockResponse};

    #[tokio::test]
    async fn services_share_one_database() {
        let model: Arc<dyn GenerativeModel> = Arc::new(MockModel::new(vec![MockResponse::text("hey")]));
        let services = Services::new(
            Database::in_memory().unwrap(),
            Some(model),
            None,
            DEFAULT_GENERATION_BUDGET,
        );
        assert_eq!(services.model_name(), Some("Mock Model"));
        assert!(!services.weather.is_configured());

        services.chat.send("hello").await.unwrap();
        assert_eq!(services.stats().unwrap().chat_messages, 1);
    }

    #[test]
    fn without_model_has_no_name() {
        let services = Services::new(Database::in_memory().unwrap(), None, None, DEFAULT_GENERATION_BUDGET);
        assert!(services.model_name().is_none());
    }
}
