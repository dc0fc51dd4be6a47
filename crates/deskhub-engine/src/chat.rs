use std::sync::Arc;
use std::time::Duration;

use tracing::{instrument, warn};

use deskhub_core::provider::{GenerateOptions, GenerativeModel};
use deskhub_store::{ChatExchange, ChatRepo, Database};

use crate::budget::{within, DEFAULT_GENERATION_BUDGET};
use crate::error::{required, EngineError};

pub const HISTORY_LIMIT: u32 = 20;

pub struct ChatService {
    model: Option<Arc<dyn GenerativeModel>>,
    repo: ChatRepo,
    budget: Duration,
}

impl ChatService {
    pub fn new(db: Database, model: Option<Arc<dyn GenerativeModel>>) -> Self {
        Self {
            model,
            repo: ChatRepo::new(db),
            budget: DEFAULT_GENERATION_BUDGET,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Answer a message and persist the exchange. Live or fallback, the
    /// exchange is always saved.
    #[instrument(skip_all)]
    pub async fn send(&self, message: &str) -> Result<ChatExchange, EngineError> {
        let message = required("message", message)?;

        let reply = match &self.model {
            None => format!(
                "Hello! You said: '{message}'. I'm your assistant, but I need a Gemini API key to give intelligent responses. Please configure GEMINI_API_KEY in your .env file."
            ),
            Some(model) => match within(
                self.budget,
                model.generate(&chat_prompt(&message), &GenerateOptions::default()),
            )
            .await
            {
                Ok(text) => text,
                Err(e) => {
                    warn!(provider = model.name(), error_kind = e.error_kind(), error = %e, "chat generation failed, using fallback");
                    format!(
                        "I'm here to help! You asked: '{message}'. My AI features are having trouble right now, but the other tools on the dashboard still work."
                    )
                }
            },
        };

        Ok(self.repo.insert(&message, &reply)?)
    }

    /// The last `limit` exchanges, oldest first.
    pub fn history(&self, limit: u32) -> Result<Vec<ChatExchange>, EngineError> {
        Ok(self.repo.recent(limit)?)
    }

    pub fn message_count(&self) -> Result<i64, EngineError> {
        Ok(self.repo.count()?)
    }
}

fn chat_prompt(message: &str) -> String {
    format!(
        "You are a helpful AI assistant. Respond to this message in a friendly and helpful way:

User: {message}

Keep your response concise but informative."
    )
}
