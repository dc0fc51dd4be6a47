pub mod blogs;
pub mod chat;
pub mod database;
pub mod error;
pub mod reminders;
pub mod row_helpers;
pub mod schema;
pub mod snippets;
pub mod todos;

pub use blogs::{BlogPost, BlogRepo};
pub use chat::{ChatExchange, ChatRepo};
pub use database::Database;
pub use error::StoreError;
pub use reminders::{Reminder, ReminderRepo};
pub use snippets::{CodeSnippet, SnippetRepo};
pub use todos::TodoRepo;
