pub mod errors;
pub mod generation;
pub mod num;
pub mod provider;
pub mod security;
pub mod settings;
pub mod todo;
pub mod weather;

pub use errors::UpstreamError;
pub use provider::{GenerateOptions, GenerativeModel};
pub use security::ApiKey;
pub use settings::{Credentials, Settings};
pub use todo::{Category, Priority, TodoFilter, TodoItem};
