pub mod gemini;
pub mod models;
pub mod reliable;

pub mod mock;

pub use gemini::GeminiModel;
pub use mock::{MockModel, MockResponse};
pub use reliable::{ReliableModel, RetryPolicy};
