//! Route handlers. Each one extracts and validates its input, calls exactly
//! one service, and shapes the JSON reply.

use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use deskhub_core::generation::{BlogRequest, BlogResponse, CodeRequest, CodeResponse};
use deskhub_core::todo::UnknownVariant;
use deskhub_core::weather::{ForecastReport, WeatherReport};
use deskhub_core::{Category, Priority, TodoItem};
use deskhub_engine::{Completion, DashboardStats};
use deskhub_store::Reminder;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

const FEATURES: &[&str] = &[
    "todos",
    "chat",
    "blog_generation",
    "code_generation",
    "weather",
    "reminders",
];

/// Parse an optional selector, treating absent or blank input as the default.
fn variant_or_default<T>(raw: Option<&str>) -> Result<T, UnknownVariant>
where
    T: FromStr<Err = UnknownVariant> + Default,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(s) => s.parse(),
    }
}

pub async fn banner(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "deskhub API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "features": FEATURES,
        "model": state.services.model_name(),
        "weather_configured": state.services.weather.is_configured(),
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct TodoQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
}

pub async fn list_todos(
    State(state): State<AppState>,
    query: Result<Query<TodoQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(q) = query?;
    let todos = state.services.tasks.filter_by(
        q.status.as_deref(),
        q.priority.as_deref(),
        q.category.as_deref(),
    )?;
    Ok(Json(json!({ "todos": todos })))
}

#[derive(Debug, Deserialize)]
pub struct NewTodo {
    pub task: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[instrument(skip_all)]
pub async fn add_todo(
    State(state): State<AppState>,
    payload: Result<Json<NewTodo>, JsonRejection>,
) -> ApiResult<Json<TodoItem>> {
    let Json(req) = payload?;
    let priority: Priority = variant_or_default(req.priority.as_deref())?;
    let category: Category = variant_or_default(req.category.as_deref())?;
    let todo = state.services.tasks.add_todo(&req.task, priority, category)?;
    Ok(Json(todo))
}

#[derive(Debug, Deserialize)]
pub struct CompletionQuery {
    pub completed: bool,
}

pub async fn update_todo(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<CompletionQuery>, QueryRejection>,
) -> ApiResult<Json<Completion>> {
    let Path(id) = id?;
    let Query(q) = query?;
    Ok(Json(state.services.tasks.set_completed(id, q.completed)?))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let deletion = state.services.tasks.delete_todo(id)?;
    let message = if deletion.deleted {
        "Todo deleted successfully"
    } else {
        "Todo not found"
    };
    Ok(Json(json!({ "message": message, "deleted": deletion.deleted })))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.services.stats()?))
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub message: String,
}

#[instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatMessage>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let exchange = state.services.chat.send(&req.message).await?;
    Ok(Json(json!({
        "user_message": exchange.user_message,
        "bot_response": exchange.bot_response,
        "timestamp": exchange.timestamp,
    })))
}

pub async fn chat_history(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let history = state.services.chat.history(deskhub_engine::chat::HISTORY_LIMIT)?;
    Ok(Json(json!({ "history": history })))
}

#[instrument(skip_all)]
pub async fn generate_blog(
    State(state): State<AppState>,
    payload: Result<Json<BlogRequest>, JsonRejection>,
) -> ApiResult<Json<BlogResponse>> {
    let Json(req) = payload?;
    let resp = state.services.blogs.generate(&req).await?;
    info!(word_count = resp.word_count, fallback = resp.note.is_some(), "blog generated");
    Ok(Json(resp))
}

pub async fn list_blogs(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let blogs = state.services.blogs.list()?;
    Ok(Json(json!({ "blogs": blogs })))
}

#[instrument(skip_all)]
pub async fn generate_code(
    State(state): State<AppState>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> ApiResult<Json<CodeResponse>> {
    let Json(req) = payload?;
    Ok(Json(state.services.code.generate(&req).await?))
}

pub async fn list_snippets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let snippets = state.services.code.list()?;
    Ok(Json(json!({ "snippets": snippets })))
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    #[serde(default)]
    pub location: String,
}

pub async fn current_weather(
    State(state): State<AppState>,
    payload: Result<Json<WeatherQuery>, JsonRejection>,
) -> ApiResult<Json<WeatherReport>> {
    let Json(req) = payload?;
    Ok(Json(state.services.weather.current(&req.location).await?))
}

pub async fn weather_forecast(
    State(state): State<AppState>,
    location: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<ForecastReport>> {
    let Path(location) = location?;
    Ok(Json(state.services.weather.forecast(&location).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewReminder {
    pub text: String,
    pub reminder_time: String,
}

pub async fn add_reminder(
    State(state): State<AppState>,
    payload: Result<Json<NewReminder>, JsonRejection>,
) -> ApiResult<Json<Reminder>> {
    let Json(req) = payload?;
    Ok(Json(state.services.reminders.add(&req.text, &req.reminder_time)?))
}

pub async fn list_reminders(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let reminders = state.services.reminders.list_active()?;
    Ok(Json(json!({ "reminders": reminders })))
}

pub async fn dismiss_reminder(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.services.reminders.dismiss(id)?;
    Ok(Json(json!({ "message": "Reminder dismissed", "id": id })))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("route".into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    use deskhub_core::errors::UpstreamError;
    use deskhub_core::provider::GenerativeModel;
    use deskhub_core::settings::Settings;
    use deskhub_engine::Services;
    use deskhub_llm::{MockModel, MockResponse, ReliableModel, RetryPolicy};
    use deskhub_store::Database;

    use crate::server::{build_router, AppState};

    use super::*;

    /// Router and generation budget derived from one request timeout, the
    /// way `main` wires them.
    fn app_with_timeout(model: Option<Arc<dyn GenerativeModel>>, request_timeout_secs: u64) -> Router {
        let mut settings = Settings::default();
        settings.server.request_timeout_secs = request_timeout_secs;
        let services = Services::new(
            Database::in_memory().unwrap(),
            model,
            None,
            settings.generation_budget(),
        );
        build_router(AppState::new(services), Duration::from_secs(request_timeout_secs))
    }

    fn app_with(model: Option<Arc<dyn GenerativeModel>>) -> Router {
        app_with_timeout(model, 5)
    }

    fn app() -> Router {
        app_with(None)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn banner_and_health() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert!(body["features"].as_array().unwrap().len() >= 5);
        assert!(body["model"].is_null());

        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn todo_lifecycle() {
        let app = app();
        let (status, first) = send(
            &app,
            Method::POST,
            "/todos/add",
            Some(json!({"task": "Water plants"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["priority"], "medium");
        assert_eq!(first["category"], "general");

        let (_, milk) = send(
            &app,
            Method::POST,
            "/todos/add",
            Some(json!({"task": "Buy milk", "priority": "high", "category": "personal"})),
        )
        .await;
        let id = milk["id"].as_i64().unwrap();
        assert_eq!(milk["completed"], false);

        let (_, list) = send(&app, Method::GET, "/todos", None).await;
        let todos = list["todos"].as_array().unwrap();
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0]["task"], "Buy milk");

        let (status, body) = send(&app, Method::PUT, &format!("/todos/{id}?completed=true"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": id, "completed": true}));

        let (_, done) = send(&app, Method::GET, "/todos?status=completed", None).await;
        assert_eq!(done["todos"].as_array().unwrap().len(), 1);

        let (_, stats) = send(&app, Method::GET, "/stats", None).await;
        assert_eq!(stats["total_tasks"], 2);
        assert_eq!(stats["completed_tasks"], 1);
        assert_eq!(stats["completion_rate"], 50.0);

        let (status, body) = send(&app, Method::DELETE, &format!("/todos/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], true);

        let (status, body) = send(&app, Method::DELETE, &format!("/todos/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], false);
    }

    #[tokio::test]
    async fn todo_validation_errors() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/todos/add", Some(json!({"task": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            &app,
            Method::POST,
            "/todos/add",
            Some(json!({"task": "x", "priority": "urgent"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::GET, "/todos?category=hobby", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PUT, "/todos/1?completed=maybe", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PUT, "/todos/abc?completed=true", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = app();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/todos/add")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn toggling_unknown_todo_is_not_found() {
        let app = app();
        let (status, body) = send(&app, Method::PUT, "/todos/999?completed=true", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn chat_without_model_uses_fallback_and_records_history() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/chat", Some(json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_message"], "hi");
        assert!(body["bot_response"].as_str().unwrap().contains("GEMINI_API_KEY"));

        let (_, history) = send(&app, Method::GET, "/chat/history", None).await;
        assert_eq!(history["history"].as_array().unwrap().len(), 1);

        let (_, stats) = send(&app, Method::GET, "/stats", None).await;
        assert_eq!(stats["chat_messages"], 1);
    }

    #[tokio::test]
    async fn blog_generation_with_model_is_saved() {
        let model: Arc<dyn GenerativeModel> =
            Arc::new(MockModel::new(vec![MockResponse::text("# Tea\n\nGreen tea is calming.")]));
        let app = app_with(Some(model));

        let (status, body) = send(
            &app,
            Method::POST,
            "/generate/blog",
            Some(json!({"topic": "Tea", "length": "short", "style": "casual"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["word_count"], 6);
        assert_eq!(body["model"], "Mock Model");
        assert!(body.get("note").is_none());
        assert_eq!(body["length"], "Short");

        let (_, blogs) = send(&app, Method::GET, "/blogs", None).await;
        assert_eq!(blogs["blogs"][0]["topic"], "Tea");
    }

    #[tokio::test]
    async fn code_generation_fallback_is_not_saved() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/code/generate",
            Some(json!({"description": "reverse a string"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "python");
        assert!(body["note"].is_string());

        let (_, snippets) = send(&app, Method::GET, "/code/snippets", None).await;
        assert!(snippets["snippets"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn weather_without_key_is_unavailable() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/weather", Some(json!({"location": "London"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Weather API key not configured");
        assert!(body["message"].is_string());

        let (status, _) = send(&app, Method::GET, "/weather/forecast/London", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn reminders_add_list_dismiss() {
        let app = app();
        let (status, reminder) = send(
            &app,
            Method::POST,
            "/reminders",
            Some(json!({"text": "Stand up", "reminder_time": "2026-10-20T09:00:00+02:00"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reminder["reminder_time"], "2026-10-20T07:00:00+00:00");
        let id = reminder["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            Method::POST,
            "/reminders",
            Some(json!({"text": "Later", "reminder_time": "tomorrow"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, list) = send(&app, Method::GET, "/reminders", None).await;
        assert_eq!(list["reminders"].as_array().unwrap().len(), 1);

        let (status, _) = send(&app, Method::DELETE, &format!("/reminders/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, list) = send(&app, Method::GET, "/reminders", None).await;
        assert!(list["reminders"].as_array().unwrap().is_empty());

        let (status, _) = send(&app, Method::DELETE, &format!("/reminders/{}", id + 100), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    fn slow(text: &str) -> MockResponse {
        MockResponse::delayed(Duration::from_secs(30), MockResponse::text(text))
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_blog_gets_fallback_before_request_timeout() {
        let limited = MockModel::new(vec![
            MockResponse::Error(UpstreamError::RateLimited {
                retry_after: Some(Duration::from_secs(5)),
            }),
            MockResponse::text("# Tea\n\nSteep it."),
        ]);
        let model: Arc<dyn GenerativeModel> = Arc::new(ReliableModel::new(limited, RetryPolicy::default()));
        let app = app_with_timeout(Some(model), 1);

        let started = tokio::time::Instant::now();
        let (status, body) = send(&app, Method::POST, "/generate/blog", Some(json!({"topic": "Tea"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(body["note"].is_string());
        assert!(body["content"].as_str().unwrap().contains("Tea"));

        let (_, blogs) = send(&app, Method::GET, "/blogs", None).await;
        assert!(blogs["blogs"].as_array().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn long_retry_after_hint_is_not_waited_out() {
        let limited = MockModel::new(vec![MockResponse::Error(UpstreamError::RateLimited {
            retry_after: Some(Duration::from_secs(3600)),
        })]);
        let model: Arc<dyn GenerativeModel> = Arc::new(ReliableModel::new(
            limited,
            RetryPolicy {
                budget: Settings::default().generation_budget(),
                ..RetryPolicy::default()
            },
        ));
        let app = app_with(Some(model));

        let started = tokio::time::Instant::now();
        let (status, body) = send(&app, Method::POST, "/generate/blog", Some(json!({"topic": "Tea"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(body["note"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_code_generation_gets_fallback() {
        let model: Arc<dyn GenerativeModel> = Arc::new(MockModel::new(vec![slow("print(1)"), slow("Prints one.")]));
        let app = app_with_timeout(Some(model), 1);

        let (status, body) = send(
            &app,
            Method::POST,
            "/code/generate",
            Some(json!({"description": "print one", "language": "python"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["note"].is_string());
        assert!(body["model"].is_null());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_chat_gets_fallback_reply() {
        let model: Arc<dyn GenerativeModel> = Arc::new(MockModel::new(vec![slow("hello there")]));
        let app = app_with_timeout(Some(model), 1);

        let (status, body) = send(&app, Method::POST, "/chat", Some(json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_message"], "hi");
        assert!(body["bot_response"].as_str().unwrap().contains("having trouble"));

        let (_, history) = send(&app, Method::GET, "/chat/history", None).await;
        assert_eq!(history["history"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, body) = send(&app(), Method::GET, "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[test]
    fn blank_selector_uses_default() {
        assert_eq!(variant_or_default::<Priority>(None).unwrap(), Priority::Medium);
        assert_eq!(variant_or_default::<Category>(Some(" ")).unwrap(), Category::General);
        assert_eq!(variant_or_default::<Priority>(Some("HIGH")).unwrap(), Priority::High);
        assert!(variant_or_default::<Category>(Some("hobby")).is_err());
    }
}
