use std::sync::Arc;
use std::time::Duration;

use axum::extract::{MatchedPath, Request};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use deskhub_core::settings::ServerSettings;
use deskhub_engine::Services;

use crate::handlers;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            request_timeout_secs: s.request_timeout_secs,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(handlers::banner))
        .route("/health", get(handlers::health))
        .route("/todos", get(handlers::list_todos))
        .route("/todos/add", post(handlers::add_todo))
        .route("/todos/{id}", put(handlers::update_todo).delete(handlers::delete_todo))
        .route("/stats", get(handlers::stats))
        .route("/chat", post(handlers::chat))
        .route("/chat/history", get(handlers::chat_history))
        .route("/generate/blog", post(handlers::generate_blog))
        .route("/blogs", get(handlers::list_blogs))
        .route("/code/generate", post(handlers::generate_code))
        .route("/code/snippets", get(handlers::list_snippets))
        .route("/weather", post(handlers::current_weather))
        .route("/weather/forecast/{location}", get(handlers::weather_forecast))
        .route("/reminders", post(handlers::add_reminder).get(handlers::list_reminders))
        .route("/reminders/{id}", delete(handlers::dismiss_reminder))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request| {
                let route = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str)
                    .unwrap_or("unmatched");
                info_span!("http_request", method = %req.method(), route = %route)
            }),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
}

/// Bind and serve. Returns a handle to shut the server down.
pub async fn start(config: ServerConfig, services: Services) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(
        AppState::new(services),
        Duration::from_secs(config.request_timeout_secs),
    );
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(host = %config.host, port = local_addr.port(), "deskhub server started");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let shutdown = async {
            shutdown_rx.await.ok();
        };
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
        {
            tracing::error!(error = %e, "server stopped with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        shutdown_tx,
        server,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub port: u16,
    shutdown_tx: oneshot::Sender<()>,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.server.await {
            tracing::warn!(error = %e, "server task ended abnormally");
        }
        tracing::info!("deskhub server stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhub_store::Database;

    fn services() -> Services {
        Services::new(
            Database::in_memory().unwrap(),
            None,
            None,
            deskhub_engine::DEFAULT_GENERATION_BUDGET,
        )
    }

    #[tokio::test]
    async fn start_serves_health_and_shuts_down() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            request_timeout_secs: 5,
        };
        let handle = start(config, services()).await.unwrap();
        assert_ne!(handle.port, 0);

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(body["status"], "healthy");

        handle.shutdown().await;
        assert!(reqwest::get(&url).await.is_err());
    }

    #[test]
    fn config_from_settings() {
        let settings = ServerSettings {
            host: "127.0.0.1".into(),
            port: 9000,
            request_timeout_secs: 30,
        };
        let config = ServerConfig::from(&settings);
        assert_eq!(config.port, 9000);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(ServerConfig::default().port, 8000);
    }
}
