use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use deskhub_core::provider::GenerativeModel;
use deskhub_core::settings::{load_settings, Settings};
use deskhub_engine::{Services, WeatherClient};
use deskhub_llm::{GeminiModel, ReliableModel, RetryPolicy};
use deskhub_server::ServerConfig;
use deskhub_store::Database;
use deskhub_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "deskhub")]
#[command(about = "Personal productivity dashboard backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ~/.deskhub/settings.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

fn build_model(settings: &Settings) -> anyhow::Result<Option<Arc<dyn GenerativeModel>>> {
    let Some(key) = settings.credentials.gemini.clone() else {
        tracing::warn!("GEMINI_API_KEY not configured, generation uses fallback content");
        return Ok(None);
    };
    let providers = &settings.providers;
    let gemini = GeminiModel::new(
        key,
        &providers.gemini_model,
        &providers.gemini_base_url,
        Duration::from_secs(providers.generation_timeout_secs),
    )
    .context("build Gemini client")?;
    let policy = RetryPolicy {
        max_retries: providers.max_retries,
        budget: settings.generation_budget(),
        ..RetryPolicy::default()
    };
    tracing::info!(
        model = %providers.gemini_model,
        budget_ms = policy.budget.as_millis() as u64,
        "generation provider configured"
    );
    Ok(Some(Arc::new(ReliableModel::new(gemini, policy))))
}

fn build_weather(settings: &Settings) -> anyhow::Result<Option<WeatherClient>> {
    let Some(key) = settings.credentials.weather.clone() else {
        tracing::warn!("WEATHER_API_KEY not configured, weather lookups are disabled");
        return Ok(None);
    };
    let providers = &settings.providers;
    let client = WeatherClient::new(
        key,
        &providers.weather_base_url,
        Duration::from_secs(providers.weather_timeout_secs),
    )
    .context("build weather client")?;
    Ok(Some(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loaded = load_settings(cli.config.as_deref()).context("load settings")?;
    if let Some(host) = cli.host {
        loaded.settings.server.host = host;
    }
    if let Some(port) = cli.port {
        loaded.settings.server.port = port;
    }
    if let Some(db) = cli.db {
        loaded.settings.storage.db_path = db;
    }

    let _telemetry = init_telemetry(TelemetryConfig::from(&loaded.settings.logging));
    tracing::info!("starting deskhub");
    loaded.log_diagnostics();
    let settings = loaded.settings;

    let db = Database::open(&settings.storage.db_path)
        .with_context(|| format!("open database at {}", settings.storage.db_path.display()))?;

    let services = Services::new(
        db,
        build_model(&settings)?,
        build_weather(&settings)?,
        settings.generation_budget(),
    );
    let handle = deskhub_server::start(ServerConfig::from(&settings.server), services)
        .await
        .context("start server")?;

    tracing::info!(port = handle.port, "deskhub ready");

    tokio::signal::ctrl_c().await.context("listen for ctrl+c")?;
    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}
