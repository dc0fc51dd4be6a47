//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`Settings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Load `.env` from the working directory (existing variables win)
//! 4. Apply environment variable overrides (highest priority)
//!
//! Provider credentials are never read from the settings file; they only come
//! from the environment and end up in [`Credentials`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::security::{ApiKey, GEMINI_API_KEY_ENV, WEATHER_API_KEY_ENV};

/// Errors that can occur when loading or parsing settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound on the whole request, including upstream calls.
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    pub db_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: deskhub_dir().join("database").join("deskhub.db"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level; RUST_LOG still takes precedence.
    pub level: String,
    /// Persist warn+ events to a separate SQLite file.
    pub log_to_sqlite: bool,
    pub log_db_path: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            log_to_sqlite: true,
            log_db_path: deskhub_dir().join("database").join("deskhub-logs.db"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub generation_timeout_secs: u64,
    pub max_retries: u32,
    pub weather_base_url: String,
    pub weather_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            gemini_model: "gemini-2.0-flash-exp".into(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            generation_timeout_secs: 60,
            max_retries: 2,
            weather_base_url: "https://api.openweathermap.org/data/2.5".into(),
            weather_timeout_secs: 10,
        }
    }
}

/// Credentials resolved from the environment. Each one is optional.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub gemini: Option<ApiKey>,
    pub weather: Option<ApiKey>,
}

impl Credentials {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            gemini: ApiKey::from_configured(lookup(GEMINI_API_KEY_ENV).as_deref()),
            weather: ApiKey::from_configured(lookup(WEATHER_API_KEY_ENV).as_deref()),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
    pub providers: ProviderSettings,
    #[serde(skip)]
    pub credentials: Credentials,
}

/// Share of the request timeout that provider work may use, leaving room to
/// build and send the fallback response.
const GENERATION_SHARE_PERCENT: u64 = 80;

impl Settings {
    /// Upper bound on all provider work for one generation or chat request.
    pub fn generation_budget(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_secs * 1000 * GENERATION_SHARE_PERCENT / 100)
    }
}

/// `~/.deskhub`, falling back to `/tmp/.deskhub` without a home directory.
pub fn deskhub_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".deskhub")
}

/// Resolve the path to the default settings file (`~/.deskhub/settings.json`).
pub fn settings_path() -> PathBuf {
    deskhub_dir().join("settings.json")
}

/// An environment override that was present but could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IgnoredEnv {
    pub key: &'static str,
    pub value: String,
}

/// Settings plus what happened while loading them.
///
/// Loading runs before the tracing subscriber exists, so nothing is logged
/// here; call [`LoadedSettings::log_diagnostics`] once telemetry is up.
#[derive(Debug)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub settings_file: PathBuf,
    pub file_found: bool,
    pub env_file: Option<PathBuf>,
    pub ignored_env: Vec<IgnoredEnv>,
}

impl LoadedSettings {
    pub fn log_diagnostics(&self) {
        if let Some(env_file) = &self.env_file {
            debug!(path = %env_file.display(), "loaded .env");
        }
        if self.file_found {
            debug!(path = %self.settings_file.display(), "loaded settings file");
        } else {
            debug!(path = %self.settings_file.display(), "settings file not found, using defaults");
        }
        for ignored in &self.ignored_env {
            warn!(key = ignored.key, value = %ignored.value, "invalid env override, ignoring");
        }
    }
}

/// Load settings from `path` (or the default path), `.env`, and the process environment.
pub fn load_settings(path: Option<&Path>) -> Result<LoadedSettings, SettingsError> {
    let env_file = dotenvy::dotenv().ok();
    let settings_file = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
    let file_found = settings_file.exists();
    let mut settings = load_settings_file(&settings_file)?;
    let lookup = |key: &str| std::env::var(key).ok();
    let ignored_env = apply_env_overrides(&mut settings, lookup);
    settings.credentials = Credentials::from_lookup(lookup);
    Ok(LoadedSettings {
        settings,
        settings_file,
        file_found,
        env_file,
        ignored_env,
    })
}

/// Load settings from a file merged over defaults, without touching the environment.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_file(path: &Path) -> Result<Settings, SettingsError> {
    let defaults = serde_json::to_value(Settings::default())?;

    let merged = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `DESKHUB_*` overrides. Invalid values are skipped and returned.
pub fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<IgnoredEnv> {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let mut ignored = Vec::new();
    let mut skip = |key: &'static str, value: String| ignored.push(IgnoredEnv { key, value });

    if let Some(v) = read("DESKHUB_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("DESKHUB_PORT") {
        match parse_u64_range(&v, 1, 65535) {
            Some(port) => settings.server.port = port as u16,
            None => skip("DESKHUB_PORT", v),
        }
    }
    if let Some(v) = read("DESKHUB_REQUEST_TIMEOUT_SECS") {
        match parse_u64_range(&v, 1, 3600) {
            Some(n) => settings.server.request_timeout_secs = n,
            None => skip("DESKHUB_REQUEST_TIMEOUT_SECS", v),
        }
    }
    if let Some(v) = read("DESKHUB_DB_PATH") {
        settings.storage.db_path = PathBuf::from(v);
    }
    if let Some(v) = read("DESKHUB_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("DESKHUB_LOG_TO_SQLITE") {
        match parse_bool(&v) {
            Some(b) => settings.logging.log_to_sqlite = b,
            None => skip("DESKHUB_LOG_TO_SQLITE", v),
        }
    }
    if let Some(v) = read("DESKHUB_GEMINI_MODEL") {
        settings.providers.gemini_model = v;
    }
    if let Some(v) = read("DESKHUB_WEATHER_TIMEOUT_SECS") {
        match parse_u64_range(&v, 1, 600) {
            Some(n) => settings.providers.weather_timeout_secs = n,
            None => skip("DESKHUB_WEATHER_TIMEOUT_SECS", v),
        }
    }
    if let Some(v) = read("DESKHUB_GENERATION_TIMEOUT_SECS") {
        match parse_u64_range(&v, 1, 600) {
            Some(n) => settings.providers.generation_timeout_secs = n,
            None => skip("DESKHUB_GENERATION_TIMEOUT_SECS", v),
        }
    }
    ignored
}

/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
