//! Persists warnings and errors to a local SQLite file so failed provider
//! calls and storage faults can be inspected after the fact.
//!
//! Each row carries the HTTP `route` and generation/weather `provider` of the
//! enclosing spans when the event itself does not name them.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::Connection;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{span, Level};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
CREATE TABLE IF NOT EXISTS logs (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    logged_at TEXT NOT NULL,
    level     TEXT NOT NULL,
    target    TEXT NOT NULL,
    message   TEXT NOT NULL,
    route     TEXT,
    provider  TEXT,
    fields    TEXT
);
CREATE INDEX IF NOT EXISTS idx_logs_logged_at ON logs(logged_at);
";

/// Write side of the warning log.
pub struct SqliteLogSink {
    conn: Mutex<Connection>,
}

impl SqliteLogSink {
    pub fn new(db_path: &Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn write(&self, entry: &Entry) {
        // Errors are dropped: logging must not fail the request being logged.
        let _ = self.conn.lock().execute(
            "INSERT INTO logs (logged_at, level, target, message, route, provider, fields)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                Utc::now().to_rfc3339(),
                entry.level.as_str(),
                entry.target,
                entry.message,
                entry.context.route,
                entry.context.provider,
                entry.fields,
            ],
        );
    }

    #[cfg(test)]
    fn rows(&self) -> Vec<(String, String, Option<String>, Option<String>, Option<String>)> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT level, message, route, provider, fields FROM logs ORDER BY id")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }
}

/// Route and provider attached to a span, inherited by events inside it.
#[derive(Clone, Debug, Default)]
struct RequestContext {
    route: Option<String>,
    provider: Option<String>,
}

impl RequestContext {
    fn fill_from(&mut self, outer: &RequestContext) {
        if self.route.is_none() {
            self.route.clone_from(&outer.route);
        }
        if self.provider.is_none() {
            self.provider.clone_from(&outer.provider);
        }
    }

    fn is_complete(&self) -> bool {
        self.route.is_some() && self.provider.is_some()
    }
}

/// Collects every field of an event or span into a JSON map.
#[derive(Default)]
struct Fields(Map<String, Value>);

impl Fields {
    fn take_text(&mut self, key: &str) -> Option<String> {
        match self.0.remove(key)? {
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    /// Split out the message and context, leaving the remaining fields.
    fn into_parts(mut self) -> (String, RequestContext, Option<String>) {
        let message = self.take_text("message").unwrap_or_default();
        let context = RequestContext {
            route: self.take_text("route"),
            provider: self.take_text("provider"),
        };
        let rest = (!self.0.is_empty()).then(|| Value::Object(self.0).to_string());
        (message, context, rest)
    }
}

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }
}

struct Entry {
    level: Level,
    target: String,
    message: String,
    context: RequestContext,
    fields: Option<String>,
}

/// Layer that hands WARN and ERROR events to a [`SqliteLogSink`].
pub struct SqliteLogLayer {
    sink: Arc<SqliteLogSink>,
}

impl SqliteLogLayer {
    pub fn new(sink: Arc<SqliteLogSink>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for SqliteLogLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        attrs.record(&mut fields);
        let (_, context, _) = fields.into_parts();
        if context.route.is_none() && context.provider.is_none() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(context);
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::WARN {
            return;
        }

        let mut fields = Fields::default();
        event.record(&mut fields);
        let (message, mut context, rest) = fields.into_parts();

        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if context.is_complete() {
                    break;
                }
                if let Some(outer) = span.extensions().get::<RequestContext>() {
                    context.fill_from(outer);
                }
            }
        }

        self.sink.write(&Entry {
            level,
            target: event.metadata().target().to_string(),
            message,
            context,
            fields: rest,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tracing_subscriber::layer::SubscriberExt;

    fn temp_db() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("deskhub-test-logs-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("warnings.db")
    }

    fn capture(f: impl FnOnce()) -> Arc<SqliteLogSink> {
        let sink = Arc::new(SqliteLogSink::new(&temp_db()).unwrap());
        let subscriber = tracing_subscriber::registry().with(SqliteLogLayer::new(sink.clone()));
        tracing::subscriber::with_default(subscriber, f);
        sink
    }

    #[test]
    fn only_warnings_and_errors_are_kept() {
        let sink = capture(|| {
            tracing::debug!("noise");
            tracing::info!("server listening");
            tracing::warn!("weather lookup failed");
            tracing::error!("database write failed");
        });
        let levels: Vec<String> = sink.rows().into_iter().map(|r| r.0).collect();
        assert_eq!(levels, vec!["WARN", "ERROR"]);
    }

    #[test]
    fn route_and_provider_come_from_enclosing_spans() {
        let sink = capture(|| {
            let request = tracing::info_span!("request", route = "/generate/blog");
            let _r = request.enter();
            let call = tracing::info_span!("call", provider = "gemini");
            let _c = call.enter();
            tracing::warn!(retry = 1_u64, wait_ms = 500_u64, "generation call failed, retrying");
        });

        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        let (_, message, route, provider, fields) = &rows[0];
        assert_eq!(message, "generation call failed, retrying");
        assert_eq!(route.as_deref(), Some("/generate/blog"));
        assert_eq!(provider.as_deref(), Some("gemini"));
        let fields: Value = serde_json::from_str(fields.as_deref().unwrap()).unwrap();
        assert_eq!(fields["wait_ms"], 500);
    }

    #[test]
    fn event_fields_win_over_span_context() {
        let sink = capture(|| {
            let span = tracing::info_span!("request", route = "/weather", provider = "openweathermap");
            let _g = span.enter();
            tracing::warn!(provider = "gemini", "odd provider");
        });
        let rows = sink.rows();
        assert_eq!(rows[0].2.as_deref(), Some("/weather"));
        assert_eq!(rows[0].3.as_deref(), Some("gemini"));
        assert!(rows[0].4.is_none());
    }

    #[test]
    fn events_outside_requests_have_no_context() {
        let sink = capture(|| tracing::warn!(key = "DESKHUB_PORT", "invalid env override, ignoring"));
        let rows = sink.rows();
        assert!(rows[0].2.is_none() && rows[0].3.is_none());
        assert!(rows[0].4.as_deref().unwrap().contains("DESKHUB_PORT"));
    }
}
