use secrecy::{ExposeSecret, SecretString};

/// Wraps an API key with secrecy protection (zeroized on drop, redacted in Debug).
#[derive(Clone)]
pub struct ApiKey(pub SecretString);

impl ApiKey {
    /// Build a key from a raw configured value.
    ///
    /// Empty values and the `your_*_here` template placeholders written by
    /// the setup script count as "not configured".
    pub fn from_configured(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() || is_placeholder(raw) {
            return None;
        }
        Some(Self(SecretString::from(raw.to_string())))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

fn is_placeholder(raw: &str) -> bool {
    raw.starts_with("your_") && raw.ends_with("_here")
}

/// Environment variable names for each provider credential.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const WEATHER_API_KEY_ENV: &str = "WEATHER_API_KEY";
