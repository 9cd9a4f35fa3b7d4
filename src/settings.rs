use once_cell::sync::Lazy;
use std::{env, time::Duration};

/// Holds all tunables, read-once from ENV with fallbacks.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub poll_interval: Duration,
    pub reconnect_attempts: u32,
    pub request_timeout: Duration,
    pub approval_timeout: Duration,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub update_buffer_capacity: usize,
    pub event_buffer_capacity: usize,
}

impl Settings {
    pub fn from_env() -> Self {
        // optionally load .env
        let _ = dotenvy::dotenv();

        fn parse<T: std::str::FromStr>(var: &str, default: T) -> T {
            env::var(var)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn parse_secs(var: &str, default_secs: u64) -> Duration {
            Duration::from_secs(parse(var, default_secs))
        }

        fn parse_millis(var: &str, default_ms: u64) -> Duration {
            Duration::from_millis(parse(var, default_ms))
        }

        Settings {
            host: env::var("YTMD_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: parse("YTMD_PORT", 9863),
            poll_interval: parse_secs("POLL_INTERVAL_SECS", 10),
            reconnect_attempts: parse("RECONNECT_ATTEMPTS", 3),
            request_timeout: parse_secs("REQUEST_TIMEOUT_SECS", 10),
            approval_timeout: parse_secs("APPROVAL_TIMEOUT_SECS", 30),
            min_backoff: parse_millis("MIN_BACKOFF_MS", 500),
            max_backoff: parse_secs("MAX_BACKOFF_SECS", 5),
            update_buffer_capacity: parse("UPDATE_BUFFER_CAPACITY", 32),
            event_buffer_capacity: parse("EVENT_BUFFER_CAPACITY", 100),
        }
    }

    /// `http://{host}:{port}`
    pub fn origin(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Base of the versioned REST API.
    pub fn api_base(&self) -> String {
        format!("{}/api/v1", self.origin())
    }
}

/// Global settings instance
pub static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);
