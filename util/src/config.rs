//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, PoisonError, RwLock};
use std::time::Duration;

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub session_lifetime_minutes: u64,
    pub token_lifetime_seconds: u64,
    pub query_timeout_ms: u64,
    pub event_pool_size: usize,
    pub event_schedule_timeout_ms: u64,
    pub ws_ping_sec: u64,
    pub ws_outbound_buffer: usize,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Missing or malformed numeric values fall back to their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "support-desk".into()),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "api=info,services=info,util=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "api.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/support-desk.db".into()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: parsed_or("PORT", 3000),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
            session_lifetime_minutes: parsed_or("SESSION_LIFETIME_MINUTES", 1440),
            token_lifetime_seconds: parsed_or("TOKEN_LIFETIME_SECONDS", 60),
            query_timeout_ms: parsed_or("QUERY_TIMEOUT_MS", 5000),
            event_pool_size: parsed_or("EVENT_POOL_SIZE", 32),
            event_schedule_timeout_ms: parsed_or("EVENT_SCHEDULE_TIMEOUT_MS", 250),
            ws_ping_sec: parsed_or("WS_PING_SEC", 30),
            ws_outbound_buffer: parsed_or("WS_OUTBOUND_BUFFER", 256),
        }
    }

    /// Returns a shared reference to the global configuration.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().unwrap_or_else(PoisonError::into_inner);
            *guard = AppConfig::from_env();
        }
    }

    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock.write().unwrap_or_else(PoisonError::into_inner);
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_level(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_port(value: u16) {
        AppConfig::set_field(|cfg| cfg.port = value);
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_query_timeout_ms(value: u64) {
        AppConfig::set_field(|cfg| cfg.query_timeout_ms = value);
    }

    pub fn set_event_pool_size(value: usize) {
        AppConfig::set_field(|cfg| cfg.event_pool_size = value);
    }
}

// --- Free accessors ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn jwt_secret() -> String {
    AppConfig::global().jwt_secret.clone()
}

pub fn session_lifetime() -> Duration {
    Duration::from_secs(AppConfig::global().session_lifetime_minutes * 60)
}

pub fn token_lifetime() -> Duration {
    Duration::from_secs(AppConfig::global().token_lifetime_seconds)
}

pub fn query_timeout() -> Duration {
    Duration::from_millis(AppConfig::global().query_timeout_ms)
}

pub fn event_pool_size() -> usize {
    AppConfig::global().event_pool_size
}

pub fn event_schedule_timeout() -> Duration {
    Duration::from_millis(AppConfig::global().event_schedule_timeout_ms)
}

pub fn ws_ping_interval() -> Duration {
    Duration::from_secs(AppConfig::global().ws_ping_sec)
}

pub fn ws_outbound_buffer() -> usize {
    AppConfig::global().ws_outbound_buffer
}
