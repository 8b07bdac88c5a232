use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration, read from the environment (and an optional `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// `None` runs the server on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub page_limit_default: i64,
    pub page_limit_max: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            database_url: None,
            db_max_connections: 8,
            db_acquire_timeout: Duration::from_secs(5),
            page_limit_default: 10,
            page_limit_max: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {e}");
        }

        let defaults = Config::default();
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
        if database_url.is_none() {
            log::warn!("No DATABASE_URL set, using in-memory store (data lost on restart)");
        }

        let page_limit_max = try_load("PAGE_LIMIT_MAX", defaults.page_limit_max).max(1);

        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url,
            db_max_connections: try_load("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            db_acquire_timeout: Duration::from_secs(try_load(
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.db_acquire_timeout.as_secs(),
            )),
            page_limit_default: try_load("PAGE_LIMIT_DEFAULT", defaults.page_limit_default)
                .clamp(1, page_limit_max),
            page_limit_max,
        }
    }
}

/// Parse an env var, falling back to `default` when it is unset or invalid.
fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            log::warn!("Invalid {key} value '{raw}': {e}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}
