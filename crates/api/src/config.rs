//! Application configuration loaded from environment variables.

use domain::{LifecycleConfig, ReferenceFormat, TransitionPolicy};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL connection string; in-memory stores when unset
/// - `DATABASE_MAX_CONNECTIONS` — pool size (default: `10`)
/// - `REFERENCE_PAD_WIDTH` — zero-padding of reference numbers (default: `0`)
/// - `REFERENCE_DATE_SEGMENT` — embed a `YYMM-` segment (default: `false`)
/// - `SEQUENCE_PER_ENTITY` — one `ORDER` counter per entity (default: `false`)
/// - `TRANSITION_POLICY` — `permissive` or `lock-terminal` (default: `permissive`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub lifecycle: LifecycleConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str| {
            var(key)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let transition_policy = var("TRANSITION_POLICY")
            .and_then(|p| p.parse::<TransitionPolicy>().ok())
            .unwrap_or_default();

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: var("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            lifecycle: LifecycleConfig {
                format: ReferenceFormat::new(
                    var("REFERENCE_PAD_WIDTH")
                        .and_then(|w| w.parse().ok())
                        .unwrap_or(0),
                    flag("REFERENCE_DATE_SEGMENT"),
                ),
                transition_policy,
                scope_per_entity: flag("SEQUENCE_PER_ENTITY"),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            lifecycle: LifecycleConfig::default(),
        }
    }
}
