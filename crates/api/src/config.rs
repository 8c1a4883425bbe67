use painel_core::messages::Locale;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Import-specific settings.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Language of user-facing parse messages (default: `pt-BR`).
    pub locale: Locale,
    /// Largest accepted upload in bytes (default: 10 MiB).
    pub max_upload_bytes: usize,
    /// Idle sessions older than this are closed by the reaper (default: `3600`).
    pub session_ttl_secs: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            locale: Locale::PtBr,
            max_upload_bytes: 10 * 1024 * 1024,
            session_ttl_secs: 3600,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// PostgreSQL URL. Without it imports go to an in-memory sink.
    pub database_url: Option<String>,
    pub import: ImportConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `DATABASE_URL`            | unset (memory sink)     |
    /// | `IMPORT_LOCALE`           | `pt-BR`                 |
    /// | `IMPORT_MAX_UPLOAD_BYTES` | `10485760`              |
    /// | `IMPORT_SESSION_TTL_SECS` | `3600`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ImportConfig::default();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_var("PORT", "a valid u16", 3000)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", "a valid u64", 30)?;

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let locale = match std::env::var("IMPORT_LOCALE") {
            Ok(tag) => Locale::parse(&tag).ok_or(ConfigError::Invalid {
                name: "IMPORT_LOCALE",
                expected: "one of pt-BR, en",
                value: tag,
            })?,
            Err(_) => defaults.locale,
        };

        let import = ImportConfig {
            locale,
            max_upload_bytes: parse_var(
                "IMPORT_MAX_UPLOAD_BYTES",
                "a byte count",
                defaults.max_upload_bytes,
            )?,
            session_ttl_secs: parse_var(
                "IMPORT_SESSION_TTL_SECS",
                "a number of seconds",
                defaults.session_ttl_secs,
            )?,
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            import,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}
