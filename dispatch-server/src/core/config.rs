//! Server configuration
//!
//! All values can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/dispatch | working directory (database, logs) |
//! | HTTP_PORT | 3000 | HTTP API port |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | LOG_LEVEL | info | tracing level filter |
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Log level passed to the tracing subscriber
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/dispatch".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
        }
    }

    /// Override the working directory and port, commonly for tests
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Path of the redb database file
    pub fn db_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("dispatch.redb")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
