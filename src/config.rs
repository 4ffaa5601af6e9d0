use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Bearer token guarding every back-office route
    #[validate(length(min = 32))]
    pub admin_token: String,

    /// Directory uploaded product images are written under
    #[serde(default = "default_storage_root")]
    pub storage_root: String,

    /// URL prefix the storage directory is served at
    #[serde(default = "default_storage_public_prefix")]
    #[validate(custom = "validate_public_prefix")]
    pub storage_public_prefix: String,

    /// Request body ceiling; kept above the image limit so oversized files
    /// reach validation instead of being cut off by the transport
    #[serde(default = "default_max_body_bytes")]
    #[validate(range(min = 4_194_304))]
    pub max_body_bytes: usize,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
}

impl AppConfig {
    /// Configuration with every optional field at its default.
    pub fn new(database_url: impl Into<String>, admin_token: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            admin_token: admin_token.into(),
            storage_root: default_storage_root(),
            storage_public_prefix: default_storage_public_prefix(),
            max_body_bytes: default_max_body_bytes(),
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
        }
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Explicitly configured CORS origins, trimmed, empties dropped.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn db_config(&self) -> crate::db::DbConfig {
        crate::db::DbConfig {
            url: self.database_url.clone(),
            max_connections: self.db_max_connections,
            min_connections: self.db_min_connections.min(self.db_max_connections),
            connect_timeout: Duration::from_secs(self.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(self.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(self.db_acquire_timeout_secs),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_storage_root() -> String {
    "storage/public".to_string()
}

fn default_storage_public_prefix() -> String {
    "/storage".to_string()
}

fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    30
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_public_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.starts_with('/') && prefix.len() > 1 && !prefix.ends_with('/') {
        Ok(())
    } else {
        let mut err = ValidationError::new("storage_public_prefix");
        err.message = Some("Must start with '/' and must not end with '/'".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("inventory_admin={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(CONFIG_DIR)
}

pub fn load_config_from(config_dir: &str) -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(config_dir).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir
        );
    }

    // admin_token has no default; it must come from a file or APP__ADMIN_TOKEN.
    let config = Config::builder()
        .set_default("database_url", "sqlite://inventory.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
        .add_source(File::with_name(&format!("{}/{}", config_dir, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("admin_token").is_err() {
        error!("Admin token is not configured. Set APP__ADMIN_TOKEN (minimum 32 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "admin_token is required but not configured. Set APP__ADMIN_TOKEN.".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    fn config_dir(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(file, "{}", content).unwrap();
        dir
    }

    #[test]
    fn defaults_pass_validation() {
        let cfg = AppConfig::new("sqlite::memory:", TOKEN);
        assert!(cfg.validate().is_ok());
        assert!(cfg.is_development());
        assert_eq!(cfg.storage_public_prefix, "/storage");
    }

    #[test]
    fn short_admin_token_is_rejected() {
        let cfg = AppConfig::new("sqlite::memory:", "short");
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("admin_token"));
    }

    #[test]
    fn bad_log_level_and_prefix_are_rejected() {
        let mut cfg = AppConfig::new("sqlite::memory:", TOKEN);
        cfg.log_level = "verbose".into();
        cfg.storage_public_prefix = "storage/".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("log_level"));
        assert!(errors.field_errors().contains_key("storage_public_prefix"));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let mut cfg = AppConfig::new("sqlite::memory:", TOKEN);
        cfg.cors_allowed_origins = Some(" https://a.example , ,https://b.example".into());
        assert_eq!(
            cfg.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn loads_from_file_layer() {
        let dir = config_dir(&format!(
            r#"
            database_url = "sqlite://from-file.db"
            admin_token = "{TOKEN}"
            port = 9090
            storage_root = "/var/lib/inventory"
            "#
        ));

        let cfg = load_config_from(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.database_url, "sqlite://from-file.db");
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.storage_root, "/var/lib/inventory");
        assert_eq!(cfg.max_body_bytes, default_max_body_bytes());
    }

    #[test]
    fn file_validation_failure_is_reported() {
        let dir = config_dir(
            r#"
            admin_token = "too-short"
            log_level = "loud"
            "#,
        );

        let result = load_config_from(dir.path().to_str().unwrap());
        match result {
            Err(AppConfigError::Validation(errors)) => {
                assert!(errors.field_errors().contains_key("admin_token"));
                assert!(errors.field_errors().contains_key("log_level"));
            }
            other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
        }
    }
}
