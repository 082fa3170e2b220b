use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Prefix every route is mounted under, e.g. "/bingeboard". Empty means root.
    #[serde(default)]
    pub base_path: String,
    /// Served over HTTPS; cookies get the Secure attribute
    #[serde(default)]
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_path: String::new(),
            production: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full sqlx connection string. Takes precedence over `path`.
    pub url: Option<String>,
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/bingeboard.db")
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing session tokens. Filled with a random value at
    /// startup when left empty.
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Set when `jwt_secret` was generated at startup rather than configured
    #[serde(skip)]
    pub secret_generated: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
            cookie_name: default_cookie_name(),
            secret_generated: false,
        }
    }
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_cookie_name() -> String {
    "token".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// TMDB v3 API key
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_catalog_base_url(),
        }
    }
}

fn default_catalog_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Requests per window for general API endpoints
    #[serde(default = "default_api_requests")]
    pub api_requests_per_window: u32,
    /// Requests per window for login and signup
    #[serde(default = "default_auth_requests")]
    pub auth_requests_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// How often stale limiter entries are swept, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    /// Key clients by X-Forwarded-For / X-Real-IP. Only enable behind a
    /// reverse proxy that overwrites these headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_requests_per_window: default_api_requests(),
            auth_requests_per_window: default_auth_requests(),
            window_seconds: default_window_seconds(),
            cleanup_interval: default_cleanup_interval(),
            trust_proxy_headers: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_requests() -> u32 {
    300
}

fn default_auth_requests() -> u32 {
    20
}

fn default_window_seconds() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    300
}

impl AuthConfig {
    /// Generate a signing secret if none was configured. Returns true when one
    /// had to be generated.
    pub fn ensure_secret(&mut self) -> bool {
        if !self.jwt_secret.is_empty() {
            return false;
        }
        // Tokens will not survive a restart
        warn!("No JWT secret configured, generating an ephemeral one");
        self.jwt_secret = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        self.secret_generated = true;
        true
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| "Failed to parse configuration file")?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay deployment settings from the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(key) = lookup("TMDB_API_KEY").filter(|v| !v.is_empty()) {
            self.catalog.api_key = key;
        }
        if let Some(secret) = lookup("JWT_SECRET").filter(|v| !v.is_empty()) {
            self.auth.jwt_secret = secret;
        }
        if let Some(base_path) = lookup("BASE_PATH") {
            self.server.base_path = base_path;
        }
        let truthy = |v: String| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        if lookup("BINGEBOARD_PRODUCTION").map(truthy).unwrap_or(false)
            || lookup("BINGEBOARD_HTTPS").map(truthy).unwrap_or(false)
        {
            self.server.production = true;
        }
        self.server.base_path = normalize_base_path(&self.server.base_path);
    }
}

/// "/bingeboard/" and "bingeboard" both become "/bingeboard"; "/" becomes "".
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.auth.cookie_name, "token");
        assert!(config.database.url.is_none());
        assert!(config.auth.jwt_secret.is_empty());
        assert!(!config.rate_limit.trust_proxy_headers);
    }

    #[test]
    fn test_ensure_secret() {
        let mut auth = AuthConfig::default();
        assert!(!auth.secret_generated);
        assert!(auth.ensure_secret());
        assert!(auth.secret_generated);
        assert_eq!(auth.jwt_secret.len(), 64);
        let generated = auth.jwt_secret.clone();
        assert!(!auth.ensure_secret());
        assert_eq!(auth.jwt_secret, generated);
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
[server]
port = 8080
base_path = "/bingeboard"

[catalog]
api_key = "abc"
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.base_path, "/bingeboard");
        assert_eq!(config.catalog.api_key, "abc");
        assert_eq!(config.catalog.base_url, "https://api.themoviedb.org/3");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("TMDB_API_KEY", "key-from-env"),
            ("JWT_SECRET", "s3cret"),
            ("BASE_PATH", "bingeboard/"),
            ("BINGEBOARD_PRODUCTION", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.catalog.api_key, "key-from-env");
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.server.base_path, "/bingeboard");
        assert!(config.server.production);
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = Config::default();
        config.catalog.api_key = "from-file".to_string();
        config.apply_env(|k| (k == "TMDB_API_KEY").then(String::new));
        assert_eq!(config.catalog.api_key, "from-file");
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path("/bingeboard"), "/bingeboard");
        assert_eq!(normalize_base_path("bingeboard/"), "/bingeboard");
    }
}
