use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub tokens: TokenConfig,

    pub security: SecurityConfig,

    pub face: FaceConfig,

    pub email: EmailConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/facegate.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on token cookies.
    /// Default: true for production safety. Set to false for local development without HTTPS.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 6780,
            cors_allowed_origins: vec![
                "http://localhost:6780".to_string(),
                "http://127.0.0.1:6780".to_string(),
            ],
            secure_cookies: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HS256 signing secret. Must be changed before exposing the service.
    pub secret: String,

    pub access_ttl_hours: u32,

    pub refresh_ttl_hours: u32,

    pub confirm_ttl_hours: u32,

    pub reset_ttl_hours: u32,

    /// Cookie names used when delivering tokens alongside the JSON payload.
    pub access_cookie: String,

    pub refresh_cookie: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-before-deploying".to_string(),
            access_ttl_hours: 1,
            refresh_ttl_hours: 240,
            confirm_ttl_hours: 24,
            reset_ttl_hours: 24,
            access_cookie: "access_token".to_string(),
            refresh_cookie: "refresh_token".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    /// Lower values reduce memory usage but decrease GPU resistance.
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Embedding dimensionality D produced by the model.
    pub embedding_dim: usize,

    /// Maximum acceptable L2 distance between query and stored embedding.
    /// Smaller = stricter. Process-wide; not user-tunable.
    pub match_threshold: f64,

    /// Upper bound for uploaded images.
    pub max_file_size_mb: usize,

    /// Raw little-endian f32 projection weights, `embedding_dim * 256` values.
    pub model_weights_path: String,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 128,
            match_threshold: 0.8,
            max_file_size_mb: 5,
            model_weights_path: "models/facegate.f32".to_string(),
        }
    }
}

impl FaceConfig {
    #[must_use]
    pub const fn max_file_size(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// When false, registration confirms emails immediately and reset
    /// requests fail with an email-disabled error.
    pub enabled: bool,

    /// "log" (dev stub) or "http" (relay endpoint).
    pub provider: String,

    pub relay_endpoint: String,

    pub sender: String,

    pub request_timeout_seconds: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "log".to_string(),
            relay_endpoint: String::new(),
            sender: "no-reply@facegate.local".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("facegate").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".facegate").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tokens.secret.is_empty() {
            anyhow::bail!("[tokens].secret cannot be empty");
        }

        if self.tokens.access_ttl_hours == 0 || self.tokens.refresh_ttl_hours == 0 {
            anyhow::bail!("Token TTLs must be > 0");
        }

        if self.face.embedding_dim == 0 {
            anyhow::bail!("[face].embedding_dim must be > 0");
        }

        if self.face.match_threshold <= 0.0 || !self.face.match_threshold.is_finite() {
            anyhow::bail!("[face].match_threshold must be a positive finite number");
        }

        if self.face.max_file_size_mb == 0 {
            anyhow::bail!("[face].max_file_size_mb must be > 0");
        }

        if self.email.enabled && self.email.provider == "http" && self.email.relay_endpoint.is_empty()
        {
            anyhow::bail!("[email].relay_endpoint must be set for the http provider");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tokens.access_ttl_hours, 1);
        assert_eq!(config.tokens.refresh_ttl_hours, 240);
        assert_eq!(config.face.embedding_dim, 128);
        assert_eq!(config.face.max_file_size(), 5 * 1024 * 1024);
        assert!(!config.email.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[tokens]"));
        assert!(toml_str.contains("[face]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [face]
            match_threshold = 0.5
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!((config.face.match_threshold - 0.5).abs() < f64::EPSILON);

        assert_eq!(config.tokens.access_cookie, "access_token");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.face.embedding_dim = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tokens.secret = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.face.match_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }
}
