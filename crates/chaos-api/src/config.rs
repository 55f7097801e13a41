//! Configuration for the chaos-api server.
//!
//! Loaded from `config.yaml` if present, defaults otherwise, with
//! environment variables taking highest precedence.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub k8s: K8sConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct K8sConfig {
    #[serde(default)]
    pub enabled: bool,
    pub kubeconfig: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AwsConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_db_path() -> String {
    "sqlite://chaos.db".to_string()
}
fn default_llm_endpoint() -> String {
    "http://localhost:8090".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl ApiConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = if std::path::Path::new("config.yaml").exists() {
            Self::from_file("config.yaml")?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CHAOS_API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CHAOS_API_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(path) = std::env::var("CHAOS_DB_PATH") {
            self.database.path = path;
        }
        if let Ok(kubeconfig) = std::env::var("CHAOS_KUBECONFIG") {
            self.k8s.kubeconfig = Some(kubeconfig);
            self.k8s.enabled = true;
        }
        if let Ok(endpoint) = std::env::var("CHAOS_ANALYSIS_ENDPOINT") {
            self.llm.endpoint = endpoint;
        }
        if let Ok(api_key) = std::env::var("CHAOS_ANALYSIS_API_KEY") {
            self.llm.api_key = Some(api_key);
        }
        if let Ok(level) = std::env::var("CHAOS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CHAOS_LOG_FORMAT") {
            self.logging.format = format;
        }
        if std::env::var("CHAOS_AWS_ENABLED").map(|v| v == "true").unwrap_or(false) {
            self.aws.enabled = true;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be non-zero".to_string()));
        }
        if self.database.path.is_empty() {
            return Err(ConfigError::Validation("database.path must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = ApiConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }
}
