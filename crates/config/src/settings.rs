//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::server;
use crate::{
    ConfigError, ConfigWarning, GroundingConfig, GuardrailsConfig, ModelConfig, RetrievalConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub grounding: GroundingConfig,

    #[serde(default)]
    pub guardrails: GuardrailsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject settings that cannot be repaired
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }
        if self.model.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "model.endpoint".to_string(),
                message: "Generation endpoint cannot be empty".to_string(),
            });
        }
        if self.server.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_sessions".to_string(),
                message: "At least one session must be allowed".to_string(),
            });
        }
        if self.paths.index_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "paths.index_dir".to_string(),
                message: "Index directory cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Repair recoverable values in place, returning what was changed
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = self.retrieval.sanitize();
        warnings.extend(self.model.sanitize());
        warnings.extend(self.grounding.sanitize());
        warnings
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed origins; empty means http://localhost:3000 only
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Live chat sessions; creation past this is refused
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    #[serde(default = "default_session_cleanup_interval_secs")]
    pub session_cleanup_interval_secs: u64,
}

fn default_host() -> String {
    server::HOST.to_string()
}

fn default_port() -> u16 {
    server::PORT
}

fn default_max_sessions() -> usize {
    server::MAX_SESSIONS
}

fn default_session_timeout_secs() -> u64 {
    server::SESSION_TIMEOUT_SECS
}

fn default_session_cleanup_interval_secs() -> u64 {
    server::SESSION_CLEANUP_INTERVAL_SECS
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            max_sessions: default_max_sessions(),
            session_timeout_secs: default_session_timeout_secs(),
            session_cleanup_interval_secs: default_session_cleanup_interval_secs(),
        }
    }
}

/// Location of the pre-built corpus index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_index_dir")]
    pub index_dir: String,
}

fn default_index_dir() -> String {
    "data/index".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub json_logs: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/default`, `config/{env}` and `GROUNDED_QA__*`
/// environment variables, in increasing precedence
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("GROUNDED_QA")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let mut settings: Settings = config.try_deserialize()?;

    for warning in settings.sanitize() {
        tracing::warn!(field = %warning.field, "{}", warning.message);
    }
    settings.validate()?;

    Ok(settings)
}

/// Load settings from a single file (YAML, TOML or JSON by extension)
pub fn load_settings_from_file(path: &str) -> Result<Settings, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Err(ConfigError::FileNotFound(path.to_string()));
    }

    let config = Config::builder()
        .add_source(File::with_name(path))
        .build()?;
    let mut settings: Settings = config.try_deserialize()?;

    for warning in settings.sanitize() {
        tracing::warn!(field = %warning.field, "{}", warning.message);
    }
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.retrieval.hybrid_alpha, 0.65);
        assert_eq!(settings.server.max_sessions, 1000);
        assert_eq!(settings.server.session_timeout_secs, 3600);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.server.max_sessions = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_yaml_file_repairs_alpha() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "retrieval:\n  top_k: 5\n  hybrid_alpha: 3.0\nmodel:\n  ctx_tokens: 4096\n"
        )
        .unwrap();

        let settings = load_settings_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.retrieval.hybrid_alpha, 0.65);
        assert_eq!(settings.model.ctx_tokens, 4096);
        assert_eq!(settings.model.min_output_tokens, 64);
    }

    #[test]
    fn test_missing_file() {
        let err = load_settings_from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
