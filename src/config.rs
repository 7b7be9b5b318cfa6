use anyhow::Result;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::workflows::registrar::DEFAULT_MAX_ATTEMPTS;
use crate::workflows::TransitionPolicy;

/// Main configuration structure for HistoPath Tracker
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistopathConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Database settings (optional; without it specimens live in memory)
    pub database: Option<DatabaseConfig>,
    /// Accession number allocation
    pub accession: AccessionConfig,
    /// Stage transition rules
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API listens on
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level, used when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
    /// How long a writer waits for the database lock
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessionConfig {
    /// Draws per registration before giving up on a unique number
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub transition_policy: TransitionPolicy,
    /// Reject photo-required stages without a photo reference
    pub require_photo_evidence: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl Default for AccessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://.histopath-tracker/histopath.db".to_string(),
            max_connections: 10,
            auto_migrate: true,
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for HistopathConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            accession: AccessionConfig::default(),
            workflow: WorkflowConfig::default(),
            database: Some(DatabaseConfig::default()),
        }
    }
}

impl HistopathConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (histopath-tracker.toml, .histopath-tracker-rc)
    /// 3. Environment variables (prefixed with HISTOPATH__)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`HistopathConfig::load`] with config files looked up in `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        let toml_path = dir.join("histopath-tracker.toml");
        if toml_path.exists() {
            builder = builder.add_source(File::from(toml_path));
        }

        let rc_path = dir.join(".histopath-tracker-rc");
        if rc_path.exists() {
            builder = builder.add_source(File::from(rc_path).format(::config::FileFormat::Toml));
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("HISTOPATH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<HistopathConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = HistopathConfig::load_env_file();
        HistopathConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static HistopathConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_permissive_and_persistent() {
        let config = HistopathConfig::default();
        assert_eq!(config.workflow.transition_policy, TransitionPolicy::Permissive);
        assert!(!config.workflow.require_photo_evidence);
        assert_eq!(config.accession.max_attempts, 10);
        assert!(config.database.is_some());
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("histopath-tracker.toml"),
            r#"
[server]
bind = "127.0.0.1:8080"

[workflow]
transition_policy = "adjacent"
require_photo_evidence = true
"#,
        )
        .unwrap();

        let config = HistopathConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.workflow.transition_policy, TransitionPolicy::Adjacent);
        assert!(config.workflow.require_photo_evidence);
        // untouched sections keep their defaults
        assert_eq!(config.accession.max_attempts, 10);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_save_then_load_keeps_values() {
        let dir = TempDir::new().unwrap();
        let mut config = HistopathConfig::default();
        config.accession.max_attempts = 4;
        config.observability.json_logs = false;
        config
            .save_to_file(dir.path().join("histopath-tracker.toml"))
            .unwrap();

        let loaded = HistopathConfig::load_from(dir.path()).unwrap();
        assert_eq!(loaded.accession.max_attempts, 4);
        assert!(!loaded.observability.json_logs);
    }
}
