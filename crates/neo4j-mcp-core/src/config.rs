//! Configuration management for the Neo4j MCP binaries.
//!
//! Configuration is loaded from (in priority order):
//! 1. Command-line overrides
//! 2. Conventional variables (`NEO4J_URI`/`NEO4J_URL`, `NEO4J_USERNAME`,
//!    `NEO4J_PASSWORD`, `NEO4J_DATABASE`)
//! 3. Prefixed variables (`NEO4J_MCP__NEO4J__URI`, `NEO4J_MCP__LOGGING__LEVEL`, ...)
//! 4. Config file (`neo4j-mcp.toml` by default)
//! 5. Defaults

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Base name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "neo4j-mcp";

/// Prefix for structured environment overrides.
pub const ENV_PREFIX: &str = "NEO4J_MCP";

/// Top-level configuration shared by the server and the updater.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Connection parameters for the graph database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jSettings {
    /// Bolt address (default: "bolt://localhost:7687").
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Logical database; the server default when absent.
    #[serde(default)]
    pub database: Option<String>,

    /// Connection pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Rows pulled per round trip.
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,

    /// Upper bound on a single statement round trip, in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

impl Neo4jSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Name announced to MCP clients during `initialize`.
    #[serde(default = "default_server_name")]
    pub name: String,

    #[serde(default = "default_server_version")]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file; stderr when absent.
    #[serde(default)]
    pub file: Option<String>,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

/// Values supplied on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit config file; unlike the default file it must exist.
    pub config_file: Option<PathBuf>,
    pub uri: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub log_json: Option<bool>,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_username() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_query_timeout() -> u64 {
    30
}

fn default_server_name() -> String {
    "neo4j-mcp-server".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            username: default_username(),
            password: String::new(),
            database: None,
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration using the process environment.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        Self::load_with_env(overrides, std::env::vars().collect())
    }

    /// Load configuration against an explicit environment map.
    pub fn load_with_env(overrides: &ConfigOverrides, env: HashMap<String, String>) -> Result<Self> {
        let file = match &overrides.config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::MissingFile(path.display().to_string()));
                }
                config::File::from(path.as_path()).required(true)
            }
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let conventional = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();
        let env_uri = conventional("NEO4J_URI").or_else(|| conventional("NEO4J_URL"));
        let env_username = conventional("NEO4J_USERNAME");
        let env_password = conventional("NEO4J_PASSWORD");
        let env_database = conventional("NEO4J_DATABASE");

        let cfg = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env)),
            )
            .set_override_option("neo4j.uri", env_uri)?
            .set_override_option("neo4j.username", env_username)?
            .set_override_option("neo4j.password", env_password)?
            .set_override_option("neo4j.database", env_database)?
            .set_override_option("neo4j.uri", overrides.uri.clone())?
            .set_override_option("neo4j.username", overrides.username.clone())?
            .set_override_option("neo4j.password", overrides.password.clone())?
            .set_override_option("neo4j.database", overrides.database.clone())?
            .set_override_option("logging.level", overrides.log_level.clone())?
            .set_override_option("logging.file", overrides.log_file.clone())?
            .set_override_option("logging.json", overrides.log_json)?
            .build()?;

        let mut loaded: AppConfig = cfg.try_deserialize()?;
        if loaded.neo4j.database.as_deref() == Some("") {
            loaded.neo4j.database = None;
        }

        tracing::debug!(
            uri = %loaded.neo4j.uri,
            database = loaded.neo4j.database.as_deref().unwrap_or("<default>"),
            "Configuration loaded"
        );
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("neo4j-mcp.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::load_with_env(&ConfigOverrides::default(), HashMap::new()).unwrap();
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.neo4j.username, "neo4j");
        assert!(config.neo4j.database.is_none());
        assert_eq!(config.neo4j.max_connections, 16);
        assert_eq!(config.neo4j.query_timeout(), Duration::from_secs(30));
        assert_eq!(config.server.name, "neo4j-mcp-server");
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[neo4j]\nuri = \"bolt://graph:7687\"\ndatabase = \"projects\"\n\n[logging]\nlevel = \"debug\"\n",
        );
        let overrides = ConfigOverrides {
            config_file: Some(path),
            ..Default::default()
        };

        let config = AppConfig::load_with_env(&overrides, HashMap::new()).unwrap();
        assert_eq!(config.neo4j.uri, "bolt://graph:7687");
        assert_eq!(config.neo4j.database.as_deref(), Some("projects"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_environment_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[neo4j]\nuri = \"bolt://from-file:7687\"\nusername = \"file-user\"\npassword = \"file-pass\"\n",
        );
        let overrides = ConfigOverrides {
            config_file: Some(path),
            ..Default::default()
        };
        let vars = env(&[
            ("NEO4J_URI", "bolt://from-env:7687"),
            ("NEO4J_MCP__NEO4J__USERNAME", "env-user"),
        ]);

        let config = AppConfig::load_with_env(&overrides, vars).unwrap();
        assert_eq!(config.neo4j.uri, "bolt://from-env:7687");
        assert_eq!(config.neo4j.username, "env-user");
        assert_eq!(config.neo4j.password, "file-pass");
    }

    #[test]
    fn test_neo4j_url_is_accepted_as_uri() {
        let vars = env(&[("NEO4J_URL", "neo4j://cluster:7687")]);
        let config = AppConfig::load_with_env(&ConfigOverrides::default(), vars).unwrap();
        assert_eq!(config.neo4j.uri, "neo4j://cluster:7687");
    }

    #[test]
    fn test_command_line_wins_over_environment() {
        let overrides = ConfigOverrides {
            uri: Some("bolt://cli:7687".to_string()),
            database: Some("cli-db".to_string()),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };
        let vars = env(&[
            ("NEO4J_URI", "bolt://env:7687"),
            ("NEO4J_DATABASE", "env-db"),
        ]);

        let config = AppConfig::load_with_env(&overrides, vars).unwrap();
        assert_eq!(config.neo4j.uri, "bolt://cli:7687");
        assert_eq!(config.neo4j.database.as_deref(), Some("cli-db"));
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_empty_database_means_default() {
        let vars = env(&[("NEO4J_MCP__NEO4J__DATABASE", "")]);
        let config = AppConfig::load_with_env(&ConfigOverrides::default(), vars).unwrap();
        assert!(config.neo4j.database.is_none());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let overrides = ConfigOverrides {
            config_file: Some(PathBuf::from("/nonexistent/neo4j-mcp.toml")),
            ..Default::default()
        };
        let err = AppConfig::load_with_env(&overrides, HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }
}
