//! flowlens.toml configuration parser.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowlensConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
    pub exporter: ExporterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// Mount point of the datasource endpoints.
    pub prefix: String,
    /// Queried when a `query` request has no targets.
    pub default_target: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:9112".to_string(),
            prefix: "/metrics/json".to_string(),
            default_target: "dags".to_string(),
        }
    }
}

impl ServerConfig {
    /// Prefix with a leading slash and no trailing slash. The root prefix
    /// becomes the empty string.
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot to serve. Without one the store is empty.
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub xcom_params: Vec<XcomParam>,
}

/// An XCom value exported as `airflow_xcom_parameter`. `task_id = "all"`
/// matches every task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XcomParam {
    pub task_id: String,
    pub key: String,
}

impl FlowlensConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FlowlensConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
