//! Typed `Configs`, loaded from the YAML file named by `CONFIGS_FILE`
//! (default `configs.yaml`), mirroring `configs/configs_loader.py`
//! field-for-field.

use sentinela_core::{ErrorCategory, ErrorKind, ErrorSeverity, SentinelaError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalMonitorsNotificationConfig {
    pub enabled: bool,
    pub notification_class: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LoggingConfig {
    Friendly { format: Option<String> },
    Json { fields: Option<HashMap<String, String>> },
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig::Friendly { format: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDatabaseConfig {
    pub pool_size: u32,
}

fn default_log_level() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub dashboard_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerProcedureConfig {
    pub schedule: String,
    #[serde(default)]
    pub params: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configs {
    #[serde(default)]
    pub plugins: Vec<String>,

    #[serde(default)]
    pub load_sample_monitors: bool,
    #[serde(default)]
    pub sample_monitors_path: String,
    #[serde(default)]
    pub internal_monitors_path: String,
    pub internal_monitors_notification: InternalMonitorsNotificationConfig,

    pub monitors_load_schedule: String,

    pub application_database_settings: ApplicationDatabaseConfig,

    pub application_queue: serde_json::Map<String, serde_json::Value>,

    pub http_server: HttpServerConfig,

    pub time_zone: String,

    pub controller_process_schedule: String,
    pub controller_concurrency: usize,
    #[serde(default)]
    pub controller_procedures: HashMap<String, ControllerProcedureConfig>,

    pub executor_concurrency: usize,
    pub executor_sleep: u64,
    pub executor_monitor_timeout: u64,
    pub executor_reaction_timeout: u64,
    pub executor_request_timeout: u64,
    pub executor_monitor_heartbeat_time: u64,

    pub max_issues_creation: u64,

    pub database_default_acquire_timeout: u64,
    pub database_default_query_timeout: u64,
    pub database_close_timeout: u64,
    #[serde(default)]
    pub database_log_query_metrics: bool,

    #[serde(default)]
    pub databases_pools_configs: HashMap<String, serde_json::Map<String, serde_json::Value>>,

    #[serde(default)]
    pub log_all_events: bool,

    pub heartbeat_time: f64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Configs {
    /// Parse `Configs` from a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, SentinelaError> {
        serde_yaml::from_str(contents).map_err(|e| {
            SentinelaError::new(
                ErrorKind::ConfigError,
                ErrorCategory::Configuration,
                ErrorSeverity::High,
                format!("failed to parse configs: {e}"),
            )
        })
    }

    /// Load from the path in `CONFIGS_FILE`, defaulting to `configs.yaml`.
    pub fn load() -> Result<Self, SentinelaError> {
        let path = std::env::var("CONFIGS_FILE").unwrap_or_else(|_| "configs.yaml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SentinelaError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SentinelaError::new(
                ErrorKind::ConfigError,
                ErrorCategory::Configuration,
                ErrorSeverity::High,
                format!("failed to read configs file '{}': {e}", path.display()),
            )
        })?;
        Self::from_yaml(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
plugins: []
load_sample_monitors: false
sample_monitors_path: ""
internal_monitors_path: ""
internal_monitors_notification:
  enabled: false
  notification_class: "internal"
monitors_load_schedule: "*/5 * * * *"
application_database_settings:
  pool_size: 10
application_queue:
  type: internal
http_server:
  port: 8080
time_zone: "UTC"
controller_process_schedule: "* * * * *"
controller_concurrency: 5
controller_procedures:
  monitors_stuck:
    schedule: "*/10 * * * *"
    params:
      time_tolerance: 1800
executor_concurrency: 10
executor_sleep: 1
executor_monitor_timeout: 1800
executor_reaction_timeout: 60
executor_request_timeout: 60
executor_monitor_heartbeat_time: 30
max_issues_creation: 1000
database_default_acquire_timeout: 5
database_default_query_timeout: 30
database_close_timeout: 5
heartbeat_time: 1.0
logging:
  mode: friendly
"#;

    #[test]
    fn parses_sample_configs() {
        let configs = Configs::from_yaml(SAMPLE).unwrap();
        assert_eq!(configs.http_server.port, 8080);
        assert_eq!(configs.controller_concurrency, 5);
        assert!(configs.controller_procedures.contains_key("monitors_stuck"));
        assert!(matches!(configs.logging, LoggingConfig::Friendly { .. }));
    }

    #[test]
    fn missing_required_field_is_a_config_error() {
        let err = Configs::from_yaml("plugins: []").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConfigError);
    }
}
