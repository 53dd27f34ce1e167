use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{HiveError, Result};

/// Workspace-wide configuration shared by every service binary.
///
/// Values are layered: struct defaults, then an optional TOML file, then
/// the environment. The sibling-service base URLs map to the flat
/// variables `USER_SERVICE_URL`, `TASK_SERVICE_URL`,
/// `ANALYTICS_SERVICE_URL` and `FILE_SERVICE_URL`; nested sections use a
/// double-underscore separator (e.g. `TASK__PORT=3001`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveConfig {
    #[serde(default = "default_user_service_url")]
    pub user_service_url: String,
    #[serde(default = "default_task_service_url")]
    pub task_service_url: String,
    #[serde(default = "default_analytics_service_url")]
    pub analytics_service_url: String,
    #[serde(default = "default_file_service_url")]
    pub file_service_url: String,
    /// Enables the `Secure` attribute on session cookies.
    #[serde(default)]
    pub production: bool,
    #[serde(default)]
    pub user: UserServiceConfig,
    #[serde(default)]
    pub task: TaskServiceConfig,
    #[serde(default)]
    pub analytics: AnalyticsServiceConfig,
    #[serde(default)]
    pub file: FileServiceConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_user_port")]
    pub port: u16,
    /// SQLite database path; `None` means in-memory.
    #[serde(default)]
    pub db_path: Option<String>,
    /// Minutes between expired-session cleanup sweeps.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_user_port(),
            db_path: None,
            cleanup_interval_minutes: default_cleanup_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_task_port")]
    pub port: u16,
    #[serde(default)]
    pub db_path: Option<String>,
}

impl Default for TaskServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_task_port(),
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_analytics_port")]
    pub port: u16,
    #[serde(default)]
    pub db_path: Option<String>,
}

impl Default for AnalyticsServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_analytics_port(),
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_file_port")]
    pub port: u16,
    #[serde(default)]
    pub db_path: Option<String>,
}

impl Default for FileServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_file_port(),
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_frontend_port")]
    pub port: u16,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_frontend_port(),
        }
    }
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            user_service_url: default_user_service_url(),
            task_service_url: default_task_service_url(),
            analytics_service_url: default_analytics_service_url(),
            file_service_url: default_file_service_url(),
            production: false,
            user: UserServiceConfig::default(),
            task: TaskServiceConfig::default(),
            analytics: AnalyticsServiceConfig::default(),
            file: FileServiceConfig::default(),
            frontend: FrontendConfig::default(),
        }
    }
}

impl HiveConfig {
    /// Load configuration from an optional TOML file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&HiveConfig::default())
                .map_err(|e| HiveError::Config(e.to_string()))?,
        );

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(Environment::default().separator("__"));

        builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| HiveError::Config(e.to_string()))
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_user_service_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_task_service_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_analytics_service_url() -> String {
    "http://localhost:3002".to_string()
}

fn default_file_service_url() -> String {
    "http://localhost:3003".to_string()
}

fn default_user_port() -> u16 {
    3000
}

fn default_task_port() -> u16 {
    3001
}

fn default_analytics_port() -> u16 {
    3002
}

fn default_file_port() -> u16 {
    3003
}

fn default_frontend_port() -> u16 {
    3004
}

fn default_cleanup_interval() -> u64 {
    60
}
