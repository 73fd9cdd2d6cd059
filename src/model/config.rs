use serde::{Deserialize, Serialize};

/// Configuration from `.leadboard/config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub workspace: WorkspaceInfo,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub name: String,
}

/// Keys under which each record set is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_leads_key")]
    pub leads_key: String,
    #[serde(default = "default_tasks_key")]
    pub tasks_key: String,
    /// Flat, ungrouped task list written by older versions
    #[serde(default = "default_legacy_tasks_key")]
    pub legacy_tasks_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            leads_key: default_leads_key(),
            tasks_key: default_tasks_key(),
            legacy_tasks_key: default_legacy_tasks_key(),
        }
    }
}

fn default_leads_key() -> String {
    "leadTrackerData".to_string()
}

fn default_tasks_key() -> String {
    "taskTrackerTasksGrouped".to_string()
}

fn default_legacy_tasks_key() -> String {
    "taskTrackerTasks".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `LEADBOARD_LOG`
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl WorkspaceConfig {
    pub fn new(name: &str) -> Self {
        WorkspaceConfig {
            workspace: WorkspaceInfo {
                name: name.to_string(),
            },
            storage: StorageConfig::default(),
            log: LogConfig::default(),
        }
    }
}
