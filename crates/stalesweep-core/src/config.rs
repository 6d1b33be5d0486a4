use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            cleanup: CleanupConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Retention threshold in days used until an admin persists another value
    #[serde(default = "default_threshold_days")]
    pub default_threshold_days: u32,
    /// Article statuses eligible for cleanup
    #[serde(default = "default_eligible_statuses")]
    pub eligible_statuses: Vec<String>,
    /// Seconds after which a run still marked running is considered abandoned
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
    /// How many per-article failures are kept in a run's error message
    #[serde(default = "default_max_recorded_errors")]
    pub max_recorded_errors: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            default_threshold_days: default_threshold_days(),
            eligible_statuses: default_eligible_statuses(),
            run_timeout_secs: default_run_timeout(),
            max_recorded_errors: default_max_recorded_errors(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Interval between automatic cleanup runs in seconds
    #[serde(default = "default_auto_interval")]
    pub auto_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            auto_interval_secs: default_auto_interval(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stalesweep")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_threshold_days() -> u32 {
    30
}

fn default_eligible_statuses() -> Vec<String> {
    vec!["draft".to_string(), "rejected".to_string()]
}

fn default_run_timeout() -> u64 {
    3600 // 1 hour
}

fn default_max_recorded_errors() -> usize {
    10
}

fn default_auto_interval() -> u64 {
    86400 // daily
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &std::path::Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from file or return defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/stalesweep/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("stalesweep")
            .join("config.toml")
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("stalesweep.db")
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.cleanup.default_threshold_days, 30);
        assert_eq!(config.cleanup.eligible_statuses, vec!["draft", "rejected"]);
        assert_eq!(config.schedule.auto_interval_secs, 86400);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [cleanup]
            default_threshold_days = 14
            "#,
        )
        .unwrap();
        assert_eq!(config.cleanup.default_threshold_days, 14);
        assert_eq!(config.cleanup.eligible_statuses, vec!["draft", "rejected"]);
        assert_eq!(config.cleanup.run_timeout_secs, 3600);
    }
}
