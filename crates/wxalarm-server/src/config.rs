use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use wxalarm_alert::schedule::Location;
use wxalarm_notify::DispatchConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Shown as `{{station}}` in notifications.
    #[serde(default = "default_station_name")]
    pub station_name: String,
    /// JSON alarm document (`{"alarms": [...]}`).
    #[serde(default = "default_alarms_path")]
    pub alarms_path: String,
    /// Default log directive when `RUST_LOG` does not override it.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    /// Station coordinates for sun-based schedules.
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            send_timeout_secs: default_send_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            station_name: default_station_name(),
            alarms_path: default_alarms_path(),
            log_level: default_log_level(),
            dispatch: DispatchSettings::default(),
            location: None,
        }
    }
}

fn default_station_name() -> String {
    "Weather Station".to_string()
}

fn default_alarms_path() -> String {
    "config/alarms.json".to_string()
}

fn default_log_level() -> String {
    "wxalarm=info".to_string()
}

fn default_send_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

/// Upper bound on `dispatch.max_retries`; sends stay short-lived.
pub const MAX_RETRIES_LIMIT: u32 = 5;

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&content)?;
        if config.station_name.trim().is_empty() {
            anyhow::bail!("station_name must not be empty");
        }
        if config.dispatch.send_timeout_secs == 0 {
            anyhow::bail!("dispatch.send_timeout_secs must be greater than 0");
        }
        if config.dispatch.max_retries > MAX_RETRIES_LIMIT {
            anyhow::bail!(
                "dispatch.max_retries must be at most {MAX_RETRIES_LIMIT} (got {})",
                config.dispatch.max_retries
            );
        }
        Ok(config)
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            send_timeout: Duration::from_secs(self.dispatch.send_timeout_secs),
            max_retries: self.dispatch.max_retries,
        }
    }
}
