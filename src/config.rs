// Agency configuration, read from JSON at startup

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

// What confirm_quotes does when one of several quotes cannot be confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmPolicy {
    // Keep whatever succeeded and report the failures
    #[default]
    BestEffort,
    // Cancel everything confirmed so far and abort on the first failure
    AllOrNothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgencyConfig {
    pub rpc_timeout_ms: u64,
    pub confirm_policy: ConfirmPolicy,
    pub session_idle_timeout_seconds: Option<u64>,
    pub log_format: LogFormat,
    pub companies: Vec<PathBuf>,
}

impl Default for AgencyConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_ms: 5000,
            confirm_policy: ConfirmPolicy::BestEffort,
            session_idle_timeout_seconds: None,
            log_format: LogFormat::Compact,
            companies: Vec::new(),
        }
    }
}

impl AgencyConfig {
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    // Relative company data paths are resolved against the config file's directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let mut config = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            config.companies = config
                .companies
                .into_iter()
                .map(|p| if p.is_relative() { base.join(p) } else { p })
                .collect();
        }
        Ok(config)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn session_idle_timeout(&self) -> Option<Duration> {
        self.session_idle_timeout_seconds.map(Duration::from_secs)
    }
}
