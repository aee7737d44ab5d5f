//! Alarm definitions and the `{"alarms": [...]}` configuration document.

use crate::condition::{parse, Expr};
use crate::error::ConfigError;
use crate::schedule::Schedule;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use wxalarm_common::channel::Channel;

/// One alarm rule as stored by the config editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub enabled: bool,
    pub condition: String,
    /// Seconds between repeated notifications; 0 re-arms immediately.
    #[serde(default)]
    pub cooldown: u64,
    /// Default message for channels that carry no template of their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl Alarm {
    /// Check this alarm in isolation; `index` is its position in the config.
    pub fn validate(&self, index: usize) -> Result<(), ConfigError> {
        self.compile(index).map(|_| ())
    }

    /// Validate and parse the condition into an expression tree.
    pub fn compile(&self, index: usize) -> Result<Expr, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingName(index));
        }
        if self.condition.trim().is_empty() {
            return Err(ConfigError::MissingCondition(self.name.clone()));
        }
        let expr = parse(&self.condition).map_err(|source| ConfigError::Condition {
            alarm: self.name.clone(),
            source,
        })?;
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels(self.name.clone()));
        }
        for (index, channel) in self.channels.iter().enumerate() {
            channel.validate().map_err(|source| ConfigError::Channel {
                alarm: self.name.clone(),
                index,
                source,
            })?;
        }
        if let Some(schedule) = &self.schedule {
            schedule.validate().map_err(|reason| ConfigError::Schedule {
                alarm: self.name.clone(),
                reason,
            })?;
        }
        Ok(expr)
    }

    pub fn schedule_description(&self) -> String {
        self.schedule.clone().unwrap_or_default().to_string()
    }
}

/// A validated alarm paired with its parsed condition.
///
/// Both halves are shared immutably, so an in-flight evaluation keeps the
/// version it started with even if the config is replaced underneath it.
#[derive(Debug, Clone)]
pub struct CompiledAlarm {
    pub alarm: Arc<Alarm>,
    pub expr: Arc<Expr>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default)]
    pub alarms: Vec<Alarm>,
}

impl AlarmConfig {
    /// Load from `@path/to/alarms.json` or from an inline JSON document.
    pub fn load(input: &str) -> Result<Self, ConfigError> {
        match input.strip_prefix('@') {
            Some(path) => Self::load_file(path),
            None => Self::from_json(input),
        }
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|source| ConfigError::Json { source, hint: None })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate an inline JSON document.
    ///
    /// When the input is not JSON but looks like a file path, the error
    /// carries a hint to use the `@` prefix.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input).map_err(|source| {
            let trimmed = input.trim();
            let looks_like_path = !trimmed.starts_with('{')
                && (trimmed.ends_with(".json") || trimmed.contains('/'));
            let hint = looks_like_path.then(|| {
                format!("did you mean '@{trimmed}'? file paths must be prefixed with @")
            });
            ConfigError::Json { source, hint }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject the whole document on the first invalid alarm. An empty list is
    /// valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile().map(|_| ())
    }

    pub fn compile(&self) -> Result<Vec<CompiledAlarm>, ConfigError> {
        let mut names = HashSet::new();
        let mut compiled = Vec::with_capacity(self.alarms.len());
        for (index, alarm) in self.alarms.iter().enumerate() {
            if !alarm.name.trim().is_empty() && !names.insert(alarm.name.as_str()) {
                return Err(ConfigError::DuplicateName(alarm.name.clone()));
            }
            let expr = alarm.compile(index)?;
            compiled.push(CompiledAlarm {
                alarm: Arc::new(alarm.clone()),
                expr: Arc::new(expr),
            });
        }
        Ok(compiled)
    }
}
