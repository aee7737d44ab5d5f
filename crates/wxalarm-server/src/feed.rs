//! Newline-delimited JSON observation feed.
//!
//! Each line is one [`Observation`]. The engine evaluates it and every
//! firing is handed to the notification manager, which sends in the
//! background so a slow channel never holds up the next line.

use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use wxalarm_alert::{paraphrase, AlarmConfig, AlarmEngine};
use wxalarm_common::types::Observation;
use wxalarm_notify::{NotificationManager, TransportRegistry};

/// Parse one feed line. Blank lines yield `None`.
///
/// A missing timestamp is filled with `now`.
pub fn parse_observation(line: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Observation>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut obs: Observation = serde_json::from_str(line)?;
    if obs.timestamp == DateTime::<Utc>::default() {
        obs.timestamp = now;
    }
    Ok(Some(obs))
}

/// Counters for one feed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedSummary {
    pub observations: usize,
    pub rejected_lines: usize,
    pub firings: usize,
    pub deliveries_failed: usize,
}

pub struct Runtime {
    engine: AlarmEngine,
    notifier: Arc<NotificationManager>,
}

impl Runtime {
    pub fn new(engine: AlarmEngine, notifier: Arc<NotificationManager>) -> Self {
        Self { engine, notifier }
    }

    /// Load and compile the alarm file named by `config`.
    pub fn from_config(config: &ServerConfig, registry: TransportRegistry) -> anyhow::Result<Self> {
        let alarms = AlarmConfig::load_file(&config.alarms_path)?;
        let engine = AlarmEngine::from_config(&alarms)?.with_location(config.location);

        tracing::info!(
            path = %config.alarms_path,
            alarms = alarms.alarms.len(),
            enabled = alarms.alarms.iter().filter(|a| a.enabled).count(),
            "Alarm config loaded"
        );
        for alarm in &alarms.alarms {
            let Ok(expr) = wxalarm_alert::parse(&alarm.condition) else {
                continue;
            };
            let fields: Vec<&str> = expr.fields().iter().map(|f| f.name()).collect();
            tracing::info!(
                alarm = %alarm.name,
                enabled = alarm.enabled,
                channels = alarm.channels.len(),
                fields = ?fields,
                change_detection = expr.uses_change_detection(),
                schedule = %alarm.schedule_description(),
                "{}",
                paraphrase(&expr)
            );
        }
        tracing::info!(transports = ?registry.kinds(), "Transports registered");

        let notifier = NotificationManager::new(
            registry,
            config.station_name.clone(),
            config.dispatch_config(),
        );
        Ok(Self::new(engine, Arc::new(notifier)))
    }

    pub fn engine(&self) -> &AlarmEngine {
        &self.engine
    }

    pub fn notifier(&self) -> &NotificationManager {
        &self.notifier
    }

    /// Evaluate one observation and queue notifications. Returns the
    /// number of alarms that fired.
    pub async fn handle(&self, obs: &Observation) -> usize {
        let firings = self.engine.process(obs, obs.timestamp).await;
        for firing in &firings {
            let report = self.notifier.notify(firing).await;
            tracing::debug!(
                alarm = %firing.alarm.name,
                queued = report.queued.len(),
                rejected = report.rejected.len(),
                "Firing dispatched"
            );
        }
        firings.len()
    }

    /// Consume `reader` line by line until EOF, then wait for outstanding
    /// sends.
    pub async fn run<R>(&self, reader: R) -> anyhow::Result<FeedSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = FeedSummary::default();
        let mut lines = reader.lines();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            match parse_observation(&line, Utc::now()) {
                Ok(Some(obs)) => {
                    summary.observations += 1;
                    summary.firings += self.handle(&obs).await;
                }
                Ok(None) => {}
                Err(e) => {
                    summary.rejected_lines += 1;
                    tracing::warn!(line = line_no, error = %e, "Skipping malformed observation");
                }
            }
        }

        let deliveries = self.notifier.flush().await;
        summary.deliveries_failed = deliveries.iter().filter(|d| d.result.is_err()).count();
        tracing::info!(
            observations = summary.observations,
            firings = summary.firings,
            rejected_lines = summary.rejected_lines,
            deliveries_failed = summary.deliveries_failed,
            "Observation feed closed"
        );
        Ok(summary)
    }
}
