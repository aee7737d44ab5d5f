use crate::alarm::{Alarm, AlarmConfig, CompiledAlarm};
use crate::error::{ConfigError, EngineError, EvaluationError};
use crate::schedule::Location;
use crate::state::{cooldown_duration, AlarmState, Phase, Tick};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use wxalarm_common::types::Observation;

/// A triggered alarm, ready to be rendered and dispatched.
#[derive(Debug, Clone)]
pub struct Firing {
    pub alarm: Arc<Alarm>,
    pub observation: Observation,
    /// The baseline the condition was evaluated against.
    pub previous: Option<Observation>,
    pub fired_at: DateTime<Utc>,
    pub triggered_count: u64,
}

/// Snapshot of one alarm's run-time state.
#[derive(Debug, Clone, Serialize)]
pub struct AlarmStatus {
    pub name: String,
    pub enabled: bool,
    pub condition: String,
    pub phase: Phase,
    pub in_cooldown: bool,
    pub cooldown_remaining_secs: i64,
    pub triggered_count: u64,
    pub last_triggered: Option<DateTime<Utc>>,
    pub has_baseline: bool,
    pub schedule: String,
}

struct AlarmSlot {
    compiled: CompiledAlarm,
    state: Mutex<AlarmState>,
}

impl AlarmSlot {
    fn new(compiled: CompiledAlarm) -> Self {
        Self {
            compiled,
            state: Mutex::new(AlarmState::default()),
        }
    }

    fn name(&self) -> &str {
        &self.compiled.alarm.name
    }

    /// Run one tick under this alarm's lock.
    async fn tick(
        &self,
        obs: &Observation,
        now: DateTime<Utc>,
        location: Option<Location>,
    ) -> Result<Option<Firing>, EvaluationError> {
        let alarm = &self.compiled.alarm;
        let scheduled = alarm
            .schedule
            .as_ref()
            .map_or(true, |s| s.is_active(&now.with_timezone(&Local), location));

        let mut state = self.state.lock().await;
        let tick = state.tick(
            &self.compiled.expr,
            cooldown_duration(alarm.cooldown),
            scheduled,
            obs,
            now,
        );
        match tick {
            Tick::Fired { previous } => {
                tracing::info!(
                    alarm = %alarm.name,
                    condition = %alarm.condition,
                    triggered_count = state.triggered_count,
                    "Alarm triggered"
                );
                Ok(Some(Firing {
                    alarm: Arc::clone(alarm),
                    observation: obs.clone(),
                    previous,
                    fired_at: now,
                    triggered_count: state.triggered_count,
                }))
            }
            Tick::CoolingDown => {
                tracing::debug!(alarm = %alarm.name, "Alarm suppressed (cooldown)");
                Ok(None)
            }
            Tick::OutsideSchedule => {
                tracing::debug!(alarm = %alarm.name, "Alarm outside schedule");
                Ok(None)
            }
            Tick::NotMet => Ok(None),
            Tick::Failed(e) => Err(e),
        }
    }
}

/// Drives every configured alarm through its state machine, one observation
/// at a time.
///
/// Each alarm's state sits behind its own lock, so alarms are evaluated
/// concurrently while ticks of the same alarm are serialized, including
/// manual ones from [`AlarmEngine::evaluate_now`].
pub struct AlarmEngine {
    slots: RwLock<Vec<Arc<AlarmSlot>>>,
    location: Option<Location>,
}

impl AlarmEngine {
    pub fn new(alarms: Vec<CompiledAlarm>) -> Self {
        Self {
            slots: RwLock::new(alarms.into_iter().map(|c| Arc::new(AlarmSlot::new(c))).collect()),
            location: None,
        }
    }

    pub fn from_config(config: &AlarmConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.compile()?))
    }

    /// Station location used by sun schedules that do not carry their own.
    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub async fn alarm_names(&self) -> Vec<String> {
        self.slots.read().await.iter().map(|s| s.name().to_string()).collect()
    }

    /// Replace the alarm set.
    ///
    /// An alarm whose definition is unchanged keeps its state (baseline,
    /// cooldown, counters); changed and new alarms start fresh. Ticks already
    /// in progress finish against the definition they started with.
    pub async fn replace_alarms(&self, alarms: Vec<CompiledAlarm>) {
        let mut slots = self.slots.write().await;
        let mut previous: HashMap<String, Arc<AlarmSlot>> = slots
            .drain(..)
            .map(|s| (s.name().to_string(), s))
            .collect();

        let mut kept = 0usize;
        *slots = alarms
            .into_iter()
            .map(|compiled| match previous.remove(&compiled.alarm.name) {
                Some(old) if old.compiled.alarm == compiled.alarm => {
                    kept += 1;
                    old
                }
                _ => Arc::new(AlarmSlot::new(compiled)),
            })
            .collect();

        tracing::info!(
            alarms = slots.len(),
            kept,
            removed = previous.len(),
            "Alarm set replaced"
        );
    }

    /// Evaluate every enabled alarm against `obs`.
    ///
    /// Alarms run concurrently; an evaluation error is logged and isolated
    /// to its alarm. Firings are returned in configuration order.
    pub async fn process(&self, obs: &Observation, now: DateTime<Utc>) -> Vec<Firing> {
        let slots: Vec<Arc<AlarmSlot>> = self.slots.read().await.clone();
        let obs = Arc::new(obs.clone());
        let location = self.location;

        let mut set = JoinSet::new();
        for (index, slot) in slots.into_iter().enumerate() {
            if !slot.compiled.alarm.enabled {
                continue;
            }
            let obs = Arc::clone(&obs);
            set.spawn(async move {
                let result = slot.tick(&obs, now, location).await;
                (index, slot, result)
            });
        }

        let mut firings = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, _, Ok(Some(firing)))) => firings.push((index, firing)),
                Ok((_, _, Ok(None))) => {}
                Ok((_, slot, Err(e))) => {
                    tracing::error!(alarm = %slot.name(), error = %e, "Alarm evaluation failed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Alarm evaluation task failed");
                }
            }
        }
        firings.sort_by_key(|(index, _)| *index);
        firings.into_iter().map(|(_, firing)| firing).collect()
    }

    /// Evaluate a single alarm on demand, e.g. from a test trigger.
    ///
    /// Runs through the same state machine and lock as [`Self::process`],
    /// and evaluates the alarm even when it is disabled.
    pub async fn evaluate_now(
        &self,
        name: &str,
        obs: &Observation,
        now: DateTime<Utc>,
    ) -> Result<Option<Firing>, EngineError> {
        let slot = self
            .slots
            .read()
            .await
            .iter()
            .find(|s| s.name() == name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownAlarm(name.to_string()))?;
        Ok(slot.tick(obs, now, self.location).await?)
    }

    pub async fn status(&self, now: DateTime<Utc>) -> Vec<AlarmStatus> {
        let slots: Vec<Arc<AlarmSlot>> = self.slots.read().await.clone();
        let mut out = Vec::with_capacity(slots.len());
        for slot in slots {
            let alarm = &slot.compiled.alarm;
            let state = slot.state.lock().await;
            out.push(AlarmStatus {
                name: alarm.name.clone(),
                enabled: alarm.enabled,
                condition: alarm.condition.clone(),
                phase: state.phase(now),
                in_cooldown: state.in_cooldown(now),
                cooldown_remaining_secs: state
                    .cooldown_remaining(now)
                    .map_or(0, |d| d.num_seconds()),
                triggered_count: state.triggered_count,
                last_triggered: state.last_triggered,
                has_baseline: state.previous_observation.is_some(),
                schedule: alarm.schedule_description(),
            });
        }
        out
    }
}
