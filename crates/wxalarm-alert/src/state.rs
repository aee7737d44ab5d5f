//! Per-alarm trigger and cooldown state.

use crate::condition::{evaluate, Expr};
use crate::error::EvaluationError;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use wxalarm_common::types::Observation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Cooldown,
}

/// Run-time record for one alarm. Lives as long as the alarm definition is
/// unchanged and is never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmState {
    /// Baseline for change detection; `None` until the first tick.
    pub previous_observation: Option<Observation>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub triggered_count: u64,
    pub last_triggered: Option<DateTime<Utc>>,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// Suppressed by an active cooldown; the baseline was refreshed.
    CoolingDown,
    /// Outside the alarm's schedule; the baseline was refreshed.
    OutsideSchedule,
    NotMet,
    /// The condition held. Carries the baseline it was evaluated against.
    Fired { previous: Option<Observation> },
    /// The condition could not be evaluated; the baseline was refreshed.
    Failed(EvaluationError),
}

/// Cooldown length from configured seconds, saturating instead of panicking.
pub fn cooldown_duration(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

impl AlarmState {
    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        if self.in_cooldown(now) {
            Phase::Cooldown
        } else {
            Phase::Idle
        }
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Time left before the alarm can fire again, if cooling down.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.cooldown_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }

    /// Advance the state machine by one observation.
    ///
    /// A cooldown (or an inactive schedule) only suppresses firing. The
    /// baseline is refreshed on every path, so change detection compares
    /// against the latest reading as soon as the alarm is armed again. Once
    /// fired, the counter and cooldown are final regardless of what happens
    /// to delivery.
    pub fn tick(
        &mut self,
        expr: &Expr,
        cooldown: Duration,
        scheduled: bool,
        obs: &Observation,
        now: DateTime<Utc>,
    ) -> Tick {
        if self.in_cooldown(now) {
            self.previous_observation = Some(obs.clone());
            return Tick::CoolingDown;
        }
        if !scheduled {
            self.previous_observation = Some(obs.clone());
            return Tick::OutsideSchedule;
        }

        match evaluate(expr, obs, self) {
            Ok(true) => {
                let previous = self.previous_observation.replace(obs.clone());
                self.triggered_count += 1;
                self.last_triggered = Some(now);
                self.cooldown_until = if cooldown <= Duration::zero() {
                    None
                } else {
                    Some(now.checked_add_signed(cooldown).unwrap_or(DateTime::<Utc>::MAX_UTC))
                };
                Tick::Fired { previous }
            }
            Ok(false) => {
                self.previous_observation = Some(obs.clone());
                Tick::NotMet
            }
            Err(e) => {
                self.previous_observation = Some(obs.clone());
                Tick::Failed(e)
            }
        }
    }
}
