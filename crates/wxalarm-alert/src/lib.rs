//! Condition language and alarm state machine.
//!
//! A condition string such as `temperature > 85F && humidity < 40` is parsed
//! once into an immutable [`condition::Expr`], evaluated per observation
//! against the alarm's [`state::AlarmState`], and paraphrased for preview.
//! The [`engine::AlarmEngine`] drives every configured alarm through its
//! cooldown cycle and yields a [`engine::Firing`] for each trigger.

pub mod alarm;
pub mod condition;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod state;
pub mod units;

#[cfg(test)]
mod tests;

pub use alarm::{Alarm, AlarmConfig, CompiledAlarm};
pub use condition::{check_condition, evaluate, paraphrase, parse, ConditionCheck, Expr};
pub use engine::{AlarmEngine, AlarmStatus, Firing};
pub use error::{ConfigError, EngineError, EvaluationError, ParseError, UnitError};
pub use state::AlarmState;
