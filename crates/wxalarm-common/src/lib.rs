//! Shared types for the wxalarm workspace.
//!
//! [`types::Observation`] is the sensor snapshot every alarm is evaluated
//! against, [`fields`] is the static registry of condition field names, and
//! [`channel::Channel`] is the persisted shape of a notification channel.

pub mod channel;
pub mod fields;
pub mod id;
pub mod types;
