//! Station-side runner: configuration, logging and the observation feed
//! that drives the alarm engine and notification dispatch.

pub mod config;
pub mod feed;
pub mod logging;
