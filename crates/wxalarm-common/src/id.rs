//! Notification ids.
//!
//! Every rendered notification carries a snowflake id so a send can be
//! followed across retries in the logs. The worker ids inside the snowflake
//! are derived from the station name, so two stations writing to the same
//! log sink do not hand out colliding ids.

use snowflake::SnowflakeIdBucket;
use std::sync::{Mutex, PoisonError};

static NOTIFICATION_IDS: Mutex<Option<SnowflakeIdBucket>> = Mutex::new(None);

/// Snowflake `(machine_id, node_id)` for a station, each in `0..32`.
///
/// FNV-1a over the trimmed, lowercased name; the low ten bits are split
/// between the two ids.
pub fn station_worker_ids(station: &str) -> (i32, i32) {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in station.trim().bytes().map(|b| b.to_ascii_lowercase()) {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    ((hash & 0x1f) as i32, ((hash >> 5) & 0x1f) as i32)
}

/// Reset the generator for `station`. Called once at startup; ids handed
/// out before this come from the `(0, 0)` worker.
pub fn init_for_station(station: &str) {
    let (machine_id, node_id) = station_worker_ids(station);
    let mut ids = NOTIFICATION_IDS.lock().unwrap_or_else(PoisonError::into_inner);
    *ids = Some(SnowflakeIdBucket::new(machine_id, node_id));
    tracing::debug!(station, machine_id, node_id, "Notification id generator ready");
}

/// Next notification id, as a decimal string.
pub fn next_id() -> String {
    let mut ids = NOTIFICATION_IDS.lock().unwrap_or_else(PoisonError::into_inner);
    ids.get_or_insert_with(|| SnowflakeIdBucket::new(0, 0))
        .get_id()
        .to_string()
}
