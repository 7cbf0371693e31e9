pub mod actuator;
pub mod config;
pub mod control_input;
pub mod controller;
pub mod frame_source;
pub mod locator;
pub mod overlay_file;
pub mod pipeline;
pub mod scheduler;
pub mod seed;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::{SystemTime, UNIX_EPOCH};

pub const APP_NAME: &str = "fogchart";

/// Format a seed as an exact decimal string with no prefix or suffix.
pub fn format_seed(seed: u64) -> String {
    seed.to_string()
}

/// Wall-clock milliseconds used to stamp world memory entries.
pub fn now_unix_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as u64)
}
