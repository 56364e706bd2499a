// ABOUTME: Stack event streaming configuration.
// ABOUTME: Poll timing, as human-readable durations.

use serde::Deserialize;
use std::time::Duration;

use crate::stream::{DEFAULT_INITIAL_DELAY, DEFAULT_POLL_INTERVAL};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_initial_delay() -> Duration {
    DEFAULT_INITIAL_DELAY
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}
