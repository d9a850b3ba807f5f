//! Registry tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between a locale becoming unrequired and its strings being dropped.
pub const DEFAULT_UNLOAD_INTERVAL: Duration = Duration::from_secs(60);

/// Runtime configuration for a [`crate::LocaleRegistry`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Debounce before an unrequired locale is evicted, in milliseconds.
    #[serde(default = "default_unload_interval_ms")]
    pub unload_interval_ms: u64,
    /// Period of the background sweep for dropped contexts. `None` disables it.
    #[serde(default)]
    pub sweep_interval_ms: Option<u64>,
}

fn default_unload_interval_ms() -> u64 {
    DEFAULT_UNLOAD_INTERVAL.as_millis() as u64
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            unload_interval_ms: default_unload_interval_ms(),
            sweep_interval_ms: None,
        }
    }
}

impl RegistryConfig {
    pub fn with_unload_interval(mut self, interval: Duration) -> Self {
        self.unload_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    pub fn unload_interval(&self) -> Duration {
        Duration::from_millis(self.unload_interval_ms)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_ms.map(Duration::from_millis)
    }
}
