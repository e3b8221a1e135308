use anonclaim_registry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Charged per seat when a utility is created.
    pub unit_price: u64,
    /// Sled database directory, relative to the data directory unless absolute.
    pub store: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            unit_price: 0,
            store: PathBuf::from("registry"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay_ms: 500,
        }
    }
}

impl PollConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.attempts, Duration::from_millis(self.delay_ms))
    }
}
