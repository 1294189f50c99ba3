use std::{path::PathBuf, time};

use serde::Deserialize;
use serde_with::serde_as;

use crate::backing::S3BackingSettings;

/// Selects the backing store. A `directory` key selects filesystem mode;
/// any other shape selects the object store.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BackingSettings {
    Directory { directory: PathBuf },
    S3(S3BackingSettings),
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BrokerSettings {
    #[serde(default = "default_sweep_interval")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub sweep_interval: time::Duration,
    #[serde(default = "default_block_size_mb")]
    pub block_size_mb: i64,
    #[serde(default)]
    pub subscriber: SubscriberDefaults,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SubscriberDefaults {
    #[serde(default = "default_confirm_delay_seconds")]
    pub confirm_delay_seconds: i64,
    #[serde(default = "default_look_ahead_serial")]
    pub look_ahead_serial: i64,
}

fn default_sweep_interval() -> time::Duration {
    time::Duration::from_secs(60)
}

fn default_block_size_mb() -> i64 {
    8
}

fn default_confirm_delay_seconds() -> i64 {
    60
}

fn default_look_ahead_serial() -> i64 {
    1000
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            sweep_interval: default_sweep_interval(),
            block_size_mb: default_block_size_mb(),
            subscriber: SubscriberDefaults::default(),
        }
    }
}

impl Default for SubscriberDefaults {
    fn default() -> Self {
        Self {
            confirm_delay_seconds: default_confirm_delay_seconds(),
            look_ahead_serial: default_look_ahead_serial(),
        }
    }
}
