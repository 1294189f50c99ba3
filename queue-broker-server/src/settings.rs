use blockscout_service_launcher::{
    database::DatabaseSettings,
    launcher::ConfigSettings,
    tracing::{JaegerSettings, TracingSettings},
};
use queue_broker_logic::settings::{BackingSettings, BrokerSettings};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub tracing: TracingSettings,
    #[serde(default)]
    pub jaeger: JaegerSettings,
    pub database: DatabaseSettings,
    pub backing: BackingSettings,
    #[serde(default)]
    pub broker: BrokerSettings,
}

impl ConfigSettings for Settings {
    const SERVICE_NAME: &'static str = "QUEUE_BROKER";
}
