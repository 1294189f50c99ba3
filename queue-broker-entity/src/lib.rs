pub mod prelude;

pub mod blocks;
pub mod broker_versions;
pub mod messages;
pub mod queues;
pub mod subscribers;
pub mod unconfirmed_deliveries;
