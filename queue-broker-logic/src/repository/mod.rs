pub mod blocks;
pub mod messages;
pub mod queues;
pub mod subscribers;
pub mod unconfirmed;
