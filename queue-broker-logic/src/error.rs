use sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("backing store error: {0:#}")]
    Backing(#[source] anyhow::Error),
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
    #[error("queue {0:?} does not exist")]
    UnknownQueue(String),
    #[error("subscriber {0} does not exist")]
    UnknownSubscriber(i64),
    #[error("message must be a JSON object")]
    InvalidMessage,
    #[error("malformed message content: {0}")]
    MalformedContent(#[from] serde_json::Error),
    #[error("{0}")]
    Unsupported(&'static str),
}

pub type Result<T, E = BrokerError> = std::result::Result<T, E>;
