use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("message service not ready")]
    NotReady,

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("envelope serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
