use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Cancel for job {0} refused: origin is not the submitter")]
    NotSubmitter(String),

    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BrokerError>;
