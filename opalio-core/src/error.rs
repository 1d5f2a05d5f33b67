use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpalError>;

#[derive(Error, Debug)]
pub enum OpalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Container size unknown: capacity was never configured")]
    SizeUnknown,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
