use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid application server key: {0}")]
    InvalidKey(String),

    #[error("Invalid notification payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Unknown control message: {0}")]
    UnknownMessage(String),

    #[error("Subscription store error: {0}")]
    Store(String),

    #[error("Push delivery failed: {0}")]
    Push(String),
}

#[cfg(not(target_arch = "wasm32"))]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Store(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
