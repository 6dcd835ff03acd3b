use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("{0} timeout exceeded")]
    Timeout(&'static str),

    #[error("Protocol violation: {0}")]
    Protocol(&'static str),

    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
