use thiserror::Error;

/// Boxed error a caller-supplied callback may fail with
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[source] switchboard_fabric::Error),

    #[error("Codec error: {0}")]
    Codec(#[source] switchboard_fabric::Error),

    #[error("Callback failed: {0}")]
    Callback(#[source] BoxError),

    #[error("Queue error: {0}")]
    Queue(#[from] switchboard_core::Error),

    #[error("Launch failed: {0}")]
    Launch(#[from] std::io::Error),
}

/// Coarse classification used to decide whether a loop keeps running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Codec,
    Callback,
    Queue,
    Launch,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Codec(_) => ErrorKind::Codec,
            Self::Callback(_) => ErrorKind::Callback,
            Self::Queue(_) => ErrorKind::Queue,
            Self::Launch(_) => ErrorKind::Launch,
        }
    }
}

impl From<switchboard_fabric::Error> for Error {
    fn from(e: switchboard_fabric::Error) -> Self {
        match e {
            switchboard_fabric::Error::Codec(_) => Self::Codec(e),
            _ => Self::Transport(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
