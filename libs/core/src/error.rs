use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Queue capacity must be positive and within the runtime permit limit")]
    InvalidCapacity,

    #[error("Queue closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returned by [`Queue::try_put`](crate::Queue::try_put), handing the item back
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TryPutError<T> {
    #[error("Queue full")]
    Full(T),

    #[error("Queue closed")]
    Closed(T),
}

impl<T> TryPutError<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Closed(item) => item,
        }
    }
}
