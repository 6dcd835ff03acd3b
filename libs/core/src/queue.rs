use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Semaphore};

use crate::error::{Error, Result, TryPutError};

/// What a producer does when a [`Queue`] is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overflow {
    /// Wait until the consumer frees a slot
    #[default]
    Block,
    /// Discard the incoming item
    DropNewest,
    /// Evict the oldest queued item to make room
    DropOldest,
}

/// Bounded FIFO queue shared between a loop and its caller
///
/// Clones share the same buffer. Any clone may produce; consumers take turns
/// on an internal lock, so a blocked [`get`](Self::get) makes concurrent
/// [`try_get`](Self::try_get) calls from other consumers return `None`.
pub struct Queue<T> {
    tx: mpsc::Sender<T>,
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> std::fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<T> Queue<T> {
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Number of items currently buffered
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.tx.capacity() == 0
    }
}

impl<T: Send> Queue<T> {
    /// Create a queue holding at most `capacity` items
    ///
    /// `capacity` must lie in `1..=Semaphore::MAX_PERMITS`.
    pub fn bounded(capacity: usize) -> Result<Self> {
        if capacity == 0 || capacity > Semaphore::MAX_PERMITS {
            return Err(Error::InvalidCapacity);
        }
        let (tx, rx) = mpsc::channel(capacity);
        Ok(Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        })
    }

    /// Enqueue, waiting for space if the queue is full
    pub async fn put(&self, item: T) -> Result<()> {
        self.tx.send(item).await.map_err(|_| Error::Closed)
    }

    /// Enqueue without waiting
    pub fn try_put(&self, item: T) -> std::result::Result<(), TryPutError<T>> {
        self.tx.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(item) => TryPutError::Full(item),
            mpsc::error::TrySendError::Closed(item) => TryPutError::Closed(item),
        })
    }

    /// Enqueue according to `overflow`
    ///
    /// Returns `false` when the item was discarded.
    pub async fn put_with(&self, item: T, overflow: Overflow) -> Result<bool> {
        match overflow {
            Overflow::Block => self.put(item).await.map(|()| true),
            Overflow::DropNewest => match self.try_put(item) {
                Ok(()) => Ok(true),
                Err(TryPutError::Full(_)) => Ok(false),
                Err(TryPutError::Closed(_)) => Err(Error::Closed),
            },
            Overflow::DropOldest => {
                let mut item = item;
                loop {
                    match self.try_put(item) {
                        Ok(()) => return Ok(true),
                        Err(TryPutError::Closed(_)) => return Err(Error::Closed),
                        Err(TryPutError::Full(rejected)) => {
                            item = rejected;
                            // Waits out a consumer that holds the receiver
                            let mut rx = self.rx.lock().await;
                            if rx.try_recv().is_ok() {
                                tracing::trace!("Evicted oldest queued item");
                            }
                        }
                    }
                }
            }
        }
    }

    /// Dequeue, waiting until an item is available
    pub async fn get(&self) -> Result<T> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(Error::Closed)
    }

    /// Dequeue without waiting
    pub fn try_get(&self) -> Option<T> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Wait for at least one item, then drain the queue and keep only the newest
    ///
    /// Returns the newest item and how many older items it superseded.
    pub async fn get_latest(&self) -> Result<(T, usize)> {
        let mut rx = self.rx.lock().await;
        let mut latest = rx.recv().await.ok_or(Error::Closed)?;
        let mut superseded = 0;
        while let Ok(next) = rx.try_recv() {
            latest = next;
            superseded += 1;
        }
        Ok((latest, superseded))
    }
}
