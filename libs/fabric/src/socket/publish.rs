use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::frame::encode_multipart;
use crate::transport::{Listener, Transport, TransportListener};

/// Publisher tuning
#[derive(Debug, Clone)]
pub struct PubOptions {
    /// Frames buffered per subscriber before new ones are dropped for it
    pub high_water_mark: usize,
}

impl Default for PubOptions {
    fn default() -> Self {
        Self {
            high_water_mark: 1000,
        }
    }
}

struct Subscriber {
    id: u64,
    prefix: Vec<u8>,
    frames: mpsc::Sender<Arc<[u8]>>,
}

type Registry = Arc<Mutex<Vec<Subscriber>>>;

/// Broadcasting side of the publish/subscribe pattern
///
/// Subscribers announce a topic prefix when they connect and only receive
/// frames whose topic starts with it. Publishing never blocks: a subscriber
/// that falls `high_water_mark` frames behind misses the overflow.
pub struct PubSocket {
    subscribers: Registry,
    endpoint: Endpoint,
    acceptor: JoinHandle<()>,
}

impl PubSocket {
    pub async fn bind(endpoint: &Endpoint) -> Result<Self> {
        Self::bind_with(endpoint, PubOptions::default()).await
    }

    pub async fn bind_with(endpoint: &Endpoint, options: PubOptions) -> Result<Self> {
        let listener = endpoint.bind().await?;
        let local = listener.local_endpoint()?;
        let subscribers = Registry::default();
        let acceptor = tokio::spawn(accept_subscribers(
            listener,
            Arc::clone(&subscribers),
            options.high_water_mark.max(1),
        ));

        Ok(Self {
            subscribers,
            endpoint: local,
            acceptor,
        })
    }

    pub fn local_endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Subscribers that have completed their handshake
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Queue `[topic, payload]` for every matching subscriber
    ///
    /// Returns how many subscribers accepted the frame.
    pub fn publish(&self, topic: &[u8], payload: &[u8]) -> usize {
        let frame: Arc<[u8]> = encode_multipart(&[topic, payload]).into();
        let mut delivered = 0;

        lock(&self.subscribers).retain(|sub| {
            if !topic.starts_with(&sub.prefix) {
                return true;
            }
            match sub.frames.try_send(Arc::clone(&frame)) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(subscriber = sub.id, "Subscriber at high water mark, dropping frame");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber = sub.id, "Subscriber gone");
                    false
                }
            }
        });

        delivered
    }
}

impl Drop for PubSocket {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

fn lock(registry: &Registry) -> MutexGuard<'_, Vec<Subscriber>> {
    // The registry holds no invariants a panicking holder could break
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn accept_subscribers(listener: Listener, registry: Registry, high_water_mark: usize) {
    let mut writers = JoinSet::new();
    let mut next_id = 0u64;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(transport) => {
                    next_id += 1;
                    writers.spawn(feed_subscriber(
                        next_id,
                        transport,
                        Arc::clone(&registry),
                        high_water_mark,
                    ));
                }
                Err(e) => tracing::warn!(error = %e, "Failed to accept subscriber"),
            },
            Some(_) = writers.join_next() => {}
        }
    }
}

/// Read the subscription prefix, then forward matching frames until the peer goes away
async fn feed_subscriber(id: u64, mut transport: Box<dyn Transport>, registry: Registry, hwm: usize) {
    let prefix = match transport.receive().await {
        Ok(prefix) => prefix,
        Err(e) => {
            tracing::debug!(subscriber = id, error = %e, "Subscriber left before subscribing");
            return;
        }
    };

    let (tx, mut frames) = mpsc::channel(hwm);
    tracing::debug!(
        subscriber = id,
        topic = %String::from_utf8_lossy(&prefix),
        "Subscriber registered"
    );
    lock(&registry).push(Subscriber {
        id,
        prefix,
        frames: tx,
    });

    while let Some(frame) = frames.recv().await {
        if let Err(e) = transport.send(&frame).await {
            tracing::debug!(subscriber = id, error = %e, "Dropping subscriber");
            break;
        }
    }

    lock(&registry).retain(|sub| sub.id != id);
}
