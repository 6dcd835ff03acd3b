use std::convert::Infallible;

use switchboard_core::{Message, Queue};
use switchboard_fabric::codec::{Codec, JsonCodec};
use switchboard_fabric::{Endpoint, PubOptions, PubSocket};

use crate::error::Result;

/// Publishes every message taken from a queue under a fixed topic
///
/// Nothing is coalesced or dropped on this side; slow subscribers lose
/// frames at the publisher's high water mark instead.
pub struct PublishRelay {
    socket: PubSocket,
    topic: Vec<u8>,
}

impl PublishRelay {
    pub async fn bind(endpoint: &Endpoint, topic: impl Into<Vec<u8>>) -> Result<Self> {
        Self::bind_with(endpoint, topic, PubOptions::default()).await
    }

    pub async fn bind_with(
        endpoint: &Endpoint,
        topic: impl Into<Vec<u8>>,
        options: PubOptions,
    ) -> Result<Self> {
        let socket = PubSocket::bind_with(endpoint, options).await?;
        let topic = topic.into();
        tracing::info!(
            endpoint = %socket.local_endpoint(),
            topic = %String::from_utf8_lossy(&topic),
            "Publish relay bound"
        );
        Ok(Self { socket, topic })
    }

    pub fn local_endpoint(&self) -> &Endpoint {
        self.socket.local_endpoint()
    }

    pub fn subscriber_count(&self) -> usize {
        self.socket.subscriber_count()
    }

    /// Publish queued messages forever
    pub async fn run(self, queue: Queue<Message>) -> Result<Infallible> {
        let codec = JsonCodec;
        loop {
            let message = queue.get().await?;
            let delivered = self.socket.publish(&self.topic, &codec.encode(&message)?);
            tracing::trace!(delivered, "Published message");
        }
    }
}

/// Bind `endpoint` and publish everything from `queue` under `topic`
pub async fn publish(
    endpoint: &Endpoint,
    topic: impl Into<Vec<u8>>,
    queue: Queue<Message>,
) -> Result<Infallible> {
    PublishRelay::bind(endpoint, topic).await?.run(queue).await
}
