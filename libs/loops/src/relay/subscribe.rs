use std::convert::Infallible;

use switchboard_core::{Message, Overflow, Queue};
use switchboard_fabric::codec::{Codec, JsonCodec};
use switchboard_fabric::{ConnectOptions, Endpoint, SubSocket};

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct SubscribeRelayConfig {
    /// What to do when the destination queue is full.
    ///
    /// The default blocks, pushing back onto the publisher's per-subscriber
    /// buffer.
    pub overflow: Overflow,
    pub connect: ConnectOptions,
}

impl SubscribeRelayConfig {
    pub fn overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn connect(mut self, options: ConnectOptions) -> Self {
        self.connect = options;
        self
    }
}

/// Delivers messages published under a topic prefix into a queue
pub struct SubscribeRelay {
    socket: SubSocket,
    overflow: Overflow,
}

impl SubscribeRelay {
    pub async fn connect(
        endpoint: &Endpoint,
        topic: impl Into<Vec<u8>>,
        config: SubscribeRelayConfig,
    ) -> Result<Self> {
        let socket = SubSocket::connect_with(endpoint, topic, &config.connect).await?;
        tracing::info!(
            %endpoint,
            topic = %String::from_utf8_lossy(socket.prefix()),
            "Subscribe relay connected"
        );
        Ok(Self {
            socket,
            overflow: config.overflow,
        })
    }

    /// Receive forever; undecodable payloads are skipped
    pub async fn run(mut self, queue: Queue<Message>) -> Result<Infallible> {
        let codec = JsonCodec;
        loop {
            let (topic, payload) = self.socket.recv().await?;
            let message: Message = match codec.decode(&payload) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(
                        topic = %String::from_utf8_lossy(&topic),
                        error = %e,
                        "Skipping undecodable payload"
                    );
                    continue;
                }
            };

            if !queue.put_with(message, self.overflow).await? {
                tracing::trace!("Subscriber queue full, dropping message");
            }
        }
    }
}

/// Connect to `endpoint`, subscribe to `topic` and fill `queue`, blocking when it is full
pub async fn subscribe(
    endpoint: &Endpoint,
    topic: impl Into<Vec<u8>>,
    queue: Queue<Message>,
) -> Result<Infallible> {
    SubscribeRelay::connect(endpoint, topic, SubscribeRelayConfig::default())
        .await?
        .run(queue)
        .await
}
