use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::endpoint::{ConnectOptions, Endpoint};
use crate::error::Result;
use crate::transport::Transport;

/// High-level channel for bidirectional communication
///
/// Combines a transport and codec for persistent connections
pub struct Channel<C> {
    transport: Box<dyn Transport>,
    codec: C,
}

impl<C: Codec> Channel<C> {
    /// Create a channel from an existing transport
    pub fn from_transport(transport: impl Transport + 'static, codec: C) -> Self {
        Self {
            transport: Box::new(transport),
            codec,
        }
    }

    /// Open a channel to `endpoint` with a single connection attempt
    pub async fn connect(endpoint: &Endpoint, codec: C) -> Result<Self> {
        Self::connect_with(endpoint, codec, &ConnectOptions::once()).await
    }

    pub async fn connect_with(endpoint: &Endpoint, codec: C, options: &ConnectOptions) -> Result<Self> {
        let transport = endpoint.connect_with(options).await?;
        Ok(Self { transport, codec })
    }

    /// Send a message over the channel
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let bytes = self.codec.encode(message)?;
        self.transport.send(&bytes).await
    }

    /// Receive a message from the channel
    pub async fn receive<T: for<'de> Deserialize<'de>>(&mut self) -> Result<T> {
        let bytes = self.transport.receive().await?;
        self.codec.decode(&bytes)
    }

    /// Close the channel
    pub async fn close(mut self) -> Result<()> {
        self.transport.close().await
    }
}
