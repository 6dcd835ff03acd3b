use crate::endpoint::{ConnectOptions, Endpoint};
use crate::error::{Error, Result};
use crate::frame::decode_multipart;
use crate::transport::Transport;

/// Receiving side of the publish/subscribe pattern, bound to one topic prefix
pub struct SubSocket {
    transport: Box<dyn Transport>,
    prefix: Vec<u8>,
}

impl SubSocket {
    /// Connect, waiting for the publisher to bind, and subscribe to `prefix`
    pub async fn connect(endpoint: &Endpoint, prefix: impl Into<Vec<u8>>) -> Result<Self> {
        Self::connect_with(endpoint, prefix, &ConnectOptions::default()).await
    }

    pub async fn connect_with(
        endpoint: &Endpoint,
        prefix: impl Into<Vec<u8>>,
        options: &ConnectOptions,
    ) -> Result<Self> {
        let prefix = prefix.into();
        let mut transport = endpoint.connect_with(options).await?;
        transport.send(&prefix).await?;
        Ok(Self { transport, prefix })
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Wait for the next `(topic, payload)` pair
    pub async fn recv(&mut self) -> Result<(Vec<u8>, Vec<u8>)> {
        loop {
            let frame = self.transport.receive().await?;
            let [topic, payload]: [Vec<u8>; 2] = decode_multipart(&frame)?
                .try_into()
                .map_err(|parts: Vec<Vec<u8>>| {
                    Error::InvalidFrame(format!("Expected 2 parts, got {}", parts.len()))
                })?;

            // Publisher filters as well
            if topic.starts_with(&self.prefix) {
                return Ok((topic, payload));
            }
            tracing::trace!(topic = %String::from_utf8_lossy(&topic), "Ignoring unsubscribed topic");
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.transport.close().await
    }
}
