use std::time::Duration;

use crate::endpoint::{ConnectOptions, Endpoint};
use crate::error::Result;
use crate::transport::framed::with_timeout;
use crate::transport::Transport;

/// Requesting side of the request/reply pattern
///
/// [`request`](Self::request) is the only way to talk, so every send is
/// followed by exactly one receive.
pub struct ReqSocket {
    transport: Box<dyn Transport>,
    endpoint: Endpoint,
    response_timeout: Option<Duration>,
}

impl ReqSocket {
    /// Connect, waiting for the replier to bind
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        Self::connect_with(endpoint, &ConnectOptions::default()).await
    }

    pub async fn connect_with(endpoint: &Endpoint, options: &ConnectOptions) -> Result<Self> {
        let transport = endpoint.connect_with(options).await?;
        Ok(Self {
            transport,
            endpoint: endpoint.clone(),
            response_timeout: None,
        })
    }

    /// Bound how long [`request`](Self::request) waits for the reply
    ///
    /// A timed out socket has an unanswered request in flight and should be
    /// discarded.
    pub fn set_response_timeout(&mut self, timeout: Option<Duration>) {
        self.response_timeout = timeout;
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send one request and wait for its reply
    pub async fn request(&mut self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.transport.send(bytes).await?;
        tracing::trace!(endpoint = %self.endpoint, len = bytes.len(), "Request sent");

        let reply = with_timeout(self.response_timeout, "Response", self.transport.receive()).await?;
        tracing::trace!(endpoint = %self.endpoint, len = reply.len(), "Reply received");
        Ok(reply)
    }

    pub async fn close(mut self) -> Result<()> {
        self.transport.close().await
    }
}
