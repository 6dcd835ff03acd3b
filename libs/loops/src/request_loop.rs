//! Coalescing request loop
//!
//! Forwards the freshest pending request from an inbound queue to a reply
//! endpoint and offers each response to an outbound queue. Requests that
//! queue up while a round-trip is in flight are superseded by the newest one,
//! and responses that find the outbound queue full are dropped. Both queues
//! therefore behave as "latest value" slots rather than logs.

use std::convert::Infallible;
use std::time::Duration;

use switchboard_core::{Message, Queue, TryPutError};
use switchboard_fabric::codec::{Codec, JsonCodec};
use switchboard_fabric::{ConnectOptions, Endpoint, ReqSocket};

use crate::error::Result;

/// Request loop tuning
#[derive(Debug, Clone, Default)]
pub struct RequestLoopConfig {
    /// How long to wait for each reply; `None` waits forever.
    ///
    /// Expiry ends the loop, since the connection still owes a reply.
    pub response_timeout: Option<Duration>,
    /// How to wait for the reply endpoint to come up
    pub connect: ConnectOptions,
}

impl RequestLoopConfig {
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    pub fn connect(mut self, options: ConnectOptions) -> Self {
        self.connect = options;
        self
    }
}

/// Run the loop with default settings; only returns on a fatal error
pub async fn run(
    endpoint: &Endpoint,
    inbound: Queue<Message>,
    outbound: Queue<Message>,
) -> Result<Infallible> {
    run_with(endpoint, inbound, outbound, RequestLoopConfig::default()).await
}

pub async fn run_with(
    endpoint: &Endpoint,
    inbound: Queue<Message>,
    outbound: Queue<Message>,
    config: RequestLoopConfig,
) -> Result<Infallible> {
    let mut socket = ReqSocket::connect_with(endpoint, &config.connect).await?;
    socket.set_response_timeout(config.response_timeout);
    tracing::info!(%endpoint, "Request loop connected");

    let codec = JsonCodec;
    loop {
        let (request, superseded) = inbound.get_latest().await?;
        if superseded > 0 {
            tracing::debug!(superseded, "Coalesced stale requests");
        }

        let reply = socket.request(&codec.encode(&request)?).await?;

        let response: Message = match codec.decode(&reply) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable response");
                continue;
            }
        };

        match outbound.try_put(response) {
            Ok(()) => {}
            Err(TryPutError::Full(_)) => tracing::trace!("Outbound queue full, dropping response"),
            Err(TryPutError::Closed(_)) => return Err(switchboard_core::Error::Closed.into()),
        }
    }
}
