//! Synchronous reply server
//!
//! Binds a reply endpoint and answers each request with the result of a
//! [`Handler`]. Receives are bounded by a timeout so the loop regularly
//! returns to check its shutdown token; a timeout is not a failure.
//!
//! Per-request failures (undecodable request, handler error) are answered
//! with `{"error": "<message>"}` and serving continues, so the requester is
//! never left waiting. Transport failures end the server.

use std::fmt::Display;
use std::time::Duration;

use serde_json::json;
use switchboard_core::Message;
use switchboard_fabric::codec::{Codec, JsonCodec};
use switchboard_fabric::{Endpoint, RepSocket};
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, Error, Result};

pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(2000);

/// What a [`Handler`] wants done with a request
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Send this message back
    Respond(Message),
    /// Stop serving; the request is left unanswered and the endpoint released
    Terminate,
}

impl From<Message> for Reply {
    fn from(message: Message) -> Self {
        Self::Respond(message)
    }
}

/// Computes one reply per request, synchronously
pub trait Handler: Send {
    fn handle(&mut self, request: Message) -> std::result::Result<Reply, BoxError>;
}

impl<F> Handler for F
where
    F: FnMut(Message) -> std::result::Result<Reply, BoxError> + Send,
{
    fn handle(&mut self, request: Message) -> std::result::Result<Reply, BoxError> {
        self(request)
    }
}

/// Why a server stopped without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stopped {
    /// The handler returned [`Reply::Terminate`]
    Terminated,
    /// The shutdown token was cancelled
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ReplyServerConfig {
    /// Longest single wait for a request before re-checking for shutdown
    pub receive_timeout: Duration,
}

impl Default for ReplyServerConfig {
    fn default() -> Self {
        Self {
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }
}

impl ReplyServerConfig {
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }
}

pub struct ReplyServer {
    socket: RepSocket,
    shutdown: CancellationToken,
}

impl ReplyServer {
    pub async fn bind(endpoint: &Endpoint, config: ReplyServerConfig) -> Result<Self> {
        let mut socket = RepSocket::bind(endpoint).await?;
        socket.set_receive_timeout(Some(config.receive_timeout));
        tracing::info!(endpoint = %socket.local_endpoint(), "Reply server bound");

        Ok(Self {
            socket,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn local_endpoint(&self) -> &Endpoint {
        self.socket.local_endpoint()
    }

    /// Cancel to stop the server at its next receive timeout
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Answer requests until the handler terminates, shutdown is requested,
    /// or the transport fails
    pub async fn serve<H: Handler>(mut self, mut handler: H) -> Result<Stopped> {
        let codec = JsonCodec;

        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!("Reply server shutting down");
                return Ok(Stopped::Shutdown);
            }

            let bytes = match self.socket.recv().await {
                Ok(bytes) => bytes,
                Err(e) if e.is_timeout() => {
                    tracing::trace!("No request within receive timeout");
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Reply server failed, releasing endpoint");
                    return Err(Error::Transport(e));
                }
            };

            let reply = match codec.decode::<Message>(&bytes) {
                Ok(request) => match handler.handle(request) {
                    Ok(Reply::Respond(reply)) => reply,
                    Ok(Reply::Terminate) => {
                        tracing::info!("Handler requested termination");
                        return Ok(Stopped::Terminated);
                    }
                    Err(e) => {
                        let e = Error::Callback(e);
                        tracing::warn!(error = %e, "Answering with error");
                        error_reply(&e)
                    }
                },
                Err(e) => {
                    let e = Error::Codec(e);
                    tracing::warn!(error = %e, "Answering with error");
                    error_reply(&e)
                }
            };

            let encoded = codec.encode(&reply).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Reply not encodable, answering with error");
                error_reply(&e).to_string().into_bytes()
            });
            if let Err(e) = self.socket.send(&encoded) {
                tracing::error!(error = %e, "Reply server failed, releasing endpoint");
                return Err(Error::Transport(e));
            }
        }
    }
}

fn error_reply(error: &dyn Display) -> Message {
    json!({ "error": error.to_string() })
}

/// Bind `endpoint` and serve with `handler`, waiting at most `timeout` per receive
pub async fn serve<H: Handler>(endpoint: &Endpoint, handler: H, timeout: Duration) -> Result<Stopped> {
    let config = ReplyServerConfig::default().receive_timeout(timeout);
    ReplyServer::bind(endpoint, config).await?.serve(handler).await
}
