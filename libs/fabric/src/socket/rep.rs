use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::transport::{Listener, Transport, TransportListener};

const INCOMING_BACKLOG: usize = 128;

struct Incoming {
    peer: u64,
    payload: Vec<u8>,
    reply: oneshot::Sender<Vec<u8>>,
}

/// Replying side of the request/reply pattern
///
/// Accepts any number of requesters. Each connection is serviced in
/// lock-step, and the socket as a whole alternates strictly between
/// [`recv`](Self::recv) and [`send`](Self::send): calling either out of turn
/// fails with [`Error::Protocol`] without touching the transport.
pub struct RepSocket {
    incoming: mpsc::Receiver<Incoming>,
    pending: Option<(u64, oneshot::Sender<Vec<u8>>)>,
    endpoint: Endpoint,
    receive_timeout: Option<Duration>,
    acceptor: JoinHandle<()>,
}

impl RepSocket {
    /// Bind and start accepting requesters
    pub async fn bind(endpoint: &Endpoint) -> Result<Self> {
        let listener = endpoint.bind().await?;
        let local = listener.local_endpoint()?;
        let (tx, incoming) = mpsc::channel(INCOMING_BACKLOG);
        let acceptor = tokio::spawn(accept_requesters(listener, tx));

        Ok(Self {
            incoming,
            pending: None,
            endpoint: local,
            receive_timeout: None,
            acceptor,
        })
    }

    /// The endpoint actually bound, with the assigned port for `:0` binds
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Bound how long [`recv`](Self::recv) waits; expiry yields [`Error::Timeout`]
    pub fn set_receive_timeout(&mut self, timeout: Option<Duration>) {
        self.receive_timeout = timeout;
    }

    /// Whether a received request still awaits its reply
    pub fn awaiting_reply(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for the next request from any requester
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        if self.pending.is_some() {
            return Err(Error::Protocol("receive before replying to the previous request"));
        }

        let next = match self.receive_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.incoming.recv())
                .await
                .map_err(|_| Error::Timeout("Receive"))?,
            None => self.incoming.recv().await,
        };
        let incoming = next.ok_or(Error::ConnectionClosed)?;

        tracing::trace!(peer = incoming.peer, len = incoming.payload.len(), "Request received");
        self.pending = Some((incoming.peer, incoming.reply));
        Ok(incoming.payload)
    }

    /// Reply to the request returned by the last [`recv`](Self::recv)
    ///
    /// A requester that hung up in the meantime loses its reply silently.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let (peer, reply) = self
            .pending
            .take()
            .ok_or(Error::Protocol("reply without a pending request"))?;

        if reply.send(bytes.to_vec()).is_err() {
            tracing::debug!(peer, "Requester disconnected before reply");
        }
        Ok(())
    }

    /// Stop accepting and drop every requester connection
    ///
    /// A request awaiting its reply is abandoned; its requester sees the
    /// connection close.
    pub fn close(self) {
        tracing::debug!(endpoint = %self.endpoint, "Closing reply socket");
        self.acceptor.abort();
    }
}

impl Drop for RepSocket {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

async fn accept_requesters(listener: Listener, tx: mpsc::Sender<Incoming>) {
    let mut peers = JoinSet::new();
    let mut next_peer = 0u64;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(transport) => {
                    next_peer += 1;
                    tracing::debug!(peer = next_peer, "Requester connected");
                    peers.spawn(serve_requester(next_peer, transport, tx.clone()));
                }
                Err(e) => tracing::warn!(error = %e, "Failed to accept requester"),
            },
            Some(_) = peers.join_next() => {}
            _ = tx.closed() => break,
        }
    }
}

/// Relay one connection's requests to the socket, one at a time
async fn serve_requester(peer: u64, mut transport: Box<dyn Transport>, tx: mpsc::Sender<Incoming>) {
    loop {
        let payload = match transport.receive().await {
            Ok(payload) => payload,
            Err(Error::ConnectionClosed) => {
                tracing::debug!(peer, "Requester disconnected");
                return;
            }
            Err(e) => {
                tracing::warn!(peer, error = %e, "Dropping requester after receive failure");
                return;
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let incoming = Incoming {
            peer,
            payload,
            reply: reply_tx,
        };
        if tx.send(incoming).await.is_err() {
            return;
        }

        // The socket went away without answering
        let Ok(reply) = reply_rx.await else {
            return;
        };

        if let Err(e) = transport.send(&reply).await {
            tracing::warn!(peer, error = %e, "Failed to deliver reply");
            return;
        }
    }
}
