use crate::endpoint::Endpoint;
use crate::error::Result;

pub(crate) mod framed;
pub mod tcp;
pub mod unix;

pub use self::tcp::{TcpTransport, TcpTransportBuilder, TcpTransportListener};
pub use self::unix::{UnixTransport, UnixTransportBuilder, UnixTransportListener};

/// Largest frame either side will accept
pub const MAX_FRAME_LEN: usize = 100 * 1024 * 1024;

/// Transport trait for sending and receiving raw bytes
///
/// Each transport instance represents a single connection.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send bytes over the transport
    async fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Receive bytes from the transport
    async fn receive(&mut self) -> Result<Vec<u8>>;

    /// Close the transport connection
    async fn close(&mut self) -> Result<()>;
}

#[async_trait::async_trait]
impl Transport for Box<dyn Transport> {
    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes).await
    }

    async fn receive(&mut self) -> Result<Vec<u8>> {
        (**self).receive().await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

/// Listener trait for accepting transports
#[async_trait::async_trait]
pub trait TransportListener: Send + Sync {
    type Transport: Transport;

    /// Wait for the next incoming connection
    async fn accept(&self) -> Result<Self::Transport>;

    /// Stop listening
    async fn close(&mut self) -> Result<()>;
}

/// A bound listener for whichever transport an [`Endpoint`] names
pub enum Listener {
    Tcp(TcpTransportListener),
    Unix(UnixTransportListener),
}

impl Listener {
    /// The endpoint peers should connect to
    ///
    /// For TCP this reports the port the OS actually assigned.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        match self {
            Self::Tcp(listener) => {
                let addr = listener.local_addr()?;
                Ok(Endpoint::tcp(addr.ip().to_string(), addr.port()))
            }
            Self::Unix(listener) => Ok(Endpoint::ipc(listener.path())),
        }
    }
}

#[async_trait::async_trait]
impl TransportListener for Listener {
    type Transport = Box<dyn Transport>;

    async fn accept(&self) -> Result<Self::Transport> {
        match self {
            Self::Tcp(listener) => {
                let (transport, peer) = listener.accept().await?;
                tracing::trace!(%peer, "Accepted TCP connection");
                Ok(Box::new(transport))
            }
            Self::Unix(listener) => {
                let transport = listener.accept().await?;
                tracing::trace!(path = %listener.path().display(), "Accepted Unix connection");
                Ok(Box::new(transport))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Tcp(listener) => listener.close().await,
            Self::Unix(listener) => listener.close().await,
        }
    }
}
