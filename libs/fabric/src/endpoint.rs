use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{
    Listener, TcpTransport, TcpTransportListener, Transport, UnixTransport, UnixTransportListener,
};

/// Transport address in `tcp://host:port` or `ipc://path` form
///
/// A TCP host of `*` binds every interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Ipc(PathBuf),
}

impl Endpoint {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    pub fn ipc(path: impl AsRef<Path>) -> Self {
        Self::Ipc(path.as_ref().to_path_buf())
    }

    /// `tcp://*:port`, for the binding side of a port-only address
    pub fn bind_port(port: u16) -> Self {
        Self::tcp("*", port)
    }

    /// `tcp://localhost:port`, for the connecting side of a port-only address
    pub fn connect_port(port: u16) -> Self {
        Self::tcp("localhost", port)
    }

    /// Resolve a TCP endpoint to a socket address
    pub async fn resolve(&self) -> Result<SocketAddr> {
        match self {
            Self::Tcp { host, port } if host == "*" => {
                Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, *port)))
            }
            Self::Tcp { host, port } => tokio::net::lookup_host((host.as_str(), *port))
                .await?
                .next()
                .ok_or_else(|| Error::InvalidEndpoint(format!("{} did not resolve", self))),
            Self::Ipc(_) => Err(Error::InvalidEndpoint(format!(
                "{} is not a TCP endpoint",
                self
            ))),
        }
    }

    /// Open a single connection, failing immediately if nobody is listening
    pub async fn connect(&self) -> Result<Box<dyn Transport>> {
        self.connect_within(None).await
    }

    /// One connection attempt, each address bounded by `timeout`
    async fn connect_within(&self, timeout: Option<Duration>) -> Result<Box<dyn Transport>> {
        match self {
            Self::Tcp { host, .. } if host == "*" => Err(Error::InvalidEndpoint(format!(
                "{} names every interface and cannot be connected to",
                self
            ))),
            Self::Tcp { host, port } => {
                // `localhost` may resolve to both ::1 and 127.0.0.1; take whichever answers
                let mut last_err = None;
                for addr in tokio::net::lookup_host((host.as_str(), *port)).await? {
                    let builder = TcpTransport::builder().address(addr).connect_timeout(timeout);
                    match builder.connect().await {
                        Ok(transport) => return Ok(Box::new(transport)),
                        Err(e) => last_err = Some(e),
                    }
                }
                Err(last_err
                    .unwrap_or_else(|| Error::InvalidEndpoint(format!("{} did not resolve", self))))
            }
            Self::Ipc(path) => {
                let builder = UnixTransport::builder().path(path).connect_timeout(timeout);
                Ok(Box::new(builder.connect().await?))
            }
        }
    }

    /// Connect, retrying until the peer binds or the attempts run out
    pub async fn connect_with(&self, options: &ConnectOptions) -> Result<Box<dyn Transport>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.connect_within(options.connect_timeout).await {
                Ok(transport) => {
                    tracing::debug!(endpoint = %self, attempt, "Connected");
                    return Ok(transport);
                }
                Err(e @ Error::InvalidEndpoint(_)) => return Err(e),
                Err(e) if options.max_attempts.is_some_and(|max| attempt >= max) => {
                    return Err(e);
                }
                Err(e) => {
                    tracing::trace!(endpoint = %self, attempt, error = %e, "Peer not ready, retrying");
                    tokio::time::sleep(options.retry_interval).await;
                }
            }
        }
    }

    /// Bind a listener at this endpoint
    pub async fn bind(&self) -> Result<Listener> {
        let listener = match self {
            Self::Tcp { .. } => Listener::Tcp(TcpTransportListener::bind(self.resolve().await?).await?),
            Self::Ipc(path) => Listener::Unix(UnixTransportListener::bind(path).await?),
        };
        tracing::debug!(endpoint = %self, "Bound listener");
        Ok(listener)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } if host.contains(':') => write!(f, "tcp://[{}]:{}", host, port),
            Self::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            Self::Ipc(path) => write!(f, "ipc://{}", path.display()),
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidEndpoint(format!("{}: {}", s, reason));

        if let Some(path) = s.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(invalid("missing socket path"));
            }
            return Ok(Self::ipc(path));
        }

        let rest = s
            .strip_prefix("tcp://")
            .ok_or_else(|| invalid("expected tcp:// or ipc:// scheme"))?;
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = port.parse().map_err(|_| invalid("port is not a number"))?;

        Ok(Self::tcp(host, port))
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::tcp(addr.ip().to_string(), addr.port())
    }
}

/// How connecting roles wait for their peer to bind
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Pause between attempts
    pub retry_interval: Duration,
    /// Give up after this many attempts; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Bound on each individual attempt
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(100),
            max_attempts: None,
            connect_timeout: None,
        }
    }
}

impl ConnectOptions {
    /// A single attempt, no retries
    pub fn once() -> Self {
        Self {
            max_attempts: Some(1),
            ..Self::default()
        }
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}
