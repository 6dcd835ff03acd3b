//! Switchboard Fabric - transports, codecs and connection roles
//!
//! Provides length-prefixed TCP and Unix socket transports, a JSON codec,
//! `tcp://` / `ipc://` endpoint addressing, and the four connection roles
//! (request, reply, publish, subscribe) the messaging loops are built on.
//!
//! # Example
//!
//! ```no_run
//! use switchboard_fabric::{codec::JsonCodec, request::request, Endpoint, RepSocket};
//! use serde_json::{json, Value};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = RepSocket::bind(&"tcp://127.0.0.1:5555".parse()?).await?;
//!
//! tokio::spawn(async move {
//!     let _request = server.recv().await?;
//!     server.send(br#"{"response":"OK"}"#)?;
//!     Ok::<_, switchboard_fabric::Error>(())
//! });
//!
//! let endpoint: Endpoint = "tcp://127.0.0.1:5555".parse()?;
//! let reply: Value = request(&endpoint, &json!({"test": 0}), JsonCodec).await?;
//! assert_eq!(reply, json!({"response": "OK"}));
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod request;
pub mod socket;
pub mod transport;

// Re-exports for convenience
pub use channel::Channel;
pub use endpoint::{ConnectOptions, Endpoint};
pub use error::{Error, Result};
pub use socket::{PubOptions, PubSocket, RepSocket, ReqSocket, SubSocket};
