//! Switchboard Loops - long-running messaging loops
//!
//! Each loop owns one connection and talks to its caller through
//! [`Queue`](switchboard_core::Queue)s:
//!
//! - [`request_loop`]: sends the freshest queued request, offers replies back
//! - [`reply_server`]: answers requests through a [`Handler`]
//! - [`relay`]: publishes a queue under a topic, or fills a queue from one
//!
//! Loops block on their transport, so run each in its own task.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use switchboard_core::{json, Message, Queue};
//! use switchboard_fabric::Endpoint;
//! use switchboard_loops::{reply_server, request_loop, BoxError, Reply};
//!
//! # async fn example() -> switchboard_loops::Result<()> {
//! let echo = |_request: Message| -> Result<Reply, BoxError> {
//!     Ok(Reply::Respond(json!({"response": "OK"})))
//! };
//! tokio::spawn(async move {
//!     let endpoint = Endpoint::bind_port(5555);
//!     reply_server::serve(&endpoint, echo, Duration::from_millis(2000)).await
//! });
//!
//! let inbound = Queue::bounded(16)?;
//! let outbound = Queue::bounded(16)?;
//! tokio::spawn({
//!     let (inbound, outbound) = (inbound.clone(), outbound.clone());
//!     async move {
//!         let endpoint = Endpoint::connect_port(5555);
//!         request_loop::run(&endpoint, inbound, outbound).await
//!     }
//! });
//!
//! inbound.put(json!({"test": 0})).await?;
//! assert_eq!(outbound.get().await?, json!({"response": "OK"}));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod launch;
pub mod prediction;
pub mod relay;
pub mod reply_server;
pub mod request_loop;

pub use error::{BoxError, Error, ErrorKind, Result};
pub use launch::{launch, LaunchConfig, LaunchOutcome};
pub use prediction::{prediction_loop, PredictionHandler, Predictor, Target};
pub use relay::{PublishRelay, SubscribeRelay, SubscribeRelayConfig};
pub use reply_server::{Handler, Reply, ReplyServer, ReplyServerConfig, Stopped};
pub use request_loop::RequestLoopConfig;
