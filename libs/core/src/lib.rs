//! Switchboard Core - values and queues shared by every messaging loop
//!
//! A [`Message`] is an opaque structured value (records, sequences, numbers,
//! strings, booleans). A [`Queue`] is the bounded, cloneable hand-off point
//! between a loop and the code that drives it.
//!
//! ```
//! use switchboard_core::{json, Queue};
//!
//! # async fn example() -> switchboard_core::Result<()> {
//! let queue = Queue::bounded(4)?;
//! queue.put(json!({"test": 0})).await?;
//! queue.put(json!({"test": 1})).await?;
//!
//! let (latest, superseded) = queue.get_latest().await?;
//! assert_eq!(latest, json!({"test": 1}));
//! assert_eq!(superseded, 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod queue;

pub use error::{Error, Result, TryPutError};
pub use queue::{Overflow, Queue};

/// Structured message payload carried by every loop
pub type Message = serde_json::Value;

pub use serde_json::json;
