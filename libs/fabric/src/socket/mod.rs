//! Connection roles built on the framed transports
//!
//! Request/reply and publish/subscribe are separate roles; an endpoint serves
//! exactly one of them.

pub mod publish;
pub mod rep;
pub mod req;
pub mod subscribe;

pub use self::publish::{PubOptions, PubSocket};
pub use self::rep::RepSocket;
pub use self::req::ReqSocket;
pub use self::subscribe::SubSocket;
