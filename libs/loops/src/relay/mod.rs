//! One-way topic relays between a [`Queue`](switchboard_core::Queue) and a
//! publish/subscribe endpoint

pub mod publish;
pub mod subscribe;

pub use self::publish::{publish, PublishRelay};
pub use self::subscribe::{subscribe, SubscribeRelay, SubscribeRelayConfig};
