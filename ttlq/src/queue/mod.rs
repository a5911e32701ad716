//! Queue module for RabbitMQ operations.
//!
//! This module provides:
//! - The topology descriptor and message types
//! - The `BrokerChannel` capability and its lapin implementation
//! - The provisioner (exchange, TTL queue, binding)
//! - The expiring publisher
//!
//! ## Flow
//!
//! ```text
//! provision: declare exchange → declare queue (x-message-ttl) → bind
//! publish:   marker = now + ttl → body + " ### " + marker → exchange/routing key
//! ```

pub mod amqp;
pub mod channel;
pub mod provisioner;
pub mod publisher;
pub mod types;

#[cfg(test)]
pub(crate) mod memory;

pub use amqp::AmqpChannel;
pub use channel::{BrokerChannel, ChannelError};
pub use provisioner::{provision, ProvisionError, ProvisionStep};
pub use publisher::{publish_batch, publish_batch_at, PublishError};
pub use types::{
    ExchangeKind, ExpirationMarker, OutboundMessage, PublishReceipt, Topology, MARKER_SEPARATOR,
};
