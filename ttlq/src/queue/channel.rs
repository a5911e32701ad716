//! Broker channel capability.
//!
//! The provisioner and publisher only need four primitives. `AmqpChannel`
//! provides them over lapin; tests drive an in-memory broker instead.

use async_trait::async_trait;
use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use thiserror::Error;

use super::types::ExchangeKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The broker refused a declaration that conflicts with existing state (406).
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<lapin::Error> for ChannelError {
    fn from(err: lapin::Error) -> Self {
        match &err {
            lapin::Error::ProtocolError(amqp)
                if matches!(
                    amqp.kind(),
                    AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED)
                ) =>
            {
                ChannelError::PreconditionFailed(amqp.get_message().as_str().to_string())
            }
            _ => ChannelError::Transport(err.to_string()),
        }
    }
}

/// An open channel on a single virtual host.
///
/// Calls are issued one at a time; implementations need not support
/// concurrent use.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), ChannelError>;

    /// Declare a queue whose messages expire after `ttl_ms` while queued.
    async fn declare_queue(&self, name: &str, durable: bool, ttl_ms: u32)
        -> Result<(), ChannelError>;

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), ChannelError>;

    /// Send without waiting for a broker confirm.
    async fn publish(&self, exchange: &str, routing_key: &str, body: &[u8])
        -> Result<(), ChannelError>;
}
