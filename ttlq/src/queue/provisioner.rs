//! Topology provisioning.
//!
//! Declares the exchange, then the TTL-bound queue, then the binding. Each
//! declaration is idempotent on the broker, so re-running with an unchanged
//! topology is a no-op and a failed run can simply be repeated from scratch.

use std::fmt;

use thiserror::Error;
use tracing::{error, info};

use super::channel::{BrokerChannel, ChannelError};
use super::types::Topology;

/// The broker operation a provisioning failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    Connect,
    DeclareExchange,
    DeclareQueue,
    BindQueue,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProvisionStep::Connect => "connect",
            ProvisionStep::DeclareExchange => "declare exchange",
            ProvisionStep::DeclareQueue => "declare queue",
            ProvisionStep::BindQueue => "bind queue",
        })
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Existing broker topology has incompatible parameters.
    #[error("{step} conflicts with existing broker state: {reason}")]
    Conflict { step: ProvisionStep, reason: String },
    #[error("{step} failed")]
    TransportFailure {
        step: ProvisionStep,
        #[source]
        source: ChannelError,
    },
}

impl ProvisionError {
    pub fn at(step: ProvisionStep, err: ChannelError) -> Self {
        match err {
            ChannelError::PreconditionFailed(reason) => ProvisionError::Conflict { step, reason },
            source @ ChannelError::Transport(_) => ProvisionError::TransportFailure { step, source },
        }
    }

    pub fn step(&self) -> ProvisionStep {
        match self {
            ProvisionError::Conflict { step, .. } | ProvisionError::TransportFailure { step, .. } => {
                *step
            }
        }
    }
}

/// Declare the exchange, queue and binding described by `topology`.
///
/// No step is retried. The first failure aborts the sequence.
pub async fn provision<C>(channel: &C, topology: &Topology) -> Result<(), ProvisionError>
where
    C: BrokerChannel + ?Sized,
{
    channel
        .declare_exchange(
            &topology.exchange_name,
            topology.exchange_kind,
            topology.durable,
        )
        .await
        .map_err(|e| fail(ProvisionStep::DeclareExchange, e))?;

    channel
        .declare_queue(&topology.queue_name, topology.durable, topology.ttl_ms)
        .await
        .map_err(|e| fail(ProvisionStep::DeclareQueue, e))?;

    channel
        .bind_queue(
            &topology.queue_name,
            &topology.exchange_name,
            &topology.routing_key,
        )
        .await
        .map_err(|e| fail(ProvisionStep::BindQueue, e))?;

    info!(
        exchange = %topology.exchange_name,
        kind = topology.exchange_kind.as_str(),
        queue = %topology.queue_name,
        routing_key = %topology.routing_key,
        ttl_ms = topology.ttl_ms,
        durable = topology.durable,
        "topology_provisioned"
    );

    Ok(())
}

fn fail(step: ProvisionStep, err: ChannelError) -> ProvisionError {
    error!(step = %step, error = %err, "topology_provision_failed");
    ProvisionError::at(step, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::memory::{Call, MemoryBroker};
    use crate::queue::types::ExchangeKind;

    fn orders() -> Topology {
        Topology::new("orders", "orders.q", "orders.rk", 60_000)
    }

    #[tokio::test]
    async fn test_provision_declares_in_order() {
        let broker = MemoryBroker::new();

        provision(&broker, &orders()).await.unwrap();

        assert_eq!(
            broker.calls(),
            vec![
                Call::DeclareExchange {
                    name: "orders".to_string(),
                    kind: ExchangeKind::Direct,
                    durable: true,
                },
                Call::DeclareQueue {
                    name: "orders.q".to_string(),
                    durable: true,
                    ttl_ms: 60_000,
                },
                Call::BindQueue {
                    queue: "orders.q".to_string(),
                    exchange: "orders".to_string(),
                    routing_key: "orders.rk".to_string(),
                },
            ]
        );
        assert_eq!(broker.queue_ttl("orders.q"), Some(60_000));
    }

    #[tokio::test]
    async fn test_provision_twice_is_idempotent() {
        let broker = MemoryBroker::new();

        provision(&broker, &orders()).await.unwrap();
        provision(&broker, &orders()).await.unwrap();

        assert_eq!(broker.calls().len(), 6);
        assert_eq!(broker.binding_count(), 1);
    }

    #[tokio::test]
    async fn test_provision_with_different_ttl_conflicts() {
        let broker = MemoryBroker::new();
        provision(&broker, &orders()).await.unwrap();

        let changed = Topology {
            ttl_ms: 30_000,
            ..orders()
        };
        let err = provision(&broker, &changed).await.unwrap_err();

        match err {
            ProvisionError::Conflict { step, reason } => {
                assert_eq!(step, ProvisionStep::DeclareQueue);
                assert!(reason.contains("x-message-ttl"));
            }
            other => panic!("Expected Conflict, got {other:?}"),
        }
        // Binding is never attempted after the failed queue declaration.
        assert!(!matches!(broker.calls().last(), Some(Call::BindQueue { .. })));
        assert_eq!(broker.queue_ttl("orders.q"), Some(60_000));
    }

    #[tokio::test]
    async fn test_provision_with_different_durability_conflicts() {
        let broker = MemoryBroker::new();
        provision(&broker, &orders()).await.unwrap();

        let transient = Topology {
            durable: false,
            ..orders()
        };
        let err = provision(&broker, &transient).await.unwrap_err();

        assert_eq!(err.step(), ProvisionStep::DeclareExchange);
        assert!(matches!(err, ProvisionError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_provision_transport_failure() {
        let broker = MemoryBroker::disconnected();

        let err = provision(&broker, &orders()).await.unwrap_err();

        match err {
            ProvisionError::TransportFailure { step, source } => {
                assert_eq!(step, ProvisionStep::DeclareExchange);
                assert!(matches!(source, ChannelError::Transport(_)));
            }
            other => panic!("Expected TransportFailure, got {other:?}"),
        }
        assert!(broker.calls().is_empty());
    }

    #[test]
    fn test_error_display_names_step() {
        let err = ProvisionError::at(
            ProvisionStep::BindQueue,
            ChannelError::Transport("socket closed".into()),
        );
        assert_eq!(err.to_string(), "bind queue failed");
    }
}
