//! Expiring message publisher.
//!
//! Every body in a batch is suffixed with the same expiration marker, computed
//! once from the clock and the queue TTL, and published to the bound routing key.

use thiserror::Error;
use tracing::{error, info};

use super::channel::{BrokerChannel, ChannelError};
use super::types::{ExpirationMarker, OutboundMessage, PublishReceipt, Topology};
use crate::util::clock::{Clock, SystemClock};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("at least one message body is required")]
    NoMessages,
    /// Publishing is not transactional: `receipts` were already sent.
    #[error("publish failed after {} message(s) were sent", .receipts.len())]
    TransportFailure {
        receipts: Vec<PublishReceipt>,
        #[source]
        source: ChannelError,
    },
}

/// Publish `bodies` with a marker computed from the local wall clock.
pub async fn publish_batch<C, S>(
    channel: &C,
    topology: &Topology,
    bodies: &[S],
) -> Result<Vec<PublishReceipt>, PublishError>
where
    C: BrokerChannel + ?Sized,
    S: AsRef<str>,
{
    publish_batch_at(channel, topology, &SystemClock, bodies).await
}

/// Publish `bodies` in order, reading `clock` exactly once for the whole batch.
pub async fn publish_batch_at<C, S>(
    channel: &C,
    topology: &Topology,
    clock: &dyn Clock,
    bodies: &[S],
) -> Result<Vec<PublishReceipt>, PublishError>
where
    C: BrokerChannel + ?Sized,
    S: AsRef<str>,
{
    if bodies.is_empty() {
        return Err(PublishError::NoMessages);
    }

    let marker = ExpirationMarker::at(clock.now(), topology.ttl_ms);
    let mut receipts = Vec::with_capacity(bodies.len());

    for body in bodies {
        let body = body.as_ref();
        let composed_text = OutboundMessage::new(body, &marker).compose();

        if let Err(source) = channel
            .publish(
                &topology.exchange_name,
                &topology.routing_key,
                composed_text.as_bytes(),
            )
            .await
        {
            error!(
                exchange = %topology.exchange_name,
                routing_key = %topology.routing_key,
                sent = receipts.len(),
                remaining = bodies.len() - receipts.len(),
                error = %source,
                "message_publish_failed"
            );
            return Err(PublishError::TransportFailure { receipts, source });
        }

        info!(
            exchange = %topology.exchange_name,
            routing_key = %topology.routing_key,
            body_length = composed_text.len(),
            "message_published"
        );

        receipts.push(PublishReceipt {
            body: body.to_string(),
            composed_text,
        });
    }

    info!(count = receipts.len(), marker = %marker, "message_batch_published");

    Ok(receipts)
}
