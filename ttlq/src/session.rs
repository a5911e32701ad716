//! One-shot broker sessions.
//!
//! Each helper fetches credentials, opens a connection and channel, runs one
//! core operation and closes the channel and connection before returning,
//! whatever the outcome.

use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::credentials::{CredentialError, CredentialProvider};
use crate::queue::{
    provision, publish_batch, AmqpChannel, ProvisionError, ProvisionStep, PublishError,
    PublishReceipt,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Provision the configured topology.
pub async fn provision_on_broker(
    config: &Config,
    credentials: &dyn CredentialProvider,
) -> Result<(), SessionError> {
    let credentials = credentials.fetch()?;
    let topology = config.topology();

    let channel = AmqpChannel::open(config, &credentials)
        .await
        .map_err(|e| ProvisionError::at(ProvisionStep::Connect, e))?;

    let result = provision(&channel, &topology).await;
    channel.close().await;

    result?;
    info!(
        exchange = %topology.exchange_name,
        queue = %topology.queue_name,
        vhost = %config.vhost,
        "provision_session_complete"
    );
    Ok(())
}

/// Publish `bodies` to the configured exchange.
///
/// An empty batch is rejected before credentials are requested or any
/// connection is made.
pub async fn publish_on_broker<S: AsRef<str>>(
    config: &Config,
    credentials: &dyn CredentialProvider,
    bodies: &[S],
) -> Result<Vec<PublishReceipt>, SessionError> {
    if bodies.is_empty() {
        return Err(PublishError::NoMessages.into());
    }

    let credentials = credentials.fetch()?;
    let topology = config.topology();

    let channel = AmqpChannel::open(config, &credentials)
        .await
        .map_err(|source| PublishError::TransportFailure {
            receipts: Vec::new(),
            source,
        })?;

    let result = publish_batch(&channel, &topology, bodies).await;
    channel.close().await;

    let receipts = result?;
    info!(count = receipts.len(), vhost = %config.vhost, "publish_session_complete");
    Ok(receipts)
}
