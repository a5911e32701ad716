//! lapin-backed broker channel.
//!
//! Owns one connection and one channel for the duration of a run. Callers
//! must `close` it on every exit path to release broker-side resources.

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::{AMQPValue, FieldTable},
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tracing::{debug, info, warn};

use super::channel::{BrokerChannel, ChannelError};
use super::types::ExchangeKind;
use crate::config::Config;
use crate::credentials::Credentials;

/// Queue argument understood by RabbitMQ as a per-queue message TTL.
pub const MESSAGE_TTL_ARG: &str = "x-message-ttl";

/// An open AMQP connection with a single channel.
pub struct AmqpChannel {
    connection: Connection,
    channel: Channel,
}

impl AmqpChannel {
    /// Connect to the configured broker and open a channel on its vhost.
    pub async fn open(config: &Config, credentials: &Credentials) -> Result<Self, ChannelError> {
        info!(
            host = %config.host,
            port = config.port,
            vhost = %config.vhost,
            user = %credentials.user,
            "rabbitmq_connecting"
        );

        let connection =
            Connection::connect_uri(config.amqp_uri(credentials), ConnectionProperties::default())
                .await?;

        info!("rabbitmq_connected");

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = connection.close(200, "Normal shutdown").await {
                    warn!(error = %close_err, "rabbitmq_connection_close_error");
                }
                return Err(e.into());
            }
        };

        info!("rabbitmq_channel_created");

        Ok(Self {
            connection,
            channel,
        })
    }

    /// Close the channel and connection gracefully.
    pub async fn close(self) {
        if self.channel.status().connected() {
            if let Err(e) = self.channel.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_channel_close_error");
            }
        }

        if self.connection.status().connected() {
            if let Err(e) = self.connection.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_connection_closed");
    }
}

fn lapin_kind(kind: ExchangeKind) -> lapin::ExchangeKind {
    match kind {
        ExchangeKind::Direct => lapin::ExchangeKind::Direct,
    }
}

/// Arguments table for a TTL-bound queue.
///
/// Encoded as a signed 32-bit value when it fits, which is what other AMQP
/// clients send; RabbitMQ compares argument types on redeclaration.
pub fn ttl_arguments(ttl_ms: u32) -> FieldTable {
    let value = i32::try_from(ttl_ms)
        .map(AMQPValue::LongInt)
        .unwrap_or_else(|_| AMQPValue::LongLongInt(i64::from(ttl_ms)));

    let mut arguments = FieldTable::default();
    arguments.insert(MESSAGE_TTL_ARG.into(), value);
    arguments
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), ChannelError> {
        self.channel
            .exchange_declare(
                name,
                lapin_kind(kind),
                ExchangeDeclareOptions {
                    durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        debug!(exchange = name, kind = kind.as_str(), durable, "rabbitmq_exchange_declared");
        Ok(())
    }

    async fn declare_queue(
        &self,
        name: &str,
        durable: bool,
        ttl_ms: u32,
    ) -> Result<(), ChannelError> {
        self.channel
            .queue_declare(
                name,
                QueueDeclareOptions {
                    durable,
                    ..Default::default()
                },
                ttl_arguments(ttl_ms),
            )
            .await?;

        debug!(queue = name, durable, ttl_ms, "rabbitmq_queue_declared");
        Ok(())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), ChannelError> {
        self.channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        debug!(queue, exchange, routing_key, "rabbitmq_queue_bound");
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), ChannelError> {
        // No publisher confirms are awaited.
        let _confirm = self
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("text/plain".into()),
            )
            .await?;

        Ok(())
    }
}
