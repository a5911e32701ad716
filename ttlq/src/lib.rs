//! ttlq - durable RabbitMQ topology with time-boxed text messages.
//!
//! This library backs two binaries:
//! - `ttlq-provision`: declares a durable direct exchange, a durable queue with
//!   a message TTL, and the binding between them
//! - `ttlq-publish`: publishes text bodies suffixed with a shared expiration marker
//!
//! ## Architecture
//!
//! ```text
//! Config → ttlq-provision → exchange ─(routing key)→ queue (x-message-ttl)
//! Config → ttlq-publish   → "body ### This message expires at ..." → exchange
//! ```

pub mod config;
pub mod credentials;
pub mod queue;
pub mod session;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{CredentialProvider, Credentials, EnvOrPrompt, StaticCredentials};
pub use queue::{
    provision, publish_batch, publish_batch_at, AmqpChannel, BrokerChannel, ChannelError,
    ProvisionError, PublishError, PublishReceipt, Topology,
};
pub use session::{provision_on_broker, publish_on_broker, SessionError};
