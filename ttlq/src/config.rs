//! Configuration module for environment variable parsing.
//!
//! Both binaries read the same static values: the broker target (host, port,
//! vhost, user) and the topology descriptor (exchange, queue, routing key, TTL).

use std::env;
use std::str::FromStr;

use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use tracing::warn;

use crate::credentials::Credentials;
use crate::queue::Topology;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Broker hostname
    pub host: String,

    /// Broker AMQP port
    pub port: u16,

    /// Virtual host holding the topology
    pub vhost: String,

    /// User to authenticate as; the password comes from a credential provider
    pub user: String,

    // =========================================================================
    // Topology
    // =========================================================================

    /// Durable direct exchange name
    pub exchange: String,

    /// Durable queue name
    pub queue: String,

    /// Routing key binding the queue to the exchange
    pub routing_key: String,

    /// Per-queue message TTL in milliseconds
    pub ttl_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "localhost".to_string(),
            port: 5672,
            vhost: "/".to_string(),
            user: "guest".to_string(),
            exchange: "ttlq".to_string(),
            queue: "ttlq.messages".to_string(),
            routing_key: "ttlq".to_string(),
            ttl_ms: 60_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            host: string_var("TTLQ_HOST", defaults.host),
            port: parsed_var("TTLQ_PORT", defaults.port),
            vhost: string_var("TTLQ_VHOST", defaults.vhost),
            user: string_var("TTLQ_USER", defaults.user),
            exchange: string_var("TTLQ_EXCHANGE", defaults.exchange),
            queue: string_var("TTLQ_QUEUE", defaults.queue),
            routing_key: string_var("TTLQ_ROUTING_KEY", defaults.routing_key),
            ttl_ms: parsed_var("TTLQ_TTL_MS", defaults.ttl_ms),
        }
    }

    /// The immutable topology descriptor shared by the provisioner and publisher.
    pub fn topology(&self) -> Topology {
        Topology::new(
            self.exchange.clone(),
            self.queue.clone(),
            self.routing_key.clone(),
            self.ttl_ms,
        )
    }

    /// Connection target for the configured broker and vhost.
    pub fn amqp_uri(&self, credentials: &Credentials) -> AMQPUri {
        AMQPUri {
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: credentials.user.clone(),
                    password: credentials.password().to_string(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost: self.vhost.clone(),
            ..Default::default()
        }
    }
}

fn string_var(name: &str, default: String) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

/// Parse a numeric variable, keeping the default on malformed input.
fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}
