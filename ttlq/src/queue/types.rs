//! Topology and message types.
//!
//! This module defines:
//! - `Topology`: the immutable exchange/queue/binding descriptor
//! - `ExpirationMarker`: the human-readable expiry stamp shared by a batch
//! - `OutboundMessage` / `PublishReceipt`: per-publish values

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Separator between a message body and its expiration marker.
pub const MARKER_SEPARATOR: &str = " ### ";

/// Prefix and layout of the expiration marker.
const MARKER_FORMAT: &str = "This message expires at %Y-%m-%d %H:%M:%S";

// =============================================================================
// Topology
// =============================================================================

/// Exchange kinds the provisioner declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Direct,
}

impl ExchangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Direct => "direct",
        }
    }
}

/// Durable exchange, TTL-bound queue and the binding between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub exchange_name: String,
    pub exchange_kind: ExchangeKind,
    pub queue_name: String,
    pub routing_key: String,
    /// Messages left unconsumed longer than this are dropped by the broker.
    pub ttl_ms: u32,
    pub durable: bool,
}

impl Topology {
    /// Create a durable direct-exchange topology.
    pub fn new(
        exchange_name: impl Into<String>,
        queue_name: impl Into<String>,
        routing_key: impl Into<String>,
        ttl_ms: u32,
    ) -> Self {
        Self {
            exchange_name: exchange_name.into(),
            exchange_kind: ExchangeKind::Direct,
            queue_name: queue_name.into(),
            routing_key: routing_key.into(),
            ttl_ms,
            durable: true,
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// "This message expires at YYYY-MM-DD HH:MM:SS".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationMarker(String);

impl ExpirationMarker {
    /// Marker for a message sent at `now` into a queue with the given TTL.
    pub fn at(now: NaiveDateTime, ttl_ms: u32) -> Self {
        let expires = now + Duration::milliseconds(i64::from(ttl_ms));
        Self(expires.format(MARKER_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpirationMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A body paired with the marker of its batch. Lives for one publish call.
#[derive(Debug, Clone, Copy)]
pub struct OutboundMessage<'a> {
    pub body: &'a str,
    pub expiration_marker: &'a ExpirationMarker,
}

impl<'a> OutboundMessage<'a> {
    pub fn new(body: &'a str, expiration_marker: &'a ExpirationMarker) -> Self {
        Self {
            body,
            expiration_marker,
        }
    }

    /// The exact text put on the wire.
    pub fn compose(&self) -> String {
        format!("{}{}{}", self.body, MARKER_SEPARATOR, self.expiration_marker)
    }
}

/// What was sent for one body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub body: String,
    pub composed_text: String,
}
