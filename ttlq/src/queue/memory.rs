//! In-memory broker used by unit tests.
//!
//! Mirrors the broker behaviour the core relies on: identical redeclarations
//! succeed, conflicting ones fail with a precondition error, binding needs both
//! endpoints, and publishing to an unknown exchange is refused.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::channel::{BrokerChannel, ChannelError};
use super::types::ExchangeKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DeclareExchange { name: String, kind: ExchangeKind, durable: bool },
    DeclareQueue { name: String, durable: bool, ttl_ms: u32 },
    BindQueue { queue: String, exchange: String, routing_key: String },
    Publish { exchange: String, routing_key: String, body: String },
}

#[derive(Default)]
struct State {
    exchanges: HashMap<String, (ExchangeKind, bool)>,
    queues: HashMap<String, (bool, u32)>,
    bindings: Vec<(String, String, String)>,
    calls: Vec<Call>,
    publish_attempts: usize,
}

#[derive(Default)]
pub struct MemoryBroker {
    state: Mutex<State>,
    /// 1-based publish attempt that fails with a transport error.
    fail_publish_at: Option<usize>,
    fail_all: bool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_publish_at(attempt: usize) -> Self {
        Self {
            fail_publish_at: Some(attempt),
            ..Self::default()
        }
    }

    /// Every operation fails as if the connection dropped.
    pub fn disconnected() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn publishes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Publish { .. }))
            .collect()
    }

    pub fn queue_ttl(&self, name: &str) -> Option<u32> {
        self.state.lock().unwrap().queues.get(name).map(|q| q.1)
    }

    pub fn binding_count(&self) -> usize {
        self.state.lock().unwrap().bindings.len()
    }

    fn check_connected(&self) -> Result<(), ChannelError> {
        if self.fail_all {
            return Err(ChannelError::Transport("connection reset by peer".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerChannel for MemoryBroker {
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), ChannelError> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeclareExchange {
            name: name.to_string(),
            kind,
            durable,
        });

        match state.exchanges.get(name) {
            Some(existing) if *existing != (kind, durable) => Err(
                ChannelError::PreconditionFailed(format!(
                    "inequivalent arg 'durable' for exchange '{name}'"
                )),
            ),
            Some(_) => Ok(()),
            None => {
                state.exchanges.insert(name.to_string(), (kind, durable));
                Ok(())
            }
        }
    }

    async fn declare_queue(
        &self,
        name: &str,
        durable: bool,
        ttl_ms: u32,
    ) -> Result<(), ChannelError> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeclareQueue {
            name: name.to_string(),
            durable,
            ttl_ms,
        });

        match state.queues.get(name) {
            Some(existing) if *existing != (durable, ttl_ms) => Err(
                ChannelError::PreconditionFailed(format!(
                    "inequivalent arg 'x-message-ttl' for queue '{name}'"
                )),
            ),
            Some(_) => Ok(()),
            None => {
                state.queues.insert(name.to_string(), (durable, ttl_ms));
                Ok(())
            }
        }
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), ChannelError> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::BindQueue {
            queue: queue.to_string(),
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
        });

        if !state.exchanges.contains_key(exchange) || !state.queues.contains_key(queue) {
            return Err(ChannelError::Transport(format!(
                "NOT_FOUND - cannot bind '{queue}' to '{exchange}'"
            )));
        }

        let binding = (queue.to_string(), exchange.to_string(), routing_key.to_string());
        if !state.bindings.contains(&binding) {
            state.bindings.push(binding);
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), ChannelError> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        state.publish_attempts += 1;

        if self.fail_publish_at == Some(state.publish_attempts) {
            return Err(ChannelError::Transport("channel closed".into()));
        }
        if !state.exchanges.contains_key(exchange) {
            return Err(ChannelError::Transport(format!(
                "NOT_FOUND - no exchange '{exchange}'"
            )));
        }

        state.calls.push(Call::Publish {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            body: String::from_utf8_lossy(body).into_owned(),
        });
        Ok(())
    }
}
