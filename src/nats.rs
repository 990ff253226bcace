// Copyright (c) 2025 - Hotswap Core Contributors
//! NATS client abstraction and the NATS-backed event emitter

use async_nats::{Client, ConnectOptions, Subscriber};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{HotswapError, HotswapResult};
use crate::events::VersionedEvent;
use crate::ports::EventEmitter;
use crate::subjects::subject_for_event;

/// Configuration for the NATS connection
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "hotswap-core".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// NATS client wrapper providing domain-specific operations
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect with the given configuration
    pub async fn new(config: NatsConfig) -> HotswapResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout)
            .request_timeout(Some(config.request_timeout));

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| HotswapError::NatsConnection(e.to_string()))?;

        info!("Connected to NATS at {:?}", config.servers);

        Ok(Self { client })
    }

    /// Publish a JSON message to a subject
    pub async fn publish<T>(&self, subject: &str, message: &T) -> HotswapResult<()>
    where
        T: Serialize,
    {
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| HotswapError::NatsPublish(e.to_string()))?;

        debug!("Published message to subject: {}", subject);
        Ok(())
    }

    /// Subscribe to a subject (supports `>` and `*` wildcards)
    pub async fn subscribe(&self, subject: &str) -> HotswapResult<Subscriber> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| HotswapError::NatsSubscribe(e.to_string()))?;

        info!("Subscribed to subject: {}", subject);
        Ok(subscriber)
    }

    /// Get the underlying NATS client for advanced operations
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// [`EventEmitter`] publishing committed events on their hierarchical
/// subject (see [`subject_for_event`])
///
/// Registered alongside other emitters in the capability registry; a
/// publish failure is reported to the caller and logged there, never
/// rolled back into the store.
pub struct NatsEventEmitter {
    client: NatsClient,
}

impl NatsEventEmitter {
    /// Emitter on top of an established client
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventEmitter for NatsEventEmitter {
    async fn emit(&self, event: &VersionedEvent) -> HotswapResult<()> {
        let subject = subject_for_event(event);
        self.client.publish(&subject, event).await
    }
}
