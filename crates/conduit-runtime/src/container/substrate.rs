//! # Substrate Container
//!
//! Holds the shared substrate services and hands out per-domain views of
//! the bus.
//!
//! ## Initialization Order
//!
//! 1. Event bus (no dependencies)
//! 2. Data cache (validated `CacheConfig`)
//! 3. Stream channel (validated `ChannelConfig`, started)
//! 4. Pipeline (empty; stages are registered by the domains that own them)

use std::sync::Arc;

use cd_01_data_cache::DataCache;
use cd_02_stream_channel::{AudioChunk, StreamChannel};
use cd_03_pipeline::PipelineManager;
use shared_bus::EventBus;
use shared_types::Domain;
use tracing::info;

use super::config::{ConfigError, RuntimeConfig};
use crate::adapters::DomainBus;

/// Container holding every substrate service.
pub struct SubstrateContainer {
    /// Event bus shared by all domains.
    pub bus: Arc<EventBus>,
    /// Large payload store.
    pub cache: Arc<DataCache>,
    /// Rendered audio stream.
    pub stream: Arc<StreamChannel<AudioChunk>>,
    /// Reply post-processing pipeline.
    pub pipeline: Arc<PipelineManager<String>>,
    /// Configuration the services were built from.
    pub config: RuntimeConfig,
}

impl SubstrateContainer {
    /// Build and start all services.
    ///
    /// # Errors
    ///
    /// `ConfigError` if a component rejects its configuration.
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        info!("Initializing substrate services");

        let bus = Arc::new(EventBus::new());
        let cache = Arc::new(DataCache::new(config.cache.clone())?);
        let stream = Arc::new(StreamChannel::new(config.stream.clone())?);
        stream.start();
        let pipeline = Arc::new(PipelineManager::new());

        info!(
            cache_max_mb = config.cache.max_size_mb,
            cache_max_entries = config.cache.max_entries,
            stream_queue_size = config.stream.subscriber_defaults.queue_size,
            "Substrate services initialized"
        );

        Ok(Self {
            bus,
            cache,
            stream,
            pipeline,
            config,
        })
    }

    /// Bus view for one domain. Publishes and subscriptions through it are
    /// checked against the domain flow.
    pub fn domain_bus(&self, domain: Domain) -> DomainBus {
        DomainBus::new(Arc::clone(&self.bus), domain)
    }
}
