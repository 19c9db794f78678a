//! # Conduit Runtime
//!
//! Owns the substrate container and the reference domains, and drives their
//! lifecycle.
//!
//! ## Startup Sequence
//!
//! 1. Build the substrate container from validated configuration
//! 2. Create one `DomainBus` per domain and build the domains
//! 3. Register the decision pipeline stages, apply configured overrides
//! 4. `start()`: subscribe the domains and the playback device, start the
//!    cache sweeper and the metrics reporter
//!
//! ## Shutdown Sequence
//!
//! 1. Signal the metrics reporter and wait for its final report
//! 2. Stop the cache sweeper
//! 3. Stop the stream channel (consumers get `shutdown_grace` to exit)
//! 4. Remove the domain subscriptions from the bus

use std::sync::Arc;

use cd_01_data_cache::{start_sweeper, SweeperHandle};
use cd_02_stream_channel::{AudioChunk, StreamError, StreamSubscriber};
use cd_03_pipeline::PipelineError;
use parking_lot::Mutex;
use shared_types::{Domain, SubscriptionId};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::adapters::DomainBusError;
use crate::container::{ConfigError, RuntimeConfig, SubstrateContainer};
use crate::domains::decision::DecisionDomain;
use crate::domains::ingestion::IngestionDomain;
use crate::domains::presentation::{PlaybackMonitor, PresentationDomain};
use crate::reporter::{report_once, spawn_reporter};

/// Runtime startup errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to wire domain: {0}")]
    Wiring(#[from] DomainBusError),

    #[error("Failed to subscribe playback: {0}")]
    Stream(#[from] StreamError),

    #[error("Failed to register pipeline stages: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Runtime already started")]
    AlreadyStarted,
}

/// The running application.
pub struct ConduitRuntime {
    /// Shared substrate services.
    container: Arc<SubstrateContainer>,
    ingestion: Arc<IngestionDomain>,
    decision: Arc<DecisionDomain>,
    presentation: Arc<PresentationDomain>,
    /// Stands in for the audio output device.
    playback: Arc<PlaybackMonitor>,
    sweeper: Mutex<Option<SweeperHandle>>,
    reporter: Mutex<Option<JoinHandle<()>>>,
    /// Bus subscriptions made in `start`.
    subscriptions: Mutex<Vec<SubscriptionId>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
}

impl ConduitRuntime {
    /// Build the substrate and the domains. Nothing runs until
    /// [`ConduitRuntime::start`].
    ///
    /// # Errors
    ///
    /// `RuntimeError::Config` or `RuntimeError::Pipeline`.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        info!("Creating Conduit runtime");

        let container = Arc::new(SubstrateContainer::new(config)?);
        let config = &container.config;

        let ingestion = Arc::new(IngestionDomain::new(
            container.domain_bus(Domain::Ingestion),
        ));
        let decision = Arc::new(DecisionDomain::new(
            container.domain_bus(Domain::Decision),
            Arc::clone(&container.pipeline),
            Arc::clone(&container.cache),
            config.decision.clone(),
        ));
        let presentation = Arc::new(PresentationDomain::new(
            container.domain_bus(Domain::Presentation),
            Arc::clone(&container.cache),
            Arc::clone(&container.stream),
            config.presentation.clone(),
        ));

        decision.register_stages(&config.pipeline)?;

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            container,
            ingestion,
            decision,
            presentation,
            playback: Arc::new(PlaybackMonitor::new()),
            sweeper: Mutex::new(None),
            reporter: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
            shutdown_tx,
        })
    }

    /// Wire the domains and start the background tasks.
    ///
    /// # Errors
    ///
    /// `RuntimeError::AlreadyStarted`, or a wiring failure.
    pub async fn start(&self) -> Result<(), RuntimeError> {
        if self.sweeper.lock().is_some() {
            return Err(RuntimeError::AlreadyStarted);
        }
        info!("Starting Conduit runtime");

        let subscriptions = vec![self.decision.attach()?, self.presentation.attach()?];
        self.subscriptions.lock().extend(subscriptions);

        let playback: Arc<dyn StreamSubscriber<AudioChunk>> = self.playback.clone();
        self.container.stream.subscribe_default("playback", playback)?;

        *self.sweeper.lock() = Some(start_sweeper(&self.container.cache));
        *self.reporter.lock() = Some(spawn_reporter(
            Arc::clone(&self.container),
            self.container.config.metrics.report_interval,
            self.shutdown_tx.subscribe(),
        ));

        info!(
            subscriptions = self.container.bus.subscriber_count(),
            stages = ?self.container.pipeline.stage_names(),
            "Conduit runtime started"
        );
        Ok(())
    }

    /// Shut down gracefully. Safe to call more than once.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        // No receiver just means the reporter never started.
        let _ = self.shutdown_tx.send(true);

        let reporter = self.reporter.lock().take();
        if let Some(task) = reporter {
            if let Err(e) = task.await {
                error!("Metrics reporter failed: {}", e);
            }
        }

        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
        }

        self.container.stream.stop().await;

        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for id in &subscriptions {
            self.container.bus.unsubscribe(id);
        }

        report_once(&self.container);
        info!("Shutdown complete");
    }

    /// Entry point for inbound messages.
    pub fn ingestion(&self) -> Arc<IngestionDomain> {
        Arc::clone(&self.ingestion)
    }

    pub fn playback(&self) -> Arc<PlaybackMonitor> {
        Arc::clone(&self.playback)
    }

    /// Get a reference to the substrate container.
    pub fn container(&self) -> Arc<SubstrateContainer> {
        Arc::clone(&self.container)
    }
}
