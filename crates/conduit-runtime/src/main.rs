//! # Conduit Runtime
//!
//! Runs the substrate with the reference domains. Each line read from stdin
//! is submitted as an inbound message:
//!
//! ```text
//! stdin ──→ ingestion.message.ready ──→ decision.intent.generated
//!                                              │
//!                                              ↓
//!                     presentation.intent.ready, speech stream, subtitles
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (from `CONDUIT_*` environment variables)
//! 2. Load configuration (`CONDUIT_CONFIG` + overrides) and validate
//! 3. Build and start the runtime
//! 4. Read stdin until EOF or Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use conduit_runtime::domains::ingestion::InboundMessage;
use conduit_runtime::{ConduitRuntime, RuntimeConfig};
use conduit_telemetry::{init_telemetry, TelemetryConfig};

const STDIN_SOURCE: &str = "stdin";

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_component("conduit-runtime"))
        .context("failed to initialize telemetry")?;

    let config = RuntimeConfig::load().context("failed to load configuration")?;

    let runtime = ConduitRuntime::new(config).context("failed to build runtime")?;
    runtime.start().await.context("failed to start runtime")?;

    let ingestion = runtime.ingestion();
    if let Err(e) = ingestion.source_status(STDIN_SOURCE, true).await {
        warn!("Failed to announce stdin source: {}", e);
    }

    info!("Conduit is running. Type a message per line; Ctrl+C to stop.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal.context("failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(text)) => {
                    let message = InboundMessage::new(STDIN_SOURCE, "console", text);
                    if let Err(e) = ingestion.submit(message).await {
                        warn!("Message rejected: {}", e);
                    }
                }
                Ok(None) => {
                    info!("stdin closed");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    }

    if let Err(e) = ingestion.source_status(STDIN_SOURCE, false).await {
        warn!("Failed to announce stdin source: {}", e);
    }

    // Graceful shutdown
    runtime.shutdown().await;

    Ok(())
}
