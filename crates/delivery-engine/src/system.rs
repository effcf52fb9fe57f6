//! # System Lifecycle & Orchestration
//!
//! [`TrackerSystem`] is the conductor: it creates the engine, wires the
//! collaborator ports, spawns the actor and the progress timer, and
//! coordinates graceful shutdown.
//!
//! # Shutdown
//!
//! 1. The timer task is aborted (it holds a client clone and would otherwise
//!    keep the request channel open forever).
//! 2. The system's own client is dropped, closing the channel.
//! 3. The engine drains remaining requests, logs its final state, and exits.

use crate::collaborators::EnginePorts;
use crate::config::EngineConfig;
use crate::engine::{self, EngineClient};
use crate::progress::spawn_progress_ticker;
use tracing::{error, info};

pub struct TrackerSystem {
    /// Handle for ingesting events and querying state. Clone freely.
    pub client: EngineClient,
    engine: tokio::task::JoinHandle<()>,
    ticker: tokio::task::JoinHandle<()>,
}

impl TrackerSystem {
    /// Starts the engine and the progress timer with default configuration.
    pub fn start(ports: EnginePorts) -> Self {
        Self::with_config(EngineConfig::default(), ports)
    }

    pub fn with_config(config: EngineConfig, ports: EnginePorts) -> Self {
        let tick_period = config.tick_period;
        let (actor, client) = engine::with_config(config);
        let engine = tokio::spawn(actor.run(ports));
        let ticker = spawn_progress_ticker(client.clone(), tick_period);
        Self {
            client,
            engine,
            ticker,
        }
    }

    /// Gracefully shuts the system down.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("shutting down tracker system");

        self.ticker.abort();
        let _ = self.ticker.await;

        drop(self.client);

        if let Err(e) = self.engine.await {
            error!("engine task failed: {e:?}");
            return Err(format!("engine task failed: {e:?}"));
        }
        info!("tracker system shut down");
        Ok(())
    }
}

/// Initializes structured logging for the whole process.
///
/// Verbosity is controlled through `RUST_LOG` (e.g. `RUST_LOG=info`,
/// `RUST_LOG=delivery_engine=debug`).
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
