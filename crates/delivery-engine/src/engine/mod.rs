//! # Engine actor and client
//!
//! The canonical wiring mirrors the rest of the system:
//!
//! 1. **Create**: [`new`] (or [`with_config`]) yields the actor and its
//!    client.
//! 2. **Wire**: collaborator ports go into [`TrackerEngine::run`].
//! 3. **Run**: spawn the run loop; share clones of the client.
//!
//! ```no_run
//! use delivery_engine::collaborators::EnginePorts;
//! use delivery_engine::engine;
//!
//! # async fn demo() {
//! let (actor, client) = engine::new();
//! tokio::spawn(actor.run(EnginePorts::default()));
//! let snapshot = client.snapshot().await.unwrap();
//! assert!(snapshot.orders.is_empty());
//! # }
//! ```

pub mod actor;
pub mod client;
pub mod error;
pub mod message;

pub use actor::TrackerEngine;
pub use client::EngineClient;
pub use error::EngineError;
pub use message::{EngineRequest, Response};

use crate::config::EngineConfig;
use tokio::sync::mpsc;

/// Creates an engine with default configuration.
pub fn new() -> (TrackerEngine, EngineClient) {
    with_config(EngineConfig::default())
}

/// Creates an engine with explicit configuration.
pub fn with_config(config: EngineConfig) -> (TrackerEngine, EngineClient) {
    let (sender, receiver) = mpsc::channel(config.channel_capacity);
    let engine = TrackerEngine::new(receiver, config);
    (engine, EngineClient::new(sender))
}
