//! # Delivery Engine
//!
//! The order-lifecycle and state-synchronization engine behind the delivery
//! dashboard. An external embedded controller owns the ground truth (kitchen
//! timing, routing, driver motion) and streams it as line-delimited JSON
//! events; this crate ingests that feed and maintains the one consistent
//! in-memory model of orders, drivers, restaurants, and houses that every
//! downstream consumer reads.
//!
//! The feed is at-least-once and loosely correlated, so the engine's job is
//! mostly defensive:
//!
//! - **Dedup**: identical events inside a short window are re-deliveries and
//!   are dropped ([`state::dedup`]).
//! - **Reconciliation**: an order placed locally exists speculatively under
//!   a `TEMP-<n>` receipt until the controller confirms it; the confirming
//!   event rewrites the order's identity in place ([`state::lifecycle`]).
//! - **Graceful degradation**: a controller-initiated order whose
//!   correlation record expired still gets created, with placeholder
//!   references instead of a failure.
//! - **Two-phase delete**: finished orders are tombstoned first and purged
//!   after a grace delay, so consumers already in flight get one more
//!   consistent look.
//!
//! # Architecture
//!
//! One actor ([`engine::TrackerEngine`]) owns all mutable state and
//! processes requests sequentially from an mpsc channel; [`EngineClient`]
//! is the cloneable handle. The progress timer ([`progress`]) sends ticks
//! through the same channel, which is what makes the whole system
//! single-threaded in effect: no locks, no partial interleavings.
//! [`system::TrackerSystem`] wires everything together.
//!
//! Rendering, tables, and toasts are collaborator ports
//! ([`collaborators`]); so is the outbound command transport. All of them
//! default to explicit no-op implementations.

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod model;
pub mod progress;
pub mod state;
pub mod system;
pub mod view;

pub use collaborators::{
    CommandPort, CommandPortError, EnginePorts, Notice, NoticeLevel, Notifier, ViewSink,
};
pub use config::EngineConfig;
pub use engine::{EngineClient, EngineError, TrackerEngine};
pub use model::{CorrelationToken, OrderRequest, OrderStatus};
pub use state::{IngestOutcome, MetricsReport};
pub use system::{setup_tracing, TrackerSystem};
pub use view::WorldSnapshot;

// The wire protocol, re-exported for transport adapters.
pub use delivery_wire as wire;
