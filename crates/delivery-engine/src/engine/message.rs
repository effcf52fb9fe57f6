//! Request messages between the client and the engine actor.

use crate::engine::error::EngineError;
use crate::model::{CorrelationToken, OrderRequest};
use crate::state::{IngestOutcome, MetricsReport};
use crate::view::WorldSnapshot;
use delivery_wire::ControllerMessage;
use tokio::sync::oneshot;

/// One-shot response channel used by the engine actor.
pub type Response<T> = oneshot::Sender<Result<T, EngineError>>;

/// Everything the engine actor can be asked to do.
///
/// Requests are processed strictly in arrival order; the progress timer's
/// `Tick` rides the same channel, so a tick can never interleave with a
/// half-applied event.
#[derive(Debug)]
pub enum EngineRequest {
    /// Apply one decoded controller message.
    Ingest {
        message: ControllerMessage,
        respond_to: Response<IngestOutcome>,
    },
    /// Create a speculative order and dispatch its command.
    PlaceOrder {
        request: OrderRequest,
        respond_to: Response<CorrelationToken>,
    },
    /// Ask the controller to cancel an order. No local state changes; the
    /// verdict arrives as a later `CANCELLED` or `CANCEL_REJECTED` event.
    CancelOrder {
        receipt: String,
        respond_to: Response<()>,
    },
    /// Read the current world.
    Snapshot {
        respond_to: Response<WorldSnapshot>,
    },
    /// Read the metrics aggregates.
    Metrics {
        respond_to: Response<MetricsReport>,
    },
    /// Progress-timer tick.
    Tick,
}
