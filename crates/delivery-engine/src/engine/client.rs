//! # Engine Client
//!
//! Type-safe handle for talking to the engine actor. Holds only the sender
//! half of the request channel, so it is cheap to clone and share: the
//! transport adapter, the timer task, and any number of query consumers each
//! keep their own clone.

use crate::engine::error::EngineError;
use crate::engine::message::EngineRequest;
use crate::model::{CorrelationToken, OrderRequest};
use crate::state::{IngestOutcome, MetricsReport};
use crate::view::WorldSnapshot;
use delivery_wire::ControllerMessage;
use tokio::sync::{mpsc, oneshot};

#[derive(Clone)]
pub struct EngineClient {
    sender: mpsc::Sender<EngineRequest>,
}

impl EngineClient {
    pub(crate) fn new(sender: mpsc::Sender<EngineRequest>) -> Self {
        Self { sender }
    }

    /// Applies one decoded controller message.
    pub async fn ingest(&self, message: ControllerMessage) -> Result<IngestOutcome, EngineError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(EngineRequest::Ingest {
                message,
                respond_to,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        response.await.map_err(|_| EngineError::EngineDropped)?
    }

    /// Decodes and applies one raw feed line. Malformed lines are rejected
    /// here, before anything touches the registry.
    pub async fn ingest_line(&self, line: &str) -> Result<IngestOutcome, EngineError> {
        let message = ControllerMessage::decode(line)?;
        self.ingest(message).await
    }

    /// Creates a speculative order and dispatches its command. Returns the
    /// correlation token the confirming `ORDER_CREATED` will consume.
    pub async fn place_order(
        &self,
        request: OrderRequest,
    ) -> Result<CorrelationToken, EngineError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(EngineRequest::PlaceOrder {
                request,
                respond_to,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        response.await.map_err(|_| EngineError::EngineDropped)?
    }

    /// Requests cancellation from the controller.
    pub async fn cancel_order(&self, receipt: impl Into<String>) -> Result<(), EngineError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(EngineRequest::CancelOrder {
                receipt: receipt.into(),
                respond_to,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        response.await.map_err(|_| EngineError::EngineDropped)?
    }

    pub async fn snapshot(&self) -> Result<WorldSnapshot, EngineError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(EngineRequest::Snapshot { respond_to })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        response.await.map_err(|_| EngineError::EngineDropped)?
    }

    pub async fn metrics(&self) -> Result<MetricsReport, EngineError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(EngineRequest::Metrics { respond_to })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        response.await.map_err(|_| EngineError::EngineDropped)?
    }

    /// Sends a progress-timer tick. Fire-and-forget.
    pub async fn tick(&self) -> Result<(), EngineError> {
        self.sender
            .send(EngineRequest::Tick)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}
