//! Engine errors.
//!
//! Nothing here is process-fatal: every error either degrades to a no-op
//! (unknown entities, malformed lines) or rolls the affected operation back
//! (transport failures).

use crate::collaborators::CommandPortError;
use delivery_wire::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine task is gone; the request was never delivered.
    #[error("engine channel closed")]
    ChannelClosed,
    /// The engine dropped the response channel mid-request.
    #[error("engine dropped the response channel")]
    EngineDropped,
    /// A request referenced an entity the registry does not hold.
    #[error("unknown {kind} {id}")]
    UnknownEntity { kind: &'static str, id: String },
    /// A request that can never be valid (e.g. an empty dish selection).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The outbound command channel is not open. Any speculative order
    /// staged for the command has already been rolled back.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(#[from] CommandPortError),
    /// The feed line failed to decode; nothing was applied.
    #[error("malformed feed line: {0}")]
    Malformed(#[from] DecodeError),
}
