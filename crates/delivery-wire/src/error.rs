//! Decode errors for the inbound feed.

/// Why a feed line was rejected at the ingestion boundary.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty line")]
    Empty,
    #[error("not a JSON object")]
    NotJson,
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}
