//! Houses: delivery destinations.

use crate::model::GridPos;
use serde::Serialize;

/// A house on the map. Never mutated after creation except by a full reset.
#[derive(Debug, Clone, Serialize)]
pub struct House {
    pub id: u32,
    pub pos: GridPos,
    pub orientation: String,
}
