//! Restaurants, their menus, and load counters.

use crate::model::GridPos;
use delivery_wire::LoadState;
use serde::Serialize;

/// A restaurant on the map.
///
/// `load_state` is controller-asserted (the controller owns the scheduling
/// decision); the dish counters are local display estimates maintained from
/// the event stream and are not authoritative.
#[derive(Debug, Clone, Serialize)]
pub struct Restaurant {
    pub id: u32,
    pub pos: GridPos,
    pub orientation: String,
    pub load_state: LoadState,
    /// Dishes ordered from this restaurant since the last reset.
    pub total_dishes: u32,
    /// Dishes currently in preparation. Never negative.
    pub pending_dishes: u32,
}

impl Restaurant {
    pub fn new(id: u32, pos: GridPos, orientation: String) -> Self {
        Self {
            id,
            pos,
            orientation,
            load_state: LoadState::Normal,
            total_dishes: 0,
            pending_dishes: 0,
        }
    }
}

/// One catalog entry from a `menu` message.
#[derive(Debug, Clone, Serialize)]
pub struct Dish {
    pub id: u32,
    pub name: String,
    /// Advertised preparation time in seconds.
    pub prep_time: f64,
}
