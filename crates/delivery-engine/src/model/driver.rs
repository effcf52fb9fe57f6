//! Drivers and their route associations.

use crate::model::GridPos;
use delivery_wire::DriverState;
use serde::Serialize;

/// A delivery driver, keyed by zero-based numeric id.
#[derive(Debug, Clone, Serialize)]
pub struct Driver {
    pub id: u32,
    pub name: String,
    pub pos: GridPos,
    pub state: DriverState,
}

/// What a route association points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteObjective {
    Restaurant,
    Destination,
}

/// Visual route held for a driver while it travels toward a pickup or a
/// drop-off. Released when the order is purged or cancelled.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DriverRoute {
    pub objective: RouteObjective,
    pub from: GridPos,
    pub to: GridPos,
}

/// Resolves a wire driver name (`"repartidor 3"`) to the zero-based driver
/// id. The controller numbers drivers from 1 in names but addresses them
/// from 0 everywhere else.
pub fn driver_index(name: &str) -> Option<u32> {
    let trailing: u32 = name.split_whitespace().last()?.parse().ok()?;
    trailing.checked_sub(1)
}
