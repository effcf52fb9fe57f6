//! Domain model: the entities the engine tracks.
//!
//! These are plain data types; every mutation goes through the engine state
//! (see [`crate::state`]), never through consumers.

pub mod driver;
pub mod house;
pub mod order;
pub mod restaurant;

pub use driver::{driver_index, Driver, DriverRoute, RouteObjective};
pub use house::House;
pub use order::{CorrelationToken, EntityRef, Order, OrderRequest, OrderStatus};
pub use restaurant::{Dish, Restaurant};

use serde::Serialize;

/// A cell on the city grid: avenue (x) and street (y), both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPos {
    pub av: u32,
    pub ca: u32,
}

/// City dimensions announced by a `map` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridSize {
    pub streets: u32,
    pub avenues: u32,
}
