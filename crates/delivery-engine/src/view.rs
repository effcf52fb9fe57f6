//! Presentation-ready snapshots.
//!
//! Consumers (renderer, tables, notification panels) read these owned
//! values; they never see — and can never mutate — the live registries.

use crate::model::{Driver, DriverRoute, EntityRef, GridSize, House, OrderStatus, Restaurant};
use crate::state::HistoryEntry;
use serde::Serialize;
use std::collections::BTreeMap;

/// One order, with display fields derived at snapshot time.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub receipt: String,
    pub status: OrderStatus,
    pub status_label: String,
    pub progress: f64,
    pub restaurant: EntityRef,
    pub destination: EntityRef,
    pub dish_names: Vec<String>,
    pub total_time: f64,
    pub elapsed_time: f64,
    pub remaining: f64,
    pub assigned_driver: Option<u32>,
    pub is_speculative: bool,
    pub is_auto: bool,
    pub tombstoned: bool,
}

/// One driver plus the receipts of its active (non-tombstoned) orders.
#[derive(Debug, Clone, Serialize)]
pub struct DriverView {
    #[serde(flatten)]
    pub driver: Driver,
    pub active_orders: Vec<String>,
}

/// The world as of one engine mutation: everything downstream consumers are
/// allowed to know.
#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    /// Orders in creation order, tombstoned ones included until purge.
    pub orders: Vec<OrderView>,
    pub drivers: Vec<DriverView>,
    pub restaurants: Vec<Restaurant>,
    pub houses: Vec<House>,
    /// Active route associations, keyed by driver id.
    pub routes: BTreeMap<u32, DriverRoute>,
    pub grid: Option<GridSize>,
    /// Orders created since the last reset (speculative dispatches included).
    pub total_orders_created: u64,
    /// Non-tombstoned orders currently tracked.
    pub in_circulation: usize,
    /// Recent system events, newest first.
    pub history: Vec<HistoryEntry>,
}
