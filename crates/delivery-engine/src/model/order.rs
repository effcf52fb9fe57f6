//! Orders and their lifecycle states.

use crate::model::GridPos;
use serde::Serialize;
use std::fmt;
use tokio::time::Instant;

/// Lifecycle states of an order.
///
/// The chain is `SpeculativeQueued → Queued → Preparing → Ready → Assigned →
/// InTransit → Delivered`, with `Cancelled` reachable from every
/// non-terminal state. Transitions are applied exclusively by the engine's
/// transition table (see [`crate::state::lifecycle`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStatus {
    /// Created locally, not yet confirmed by the controller.
    SpeculativeQueued,
    Queued,
    Preparing,
    Ready,
    Assigned,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OrderStatus::SpeculativeQueued => "waiting for confirmation",
            OrderStatus::Queued => "queued",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Assigned => "assigned",
            OrderStatus::InTransit => "in transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Reference to a restaurant or house. `Unknown` is the placeholder used
/// when an auto order arrives without a usable correlation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityRef {
    Known { id: u32, pos: GridPos },
    Unknown,
}

impl EntityRef {
    pub fn id(&self) -> Option<u32> {
        match self {
            EntityRef::Known { id, .. } => Some(*id),
            EntityRef::Unknown => None,
        }
    }

    pub fn pos(&self) -> Option<GridPos> {
        match self {
            EntityRef::Known { pos, .. } => Some(*pos),
            EntityRef::Unknown => None,
        }
    }
}

/// Token identifying a speculative order until the controller confirms it.
///
/// Returned synchronously from the place-order operation; the engine keeps a
/// matching ticket and consumes it when the confirming `ORDER_CREATED`
/// arrives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    pub(crate) fn new(receipt: String) -> Self {
        Self(receipt)
    }

    /// The temporary receipt (`TEMP-<n>`) the token stands for.
    pub fn receipt(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A local order-creation request.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub restaurant_id: u32,
    pub house_id: u32,
    pub dish_ids: Vec<u32>,
}

/// A tracked order. Keyed in the registry by `receipt`; at most one
/// non-tombstoned order may hold a given receipt.
#[derive(Debug, Clone)]
pub struct Order {
    pub receipt: String,
    pub status: OrderStatus,
    /// 0–100. Derived for `Preparing` orders by the progress timer.
    pub progress: f64,
    pub restaurant: EntityRef,
    pub destination: EntityRef,
    /// Dish selection, kept through reconciliation. Empty for auto orders.
    pub dish_ids: Vec<u32>,
    pub dish_names: Vec<String>,
    /// Expected preparation time in seconds. Zero when the controller never
    /// supplied one.
    pub total_time: f64,
    pub elapsed_time: f64,
    /// Set when preparation starts; cleared on `Ready`. While set, the
    /// progress timer keeps `elapsed_time` current.
    pub start_time: Option<Instant>,
    pub is_speculative: bool,
    pub is_auto: bool,
    pub assigned_driver: Option<u32>,
    /// Deleted but retained until `purge_at` so consumers already in flight
    /// observe the terminal state once before the order disappears.
    pub tombstoned: bool,
    pub purge_at: Option<Instant>,
    pub created_at: Instant,
}

impl Order {
    /// Seconds of preparation left, floored at zero.
    pub fn remaining(&self) -> f64 {
        (self.total_time - self.elapsed_time).max(0.0)
    }

    /// Human-readable status, including the driver once one is involved.
    pub fn status_label(&self) -> String {
        match (self.status, self.assigned_driver) {
            (OrderStatus::Assigned, Some(driver)) => format!("assigned to driver {driver}"),
            (OrderStatus::InTransit, Some(driver)) => format!("in transit (driver {driver})"),
            (status, _) => status.to_string(),
        }
    }
}
