//! Engine tuning knobs.

use std::time::Duration;

/// Timing windows and capacities for the engine.
///
/// The defaults are the values the controller protocol was tuned against;
/// tests shrink them to keep paused-clock scenarios short.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Identical lifecycle events for the same receipt inside this window
    /// are dropped as re-deliveries.
    pub duplicate_window: Duration,
    /// How long a speculative order stays eligible for reconciliation with
    /// a confirming `ORDER_CREATED`.
    pub reconcile_window: Duration,
    /// Lifetime of the out-of-band auto-order correlation record.
    pub auto_order_ttl: Duration,
    /// Grace between a delivery and the physical purge of its order.
    pub delivered_purge_grace: Duration,
    /// Grace between a cancellation and the physical purge of its order.
    pub cancelled_purge_grace: Duration,
    /// Period of the progress timer.
    pub tick_period: Duration,
    /// History ring capacity.
    pub history_capacity: usize,
    /// Engine request channel capacity.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            duplicate_window: Duration::from_millis(1000),
            reconcile_window: Duration::from_millis(2000),
            auto_order_ttl: Duration::from_millis(5000),
            delivered_purge_grace: Duration::from_millis(2000),
            cancelled_purge_grace: Duration::from_millis(100),
            tick_period: Duration::from_millis(100),
            history_capacity: 50,
            channel_capacity: 64,
        }
    }
}
