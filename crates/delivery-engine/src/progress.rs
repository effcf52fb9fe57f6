//! Progress timer service.
//!
//! A fixed-period task that sends `Tick` into the engine's request channel.
//! Because ticks ride the same queue as events, a tick observes either all
//! of a mutation or none of it. The tick itself is purely derivative: it
//! refreshes elapsed/remaining/progress for preparing orders and performs
//! due tombstone purges; it never changes an order's status.

use crate::engine::EngineClient;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Spawns the recurring tick task. The task exits when the engine goes away.
pub fn spawn_progress_ticker(client: EngineClient, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // Late ticks should not burst; the next one carries the same
        // information.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if client.tick().await.is_err() {
                debug!("engine gone, progress ticker stopping");
                break;
            }
        }
    })
}
