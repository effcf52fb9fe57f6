//! # Order Lifecycle State Machine
//!
//! An explicit finite-state machine over the order event alphabet. The
//! transition function is total: every (state, event) pair either yields the
//! next state or is a logged no-op — never an error, because the feed is
//! at-least-once and loosely ordered.
//!
//! `ORDER_CREATED` does not go through the plain table; it either reconciles
//! a speculative order (rewriting its identity in place) or creates an auto
//! order, see [`EngineState::apply_order_event`].

use crate::collaborators::{Notice, NoticeLevel};
use crate::model::{driver_index, EntityRef, Order, OrderStatus};
use crate::state::{EngineState, IngestOutcome, IngestReport};
use delivery_wire::{OrderEvent, OrderEventKind};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Dish label for auto orders whose correlation record expired or never
/// arrived.
pub(crate) const AUTO_ORDER_LABEL: &str = "auto order";

/// The transition table.
///
/// Forward-lenient: an event may fire from any earlier in-chain state, so a
/// dropped intermediate event does not wedge the order. `Delivered` is
/// reachable from `Assigned` because the controller omits `DRIVER_PICKED_UP`
/// for zero-length drives. Unlisted pairs are no-ops.
pub fn next_status(current: OrderStatus, event: OrderEventKind) -> Option<OrderStatus> {
    use OrderEventKind as E;
    use OrderStatus as S;
    match (current, event) {
        (S::Queued | S::Preparing, E::Preparing) => Some(S::Preparing),
        (S::Queued | S::Preparing, E::Ready) => Some(S::Ready),
        (S::Queued | S::Preparing | S::Ready, E::DriverAssigned) => Some(S::Assigned),
        (S::Ready | S::Assigned, E::PickedUp) => Some(S::InTransit),
        (S::Assigned | S::InTransit, E::Delivered) => Some(S::Delivered),
        (current, E::Cancelled) if !current.is_terminal() => Some(S::Cancelled),
        _ => None,
    }
}

impl EngineState {
    /// Applies one lifecycle event: reset detection, then the dedup gate,
    /// then the per-event handler.
    pub(crate) fn apply_order_event(&mut self, event: &OrderEvent, now: Instant) -> IngestReport {
        let kind = event.kind;

        if matches!(kind, OrderEventKind::SystemReset | OrderEventKind::Regenerate) {
            info!("reset event received");
            self.reset();
            return IngestReport::reset();
        }
        if kind == OrderEventKind::Unknown {
            debug!(receipt = %event.receipt, "unknown event kind ignored");
            return IngestReport::ignored();
        }

        if !self.dedup.admit(kind, &event.receipt, now) {
            debug!(receipt = %event.receipt, ?kind, "duplicate event dropped");
            return IngestReport::duplicate();
        }

        self.record_history(event);

        let outcome = match kind {
            OrderEventKind::Created => self.on_created(event, now),
            OrderEventKind::Preparing => self.on_preparing(event, now),
            OrderEventKind::Ready => self.on_ready(event),
            OrderEventKind::DriverAssigned => self.on_driver_assigned(event),
            OrderEventKind::PickedUp => self.on_picked_up(event),
            OrderEventKind::Delivered => self.on_delivered(event, now),
            OrderEventKind::Cancelled => self.on_cancelled(event, now),
            // Authority decision made by the controller; informational only.
            OrderEventKind::CancelRejected => IngestOutcome::Applied,
            _ => IngestOutcome::Ignored,
        };

        let mut report = IngestReport::with_outcome(outcome);
        report.notices = notices_for(event);
        report
    }

    fn on_created(&mut self, event: &OrderEvent, now: Instant) -> IngestOutcome {
        let receipt = &event.receipt;
        if self.orders.contains_key(receipt) {
            debug!(%receipt, "order already known, re-delivered ORDER_CREATED ignored");
            return IngestOutcome::Ignored;
        }

        // A fresh ticket means this confirmation belongs to a speculative
        // order: rewrite its identity under the new receipt, keeping the
        // restaurant/destination/dish selection intact.
        while let Some(ticket) = self.tickets.pop_front() {
            if now.duration_since(ticket.created_at) >= self.config.reconcile_window {
                continue;
            }
            let Some(mut order) = self.orders.remove(&ticket.receipt) else {
                continue;
            };
            if !order.is_speculative || order.tombstoned {
                let key = order.receipt.clone();
                self.orders.insert(key, order);
                continue;
            }
            info!(from = %ticket.receipt, to = %receipt, "speculative order reconciled");
            order.receipt = receipt.clone();
            order.status = OrderStatus::Queued;
            order.is_speculative = false;
            if let Some(prep) = event.prep_time_seconds() {
                order.total_time = prep;
            }
            order.start_time = None;
            order.elapsed_time = 0.0;
            order.progress = 0.0;
            self.orders.insert(receipt.clone(), order);
            return IngestOutcome::Applied;
        }

        // No candidate: the controller originated this order itself.
        let (restaurant, destination, dish_names) = match self.take_auto_context(now) {
            Some(seed) => {
                let restaurant = self.entity_ref_for_restaurant(seed.restaurant_id);
                let destination = self.entity_ref_for_house(seed.house_id);
                let dish_names = self.auto_dish_names(&seed);
                (restaurant, destination, dish_names)
            }
            None => {
                warn!(%receipt, "no fresh auto-order context, degrading to placeholders");
                (
                    EntityRef::Unknown,
                    EntityRef::Unknown,
                    vec![AUTO_ORDER_LABEL.to_string()],
                )
            }
        };

        let order = Order {
            receipt: receipt.clone(),
            status: OrderStatus::Queued,
            progress: 0.0,
            restaurant,
            destination,
            dish_ids: Vec::new(),
            dish_names,
            total_time: event.prep_time_seconds().unwrap_or(0.0),
            elapsed_time: 0.0,
            start_time: None,
            is_speculative: false,
            is_auto: true,
            assigned_driver: None,
            tombstoned: false,
            purge_at: None,
            created_at: now,
        };
        self.orders.insert(receipt.clone(), order);
        self.total_orders_created += 1;
        // One dish counted per order creation, same as the speculative path.
        if let EntityRef::Known { id, .. } = restaurant {
            if let Some(restaurant) = self.restaurants.get_mut(&id) {
                restaurant.total_dishes += 1;
            }
        }
        info!(%receipt, "auto order created");
        IngestOutcome::Applied
    }

    fn on_preparing(&mut self, event: &OrderEvent, now: Instant) -> IngestOutcome {
        let Some(order) = self.live_order_mut(&event.receipt, OrderEventKind::Preparing) else {
            return IngestOutcome::Ignored;
        };
        // A re-delivered preparing event must not restart the clock.
        if order.start_time.is_none() {
            order.start_time = Some(now);
            order.elapsed_time = 0.0;
            order.progress = 0.0;
            debug!(receipt = %event.receipt, "preparation timer started");
        } else {
            debug!(receipt = %event.receipt, "timer already running, left untouched");
        }
        order.status = OrderStatus::Preparing;
        if let Some(prep) = event.prep_time_seconds() {
            order.total_time = prep;
        }
        let restaurant = order.restaurant.id();
        if let Some(id) = restaurant {
            if let Some(restaurant) = self.restaurants.get_mut(&id) {
                restaurant.pending_dishes += 1;
            }
        }
        IngestOutcome::Applied
    }

    fn on_ready(&mut self, event: &OrderEvent) -> IngestOutcome {
        let Some(order) = self.live_order_mut(&event.receipt, OrderEventKind::Ready) else {
            return IngestOutcome::Ignored;
        };
        order.status = OrderStatus::Ready;
        order.progress = 100.0;
        order.start_time = None;
        let restaurant = order.restaurant.id();
        if let Some(id) = restaurant {
            if let Some(restaurant) = self.restaurants.get_mut(&id) {
                // Floor at zero: a ready event can arrive without a matching
                // preparing event.
                restaurant.pending_dishes = restaurant.pending_dishes.saturating_sub(1);
            }
        }
        IngestOutcome::Applied
    }

    fn on_driver_assigned(&mut self, event: &OrderEvent) -> IngestOutcome {
        let driver = event.driver.as_deref().and_then(driver_index);
        if driver.is_none() {
            warn!(name = ?event.driver, "could not resolve driver id from name");
        }
        let Some(order) = self.live_order_mut(&event.receipt, OrderEventKind::DriverAssigned)
        else {
            return IngestOutcome::Ignored;
        };
        if driver.is_some() {
            order.assigned_driver = driver;
        }
        order.status = OrderStatus::Assigned;
        order.progress = 100.0;
        info!(receipt = %event.receipt, ?driver, "driver assigned");
        IngestOutcome::Applied
    }

    fn on_picked_up(&mut self, event: &OrderEvent) -> IngestOutcome {
        let Some(order) = self.live_order_mut(&event.receipt, OrderEventKind::PickedUp) else {
            return IngestOutcome::Ignored;
        };
        order.status = OrderStatus::InTransit;
        order.progress = 100.0;
        IngestOutcome::Applied
    }

    fn on_delivered(&mut self, event: &OrderEvent, now: Instant) -> IngestOutcome {
        let grace = self.config.delivered_purge_grace;
        let Some(order) = self.live_order_mut(&event.receipt, OrderEventKind::Delivered) else {
            return IngestOutcome::Ignored;
        };
        order.status = OrderStatus::Delivered;
        order.progress = 100.0;
        order.start_time = None;
        order.tombstoned = true;
        order.purge_at = Some(now + grace);
        info!(receipt = %event.receipt, "order delivered, tombstoned until purge");
        IngestOutcome::Applied
    }

    fn on_cancelled(&mut self, event: &OrderEvent, now: Instant) -> IngestOutcome {
        let grace = self.config.cancelled_purge_grace;
        let Some(order) = self.live_order_mut(&event.receipt, OrderEventKind::Cancelled) else {
            return IngestOutcome::Ignored;
        };
        order.status = OrderStatus::Cancelled;
        order.start_time = None;
        order.tombstoned = true;
        order.purge_at = Some(now + grace);
        let driver = order.assigned_driver.take();
        if let Some(id) = driver {
            self.routes.remove(&id);
        }
        info!(receipt = %event.receipt, "order cancelled");
        IngestOutcome::Applied
    }

    /// Mutable access to a non-tombstoned order, with the transition check
    /// applied. Logs and returns `None` for unknown receipts and unhandled
    /// (state, event) pairs.
    fn live_order_mut(&mut self, receipt: &str, event: OrderEventKind) -> Option<&mut Order> {
        let Some(order) = self.orders.get_mut(receipt) else {
            warn!(%receipt, ?event, "event for unknown order ignored");
            return None;
        };
        if order.tombstoned {
            debug!(%receipt, ?event, "event for tombstoned order ignored");
            return None;
        }
        if next_status(order.status, event).is_none() {
            warn!(
                %receipt,
                state = %order.status,
                ?event,
                "unhandled transition ignored"
            );
            return None;
        }
        Some(order)
    }

    fn auto_dish_names(&self, seed: &crate::state::AutoOrderSeed) -> Vec<String> {
        if let Some(menu) = self.menus.get(&seed.restaurant_id) {
            if !seed.dish_ids.is_empty() {
                return seed
                    .dish_ids
                    .iter()
                    .map(|id| {
                        menu.iter()
                            .find(|dish| dish.id == *id)
                            .map(|dish| dish.name.clone())
                            .unwrap_or_else(|| format!("dish {id}"))
                    })
                    .collect();
            }
        }
        vec![format!("{} dish(es)", seed.dish_ids.len())]
    }

    fn record_history(&mut self, event: &OrderEvent) {
        let label = match event.kind {
            OrderEventKind::Created => "order created",
            OrderEventKind::Preparing => "preparing order",
            OrderEventKind::Ready => "order ready",
            OrderEventKind::DriverAssigned => "driver assigned",
            OrderEventKind::PickedUp => "order picked up",
            OrderEventKind::Delivered => "order delivered",
            OrderEventKind::Cancelled => "order cancelled",
            OrderEventKind::CancelRejected => "cancellation rejected",
            _ => "event",
        };
        let mut line = format!("{label}: {}", event.receipt);
        if let Some(driver) = &event.driver {
            line.push_str(&format!(" ({driver})"));
        }
        if let Some(prep) = event.prep_time_seconds() {
            line.push_str(&format!(" [{prep}s]"));
        }
        self.history.push(line);
    }
}

fn notices_for(event: &OrderEvent) -> Vec<Notice> {
    let receipt = &event.receipt;
    let driver = event.driver.as_deref().unwrap_or("a driver");
    let notice = match event.kind {
        OrderEventKind::Created => Notice::new(
            NoticeLevel::Info,
            "Order created",
            format!("{receipt} queued"),
        ),
        OrderEventKind::Preparing => Notice::new(
            NoticeLevel::Info,
            "Preparing",
            format!("preparing {receipt}"),
        ),
        OrderEventKind::Ready => Notice::new(
            NoticeLevel::Success,
            "Order ready",
            format!("{receipt} is ready for pickup"),
        ),
        OrderEventKind::DriverAssigned => Notice::new(
            NoticeLevel::Info,
            "Driver assigned",
            format!("{driver} will deliver {receipt}"),
        ),
        OrderEventKind::PickedUp => Notice::new(
            NoticeLevel::Info,
            "On the way",
            format!("{driver} is delivering {receipt}"),
        ),
        OrderEventKind::Delivered => Notice::new(
            NoticeLevel::Success,
            "Delivered",
            format!("{receipt} was delivered"),
        ),
        OrderEventKind::Cancelled => Notice::new(
            NoticeLevel::Success,
            "Order cancelled",
            format!("{receipt} was cancelled"),
        ),
        OrderEventKind::CancelRejected => Notice::new(
            NoticeLevel::Error,
            "Cannot cancel",
            "the order is already out for delivery",
        ),
        _ => return Vec::new(),
    };
    vec![notice]
}
