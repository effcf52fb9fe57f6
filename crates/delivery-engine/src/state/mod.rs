//! # Engine State
//!
//! The single mutable context behind the engine: every registry, counter,
//! correlation slot, and derived collection lives here, with an explicit
//! `new`/`reset` lifecycle. Nothing in this crate keeps module-level state.
//!
//! All operations take an explicit `now`, which keeps the whole state machine
//! synchronously testable — the actor in [`crate::engine`] is a thin shell
//! that stamps the clock and forwards collaborator effects.
//!
//! # Registry shape
//!
//! Each entity type is one keyed map. Deleting an order removes its key
//! directly; there is no positional storage and no secondary index to
//! rebuild, so a consumer can never observe a half-updated index. Order
//! deletion is two-phase: `tombstoned` flips synchronously, the entry
//! disappears on the first timer tick past `purge_at`.

pub mod dedup;
pub mod history;
pub mod lifecycle;
pub mod metrics;

pub use dedup::DedupGate;
pub use history::{HistoryEntry, HistoryLog};
pub use lifecycle::next_status;
pub use metrics::{
    nearest_rank_floor, BreakdownStats, ControllerStats, DriverScore, EntityAverage, FieldStats,
    HouseDelivery, MetricsAggregator, MetricsRecord, MetricsReport,
};

use crate::collaborators::Notice;
use crate::config::EngineConfig;
use crate::engine::EngineError;
use crate::model::{
    CorrelationToken, Dish, Driver, DriverRoute, EntityRef, GridPos, GridSize, House, Order,
    OrderRequest, OrderStatus, Restaurant, RouteObjective,
};
use crate::view::{DriverView, OrderView, WorldSnapshot};
use delivery_wire::{lenient_seconds, Command, ControllerMessage, DriverState};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What ingesting one message did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The message was applied.
    Applied,
    /// Dropped by the dedup gate.
    Duplicate,
    /// Accepted but a no-op (unknown entity, unhandled transition, or a
    /// message the engine does not consume).
    Ignored,
    /// The message triggered the hard reset.
    Reset,
}

/// Correlation record for a controller-initiated order, consumed by the next
/// confirming `ORDER_CREATED`.
#[derive(Debug, Clone)]
pub struct AutoOrderSeed {
    pub restaurant_id: u32,
    pub house_id: u32,
    pub dish_ids: Vec<u32>,
}

#[derive(Debug)]
struct AutoOrderContext {
    seed: AutoOrderSeed,
    created_at: Instant,
}

/// Ticket held for a speculative order awaiting confirmation. Consumed
/// oldest-first; stale tickets are pruned by the timer.
#[derive(Debug)]
struct SpeculativeTicket {
    receipt: String,
    created_at: Instant,
}

/// Side effect a message asks the actor to perform before committing.
#[derive(Debug)]
pub enum FollowUp {
    /// An `auto_order_request` must be echoed to the controller; the seed is
    /// committed as the pending correlation record only if the send works.
    DispatchAutoOrder { command: Command, seed: AutoOrderSeed },
}

/// Result of ingesting one message.
#[derive(Debug)]
pub struct IngestReport {
    pub outcome: IngestOutcome,
    pub notices: Vec<Notice>,
    pub follow_up: Option<FollowUp>,
}

impl IngestReport {
    pub(crate) fn applied() -> Self {
        Self::with_outcome(IngestOutcome::Applied)
    }

    pub(crate) fn duplicate() -> Self {
        Self::with_outcome(IngestOutcome::Duplicate)
    }

    pub(crate) fn ignored() -> Self {
        Self::with_outcome(IngestOutcome::Ignored)
    }

    pub(crate) fn reset() -> Self {
        Self::with_outcome(IngestOutcome::Reset)
    }

    pub(crate) fn with_outcome(outcome: IngestOutcome) -> Self {
        Self {
            outcome,
            notices: Vec::new(),
            follow_up: None,
        }
    }

    /// Whether consumers should receive a fresh snapshot.
    pub fn state_changed(&self) -> bool {
        matches!(self.outcome, IngestOutcome::Applied | IngestOutcome::Reset)
    }
}

/// The engine's whole world. See the module docs.
pub struct EngineState {
    config: EngineConfig,
    orders: HashMap<String, Order>,
    drivers: HashMap<u32, Driver>,
    restaurants: HashMap<u32, Restaurant>,
    houses: HashMap<u32, House>,
    menus: HashMap<u32, Vec<Dish>>,
    routes: HashMap<u32, DriverRoute>,
    dedup: DedupGate,
    tickets: VecDeque<SpeculativeTicket>,
    pending_auto: Option<AutoOrderContext>,
    metrics: MetricsAggregator,
    history: HistoryLog,
    controller_stats: Option<ControllerStats>,
    grid: Option<GridSize>,
    next_temp_id: u64,
    total_orders_created: u64,
}

impl EngineState {
    pub fn new(config: EngineConfig) -> Self {
        let dedup = DedupGate::new(config.duplicate_window);
        let history = HistoryLog::new(config.history_capacity);
        Self {
            config,
            orders: HashMap::new(),
            drivers: HashMap::new(),
            restaurants: HashMap::new(),
            houses: HashMap::new(),
            menus: HashMap::new(),
            routes: HashMap::new(),
            dedup,
            tickets: VecDeque::new(),
            pending_auto: None,
            metrics: MetricsAggregator::new(),
            history,
            controller_stats: None,
            grid: None,
            next_temp_id: 1,
            total_orders_created: 0,
        }
    }

    /// The hard reset: clears every registry and counter, discards pending
    /// purges, tickets, and the auto-order context. The one unconditional
    /// operation in the engine.
    pub fn reset(&mut self) {
        self.orders.clear();
        self.drivers.clear();
        self.restaurants.clear();
        self.houses.clear();
        self.menus.clear();
        self.routes.clear();
        self.dedup.clear();
        self.tickets.clear();
        self.pending_auto = None;
        self.metrics.clear();
        self.history.clear();
        self.controller_stats = None;
        self.grid = None;
        self.next_temp_id = 1;
        self.total_orders_created = 0;
        info!("engine state reset");
    }

    /// Applies one decoded controller message.
    pub fn handle_message(&mut self, message: &ControllerMessage, now: Instant) -> IngestReport {
        match message {
            ControllerMessage::Restaurant(site) => {
                let pos = GridPos {
                    av: site.av,
                    ca: site.ca,
                };
                let orientation = site.dir.clone().unwrap_or_else(|| "U".to_string());
                self.restaurants
                    .insert(site.id, Restaurant::new(site.id, pos, orientation));
                debug!(id = site.id, "restaurant registered");
                IngestReport::applied()
            }
            ControllerMessage::House(site) => {
                let pos = GridPos {
                    av: site.av,
                    ca: site.ca,
                };
                self.houses.insert(
                    site.id,
                    House {
                        id: site.id,
                        pos,
                        orientation: site.dir.clone().unwrap_or_else(|| "u".to_string()),
                    },
                );
                debug!(id = site.id, "house registered");
                IngestReport::applied()
            }
            ControllerMessage::Driver(placement) => {
                self.drivers.insert(
                    placement.id,
                    Driver {
                        id: placement.id,
                        name: placement.name.clone(),
                        pos: GridPos {
                            av: placement.av,
                            ca: placement.ca,
                        },
                        state: DriverState::Idle,
                    },
                );
                debug!(id = placement.id, "driver registered");
                IngestReport::applied()
            }
            ControllerMessage::Menu(entry) => {
                self.menus.entry(entry.restaurant_id).or_default().push(Dish {
                    id: entry.dish_id,
                    name: entry.name.clone(),
                    prep_time: entry.prep_time_seconds(),
                });
                IngestReport::applied()
            }
            ControllerMessage::RestaurantStatus(status) => {
                match self.restaurants.get_mut(&status.id) {
                    Some(restaurant) => {
                        restaurant.load_state = status.status;
                        IngestReport::applied()
                    }
                    None => {
                        warn!(id = status.id, "load state for unknown restaurant");
                        IngestReport::ignored()
                    }
                }
            }
            ControllerMessage::DriverMoved(movement) => {
                self.apply_driver_movement(movement);
                IngestReport::applied()
            }
            ControllerMessage::OrderEvent(event) => self.apply_order_event(event, now),
            ControllerMessage::AutoOrderRequest(request) => {
                if !self.restaurants.contains_key(&request.restaurant_id)
                    || !self.houses.contains_key(&request.house_id)
                {
                    warn!(
                        restaurant = request.restaurant_id,
                        house = request.house_id,
                        "auto order request references unknown entities"
                    );
                    return IngestReport::ignored();
                }
                let seed = AutoOrderSeed {
                    restaurant_id: request.restaurant_id,
                    house_id: request.house_id,
                    dish_ids: request.dish_ids(),
                };
                let command = Command::PlaceOrder {
                    restaurant_id: seed.restaurant_id,
                    house_id: seed.house_id,
                    dish_ids: seed.dish_ids.clone(),
                };
                let mut report = IngestReport::applied();
                report.follow_up = Some(FollowUp::DispatchAutoOrder { command, seed });
                report
            }
            ControllerMessage::AutoOrder(details) => self.complete_auto_order(details),
            ControllerMessage::Metrics(breakdown) => {
                let (driver_id, restaurant_id, house_id) = match self.orders.get(&breakdown.receipt)
                {
                    Some(order) => (
                        order.assigned_driver,
                        order.restaurant.id(),
                        order.destination.id(),
                    ),
                    None => (None, None, None),
                };
                self.metrics.record(MetricsRecord {
                    receipt: breakdown.receipt.clone(),
                    queue_time: breakdown.queue_seconds(),
                    prep_time: breakdown.prep_seconds(),
                    driver_wait_time: breakdown.driver_wait_seconds(),
                    drive_time: breakdown.drive_seconds(),
                    total_time: breakdown.total_seconds(),
                    driver_id,
                    restaurant_id,
                    house_id,
                });
                debug!(receipt = %breakdown.receipt, "metrics recorded");
                IngestReport::applied()
            }
            ControllerMessage::GlobalMetrics(stats) => {
                self.controller_stats = Some(ControllerStats {
                    avg_total: lenient_seconds(&stats.avg_total),
                    avg_prep: lenient_seconds(&stats.avg_prep),
                    avg_wait: lenient_seconds(&stats.avg_wait),
                    avg_delivery: lenient_seconds(&stats.avg_delivery),
                    p50_total: lenient_seconds(&stats.p50_total),
                    p95_total: lenient_seconds(&stats.p95_total),
                    p50_prep: lenient_seconds(&stats.p50_prep),
                    p95_prep: lenient_seconds(&stats.p95_prep),
                    analyzed: stats.analyzed,
                });
                IngestReport::applied()
            }
            ControllerMessage::History(payload) => {
                if let Some(items) = &payload.items {
                    self.history.replace(items.iter().filter_map(|item| {
                        match (item.ts, &item.msg) {
                            (Some(ts), Some(msg)) => Some(HistoryEntry {
                                ts_ms: ts,
                                message: msg.clone(),
                            }),
                            _ => None,
                        }
                    }));
                } else if let Some(msg) = &payload.msg {
                    match payload.ts {
                        Some(ts) => self.history.push_at(ts, msg.clone()),
                        None => self.history.push(msg.clone()),
                    }
                }
                IngestReport::applied()
            }
            ControllerMessage::Map(header) => {
                info!(
                    streets = header.streets,
                    avenues = header.avenues,
                    "new map announced"
                );
                self.reset();
                self.grid = Some(GridSize {
                    streets: header.streets,
                    avenues: header.avenues,
                });
                IngestReport::reset()
            }
            ControllerMessage::Regenerate | ControllerMessage::SystemReset => {
                info!("controller requested full reset");
                self.reset();
                IngestReport::reset()
            }
            ControllerMessage::Info(line)
            | ControllerMessage::Warning(line)
            | ControllerMessage::Error(line)
            | ControllerMessage::Success(line) => {
                self.history.push(line.msg.clone());
                IngestReport::applied()
            }
            ControllerMessage::Unsupported => {
                debug!("unsupported message type ignored");
                IngestReport::ignored()
            }
        }
    }

    /// Stages a speculative order and returns the command to dispatch plus
    /// the correlation token. Nothing is counted until
    /// [`EngineState::confirm_dispatch`]; a failed dispatch must call
    /// [`EngineState::discard_speculative`] so the order never lingers
    /// unconfirmable.
    pub fn create_speculative(
        &mut self,
        request: &OrderRequest,
        now: Instant,
    ) -> Result<(Command, CorrelationToken), EngineError> {
        if request.dish_ids.is_empty() {
            return Err(EngineError::InvalidRequest("no dishes selected".into()));
        }
        let restaurant = self
            .restaurants
            .get(&request.restaurant_id)
            .ok_or_else(|| EngineError::UnknownEntity {
                kind: "restaurant",
                id: request.restaurant_id.to_string(),
            })?;
        let house = self
            .houses
            .get(&request.house_id)
            .ok_or_else(|| EngineError::UnknownEntity {
                kind: "house",
                id: request.house_id.to_string(),
            })?;

        let mut dish_names = Vec::new();
        let mut total_time = 0.0;
        if let Some(menu) = self.menus.get(&request.restaurant_id) {
            for dish_id in &request.dish_ids {
                if let Some(dish) = menu.iter().find(|d| d.id == *dish_id) {
                    dish_names.push(dish.name.clone());
                    total_time += dish.prep_time;
                }
            }
        }
        if dish_names.is_empty() {
            dish_names.push(format!("{} dish(es)", request.dish_ids.len()));
        }

        let receipt = format!("TEMP-{}", self.next_temp_id);
        self.next_temp_id += 1;

        let order = Order {
            receipt: receipt.clone(),
            status: OrderStatus::SpeculativeQueued,
            progress: 0.0,
            restaurant: EntityRef::Known {
                id: restaurant.id,
                pos: restaurant.pos,
            },
            destination: EntityRef::Known {
                id: house.id,
                pos: house.pos,
            },
            dish_ids: request.dish_ids.clone(),
            dish_names,
            total_time,
            elapsed_time: 0.0,
            start_time: None,
            is_speculative: true,
            is_auto: false,
            assigned_driver: None,
            tombstoned: false,
            purge_at: None,
            created_at: now,
        };
        self.orders.insert(receipt.clone(), order);
        info!(%receipt, "speculative order staged");

        let command = Command::PlaceOrder {
            restaurant_id: request.restaurant_id,
            house_id: request.house_id,
            dish_ids: request.dish_ids.clone(),
        };
        Ok((command, CorrelationToken::new(receipt)))
    }

    /// Commits a speculative order once its command has left the process:
    /// registers the reconciliation ticket and advances the counters.
    pub fn confirm_dispatch(&mut self, token: &CorrelationToken, now: Instant) {
        self.tickets.push_back(SpeculativeTicket {
            receipt: token.receipt().to_string(),
            created_at: now,
        });
        self.total_orders_created += 1;
        if let Some(order) = self.orders.get(token.receipt()) {
            if let EntityRef::Known { id, .. } = order.restaurant {
                if let Some(restaurant) = self.restaurants.get_mut(&id) {
                    restaurant.total_dishes += 1;
                }
            }
        }
    }

    /// Rolls back a speculative order whose command never left the process.
    pub fn discard_speculative(&mut self, token: &CorrelationToken) {
        if self.orders.remove(token.receipt()).is_some() {
            warn!(receipt = %token, "speculative order rolled back, transport unavailable");
        }
    }

    /// Builds the cancel command for an existing order. The engine changes
    /// nothing here — cancellation is the controller's decision and comes
    /// back as `CANCELLED` or `CANCEL_REJECTED`.
    pub fn prepare_cancel(&self, receipt: &str) -> Result<Command, EngineError> {
        if !self.orders.contains_key(receipt) {
            return Err(EngineError::UnknownEntity {
                kind: "order",
                id: receipt.to_string(),
            });
        }
        Ok(Command::CancelOrder {
            receipt: receipt.to_string(),
        })
    }

    /// Stores the auto-order correlation record after its command was sent.
    /// The restaurant's dish counter is not touched here — it advances once
    /// when `ORDER_CREATED` materializes the order.
    pub fn commit_auto_order(&mut self, seed: AutoOrderSeed, now: Instant) {
        debug!(
            restaurant = seed.restaurant_id,
            house = seed.house_id,
            "auto order context stored"
        );
        self.pending_auto = Some(AutoOrderContext {
            seed,
            created_at: now,
        });
    }

    /// One progress-timer tick: refresh elapsed/progress for preparing
    /// orders, purge due tombstones, prune stale reconciliation tickets.
    /// Returns whether anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;

        for order in self.orders.values_mut() {
            if order.tombstoned || order.status != OrderStatus::Preparing {
                continue;
            }
            if let Some(start) = order.start_time {
                order.elapsed_time = now.duration_since(start).as_secs_f64();
                order.progress = (order.elapsed_time / order.total_time * 100.0).min(100.0);
                changed = true;
            }
        }

        let due: Vec<String> = self
            .orders
            .iter()
            .filter(|(_, order)| order.purge_at.is_some_and(|at| at <= now))
            .map(|(receipt, _)| receipt.clone())
            .collect();
        for receipt in due {
            if let Some(order) = self.orders.remove(&receipt) {
                if let Some(driver) = order.assigned_driver {
                    self.routes.remove(&driver);
                }
                self.dedup.forget(&receipt);
                debug!(%receipt, "order purged");
                changed = true;
            }
        }

        while let Some(front) = self.tickets.front() {
            if now.duration_since(front.created_at) >= self.config.reconcile_window {
                self.tickets.pop_front();
            } else {
                break;
            }
        }

        changed
    }

    /// Builds the presentation snapshot consumers receive.
    pub fn snapshot(&self) -> WorldSnapshot {
        let mut orders: Vec<&Order> = self.orders.values().collect();
        orders.sort_by_key(|order| order.created_at);
        let order_views: Vec<OrderView> = orders
            .iter()
            .map(|order| OrderView {
                receipt: order.receipt.clone(),
                status: order.status,
                status_label: order.status_label(),
                progress: order.progress,
                restaurant: order.restaurant,
                destination: order.destination,
                dish_names: order.dish_names.clone(),
                total_time: order.total_time,
                elapsed_time: order.elapsed_time,
                remaining: order.remaining(),
                assigned_driver: order.assigned_driver,
                is_speculative: order.is_speculative,
                is_auto: order.is_auto,
                tombstoned: order.tombstoned,
            })
            .collect();

        let mut drivers: Vec<&Driver> = self.drivers.values().collect();
        drivers.sort_by_key(|driver| driver.id);
        let driver_views = drivers
            .into_iter()
            .map(|driver| DriverView {
                driver: driver.clone(),
                active_orders: order_views
                    .iter()
                    .filter(|o| o.assigned_driver == Some(driver.id) && !o.tombstoned)
                    .map(|o| o.receipt.clone())
                    .collect(),
            })
            .collect();

        let mut restaurants: Vec<Restaurant> = self.restaurants.values().cloned().collect();
        restaurants.sort_by_key(|r| r.id);
        let mut houses: Vec<House> = self.houses.values().cloned().collect();
        houses.sort_by_key(|h| h.id);

        let in_circulation = self.orders.values().filter(|o| !o.tombstoned).count();

        WorldSnapshot {
            orders: order_views,
            drivers: driver_views,
            restaurants,
            houses,
            routes: self
                .routes
                .iter()
                .map(|(&id, route)| (id, *route))
                .collect::<BTreeMap<_, _>>(),
            grid: self.grid,
            total_orders_created: self.total_orders_created,
            in_circulation,
            history: self.history.entries(),
        }
    }

    pub fn metrics_report(&self) -> MetricsReport {
        self.metrics.report(self.controller_stats)
    }

    // --- lookups, mostly for tests and the lifecycle module ---

    pub fn order(&self, receipt: &str) -> Option<&Order> {
        self.orders.get(receipt)
    }

    pub fn restaurant(&self, id: u32) -> Option<&Restaurant> {
        self.restaurants.get(&id)
    }

    pub fn driver(&self, id: u32) -> Option<&Driver> {
        self.drivers.get(&id)
    }

    pub fn route(&self, driver_id: u32) -> Option<&DriverRoute> {
        self.routes.get(&driver_id)
    }

    pub fn total_orders_created(&self) -> u64 {
        self.total_orders_created
    }

    fn apply_driver_movement(&mut self, movement: &delivery_wire::DriverMovement) {
        let pos = GridPos {
            av: movement.av,
            ca: movement.ca,
        };
        let driver = self
            .drivers
            .entry(movement.driver_id)
            .or_insert_with(|| Driver {
                id: movement.driver_id,
                name: format!("driver {}", movement.driver_id + 1),
                pos,
                state: DriverState::Idle,
            });
        driver.pos = pos;
        if let Some(state) = movement.state {
            driver.state = state;
        }

        match movement.state {
            Some(DriverState::ToRestaurant) | Some(DriverState::ToDestination) => {
                let objective = if movement.state == Some(DriverState::ToRestaurant) {
                    RouteObjective::Restaurant
                } else {
                    RouteObjective::Destination
                };
                let target = self
                    .orders
                    .values()
                    .filter(|order| {
                        order.assigned_driver == Some(movement.driver_id) && !order.tombstoned
                    })
                    .min_by_key(|order| order.created_at)
                    .and_then(|order| match objective {
                        RouteObjective::Restaurant => order.restaurant.pos(),
                        RouteObjective::Destination => order.destination.pos(),
                    });
                match target {
                    Some(to) => {
                        self.routes.insert(
                            movement.driver_id,
                            DriverRoute {
                                objective,
                                from: pos,
                                to,
                            },
                        );
                    }
                    None => {
                        self.routes.remove(&movement.driver_id);
                    }
                }
            }
            Some(_) => {
                self.routes.remove(&movement.driver_id);
            }
            None => {}
        }
    }

    pub(crate) fn take_auto_context(&mut self, now: Instant) -> Option<AutoOrderSeed> {
        let context = self.pending_auto.take()?;
        if now.duration_since(context.created_at) < self.config.auto_order_ttl {
            Some(context.seed)
        } else {
            debug!("auto order context expired");
            None
        }
    }

    fn complete_auto_order(&mut self, details: &delivery_wire::AutoOrderDetails) -> IngestReport {
        let restaurant = self.entity_ref_for_restaurant(details.restaurant_id);
        let destination = self.entity_ref_for_house(details.house_id);
        let Some(order) = self.orders.get_mut(&details.receipt) else {
            warn!(receipt = %details.receipt, "auto order completion for unknown order");
            return IngestReport::ignored();
        };
        order.restaurant = restaurant;
        order.destination = destination;
        if let Some(count) = details.dishes {
            order.dish_names = vec![format!("{count} dish(es)")];
        }
        info!(receipt = %details.receipt, "auto order completed");
        IngestReport::applied()
    }

    pub(crate) fn entity_ref_for_restaurant(&self, id: u32) -> EntityRef {
        match self.restaurants.get(&id) {
            Some(restaurant) => EntityRef::Known {
                id,
                pos: restaurant.pos,
            },
            None => {
                warn!(id, "restaurant not in registry, using placeholder");
                EntityRef::Unknown
            }
        }
    }

    pub(crate) fn entity_ref_for_house(&self, id: u32) -> EntityRef {
        match self.houses.get(&id) {
            Some(house) => EntityRef::Known { id, pos: house.pos },
            None => {
                warn!(id, "house not in registry, using placeholder");
                EntityRef::Unknown
            }
        }
    }
}
