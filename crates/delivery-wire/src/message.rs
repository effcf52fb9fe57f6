//! Inbound controller message schema.
//!
//! One enum variant per `type` tag the controller emits. Field names follow
//! the wire (the controller speaks Spanish); the Rust side renames them to
//! what they mean. Unknown tags decode to [`ControllerMessage::Unsupported`]
//! so new controller firmware never breaks ingestion.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};

/// Parses a controller-formatted duration. The controller prints floats as
/// decimal strings; garbage reads as zero, matching the dashboard's historic
/// tolerance for half-written serial lines.
pub fn lenient_seconds(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

/// A single decoded feed line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ControllerMessage {
    /// Restaurant placed on the map.
    #[serde(rename = "restaurante")]
    Restaurant(SitePlacement),
    /// House placed on the map.
    #[serde(rename = "casa")]
    House(SitePlacement),
    /// Driver placed on the map.
    #[serde(rename = "repartidor")]
    Driver(DriverPlacement),
    /// One dish added to a restaurant's catalog.
    #[serde(rename = "menu")]
    Menu(MenuEntry),
    /// Controller-asserted restaurant load state.
    #[serde(rename = "restaurant_status")]
    RestaurantStatus(RestaurantStatus),
    /// Driver position/state update.
    #[serde(rename = "mov")]
    DriverMoved(DriverMovement),
    /// Order lifecycle event.
    #[serde(rename = "event")]
    OrderEvent(OrderEvent),
    /// Controller-initiated order; the dashboard must echo the order command.
    #[serde(rename = "auto_order_request")]
    AutoOrderRequest(AutoOrderRequest),
    /// Late-arriving entity references for an auto order.
    #[serde(rename = "auto_order")]
    AutoOrder(AutoOrderDetails),
    /// Per-order timing breakdown, sent after delivery.
    #[serde(rename = "metrics")]
    Metrics(TimingBreakdown),
    /// Aggregate statistics computed on the controller.
    #[serde(rename = "global_metrics")]
    GlobalMetrics(GlobalMetrics),
    /// Event-history entry or full replacement list.
    #[serde(rename = "history")]
    History(HistoryPayload),
    /// New map header; precedes the entity placement burst.
    #[serde(rename = "map")]
    Map(MapHeader),
    /// Full regeneration signal.
    #[serde(rename = "regenerate")]
    Regenerate,
    /// Explicit reset signal.
    #[serde(rename = "system_reset")]
    SystemReset,
    #[serde(rename = "info")]
    Info(LogLine),
    #[serde(rename = "warning")]
    Warning(LogLine),
    #[serde(rename = "error")]
    Error(LogLine),
    #[serde(rename = "success")]
    Success(LogLine),
    /// Anything the dashboard does not consume (`stats`, `ruta`, ...).
    #[serde(other)]
    Unsupported,
}

impl ControllerMessage {
    /// Decodes one raw feed line.
    ///
    /// Non-JSON lines (the controller also prints `MAPA:` ASCII art and bare
    /// log text) are rejected here; callers drop them without touching any
    /// state.
    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        let text = line.trim();
        if text.is_empty() {
            return Err(DecodeError::Empty);
        }
        if !text.starts_with('{') {
            return Err(DecodeError::NotJson);
        }
        serde_json::from_str(text).map_err(DecodeError::Json)
    }
}

/// Grid placement shared by restaurants and houses.
#[derive(Debug, Clone, Deserialize)]
pub struct SitePlacement {
    pub id: u32,
    pub av: u32,
    pub ca: u32,
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverPlacement {
    pub id: u32,
    #[serde(rename = "nombre")]
    pub name: String,
    pub av: u32,
    pub ca: u32,
    #[serde(rename = "vel", default)]
    pub speed: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuEntry {
    #[serde(rename = "restaurantId")]
    pub restaurant_id: u32,
    #[serde(rename = "dishId")]
    pub dish_id: u32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "tiempo")]
    pub prep_time: String,
}

impl MenuEntry {
    pub fn prep_time_seconds(&self) -> f64 {
        lenient_seconds(&self.prep_time)
    }
}

/// Kitchen load state, asserted by the controller's scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LoadState {
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "CARGADO")]
    Loaded,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantStatus {
    pub id: u32,
    pub status: LoadState,
}

/// Driver activity as reported alongside every movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum DriverState {
    #[serde(rename = "DESOCUPADO")]
    Idle,
    #[serde(rename = "EN_CAMINO_A_RESTAURANTE")]
    ToRestaurant,
    #[serde(rename = "RECOGIENDO")]
    PickingUp,
    #[serde(rename = "EN_CAMINO_A_DESTINO")]
    ToDestination,
    #[serde(rename = "ENTREGANDO")]
    Delivering,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverMovement {
    #[serde(rename = "rep")]
    pub driver_id: u32,
    pub av: u32,
    pub ca: u32,
    #[serde(rename = "estado", default)]
    pub state: Option<DriverState>,
}

/// The order-lifecycle event alphabet.
///
/// `SystemReset`/`Regenerate` are reset signals that ride the same channel;
/// anything newer firmware invents lands on `Unknown` and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum OrderEventKind {
    #[serde(rename = "ORDER_CREATED")]
    Created,
    #[serde(rename = "ORDER_PREPARING")]
    Preparing,
    #[serde(rename = "ORDER_READY")]
    Ready,
    #[serde(rename = "DRIVER_ASSIGNED")]
    DriverAssigned,
    #[serde(rename = "DRIVER_PICKED_UP")]
    PickedUp,
    #[serde(rename = "DELIVERED")]
    Delivered,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "CANCEL_REJECTED")]
    CancelRejected,
    #[serde(rename = "SYSTEM_RESET")]
    SystemReset,
    #[serde(rename = "REGENERATE")]
    Regenerate,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderEvent {
    #[serde(rename = "ev")]
    pub kind: OrderEventKind,
    #[serde(rename = "order")]
    pub receipt: String,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(rename = "prepTime", default)]
    pub prep_time: Option<String>,
}

impl OrderEvent {
    /// Preparation time in seconds, when present and parsable.
    pub fn prep_time_seconds(&self) -> Option<f64> {
        self.prep_time
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoOrderRequest {
    #[serde(rename = "restId")]
    pub restaurant_id: u32,
    #[serde(rename = "destId")]
    pub house_id: u32,
    /// Comma-joined dish ids, e.g. `"1,4,2"`.
    pub dishes: String,
}

impl AutoOrderRequest {
    pub fn dish_ids(&self) -> Vec<u32> {
        self.dishes
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoOrderDetails {
    #[serde(rename = "order")]
    pub receipt: String,
    #[serde(rename = "restId")]
    pub restaurant_id: u32,
    #[serde(rename = "destId")]
    pub house_id: u32,
    /// Dish count (the controller does not re-send the selection).
    #[serde(default)]
    pub dishes: Option<u32>,
}

/// Per-order timing breakdown. All durations arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingBreakdown {
    #[serde(rename = "order")]
    pub receipt: String,
    #[serde(default)]
    pub t_queue_kitchen: String,
    #[serde(default)]
    pub t_prep: String,
    #[serde(default)]
    pub t_wait_driver: String,
    #[serde(default)]
    pub t_drive: String,
    #[serde(default)]
    pub t_total: String,
}

impl TimingBreakdown {
    pub fn queue_seconds(&self) -> f64 {
        lenient_seconds(&self.t_queue_kitchen)
    }

    pub fn prep_seconds(&self) -> f64 {
        lenient_seconds(&self.t_prep)
    }

    pub fn driver_wait_seconds(&self) -> f64 {
        lenient_seconds(&self.t_wait_driver)
    }

    pub fn drive_seconds(&self) -> f64 {
        lenient_seconds(&self.t_drive)
    }

    pub fn total_seconds(&self) -> f64 {
        lenient_seconds(&self.t_total)
    }
}

/// Aggregate statistics the controller computes over delivered orders.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalMetrics {
    #[serde(default)]
    pub avg_total: String,
    #[serde(default)]
    pub avg_prep: String,
    #[serde(default)]
    pub avg_wait: String,
    #[serde(default)]
    pub avg_delivery: String,
    #[serde(default)]
    pub p50_total: String,
    #[serde(default)]
    pub p95_total: String,
    #[serde(default)]
    pub p50_prep: String,
    #[serde(default)]
    pub p95_prep: String,
    #[serde(default)]
    pub analyzed: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryItem {
    #[serde(default)]
    pub ts: Option<u64>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Either a single history entry (`ts` + `msg`) or a full replacement list.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryPayload {
    #[serde(default)]
    pub ts: Option<u64>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<HistoryItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapHeader {
    #[serde(rename = "calles")]
    pub streets: u32,
    #[serde(rename = "avenidas")]
    pub avenues: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogLine {
    #[serde(default)]
    pub msg: String,
}
