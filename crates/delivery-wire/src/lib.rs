//! # Delivery Wire Protocol
//!
//! Types for the line-delimited JSON feed emitted by the embedded delivery
//! controller, and for the plain-text commands sent back to it.
//!
//! The controller streams one JSON object per line, each carrying a `type`
//! discriminator (`restaurante`, `casa`, `mov`, `event`, `metrics`, ...).
//! [`ControllerMessage::decode`] turns a raw feed line into a typed message;
//! anything that is not a JSON object of a known shape is rejected at this
//! boundary so nothing half-parsed ever reaches the engine.
//!
//! Durations cross the wire as decimal strings (the controller formats floats
//! itself); [`lenient_seconds`] reproduces the tolerant parse the dashboard
//! has always used — an unparsable value reads as zero, never an error.
//!
//! The outbound direction is [`Command`], rendered with `Display` into the
//! controller's comma-separated command grammar.

pub mod command;
pub mod error;
pub mod message;

pub use command::Command;
pub use error::DecodeError;
pub use message::{
    lenient_seconds, AutoOrderDetails, AutoOrderRequest, ControllerMessage, DriverMovement,
    DriverPlacement, DriverState, GlobalMetrics, HistoryItem, HistoryPayload, LoadState, LogLine,
    MapHeader, MenuEntry, OrderEvent, OrderEventKind, RestaurantStatus, SitePlacement,
    TimingBreakdown,
};
