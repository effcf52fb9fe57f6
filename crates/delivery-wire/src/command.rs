//! Outbound command encoding.
//!
//! Commands are plain comma-separated text, terminated by the transport.
//! They are fire-and-forget: the only acknowledgment is whatever events the
//! controller streams back afterwards.

use std::fmt;

/// A command for the controller's serial command parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PEDIDO_WEB,<restaurantId>,<houseId>,<dishId>[,<dishId>...]`
    PlaceOrder {
        restaurant_id: u32,
        house_id: u32,
        dish_ids: Vec<u32>,
    },
    /// `CANCELAR_PEDIDO,<receiptNumber>`
    CancelOrder { receipt: String },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PlaceOrder {
                restaurant_id,
                house_id,
                dish_ids,
            } => {
                write!(f, "PEDIDO_WEB,{restaurant_id},{house_id}")?;
                for dish in dish_ids {
                    write!(f, ",{dish}")?;
                }
                Ok(())
            }
            Command::CancelOrder { receipt } => write!(f, "CANCELAR_PEDIDO,{receipt}"),
        }
    }
}
