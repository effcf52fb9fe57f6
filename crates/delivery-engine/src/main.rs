//! Scripted demo: drives the engine through a full order lifecycle the way
//! the dashboard would, with the controller side played back from canned
//! feed lines. Run with `RUST_LOG=info cargo run`.

use async_trait::async_trait;
use delivery_engine::collaborators::{CommandPort, CommandPortError, EnginePorts};
use delivery_engine::model::OrderRequest;
use delivery_engine::system::{setup_tracing, TrackerSystem};
use delivery_engine::wire::Command;
use std::sync::Arc;
use tracing::info;

/// Command port that logs what would go down the serial line.
struct LoggingCommandPort;

#[async_trait]
impl CommandPort for LoggingCommandPort {
    async fn send(&self, command: Command) -> Result<(), CommandPortError> {
        info!(%command, "TX to controller");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();
    info!("starting delivery tracker demo");

    let ports = EnginePorts::default().with_commands(Arc::new(LoggingCommandPort));
    let system = TrackerSystem::start(ports);
    let client = system.client.clone();

    // The controller announces the city.
    let city = [
        r#"{"type":"map","calles":15,"avenidas":15}"#,
        r#"{"type":"restaurante","id":1,"av":3,"ca":7,"dir":"U"}"#,
        r#"{"type":"casa","id":3,"av":9,"ca":2,"dir":"u"}"#,
        r#"{"type":"repartidor","id":2,"nombre":"repartidor 3","av":1,"ca":1,"vel":2}"#,
        r#"{"type":"menu","restaurantId":1,"dishId":10,"nombre":"Tacos","tiempo":"6.0"}"#,
        r#"{"type":"menu","restaurantId":1,"dishId":11,"nombre":"Ramen","tiempo":"6.5"}"#,
    ];
    for line in city {
        client.ingest_line(line).await.map_err(|e| e.to_string())?;
    }

    // Place a local order; it exists speculatively until the controller
    // confirms it under a real receipt.
    let token = client
        .place_order(OrderRequest {
            restaurant_id: 1,
            house_id: 3,
            dish_ids: vec![10, 11],
        })
        .await
        .map_err(|e| e.to_string())?;
    info!(%token, "order placed, awaiting confirmation");

    // The controller confirms and walks the order through its lifecycle.
    let lifecycle = [
        r#"{"type":"event","ev":"ORDER_CREATED","order":"A-100","prepTime":"12.5"}"#,
        r#"{"type":"event","ev":"ORDER_PREPARING","order":"A-100","prepTime":"12.5"}"#,
        r#"{"type":"event","ev":"ORDER_READY","order":"A-100"}"#,
        r#"{"type":"event","ev":"DRIVER_ASSIGNED","order":"A-100","driver":"repartidor 3"}"#,
        r#"{"type":"mov","rep":2,"av":2,"ca":4,"estado":"EN_CAMINO_A_DESTINO"}"#,
        r#"{"type":"event","ev":"DRIVER_PICKED_UP","order":"A-100","driver":"repartidor 3"}"#,
        r#"{"type":"event","ev":"DELIVERED","order":"A-100"}"#,
        r#"{"type":"metrics","order":"A-100","t_queue_kitchen":"1.20","t_prep":"12.50","t_wait_driver":"2.10","t_drive":"7.40","t_total":"23.20"}"#,
    ];
    for line in lifecycle {
        client.ingest_line(line).await.map_err(|e| e.to_string())?;
    }

    let snapshot = client.snapshot().await.map_err(|e| e.to_string())?;
    info!(
        orders = snapshot.orders.len(),
        total_created = snapshot.total_orders_created,
        in_circulation = snapshot.in_circulation,
        "world after the scenario"
    );
    for order in &snapshot.orders {
        info!(
            receipt = %order.receipt,
            status = %order.status_label,
            tombstoned = order.tombstoned,
            "order"
        );
    }

    let report = client.metrics().await.map_err(|e| e.to_string())?;
    info!(
        records = report.records.len(),
        avg_total = report.breakdown.total.avg,
        "metrics"
    );
    for row in &report.scoreboard {
        info!(driver = row.driver_id, score = row.score, "scoreboard");
    }

    system.shutdown().await
}
