//! State-level tests: drive `EngineState` synchronously with an explicit
//! clock. No actor, no timers, fully deterministic.

use delivery_engine::config::EngineConfig;
use delivery_engine::model::{driver_index, EntityRef, OrderRequest, OrderStatus};
use delivery_engine::state::{next_status, AutoOrderSeed, EngineState, IngestOutcome};
use delivery_engine::wire::{
    ControllerMessage, DriverMovement, DriverPlacement, DriverState, MenuEntry, OrderEvent,
    OrderEventKind, SitePlacement,
};
use std::time::Duration;
use tokio::time::Instant;

fn restaurant_msg(id: u32, av: u32, ca: u32) -> ControllerMessage {
    ControllerMessage::Restaurant(SitePlacement {
        id,
        av,
        ca,
        dir: Some("U".to_string()),
    })
}

fn house_msg(id: u32, av: u32, ca: u32) -> ControllerMessage {
    ControllerMessage::House(SitePlacement {
        id,
        av,
        ca,
        dir: Some("u".to_string()),
    })
}

fn menu_msg(restaurant_id: u32, dish_id: u32, name: &str, prep: &str) -> ControllerMessage {
    ControllerMessage::Menu(MenuEntry {
        restaurant_id,
        dish_id,
        name: name.to_string(),
        prep_time: prep.to_string(),
    })
}

fn event(
    kind: OrderEventKind,
    receipt: &str,
    driver: Option<&str>,
    prep_time: Option<&str>,
) -> ControllerMessage {
    ControllerMessage::OrderEvent(OrderEvent {
        kind,
        receipt: receipt.to_string(),
        driver: driver.map(str::to_string),
        prep_time: prep_time.map(str::to_string),
    })
}

/// A state seeded with one restaurant, one house, one driver, and a
/// two-dish menu.
fn city() -> (EngineState, Instant) {
    let mut state = EngineState::new(EngineConfig::default());
    let now = Instant::now();
    state.handle_message(&restaurant_msg(1, 3, 7), now);
    state.handle_message(&house_msg(3, 9, 2), now);
    state.handle_message(
        &ControllerMessage::Driver(DriverPlacement {
            id: 2,
            name: "repartidor 3".to_string(),
            av: 1,
            ca: 1,
            speed: Some(2),
        }),
        now,
    );
    state.handle_message(&menu_msg(1, 10, "Tacos", "6.0"), now);
    state.handle_message(&menu_msg(1, 11, "Ramen", "6.5"), now);
    (state, now)
}

/// Places a speculative order and confirms its dispatch, as the actor does
/// after a successful command send.
fn place_order(state: &mut EngineState, now: Instant) -> String {
    let request = OrderRequest {
        restaurant_id: 1,
        house_id: 3,
        dish_ids: vec![10, 11],
    };
    let (_, token) = state.create_speculative(&request, now).unwrap();
    state.confirm_dispatch(&token, now);
    token.receipt().to_string()
}

#[test]
fn transition_table_matches_lifecycle_chain() {
    use OrderEventKind as E;
    use OrderStatus as S;

    let allowed = [
        (S::Queued, E::Preparing, S::Preparing),
        (S::Preparing, E::Preparing, S::Preparing),
        (S::Queued, E::Ready, S::Ready),
        (S::Preparing, E::Ready, S::Ready),
        (S::Queued, E::DriverAssigned, S::Assigned),
        (S::Preparing, E::DriverAssigned, S::Assigned),
        (S::Ready, E::DriverAssigned, S::Assigned),
        (S::Ready, E::PickedUp, S::InTransit),
        (S::Assigned, E::PickedUp, S::InTransit),
        (S::Assigned, E::Delivered, S::Delivered),
        (S::InTransit, E::Delivered, S::Delivered),
        (S::SpeculativeQueued, E::Cancelled, S::Cancelled),
        (S::Queued, E::Cancelled, S::Cancelled),
        (S::Preparing, E::Cancelled, S::Cancelled),
        (S::Ready, E::Cancelled, S::Cancelled),
        (S::Assigned, E::Cancelled, S::Cancelled),
        (S::InTransit, E::Cancelled, S::Cancelled),
    ];
    for (from, ev, to) in allowed {
        assert_eq!(next_status(from, ev), Some(to), "{from:?} + {ev:?}");
    }

    let no_ops = [
        (S::Ready, E::Ready),
        (S::Ready, E::Preparing),
        (S::Queued, E::PickedUp),
        (S::Queued, E::Delivered),
        (S::Preparing, E::Delivered),
        (S::Delivered, E::Preparing),
        (S::Delivered, E::Cancelled),
        (S::Cancelled, E::Cancelled),
        (S::Cancelled, E::Delivered),
        (S::SpeculativeQueued, E::Preparing),
        (S::SpeculativeQueued, E::Ready),
        (S::InTransit, E::PickedUp),
    ];
    for (from, ev) in no_ops {
        assert_eq!(next_status(from, ev), None, "{from:?} + {ev:?}");
    }
}

#[test]
fn duplicate_events_inside_window_mutate_once() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(
        &event(OrderEventKind::Preparing, "A100", None, Some("12.5")),
        t0,
    );
    assert_eq!(state.restaurant(1).unwrap().pending_dishes, 1);

    // Same event 500ms later: suppressed, pending count unchanged.
    let outcome = state
        .handle_message(
            &event(OrderEventKind::Preparing, "A100", None, Some("12.5")),
            t0 + Duration::from_millis(500),
        )
        .outcome;
    assert_eq!(outcome, IngestOutcome::Duplicate);
    assert_eq!(state.restaurant(1).unwrap().pending_dishes, 1);

    // The window runs from the last *accepted* event, so after 1000ms the
    // same kind passes the gate again (and self-loops in the FSM).
    let outcome = state
        .handle_message(
            &event(OrderEventKind::Preparing, "A100", None, None),
            t0 + Duration::from_millis(1100),
        )
        .outcome;
    assert_eq!(outcome, IngestOutcome::Applied);
    assert_eq!(state.restaurant(1).unwrap().pending_dishes, 2);
}

#[test]
fn different_kinds_pass_the_gate_back_to_back() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    let a = state
        .handle_message(&event(OrderEventKind::Created, "A100", None, None), t0)
        .outcome;
    let b = state
        .handle_message(&event(OrderEventKind::Preparing, "A100", None, None), t0)
        .outcome;
    let c = state
        .handle_message(&event(OrderEventKind::Ready, "A100", None, None), t0)
        .outcome;
    assert_eq!(a, IngestOutcome::Applied);
    assert_eq!(b, IngestOutcome::Applied);
    assert_eq!(c, IngestOutcome::Applied);
}

#[test]
fn reconciliation_rewrites_identity_in_place() {
    let (mut state, t0) = city();
    let temp = place_order(&mut state, t0);
    assert_eq!(temp, "TEMP-1");
    assert_eq!(
        state.order("TEMP-1").unwrap().status,
        OrderStatus::SpeculativeQueued
    );
    assert_eq!(state.restaurant(1).unwrap().total_dishes, 1);

    let outcome = state
        .handle_message(
            &event(OrderEventKind::Created, "A100", None, None),
            t0 + Duration::from_millis(500),
        )
        .outcome;
    assert_eq!(outcome, IngestOutcome::Applied);

    assert!(state.order("TEMP-1").is_none());
    let order = state.order("A100").unwrap();
    assert_eq!(order.status, OrderStatus::Queued);
    assert!(!order.is_speculative);
    assert!(!order.is_auto);
    assert_eq!(order.dish_names, vec!["Tacos", "Ramen"]);
    assert_eq!(order.dish_ids, vec![10, 11]);
    assert_eq!(order.restaurant.id(), Some(1));
    assert_eq!(order.destination.id(), Some(3));
    assert_eq!(order.total_time, 12.5);
    assert_eq!(state.snapshot().orders.len(), 1, "no duplicate order");
    assert_eq!(state.total_orders_created(), 1);
}

#[test]
fn reconciliation_tickets_are_consumed_oldest_first() {
    let (mut state, t0) = city();
    let first = place_order(&mut state, t0);
    let second = place_order(&mut state, t0 + Duration::from_millis(100));
    assert_eq!((first.as_str(), second.as_str()), ("TEMP-1", "TEMP-2"));

    state.handle_message(
        &event(OrderEventKind::Created, "A100", None, None),
        t0 + Duration::from_millis(500),
    );
    state.handle_message(
        &event(OrderEventKind::Created, "A101", None, None),
        t0 + Duration::from_millis(600),
    );

    let a100 = state.order("A100").unwrap();
    let a101 = state.order("A101").unwrap();
    assert!(!a100.is_auto);
    assert!(!a101.is_auto);
    assert!(state.order("TEMP-1").is_none());
    assert!(state.order("TEMP-2").is_none());
    assert_eq!(state.snapshot().orders.len(), 2);
}

#[test]
fn expired_ticket_degrades_to_auto_order() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);

    // Confirmation lands after the reconcile window: the speculative order
    // stays put and the receipt becomes a placeholder auto order.
    state.handle_message(
        &event(OrderEventKind::Created, "A100", None, None),
        t0 + Duration::from_millis(2500),
    );

    assert!(state.order("TEMP-1").is_some());
    let auto = state.order("A100").unwrap();
    assert!(auto.is_auto);
    assert_eq!(auto.restaurant, EntityRef::Unknown);
    assert_eq!(auto.destination, EntityRef::Unknown);
    assert_eq!(auto.dish_names, vec!["auto order"]);
    assert_eq!(state.snapshot().orders.len(), 2);
}

#[test]
fn auto_order_uses_fresh_context() {
    let (mut state, t0) = city();
    state.commit_auto_order(
        AutoOrderSeed {
            restaurant_id: 1,
            house_id: 3,
            dish_ids: vec![10, 11],
        },
        t0,
    );
    // Nothing is counted at request time; the order does not exist yet.
    assert_eq!(state.restaurant(1).unwrap().total_dishes, 0);

    state.handle_message(
        &event(OrderEventKind::Created, "B200", None, Some("9.0")),
        t0 + Duration::from_millis(1000),
    );

    let order = state.order("B200").unwrap();
    assert!(order.is_auto);
    assert_eq!(order.restaurant.id(), Some(1));
    assert_eq!(order.destination.id(), Some(3));
    assert_eq!(order.dish_names, vec!["Tacos", "Ramen"]);
    assert_eq!(order.total_time, 9.0);
    assert_eq!(
        state.restaurant(1).unwrap().total_dishes,
        1,
        "counted exactly once, at creation"
    );
}

#[test]
fn stale_auto_context_degrades_to_placeholders() {
    let (mut state, t0) = city();
    state.commit_auto_order(
        AutoOrderSeed {
            restaurant_id: 1,
            house_id: 3,
            dish_ids: vec![10],
        },
        t0,
    );

    state.handle_message(
        &event(OrderEventKind::Created, "B201", None, None),
        t0 + Duration::from_millis(6000),
    );

    let order = state.order("B201").unwrap();
    assert_eq!(order.restaurant, EntityRef::Unknown);
    assert_eq!(order.destination, EntityRef::Unknown);
    assert_eq!(order.dish_names, vec!["auto order"]);
    // The request never produced an attributable order, so no dish was
    // counted against the restaurant.
    assert_eq!(state.restaurant(1).unwrap().total_dishes, 0);
}

#[test]
fn pending_dishes_never_go_negative() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(&event(OrderEventKind::Created, "A101", None, None), t0);
    assert_eq!(state.restaurant(1).unwrap().pending_dishes, 0);

    // Ready without a preceding Preparing: Queued → Ready is a legal skip,
    // and the decrement floors at zero.
    state.handle_message(&event(OrderEventKind::Ready, "A100", None, None), t0);
    assert_eq!(state.restaurant(1).unwrap().pending_dishes, 0);
    state.handle_message(&event(OrderEventKind::Ready, "A101", None, None), t0);
    assert_eq!(state.restaurant(1).unwrap().pending_dishes, 0);
}

#[test]
fn duplicate_preparing_does_not_restart_the_clock() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(
        &event(OrderEventKind::Preparing, "A100", None, Some("12.5")),
        t0,
    );

    state.tick(t0 + Duration::from_secs(5));
    assert_eq!(state.order("A100").unwrap().elapsed_time, 5.0);

    // A second preparing event past the dedup window is accepted but must
    // not reset the running timer.
    state.handle_message(
        &event(OrderEventKind::Preparing, "A100", None, Some("14.0")),
        t0 + Duration::from_secs(5),
    );
    let order = state.order("A100").unwrap();
    assert_eq!(order.total_time, 14.0, "total time still updates");

    state.tick(t0 + Duration::from_secs(6));
    assert_eq!(
        state.order("A100").unwrap().elapsed_time,
        6.0,
        "elapsed keeps counting from the original start"
    );
}

#[test]
fn tick_derives_progress_and_remaining() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(
        &event(OrderEventKind::Preparing, "A100", None, Some("10.0")),
        t0,
    );

    state.tick(t0 + Duration::from_millis(2500));
    let order = state.order("A100").unwrap();
    assert_eq!(order.elapsed_time, 2.5);
    assert_eq!(order.remaining(), 7.5);
    assert_eq!(order.progress, 25.0);
    assert_eq!(order.status, OrderStatus::Preparing, "tick never changes status");

    // Past the total time the bar pins at 100 and remaining floors at 0.
    state.tick(t0 + Duration::from_secs(60));
    let order = state.order("A100").unwrap();
    assert_eq!(order.progress, 100.0);
    assert_eq!(order.remaining(), 0.0);
}

#[test]
fn delivered_orders_tombstone_then_purge() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(&event(OrderEventKind::Ready, "A100", None, None), t0);
    state.handle_message(
        &event(
            OrderEventKind::DriverAssigned,
            "A100",
            Some("repartidor 3"),
            None,
        ),
        t0,
    );
    state.handle_message(&event(OrderEventKind::Delivered, "A100", None, None), t0);

    // Queryable immediately, flagged tombstoned.
    let order = state.order("A100").unwrap();
    assert!(order.tombstoned);
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(state.snapshot().in_circulation, 0);

    state.tick(t0 + Duration::from_millis(1999));
    assert!(state.order("A100").is_some(), "still queryable inside grace");

    state.tick(t0 + Duration::from_millis(2001));
    assert!(state.order("A100").is_none(), "purged after grace");
}

#[test]
fn tombstoned_orders_accept_no_further_events() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(&event(OrderEventKind::Cancelled, "A100", None, None), t0);
    assert!(state.order("A100").unwrap().tombstoned);

    let outcome = state
        .handle_message(
            &event(OrderEventKind::Preparing, "A100", None, None),
            t0 + Duration::from_secs(2),
        )
        .outcome;
    assert_eq!(outcome, IngestOutcome::Ignored);
    assert_eq!(state.order("A100").unwrap().status, OrderStatus::Cancelled);
}

#[test]
fn cancellation_releases_driver_assignment_and_route() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(
        &event(
            OrderEventKind::DriverAssigned,
            "A100",
            Some("repartidor 3"),
            None,
        ),
        t0,
    );
    assert_eq!(state.order("A100").unwrap().assigned_driver, Some(2));

    // Driver reports en-route: a route association appears.
    state.handle_message(
        &ControllerMessage::DriverMoved(DriverMovement {
            driver_id: 2,
            av: 2,
            ca: 4,
            state: Some(DriverState::ToRestaurant),
        }),
        t0,
    );
    assert!(state.route(2).is_some());

    state.handle_message(&event(OrderEventKind::Cancelled, "A100", None, None), t0);
    let order = state.order("A100").unwrap();
    assert!(order.tombstoned);
    assert_eq!(order.assigned_driver, None);
    assert!(state.route(2).is_none());

    // Cancelled orders purge on the short grace.
    state.tick(t0 + Duration::from_millis(150));
    assert!(state.order("A100").is_none());
}

#[test]
fn cancel_rejected_changes_nothing() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(
        &event(OrderEventKind::Preparing, "A100", None, Some("8.0")),
        t0,
    );

    let report = state.handle_message(
        &event(OrderEventKind::CancelRejected, "A100", None, None),
        t0,
    );
    assert_eq!(report.outcome, IngestOutcome::Applied);
    assert!(!report.notices.is_empty());
    let order = state.order("A100").unwrap();
    assert_eq!(order.status, OrderStatus::Preparing);
    assert!(!order.tombstoned);
}

#[test]
fn events_for_unknown_orders_are_noops() {
    let (mut state, t0) = city();
    let outcome = state
        .handle_message(&event(OrderEventKind::Preparing, "GHOST", None, None), t0)
        .outcome;
    assert_eq!(outcome, IngestOutcome::Ignored);
    assert!(state.snapshot().orders.is_empty());
}

#[test]
fn hard_reset_clears_everything() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(
        &event(OrderEventKind::Preparing, "A100", None, Some("5.0")),
        t0,
    );
    assert!(state.total_orders_created() > 0);

    let outcome = state
        .handle_message(
            &event(OrderEventKind::SystemReset, "RESET", None, None),
            t0,
        )
        .outcome;
    assert_eq!(outcome, IngestOutcome::Reset);

    let snapshot = state.snapshot();
    assert!(snapshot.orders.is_empty());
    assert!(snapshot.restaurants.is_empty());
    assert!(snapshot.drivers.is_empty());
    assert!(snapshot.houses.is_empty());
    assert_eq!(snapshot.total_orders_created, 0);
    assert!(snapshot.history.is_empty());

    // Temp receipts restart from 1 after a reset.
    state.handle_message(&restaurant_msg(1, 3, 7), t0);
    state.handle_message(&house_msg(3, 9, 2), t0);
    let receipt = place_order(&mut state, t0);
    assert_eq!(receipt, "TEMP-1");
}

#[test]
fn map_message_resets_and_records_grid() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);

    let outcome = state
        .handle_message(
            &ControllerMessage::Map(delivery_engine::wire::MapHeader {
                streets: 12,
                avenues: 10,
            }),
            t0,
        )
        .outcome;
    assert_eq!(outcome, IngestOutcome::Reset);
    let snapshot = state.snapshot();
    assert!(snapshot.orders.is_empty());
    let grid = snapshot.grid.unwrap();
    assert_eq!((grid.streets, grid.avenues), (12, 10));
}

#[test]
fn driver_names_resolve_to_zero_based_ids() {
    assert_eq!(driver_index("repartidor 3"), Some(2));
    assert_eq!(driver_index("Repartidor 10"), Some(9));
    assert_eq!(driver_index("repartidor 0"), None, "names are 1-based");
    assert_eq!(driver_index("no digits here"), None);
    assert_eq!(driver_index(""), None);
}

#[test]
fn assignment_without_resolvable_driver_still_advances() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(
        &event(OrderEventKind::DriverAssigned, "A100", Some("mystery"), None),
        t0,
    );
    let order = state.order("A100").unwrap();
    assert_eq!(order.status, OrderStatus::Assigned);
    assert_eq!(order.assigned_driver, None);
}

#[test]
fn snapshot_exposes_per_driver_active_orders() {
    let (mut state, t0) = city();
    place_order(&mut state, t0);
    state.handle_message(&event(OrderEventKind::Created, "A100", None, None), t0);
    state.handle_message(
        &event(
            OrderEventKind::DriverAssigned,
            "A100",
            Some("repartidor 3"),
            None,
        ),
        t0,
    );

    let snapshot = state.snapshot();
    let driver = snapshot.drivers.iter().find(|d| d.driver.id == 2).unwrap();
    assert_eq!(driver.active_orders, vec!["A100"]);

    state.handle_message(&event(OrderEventKind::Delivered, "A100", None, None), t0);
    let snapshot = state.snapshot();
    let driver = snapshot.drivers.iter().find(|d| d.driver.id == 2).unwrap();
    assert!(driver.active_orders.is_empty(), "tombstoned orders drop out");
}

#[test]
fn transport_rollback_leaves_no_trace() {
    let (mut state, t0) = city();
    let request = OrderRequest {
        restaurant_id: 1,
        house_id: 3,
        dish_ids: vec![10],
    };
    let (_, token) = state.create_speculative(&request, t0).unwrap();
    assert!(state.order(token.receipt()).is_some());

    // The actor calls this when the command channel refuses the send.
    state.discard_speculative(&token);
    assert!(state.order(token.receipt()).is_none());
    assert_eq!(state.total_orders_created(), 0);
    assert_eq!(state.restaurant(1).unwrap().total_dishes, 0);
}
