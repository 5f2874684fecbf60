use chrono::{DateTime, TimeZone, Utc};
use fleetx_core::{BookingRequest, BookingStatus, ManualClock, Role, UserAccount, Vehicle};
use fleetx_engine::EngineState;
use fleetx_offer::RecommendationQuery;
use fleetx_order::DispatchError;
use fleetx_shared::{BookingAction, Topic};
use fleetx_store::app_config::Config;
use std::sync::Arc;
use uuid::Uuid;

const CUSTOMER: u128 = 1;
const MANAGER: u128 = 2;
const DRIVER_A: u128 = 10;
const DRIVER_B: u128 = 11;
const VAN_DRIVER: u128 = 12;
const SUV_A: u128 = 100;
const SUV_B: u128 = 101;
const VAN: u128 = 102;

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, hour, minute, 0).unwrap()
}

fn fleet_config() -> Config {
    let mut config = Config::default();
    config.fleet.users = vec![
        UserAccount::new(id(CUSTOMER), "Asha", Role::Customer),
        UserAccount::new(id(MANAGER), "Mara", Role::Manager),
        UserAccount::new(id(DRIVER_A), "Dee", Role::Driver),
        UserAccount::new(id(DRIVER_B), "Eli", Role::Driver),
        UserAccount::new(id(VAN_DRIVER), "Fin", Role::Driver),
    ];

    let mut rav4 = Vehicle::new(id(SUV_A), "Toyota RAV4", "SUV");
    rav4.assigned_driver_id = Some(id(DRIVER_A));
    rav4.fuel_level = Some(85.0);

    let mut model_y = Vehicle::new(id(SUV_B), "Tesla Model Y", "SUV");
    model_y.assigned_driver_id = Some(id(DRIVER_B));
    model_y.is_ev = true;
    model_y.battery_level = Some(92.0);

    let mut transit = Vehicle::new(id(VAN), "Ford Transit", "Van");
    transit.assigned_driver_id = Some(id(VAN_DRIVER));

    config.fleet.vehicles = vec![rav4, model_y, transit];
    config
}

fn engine() -> EngineState {
    let clock = Arc::new(ManualClock::new(at(8, 0)));
    EngineState::with_clock(&fleet_config(), clock).unwrap()
}

fn request(class: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> BookingRequest {
    BookingRequest {
        customer_id: id(CUSTOMER),
        vehicle_class: class.to_string(),
        is_ev: Some(false),
        seats: Some(5),
        pickup_location: "221B Baker Street".to_string(),
        dropoff_location: "Heathrow T5".to_string(),
        start_time: start,
        end_time: end,
    }
}

#[tokio::test]
async fn test_suv_two_hours_is_priced_and_pending() {
    let engine = engine();
    let booking = engine
        .dispatch
        .create_booking(request("SUV", at(10, 0), at(12, 0)))
        .await
        .unwrap();

    assert_eq!(booking.price, 30.0);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert!(booking.assigned_driver_id().is_none());
    assert!(booking.assigned_vehicle_id().is_none());
}

#[tokio::test]
async fn test_manager_reject_then_driver_accept_fails() {
    let engine = engine();
    let booking = engine
        .dispatch
        .create_booking(request("SUV", at(10, 0), at(12, 0)))
        .await
        .unwrap();

    engine
        .dispatch
        .manager_reject(booking.id, id(MANAGER), "blocked customer")
        .await
        .unwrap();
    let err = engine
        .dispatch
        .driver_accept(booking.id, id(DRIVER_A))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::InvalidTransition(_)));
    let stored = engine.dispatch.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Rejected);
}

#[tokio::test]
async fn test_back_to_back_windows_do_not_conflict() {
    let engine = engine();
    let morning = engine
        .dispatch
        .create_booking(request("SUV", at(10, 0), at(12, 0)))
        .await
        .unwrap();
    engine
        .dispatch
        .driver_accept(morning.id, id(DRIVER_A))
        .await
        .unwrap();

    let availability = engine.dispatch.availability();
    let noon = fleetx_core::TimeWindow::new(at(12, 0), at(13, 0)).unwrap();
    let inside = fleetx_core::TimeWindow::new(at(11, 0), at(11, 30)).unwrap();
    assert!(availability.is_available(id(SUV_A), &noon).await.unwrap());
    assert!(availability.has_conflict(id(SUV_A), &inside).await.unwrap());

    let after = engine
        .dispatch
        .create_booking(request("SUV", at(12, 0), at(13, 0)))
        .await
        .unwrap();
    let overlapping = engine
        .dispatch
        .create_booking(request("SUV", at(11, 0), at(11, 30)))
        .await
        .unwrap();

    engine
        .dispatch
        .driver_accept(after.id, id(DRIVER_A))
        .await
        .unwrap();
    let err = engine
        .dispatch
        .driver_accept(overlapping.id, id(DRIVER_A))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Conflict(_)));

    let held = engine
        .dispatch
        .list_confirmed_for_vehicle(id(SUV_A))
        .await
        .unwrap();
    assert_eq!(held.len(), 2);
    for (i, a) in held.iter().enumerate() {
        for b in &held[i + 1..] {
            assert!(!a.window.overlaps(&b.window));
        }
    }
}

#[tokio::test]
async fn test_driver_reject_leaves_booking_for_sibling() {
    let engine = engine();
    let booking = engine
        .dispatch
        .create_booking(request("SUV", at(10, 0), at(12, 0)))
        .await
        .unwrap();

    let after = engine
        .dispatch
        .driver_reject(booking.id, id(DRIVER_A), "flat tyre")
        .await
        .unwrap();
    assert_eq!(after.status, BookingStatus::Pending);

    let offered = engine
        .dispatch
        .list_pending_for_driver(id(DRIVER_B))
        .await
        .unwrap();
    assert_eq!(offered.len(), 1);
    assert_eq!(offered[0].id, booking.id);

    let van = engine
        .dispatch
        .list_pending_for_driver(id(VAN_DRIVER))
        .await
        .unwrap();
    assert!(van.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_drivers_racing_for_one_booking() {
    let engine = engine();
    let booking = engine
        .dispatch
        .create_booking(request("SUV", at(10, 0), at(12, 0)))
        .await
        .unwrap();

    let racers: Vec<_> = [DRIVER_A, DRIVER_B]
        .into_iter()
        .map(|driver| {
            let dispatch = engine.dispatch.clone();
            tokio::spawn(async move { (driver, dispatch.driver_accept(booking.id, id(driver)).await) })
        })
        .collect();

    let mut winner = None;
    for racer in racers {
        let (driver, result) = racer.await.unwrap();
        match result {
            Ok(_) => {
                assert!(winner.is_none());
                winner = Some(driver);
            }
            Err(e) => assert!(matches!(
                e,
                DispatchError::Conflict(_) | DispatchError::InvalidTransition(_)
            )),
        }
    }

    let stored = engine.dispatch.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
    assert_eq!(stored.assigned_driver_id(), winner.map(id));
}

#[tokio::test]
async fn test_bus_sees_lifecycle_in_commit_order() {
    let engine = engine();
    let mut events = engine.subscribe();

    let booking = engine
        .dispatch
        .create_booking(request("Van", at(9, 0), at(10, 30)))
        .await
        .unwrap();
    engine
        .dispatch
        .driver_accept(booking.id, id(VAN_DRIVER))
        .await
        .unwrap();
    engine
        .dispatch
        .cancel_booking(booking.id, id(CUSTOMER))
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push((event.action, event.topic, event.payload.status));
    }

    let actions: Vec<BookingAction> = seen.iter().map(|(a, _, _)| *a).collect();
    assert_eq!(
        actions,
        vec![
            BookingAction::Created,
            BookingAction::Created,
            BookingAction::DriverAccepted,
            BookingAction::DriverAccepted,
            BookingAction::DriverAccepted,
            BookingAction::Cancelled,
            BookingAction::Cancelled,
            BookingAction::Cancelled,
            BookingAction::VehicleReleased,
        ]
    );
    assert_eq!(seen[0].1, Topic::driver_pool("VAN"));
    assert_eq!(seen[8].1, Topic::Fleet);
    assert_eq!(seen[2].2, BookingStatus::Confirmed);
    assert_eq!(seen[8].2, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_event_payload_masks_locations_in_debug_only() {
    let engine = engine();
    let mut events = engine.subscribe();
    engine
        .dispatch
        .create_booking(request("SUV", at(10, 0), at(11, 0)))
        .await
        .unwrap();

    let event = events.try_recv().unwrap();
    assert!(!format!("{:?}", event).contains("Baker Street"));

    let wire = serde_json::to_string(&event).unwrap();
    assert!(wire.contains("221B Baker Street"));
    assert!(wire.contains("\"action\":\"CREATED\""));
}

#[tokio::test]
async fn test_recommend_ranks_free_vehicles() {
    let engine = engine();
    let query = RecommendationQuery {
        customer_id: id(CUSTOMER),
        vehicle_class: Some("suv".to_string()),
        ev_only: None,
        start_time: at(10, 0),
        end_time: at(12, 0),
        limit: None,
    };

    let ranked = engine.recommend(&query).await.unwrap();
    let ids: Vec<Uuid> = ranked.iter().map(|r| r.vehicle_id).collect();
    assert_eq!(ids, vec![id(SUV_B), id(SUV_A)]);
    assert!((ranked[0].match_score - 0.8).abs() < 1e-9);
    assert!((ranked[1].match_score - 0.7).abs() < 1e-9);

    let booking = engine
        .dispatch
        .create_booking(request("SUV", at(11, 0), at(13, 0)))
        .await
        .unwrap();
    engine
        .dispatch
        .driver_accept(booking.id, id(DRIVER_B))
        .await
        .unwrap();

    let ranked = engine.recommend(&query).await.unwrap();
    let ids: Vec<Uuid> = ranked.iter().map(|r| r.vehicle_id).collect();
    assert_eq!(ids, vec![id(SUV_A)]);

    let ev_only = RecommendationQuery {
        ev_only: Some(true),
        ..query.clone()
    };
    assert!(engine.recommend(&ev_only).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_full_lifecycle_to_completion() {
    let clock = Arc::new(ManualClock::new(at(8, 0)));
    let engine = EngineState::with_clock(&fleet_config(), clock.clone()).unwrap();

    let booking = engine
        .dispatch
        .create_booking(request("SUV", at(10, 0), at(12, 0)))
        .await
        .unwrap();
    engine
        .dispatch
        .driver_accept(booking.id, id(DRIVER_A))
        .await
        .unwrap();

    let err = engine.dispatch.complete_booking(booking.id).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition(_)));

    clock.set(at(12, 0));
    let done = engine.dispatch.complete_booking(booking.id).await.unwrap();
    assert_eq!(done.status, BookingStatus::Completed);
    assert!(done.assignment.is_none());

    let stats = engine.dispatch.statistics().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.completed, 1);

    let history = engine
        .dispatch
        .list_bookings_for_driver(id(DRIVER_A))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(engine
        .dispatch
        .list_confirmed_for_driver(id(DRIVER_A))
        .await
        .unwrap()
        .is_empty());
}
