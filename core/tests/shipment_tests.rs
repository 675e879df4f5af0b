// tests/shipment_tests.rs
mod common;
use common::*;
use pantry::models::{OrderStatus, ShipmentStatus, ShipperStatus};
use pantry::services::templates;
use pantry::{ErrorKind, PageRequest, PantryError};
use serial_test::serial;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(15 * 60);

async fn ready(h: &Harness, order_id: &str, shipper_id: &str) {
  h.processing_order(order_id).await;
  h.seed_shipper(shipper_id, Some((hm(8, 0), hm(22, 0)))).await;
}

#[tokio::test]
#[serial]
async fn shipper_without_a_shift_cannot_be_assigned() {
  setup_tracing();
  let h = Harness::new();
  h.processing_order("O1").await;
  h.seed_shipper("S1", None).await;

  let err = h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap_err();
  assert!(matches!(err, PantryError::NoShiftConfigured { ref shipper_id } if shipper_id == "S1"));

  let shipper = h.shipper("S1").await;
  assert_eq!(shipper.status, ShipperStatus::Idle);
  assert_eq!(shipper.current_order, None);
  assert_eq!(h.process("O1").await.unwrap().deliver_by, None);
  assert_eq!(h.pantry.shipments.timers().armed_count(), 0);
}

#[tokio::test]
#[serial]
async fn assignment_offers_the_order_and_notifies_the_shipper() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;

  let shipper = h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();
  assert_eq!(shipper.status, ShipperStatus::Assign);
  assert_eq!(shipper.current_order.as_deref(), Some("O1"));
  assert_eq!(shipper.assigned_at, Some(opening_time()));
  assert_eq!(h.shipper("S1").await, shipper);

  let process = h.process("O1").await.unwrap();
  assert_eq!(process.deliver_by.as_deref(), Some("S1"));
  assert_eq!(process.shipment_status, ShipmentStatus::Assign);
  assert!(h.pantry.shipments.timers().is_armed("O1", "S1"));

  h.settle().await;
  let sent = h.notifier.sent_with(templates::SHIPMENT_ASSIGNED);
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].recipient, "S1");
  assert_eq!(sent[0].variables["order_id"], "O1");
  assert_eq!(sent[0].variables["receiver_phone"], "0901234567");
  assert_eq!(sent[0].variables["cod_amount"], "120000");
}

#[tokio::test]
#[serial]
async fn a_failing_notifier_does_not_undo_the_assignment() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.notifier.fail.store(true, std::sync::atomic::Ordering::SeqCst);

  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();
  h.settle().await;
  assert!(h.notifier.sent.lock().is_empty());
  assert_eq!(h.shipper("S1").await.status, ShipperStatus::Assign);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn unaccepted_offer_is_withdrawn_after_fifteen_minutes() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();

  tokio::time::sleep(TIMEOUT - Duration::from_secs(1)).await;
  h.settle().await;
  assert_eq!(h.shipper("S1").await.status, ShipperStatus::Assign);

  tokio::time::sleep(Duration::from_secs(2)).await;
  h.settle().await;
  let shipper = h.shipper("S1").await;
  assert_eq!(shipper.status, ShipperStatus::Idle);
  assert_eq!(shipper.current_order, None);
  assert!(shipper.is_consistent());

  let process = h.process("O1").await.unwrap();
  assert_eq!(process.deliver_by, None);
  assert_eq!(process.shipment_status, ShipmentStatus::Awaiting);
  assert_eq!(h.order("O1").await.status, OrderStatus::OnProcessing);
  assert_eq!(h.pantry.shipments.timers().armed_count(), 0);

  let revoked = h.notifier.sent_with(templates::SHIPMENT_REVOKED);
  assert_eq!(revoked.len(), 1);
  assert_eq!(revoked[0].variables["reason"], "not accepted in time");
}

#[tokio::test(start_paused = true)]
#[serial]
async fn accepting_in_time_defuses_the_timeout() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();

  tokio::time::sleep(Duration::from_secs(10 * 60)).await;
  let shipper = h.pantry.shipments.accept_shipment("O1", "S1").await.unwrap();
  assert_eq!(shipper.status, ShipperStatus::Accepted);
  assert!(!h.pantry.shipments.timers().is_armed("O1", "S1"));

  tokio::time::sleep(TIMEOUT).await;
  h.settle().await;
  let shipper = h.shipper("S1").await;
  assert_eq!(shipper.status, ShipperStatus::Accepted);
  assert_eq!(shipper.current_order.as_deref(), Some("O1"));
  let process = h.process("O1").await.unwrap();
  assert_eq!(process.shipment_status, ShipmentStatus::Accepted);
  assert_eq!(process.deliver_by.as_deref(), Some("S1"));
  assert!(h.notifier.sent_with(templates::SHIPMENT_REVOKED).is_empty());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn an_old_timer_leaves_a_newer_offer_of_the_same_pair_alone() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();

  // The offer is swept by another process before the local timer fires.
  let other = h.restarted();
  h.clock.advance(chrono::Duration::minutes(16));
  assert_eq!(other.shipments.sweep_stale_assignments().await.unwrap(), 1);

  tokio::time::sleep(Duration::from_secs(10 * 60)).await;
  let renewed = other.shipments.assign_shipper("O1", "S1").await.unwrap();

  tokio::time::sleep(Duration::from_secs(6 * 60)).await;
  h.settle().await;
  let shipper = h.shipper("S1").await;
  assert_eq!(shipper.status, ShipperStatus::Assign);
  assert_eq!(shipper.assigned_at, renewed.assigned_at);
  assert_eq!(h.notifier.sent_with(templates::SHIPMENT_REVOKED).len(), 1);
  other.shipments.timers().cancel_all();
}

#[tokio::test]
#[serial]
async fn rejection_frees_the_order_for_another_shipper() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.seed_shipper("S2", Some((hm(8, 0), hm(22, 0)))).await;
  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();

  let shipper = h.pantry.shipments.reject_shipment("O1", "S1").await.unwrap();
  assert_eq!(shipper.status, ShipperStatus::Rejected);
  assert_eq!(shipper.current_order, None);
  assert!(!h.pantry.shipments.timers().is_armed("O1", "S1"));
  let process = h.process("O1").await.unwrap();
  assert_eq!(process.deliver_by, None);
  assert_eq!(process.shipment_status, ShipmentStatus::Rejected);

  let err = h.pantry.shipments.reject_shipment("O1", "S1").await.unwrap_err();
  assert!(matches!(err, PantryError::NotYourOrder { .. }));

  h.pantry.shipments.assign_shipper("O1", "S2").await.unwrap();
  assert_eq!(h.process("O1").await.unwrap().deliver_by.as_deref(), Some("S2"));

  // A shipper that rejected can take the next order.
  h.processing_order("O2").await;
  let shipper = h.pantry.shipments.assign_shipper("O2", "S1").await.unwrap();
  assert_eq!(shipper.current_order.as_deref(), Some("O2"));
}

#[tokio::test]
#[serial]
async fn an_order_is_held_by_at_most_one_shipper() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.seed_shipper("S2", Some((hm(8, 0), hm(22, 0)))).await;
  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();

  let err = h.pantry.shipments.assign_shipper("O1", "S2").await.unwrap_err();
  assert!(matches!(err, PantryError::OrderTaken { ref holder, .. } if holder == "S1"));
  assert_eq!(h.shipper("S2").await.status, ShipperStatus::Idle);

  let err = h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap_err();
  assert!(matches!(err, PantryError::AlreadyAssigned { .. }));

  let holders = h
    .pantry
    .shipments
    .list_shippers(Some(ShipperStatus::Assign), PageRequest::default())
    .await
    .unwrap();
  assert_eq!(holders.total, 1);
  assert_eq!(holders.items[0].shipper_id, "S1");
}

#[tokio::test]
#[serial]
async fn a_busy_shipper_cannot_take_a_second_order() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.processing_order("O2").await;
  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();

  let err = h.pantry.shipments.assign_shipper("O2", "S1").await.unwrap_err();
  assert!(matches!(err, PantryError::ShipperBusy { status: ShipperStatus::Assign, .. }));
  assert_eq!(err.kind(), ErrorKind::Rule);
  assert_eq!(h.process("O2").await.unwrap().deliver_by, None);
}

#[tokio::test]
#[serial]
async fn only_processed_orders_can_be_offered() {
  setup_tracing();
  let h = Harness::new();
  h.seed_product("P1", 10).await;
  h.seed_cod_order("O1", &[("P1", 1)]).await;
  h.seed_shipper("S1", Some((hm(8, 0), hm(22, 0)))).await;

  let err = h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap_err();
  assert!(matches!(err, PantryError::OrderNotShippable { .. }));

  let err = h.pantry.shipments.assign_shipper("O1", "nobody").await.unwrap_err();
  assert!(matches!(err, PantryError::OrderNotShippable { .. }));

  h.pantry.orders.accept_order("O1", STAFF).await.unwrap();
  let err = h.pantry.shipments.assign_shipper("O1", "nobody").await.unwrap_err();
  assert!(matches!(err, PantryError::NotFound { entity: "shipper", .. }));
}

#[tokio::test]
#[serial]
async fn shift_windows_are_checked_in_store_time_and_inclusive() {
  setup_tracing();
  let h = Harness::new();
  h.processing_order("O1").await;
  h.seed_shipper("late", Some((hm(14, 0), hm(18, 0)))).await;
  h.seed_shipper("early", Some((hm(8, 0), hm(10, 0)))).await;

  let err = h.pantry.shipments.assign_shipper("O1", "late").await.unwrap_err();
  assert!(matches!(err, PantryError::OutOfShift { now, .. } if now == hm(10, 0)));
  assert_eq!(h.shipper("late").await.status, ShipperStatus::Idle);

  // 10:00 local is the last minute of the early shift.
  let shipper = h.pantry.shipments.assign_shipper("O1", "early").await.unwrap();
  assert_eq!(shipper.status, ShipperStatus::Assign);
}

#[tokio::test]
#[serial]
async fn a_shipment_runs_from_offer_to_hand_over() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();

  let err = h.pantry.shipments.accept_shipment("O1", "S2").await;
  assert!(matches!(err, Err(PantryError::NotFound { .. })));
  h.seed_shipper("S2", Some((hm(8, 0), hm(22, 0)))).await;
  let err = h.pantry.shipments.accept_shipment("O1", "S2").await.unwrap_err();
  assert!(matches!(err, PantryError::NotAssignedToYou { .. }));

  h.pantry.shipments.accept_shipment("O1", "S1").await.unwrap();
  let err = h.pantry.shipments.accept_shipment("O1", "S1").await.unwrap_err();
  assert!(matches!(err, PantryError::AlreadyAccepted { .. }));

  let err = h.pantry.shipments.start_shipping("O1", "S2").await.unwrap_err();
  assert!(matches!(err, PantryError::NotYourOrder { .. }));

  h.clock.advance(chrono::Duration::minutes(5));
  let process = h.pantry.shipments.start_shipping("O1", "S1").await.unwrap();
  assert_eq!(process.shipment_status, ShipmentStatus::OnShipping);
  assert_eq!(process.shipping_date, Some(h.clock_now()));
  assert_eq!(h.order("O1").await.status, OrderStatus::OnShipping);
  assert_eq!(h.shipper("S1").await.status, ShipperStatus::OnShipping);

  let err = h.pantry.orders.cancel_order("O1").await.unwrap_err();
  assert!(matches!(err, PantryError::CannotCancelInTransit { .. }));

  let process = h.pantry.shipments.complete_shipment("O1", "S1").await.unwrap();
  assert_eq!(process.shipment_status, ShipmentStatus::Delivered);
  assert_eq!(h.order("O1").await.status, OrderStatus::Shipped);
  let shipper = h.shipper("S1").await;
  assert_eq!(shipper.status, ShipperStatus::Idle);
  assert_eq!(shipper.current_order, None);

  let err = h.pantry.shipments.complete_shipment("O1", "S1").await.unwrap_err();
  assert!(matches!(err, PantryError::OrderNotShippable { .. }));
}

#[tokio::test]
#[serial]
async fn an_offer_must_be_accepted_before_shipping_starts() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();

  let err = h.pantry.shipments.start_shipping("O1", "S1").await.unwrap_err();
  assert!(matches!(err, PantryError::NotYourOrder { .. }));
  assert_eq!(err.kind(), ErrorKind::Rule);
  assert_eq!(h.shipper("S1").await.status, ShipperStatus::Assign);
  assert_eq!(h.order("O1").await.status, OrderStatus::OnProcessing);
  assert_eq!(h.process("O1").await.unwrap().shipping_date, None);
  assert!(h.pantry.shipments.timers().is_armed("O1", "S1"));

  h.pantry.shipments.accept_shipment("O1", "S1").await.unwrap();
  h.pantry.shipments.start_shipping("O1", "S1").await.unwrap();
  assert_eq!(h.shipper("S1").await.status, ShipperStatus::OnShipping);
}

#[tokio::test]
#[serial]
async fn sweep_reverts_offers_whose_timer_was_lost() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();

  let restarted = h.restarted();
  assert_eq!(restarted.shipments.timers().armed_count(), 0);

  h.clock.advance(chrono::Duration::minutes(14));
  assert_eq!(restarted.shipments.sweep_stale_assignments().await.unwrap(), 0);
  assert_eq!(h.shipper("S1").await.status, ShipperStatus::Assign);

  h.clock.advance(chrono::Duration::minutes(2));
  assert_eq!(restarted.shipments.sweep_stale_assignments().await.unwrap(), 1);
  let shipper = h.shipper("S1").await;
  assert_eq!(shipper.status, ShipperStatus::Idle);
  assert_eq!(h.process("O1").await.unwrap().deliver_by, None);

  assert_eq!(restarted.shipments.sweep_stale_assignments().await.unwrap(), 0);
  h.pantry.shipments.timers().cancel_all();
}

#[tokio::test]
#[serial]
async fn reconciliation_sweeps_on_start_and_stops_on_shutdown() {
  setup_tracing();
  let h = Harness::new();
  ready(&h, "O1", "S1").await;
  h.pantry.shipments.assign_shipper("O1", "S1").await.unwrap();
  h.clock.advance(chrono::Duration::minutes(20));

  let shutdown = CancellationToken::new();
  let stopper = shutdown.clone();
  tokio::join!(h.pantry.shipments.run_reconciliation(shutdown), async {
    h.settle().await;
    stopper.cancel();
  });

  assert_eq!(h.shipper("S1").await.status, ShipperStatus::Idle);
  assert_eq!(h.pantry.shipments.timers().armed_count(), 0);
}

#[tokio::test]
#[serial]
async fn shift_times_are_validated_before_they_are_stored() {
  setup_tracing();
  let h = Harness::new();
  let registered = h.pantry.shipments.register_shipper("S1").await.unwrap();
  assert_eq!(registered.status, ShipperStatus::Idle);
  assert_eq!(registered.start_shift, None);

  let shipper = h.pantry.shipments.set_shift_time("S1", hm(9, 0), hm(17, 30)).await.unwrap();
  assert_eq!(shipper.start_shift, Some(hm(9, 0)));
  assert_eq!(shipper.end_shift, Some(hm(17, 30)));

  for (start, end) in [(hm(17, 0), hm(9, 0)), (hm(7, 30), hm(12, 0)), (hm(12, 0), hm(23, 30))] {
    let err = h.pantry.shipments.set_shift_time("S1", start, end).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation, "{start}-{end}");
  }
  assert_eq!(h.shipper("S1").await.start_shift, Some(hm(9, 0)));

  let again = h.pantry.shipments.register_shipper("S1").await.unwrap();
  assert_eq!(again.end_shift, Some(hm(17, 30)));

  let err = h.pantry.shipments.set_shift_time("ghost", hm(9, 0), hm(10, 0)).await.unwrap_err();
  assert!(matches!(err, PantryError::NotFound { entity: "shipper", .. }));
}
