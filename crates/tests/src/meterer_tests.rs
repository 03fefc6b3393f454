//! End-to-end admission scenarios for the [`Meterer`].
//!
//! All scenarios run with quantum 3, price 10, a 60s reservation window, and a global
//! on-demand cap of 100 symbols per 1s period; the standard reservation covers
//! `[0, 600)` at 5 symbols/s, giving a bin limit of 300.

use crate::mock_infrastructure::{
    account, at, build_meterer, default_meterer, on_demand_header, reservation_header,
    standard_reservation, test_payment_params,
};
use alloy_primitives::U256;
use tollgate_core::{
    meter::MeterError,
    store::StoreError,
    types::{OnDemandPayment, PaymentParams, ReservedPayment, NANOS_PER_SECOND},
};

#[tokio::test]
async fn test_reservation_happy_path() {
    let t = default_meterer().await;
    let acct = account(0x01);
    t.oracle.set_reservation(acct, standard_reservation());

    let charged = t
        .meterer
        .meter_request(&reservation_header(acct, 30), 7, &[0], at(30))
        .await
        .expect("request within reservation");

    assert_eq!(charged, 9);
    assert_eq!(t.store.reservation_bin(acct, 0), 9);
}

#[tokio::test]
async fn test_reservation_overflow_carries_two_periods_ahead() {
    let t = default_meterer().await;
    let acct = account(0x02);
    t.oracle.set_reservation(acct, standard_reservation());
    t.store.set_reservation_bin(acct, 0, 295);

    // 20 symbols charge 21; usage 316 exceeds the limit of 300 but stays within 600.
    let charged = t
        .meterer
        .meter_request(&reservation_header(acct, 30), 20, &[0], at(30))
        .await
        .expect("partial overflow is absorbed once");

    assert_eq!(charged, 21);
    assert_eq!(t.store.reservation_bin(acct, 0), 316);
    // The excess lands two periods ahead, leaving period 1 pristine.
    assert_eq!(t.store.reservation_bin(acct, 1), 0);
    assert_eq!(t.store.reservation_bin(acct, 2), 16);
}

#[tokio::test]
async fn test_reservation_overflow_beyond_carry_rejected_without_rollback() {
    let t = default_meterer().await;
    let acct = account(0x03);
    t.oracle.set_reservation(acct, standard_reservation());
    t.store.set_reservation_bin(acct, 0, 295);

    // 400 symbols charge 402; usage 697 exceeds twice the limit.
    let err = t
        .meterer
        .meter_request(&reservation_header(acct, 30), 400, &[0], at(30))
        .await
        .unwrap_err();

    assert!(matches!(err, MeterError::OverflowExceedsBinLimit));
    // The increment is a committed charge either way.
    assert_eq!(t.store.reservation_bin(acct, 0), 697);
    assert_eq!(t.store.reservation_bin(acct, 2), 0);
}

#[tokio::test]
async fn test_on_demand_happy_path() {
    let t = default_meterer().await;
    let acct = account(0x04);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::from(10_000) });

    let charged = t
        .meterer
        .meter_request(&on_demand_header(acct, 60), 5, &[0], at(30))
        .await
        .expect("funded on-demand request");

    assert_eq!(charged, 6);
    assert_eq!(t.store.ledger_entries(acct), vec![(U256::from(60), 6)]);
    assert_eq!(t.store.global_bin(30), 6);
}

#[tokio::test]
async fn test_on_demand_predecessor_violation() {
    let t = default_meterer().await;
    let acct = account(0x05);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::from(10_000) });
    t.store.insert_ledger_entry(acct, U256::from(100), 6);

    // 7 symbols charge 9, priced 90; 100 + 90 > 150.
    let err = t
        .meterer
        .meter_request(&on_demand_header(acct, 150), 7, &[0], at(30))
        .await
        .unwrap_err();

    assert!(matches!(err, MeterError::InsufficientCumulativePayment));
    assert_eq!(t.store.ledger_entries(acct), vec![(U256::from(100), 6)]);
}

#[tokio::test]
async fn test_on_demand_successor_violation() {
    let t = default_meterer().await;
    let acct = account(0x06);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::from(10_000) });
    t.store.insert_ledger_entry(acct, U256::from(500), 6);

    // Inserting at 450 would leave the recorded payment at 500 under-priced:
    // 450 + price(6) = 510 > 500.
    let err = t
        .meterer
        .meter_request(&on_demand_header(acct, 450), 3, &[0], at(30))
        .await
        .unwrap_err();

    assert!(matches!(err, MeterError::CumulativePaymentConflict));
    assert_eq!(t.store.ledger_entries(acct), vec![(U256::from(500), 6)]);
}

#[tokio::test]
async fn test_global_rate_overflow_compensates_ledger_insert() {
    let t = default_meterer().await;
    let acct = account(0x07);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::MAX });

    // 200 symbols charge 201, priced 2010; the insert succeeds, then the global bin
    // jumps past the cap of 100 and the entry is deleted again.
    let header = on_demand_header(acct, 2010);
    let err = t.meterer.meter_request(&header, 200, &[0], at(30)).await.unwrap_err();

    assert!(matches!(err, MeterError::GlobalRateExceeded));
    assert!(t.store.ledger_entries(acct).is_empty());
    // The global increment itself is not rolled back.
    assert_eq!(t.store.global_bin(30), 201);

    // The identical request stays admissible under the payment invariants — it fails
    // the global gate again, not a ledger conflict.
    let err = t.meterer.meter_request(&header, 200, &[0], at(30)).await.unwrap_err();
    assert!(matches!(err, MeterError::GlobalRateExceeded));
    assert!(t.store.ledger_entries(acct).is_empty());
}

// Boundaries.

#[tokio::test]
async fn test_previous_period_accepted_two_back_rejected() {
    let t = default_meterer().await;
    let acct = account(0x08);
    t.oracle.set_reservation(acct, standard_reservation());

    // Received in period 2; a header claiming period 1 is still bookable.
    let charged =
        t.meterer.meter_request(&reservation_header(acct, 70), 5, &[0], at(130)).await.unwrap();
    assert_eq!(charged, 6);
    assert_eq!(t.store.reservation_bin(acct, 1), 6);

    // A header claiming period 0 is two periods stale.
    let err = t
        .meterer
        .meter_request(&reservation_header(acct, 30), 5, &[0], at(130))
        .await
        .unwrap_err();
    assert!(matches!(err, MeterError::InvalidReservationPeriod));
    assert_eq!(t.store.reservation_bin(acct, 0), 0);
}

#[tokio::test]
async fn test_usage_exactly_at_limit_accepted_without_carry() {
    let t = default_meterer().await;
    let acct = account(0x09);
    t.oracle.set_reservation(acct, standard_reservation());
    t.store.set_reservation_bin(acct, 0, 279);

    // 279 + 21 lands exactly on the limit of 300.
    t.meterer.meter_request(&reservation_header(acct, 30), 20, &[0], at(30)).await.unwrap();

    assert_eq!(t.store.reservation_bin(acct, 0), 300);
    assert_eq!(t.store.reservation_bin(acct, 2), 0);
}

#[tokio::test]
async fn test_usage_one_past_limit_carries() {
    let t = default_meterer().await;
    let acct = account(0x0A);
    t.oracle.set_reservation(acct, standard_reservation());
    t.store.set_reservation_bin(acct, 0, 280);

    t.meterer.meter_request(&reservation_header(acct, 30), 20, &[0], at(30)).await.unwrap();

    assert_eq!(t.store.reservation_bin(acct, 0), 301);
    assert_eq!(t.store.reservation_bin(acct, 2), 1);
}

#[tokio::test]
async fn test_bin_already_filled() {
    let t = default_meterer().await;
    let acct = account(0x0B);
    t.oracle.set_reservation(acct, standard_reservation());
    t.store.set_reservation_bin(acct, 0, 300);

    let err = t
        .meterer
        .meter_request(&reservation_header(acct, 30), 5, &[0], at(30))
        .await
        .unwrap_err();

    assert!(matches!(err, MeterError::BinAlreadyFilled));
}

#[tokio::test]
async fn test_carry_denied_near_reservation_end() {
    let t = default_meterer().await;
    let acct = account(0x0C);
    // End at 120s: endPeriod = 2, so a carry from period 1 would land past the end.
    t.oracle.set_reservation(
        acct,
        ReservedPayment { end_timestamp: 120, ..standard_reservation() },
    );
    t.store.set_reservation_bin(acct, 1, 295);

    let err = t
        .meterer
        .meter_request(&reservation_header(acct, 70), 20, &[0], at(70))
        .await
        .unwrap_err();

    assert!(matches!(err, MeterError::OverflowExceedsBinLimit));
    assert_eq!(t.store.reservation_bin(acct, 1), 316);
    assert_eq!(t.store.reservation_bin(acct, 3), 0);
}

#[tokio::test]
async fn test_failed_carry_write_surfaces_store_error() {
    let t = default_meterer().await;
    let acct = account(0x0D);
    t.oracle.set_reservation(acct, standard_reservation());
    t.store.set_reservation_bin(acct, 0, 295);
    t.store.fail_reservation_bin_update_in(2);

    let err = t
        .meterer
        .meter_request(&reservation_header(acct, 30), 20, &[0], at(30))
        .await
        .unwrap_err();

    assert!(matches!(err, MeterError::Store(StoreError::Unavailable(_))));
    // The primary increment stands as a committed charge; only the carry is missing.
    assert_eq!(t.store.reservation_bin(acct, 0), 316);
    assert_eq!(t.store.reservation_bin(acct, 2), 0);
}

#[tokio::test]
async fn test_zero_symbols_charges_the_quantum() {
    let t = default_meterer().await;
    let acct = account(0x0E);
    t.oracle.set_reservation(acct, standard_reservation());

    let charged =
        t.meterer.meter_request(&reservation_header(acct, 30), 0, &[0], at(30)).await.unwrap();

    assert_eq!(charged, 3);
    assert_eq!(t.store.reservation_bin(acct, 0), 3);
}

#[tokio::test]
async fn test_zero_windows_degrade_to_single_bins() {
    let t = build_meterer(PaymentParams {
        reservation_window: 0,
        global_rate_period_interval: 0,
        ..test_payment_params()
    })
    .await;
    let acct = account(0x0F);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::from(10_000) });

    // Period arithmetic collapses to bin 0 and the global limit collapses to 0, so the
    // request books into the single bin, overflows it, and is compensated — no panic,
    // no divide-by-zero.
    let err = t
        .meterer
        .meter_request(&on_demand_header(acct, 60), 5, &[0], at(12_345))
        .await
        .unwrap_err();
    assert!(matches!(err, MeterError::GlobalRateExceeded));
    assert_eq!(t.store.global_bin(0), 6);
    assert!(t.store.ledger_entries(acct).is_empty());
}

#[tokio::test]
async fn test_reservation_inactive() {
    let t = default_meterer().await;
    let acct = account(0x10);
    t.oracle.set_reservation(
        acct,
        ReservedPayment { start_timestamp: 100, ..standard_reservation() },
    );

    let err = t
        .meterer
        .meter_request(&reservation_header(acct, 30), 5, &[0], at(30))
        .await
        .unwrap_err();

    assert!(matches!(err, MeterError::ReservationInactive));
}

#[tokio::test]
async fn test_quorum_validation() {
    let t = default_meterer().await;
    let acct = account(0x11);
    t.oracle.set_reservation(
        acct,
        ReservedPayment { quorum_numbers: vec![0], ..standard_reservation() },
    );

    let err = t
        .meterer
        .meter_request(&reservation_header(acct, 30), 5, &[], at(30))
        .await
        .unwrap_err();
    assert!(matches!(err, MeterError::QuorumMismatch(_)));

    let err = t
        .meterer
        .meter_request(&reservation_header(acct, 30), 5, &[0, 1], at(30))
        .await
        .unwrap_err();
    assert!(matches!(err, MeterError::QuorumMismatch(_)));

    // Nothing was booked for the rejected requests.
    assert_eq!(t.store.reservation_bin(acct, 0), 0);
}

#[tokio::test]
async fn test_on_demand_quorum_checked_against_global_set() {
    let t = default_meterer().await;
    let acct = account(0x12);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::from(10_000) });

    let err = t
        .meterer
        .meter_request(&on_demand_header(acct, 60), 5, &[2], at(30))
        .await
        .unwrap_err();

    assert!(matches!(err, MeterError::QuorumMismatch(_)));
    assert!(t.store.ledger_entries(acct).is_empty());
}

#[tokio::test]
async fn test_deposit_exceeded() {
    let t = default_meterer().await;
    let acct = account(0x13);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::from(50) });

    let err = t
        .meterer
        .meter_request(&on_demand_header(acct, 60), 5, &[0], at(30))
        .await
        .unwrap_err();

    assert!(matches!(err, MeterError::DepositExceeded));
}

#[tokio::test]
async fn test_duplicate_on_demand_request_fails_on_insert() {
    let t = default_meterer().await;
    let acct = account(0x14);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::from(10_000) });

    let header = on_demand_header(acct, 60);
    t.meterer.meter_request(&header, 5, &[0], at(30)).await.unwrap();

    // The neighbor query cannot see an equal key; the store's duplicate check is the
    // backstop that keeps two identical payments from both being accepted.
    let err = t.meterer.meter_request(&header, 5, &[0], at(30)).await.unwrap_err();
    assert!(matches!(err, MeterError::Store(StoreError::DuplicatePayment { .. })));
    assert_eq!(t.store.ledger_entries(acct), vec![(U256::from(60), 6)]);
}

#[tokio::test]
async fn test_no_cross_path_fallback() {
    let t = default_meterer().await;
    let acct = account(0x15);
    // Registered for reservations only.
    t.oracle.set_reservation(acct, standard_reservation());

    // A non-zero cumulative payment is never treated as a reservation request.
    let err = t
        .meterer
        .meter_request(&on_demand_header(acct, 60), 5, &[0], at(30))
        .await
        .unwrap_err();
    assert!(matches!(err, MeterError::AccountNotRegistered(a) if a == acct));

    // And the reverse: a deposit-only account cannot claim the reservation path.
    let funded = account(0x16);
    t.oracle.set_on_demand(funded, OnDemandPayment { cumulative_payment: U256::from(10_000) });
    let err = t
        .meterer
        .meter_request(&reservation_header(funded, 30), 5, &[0], at(30))
        .await
        .unwrap_err();
    assert!(matches!(err, MeterError::AccountNotRegistered(a) if a == funded));
}

#[tokio::test]
async fn test_global_store_failure_also_compensates() {
    let t = default_meterer().await;
    let acct = account(0x17);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::MAX });
    t.store.fail_global_bin_update_in(1);

    let err = t
        .meterer
        .meter_request(&on_demand_header(acct, 60), 5, &[0], at(30))
        .await
        .unwrap_err();

    // A failed increment leaves the ledger entry unbacked the same way an overflow
    // does, so it is compensated and the store error propagates.
    assert!(matches!(err, MeterError::Store(StoreError::Unavailable(_))));
    assert!(t.store.ledger_entries(acct).is_empty());
}

#[tokio::test]
async fn test_failed_compensation_surfaces_delete_error() {
    let t = default_meterer().await;
    let acct = account(0x18);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::MAX });
    t.store.fail_remove_in(1);

    let err = t
        .meterer
        .meter_request(&on_demand_header(acct, 2010), 200, &[0], at(30))
        .await
        .unwrap_err();

    // The delete error wins over the rate rejection and the ledger row dangles.
    assert!(matches!(err, MeterError::Store(StoreError::Unavailable(_))));
    assert_eq!(t.store.ledger_entries(acct), vec![(U256::from(2010), 201)]);
}

#[tokio::test]
async fn test_meterer_price_quotes_follow_snapshot() {
    let t = default_meterer().await;

    assert_eq!(t.meterer.symbols_charged(7), 9);
    assert_eq!(t.meterer.payment_charged(7), U256::from(90));

    // A refresh doubles the quantum; quotes follow the new snapshot.
    t.oracle.set_params(PaymentParams { min_num_symbols: 6, ..test_payment_params() });
    t.meterer.chain_state().refresh().await.unwrap();
    assert_eq!(t.meterer.symbols_charged(7), 12);
}

#[tokio::test]
async fn test_on_demand_requests_out_of_order_still_account_correctly() {
    let t = default_meterer().await;
    let acct = account(0x19);
    t.oracle.set_on_demand(acct, OnDemandPayment { cumulative_payment: U256::from(10_000) });

    // The second request (cumulative 120) arrives before the first (cumulative 60).
    t.meterer.meter_request(&on_demand_header(acct, 120), 5, &[0], at(30)).await.unwrap();
    t.meterer.meter_request(&on_demand_header(acct, 60), 5, &[0], at(30)).await.unwrap();

    assert_eq!(
        t.store.ledger_entries(acct),
        vec![(U256::from(60), 6), (U256::from(120), 6)]
    );

    // Wedging a third request between them must fail both neighbor checks.
    let err = t
        .meterer
        .meter_request(&on_demand_header(acct, 90), 5, &[0], at(30))
        .await
        .unwrap_err();
    assert!(matches!(err, MeterError::InsufficientCumulativePayment));
}

#[tokio::test]
async fn test_header_timestamp_is_what_selects_the_period() {
    let t = default_meterer().await;
    let acct = account(0x1A);
    t.oracle.set_reservation(acct, standard_reservation());

    // Header claims second 90 (period 1) while received during period 1 as well; the
    // bin is selected by the header timestamp, sub-second nanos included.
    let header = reservation_header(acct, 0);
    let header = tollgate_core::types::PaymentMetadata {
        timestamp_ns: 90 * NANOS_PER_SECOND + 500_000_000,
        ..header
    };
    t.meterer.meter_request(&header, 5, &[0], at(95)).await.unwrap();

    assert_eq!(t.store.reservation_bin(acct, 1), 6);
    assert_eq!(t.store.reservation_bin(acct, 0), 0);
}
