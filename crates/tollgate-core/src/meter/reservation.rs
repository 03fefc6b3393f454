//! Reservation-backed admission path.
//!
//! Admission checks run in order and short-circuit on first failure: reservation
//! activity, quorum subset, period validity, then the atomic bin increment with its
//! single-step overflow carry.

use crate::{
    meter::{errors::MeterError, period, validate_quorum},
    store::LedgerStore,
    types::{PaymentMetadata, PaymentParams, ReservedPayment},
};
use std::time::SystemTime;
use tracing::info;

/// Admits a reservation-backed request and books its symbols into a period bin.
pub(crate) async fn serve_reservation_request(
    store: &dyn LedgerStore,
    params: &PaymentParams,
    header: &PaymentMetadata,
    reservation: &ReservedPayment,
    symbols_charged: u64,
    header_quorums: &[u8],
    received_at: SystemTime,
) -> Result<(), MeterError> {
    info!(account = %header.account_id, symbols_charged, "recording and validating reservation usage");

    if !reservation.is_active_by_ns(header.timestamp_ns) {
        return Err(MeterError::ReservationInactive);
    }
    validate_quorum(header_quorums, &reservation.quorum_numbers)?;

    let request_period =
        period::reservation_period_from_nanos(header.timestamp_ns, params.reservation_window);
    if !is_valid_reservation_period(reservation, params.reservation_window, request_period, received_at)
    {
        return Err(MeterError::InvalidReservationPeriod);
    }

    increment_bin_usage(store, params, header, reservation, symbols_charged, request_period).await
}

/// A claimed period is valid when it is the current or the previous period and lies
/// within the reservation's own period range.
fn is_valid_reservation_period(
    reservation: &ReservedPayment,
    window: u64,
    request_period: u64,
    received_at: SystemTime,
) -> bool {
    let current_period = period::reservation_period(period::unix_seconds(received_at), window);
    let is_current_or_previous =
        request_period == current_period || current_period.checked_sub(1) == Some(request_period);

    let start_period = period::reservation_period(reservation.start_timestamp as i64, window);
    let end_period = period::reservation_period(reservation.end_timestamp as i64, window);
    is_current_or_previous && start_period <= request_period && request_period < end_period
}

/// Atomically increments the account's period bin and applies the single-step overflow
/// carry.
///
/// The carry lands in `period + 2`, not `period + 1`: the immediately following period
/// stays pristine because it is still addressable as "previous" by late-arriving
/// requests. The primary increment is a committed usage charge either way — a failed
/// carry write surfaces the store's error without rolling it back.
async fn increment_bin_usage(
    store: &dyn LedgerStore,
    params: &PaymentParams,
    header: &PaymentMetadata,
    reservation: &ReservedPayment,
    symbols_charged: u64,
    request_period: u64,
) -> Result<(), MeterError> {
    let new_usage = store
        .update_reservation_bin(header.account_id, request_period, symbols_charged)
        .await?;

    let limit = reservation.bin_limit(params.reservation_window);
    if new_usage <= limit {
        return Ok(());
    }
    if new_usage - symbols_charged >= limit {
        // Usage had already reached the limit before this request.
        return Err(MeterError::BinAlreadyFilled);
    }

    let end_period =
        period::reservation_period(reservation.end_timestamp as i64, params.reservation_window);
    let carry_period = request_period.saturating_add(2);
    if new_usage <= limit.saturating_mul(2) && carry_period <= end_period {
        store
            .update_reservation_bin(header.account_id, carry_period, new_usage - limit)
            .await?;
        return Ok(());
    }

    Err(MeterError::OverflowExceedsBinLimit)
}
