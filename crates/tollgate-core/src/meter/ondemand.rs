//! On-demand admission path.
//!
//! On-demand requests are admitted against two gates: the account's payment ledger,
//! ordered by cumulative payment, and the process-wide global rate bin. The ledger
//! insert commits the payment record and runs first — the global cap is the looser
//! gate, and a payment-invariant rejection must not cost any writes. A failed global
//! step is compensated by deleting the just-inserted ledger row.

use crate::{
    meter::{errors::MeterError, period, pricing, validate_quorum},
    store::LedgerStore,
    types::{OnDemandPayment, PaymentMetadata, PaymentParams},
};
use std::time::SystemTime;
use tracing::info;

/// Admits an on-demand request, maintaining the per-account ledger invariants and the
/// global rate cap.
pub(crate) async fn serve_on_demand_request(
    store: &dyn LedgerStore,
    params: &PaymentParams,
    header: &PaymentMetadata,
    deposit: &OnDemandPayment,
    symbols_charged: u64,
    header_quorums: &[u8],
    received_at: SystemTime,
) -> Result<(), MeterError> {
    info!(account = %header.account_id, symbols_charged, "recording and validating on-demand usage");

    validate_quorum(header_quorums, &params.on_demand_quorum_numbers)?;
    validate_payment(store, params, header, deposit, symbols_charged).await?;

    // Point of commitment for the payment record.
    store.add_on_demand_payment(header, symbols_charged).await?;

    if let Err(err) = increment_global_bin_usage(store, params, symbols_charged, received_at).await
    {
        // Compensate the insert. If the delete itself fails the ledger row dangles and
        // the delete error wins; the operator must reconcile.
        store
            .remove_on_demand_payment(header.account_id, header.cumulative_payment)
            .await?;
        return Err(err);
    }

    Ok(())
}

/// Validates the header's cumulative payment against the on-chain deposit and both
/// ledger neighbors.
///
/// With `prev` the largest recorded payment strictly below the proposal and `next` the
/// smallest strictly above (zero when absent), admission requires
/// `prev + price(symbols_charged) <= cumulative_payment` and, when `next` exists,
/// `cumulative_payment + price(next_num_symbols) <= next` — so requests delivered out
/// of order still leave every adjacent pair priced correctly.
async fn validate_payment(
    store: &dyn LedgerStore,
    params: &PaymentParams,
    header: &PaymentMetadata,
    deposit: &OnDemandPayment,
    symbols_charged: u64,
) -> Result<(), MeterError> {
    if header.cumulative_payment > deposit.cumulative_payment {
        return Err(MeterError::DepositExceeded);
    }

    let neighbors = store
        .relevant_on_demand_records(header.account_id, header.cumulative_payment)
        .await?;

    let charge =
        pricing::payment_charged(symbols_charged, params.min_num_symbols, params.price_per_symbol);
    if neighbors.prev_payment.saturating_add(charge) > header.cumulative_payment {
        return Err(MeterError::InsufficientCumulativePayment);
    }

    if !neighbors.next_payment.is_zero() {
        let next_charge = pricing::payment_charged(
            neighbors.next_num_symbols,
            params.min_num_symbols,
            params.price_per_symbol,
        );
        if header.cumulative_payment.saturating_add(next_charge) > neighbors.next_payment {
            return Err(MeterError::CumulativePaymentConflict);
        }
    }

    Ok(())
}

/// Books the symbols into the global per-period bin and enforces the aggregate cap.
async fn increment_global_bin_usage(
    store: &dyn LedgerStore,
    params: &PaymentParams,
    symbols_charged: u64,
    received_at: SystemTime,
) -> Result<(), MeterError> {
    let global_period = period::reservation_period(
        period::unix_seconds(received_at),
        params.global_rate_period_interval,
    );

    let new_usage = store.update_global_bin(global_period, symbols_charged).await?;
    if new_usage > params.global_rate_limit() {
        return Err(MeterError::GlobalRateExceeded);
    }
    Ok(())
}
