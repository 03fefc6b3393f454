//! Admission error kinds.

use crate::{chain::state::ChainStateError, store::StoreError};
use alloy_primitives::Address;
use thiserror::Error;

/// Rejections and failures surfaced by [`Meterer::meter_request`](super::Meterer::meter_request).
///
/// Every rejection propagates with its cause; nothing is swallowed. The only
/// compensating action behind any of these is the on-demand ledger delete after a failed
/// global-bin step — reservation-bin increments are never rolled back.
#[derive(Debug, Error)]
pub enum MeterError {
    /// The account has no reservation or on-demand record on chain.
    #[error("account {0} is not registered for payments on chain")]
    AccountNotRegistered(Address),

    #[error("reservation not active at the request timestamp")]
    ReservationInactive,

    /// Empty or unauthorized quorum set; the message names the offender.
    #[error("invalid quorum settings: {0}")]
    QuorumMismatch(String),

    /// The claimed period is neither current nor previous, or lies outside the
    /// reservation's own period range.
    #[error("invalid reservation period for reservation")]
    InvalidReservationPeriod,

    /// The reservation bin had already reached its limit before this request.
    #[error("reservation bin has already been filled")]
    BinAlreadyFilled,

    /// The overflow cannot be absorbed by the carry bin.
    #[error("overflow usage exceeds bin limit")]
    OverflowExceedsBinLimit,

    /// The cumulative payment does not cover the predecessor plus this request's price.
    #[error("insufficient cumulative payment increment")]
    InsufficientCumulativePayment,

    /// Admitting the request would break the increment already promised to a
    /// later-recorded payment delivered out of order.
    #[error("breaking cumulative payment invariants for a later request")]
    CumulativePaymentConflict,

    #[error("request claims a cumulative payment greater than the on-chain deposit")]
    DepositExceeded,

    /// The global on-demand bin is saturated; the ledger insert has been compensated.
    #[error("global bin usage overflows")]
    GlobalRateExceeded,

    #[error("ledger store error: {0}")]
    Store(#[from] StoreError),

    #[error("chain state error: {0}")]
    ChainState(ChainStateError),
}

impl MeterError {
    /// Static label for metrics.
    #[must_use]
    pub fn as_metric_label(&self) -> &'static str {
        match self {
            Self::AccountNotRegistered(_) => "account_not_registered",
            Self::ReservationInactive => "reservation_inactive",
            Self::QuorumMismatch(_) => "quorum_mismatch",
            Self::InvalidReservationPeriod => "invalid_reservation_period",
            Self::BinAlreadyFilled => "bin_already_filled",
            Self::OverflowExceedsBinLimit => "overflow_exceeds_bin_limit",
            Self::InsufficientCumulativePayment => "insufficient_cumulative_payment",
            Self::CumulativePaymentConflict => "cumulative_payment_conflict",
            Self::DepositExceeded => "deposit_exceeded",
            Self::GlobalRateExceeded => "global_rate_exceeded",
            Self::Store(_) => "store_error",
            Self::ChainState(_) => "chain_state_error",
        }
    }
}

/// Missing per-account records become [`MeterError::AccountNotRegistered`]; everything
/// else stays a chain-state failure.
impl From<ChainStateError> for MeterError {
    fn from(err: ChainStateError) -> Self {
        match err {
            ChainStateError::AccountNotRegistered(account) => Self::AccountNotRegistered(account),
            other => Self::ChainState(other),
        }
    }
}
