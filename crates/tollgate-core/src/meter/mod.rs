//! Payment metering engine.
//!
//! [`Meterer`] is the single entry point the dispersal front end drives: every blob
//! request's payment header goes through [`Meterer::meter_request`], which decides
//! whether the client is entitled to the requested bandwidth and atomically records the
//! consumption.
//!
//! # Request Flow
//!
//! ```text
//!   PaymentMetadata + numSymbols + quorums + receivedAt
//!        │
//!        ▼
//!   sample PaymentParams snapshot, compute symbolsCharged
//!        │
//!        ├── cumulativePayment == 0 ──► reservation path
//!        │       activity ► quorums ► period ► bin increment (+ overflow carry)
//!        │
//!        └── cumulativePayment  > 0 ──► on-demand path
//!                quorums ► deposit ► ledger neighbors ► insert ► global bin
//!                                                      (compensating delete on failure)
//! ```
//!
//! The parameter snapshot is sampled exactly once per request, so a concurrent refresh
//! never splits one admission decision across two parameter sets.

pub mod errors;
pub mod ondemand;
pub mod period;
pub mod pricing;
pub mod reservation;

pub use errors::MeterError;

use crate::{
    chain::state::PaymentChainState,
    config::{ConfigError, MetererConfig},
    store::LedgerStore,
    types::{PaymentMetadata, PaymentParams},
};
use alloy_primitives::U256;
use std::{sync::Arc, time::SystemTime};
use tokio::{sync::broadcast, task::JoinHandle, time::interval};
use tracing::{debug, warn};

/// Payment accounting across accounts.
///
/// Calls are independent and may run concurrently from any number of request-handler
/// tasks; all per-account serialization is delegated to the [`LedgerStore`].
pub struct Meterer {
    config: MetererConfig,
    chain_state: Arc<PaymentChainState>,
    store: Arc<dyn LedgerStore>,
}

impl Meterer {
    /// Builds a meterer over the shared chain-state cache and ledger store.
    pub fn new(
        config: MetererConfig,
        chain_state: Arc<PaymentChainState>,
        store: Arc<dyn LedgerStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, chain_state, store })
    }

    /// Shared chain-state cache backing this meterer.
    #[must_use]
    pub fn chain_state(&self) -> &Arc<PaymentChainState> {
        &self.chain_state
    }

    /// Spawns the periodic on-chain state refresh loop.
    ///
    /// The loop ticks every `update_interval`; each tick re-reads payment state under
    /// the chain read deadline. Refresh failures are logged and the prior snapshot stays
    /// in effect. The task exits when the shutdown channel signals or closes.
    #[must_use]
    pub fn start(&self, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let chain_state = self.chain_state.clone();
        let update_interval = self.config.update_interval();

        tokio::spawn(async move {
            let mut ticker = interval(update_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = chain_state.refresh().await {
                            warn!(error = %e, "failed to refresh on-chain payment state");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("payment state refresh loop shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Validates a request's payment metadata and books its bandwidth.
    ///
    /// Samples the parameter snapshot once, computes the chargeable symbols, and admits
    /// the request through the reservation path (zero cumulative payment) or the
    /// on-demand path (non-zero). There is no fallback between the paths. On success
    /// returns the symbols charged — the sole quantity used for accounting.
    ///
    /// Cancellation: dropping this future between a committed store write and its
    /// follow-up (overflow carry, global-bin compensation) leaves that write in place;
    /// the request's accounting status is then undefined and the operator must
    /// reconcile.
    pub async fn meter_request(
        &self,
        header: &PaymentMetadata,
        num_symbols: u64,
        header_quorums: &[u8],
        received_at: SystemTime,
    ) -> Result<u64, MeterError> {
        let params = self.chain_state.params();
        let symbols_charged = pricing::symbols_charged(num_symbols, params.min_num_symbols);
        debug!(
            account = %header.account_id,
            num_symbols,
            symbols_charged,
            "validating incoming request's payment metadata"
        );

        let path = if header.cumulative_payment.is_zero() { "reservation" } else { "on_demand" };
        match self
            .route(&params, header, symbols_charged, header_quorums, received_at)
            .await
        {
            Ok(()) => {
                crate::metrics::record_admission(path, "accepted");
                crate::metrics::record_symbols_charged(path, symbols_charged);
                Ok(symbols_charged)
            }
            Err(err) => {
                crate::metrics::record_admission(path, err.as_metric_label());
                Err(err)
            }
        }
    }

    async fn route(
        &self,
        params: &PaymentParams,
        header: &PaymentMetadata,
        symbols_charged: u64,
        header_quorums: &[u8],
        received_at: SystemTime,
    ) -> Result<(), MeterError> {
        if header.cumulative_payment.is_zero() {
            let reservation = self.chain_state.reserved_payment(header.account_id).await?;
            reservation::serve_reservation_request(
                self.store.as_ref(),
                params,
                header,
                &reservation,
                symbols_charged,
                header_quorums,
                received_at,
            )
            .await
        } else {
            let deposit = self.chain_state.on_demand_payment(header.account_id).await?;
            ondemand::serve_on_demand_request(
                self.store.as_ref(),
                params,
                header,
                &deposit,
                symbols_charged,
                header_quorums,
                received_at,
            )
            .await
        }
    }

    /// Chargeable symbols for a request of `num_symbols`, under the current snapshot.
    #[must_use]
    pub fn symbols_charged(&self, num_symbols: u64) -> u64 {
        pricing::symbols_charged(num_symbols, self.chain_state.min_num_symbols())
    }

    /// Chargeable price for a request of `num_symbols`, under the current snapshot.
    #[must_use]
    pub fn payment_charged(&self, num_symbols: u64) -> U256 {
        let params = self.chain_state.params();
        pricing::payment_charged(num_symbols, params.min_num_symbols, params.price_per_symbol)
    }
}

/// Ensures every quorum in the header is present within `allowed_quorums`.
///
/// A reservation that does not use all of its allowed quorums is still accepted (it
/// still charges against all of them); a single unknown quorum fails the whole request.
pub(crate) fn validate_quorum(header_quorums: &[u8], allowed_quorums: &[u8]) -> Result<(), MeterError> {
    if header_quorums.is_empty() {
        return Err(MeterError::QuorumMismatch("no quorum numbers in payment header".to_string()));
    }
    for quorum in header_quorums {
        if !allowed_quorums.contains(quorum) {
            return Err(MeterError::QuorumMismatch(format!("quorum number mismatch: {quorum}")));
        }
    }
    Ok(())
}
