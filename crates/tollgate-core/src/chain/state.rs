//! Cached view of on-chain payment state.
//!
//! # Thread Safety
//!
//! The parameter snapshot is an `ArcSwap`: readers are wait-free and always see an
//! internally consistent [`PaymentParams`]. A refresh in flight never invalidates an
//! admission decision that already sampled the prior snapshot. Per-account records live
//! in `DashMap`s and are only written by fetch-through misses and the refresh task.

use crate::{
    chain::oracle::{OnchainPaymentReader, OracleError},
    types::{OnDemandPayment, PaymentParams, ReservedPayment},
};
use alloy_primitives::Address;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::debug;

/// Failures reading cached or on-chain payment state.
#[derive(Debug, Error)]
pub enum ChainStateError {
    /// The account has no record on chain. Distinguishable from transport failure so
    /// the meterer can reject the request rather than retry it.
    #[error("account {0} is not registered for payments on chain")]
    AccountNotRegistered(Address),

    #[error("payment oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("chain read timed out after {0:?}")]
    Timeout(Duration),
}

/// Periodically refreshed cache of on-chain payment state.
pub struct PaymentChainState {
    oracle: Arc<dyn OnchainPaymentReader>,
    chain_read_timeout: Duration,
    params: ArcSwap<PaymentParams>,
    reservations: DashMap<Address, ReservedPayment>,
    on_demand: DashMap<Address, OnDemandPayment>,
}

impl PaymentChainState {
    /// Creates the cache and performs the initial chain read.
    pub async fn new(
        oracle: Arc<dyn OnchainPaymentReader>,
        chain_read_timeout: Duration,
    ) -> Result<Self, ChainStateError> {
        let state = Self {
            oracle,
            chain_read_timeout,
            params: ArcSwap::from_pointee(PaymentParams::default()),
            reservations: DashMap::new(),
            on_demand: DashMap::new(),
        };
        state.refresh().await?;
        Ok(state)
    }

    /// Returns the current parameter snapshot.
    ///
    /// Any decision referencing more than one parameter must sample this once and reuse
    /// the returned snapshot; the single-field getters below each load a fresh one.
    #[must_use]
    pub fn params(&self) -> Arc<PaymentParams> {
        self.params.load_full()
    }

    #[must_use]
    pub fn price_per_symbol(&self) -> u64 {
        self.params.load().price_per_symbol
    }

    #[must_use]
    pub fn min_num_symbols(&self) -> u64 {
        self.params.load().min_num_symbols
    }

    #[must_use]
    pub fn reservation_window(&self) -> u64 {
        self.params.load().reservation_window
    }

    #[must_use]
    pub fn global_rate_period_interval(&self) -> u64 {
        self.params.load().global_rate_period_interval
    }

    #[must_use]
    pub fn global_symbols_per_second(&self) -> u64 {
        self.params.load().global_symbols_per_second
    }

    #[must_use]
    pub fn on_demand_quorum_numbers(&self) -> Vec<u8> {
        self.params.load().on_demand_quorum_numbers.clone()
    }

    /// Re-reads the global parameters and every cached account record, bounded by the
    /// chain read deadline.
    ///
    /// On failure the prior snapshot and cached records stay in effect (stale-on-error).
    /// An account that has disappeared on chain is evicted so later lookups report
    /// not-found.
    pub async fn refresh(&self) -> Result<(), ChainStateError> {
        tokio::time::timeout(self.chain_read_timeout, self.refresh_inner())
            .await
            .map_err(|_| ChainStateError::Timeout(self.chain_read_timeout))?
    }

    async fn refresh_inner(&self) -> Result<(), ChainStateError> {
        let params = self.oracle.payment_params().await?;
        self.params.store(Arc::new(params));

        // Collect keys first; holding DashMap guards across awaits would pin shard locks.
        let accounts: Vec<Address> = self.reservations.iter().map(|e| *e.key()).collect();
        for account in accounts {
            match self.oracle.reserved_payment(account).await? {
                Some(reservation) => {
                    self.reservations.insert(account, reservation);
                }
                None => {
                    self.reservations.remove(&account);
                }
            }
        }

        let accounts: Vec<Address> = self.on_demand.iter().map(|e| *e.key()).collect();
        for account in accounts {
            match self.oracle.on_demand_payment(account).await? {
                Some(deposit) => {
                    self.on_demand.insert(account, deposit);
                }
                None => {
                    self.on_demand.remove(&account);
                }
            }
        }

        debug!("refreshed on-chain payment state");
        Ok(())
    }

    /// Reservation record for an account, served from cache or fetched through.
    pub async fn reserved_payment(
        &self,
        account: Address,
    ) -> Result<ReservedPayment, ChainStateError> {
        if let Some(reservation) = self.reservations.get(&account) {
            return Ok(reservation.clone());
        }

        let fetched = self
            .read_with_deadline(self.oracle.reserved_payment(account))
            .await??
            .ok_or(ChainStateError::AccountNotRegistered(account))?;
        self.reservations.insert(account, fetched.clone());
        Ok(fetched)
    }

    /// On-demand deposit record for an account, served from cache or fetched through.
    pub async fn on_demand_payment(
        &self,
        account: Address,
    ) -> Result<OnDemandPayment, ChainStateError> {
        if let Some(deposit) = self.on_demand.get(&account) {
            return Ok(*deposit);
        }

        let fetched = self
            .read_with_deadline(self.oracle.on_demand_payment(account))
            .await??
            .ok_or(ChainStateError::AccountNotRegistered(account))?;
        self.on_demand.insert(account, fetched);
        Ok(fetched)
    }

    async fn read_with_deadline<T>(
        &self,
        read: impl std::future::Future<Output = Result<T, OracleError>>,
    ) -> Result<Result<T, OracleError>, ChainStateError> {
        tokio::time::timeout(self.chain_read_timeout, read)
            .await
            .map_err(|_| ChainStateError::Timeout(self.chain_read_timeout))
    }
}
