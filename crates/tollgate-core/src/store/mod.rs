//! External counter and ledger store contract.
//!
//! The engine keeps no usage state of its own; all bin counters and the on-demand
//! payment ledger live behind [`LedgerStore`]. Per-account serialization is delegated
//! entirely to the store through its add-and-fetch semantics, so the metering hot path
//! needs no engine-owned locks.

use crate::types::PaymentMetadata;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use thiserror::Error;

/// Failures from the backing counter/ledger store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A ledger row already exists for this `(account, cumulative payment)` pair.
    #[error("duplicate payment record for account {account} at cumulative payment {cumulative_payment}")]
    DuplicatePayment { account: Address, cumulative_payment: U256 },

    /// Transport-level failure talking to the backing store.
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),
}

/// Strict neighbors of a proposed cumulative payment within one account's ledger.
///
/// `prev_payment` is the largest recorded cumulative payment strictly below the
/// proposal, `next_payment` the smallest strictly above, and `next_num_symbols` the
/// symbol count recorded with `next_payment`. Absent neighbors are encoded as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OnDemandNeighbors {
    pub prev_payment: U256,
    pub next_payment: U256,
    pub next_num_symbols: u64,
}

/// Atomic counters and the ordered on-demand payment ledger.
///
/// Implementations must linearize each single-counter increment: concurrent updates for
/// the same key produce a cumulative usage equal to the sum of their deltas, and every
/// caller observes a post-increment value consistent with that linearization.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Atomically adds `delta` symbols to the account's bin for `period` and returns the
    /// new usage.
    async fn update_reservation_bin(
        &self,
        account: Address,
        period: u64,
        delta: u64,
    ) -> Result<u64, StoreError>;

    /// Atomically adds `delta` symbols to the global on-demand bin for `period` and
    /// returns the new usage.
    async fn update_global_bin(&self, period: u64, delta: u64) -> Result<u64, StoreError>;

    /// Inserts a ledger row mapping the header's cumulative payment to `num_symbols`.
    ///
    /// Must fail cleanly with [`StoreError::DuplicatePayment`] when a row already exists
    /// for the same `(account, cumulative payment)` pair.
    async fn add_on_demand_payment(
        &self,
        header: &PaymentMetadata,
        num_symbols: u64,
    ) -> Result<(), StoreError>;

    /// Idempotent delete of a ledger row; used only as compensation after a failed
    /// global-bin step.
    async fn remove_on_demand_payment(
        &self,
        account: Address,
        cumulative_payment: U256,
    ) -> Result<(), StoreError>;

    /// Strict-less and strict-greater neighbors of `cumulative_payment` within the
    /// account's ledger.
    async fn relevant_on_demand_records(
        &self,
        account: Address,
        cumulative_payment: U256,
    ) -> Result<OnDemandNeighbors, StoreError>;
}
