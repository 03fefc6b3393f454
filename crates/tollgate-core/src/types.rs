//! Core domain types for payment metering.
//!
//! # Type Categories
//!
//! ## Request Types
//! - [`PaymentMetadata`]: the payment header attached to every dispersal request
//!
//! ## Chain-Sourced Records
//! - [`ReservedPayment`]: a pre-committed per-account bandwidth allotment
//! - [`OnDemandPayment`]: the account's on-chain on-demand deposit
//! - [`PaymentParams`]: the global payment parameters, published as an immutable snapshot
//!
//! Account identifiers are 20-byte [`Address`]es and cumulative payments are [`U256`],
//! so payment sums and price products never wrap at 64 bits.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Nanoseconds per second, for converting header timestamps to whole seconds.
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Payment header carried by every dispersal request.
///
/// A zero [`cumulative_payment`](Self::cumulative_payment) selects the reservation path;
/// a strictly positive value selects the on-demand path. There is no fallback between
/// the two, even for accounts registered for both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    /// 20-byte account identifier of the paying client.
    pub account_id: Address,

    /// Nanoseconds since the unix epoch; identifies the reservation period the client
    /// claims to occupy.
    pub timestamp_ns: i64,

    /// Total payment the client has cumulatively committed, including this request.
    pub cumulative_payment: U256,
}

/// Pre-committed per-account bandwidth allotment, sourced from chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedPayment {
    /// Rate ceiling for the account, in symbols per second.
    pub symbols_per_second: u64,

    /// Start of the reservation validity window, seconds since the unix epoch.
    pub start_timestamp: u64,

    /// End of the reservation validity window (exclusive), seconds since the unix epoch.
    pub end_timestamp: u64,

    /// Quorum identifiers the reservation is allowed to disperse to.
    pub quorum_numbers: Vec<u8>,
}

impl ReservedPayment {
    /// True iff the reservation window covers the given nanosecond instant:
    /// `start <= timestamp_ns / 1e9 < end`.
    #[must_use]
    pub fn is_active_by_ns(&self, timestamp_ns: i64) -> bool {
        let secs = timestamp_ns.div_euclid(NANOS_PER_SECOND);
        secs >= 0 && secs as u64 >= self.start_timestamp && (secs as u64) < self.end_timestamp
    }

    /// Usage limit of one reservation bin for the given window length.
    #[must_use]
    pub fn bin_limit(&self, window_secs: u64) -> u64 {
        self.symbols_per_second.saturating_mul(window_secs)
    }
}

/// On-chain on-demand deposit for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnDemandPayment {
    /// Total deposit committed on chain; upper bound for any client-declared
    /// cumulative payment.
    pub cumulative_payment: U256,
}

/// Global payment parameters published on chain.
///
/// One immutable snapshot is produced per refresh tick and replaced by atomic pointer
/// swap; any decision referencing more than one field must sample a single snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentParams {
    /// Price of one symbol, in the payment token's smallest denomination.
    pub price_per_symbol: u64,

    /// Symbol quantum; every charge is rounded up to a multiple of this.
    pub min_num_symbols: u64,

    /// Length of one reservation period, in seconds.
    pub reservation_window: u64,

    /// Length of one global rate period, in seconds.
    pub global_rate_period_interval: u64,

    /// Aggregate on-demand throughput ceiling, in symbols per second.
    pub global_symbols_per_second: u64,

    /// Quorums every on-demand request must stay within.
    pub on_demand_quorum_numbers: Vec<u8>,
}

impl PaymentParams {
    /// Usage limit of one global on-demand bin.
    #[must_use]
    pub fn global_rate_limit(&self) -> u64 {
        self.global_symbols_per_second.saturating_mul(self.global_rate_period_interval)
    }
}
