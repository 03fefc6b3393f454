//! Chargeable symbol and price computation.

use alloy_primitives::U256;

/// Symbols charged for a request of `num_symbols`: at least the quantum, otherwise the
/// nearest rounded-up multiple of it. Saturates to `u64::MAX` instead of wrapping.
///
/// A zero quantum degrades to charging the raw symbol count.
#[must_use]
pub fn symbols_charged(num_symbols: u64, min_num_symbols: u64) -> u64 {
    if min_num_symbols == 0 {
        return num_symbols;
    }
    if num_symbols <= min_num_symbols {
        return min_num_symbols;
    }
    num_symbols
        .div_ceil(min_num_symbols)
        .checked_mul(min_num_symbols)
        .unwrap_or(u64::MAX)
}

/// Chargeable price for a request of `num_symbols`, after quantum rounding.
///
/// The product is computed in 256 bits; cumulative payment arithmetic never relies on
/// 64-bit headroom.
#[must_use]
pub fn payment_charged(num_symbols: u64, min_num_symbols: u64, price_per_symbol: u64) -> U256 {
    U256::from(symbols_charged(num_symbols, min_num_symbols)) * U256::from(price_per_symbol)
}
