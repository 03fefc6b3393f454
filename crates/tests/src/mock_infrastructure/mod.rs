//! Reusable mock infrastructure for exercising the metering engine without a real
//! counter store or chain connection.
//!
//! ## Components
//!
//! - [`MemoryLedgerStore`]: in-memory [`LedgerStore`](tollgate_core::store::LedgerStore)
//!   with linearized bin updates, ordered per-account ledgers, and failure injection
//! - [`MockPaymentOracle`]: scriptable
//!   [`OnchainPaymentReader`](tollgate_core::chain::oracle::OnchainPaymentReader)
//! - Test helpers for the standard scenario parameters and meterer wiring


pub use ledger::MemoryLedgerStore;
pub use oracle::MockPaymentOracle;
pub use test_helpers::*;
