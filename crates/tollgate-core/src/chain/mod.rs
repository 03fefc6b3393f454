//! Cached on-chain payment state.
//!
//! [`PaymentChainState`] polls an [`OnchainPaymentReader`] and publishes the global
//! payment parameters as an immutable snapshot replaced by atomic pointer swap, so
//! request handlers read chain state wait-free and never observe a half-updated
//! parameter set. Per-account records are cached and fetched through on miss.
//!
//! One instance is shared by `Arc` between the metering hot path and the background
//! refresh task; only the refresh task writes.

pub mod oracle;
pub mod state;

pub use oracle::{OnchainPaymentReader, OracleError};
pub use state::{ChainStateError, PaymentChainState};
