//! Read side of the on-chain payment contract.

use crate::types::{OnDemandPayment, PaymentParams, ReservedPayment};
use alloy_primitives::Address;
use async_trait::async_trait;
use thiserror::Error;

/// Transport-level failures reading payment state from chain.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("payment oracle transport error: {0}")]
    Transport(String),
}

/// On-chain payment oracle.
///
/// Implementations read the payment contract's current state. `Ok(None)` from the
/// per-account reads means the account is not registered on chain, which callers must
/// keep distinguishable from transport failure.
#[async_trait]
pub trait OnchainPaymentReader: Send + Sync {
    /// Current global payment parameters.
    async fn payment_params(&self) -> Result<PaymentParams, OracleError>;

    /// Reservation record for an account, if the account holds one.
    async fn reserved_payment(
        &self,
        account: Address,
    ) -> Result<Option<ReservedPayment>, OracleError>;

    /// On-demand deposit record for an account, if the account holds one.
    async fn on_demand_payment(
        &self,
        account: Address,
    ) -> Result<Option<OnDemandPayment>, OracleError>;
}
