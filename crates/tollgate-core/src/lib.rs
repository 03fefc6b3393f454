//! # Tollgate Core
//!
//! Payment metering engine for a decentralized data-availability dispersal service.
//!
//! A dispersal API server receives blob requests from clients; each request carries a
//! payment header ([`types::PaymentMetadata`]). Before admitting a request, the engine
//! decides whether the client is entitled to the requested bandwidth, atomically records
//! the consumption, and — for on-demand requests — enforces a strict
//! monotone-cumulative-payment invariant so that requests arriving out of order are
//! still accounted correctly.
//!
//! - **[`meter`]**: the [`Meterer`](meter::Meterer) entry point with its two admission
//!   paths — per-account reservation bins with overflow carry, and the on-demand
//!   payment ledger gated by a global rate bin.
//!
//! - **[`chain`]**: cached on-chain payment state, refreshed by a background task and
//!   published as an immutable snapshot via atomic pointer swap.
//!
//! - **[`store`]**: the external counter/ledger store contract. All atomicity the hot
//!   path relies on is pushed into this interface.
//!
//! - **[`config`]**, **[`metrics`]**, **[`types`]**: timing knobs, admission counters,
//!   and the shared domain types.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Meterer                            │
//! │  ┌──────────────────┐              ┌─────────────────────┐  │
//! │  │ reservation path │              │   on-demand path    │  │
//! │  └────────┬─────────┘              └──────────┬──────────┘  │
//! │           │      ┌───────────────────┐        │             │
//! │           └──────┤ PaymentChainState ├────────┤             │
//! │                  │ (ArcSwap snapshot)│        │             │
//! │                  └─────────▲─────────┘        │             │
//! └────────────────────────────│──────────────────│─────────────┘
//!                              │                  ▼
//!                   background refresh      LedgerStore
//!                   (OnchainPaymentReader)  (atomic bins + ordered ledger)
//! ```
//!
//! The engine owns no mutex on the hot path: parameter reads are wait-free snapshot
//! loads, and every counter update is an atomic add-and-fetch inside the store.

pub mod chain;
pub mod config;
pub mod meter;
pub mod metrics;
pub mod store;
pub mod types;
