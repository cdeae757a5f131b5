//! Gravity Bridge Contract - Ethereum Bridge Core for CosmWasm Chains
//!
//! Validators run orchestrators that watch the Gravity contract on Ethereum
//! and sign checkpoints for it. This contract holds the chain-side state.
//!
//! # Incoming Flow (Ethereum → Cosmos)
//! 1. Orchestrators submit claims for Ethereum events with contiguous event nonces
//! 2. Claims that agree are aggregated into an attestation
//! 3. Once more than the threshold of bonded power votes, the attestation is
//!    observed and applied, strictly in event nonce order
//!
//! # Outgoing Flow (Cosmos → Ethereum)
//! 1. Users send funds with `SendToEth`; transfers wait in a fee-ordered pool
//! 2. Transfers are bundled into per-token batches
//! 3. Validators sign the batch checkpoint and a relayer submits it to Ethereum
//! 4. A `BatchExecuted` claim finalizes the batch
//!
//! # Signer Sets
//! The end blocker snapshots the bridge validator set when stake changes and
//! slashes validators that fail to sign sets, batches or claims in time.

pub mod abci;
pub mod attestation;
pub mod batch;
pub mod checkpoint;
pub mod claims;
pub mod confirm;
pub mod contract;
pub mod error;
mod execute;
pub mod keys;
pub mod msg;
pub mod params;
pub mod pool;
mod query;
pub mod slashing;
pub mod staking;
pub mod state;
pub mod storage_cache;
mod sudo;
pub mod token_registry;
pub mod valset;

pub use crate::error::ContractError;
pub use crate::params::Params;
