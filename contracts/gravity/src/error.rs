//! Error types for the Gravity bridge contract

use common::EthAddressError;
use cosmwasm_std::{OverflowError, StdError, Uint128};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    // ========================================================================
    // Authorization Errors
    // ========================================================================

    #[error("Unauthorized: only admin can perform this action")]
    Unauthorized,

    #[error("Unauthorized: only pending admin can accept")]
    UnauthorizedPendingAdmin,

    #[error("No pending admin change")]
    NoPendingAdmin,

    #[error("Timelock not expired: {remaining_seconds} seconds remaining")]
    TimelockNotExpired { remaining_seconds: u64 },

    #[error("Bridge is paused")]
    BridgePaused,

    // ========================================================================
    // Validator & Delegate Key Errors
    // ========================================================================

    #[error("Unknown validator: {address}")]
    UnknownValidator { address: String },

    #[error("Validator {address} is not in the active set")]
    InactiveValidator { address: String },

    #[error("Address {address} is not a registered orchestrator")]
    UnknownOrchestrator { address: String },

    #[error("Delegate keys already set: {reason}")]
    DuplicateDelegateKeys { reason: String },

    #[error("Invalid Ethereum address: {reason}")]
    InvalidEthAddress { reason: String },

    // ========================================================================
    // Claim & Attestation Errors
    // ========================================================================

    #[error("Non contiguous event nonce: expected {expected}, got {got}")]
    NonContiguousNonce { expected: u64, got: u64 },

    #[error("Validator already voted on attestation at nonce {nonce}")]
    DuplicateVote { nonce: u64 },

    #[error("Attestation {nonce} observed but applying it failed: {reason}")]
    AttestationApplyFailure { nonce: u64, reason: String },

    #[error("Out of order attestation application: expected nonce {expected}, got {got}")]
    OutOfOrderApplication { expected: u64, got: u64 },

    #[error("Invalid claim: {reason}")]
    InvalidClaim { reason: String },

    // ========================================================================
    // Confirmation Errors
    // ========================================================================

    #[error("Unknown nonce: {nonce}")]
    UnknownNonce { nonce: u64 },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Confirmation already submitted for nonce {nonce}")]
    DuplicateConfirmation { nonce: u64 },

    // ========================================================================
    // Pool & Batch Errors
    // ========================================================================

    #[error("No pending transactions for token {token_contract}")]
    EmptyPool { token_contract: String },

    #[error("Invalid batch size {size}: must be between 1 and {max}")]
    InvalidBatchSize { size: u32, max: u32 },

    #[error("New batch fee {new_fee} does not exceed outstanding batch fee {existing_fee}")]
    BatchNotMoreProfitable {
        new_fee: Uint128,
        existing_fee: Uint128,
    },

    #[error("Token not supported: {token}")]
    TokenNotSupported { token: String },

    #[error("Token already registered: {token}")]
    TokenAlreadyRegistered { token: String },

    #[error("No funds sent")]
    NoFundsSent,

    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Transfer {id} is not in the outgoing pool")]
    UnknownTransaction { id: u64 },

    #[error("Only the sender of transfer {id} can cancel it")]
    NotTransactionSender { id: u64 },
}

impl From<EthAddressError> for ContractError {
    fn from(err: EthAddressError) -> Self {
        ContractError::InvalidEthAddress {
            reason: err.to_string(),
        }
    }
}
