//! Message types for the Gravity bridge contract
//!
//! Execute messages come from validators' orchestrators, users and the admin.
//! Sudo messages come from the host chain: the end blocker and the staking
//! module's validator updates.

use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Binary, Timestamp, Uint128};

use crate::claims::ClaimPayload;
use crate::params::Params;
use crate::state::{
    Attestation, BatchConfirm, DelegateKeys, LastObservedEthereumHeight, OutgoingTransferTx,
    OutgoingTxBatch, TokenMapping, ValidatorInfo, Valset, ValsetConfirm,
};

// ============================================================================
// Instantiate & Migrate
// ============================================================================

#[cw_serde]
pub struct MigrateMsg {}

#[cw_serde]
pub struct InstantiateMsg {
    /// Admin address for parameter and registry management
    pub admin: String,
    pub params: Params,
}

// ============================================================================
// Execute Messages
// ============================================================================

#[cw_serde]
pub enum ExecuteMsg {
    // ========================================================================
    // Validators
    // ========================================================================
    /// Delegate an orchestrator and an Ethereum signing key.
    ///
    /// Authorization: validator operator, once
    SetOrchestratorAddress {
        orchestrator: String,
        eth_address: String,
    },

    /// Report an event observed on Ethereum.
    ///
    /// Authorization: orchestrator of an active validator
    SubmitClaim {
        event_nonce: u64,
        eth_block_height: u64,
        claim: ClaimPayload,
    },

    /// Sign a requested signer set.
    ///
    /// Authorization: orchestrator
    ValsetConfirm { nonce: u64, signature: Binary },

    /// Sign an outgoing batch.
    ///
    /// Authorization: orchestrator
    BatchConfirm {
        token_contract: String,
        nonce: u64,
        signature: Binary,
    },

    // ========================================================================
    // Users
    // ========================================================================
    /// Send native funds to Ethereum. Exactly one coin, `amount + bridge_fee`.
    SendToEth {
        eth_dest: String,
        bridge_fee: Uint128,
    },

    /// CW20 entry point, carrying a [`ReceiveMsg`]
    Receive(cw20::Cw20ReceiveMsg),

    /// Withdraw an unbatched transfer from the pool and get a refund.
    ///
    /// Authorization: original sender
    CancelSendToEth { transaction_id: u64 },

    /// Build a batch for a token. Anyone may call; the batch must beat the
    /// fees of every outstanding batch for the same token.
    RequestBatch {
        token_contract: String,
        max_size: Option<u32>,
    },

    // ========================================================================
    // Admin
    // ========================================================================
    /// Map an Ethereum-native ERC20 to a CW20 voucher this contract can mint.
    RegisterEthToken { token_contract: String, cw20: String },

    UpdateParams { params: Params },

    /// Stop accepting outgoing transfers
    Pause {},

    Unpause {},

    /// Propose a new admin (starts the timelock)
    ProposeAdmin { new_admin: String },

    /// Accept the pending admin role after the timelock
    AcceptAdmin {},

    CancelAdminProposal {},
}

/// Messages embedded in a CW20 `Send`
#[cw_serde]
pub enum ReceiveMsg {
    SendToEth {
        eth_dest: String,
        bridge_fee: Uint128,
    },
}

// ============================================================================
// Sudo Messages
// ============================================================================

/// Calls made by the host chain
#[cw_serde]
pub enum SudoMsg {
    /// Run slashing, tallying, signer-set requests, batch maintenance and pruning
    EndBlocker {},
    /// A validator's consensus power changed or it entered the bonded set
    SetValidatorPower { operator: String, power: u64 },
    BeginUnbonding { operator: String },
    CompleteUnbonding { operator: String },
    Unjail { operator: String },
}

// ============================================================================
// Query Messages
// ============================================================================

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[returns(Params)]
    Params {},

    #[returns(ConfigResponse)]
    Config {},

    #[returns(Option<PendingAdminResponse>)]
    PendingAdmin {},

    // ========================================================================
    // Signer sets
    // ========================================================================
    /// Signer set derived from current stake
    #[returns(Valset)]
    CurrentValset {},

    #[returns(Option<Valset>)]
    Valset { nonce: u64 },

    /// Most recent signer-set requests, newest first
    #[returns(ValsetsResponse)]
    LastValsetRequests { limit: Option<u32> },

    #[returns(ValsetConfirmsResponse)]
    ValsetConfirms { nonce: u64 },

    #[returns(NonceResponse)]
    LastObservedValsetNonce {},

    /// Requests the validator behind `orchestrator` has not confirmed yet
    #[returns(ValsetsResponse)]
    UnconfirmedValsets { orchestrator: String },

    // ========================================================================
    // Pool & batches
    // ========================================================================
    /// Outstanding batches, for one token or all
    #[returns(BatchesResponse)]
    PendingBatches { token_contract: Option<String> },

    #[returns(Option<OutgoingTxBatch>)]
    Batch { token_contract: String, nonce: u64 },

    #[returns(BatchConfirmsResponse)]
    BatchConfirms { token_contract: String, nonce: u64 },

    /// Batches the validator behind `orchestrator` has not confirmed yet
    #[returns(BatchesResponse)]
    UnconfirmedBatches { orchestrator: String },

    /// Pooled transfers in batch priority order
    #[returns(PoolResponse)]
    Pool {
        token_contract: String,
        limit: Option<u32>,
    },

    /// Fees a full-size batch would collect, per pooled token
    #[returns(BatchFeesResponse)]
    BatchFees {},

    // ========================================================================
    // Attestations
    // ========================================================================
    #[returns(AttestationsResponse)]
    Attestations {
        start_after: Option<u64>,
        limit: Option<u32>,
    },

    #[returns(NonceResponse)]
    LastObservedEventNonce {},

    #[returns(LastObservedEthereumHeight)]
    LastObservedEthHeight {},

    /// Last event nonce submitted by a validator, by operator or orchestrator address
    #[returns(NonceResponse)]
    LastEventNonceByAddress { address: String },

    // ========================================================================
    // Validators & keys
    // ========================================================================
    #[returns(Option<ValidatorInfo>)]
    Validator { operator: String },

    #[returns(ValidatorsResponse)]
    BondedValidators {},

    #[returns(Option<DelegateKeys>)]
    DelegateKeysByValidator { validator: String },

    #[returns(Option<DelegateKeys>)]
    DelegateKeysByOrchestrator { orchestrator: String },

    #[returns(Option<DelegateKeys>)]
    DelegateKeysByEthAddress { eth_address: String },

    // ========================================================================
    // Token registry
    // ========================================================================
    /// Mapping for a bank denom or `cw20:<address>`
    #[returns(Option<TokenMapping>)]
    DenomToErc20 { denom: String },

    #[returns(Option<TokenMapping>)]
    Erc20ToDenom { token_contract: String },

    // ========================================================================
    // Checkpoints
    // ========================================================================
    #[returns(CheckpointResponse)]
    ValsetCheckpoint { nonce: u64 },

    #[returns(CheckpointResponse)]
    BatchCheckpoint { token_contract: String, nonce: u64 },
}

// ============================================================================
// Query Responses
// ============================================================================

#[cw_serde]
pub struct ConfigResponse {
    pub admin: Addr,
    pub paused: bool,
}

#[cw_serde]
pub struct PendingAdminResponse {
    pub new_address: Addr,
    pub execute_after: Timestamp,
}

#[cw_serde]
pub struct ValsetsResponse {
    pub valsets: Vec<Valset>,
}

#[cw_serde]
pub struct ValsetConfirmsResponse {
    pub confirms: Vec<ValsetConfirm>,
}

#[cw_serde]
pub struct NonceResponse {
    pub nonce: u64,
}

#[cw_serde]
pub struct BatchesResponse {
    pub batches: Vec<OutgoingTxBatch>,
}

#[cw_serde]
pub struct BatchConfirmsResponse {
    pub confirms: Vec<BatchConfirm>,
}

#[cw_serde]
pub struct PoolResponse {
    pub transactions: Vec<OutgoingTransferTx>,
}

#[cw_serde]
pub struct BatchFee {
    pub token_contract: String,
    pub total_fees: Uint128,
    pub tx_count: u64,
}

#[cw_serde]
pub struct BatchFeesResponse {
    pub fees: Vec<BatchFee>,
}

#[cw_serde]
pub struct AttestationsResponse {
    pub attestations: Vec<Attestation>,
}

#[cw_serde]
pub struct ValidatorsResponse {
    pub validators: Vec<ValidatorInfo>,
}

#[cw_serde]
pub struct CheckpointResponse {
    /// 0x-prefixed hex of the 32-byte checkpoint
    pub checkpoint: String,
}
