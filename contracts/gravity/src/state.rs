//! State definitions for the Gravity bridge contract
//!
//! This module defines all storage structures and state maps: validator
//! mirror, delegate keys, signer sets, the outgoing pool, batches,
//! attestations and the token registry.

use common::{AssetInfo, EthAddress};
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary, Timestamp, Uint128};
use cw_storage_plus::{Item, Map};

use crate::claims::EventClaim;

// ============================================================================
// Core Configuration
// ============================================================================

/// Contract configuration
#[cw_serde]
pub struct Config {
    /// Admin address for parameter and registry management
    pub admin: Addr,
    /// Whether outgoing transfers are currently paused
    pub paused: bool,
}

/// Pending admin change proposal
#[cw_serde]
pub struct PendingAdmin {
    pub new_address: Addr,
    /// Block time when the change can be accepted
    pub execute_after: Timestamp,
}

// ============================================================================
// Validators (stake provider mirror)
// ============================================================================

#[cw_serde]
pub enum BondStatus {
    Bonded,
    Unbonding,
    Unbonded,
}

/// A validator as reported by the host staking module.
#[cw_serde]
pub struct ValidatorInfo {
    /// Operator address
    pub operator: Addr,
    /// Compact index referenced by attestation votes
    pub index: u32,
    /// Consensus voting power
    pub power: u64,
    pub status: BondStatus,
    /// Height at which the validator last entered the bonded set
    pub bonded_height: u64,
    /// Height at which the validator began unbonding, if it has
    pub unbonding_height: Option<u64>,
    pub jailed: bool,
}

impl ValidatorInfo {
    /// Bonded and not jailed
    pub fn is_active(&self) -> bool {
        self.status == BondStatus::Bonded && !self.jailed
    }
}

/// Keys a validator delegates to its orchestrator process.
#[cw_serde]
pub struct DelegateKeys {
    pub validator: Addr,
    /// Address that submits claims and confirmations
    pub orchestrator: Addr,
    /// Ethereum address that signs checkpoints
    pub eth_address: EthAddress,
}

// ============================================================================
// Signer Sets
// ============================================================================

/// One signer-set member as seen by the Ethereum contract.
#[cw_serde]
pub struct BridgeValidator {
    /// Power normalized to the u32 range
    pub power: u64,
    pub ethereum_address: EthAddress,
}

/// A signer-set request (snapshot of the bridge validators).
#[cw_serde]
pub struct Valset {
    pub nonce: u64,
    /// Host block height the snapshot was taken at
    pub height: u64,
    /// Sorted by power descending, then address ascending
    pub members: Vec<BridgeValidator>,
}

#[cw_serde]
pub struct ValsetConfirm {
    pub nonce: u64,
    pub validator: Addr,
    pub orchestrator: Addr,
    pub eth_address: EthAddress,
    /// 65-byte `r || s || v` signature over the checkpoint
    pub signature: Binary,
}

// ============================================================================
// Outgoing Pool & Batches
// ============================================================================

/// A pending transfer to Ethereum.
#[cw_serde]
pub struct OutgoingTransferTx {
    pub id: u64,
    pub sender: Addr,
    pub dest_address: EthAddress,
    pub token_contract: EthAddress,
    pub amount: Uint128,
    pub fee: Uint128,
}

#[cw_serde]
pub enum BatchStatus {
    /// Waiting for confirmations
    Pending,
    /// Enough confirmations collected to be relayed
    Submitted,
    /// Execution observed on Ethereum
    Observed,
    /// Timed out or superseded, transactions returned to the pool
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Submitted => "submitted",
            BatchStatus::Observed => "observed",
            BatchStatus::Cancelled => "cancelled",
        }
    }
}

#[cw_serde]
pub struct OutgoingTxBatch {
    pub batch_nonce: u64,
    pub token_contract: EthAddress,
    pub transactions: Vec<OutgoingTransferTx>,
    pub total_fee: Uint128,
    /// Host block height the batch was created at
    pub block: u64,
    pub created_at: Timestamp,
    /// Ethereum height after which the batch can no longer execute
    pub batch_timeout: u64,
    pub status: BatchStatus,
}

#[cw_serde]
pub struct BatchConfirm {
    pub nonce: u64,
    pub token_contract: EthAddress,
    pub validator: Addr,
    pub orchestrator: Addr,
    pub eth_address: EthAddress,
    pub signature: Binary,
}

// ============================================================================
// Attestations
// ============================================================================

/// Aggregate of all claims agreeing on `(event_nonce, claim_hash)`.
#[cw_serde]
pub struct Attestation {
    pub event_nonce: u64,
    pub claim_hash: Binary,
    pub claim: EventClaim,
    /// Validator indices that voted for this claim
    pub votes: Vec<u32>,
    pub observed: bool,
    /// Host block height of the first vote
    pub height: u64,
    /// Set when the claim was observed but applying it failed
    pub apply_error: Option<String>,
}

#[cw_serde]
pub struct LastObservedEthereumHeight {
    pub ethereum_height: u64,
    /// Host block height when it was observed
    pub cosmos_height: u64,
}

// ============================================================================
// Token Registry
// ============================================================================

#[cw_serde]
pub enum TokenOrigin {
    /// Native to this chain: locked on the way out, unlocked on deposit
    CosmosOriginated,
    /// Native to Ethereum: a CW20 voucher burned on the way out, minted on deposit
    EthOriginated,
}

#[cw_serde]
pub struct TokenMapping {
    pub asset: AssetInfo,
    pub token_contract: EthAddress,
    pub origin: TokenOrigin,
}

// ============================================================================
// Constants
// ============================================================================

/// Contract name for cw2 migration info
pub const CONTRACT_NAME: &str = "crates.io:gravity";

/// Contract version for cw2 migration info
pub const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// 7 days in seconds for admin change timelock
pub const ADMIN_TIMELOCK_DURATION: u64 = 604_800;

// ============================================================================
// Core State Storage
// ============================================================================

pub const CONFIG: Item<Config> = Item::new("config");

pub const PENDING_ADMIN: Item<PendingAdmin> = Item::new("pending_admin");

// ============================================================================
// Validator Storage
// ============================================================================

/// Key: operator address
pub const VALIDATORS: Map<&Addr, ValidatorInfo> = Map::new("validators");

/// Key: validator index, Value: operator address
pub const VALIDATOR_BY_INDEX: Map<u32, Addr> = Map::new("validator_by_index");

pub const NEXT_VALIDATOR_INDEX: Item<u32> = Item::new("next_validator_index");

/// Most recent height at which any validator began unbonding
pub const LAST_UNBONDING_HEIGHT: Item<u64> = Item::new("last_unbonding_height");

/// Key: validator operator address
pub const DELEGATE_KEYS: Map<&Addr, DelegateKeys> = Map::new("delegate_keys");

/// Key: orchestrator address, Value: validator operator address
pub const ORCHESTRATOR_VALIDATOR: Map<&Addr, Addr> = Map::new("orchestrator_validator");

/// Key: canonical Ethereum address, Value: validator operator address
pub const ETH_ADDRESS_VALIDATOR: Map<&str, Addr> = Map::new("eth_address_validator");

// ============================================================================
// Signer Set Storage
// ============================================================================

/// Key: valset nonce
pub const VALSETS: Map<u64, Valset> = Map::new("valsets");

/// Key: (valset nonce, validator operator)
pub const VALSET_CONFIRMS: Map<(u64, &Addr), ValsetConfirm> = Map::new("valset_confirms");

/// Nonce of the last signer set observed installed on Ethereum
pub const LAST_OBSERVED_VALSET_NONCE: Item<u64> = Item::new("last_observed_valset_nonce");

// ============================================================================
// Outgoing Pool Storage
// ============================================================================

pub const LAST_TX_POOL_ID: Item<u64> = Item::new("last_tx_pool_id");

/// Key: tx id
pub const OUTGOING_POOL: Map<u64, OutgoingTransferTx> = Map::new("outgoing_pool");

/// Fee-ordered index. Key: (token contract, fee, u64::MAX - id) so that a
/// descending scan yields the highest fee first and, among equal fees, the
/// lowest id first.
pub const POOL_FEE_INDEX: Map<(&str, u128, u64), ()> = Map::new("pool_fee_index");

/// Number of pooled transactions per token contract
pub const POOL_TOKEN_COUNTS: Map<&str, u64> = Map::new("pool_token_counts");

// ============================================================================
// Batch Storage
// ============================================================================

pub const LAST_BATCH_NONCE: Item<u64> = Item::new("last_batch_nonce");

/// Key: (token contract, batch nonce)
pub const OUTGOING_BATCHES: Map<(&str, u64), OutgoingTxBatch> = Map::new("outgoing_batches");

/// Key: (token contract, batch nonce, validator operator)
pub const BATCH_CONFIRMS: Map<(&str, u64, &Addr), BatchConfirm> = Map::new("batch_confirms");

// ============================================================================
// Attestation Storage
// ============================================================================

/// Key: (event nonce, claim hash)
pub const ATTESTATIONS: Map<(u64, &[u8]), Attestation> = Map::new("attestations");

/// Individual claims. Key: (event nonce, validator index, claim type byte || claim hash)
pub const CLAIMS: Map<(u64, u32, &[u8]), EventClaim> = Map::new("claims");

/// Key: validator operator, Value: last event nonce it submitted
pub const LAST_EVENT_NONCE_BY_VALIDATOR: Map<&Addr, u64> =
    Map::new("last_event_nonce_by_validator");

pub const LAST_OBSERVED_EVENT_NONCE: Item<u64> = Item::new("last_observed_event_nonce");

pub const LAST_OBSERVED_ETH_HEIGHT: Item<LastObservedEthereumHeight> =
    Item::new("last_observed_eth_height");

// ============================================================================
// Slashing Progress
// ============================================================================

pub const LAST_SLASHED_VALSET_NONCE: Item<u64> = Item::new("last_slashed_valset_nonce");

pub const LAST_SLASHED_BATCH_BLOCK: Item<u64> = Item::new("last_slashed_batch_block");

pub const LAST_SLASHED_CLAIM_NONCE: Item<u64> = Item::new("last_slashed_claim_nonce");

// ============================================================================
// Token Registry Storage
// ============================================================================

/// Key: asset key (denom or CW20 address)
pub const DENOM_TO_ERC20: Map<&str, TokenMapping> = Map::new("denom_to_erc20");

/// Key: canonical token contract address
pub const ERC20_TO_DENOM: Map<&str, TokenMapping> = Map::new("erc20_to_denom");
