//! Bridge Parameters
//!
//! Governance-controlled parameters for windows, slashing fractions,
//! thresholds and batch sizing.
//!
//! ## Windows (in blocks)
//!
//! | Parameter                        | Default | Governs                                   |
//! |----------------------------------|---------|-------------------------------------------|
//! | `signed_valsets_window`          | 10000   | signer-set confirmation deadline          |
//! | `signed_batches_window`          | 10000   | batch confirmation deadline               |
//! | `signed_claims_window`           | 10000   | attestation vote deadline                 |
//! | `unbond_slashing_valsets_window` | 10000   | grace window for unbonding validators     |

use common::EthAddress;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Decimal, StdError, StdResult};
use cw_storage_plus::Item;

use crate::checkpoint::string_to_bytes32;

// ============================================================================
// Constants
// ============================================================================

/// Default confirmation/vote window for all slashing passes (blocks)
pub const DEFAULT_SIGNED_WINDOW: u64 = 10_000;

/// Default batch timeout, 12 hours in milliseconds
pub const DEFAULT_TARGET_BATCH_TIMEOUT_MS: u64 = 43_200_000;

/// Default host chain block time in milliseconds
pub const DEFAULT_AVERAGE_BLOCK_TIME_MS: u64 = 5_000;

/// Default Ethereum block time in milliseconds
pub const DEFAULT_AVERAGE_ETHEREUM_BLOCK_TIME_MS: u64 = 15_000;

/// Default maximum number of transactions per batch
pub const DEFAULT_MAX_BATCH_SIZE: u32 = 100;

// ============================================================================
// Data Structures
// ============================================================================

#[cw_serde]
pub struct Params {
    /// Unique identifier mixed into every checkpoint, must fit in bytes32
    pub gravity_id: String,
    /// Address of the Gravity contract on Ethereum
    pub bridge_ethereum_address: EthAddress,
    /// Ethereum chain id the bridge contract lives on
    pub bridge_chain_id: u64,
    pub signed_valsets_window: u64,
    pub signed_batches_window: u64,
    pub signed_claims_window: u64,
    /// How long (ms) a batch stays executable on Ethereum
    pub target_batch_timeout: u64,
    pub average_block_time: u64,
    pub average_ethereum_block_time: u64,
    pub slash_fraction_valset: Decimal,
    pub slash_fraction_batch: Decimal,
    pub slash_fraction_claim: Decimal,
    pub unbond_slashing_valsets_window: u64,
    /// Fraction of bonded power needed to observe an attestation
    pub attestation_threshold: Decimal,
    /// Normalized power drift that triggers a new signer-set request
    pub valset_change_threshold: Decimal,
    pub max_batch_size: u32,
}

impl Params {
    /// Default parameters for a given bridge deployment
    pub fn default_for(gravity_id: impl Into<String>, bridge_ethereum_address: EthAddress) -> Self {
        Self {
            gravity_id: gravity_id.into(),
            bridge_ethereum_address,
            bridge_chain_id: 1,
            signed_valsets_window: DEFAULT_SIGNED_WINDOW,
            signed_batches_window: DEFAULT_SIGNED_WINDOW,
            signed_claims_window: DEFAULT_SIGNED_WINDOW,
            target_batch_timeout: DEFAULT_TARGET_BATCH_TIMEOUT_MS,
            average_block_time: DEFAULT_AVERAGE_BLOCK_TIME_MS,
            average_ethereum_block_time: DEFAULT_AVERAGE_ETHEREUM_BLOCK_TIME_MS,
            slash_fraction_valset: Decimal::permille(1),
            slash_fraction_batch: Decimal::permille(1),
            slash_fraction_claim: Decimal::permille(1),
            unbond_slashing_valsets_window: DEFAULT_SIGNED_WINDOW,
            attestation_threshold: Decimal::from_ratio(2u128, 3u128),
            valset_change_threshold: Decimal::percent(5),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn validate(&self) -> StdResult<()> {
        if self.gravity_id.is_empty() {
            return Err(StdError::generic_err("gravity_id must not be empty"));
        }
        string_to_bytes32(&self.gravity_id)?;

        for (name, window) in [
            ("signed_valsets_window", self.signed_valsets_window),
            ("signed_batches_window", self.signed_batches_window),
            ("signed_claims_window", self.signed_claims_window),
            (
                "unbond_slashing_valsets_window",
                self.unbond_slashing_valsets_window,
            ),
        ] {
            if window == 0 {
                return Err(StdError::generic_err(format!("{} must be positive", name)));
            }
        }

        if self.average_block_time == 0 || self.average_ethereum_block_time == 0 {
            return Err(StdError::generic_err("block times must be positive"));
        }
        if self.target_batch_timeout == 0 {
            return Err(StdError::generic_err("target_batch_timeout must be positive"));
        }

        for (name, fraction) in [
            ("slash_fraction_valset", self.slash_fraction_valset),
            ("slash_fraction_batch", self.slash_fraction_batch),
            ("slash_fraction_claim", self.slash_fraction_claim),
        ] {
            if fraction > Decimal::one() {
                return Err(StdError::generic_err(format!(
                    "{} {} exceeds 1",
                    name, fraction
                )));
            }
        }

        if self.attestation_threshold <= Decimal::percent(50)
            || self.attestation_threshold > Decimal::one()
        {
            return Err(StdError::generic_err(
                "attestation_threshold must be in (0.5, 1]",
            ));
        }
        if self.valset_change_threshold.is_zero() || self.valset_change_threshold > Decimal::one()
        {
            return Err(StdError::generic_err(
                "valset_change_threshold must be in (0, 1]",
            ));
        }
        if self.max_batch_size == 0 {
            return Err(StdError::generic_err("max_batch_size must be positive"));
        }
        Ok(())
    }

    /// Number of Ethereum blocks a new batch remains valid for
    pub fn batch_timeout_blocks(&self) -> u64 {
        self.target_batch_timeout / self.average_ethereum_block_time
    }
}

// ============================================================================
// Storage
// ============================================================================

pub const PARAMS: Item<Params> = Item::new("params");
