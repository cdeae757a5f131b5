//! Query handlers for the Gravity bridge contract.

use common::EthAddress;
use cosmwasm_std::{Addr, Deps, Env, Order, StdError, StdResult, Uint128};
use cw_storage_plus::Bound;

use crate::attestation::{
    last_event_nonce_by_validator, last_observed_eth_height, last_observed_event_nonce,
};
use crate::batch::{all_batches, load_batch, outstanding_batches};
use crate::checkpoint::{batch_checkpoint, bytes32_to_hex, valset_checkpoint};
use crate::msg::{
    AttestationsResponse, BatchConfirmsResponse, BatchFee, BatchFeesResponse, BatchesResponse,
    CheckpointResponse, ConfigResponse, NonceResponse, PendingAdminResponse, PoolResponse,
    ValidatorsResponse, ValsetConfirmsResponse, ValsetsResponse,
};
use crate::params::{Params, PARAMS};
use crate::pool;
use crate::staking::{ContractStakingKeeper, StakingKeeper};
use crate::state::{
    DelegateKeys, LastObservedEthereumHeight, OutgoingTxBatch, TokenMapping, ValidatorInfo,
    Valset, ATTESTATIONS, BATCH_CONFIRMS, CONFIG, DELEGATE_KEYS, ETH_ADDRESS_VALIDATOR,
    LAST_OBSERVED_VALSET_NONCE, ORCHESTRATOR_VALIDATOR, PENDING_ADMIN, VALSETS, VALSET_CONFIRMS,
};
use crate::token_registry::{asset_from_denom, mapping_for_asset, mapping_for_token};
use crate::valset::current_valset;

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

fn parse_eth_address(input: &str) -> StdResult<EthAddress> {
    EthAddress::parse(input)
        .map_err(|err| StdError::generic_err(format!("invalid ethereum address {}: {}", input, err)))
}

/// Operator behind an orchestrator address.
fn validator_for_orchestrator(deps: Deps, orchestrator: &str) -> StdResult<Addr> {
    let orchestrator = deps.api.addr_validate(orchestrator)?;
    ORCHESTRATOR_VALIDATOR
        .may_load(deps.storage, &orchestrator)?
        .ok_or_else(|| StdError::not_found(format!("orchestrator {}", orchestrator)))
}

// ============================================================================
// Configuration
// ============================================================================

pub fn query_params(deps: Deps) -> StdResult<Params> {
    PARAMS.load(deps.storage)
}

pub fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        admin: config.admin,
        paused: config.paused,
    })
}

pub fn query_pending_admin(deps: Deps) -> StdResult<Option<PendingAdminResponse>> {
    let pending = PENDING_ADMIN.may_load(deps.storage)?;
    Ok(pending.map(|p| PendingAdminResponse {
        new_address: p.new_address,
        execute_after: p.execute_after,
    }))
}

// ============================================================================
// Signer Sets
// ============================================================================

pub fn query_current_valset(deps: Deps, env: Env) -> StdResult<Valset> {
    current_valset(deps.storage, &ContractStakingKeeper, &env)
}

pub fn query_valset(deps: Deps, nonce: u64) -> StdResult<Option<Valset>> {
    VALSETS.may_load(deps.storage, nonce)
}

pub fn query_last_valset_requests(deps: Deps, limit: Option<u32>) -> StdResult<ValsetsResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    let valsets = VALSETS
        .range(deps.storage, None, None, Order::Descending)
        .take(limit)
        .map(|item| item.map(|(_, valset)| valset))
        .collect::<StdResult<_>>()?;
    Ok(ValsetsResponse { valsets })
}

pub fn query_valset_confirms(deps: Deps, nonce: u64) -> StdResult<ValsetConfirmsResponse> {
    let confirms = VALSET_CONFIRMS
        .prefix(nonce)
        .range(deps.storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, confirm)| confirm))
        .collect::<StdResult<_>>()?;
    Ok(ValsetConfirmsResponse { confirms })
}

pub fn query_last_observed_valset_nonce(deps: Deps) -> StdResult<NonceResponse> {
    let nonce = LAST_OBSERVED_VALSET_NONCE
        .may_load(deps.storage)?
        .unwrap_or(0);
    Ok(NonceResponse { nonce })
}

/// Stored requests, oldest first, that the orchestrator's validator has not signed.
pub fn query_unconfirmed_valsets(deps: Deps, orchestrator: String) -> StdResult<ValsetsResponse> {
    let validator = validator_for_orchestrator(deps, &orchestrator)?;
    let mut valsets = vec![];
    for item in VALSETS.range(deps.storage, None, None, Order::Ascending) {
        let (nonce, valset) = item?;
        if !VALSET_CONFIRMS.has(deps.storage, (nonce, &validator)) {
            valsets.push(valset);
        }
        if valsets.len() >= MAX_LIMIT as usize {
            break;
        }
    }
    Ok(ValsetsResponse { valsets })
}

// ============================================================================
// Pool & Batches
// ============================================================================

pub fn query_pending_batches(
    deps: Deps,
    token_contract: Option<String>,
) -> StdResult<BatchesResponse> {
    let batches = match token_contract {
        Some(token) => outstanding_batches(deps.storage, &parse_eth_address(&token)?)?,
        None => all_batches(deps.storage)?,
    };
    Ok(BatchesResponse { batches })
}

pub fn query_batch(
    deps: Deps,
    token_contract: String,
    nonce: u64,
) -> StdResult<Option<OutgoingTxBatch>> {
    let token_contract = parse_eth_address(&token_contract)?;
    Ok(load_batch(deps.storage, &token_contract, nonce).ok())
}

pub fn query_batch_confirms(
    deps: Deps,
    token_contract: String,
    nonce: u64,
) -> StdResult<BatchConfirmsResponse> {
    let token_contract = parse_eth_address(&token_contract)?;
    let confirms = BATCH_CONFIRMS
        .prefix((token_contract.as_str(), nonce))
        .range(deps.storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, confirm)| confirm))
        .collect::<StdResult<_>>()?;
    Ok(BatchConfirmsResponse { confirms })
}

pub fn query_unconfirmed_batches(deps: Deps, orchestrator: String) -> StdResult<BatchesResponse> {
    let validator = validator_for_orchestrator(deps, &orchestrator)?;
    let batches = all_batches(deps.storage)?
        .into_iter()
        .filter(|batch| {
            !BATCH_CONFIRMS.has(
                deps.storage,
                (batch.token_contract.as_str(), batch.batch_nonce, &validator),
            )
        })
        .collect();
    Ok(BatchesResponse { batches })
}

pub fn query_pool(
    deps: Deps,
    token_contract: String,
    limit: Option<u32>,
) -> StdResult<PoolResponse> {
    let token_contract = parse_eth_address(&token_contract)?;
    let transactions =
        pool::transactions_by_fee(deps.storage, &token_contract, limit.map(|l| l as usize))?;
    Ok(PoolResponse { transactions })
}

/// What a full-size batch would collect for every token with pooled transfers.
pub fn query_batch_fees(deps: Deps) -> StdResult<BatchFeesResponse> {
    let max_size = PARAMS.load(deps.storage)?.max_batch_size as usize;
    let mut fees = vec![];
    for (token, _) in pool::tokens_with_pending(deps.storage)? {
        let token_contract = parse_eth_address(&token)?;
        let transactions = pool::transactions_by_fee(deps.storage, &token_contract, Some(max_size))?;
        let total_fees = transactions
            .iter()
            .try_fold(Uint128::zero(), |sum, tx| sum.checked_add(tx.fee))?;
        fees.push(BatchFee {
            token_contract: token,
            total_fees,
            tx_count: transactions.len() as u64,
        });
    }
    Ok(BatchFeesResponse { fees })
}

// ============================================================================
// Attestations
// ============================================================================

pub fn query_attestations(
    deps: Deps,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<AttestationsResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    // Smallest key with the next nonce
    let no_hash: &[u8] = &[];
    let start = start_after.map(|nonce| Bound::inclusive((nonce.saturating_add(1), no_hash)));
    let attestations = ATTESTATIONS
        .range(deps.storage, start, None, Order::Ascending)
        .take(limit)
        .map(|item| item.map(|(_, attestation)| attestation))
        .collect::<StdResult<_>>()?;
    Ok(AttestationsResponse { attestations })
}

pub fn query_last_observed_event_nonce(deps: Deps) -> StdResult<NonceResponse> {
    Ok(NonceResponse {
        nonce: last_observed_event_nonce(deps.storage)?,
    })
}

pub fn query_last_observed_eth_height(deps: Deps) -> StdResult<LastObservedEthereumHeight> {
    last_observed_eth_height(deps.storage)
}

/// Accepts either the validator operator or its orchestrator.
pub fn query_last_event_nonce_by_address(deps: Deps, address: String) -> StdResult<NonceResponse> {
    let addr = deps.api.addr_validate(&address)?;
    let operator = ORCHESTRATOR_VALIDATOR
        .may_load(deps.storage, &addr)?
        .unwrap_or(addr);
    let validator = ContractStakingKeeper
        .validator(deps.storage, &operator)?
        .ok_or_else(|| StdError::not_found(format!("validator {}", operator)))?;
    Ok(NonceResponse {
        nonce: last_event_nonce_by_validator(deps.storage, &validator)?,
    })
}

// ============================================================================
// Validators & Keys
// ============================================================================

pub fn query_validator(deps: Deps, operator: String) -> StdResult<Option<ValidatorInfo>> {
    let operator = deps.api.addr_validate(&operator)?;
    ContractStakingKeeper.validator(deps.storage, &operator)
}

pub fn query_bonded_validators(deps: Deps) -> StdResult<ValidatorsResponse> {
    Ok(ValidatorsResponse {
        validators: ContractStakingKeeper.bonded_validators(deps.storage)?,
    })
}

pub fn query_delegate_keys_by_validator(
    deps: Deps,
    validator: String,
) -> StdResult<Option<DelegateKeys>> {
    let validator = deps.api.addr_validate(&validator)?;
    DELEGATE_KEYS.may_load(deps.storage, &validator)
}

pub fn query_delegate_keys_by_orchestrator(
    deps: Deps,
    orchestrator: String,
) -> StdResult<Option<DelegateKeys>> {
    let orchestrator = deps.api.addr_validate(&orchestrator)?;
    match ORCHESTRATOR_VALIDATOR.may_load(deps.storage, &orchestrator)? {
        Some(validator) => DELEGATE_KEYS.may_load(deps.storage, &validator),
        None => Ok(None),
    }
}

pub fn query_delegate_keys_by_eth_address(
    deps: Deps,
    eth_address: String,
) -> StdResult<Option<DelegateKeys>> {
    let eth_address = parse_eth_address(&eth_address)?;
    match ETH_ADDRESS_VALIDATOR.may_load(deps.storage, eth_address.as_str())? {
        Some(validator) => DELEGATE_KEYS.may_load(deps.storage, &validator),
        None => Ok(None),
    }
}

// ============================================================================
// Token Registry
// ============================================================================

pub fn query_denom_to_erc20(deps: Deps, denom: String) -> StdResult<Option<TokenMapping>> {
    let asset = asset_from_denom(deps.api, &denom)
        .map_err(|err| StdError::generic_err(err.to_string()))?;
    mapping_for_asset(deps.storage, &asset)
}

pub fn query_erc20_to_denom(
    deps: Deps,
    token_contract: String,
) -> StdResult<Option<TokenMapping>> {
    mapping_for_token(deps.storage, &parse_eth_address(&token_contract)?)
}

// ============================================================================
// Checkpoints
// ============================================================================

pub fn query_valset_checkpoint(deps: Deps, nonce: u64) -> StdResult<CheckpointResponse> {
    let params = PARAMS.load(deps.storage)?;
    let valset = VALSETS
        .may_load(deps.storage, nonce)?
        .ok_or_else(|| StdError::not_found(format!("valset {}", nonce)))?;
    let checkpoint = valset_checkpoint(&params.gravity_id, valset.nonce, &valset.members)?;
    Ok(CheckpointResponse {
        checkpoint: bytes32_to_hex(&checkpoint),
    })
}

pub fn query_batch_checkpoint(
    deps: Deps,
    token_contract: String,
    nonce: u64,
) -> StdResult<CheckpointResponse> {
    let params = PARAMS.load(deps.storage)?;
    let token_contract = parse_eth_address(&token_contract)?;
    let batch = load_batch(deps.storage, &token_contract, nonce)
        .map_err(|_| StdError::not_found(format!("batch {} {}", token_contract, nonce)))?;
    let checkpoint = batch_checkpoint(
        &params.gravity_id,
        batch.batch_nonce,
        &batch.token_contract,
        batch.batch_timeout,
        &batch.transactions,
    )?;
    Ok(CheckpointResponse {
        checkpoint: bytes32_to_hex(&checkpoint),
    })
}
