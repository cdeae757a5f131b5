//! Signer-set and batch confirmations.
//!
//! A confirmation is a validator's Ethereum signature over a checkpoint.
//! Signatures are 65-byte `r || s || v` over the EIP-191 digest of the
//! checkpoint and must recover to the validator's delegated Ethereum key.

use common::EthAddress;
use cosmwasm_std::{Addr, Api, Binary, Decimal, Order, StdResult, Storage};

use crate::batch::load_batch;
use crate::checkpoint::{
    batch_checkpoint, eth_address_from_pubkey, eth_signed_message_hash, valset_checkpoint,
};
use crate::error::ContractError;
use crate::keys::resolve_orchestrator;
use crate::params::PARAMS;
use crate::staking::StakingKeeper;
use crate::state::{
    BatchConfirm, BatchStatus, OutgoingTxBatch, ValsetConfirm, BATCH_CONFIRMS, OUTGOING_BATCHES,
    VALSETS, VALSET_CONFIRMS,
};

/// Check that `signature` over `checkpoint` was produced by `expected`.
pub fn verify_checkpoint_signature(
    api: &dyn Api,
    checkpoint: &[u8; 32],
    signature: &[u8],
    expected: &EthAddress,
) -> Result<(), ContractError> {
    if signature.len() != 65 {
        return Err(ContractError::InvalidSignature);
    }
    let recovery_param = match signature[64] {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(ContractError::InvalidSignature),
    };

    let digest = eth_signed_message_hash(checkpoint);
    let pubkey = api
        .secp256k1_recover_pubkey(&digest, &signature[..64], recovery_param)
        .map_err(|_| ContractError::InvalidSignature)?;
    let signer = eth_address_from_pubkey(&pubkey).map_err(|_| ContractError::InvalidSignature)?;
    if &signer != expected {
        return Err(ContractError::InvalidSignature);
    }
    Ok(())
}

pub fn confirm_valset(
    storage: &mut dyn Storage,
    api: &dyn Api,
    keeper: &dyn StakingKeeper,
    orchestrator: &Addr,
    nonce: u64,
    signature: Binary,
) -> Result<ValsetConfirm, ContractError> {
    let (validator, keys) = resolve_orchestrator(storage, keeper, orchestrator)?;
    let valset = VALSETS
        .may_load(storage, nonce)?
        .ok_or(ContractError::UnknownNonce { nonce })?;
    if VALSET_CONFIRMS.has(storage, (nonce, &validator.operator)) {
        return Err(ContractError::DuplicateConfirmation { nonce });
    }

    let params = PARAMS.load(storage)?;
    let checkpoint = valset_checkpoint(&params.gravity_id, valset.nonce, &valset.members)?;
    verify_checkpoint_signature(api, &checkpoint, &signature, &keys.eth_address)?;

    let confirm = ValsetConfirm {
        nonce,
        validator: validator.operator.clone(),
        orchestrator: orchestrator.clone(),
        eth_address: keys.eth_address,
        signature,
    };
    VALSET_CONFIRMS.save(storage, (nonce, &validator.operator), &confirm)?;
    Ok(confirm)
}

/// Store a batch confirmation and move the batch to `Submitted` once the
/// confirming power reaches the attestation threshold.
pub fn confirm_batch(
    storage: &mut dyn Storage,
    api: &dyn Api,
    keeper: &dyn StakingKeeper,
    orchestrator: &Addr,
    token_contract: &EthAddress,
    nonce: u64,
    signature: Binary,
) -> Result<(BatchConfirm, OutgoingTxBatch), ContractError> {
    let (validator, keys) = resolve_orchestrator(storage, keeper, orchestrator)?;
    let mut batch = load_batch(storage, token_contract, nonce)?;
    let key = (token_contract.as_str(), nonce, &validator.operator);
    if BATCH_CONFIRMS.has(storage, key) {
        return Err(ContractError::DuplicateConfirmation { nonce });
    }

    let params = PARAMS.load(storage)?;
    let checkpoint = batch_checkpoint(
        &params.gravity_id,
        batch.batch_nonce,
        &batch.token_contract,
        batch.batch_timeout,
        &batch.transactions,
    )?;
    verify_checkpoint_signature(api, &checkpoint, &signature, &keys.eth_address)?;

    let confirm = BatchConfirm {
        nonce,
        token_contract: token_contract.clone(),
        validator: validator.operator.clone(),
        orchestrator: orchestrator.clone(),
        eth_address: keys.eth_address,
        signature,
    };
    BATCH_CONFIRMS.save(storage, key, &confirm)?;

    if batch.status == BatchStatus::Pending {
        let confirmed = batch_confirm_power(storage, keeper, token_contract, nonce)?;
        let total = keeper.total_bonded_power(storage)?;
        if total > 0 && Decimal::from_ratio(confirmed, total) >= params.attestation_threshold {
            batch.status = BatchStatus::Submitted;
            OUTGOING_BATCHES.save(storage, (token_contract.as_str(), nonce), &batch)?;
        }
    }
    Ok((confirm, batch))
}

/// Active power of the validators that confirmed a batch.
pub fn batch_confirm_power(
    storage: &dyn Storage,
    keeper: &dyn StakingKeeper,
    token_contract: &EthAddress,
    nonce: u64,
) -> StdResult<u64> {
    let confirmers: Vec<Addr> = BATCH_CONFIRMS
        .prefix((token_contract.as_str(), nonce))
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    let mut power = 0;
    for validator in confirmers {
        power += keeper.active_power(storage, &validator)?;
    }
    Ok(power)
}
