//! Outgoing batch builder.
//!
//! Batches bundle the most profitable pooled transfers of one token under a
//! global nonce. A batch leaves the store either when an observed
//! `BatchExecuted` claim finalizes it or when it is cancelled (timeout or
//! superseded), in which case its transfers return to the pool.

use std::collections::BTreeSet;

use common::EthAddress;
use cosmwasm_std::{Addr, Api, Env, Event, Order, StdResult, Storage, Uint128};

use crate::attestation::last_observed_eth_height;
use crate::error::ContractError;
use crate::params::PARAMS;
use crate::pool;
use crate::state::{
    BatchStatus, OutgoingTxBatch, BATCH_CONFIRMS, LAST_BATCH_NONCE, OUTGOING_BATCHES,
};

/// Build a batch of up to `max_size` transfers for `token_contract`.
///
/// With `require_more_profitable` the batch is refused unless its total fee
/// beats every outstanding batch of the same token.
pub fn build_batch(
    storage: &mut dyn Storage,
    env: &Env,
    token_contract: &EthAddress,
    max_size: u32,
    require_more_profitable: bool,
) -> Result<OutgoingTxBatch, ContractError> {
    let params = PARAMS.load(storage)?;
    if max_size == 0 || max_size > params.max_batch_size {
        return Err(ContractError::InvalidBatchSize {
            size: max_size,
            max: params.max_batch_size,
        });
    }

    let selected = pool::transactions_by_fee(storage, token_contract, Some(max_size as usize))?;
    if selected.is_empty() {
        return Err(ContractError::EmptyPool {
            token_contract: token_contract.to_string(),
        });
    }

    let mut total_fee = Uint128::zero();
    for tx in &selected {
        total_fee = total_fee.checked_add(tx.fee)?;
    }

    if require_more_profitable {
        for existing in outstanding_batches(storage, token_contract)? {
            if existing.total_fee >= total_fee {
                return Err(ContractError::BatchNotMoreProfitable {
                    new_fee: total_fee,
                    existing_fee: existing.total_fee,
                });
            }
        }
    }

    for tx in &selected {
        pool::remove(storage, tx.id)?;
    }

    let batch_nonce = LAST_BATCH_NONCE.may_load(storage)?.unwrap_or(0) + 1;
    LAST_BATCH_NONCE.save(storage, &batch_nonce)?;

    let observed = last_observed_eth_height(storage)?;
    let batch = OutgoingTxBatch {
        batch_nonce,
        token_contract: token_contract.clone(),
        transactions: selected,
        total_fee,
        block: env.block.height,
        created_at: env.block.time,
        batch_timeout: observed.ethereum_height + params.batch_timeout_blocks(),
        status: BatchStatus::Pending,
    };
    OUTGOING_BATCHES.save(storage, (token_contract.as_str(), batch_nonce), &batch)?;
    Ok(batch)
}

/// Batches of `token_contract` still awaiting execution, in nonce order.
pub fn outstanding_batches(
    storage: &dyn Storage,
    token_contract: &EthAddress,
) -> StdResult<Vec<OutgoingTxBatch>> {
    OUTGOING_BATCHES
        .prefix(token_contract.as_str())
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, batch)| batch))
        .collect()
}

/// Every outstanding batch, ordered by token then nonce.
pub fn all_batches(storage: &dyn Storage) -> StdResult<Vec<OutgoingTxBatch>> {
    OUTGOING_BATCHES
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, batch)| batch))
        .collect()
}

pub fn load_batch(
    storage: &dyn Storage,
    token_contract: &EthAddress,
    nonce: u64,
) -> Result<OutgoingTxBatch, ContractError> {
    OUTGOING_BATCHES
        .may_load(storage, (token_contract.as_str(), nonce))?
        .ok_or(ContractError::UnknownNonce { nonce })
}

fn delete_batch(storage: &mut dyn Storage, token_contract: &EthAddress, nonce: u64) -> StdResult<()> {
    OUTGOING_BATCHES.remove(storage, (token_contract.as_str(), nonce));
    let confirmers: Vec<Addr> = BATCH_CONFIRMS
        .prefix((token_contract.as_str(), nonce))
        .keys(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;
    for validator in confirmers {
        BATCH_CONFIRMS.remove(storage, (token_contract.as_str(), nonce, &validator));
    }
    Ok(())
}

/// Cancel a batch, returning its transfers to the pool with their original priority.
pub fn cancel_batch(
    storage: &mut dyn Storage,
    token_contract: &EthAddress,
    nonce: u64,
) -> Result<OutgoingTxBatch, ContractError> {
    let mut batch = load_batch(storage, token_contract, nonce)?;
    for tx in &batch.transactions {
        pool::insert(storage, tx)?;
    }
    delete_batch(storage, token_contract, nonce)?;
    batch.status = BatchStatus::Cancelled;
    Ok(batch)
}

/// Finalize a batch executed on Ethereum.
///
/// Older batches of the same token can no longer execute (the Ethereum
/// contract only accepts increasing nonces), so they are cancelled.
pub fn mark_executed(
    storage: &mut dyn Storage,
    token_contract: &EthAddress,
    nonce: u64,
) -> Result<(OutgoingTxBatch, Vec<OutgoingTxBatch>), ContractError> {
    let mut executed = load_batch(storage, token_contract, nonce)?;
    delete_batch(storage, token_contract, nonce)?;
    executed.status = BatchStatus::Observed;

    let mut cancelled = vec![];
    for older in outstanding_batches(storage, token_contract)? {
        if older.batch_nonce < nonce {
            cancelled.push(cancel_batch(storage, token_contract, older.batch_nonce)?);
        }
    }
    Ok((executed, cancelled))
}

/// Cancel batches whose timeout is below the last observed Ethereum height,
/// at most one per token.
pub fn cancel_timed_out_batches(storage: &mut dyn Storage) -> Result<Vec<OutgoingTxBatch>, ContractError> {
    let observed = last_observed_eth_height(storage)?;
    let mut seen_tokens = BTreeSet::new();
    let mut cancelled = vec![];

    for batch in all_batches(storage)? {
        if batch.batch_timeout >= observed.ethereum_height
            || seen_tokens.contains(&batch.token_contract)
        {
            continue;
        }
        seen_tokens.insert(batch.token_contract.clone());
        cancelled.push(cancel_batch(storage, &batch.token_contract, batch.batch_nonce)?);
    }
    Ok(cancelled)
}

/// Create a full-size batch for every token that has pooled transfers and no
/// outstanding batch.
pub fn create_batches_for_pending_tokens(
    storage: &mut dyn Storage,
    api: &dyn Api,
    env: &Env,
) -> StdResult<Vec<OutgoingTxBatch>> {
    // A timeout needs an Ethereum height to count from
    if last_observed_eth_height(storage)?.ethereum_height == 0 {
        return Ok(vec![]);
    }

    let max_size = PARAMS.load(storage)?.max_batch_size;
    let mut created = vec![];

    for (token, _) in pool::tokens_with_pending(storage)? {
        let token_contract = match EthAddress::parse(&token) {
            Ok(addr) => addr,
            Err(err) => {
                api.debug(&format!("gravity: skipping pool token {}: {}", token, err));
                continue;
            }
        };
        if !outstanding_batches(storage, &token_contract)?.is_empty() {
            continue;
        }
        match build_batch(storage, env, &token_contract, max_size, false) {
            Ok(batch) => created.push(batch),
            Err(ContractError::Std(err)) => return Err(err),
            Err(err) => api.debug(&format!(
                "gravity: could not batch token {}: {}",
                token_contract, err
            )),
        }
    }
    Ok(created)
}

// ============================================================================
// Events
// ============================================================================

pub fn batch_created_event(batch: &OutgoingTxBatch) -> Event {
    Event::new("outgoing_batch")
        .add_attribute("token_contract", batch.token_contract.to_string())
        .add_attribute("batch_nonce", batch.batch_nonce.to_string())
        .add_attribute("tx_count", batch.transactions.len().to_string())
        .add_attribute("total_fee", batch.total_fee.to_string())
        .add_attribute("batch_timeout", batch.batch_timeout.to_string())
}

pub fn batch_cancelled_event(batch: &OutgoingTxBatch) -> Event {
    Event::new("batch_cancelled")
        .add_attribute("token_contract", batch.token_contract.to_string())
        .add_attribute("batch_nonce", batch.batch_nonce.to_string())
        .add_attribute("tx_count", batch.transactions.len().to_string())
}
