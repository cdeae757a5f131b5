//! Outgoing transfer pool.
//!
//! Pending transfers to Ethereum live in `OUTGOING_POOL` keyed by id, and in a
//! per-token fee index. A descending scan of the index yields the highest fee
//! first and, among equal fees, the oldest transfer first.

use common::EthAddress;
use cosmwasm_std::{Addr, Order, StdError, StdResult, Storage, Uint128};

use crate::state::{
    OutgoingTransferTx, LAST_TX_POOL_ID, OUTGOING_POOL, POOL_FEE_INDEX, POOL_TOKEN_COUNTS,
};

/// Secondary index key for a pooled transfer
fn fee_key(tx: &OutgoingTransferTx) -> (&str, u128, u64) {
    (tx.token_contract.as_str(), tx.fee.u128(), u64::MAX - tx.id)
}

/// Create a new pooled transfer with the next id.
///
/// Funds must already be escrowed by the caller.
pub fn add_to_outgoing_pool(
    storage: &mut dyn Storage,
    sender: Addr,
    dest_address: EthAddress,
    token_contract: EthAddress,
    amount: Uint128,
    fee: Uint128,
) -> StdResult<OutgoingTransferTx> {
    let id = LAST_TX_POOL_ID.may_load(storage)?.unwrap_or(0) + 1;
    LAST_TX_POOL_ID.save(storage, &id)?;

    let tx = OutgoingTransferTx {
        id,
        sender,
        dest_address,
        token_contract,
        amount,
        fee,
    };
    insert(storage, &tx)?;
    Ok(tx)
}

/// Put a transfer (new or returned from a cancelled batch) into the pool
/// under its original id, restoring its priority.
pub fn insert(storage: &mut dyn Storage, tx: &OutgoingTransferTx) -> StdResult<()> {
    if OUTGOING_POOL.has(storage, tx.id) {
        return Err(StdError::generic_err(format!(
            "transfer {} already in pool",
            tx.id
        )));
    }
    OUTGOING_POOL.save(storage, tx.id, tx)?;
    POOL_FEE_INDEX.save(storage, fee_key(tx), &())?;
    POOL_TOKEN_COUNTS.update(storage, tx.token_contract.as_str(), |count| -> StdResult<_> {
        Ok(count.unwrap_or(0) + 1)
    })?;
    Ok(())
}

/// Remove a transfer from the pool and its index.
pub fn remove(storage: &mut dyn Storage, id: u64) -> StdResult<OutgoingTransferTx> {
    let tx = OUTGOING_POOL.load(storage, id)?;
    OUTGOING_POOL.remove(storage, id);
    POOL_FEE_INDEX.remove(storage, fee_key(&tx));

    let token = tx.token_contract.as_str();
    let count = POOL_TOKEN_COUNTS.may_load(storage, token)?.unwrap_or(0);
    if count <= 1 {
        POOL_TOKEN_COUNTS.remove(storage, token);
    } else {
        POOL_TOKEN_COUNTS.save(storage, token, &(count - 1))?;
    }
    Ok(tx)
}

/// Ids of pooled transfers for `token_contract` in batch priority order.
pub fn ids_by_fee(
    storage: &dyn Storage,
    token_contract: &EthAddress,
    limit: Option<usize>,
) -> StdResult<Vec<u64>> {
    POOL_FEE_INDEX
        .sub_prefix(token_contract.as_str())
        .keys(storage, None, None, Order::Descending)
        .take(limit.unwrap_or(usize::MAX))
        .map(|key| key.map(|(_, inverted_id)| u64::MAX - inverted_id))
        .collect()
}

/// Pooled transfers for `token_contract` in batch priority order.
pub fn transactions_by_fee(
    storage: &dyn Storage,
    token_contract: &EthAddress,
    limit: Option<usize>,
) -> StdResult<Vec<OutgoingTransferTx>> {
    ids_by_fee(storage, token_contract, limit)?
        .into_iter()
        .map(|id| OUTGOING_POOL.load(storage, id))
        .collect()
}

/// Token contracts that currently have pooled transfers, with their counts.
pub fn tokens_with_pending(storage: &dyn Storage) -> StdResult<Vec<(String, u64)>> {
    POOL_TOKEN_COUNTS
        .range(storage, None, None, Order::Ascending)
        .collect()
}
