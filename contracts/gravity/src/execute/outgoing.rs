//! Outgoing transfer handlers (SendToEth, Receive, cancel) and batch requests.

use common::{AssetInfo, EthAddress};
use cosmwasm_std::{from_json, Addr, DepsMut, Env, Event, MessageInfo, Response, Uint128};
use cw20::Cw20ReceiveMsg;

use crate::batch::{batch_created_event, build_batch};
use crate::error::ContractError;
use crate::msg::ReceiveMsg;
use crate::params::PARAMS;
use crate::pool;
use crate::state::{CONFIG, OUTGOING_POOL};
use crate::token_registry::{
    denom_for_asset, escrow_msgs, mapping_for_asset, mapping_for_token, release_msg,
};

/// Send native funds to Ethereum. The single attached coin covers the
/// transfer amount plus `bridge_fee`.
pub fn execute_send_to_eth(
    deps: DepsMut,
    info: MessageInfo,
    eth_dest: String,
    bridge_fee: Uint128,
) -> Result<Response, ContractError> {
    if info.funds.is_empty() {
        return Err(ContractError::NoFundsSent);
    }
    if info.funds.len() > 1 {
        return Err(ContractError::InvalidAmount {
            reason: "Only one token type allowed per transaction".to_string(),
        });
    }

    let coin = &info.funds[0];
    let asset = AssetInfo::Native {
        denom: coin.denom.clone(),
    };
    queue_transfer(deps, info.sender, asset, coin.amount, eth_dest, bridge_fee)
}

/// CW20 `Send` hook. `info.sender` is the token contract.
pub fn execute_receive(
    deps: DepsMut,
    info: MessageInfo,
    cw20_msg: Cw20ReceiveMsg,
) -> Result<Response, ContractError> {
    let sender = deps.api.addr_validate(&cw20_msg.sender)?;
    let asset = AssetInfo::Cw20 {
        contract_addr: info.sender,
    };

    match from_json(&cw20_msg.msg)? {
        ReceiveMsg::SendToEth {
            eth_dest,
            bridge_fee,
        } => queue_transfer(deps, sender, asset, cw20_msg.amount, eth_dest, bridge_fee),
    }
}

fn queue_transfer(
    deps: DepsMut,
    sender: Addr,
    asset: AssetInfo,
    total: Uint128,
    eth_dest: String,
    bridge_fee: Uint128,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if config.paused {
        return Err(ContractError::BridgePaused);
    }

    let dest_address = EthAddress::parse(&eth_dest)?;
    let mapping = mapping_for_asset(deps.storage, &asset)?.ok_or_else(|| {
        ContractError::TokenNotSupported {
            token: denom_for_asset(&asset),
        }
    })?;

    let amount = total
        .checked_sub(bridge_fee)
        .map_err(|_| ContractError::InvalidAmount {
            reason: format!("bridge fee {} exceeds funds {}", bridge_fee, total),
        })?;
    if amount.is_zero() {
        return Err(ContractError::InvalidAmount {
            reason: "Amount after fee must be greater than zero".to_string(),
        });
    }

    let tx = pool::add_to_outgoing_pool(
        deps.storage,
        sender,
        dest_address,
        mapping.token_contract.clone(),
        amount,
        bridge_fee,
    )?;
    let messages = escrow_msgs(&mapping, total)?;

    Ok(Response::new()
        .add_messages(messages)
        .add_event(
            Event::new("outgoing_tx")
                .add_attribute("id", tx.id.to_string())
                .add_attribute("sender", tx.sender.to_string())
                .add_attribute("dest_address", tx.dest_address.to_string())
                .add_attribute("token_contract", tx.token_contract.to_string())
                .add_attribute("amount", tx.amount.to_string())
                .add_attribute("fee", tx.fee.to_string()),
        )
        .add_attribute("method", "send_to_eth")
        .add_attribute("id", tx.id.to_string())
        .add_attribute("denom", denom_for_asset(&mapping.asset)))
}

/// Take an unbatched transfer out of the pool and refund amount plus fee.
pub fn execute_cancel_send_to_eth(
    deps: DepsMut,
    info: MessageInfo,
    transaction_id: u64,
) -> Result<Response, ContractError> {
    let tx = OUTGOING_POOL
        .may_load(deps.storage, transaction_id)?
        .ok_or(ContractError::UnknownTransaction { id: transaction_id })?;
    if tx.sender != info.sender {
        return Err(ContractError::NotTransactionSender { id: transaction_id });
    }

    let mapping = mapping_for_token(deps.storage, &tx.token_contract)?.ok_or_else(|| {
        ContractError::TokenNotSupported {
            token: tx.token_contract.to_string(),
        }
    })?;
    let tx = pool::remove(deps.storage, transaction_id)?;
    let refund = tx.amount.checked_add(tx.fee)?;
    let message = release_msg(&mapping, &tx.sender, refund)?;

    Ok(Response::new()
        .add_message(message)
        .add_event(
            Event::new("outgoing_tx_cancelled")
                .add_attribute("id", tx.id.to_string())
                .add_attribute("sender", tx.sender.to_string())
                .add_attribute("refund", refund.to_string()),
        )
        .add_attribute("method", "cancel_send_to_eth")
        .add_attribute("id", tx.id.to_string()))
}

/// Build a batch on request. It must collect more fees than every
/// outstanding batch of the token.
pub fn execute_request_batch(
    deps: DepsMut,
    env: Env,
    token_contract: String,
    max_size: Option<u32>,
) -> Result<Response, ContractError> {
    let token_contract = EthAddress::parse(&token_contract)?;
    let max_size = match max_size {
        Some(size) => size,
        None => PARAMS.load(deps.storage)?.max_batch_size,
    };
    let batch = build_batch(deps.storage, &env, &token_contract, max_size, true)?;

    Ok(Response::new()
        .add_event(batch_created_event(&batch))
        .add_attribute("method", "request_batch")
        .add_attribute("batch_nonce", batch.batch_nonce.to_string())
        .add_attribute("tx_count", batch.transactions.len().to_string()))
}
