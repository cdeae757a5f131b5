//! Orchestrator handlers: delegate keys, Ethereum claims and checkpoint
//! confirmations.

use common::EthAddress;
use cosmwasm_std::{Binary, DepsMut, Env, MessageInfo, Response};

use crate::attestation::submit_claim;
use crate::claims::{ClaimPayload, EventClaim};
use crate::confirm::{confirm_batch, confirm_valset};
use crate::error::ContractError;
use crate::keys::{resolve_active_orchestrator, set_delegate_keys};
use crate::staking::ContractStakingKeeper;

/// Delegate keys for the sending validator operator.
pub fn execute_set_orchestrator_address(
    deps: DepsMut,
    info: MessageInfo,
    orchestrator: String,
    eth_address: String,
) -> Result<Response, ContractError> {
    let orchestrator = deps.api.addr_validate(&orchestrator)?;
    let eth_address = EthAddress::parse(&eth_address)?;
    let keys = set_delegate_keys(
        deps.storage,
        &ContractStakingKeeper,
        &info.sender,
        orchestrator,
        eth_address,
    )?;

    Ok(Response::new()
        .add_attribute("method", "set_orchestrator_address")
        .add_attribute("validator", keys.validator)
        .add_attribute("orchestrator", keys.orchestrator)
        .add_attribute("eth_address", keys.eth_address.to_string()))
}

pub fn execute_submit_claim(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    event_nonce: u64,
    eth_block_height: u64,
    payload: ClaimPayload,
) -> Result<Response, ContractError> {
    let keeper = ContractStakingKeeper;
    let (validator, _) = resolve_active_orchestrator(deps.storage, &keeper, &info.sender)?;

    let claim = EventClaim {
        event_nonce,
        eth_block_height,
        payload,
    };
    let claim_type = claim.claim_type();
    let (attestation, outcome) =
        submit_claim(deps.storage, deps.api, &env, &keeper, &validator, claim)?;

    Ok(Response::new()
        .add_submessages(outcome.messages)
        .add_events(outcome.events)
        .add_attribute("method", "submit_claim")
        .add_attribute("validator", validator.operator)
        .add_attribute("event_nonce", event_nonce.to_string())
        .add_attribute("claim_type", claim_type.as_str())
        .add_attribute("votes", attestation.votes.len().to_string())
        .add_attribute("observed", attestation.observed.to_string()))
}

pub fn execute_valset_confirm(
    deps: DepsMut,
    info: MessageInfo,
    nonce: u64,
    signature: Binary,
) -> Result<Response, ContractError> {
    let confirm = confirm_valset(
        deps.storage,
        deps.api,
        &ContractStakingKeeper,
        &info.sender,
        nonce,
        signature,
    )?;

    Ok(Response::new()
        .add_attribute("method", "valset_confirm")
        .add_attribute("validator", confirm.validator)
        .add_attribute("valset_nonce", nonce.to_string()))
}

pub fn execute_batch_confirm(
    deps: DepsMut,
    info: MessageInfo,
    token_contract: String,
    nonce: u64,
    signature: Binary,
) -> Result<Response, ContractError> {
    let token_contract = EthAddress::parse(&token_contract)?;
    let (confirm, batch) = confirm_batch(
        deps.storage,
        deps.api,
        &ContractStakingKeeper,
        &info.sender,
        &token_contract,
        nonce,
        signature,
    )?;

    Ok(Response::new()
        .add_attribute("method", "batch_confirm")
        .add_attribute("validator", confirm.validator)
        .add_attribute("token_contract", token_contract.to_string())
        .add_attribute("batch_nonce", nonce.to_string())
        .add_attribute("status", batch.status.as_str()))
}
