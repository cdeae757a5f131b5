//! Host chain hooks: the end blocker and staking module updates.

use cosmwasm_std::{DepsMut, Env, Response};

use crate::abci::end_blocker;
use crate::error::ContractError;
use crate::staking::{
    begin_unbonding, complete_unbonding, set_validator_power, unjail, ContractStakingKeeper,
};

pub fn sudo_end_blocker(deps: DepsMut, env: Env) -> Result<Response, ContractError> {
    let outcome = end_blocker(deps.storage, deps.api, &env, &ContractStakingKeeper)?;

    Ok(Response::new()
        .add_submessages(outcome.messages)
        .add_events(outcome.events)
        .add_attribute("method", "end_blocker")
        .add_attribute("height", env.block.height.to_string())
        .add_attribute("pruned_valsets", outcome.pruned_valsets.to_string())
        .add_attribute("pruned_attestations", outcome.pruned_attestations.to_string()))
}

pub fn sudo_set_validator_power(
    deps: DepsMut,
    env: Env,
    operator: String,
    power: u64,
) -> Result<Response, ContractError> {
    let operator = deps.api.addr_validate(&operator)?;
    let validator = set_validator_power(deps.storage, &operator, power, env.block.height)?;

    Ok(Response::new()
        .add_attribute("method", "set_validator_power")
        .add_attribute("operator", validator.operator)
        .add_attribute("index", validator.index.to_string())
        .add_attribute("power", validator.power.to_string()))
}

pub fn sudo_begin_unbonding(
    deps: DepsMut,
    env: Env,
    operator: String,
) -> Result<Response, ContractError> {
    let operator = deps.api.addr_validate(&operator)?;
    begin_unbonding(deps.storage, &operator, env.block.height)?;

    Ok(Response::new()
        .add_attribute("method", "begin_unbonding")
        .add_attribute("operator", operator))
}

pub fn sudo_complete_unbonding(deps: DepsMut, operator: String) -> Result<Response, ContractError> {
    let operator = deps.api.addr_validate(&operator)?;
    complete_unbonding(deps.storage, &operator)?;

    Ok(Response::new()
        .add_attribute("method", "complete_unbonding")
        .add_attribute("operator", operator))
}

pub fn sudo_unjail(deps: DepsMut, operator: String) -> Result<Response, ContractError> {
    let operator = deps.api.addr_validate(&operator)?;
    unjail(deps.storage, &operator)?;

    Ok(Response::new()
        .add_attribute("method", "unjail")
        .add_attribute("operator", operator))
}
