//! Gravity Bridge Contract - Entry Points
//!
//! The implementation is modularized into:
//! - `execute/` - Execute message handlers
//! - `sudo` - End blocker and staking hooks called by the host chain
//! - `query` - Query message handlers

use cosmwasm_std::{
    entry_point, to_json_binary, Binary, Deps, DepsMut, Env, MessageInfo, Reply, Response,
    StdResult, SubMsgResult,
};
use cw2::set_contract_version;

use crate::attestation::record_apply_failure;
use crate::error::ContractError;
use crate::execute::{
    execute_accept_admin, execute_batch_confirm, execute_cancel_admin_proposal,
    execute_cancel_send_to_eth, execute_pause, execute_propose_admin, execute_receive,
    execute_register_eth_token, execute_request_batch, execute_send_to_eth,
    execute_set_orchestrator_address, execute_submit_claim, execute_unpause,
    execute_update_params, execute_valset_confirm,
};
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg, SudoMsg};
use crate::params::PARAMS;
use crate::query::{
    query_attestations, query_batch, query_batch_checkpoint, query_batch_confirms,
    query_batch_fees, query_bonded_validators, query_config, query_current_valset,
    query_delegate_keys_by_eth_address, query_delegate_keys_by_orchestrator,
    query_delegate_keys_by_validator, query_denom_to_erc20, query_erc20_to_denom,
    query_last_event_nonce_by_address, query_last_observed_eth_height,
    query_last_observed_event_nonce, query_last_observed_valset_nonce,
    query_last_valset_requests, query_params, query_pending_admin, query_pending_batches,
    query_pool, query_unconfirmed_batches, query_unconfirmed_valsets, query_validator,
    query_valset, query_valset_checkpoint, query_valset_confirms,
};
use crate::state::{Config, CONFIG, CONTRACT_NAME, CONTRACT_VERSION};
use crate::sudo::{
    sudo_begin_unbonding, sudo_complete_unbonding, sudo_end_blocker, sudo_set_validator_power,
    sudo_unjail,
};

// ============================================================================
// Instantiate
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let admin = deps.api.addr_validate(&msg.admin)?;
    msg.params.validate()?;

    let config = Config {
        admin,
        paused: false,
    };
    CONFIG.save(deps.storage, &config)?;
    PARAMS.save(deps.storage, &msg.params)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("admin", config.admin)
        .add_attribute("gravity_id", msg.params.gravity_id)
        .add_attribute(
            "bridge_ethereum_address",
            msg.params.bridge_ethereum_address.to_string(),
        ))
}

// ============================================================================
// Execute
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        // Orchestrators
        ExecuteMsg::SetOrchestratorAddress {
            orchestrator,
            eth_address,
        } => execute_set_orchestrator_address(deps, info, orchestrator, eth_address),
        ExecuteMsg::SubmitClaim {
            event_nonce,
            eth_block_height,
            claim,
        } => execute_submit_claim(deps, env, info, event_nonce, eth_block_height, claim),
        ExecuteMsg::ValsetConfirm { nonce, signature } => {
            execute_valset_confirm(deps, info, nonce, signature)
        }
        ExecuteMsg::BatchConfirm {
            token_contract,
            nonce,
            signature,
        } => execute_batch_confirm(deps, info, token_contract, nonce, signature),

        // Outgoing transfers
        ExecuteMsg::SendToEth {
            eth_dest,
            bridge_fee,
        } => execute_send_to_eth(deps, info, eth_dest, bridge_fee),
        ExecuteMsg::Receive(cw20_msg) => execute_receive(deps, info, cw20_msg),
        ExecuteMsg::CancelSendToEth { transaction_id } => {
            execute_cancel_send_to_eth(deps, info, transaction_id)
        }
        ExecuteMsg::RequestBatch {
            token_contract,
            max_size,
        } => execute_request_batch(deps, env, token_contract, max_size),

        // Configuration
        ExecuteMsg::RegisterEthToken {
            token_contract,
            cw20,
        } => execute_register_eth_token(deps, info, token_contract, cw20),
        ExecuteMsg::UpdateParams { params } => execute_update_params(deps, info, params),

        // Admin operations
        ExecuteMsg::Pause {} => execute_pause(deps, info),
        ExecuteMsg::Unpause {} => execute_unpause(deps, info),
        ExecuteMsg::ProposeAdmin { new_admin } => execute_propose_admin(deps, env, info, new_admin),
        ExecuteMsg::AcceptAdmin {} => execute_accept_admin(deps, env, info),
        ExecuteMsg::CancelAdminProposal {} => execute_cancel_admin_proposal(deps, info),
    }
}

// ============================================================================
// Sudo
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn sudo(deps: DepsMut, env: Env, msg: SudoMsg) -> Result<Response, ContractError> {
    match msg {
        SudoMsg::EndBlocker {} => sudo_end_blocker(deps, env),
        SudoMsg::SetValidatorPower { operator, power } => {
            sudo_set_validator_power(deps, env, operator, power)
        }
        SudoMsg::BeginUnbonding { operator } => sudo_begin_unbonding(deps, env, operator),
        SudoMsg::CompleteUnbonding { operator } => sudo_complete_unbonding(deps, operator),
        SudoMsg::Unjail { operator } => sudo_unjail(deps, operator),
    }
}

// ============================================================================
// Reply
// ============================================================================

/// Claim side-effect messages are dispatched with the attestation's event
/// nonce as reply id and only reply on error. The attestation stays observed;
/// the failure is recorded on it.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn reply(deps: DepsMut, _env: Env, msg: Reply) -> Result<Response, ContractError> {
    let reason = match msg.result {
        SubMsgResult::Err(err) => err,
        SubMsgResult::Ok(_) => return Ok(Response::new().add_attribute("method", "reply")),
    };

    let event = record_apply_failure(deps.storage, deps.api, msg.id, &reason)?;
    Ok(Response::new()
        .add_events(event)
        .add_attribute("method", "reply")
        .add_attribute("event_nonce", msg.id.to_string()))
}

// ============================================================================
// Query
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        // Configuration
        QueryMsg::Params {} => to_json_binary(&query_params(deps)?),
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::PendingAdmin {} => to_json_binary(&query_pending_admin(deps)?),

        // Signer sets
        QueryMsg::CurrentValset {} => to_json_binary(&query_current_valset(deps, env)?),
        QueryMsg::Valset { nonce } => to_json_binary(&query_valset(deps, nonce)?),
        QueryMsg::LastValsetRequests { limit } => {
            to_json_binary(&query_last_valset_requests(deps, limit)?)
        }
        QueryMsg::ValsetConfirms { nonce } => to_json_binary(&query_valset_confirms(deps, nonce)?),
        QueryMsg::LastObservedValsetNonce {} => {
            to_json_binary(&query_last_observed_valset_nonce(deps)?)
        }
        QueryMsg::UnconfirmedValsets { orchestrator } => {
            to_json_binary(&query_unconfirmed_valsets(deps, orchestrator)?)
        }

        // Pool & batches
        QueryMsg::PendingBatches { token_contract } => {
            to_json_binary(&query_pending_batches(deps, token_contract)?)
        }
        QueryMsg::Batch {
            token_contract,
            nonce,
        } => to_json_binary(&query_batch(deps, token_contract, nonce)?),
        QueryMsg::BatchConfirms {
            token_contract,
            nonce,
        } => to_json_binary(&query_batch_confirms(deps, token_contract, nonce)?),
        QueryMsg::UnconfirmedBatches { orchestrator } => {
            to_json_binary(&query_unconfirmed_batches(deps, orchestrator)?)
        }
        QueryMsg::Pool {
            token_contract,
            limit,
        } => to_json_binary(&query_pool(deps, token_contract, limit)?),
        QueryMsg::BatchFees {} => to_json_binary(&query_batch_fees(deps)?),

        // Attestations
        QueryMsg::Attestations { start_after, limit } => {
            to_json_binary(&query_attestations(deps, start_after, limit)?)
        }
        QueryMsg::LastObservedEventNonce {} => {
            to_json_binary(&query_last_observed_event_nonce(deps)?)
        }
        QueryMsg::LastObservedEthHeight {} => {
            to_json_binary(&query_last_observed_eth_height(deps)?)
        }
        QueryMsg::LastEventNonceByAddress { address } => {
            to_json_binary(&query_last_event_nonce_by_address(deps, address)?)
        }

        // Validators & keys
        QueryMsg::Validator { operator } => to_json_binary(&query_validator(deps, operator)?),
        QueryMsg::BondedValidators {} => to_json_binary(&query_bonded_validators(deps)?),
        QueryMsg::DelegateKeysByValidator { validator } => {
            to_json_binary(&query_delegate_keys_by_validator(deps, validator)?)
        }
        QueryMsg::DelegateKeysByOrchestrator { orchestrator } => {
            to_json_binary(&query_delegate_keys_by_orchestrator(deps, orchestrator)?)
        }
        QueryMsg::DelegateKeysByEthAddress { eth_address } => {
            to_json_binary(&query_delegate_keys_by_eth_address(deps, eth_address)?)
        }

        // Token registry
        QueryMsg::DenomToErc20 { denom } => to_json_binary(&query_denom_to_erc20(deps, denom)?),
        QueryMsg::Erc20ToDenom { token_contract } => {
            to_json_binary(&query_erc20_to_denom(deps, token_contract)?)
        }

        // Checkpoints
        QueryMsg::ValsetCheckpoint { nonce } => {
            to_json_binary(&query_valset_checkpoint(deps, nonce)?)
        }
        QueryMsg::BatchCheckpoint {
            token_contract,
            nonce,
        } => to_json_binary(&query_batch_checkpoint(deps, token_contract, nonce)?),
    }
}

// ============================================================================
// Migrate
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    Ok(Response::new()
        .add_attribute("action", "migrate")
        .add_attribute("version", CONTRACT_VERSION))
}
