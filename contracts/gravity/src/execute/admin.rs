//! Admin operations: pause and timelocked admin transfer.

use cosmwasm_std::{DepsMut, Env, MessageInfo, Response};

use crate::error::ContractError;
use crate::state::{PendingAdmin, ADMIN_TIMELOCK_DURATION, CONFIG, PENDING_ADMIN};

// ============================================================================
// Pause/Unpause
// ============================================================================

fn set_paused(deps: DepsMut, info: MessageInfo, paused: bool) -> Result<(), ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized);
    }
    config.paused = paused;
    CONFIG.save(deps.storage, &config)?;
    Ok(())
}

/// Stop accepting outgoing transfers. Claims, confirmations and the end
/// blocker keep running so in-flight batches can settle.
pub fn execute_pause(deps: DepsMut, info: MessageInfo) -> Result<Response, ContractError> {
    set_paused(deps, info, true)?;
    Ok(Response::new().add_attribute("method", "pause"))
}

pub fn execute_unpause(deps: DepsMut, info: MessageInfo) -> Result<Response, ContractError> {
    set_paused(deps, info, false)?;
    Ok(Response::new().add_attribute("method", "unpause"))
}

// ============================================================================
// Admin Transfer
// ============================================================================

pub fn execute_propose_admin(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    new_admin: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized);
    }

    let pending = PendingAdmin {
        new_address: deps.api.addr_validate(&new_admin)?,
        execute_after: env.block.time.plus_seconds(ADMIN_TIMELOCK_DURATION),
    };
    PENDING_ADMIN.save(deps.storage, &pending)?;

    Ok(Response::new()
        .add_attribute("method", "propose_admin")
        .add_attribute("new_admin", pending.new_address)
        .add_attribute("execute_after", pending.execute_after.seconds().to_string()))
}

pub fn execute_accept_admin(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let pending = PENDING_ADMIN
        .may_load(deps.storage)?
        .ok_or(ContractError::NoPendingAdmin)?;
    if info.sender != pending.new_address {
        return Err(ContractError::UnauthorizedPendingAdmin);
    }
    if env.block.time < pending.execute_after {
        return Err(ContractError::TimelockNotExpired {
            remaining_seconds: pending.execute_after.seconds() - env.block.time.seconds(),
        });
    }

    CONFIG.update(deps.storage, |mut config| -> Result<_, ContractError> {
        config.admin = pending.new_address.clone();
        Ok(config)
    })?;
    PENDING_ADMIN.remove(deps.storage);

    Ok(Response::new()
        .add_attribute("method", "accept_admin")
        .add_attribute("new_admin", pending.new_address))
}

pub fn execute_cancel_admin_proposal(
    deps: DepsMut,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized);
    }
    PENDING_ADMIN.remove(deps.storage);

    Ok(Response::new().add_attribute("method", "cancel_admin_proposal"))
}
