//! Admin configuration: token registration and parameters.

use common::{AssetInfo, EthAddress};
use cosmwasm_std::{DepsMut, MessageInfo, Response};

use crate::error::ContractError;
use crate::params::{Params, PARAMS};
use crate::state::{TokenMapping, TokenOrigin, CONFIG};
use crate::token_registry::{denom_for_asset, register};

/// Map an Ethereum-native ERC20 to a CW20 voucher. The contract must be the
/// voucher's minter for deposits to be released.
pub fn execute_register_eth_token(
    deps: DepsMut,
    info: MessageInfo,
    token_contract: String,
    cw20: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized);
    }

    let mapping = TokenMapping {
        asset: AssetInfo::Cw20 {
            contract_addr: deps.api.addr_validate(&cw20)?,
        },
        token_contract: EthAddress::parse(&token_contract)?,
        origin: TokenOrigin::EthOriginated,
    };
    register(deps.storage, &mapping)?;

    Ok(Response::new()
        .add_attribute("method", "register_eth_token")
        .add_attribute("token_contract", mapping.token_contract.to_string())
        .add_attribute("denom", denom_for_asset(&mapping.asset)))
}

pub fn execute_update_params(
    deps: DepsMut,
    info: MessageInfo,
    params: Params,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized);
    }

    params.validate()?;
    PARAMS.save(deps.storage, &params)?;

    Ok(Response::new()
        .add_attribute("method", "update_params")
        .add_attribute("gravity_id", params.gravity_id))
}
