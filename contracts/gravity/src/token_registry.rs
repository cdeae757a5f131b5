//! Denom ↔ Ethereum token registry.
//!
//! Cosmos-originated assets (bank denoms or CW20s native to this chain) are
//! registered when an `Erc20Deployed` claim is observed and travel by
//! lock/unlock. Ethereum-originated assets are CW20 vouchers the bridge can
//! mint; the admin registers them and they travel by burn/mint.

use common::{AssetInfo, EthAddress};
use cosmwasm_std::{to_json_binary, Addr, Api, CosmosMsg, StdResult, Storage, Uint128, WasmMsg};
use cw20::Cw20ExecuteMsg;

use crate::error::ContractError;
use crate::state::{TokenMapping, TokenOrigin, DENOM_TO_ERC20, ERC20_TO_DENOM};

/// Denoms carrying this prefix name a CW20 contract rather than a bank denom
pub const CW20_DENOM_PREFIX: &str = "cw20:";

/// Resolve a bridge denom string to the asset it names.
///
/// `cw20:<address>` names a CW20 contract, anything else a bank denom.
pub fn asset_from_denom(api: &dyn Api, denom: &str) -> Result<AssetInfo, ContractError> {
    if let Some(contract) = denom.strip_prefix(CW20_DENOM_PREFIX) {
        let contract_addr = api
            .addr_validate(contract)
            .map_err(|err| ContractError::InvalidClaim {
                reason: format!("invalid cw20 denom {}: {}", denom, err),
            })?;
        return Ok(AssetInfo::Cw20 { contract_addr });
    }

    let valid = (3..=128).contains(&denom.len())
        && denom.starts_with(|c: char| c.is_ascii_alphabetic())
        && denom
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
    if !valid {
        return Err(ContractError::InvalidClaim {
            reason: format!("invalid denom {}", denom),
        });
    }
    Ok(AssetInfo::Native {
        denom: denom.to_string(),
    })
}

/// Inverse of [`asset_from_denom`]
pub fn denom_for_asset(asset: &AssetInfo) -> String {
    match asset {
        AssetInfo::Native { denom } => denom.clone(),
        AssetInfo::Cw20 { contract_addr } => format!("{}{}", CW20_DENOM_PREFIX, contract_addr),
    }
}

pub fn mapping_for_token(
    storage: &dyn Storage,
    token_contract: &EthAddress,
) -> StdResult<Option<TokenMapping>> {
    ERC20_TO_DENOM.may_load(storage, token_contract.as_str())
}

pub fn mapping_for_asset(storage: &dyn Storage, asset: &AssetInfo) -> StdResult<Option<TokenMapping>> {
    DENOM_TO_ERC20.may_load(storage, &asset.key())
}

/// Register a new mapping. Both sides must be unmapped.
pub fn register(storage: &mut dyn Storage, mapping: &TokenMapping) -> Result<(), ContractError> {
    if mapping.origin == TokenOrigin::EthOriginated && mapping.asset.is_native() {
        return Err(ContractError::InvalidClaim {
            reason: "ethereum originated tokens must be CW20 vouchers".to_string(),
        });
    }
    let asset_key = mapping.asset.key();
    if DENOM_TO_ERC20.has(storage, &asset_key) {
        return Err(ContractError::TokenAlreadyRegistered { token: asset_key });
    }
    if ERC20_TO_DENOM.has(storage, mapping.token_contract.as_str()) {
        return Err(ContractError::TokenAlreadyRegistered {
            token: mapping.token_contract.to_string(),
        });
    }
    DENOM_TO_ERC20.save(storage, &asset_key, mapping)?;
    ERC20_TO_DENOM.save(storage, mapping.token_contract.as_str(), mapping)?;
    Ok(())
}

/// Messages taking `amount` already held by the contract out of circulation
/// when it enters the outgoing pool. Locked assets need none.
pub fn escrow_msgs(mapping: &TokenMapping, amount: Uint128) -> StdResult<Vec<CosmosMsg>> {
    match (&mapping.origin, &mapping.asset) {
        (TokenOrigin::EthOriginated, AssetInfo::Cw20 { contract_addr }) if !amount.is_zero() => {
            Ok(vec![CosmosMsg::Wasm(WasmMsg::Execute {
                contract_addr: contract_addr.to_string(),
                msg: to_json_binary(&Cw20ExecuteMsg::Burn { amount })?,
                funds: vec![],
            })])
        }
        _ => Ok(vec![]),
    }
}

/// Message delivering `amount` to `recipient` for an observed deposit.
pub fn release_msg(mapping: &TokenMapping, recipient: &Addr, amount: Uint128) -> StdResult<CosmosMsg> {
    match (&mapping.origin, &mapping.asset) {
        (TokenOrigin::EthOriginated, AssetInfo::Cw20 { contract_addr }) => {
            Ok(CosmosMsg::Wasm(WasmMsg::Execute {
                contract_addr: contract_addr.to_string(),
                msg: to_json_binary(&Cw20ExecuteMsg::Mint {
                    recipient: recipient.to_string(),
                    amount,
                })?,
                funds: vec![],
            }))
        }
        _ => mapping.asset.transfer_msg(recipient, amount),
    }
}
