//! Delegate keys.
//!
//! Each validator delegates once to an orchestrator address (submits claims
//! and confirmations) and an Ethereum address (signs checkpoints). Both must
//! be unique across validators.

use common::EthAddress;
use cosmwasm_std::{Addr, Storage};

use crate::error::ContractError;
use crate::staking::StakingKeeper;
use crate::state::{
    DelegateKeys, ValidatorInfo, DELEGATE_KEYS, ETH_ADDRESS_VALIDATOR, ORCHESTRATOR_VALIDATOR,
};

pub fn set_delegate_keys(
    storage: &mut dyn Storage,
    keeper: &dyn StakingKeeper,
    validator: &Addr,
    orchestrator: Addr,
    eth_address: EthAddress,
) -> Result<DelegateKeys, ContractError> {
    if keeper.validator(storage, validator)?.is_none() {
        return Err(ContractError::UnknownValidator {
            address: validator.to_string(),
        });
    }
    if DELEGATE_KEYS.has(storage, validator) {
        return Err(ContractError::DuplicateDelegateKeys {
            reason: format!("validator {} already delegated its keys", validator),
        });
    }
    if ORCHESTRATOR_VALIDATOR.has(storage, &orchestrator) {
        return Err(ContractError::DuplicateDelegateKeys {
            reason: format!("orchestrator {} is already in use", orchestrator),
        });
    }
    if ETH_ADDRESS_VALIDATOR.has(storage, eth_address.as_str()) {
        return Err(ContractError::DuplicateDelegateKeys {
            reason: format!("ethereum address {} is already in use", eth_address),
        });
    }

    let keys = DelegateKeys {
        validator: validator.clone(),
        orchestrator,
        eth_address,
    };
    DELEGATE_KEYS.save(storage, validator, &keys)?;
    ORCHESTRATOR_VALIDATOR.save(storage, &keys.orchestrator, validator)?;
    ETH_ADDRESS_VALIDATOR.save(storage, keys.eth_address.as_str(), validator)?;
    Ok(keys)
}

/// Validator and keys behind an orchestrator address.
pub fn resolve_orchestrator(
    storage: &dyn Storage,
    keeper: &dyn StakingKeeper,
    orchestrator: &Addr,
) -> Result<(ValidatorInfo, DelegateKeys), ContractError> {
    let operator = ORCHESTRATOR_VALIDATOR
        .may_load(storage, orchestrator)?
        .ok_or_else(|| ContractError::UnknownOrchestrator {
            address: orchestrator.to_string(),
        })?;
    let validator =
        keeper
            .validator(storage, &operator)?
            .ok_or_else(|| ContractError::UnknownValidator {
                address: operator.to_string(),
            })?;
    let keys = DELEGATE_KEYS.load(storage, &operator)?;
    Ok((validator, keys))
}

/// Like [`resolve_orchestrator`], additionally requiring the validator to be
/// bonded and not jailed.
pub fn resolve_active_orchestrator(
    storage: &dyn Storage,
    keeper: &dyn StakingKeeper,
    orchestrator: &Addr,
) -> Result<(ValidatorInfo, DelegateKeys), ContractError> {
    let (validator, keys) = resolve_orchestrator(storage, keeper, orchestrator)?;
    if !validator.is_active() {
        return Err(ContractError::InactiveValidator {
            address: validator.operator.to_string(),
        });
    }
    Ok((validator, keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::{set_validator_power, ContractStakingKeeper};
    use cosmwasm_std::testing::mock_dependencies;

    const KEEPER: ContractStakingKeeper = ContractStakingKeeper;

    #[test]
    fn test_delegate_keys_are_unique() {
        let mut deps = mock_dependencies();
        let val_a = Addr::unchecked("val_a");
        let val_b = Addr::unchecked("val_b");
        set_validator_power(&mut deps.storage, &val_a, 10, 1).unwrap();
        set_validator_power(&mut deps.storage, &val_b, 10, 1).unwrap();

        let eth_a = EthAddress::from_bytes([0x0a; 20]);
        set_delegate_keys(
            &mut deps.storage,
            &KEEPER,
            &val_a,
            Addr::unchecked("orch_a"),
            eth_a.clone(),
        )
        .unwrap();

        // Keys are set once
        let err = set_delegate_keys(
            &mut deps.storage,
            &KEEPER,
            &val_a,
            Addr::unchecked("orch_x"),
            EthAddress::from_bytes([0x0c; 20]),
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::DuplicateDelegateKeys { .. }));

        // Orchestrator and eth address can't be shared
        let err = set_delegate_keys(
            &mut deps.storage,
            &KEEPER,
            &val_b,
            Addr::unchecked("orch_a"),
            EthAddress::from_bytes([0x0b; 20]),
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::DuplicateDelegateKeys { .. }));
        let err = set_delegate_keys(
            &mut deps.storage,
            &KEEPER,
            &val_b,
            Addr::unchecked("orch_b"),
            eth_a,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::DuplicateDelegateKeys { .. }));

        let err = set_delegate_keys(
            &mut deps.storage,
            &KEEPER,
            &Addr::unchecked("nobody"),
            Addr::unchecked("orch_n"),
            EthAddress::from_bytes([0x0d; 20]),
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::UnknownValidator { .. }));
    }

    #[test]
    fn test_resolve_orchestrator() {
        let mut deps = mock_dependencies();
        let val_a = Addr::unchecked("val_a");
        set_validator_power(&mut deps.storage, &val_a, 10, 1).unwrap();
        set_delegate_keys(
            &mut deps.storage,
            &KEEPER,
            &val_a,
            Addr::unchecked("orch_a"),
            EthAddress::from_bytes([0x0a; 20]),
        )
        .unwrap();

        let (validator, keys) =
            resolve_active_orchestrator(&deps.storage, &KEEPER, &Addr::unchecked("orch_a"))
                .unwrap();
        assert_eq!(validator.operator, val_a);
        assert_eq!(keys.eth_address, EthAddress::from_bytes([0x0a; 20]));

        let err = resolve_orchestrator(&deps.storage, &KEEPER, &Addr::unchecked("orch_z"))
            .unwrap_err();
        assert!(matches!(err, ContractError::UnknownOrchestrator { .. }));

        KEEPER.jail(&mut deps.storage, &val_a).unwrap();
        assert!(resolve_orchestrator(&deps.storage, &KEEPER, &Addr::unchecked("orch_a")).is_ok());
        let err =
            resolve_active_orchestrator(&deps.storage, &KEEPER, &Addr::unchecked("orch_a"))
                .unwrap_err();
        assert!(matches!(err, ContractError::InactiveValidator { .. }));
    }
}
