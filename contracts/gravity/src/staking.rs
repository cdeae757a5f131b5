//! Stake provider interface.
//!
//! The bridge core only reads validator power and lifecycle, and asks the
//! provider to slash and jail. [`ContractStakingKeeper`] is the implementation
//! used by the contract entry points: it keeps a mirror of the host staking
//! module that the host updates through `sudo` messages.

use cosmwasm_std::{Addr, Decimal, Order, StdError, StdResult, Storage, Uint128};

use crate::state::{
    BondStatus, ValidatorInfo, LAST_UNBONDING_HEIGHT, NEXT_VALIDATOR_INDEX, VALIDATORS,
    VALIDATOR_BY_INDEX,
};

pub trait StakingKeeper {
    fn validator(&self, storage: &dyn Storage, operator: &Addr) -> StdResult<Option<ValidatorInfo>>;

    fn validator_by_index(&self, storage: &dyn Storage, index: u32)
        -> StdResult<Option<ValidatorInfo>>;

    /// Bonded, unjailed validators ordered by operator address
    fn bonded_validators(&self, storage: &dyn Storage) -> StdResult<Vec<ValidatorInfo>>;

    /// Validators currently in the unbonding state
    fn unbonding_validators(&self, storage: &dyn Storage) -> StdResult<Vec<ValidatorInfo>>;

    /// Height of the most recent unbonding start, 0 if none
    fn last_unbonding_height(&self, storage: &dyn Storage) -> StdResult<u64>;

    /// Reduce the validator's power by `fraction`, returning the amount removed
    fn slash(&self, storage: &mut dyn Storage, operator: &Addr, fraction: Decimal)
        -> StdResult<u64>;

    /// Suspend the validator from the active set
    fn jail(&self, storage: &mut dyn Storage, operator: &Addr) -> StdResult<()>;

    fn total_bonded_power(&self, storage: &dyn Storage) -> StdResult<u64> {
        Ok(self
            .bonded_validators(storage)?
            .iter()
            .map(|v| v.power)
            .sum())
    }

    /// Current power if the validator is active, zero otherwise
    fn active_power(&self, storage: &dyn Storage, operator: &Addr) -> StdResult<u64> {
        Ok(self
            .validator(storage, operator)?
            .filter(ValidatorInfo::is_active)
            .map(|v| v.power)
            .unwrap_or(0))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContractStakingKeeper;

impl StakingKeeper for ContractStakingKeeper {
    fn validator(&self, storage: &dyn Storage, operator: &Addr) -> StdResult<Option<ValidatorInfo>> {
        VALIDATORS.may_load(storage, operator)
    }

    fn validator_by_index(
        &self,
        storage: &dyn Storage,
        index: u32,
    ) -> StdResult<Option<ValidatorInfo>> {
        match VALIDATOR_BY_INDEX.may_load(storage, index)? {
            Some(operator) => VALIDATORS.may_load(storage, &operator),
            None => Ok(None),
        }
    }

    fn bonded_validators(&self, storage: &dyn Storage) -> StdResult<Vec<ValidatorInfo>> {
        VALIDATORS
            .range(storage, None, None, Order::Ascending)
            .filter_map(|item| match item {
                Ok((_, v)) if v.is_active() => Some(Ok(v)),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            })
            .collect()
    }

    fn unbonding_validators(&self, storage: &dyn Storage) -> StdResult<Vec<ValidatorInfo>> {
        VALIDATORS
            .range(storage, None, None, Order::Ascending)
            .filter_map(|item| match item {
                Ok((_, v)) if v.status == BondStatus::Unbonding => Some(Ok(v)),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            })
            .collect()
    }

    fn last_unbonding_height(&self, storage: &dyn Storage) -> StdResult<u64> {
        Ok(LAST_UNBONDING_HEIGHT.may_load(storage)?.unwrap_or(0))
    }

    fn slash(
        &self,
        storage: &mut dyn Storage,
        operator: &Addr,
        fraction: Decimal,
    ) -> StdResult<u64> {
        let mut validator = load_validator(storage, operator)?;
        let slashed = Uint128::from(validator.power).mul_floor(fraction).u128() as u64;
        validator.power -= slashed;
        VALIDATORS.save(storage, operator, &validator)?;
        Ok(slashed)
    }

    fn jail(&self, storage: &mut dyn Storage, operator: &Addr) -> StdResult<()> {
        let mut validator = load_validator(storage, operator)?;
        validator.jailed = true;
        VALIDATORS.save(storage, operator, &validator)
    }
}

fn load_validator(storage: &dyn Storage, operator: &Addr) -> StdResult<ValidatorInfo> {
    VALIDATORS
        .may_load(storage, operator)?
        .ok_or_else(|| StdError::not_found(format!("validator {}", operator)))
}

// ============================================================================
// Host updates
// ============================================================================

/// Record a validator's power. A validator that was not bonded enters the
/// bonded set at `height`.
pub fn set_validator_power(
    storage: &mut dyn Storage,
    operator: &Addr,
    power: u64,
    height: u64,
) -> StdResult<ValidatorInfo> {
    let validator = match VALIDATORS.may_load(storage, operator)? {
        Some(mut existing) => {
            existing.power = power;
            if existing.status != BondStatus::Bonded {
                existing.status = BondStatus::Bonded;
                existing.bonded_height = height;
                existing.unbonding_height = None;
            }
            existing
        }
        None => {
            let index = NEXT_VALIDATOR_INDEX.may_load(storage)?.unwrap_or(0);
            NEXT_VALIDATOR_INDEX.save(storage, &(index + 1))?;
            VALIDATOR_BY_INDEX.save(storage, index, operator)?;
            ValidatorInfo {
                operator: operator.clone(),
                index,
                power,
                status: BondStatus::Bonded,
                bonded_height: height,
                unbonding_height: None,
                jailed: false,
            }
        }
    };
    VALIDATORS.save(storage, operator, &validator)?;
    Ok(validator)
}

pub fn begin_unbonding(storage: &mut dyn Storage, operator: &Addr, height: u64) -> StdResult<()> {
    let mut validator = load_validator(storage, operator)?;
    validator.status = BondStatus::Unbonding;
    validator.unbonding_height = Some(height);
    VALIDATORS.save(storage, operator, &validator)?;
    LAST_UNBONDING_HEIGHT.save(storage, &height)
}

pub fn complete_unbonding(storage: &mut dyn Storage, operator: &Addr) -> StdResult<()> {
    let mut validator = load_validator(storage, operator)?;
    validator.status = BondStatus::Unbonded;
    VALIDATORS.save(storage, operator, &validator)
}

pub fn unjail(storage: &mut dyn Storage, operator: &Addr) -> StdResult<()> {
    let mut validator = load_validator(storage, operator)?;
    validator.jailed = false;
    VALIDATORS.save(storage, operator, &validator)
}
