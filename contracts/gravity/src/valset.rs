//! Signer-set tracker.
//!
//! The current signer set is derived from live stake: every active validator
//! with a delegated Ethereum key, powers normalized so they sum to roughly
//! `u32::MAX`. Snapshots are stored as requests keyed by the block height
//! they were taken at, which doubles as their nonce.

use std::collections::BTreeMap;

use cosmwasm_std::{Api, Decimal, Env, Event, Order, StdResult, Storage};

use crate::params::PARAMS;
use crate::staking::StakingKeeper;
use crate::state::{
    BridgeValidator, Valset, DELEGATE_KEYS, LAST_OBSERVED_VALSET_NONCE,
    LAST_SLASHED_VALSET_NONCE, VALSETS, VALSET_CONFIRMS,
};

/// Scale the normalized powers are expressed in
const POWER_SCALE: u128 = u32::MAX as u128;

/// Build the signer set from current stake. The nonce and height are both
/// the current block height.
pub fn current_valset(
    storage: &dyn Storage,
    keeper: &dyn StakingKeeper,
    env: &Env,
) -> StdResult<Valset> {
    let mut raw = vec![];
    for validator in keeper.bonded_validators(storage)? {
        if validator.power == 0 {
            continue;
        }
        if let Some(keys) = DELEGATE_KEYS.may_load(storage, &validator.operator)? {
            raw.push((validator.power, keys.eth_address));
        }
    }

    let total: u128 = raw.iter().map(|(power, _)| *power as u128).sum();
    let mut members: Vec<BridgeValidator> = raw
        .into_iter()
        .map(|(power, ethereum_address)| BridgeValidator {
            power: (power as u128 * POWER_SCALE / total) as u64,
            ethereum_address,
        })
        .collect();
    sort_members(&mut members);

    Ok(Valset {
        nonce: env.block.height,
        height: env.block.height,
        members,
    })
}

/// Canonical member order: power descending, then address ascending.
pub fn sort_members(members: &mut [BridgeValidator]) {
    members.sort_by(|a, b| {
        b.power
            .cmp(&a.power)
            .then_with(|| a.ethereum_address.cmp(&b.ethereum_address))
    });
}

/// Sum of absolute normalized power changes between two sets, as a fraction
/// of the full power scale.
pub fn power_diff(before: &[BridgeValidator], after: &[BridgeValidator]) -> Decimal {
    let mut deltas: BTreeMap<&str, i128> = BTreeMap::new();
    for member in before {
        deltas.insert(member.ethereum_address.as_str(), member.power as i128);
    }
    for member in after {
        *deltas.entry(member.ethereum_address.as_str()).or_insert(0) -= member.power as i128;
    }
    let total: u128 = deltas.values().map(|delta| delta.unsigned_abs()).sum();
    Decimal::from_ratio(total, POWER_SCALE)
}

pub fn latest_valset(storage: &dyn Storage) -> StdResult<Option<Valset>> {
    VALSETS
        .range(storage, None, None, Order::Descending)
        .next()
        .transpose()
        .map(|entry| entry.map(|(_, valset)| valset))
}

/// Store the current signer set as a new request.
///
/// Returns `None` when there is nothing to request: no validator has
/// delegated an Ethereum key, or a request already exists for this block.
pub fn request_valset(
    storage: &mut dyn Storage,
    api: &dyn Api,
    keeper: &dyn StakingKeeper,
    env: &Env,
) -> StdResult<Option<Valset>> {
    if VALSETS.has(storage, env.block.height) {
        return Ok(None);
    }
    let valset = current_valset(storage, keeper, env)?;
    if valset.members.is_empty() {
        api.debug("gravity: no validator has an ethereum key, skipping valset request");
        return Ok(None);
    }
    VALSETS.save(storage, valset.nonce, &valset)?;
    Ok(Some(valset))
}

/// Request a new signer set if none exists, a validator started unbonding in
/// this block, or power has drifted past the change threshold.
pub fn maybe_request_valset(
    storage: &mut dyn Storage,
    api: &dyn Api,
    keeper: &dyn StakingKeeper,
    env: &Env,
) -> StdResult<Option<Valset>> {
    let latest = latest_valset(storage)?;
    let unbonding_now = keeper.last_unbonding_height(storage)? == env.block.height;

    let needed = match &latest {
        None => true,
        Some(_) if unbonding_now => true,
        Some(latest) => {
            let threshold = PARAMS.load(storage)?.valset_change_threshold;
            let current = current_valset(storage, keeper, env)?;
            power_diff(&latest.members, &current.members) > threshold
        }
    };

    if needed {
        request_valset(storage, api, keeper, env)
    } else {
        Ok(None)
    }
}

/// Delete requests that are older than the last observed set, past the
/// confirmation window and already checked by slashing, with their confirms.
pub fn prune_valsets(storage: &mut dyn Storage, env: &Env) -> StdResult<Vec<u64>> {
    let params = PARAMS.load(storage)?;
    let last_observed = LAST_OBSERVED_VALSET_NONCE.may_load(storage)?.unwrap_or(0);
    let last_slashed = LAST_SLASHED_VALSET_NONCE.may_load(storage)?.unwrap_or(0);
    let Some(cutoff) = env.block.height.checked_sub(params.signed_valsets_window) else {
        return Ok(vec![]);
    };

    let prunable: Vec<u64> = VALSETS
        .range(storage, None, None, Order::Ascending)
        .filter_map(|item| match item {
            Ok((nonce, valset)) => (nonce < last_observed
                && valset.height < cutoff
                && nonce <= last_slashed)
                .then_some(Ok(nonce)),
            Err(err) => Some(Err(err)),
        })
        .collect::<StdResult<_>>()?;

    for nonce in &prunable {
        VALSETS.remove(storage, *nonce);
        let confirmers: Vec<_> = VALSET_CONFIRMS
            .prefix(*nonce)
            .keys(storage, None, None, Order::Ascending)
            .collect::<StdResult<_>>()?;
        for validator in confirmers {
            VALSET_CONFIRMS.remove(storage, (*nonce, &validator));
        }
    }
    Ok(prunable)
}

pub fn valset_request_event(valset: &Valset) -> Event {
    Event::new("valset_request")
        .add_attribute("valset_nonce", valset.nonce.to_string())
        .add_attribute("members", valset.members.len().to_string())
}
