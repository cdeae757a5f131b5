//! Claim aggregation and attestation tally.
//!
//! Orchestrators submit claims with strictly contiguous per-validator event
//! nonces. Claims agreeing on `(event_nonce, claim_hash)` share one
//! attestation. An attestation is observed once the bonded power behind it
//! reaches the threshold, and only when its nonce directly follows the last
//! observed nonce. Observation happens exactly once; the claim's side effects
//! run in a write buffer that is discarded if they fail, leaving the
//! attestation observed with the error recorded.

use cosmwasm_std::{Api, Decimal, Env, Event, Order, StdResult, Storage, SubMsg};

use crate::claims::{self, EventClaim};
use crate::error::ContractError;
use crate::params::PARAMS;
use crate::staking::StakingKeeper;
use crate::state::{
    Attestation, LastObservedEthereumHeight, ValidatorInfo, ATTESTATIONS, CLAIMS,
    LAST_EVENT_NONCE_BY_VALIDATOR, LAST_OBSERVED_ETH_HEIGHT, LAST_OBSERVED_EVENT_NONCE,
    LAST_SLASHED_CLAIM_NONCE,
};
use crate::storage_cache::StorageCache;

/// Messages and events produced while observing attestations.
#[derive(Debug, Default)]
pub struct TallyOutcome {
    /// Claim side-effect messages, each replying on error with the event nonce
    pub messages: Vec<SubMsg>,
    pub events: Vec<Event>,
}

impl TallyOutcome {
    pub fn append(&mut self, other: TallyOutcome) {
        self.messages.extend(other.messages);
        self.events.extend(other.events);
    }
}

// ============================================================================
// Nonce bookkeeping
// ============================================================================

pub fn last_observed_event_nonce(storage: &dyn Storage) -> StdResult<u64> {
    Ok(LAST_OBSERVED_EVENT_NONCE.may_load(storage)?.unwrap_or(0))
}

pub fn last_observed_eth_height(storage: &dyn Storage) -> StdResult<LastObservedEthereumHeight> {
    Ok(LAST_OBSERVED_ETH_HEIGHT
        .may_load(storage)?
        .unwrap_or(LastObservedEthereumHeight {
            ethereum_height: 0,
            cosmos_height: 0,
        }))
}

/// Last event nonce the validator submitted a claim for. A validator that
/// never submitted starts after the last nonce checked by claim slashing, so
/// it can still vote on every nonce it may be slashed for.
pub fn last_event_nonce_by_validator(
    storage: &dyn Storage,
    validator: &ValidatorInfo,
) -> StdResult<u64> {
    match LAST_EVENT_NONCE_BY_VALIDATOR.may_load(storage, &validator.operator)? {
        Some(nonce) => Ok(nonce),
        None => Ok(LAST_SLASHED_CLAIM_NONCE.may_load(storage)?.unwrap_or(0)),
    }
}

// ============================================================================
// Claim submission
// ============================================================================

/// Record `validator`'s vote for `claim` and observe the attestation if it
/// is next in line and has enough power behind it.
pub fn submit_claim(
    storage: &mut dyn Storage,
    api: &dyn Api,
    env: &Env,
    keeper: &dyn StakingKeeper,
    validator: &ValidatorInfo,
    claim: EventClaim,
) -> Result<(Attestation, TallyOutcome), ContractError> {
    claim.validate_basic()?;

    let suffix = claim.storage_suffix()?;
    if CLAIMS.has(storage, (claim.event_nonce, validator.index, suffix.as_slice())) {
        return Err(ContractError::DuplicateVote {
            nonce: claim.event_nonce,
        });
    }

    let last_nonce = last_event_nonce_by_validator(storage, validator)?;
    if claim.event_nonce != last_nonce + 1 {
        return Err(ContractError::NonContiguousNonce {
            expected: last_nonce + 1,
            got: claim.event_nonce,
        });
    }

    let hash = claim.hash()?;
    let mut attestation = ATTESTATIONS
        .may_load(storage, (claim.event_nonce, hash.as_slice()))?
        .unwrap_or_else(|| Attestation {
            event_nonce: claim.event_nonce,
            claim_hash: hash.to_vec().into(),
            claim: claim.clone(),
            votes: vec![],
            observed: false,
            height: env.block.height,
            apply_error: None,
        });
    if attestation.votes.contains(&validator.index) {
        return Err(ContractError::DuplicateVote {
            nonce: claim.event_nonce,
        });
    }

    CLAIMS.save(
        storage,
        (claim.event_nonce, validator.index, suffix.as_slice()),
        &claim,
    )?;
    LAST_EVENT_NONCE_BY_VALIDATOR.save(storage, &validator.operator, &claim.event_nonce)?;
    attestation.votes.push(validator.index);
    ATTESTATIONS.save(storage, (claim.event_nonce, hash.as_slice()), &attestation)?;

    let mut outcome = TallyOutcome::default();
    if !attestation.observed
        && attestation.event_nonce == last_observed_event_nonce(storage)? + 1
        && threshold_reached(storage, keeper, &attestation)?
    {
        let (observed, applied) = observe_and_apply(storage, api, env, attestation)?;
        attestation = observed;
        outcome = applied;
    }
    Ok((attestation, outcome))
}

// ============================================================================
// Tally
// ============================================================================

/// Current active power behind the attestation and the total bonded power.
pub fn voting_power(
    storage: &dyn Storage,
    keeper: &dyn StakingKeeper,
    attestation: &Attestation,
) -> StdResult<(u64, u64)> {
    let mut voted = 0u64;
    for index in &attestation.votes {
        if let Some(validator) = keeper.validator_by_index(storage, *index)? {
            if validator.is_active() {
                voted += validator.power;
            }
        }
    }
    Ok((voted, keeper.total_bonded_power(storage)?))
}

fn threshold_reached(
    storage: &dyn Storage,
    keeper: &dyn StakingKeeper,
    attestation: &Attestation,
) -> StdResult<bool> {
    let threshold = PARAMS.load(storage)?.attestation_threshold;
    let (voted, total) = voting_power(storage, keeper, attestation)?;
    Ok(total > 0 && Decimal::from_ratio(voted, total) >= threshold)
}

/// Observe every attestation that has become observable, strictly in nonce
/// order, stopping at the first nonce without enough power.
pub fn tally_sweep(
    storage: &mut dyn Storage,
    api: &dyn Api,
    env: &Env,
    keeper: &dyn StakingKeeper,
) -> Result<TallyOutcome, ContractError> {
    let mut outcome = TallyOutcome::default();

    loop {
        let next = last_observed_event_nonce(storage)? + 1;
        let candidates: Vec<Attestation> = ATTESTATIONS
            .prefix(next)
            .range(storage, None, None, Order::Ascending)
            .map(|item| item.map(|(_, attestation)| attestation))
            .collect::<StdResult<_>>()?;

        let mut ready = None;
        for attestation in candidates {
            if !attestation.observed && threshold_reached(storage, keeper, &attestation)? {
                ready = Some(attestation);
                break;
            }
        }

        match ready {
            Some(attestation) => {
                let (_, applied) = observe_and_apply(storage, api, env, attestation)?;
                outcome.append(applied);
            }
            None => break,
        }
    }

    Ok(outcome)
}

/// Mark the attestation observed, advance the observed nonce and apply the
/// claim's side effects.
///
/// Fails with `OutOfOrderApplication` unless the attestation is the next one
/// in line. A failure of the side effects is recorded, not returned.
pub fn observe_and_apply(
    storage: &mut dyn Storage,
    api: &dyn Api,
    env: &Env,
    mut attestation: Attestation,
) -> Result<(Attestation, TallyOutcome), ContractError> {
    let expected = last_observed_event_nonce(storage)? + 1;
    if attestation.observed || attestation.event_nonce != expected {
        return Err(ContractError::OutOfOrderApplication {
            expected,
            got: attestation.event_nonce,
        });
    }

    let nonce = attestation.event_nonce;
    attestation.observed = true;
    LAST_OBSERVED_EVENT_NONCE.save(storage, &nonce)?;

    let observed_height = last_observed_eth_height(storage)?;
    if attestation.claim.eth_block_height >= observed_height.ethereum_height {
        LAST_OBSERVED_ETH_HEIGHT.save(
            storage,
            &LastObservedEthereumHeight {
                ethereum_height: attestation.claim.eth_block_height,
                cosmos_height: env.block.height,
            },
        )?;
    }

    let claim_hash = hash_hex(&attestation);
    let claim_type = attestation.claim.claim_type();
    let mut outcome = TallyOutcome::default();

    let applied = {
        let mut cache = StorageCache::new(&*storage);
        claims::apply(&attestation.claim, &mut cache, api).map(|effects| (effects, cache.prepare()))
    };
    match applied {
        Ok((effects, writes)) => {
            writes.commit(storage);
            outcome.messages = effects
                .messages
                .into_iter()
                .map(|msg| SubMsg::reply_on_error(msg, nonce))
                .collect();
            outcome.events.push(
                Event::new("attestation_observed")
                    .add_attribute("event_nonce", nonce.to_string())
                    .add_attribute("claim_type", claim_type.as_str())
                    .add_attribute("claim_hash", claim_hash)
                    .add_attribute(
                        "eth_block_height",
                        attestation.claim.eth_block_height.to_string(),
                    )
                    .add_attributes(effects.attributes),
            );
        }
        Err(err) => {
            let reason = err.to_string();
            api.debug(&format!(
                "gravity: attestation {} observed but apply failed: {}",
                nonce, reason
            ));
            outcome
                .events
                .push(apply_failure_event(nonce, claim_type.as_str(), &claim_hash, &reason));
            attestation.apply_error = Some(reason);
        }
    }

    ATTESTATIONS.save(storage, (nonce, attestation.claim_hash.as_slice()), &attestation)?;
    Ok((attestation, outcome))
}

fn hash_hex(attestation: &Attestation) -> String {
    format!("0x{}", hex::encode(attestation.claim_hash.as_slice()))
}

fn apply_failure_event(nonce: u64, claim_type: &str, claim_hash: &str, reason: &str) -> Event {
    Event::new("attestation_apply_failure")
        .add_attribute("event_nonce", nonce.to_string())
        .add_attribute("claim_type", claim_type)
        .add_attribute("claim_hash", claim_hash)
        .add_attribute("error", reason)
}

/// Record that a message dispatched for the observed attestation at `nonce`
/// failed. Returns the failure event, or `None` when no observed attestation
/// exists at that nonce.
pub fn record_apply_failure(
    storage: &mut dyn Storage,
    api: &dyn Api,
    nonce: u64,
    reason: &str,
) -> StdResult<Option<Event>> {
    let observed = ATTESTATIONS
        .prefix(nonce)
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, attestation)| attestation))
        .find(|item| matches!(item, Ok(attestation) if attestation.observed) || item.is_err())
        .transpose()?;

    let Some(mut attestation) = observed else {
        api.debug(&format!(
            "gravity: reply for event nonce {} without an observed attestation",
            nonce
        ));
        return Ok(None);
    };

    api.debug(&format!(
        "gravity: attestation {} message failed: {}",
        nonce, reason
    ));
    attestation.apply_error = Some(reason.to_string());
    ATTESTATIONS.save(storage, (nonce, attestation.claim_hash.as_slice()), &attestation)?;
    Ok(Some(apply_failure_event(
        nonce,
        attestation.claim.claim_type().as_str(),
        &hash_hex(&attestation),
        reason,
    )))
}

// ============================================================================
// Pruning
// ============================================================================

/// Delete attestations and claims that are both observed-past and already
/// examined by claim slashing. Returns how many attestations were removed.
pub fn prune_attestations(storage: &mut dyn Storage) -> StdResult<u64> {
    let last_observed = last_observed_event_nonce(storage)?;
    let last_slashed = LAST_SLASHED_CLAIM_NONCE.may_load(storage)?.unwrap_or(0);
    let limit = last_observed.min(last_slashed);
    if limit == 0 {
        return Ok(0);
    }

    let stale: Vec<(u64, Vec<u8>)> = ATTESTATIONS
        .keys(storage, None, None, Order::Ascending)
        .take_while(|key| matches!(key, Ok((nonce, _)) if *nonce <= limit) || key.is_err())
        .collect::<StdResult<_>>()?;

    let mut pruned = 0;
    for (nonce, hash) in stale {
        ATTESTATIONS.remove(storage, (nonce, hash.as_slice()));
        let claim_keys: Vec<(u32, Vec<u8>)> = CLAIMS
            .sub_prefix(nonce)
            .keys(storage, None, None, Order::Ascending)
            .collect::<StdResult<_>>()?;
        for (index, suffix) in claim_keys {
            CLAIMS.remove(storage, (nonce, index, suffix.as_slice()));
        }
        pruned += 1;
    }
    Ok(pruned)
}
