//! Slashing for non-participation.
//!
//! Runs once per block. Each pass looks at records old enough that every
//! validator had a full window to act on them, slashes and jails the ones
//! that did not, and advances a progress marker so no record is examined
//! twice. Validators that joined the bonded set after a record was created
//! are never punished for it.
//!
//! Passes never fail on inconsistent state: they log through `Api::debug`
//! and move on. Only storage errors propagate.

use cosmwasm_std::{Api, Decimal, Env, Event, Order, StdResult, Storage};
use cw_storage_plus::Bound;

use crate::attestation::last_observed_event_nonce;
use crate::batch::all_batches;
use crate::params::{Params, PARAMS};
use crate::staking::StakingKeeper;
use crate::state::{
    Attestation, OutgoingTxBatch, ValidatorInfo, Valset, ATTESTATIONS, BATCH_CONFIRMS,
    LAST_SLASHED_BATCH_BLOCK, LAST_SLASHED_CLAIM_NONCE, LAST_SLASHED_VALSET_NONCE, VALSETS,
    VALSET_CONFIRMS,
};

/// What a validator failed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCondition {
    /// Bonded validator did not confirm a signer set
    MissingValsetConfirm,
    /// Unbonding validator did not confirm a signer set it was still liable for
    UnbondingMissingValsetConfirm,
    /// Bonded validator did not confirm a batch
    MissingBatchConfirm,
    /// Bonded validator did not vote on an observed attestation
    MissingClaim,
}

impl SlashCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlashCondition::MissingValsetConfirm => "missing_valset_confirm",
            SlashCondition::UnbondingMissingValsetConfirm => "unbonding_missing_valset_confirm",
            SlashCondition::MissingBatchConfirm => "missing_batch_confirm",
            SlashCondition::MissingClaim => "missing_claim",
        }
    }

    fn fraction(&self, params: &Params) -> Decimal {
        match self {
            SlashCondition::MissingValsetConfirm
            | SlashCondition::UnbondingMissingValsetConfirm => params.slash_fraction_valset,
            SlashCondition::MissingBatchConfirm => params.slash_fraction_batch,
            SlashCondition::MissingClaim => params.slash_fraction_claim,
        }
    }
}

/// Run every slashing pass for the current block.
pub fn slash_unconfirmed(
    storage: &mut dyn Storage,
    api: &dyn Api,
    env: &Env,
    keeper: &dyn StakingKeeper,
) -> StdResult<Vec<Event>> {
    let params = PARAMS.load(storage)?;
    let height = env.block.height;
    let mut events = vec![];

    if let Some(max_height) = height.checked_sub(params.signed_valsets_window) {
        valset_pass(storage, api, keeper, &params, max_height, &mut events)?;
    }
    if let Some(max_height) = height.checked_sub(params.signed_batches_window) {
        batch_pass(storage, api, keeper, &params, max_height, &mut events)?;
    }
    if let Some(max_height) = height.checked_sub(params.signed_claims_window) {
        claims_pass(storage, api, keeper, &params, max_height, &mut events)?;
    }
    Ok(events)
}

fn slash_and_jail(
    storage: &mut dyn Storage,
    api: &dyn Api,
    keeper: &dyn StakingKeeper,
    params: &Params,
    validator: &ValidatorInfo,
    condition: SlashCondition,
    record: u64,
) -> Option<Event> {
    if validator.jailed {
        return None;
    }
    let slashed = match keeper.slash(storage, &validator.operator, condition.fraction(params)) {
        Ok(slashed) => slashed,
        Err(err) => {
            api.debug(&format!(
                "gravity: could not slash {} for {} {}: {}",
                validator.operator,
                condition.as_str(),
                record,
                err
            ));
            return None;
        }
    };
    if let Err(err) = keeper.jail(storage, &validator.operator) {
        api.debug(&format!(
            "gravity: could not jail {}: {}",
            validator.operator, err
        ));
    }

    Some(
        Event::new("slash")
            .add_attribute("validator", validator.operator.to_string())
            .add_attribute("reason", condition.as_str())
            .add_attribute("nonce", record.to_string())
            .add_attribute("slashed_power", slashed.to_string()),
    )
}

// ============================================================================
// Signer sets
// ============================================================================

fn valset_pass(
    storage: &mut dyn Storage,
    api: &dyn Api,
    keeper: &dyn StakingKeeper,
    params: &Params,
    max_height: u64,
    events: &mut Vec<Event>,
) -> StdResult<()> {
    let last_slashed = LAST_SLASHED_VALSET_NONCE.may_load(storage)?.unwrap_or(0);
    let unslashed: Vec<Valset> = VALSETS
        .range(
            storage,
            Some(Bound::exclusive(last_slashed)),
            None,
            Order::Ascending,
        )
        .map(|item| item.map(|(_, valset)| valset))
        .take_while(|item| matches!(item, Ok(valset) if valset.height < max_height) || item.is_err())
        .collect::<StdResult<_>>()?;

    for valset in unslashed {
        for validator in keeper.bonded_validators(storage)? {
            if validator.bonded_height < valset.height
                && !VALSET_CONFIRMS.has(storage, (valset.nonce, &validator.operator))
            {
                events.extend(slash_and_jail(
                    storage,
                    api,
                    keeper,
                    params,
                    &validator,
                    SlashCondition::MissingValsetConfirm,
                    valset.nonce,
                ));
            }
        }

        for validator in keeper.unbonding_validators(storage)? {
            let Some(unbonding_height) = validator.unbonding_height else {
                api.debug(&format!(
                    "gravity: unbonding validator {} has no unbonding height",
                    validator.operator
                ));
                continue;
            };
            let liable = validator.bonded_height < valset.height
                && valset.height < unbonding_height + params.unbond_slashing_valsets_window;
            if liable && !VALSET_CONFIRMS.has(storage, (valset.nonce, &validator.operator)) {
                events.extend(slash_and_jail(
                    storage,
                    api,
                    keeper,
                    params,
                    &validator,
                    SlashCondition::UnbondingMissingValsetConfirm,
                    valset.nonce,
                ));
            }
        }

        LAST_SLASHED_VALSET_NONCE.save(storage, &valset.nonce)?;
    }
    Ok(())
}

// ============================================================================
// Batches
// ============================================================================

fn batch_pass(
    storage: &mut dyn Storage,
    api: &dyn Api,
    keeper: &dyn StakingKeeper,
    params: &Params,
    max_height: u64,
    events: &mut Vec<Event>,
) -> StdResult<()> {
    let last_slashed = LAST_SLASHED_BATCH_BLOCK.may_load(storage)?.unwrap_or(0);
    let mut unslashed: Vec<OutgoingTxBatch> = all_batches(storage)?
        .into_iter()
        .filter(|batch| batch.block > last_slashed && batch.block < max_height)
        .collect();
    unslashed.sort_by_key(|batch| (batch.block, batch.batch_nonce));

    for batch in unslashed {
        for validator in keeper.bonded_validators(storage)? {
            let confirmed = BATCH_CONFIRMS.has(
                storage,
                (
                    batch.token_contract.as_str(),
                    batch.batch_nonce,
                    &validator.operator,
                ),
            );
            if validator.bonded_height < batch.block && !confirmed {
                events.extend(slash_and_jail(
                    storage,
                    api,
                    keeper,
                    params,
                    &validator,
                    SlashCondition::MissingBatchConfirm,
                    batch.batch_nonce,
                ));
            }
        }
        LAST_SLASHED_BATCH_BLOCK.save(storage, &batch.block)?;
    }
    Ok(())
}

// ============================================================================
// Claims
// ============================================================================

fn observed_attestation(storage: &dyn Storage, nonce: u64) -> StdResult<Option<Attestation>> {
    ATTESTATIONS
        .prefix(nonce)
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, attestation)| attestation))
        .find(|item| matches!(item, Ok(attestation) if attestation.observed) || item.is_err())
        .transpose()
}

fn claims_pass(
    storage: &mut dyn Storage,
    api: &dyn Api,
    keeper: &dyn StakingKeeper,
    params: &Params,
    max_height: u64,
    events: &mut Vec<Event>,
) -> StdResult<()> {
    let last_slashed = LAST_SLASHED_CLAIM_NONCE.may_load(storage)?.unwrap_or(0);
    let last_observed = last_observed_event_nonce(storage)?;

    for nonce in (last_slashed + 1)..=last_observed {
        match observed_attestation(storage, nonce)? {
            Some(attestation) => {
                if attestation.height >= max_height {
                    break;
                }
                for validator in keeper.bonded_validators(storage)? {
                    if validator.bonded_height < attestation.height
                        && !attestation.votes.contains(&validator.index)
                    {
                        events.extend(slash_and_jail(
                            storage,
                            api,
                            keeper,
                            params,
                            &validator,
                            SlashCondition::MissingClaim,
                            nonce,
                        ));
                    }
                }
            }
            None => api.debug(&format!(
                "gravity: no observed attestation at event nonce {}",
                nonce
            )),
        }
        LAST_SLASHED_CLAIM_NONCE.save(storage, &nonce)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::submit_claim;
    use crate::claims::{ClaimPayload, EventClaim};
    use crate::staking::{begin_unbonding, set_validator_power, ContractStakingKeeper};
    use crate::state::{BatchStatus, BridgeValidator, LAST_OBSERVED_EVENT_NONCE, OUTGOING_BATCHES};
    use common::EthAddress;
    use cosmwasm_std::testing::{mock_dependencies, mock_env, MockStorage};
    use cosmwasm_std::{Addr, Binary, Uint128};

    const KEEPER: ContractStakingKeeper = ContractStakingKeeper;

    fn params() -> Params {
        Params {
            signed_valsets_window: 10,
            signed_batches_window: 10,
            signed_claims_window: 10,
            unbond_slashing_valsets_window: 10,
            slash_fraction_valset: Decimal::percent(10),
            slash_fraction_batch: Decimal::percent(10),
            slash_fraction_claim: Decimal::percent(10),
            ..Params::default_for("gravity-test", EthAddress::from_bytes([0x42; 20]))
        }
    }

    fn env_at(height: u64) -> Env {
        let mut env = mock_env();
        env.block.height = height;
        env
    }

    fn validator(storage: &mut MockStorage, name: &str, bonded_at: u64) -> Addr {
        let operator = Addr::unchecked(name);
        set_validator_power(storage, &operator, 1000, bonded_at).unwrap();
        operator
    }

    fn store_valset(storage: &mut MockStorage, height: u64) {
        VALSETS
            .save(
                storage,
                height,
                &Valset {
                    nonce: height,
                    height,
                    members: vec![BridgeValidator {
                        power: u32::MAX as u64,
                        ethereum_address: EthAddress::from_bytes([0x01; 20]),
                    }],
                },
            )
            .unwrap();
    }

    fn confirm_valset(storage: &mut MockStorage, nonce: u64, operator: &Addr) {
        VALSET_CONFIRMS
            .save(
                storage,
                (nonce, operator),
                &crate::state::ValsetConfirm {
                    nonce,
                    validator: operator.clone(),
                    orchestrator: operator.clone(),
                    eth_address: EthAddress::from_bytes([0x01; 20]),
                    signature: Binary::from(vec![0u8; 65]),
                },
            )
            .unwrap();
    }

    fn info(storage: &MockStorage, operator: &Addr) -> ValidatorInfo {
        KEEPER.validator(storage, operator).unwrap().unwrap()
    }

    #[test]
    fn test_valset_slashing_spares_confirmers_and_late_joiners() {
        let mut deps = mock_dependencies();
        PARAMS.save(&mut deps.storage, &params()).unwrap();
        let signer = validator(&mut deps.storage, "val_signer", 1);
        let lazy = validator(&mut deps.storage, "val_lazy", 1);
        let late = validator(&mut deps.storage, "val_late", 60);

        store_valset(&mut deps.storage, 50);
        confirm_valset(&mut deps.storage, 50, &signer);

        // Window not elapsed
        let events =
            slash_unconfirmed(&mut deps.storage, &deps.api, &env_at(60), &KEEPER).unwrap();
        assert!(events.is_empty());

        let events =
            slash_unconfirmed(&mut deps.storage, &deps.api, &env_at(61), &KEEPER).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(LAST_SLASHED_VALSET_NONCE.load(&deps.storage).unwrap(), 50);

        let lazy = info(&deps.storage, &lazy);
        assert!(lazy.jailed);
        assert_eq!(lazy.power, 900);
        assert!(!info(&deps.storage, &signer).jailed);
        assert!(!info(&deps.storage, &late).jailed);

        // Each record is slashed once
        let events =
            slash_unconfirmed(&mut deps.storage, &deps.api, &env_at(62), &KEEPER).unwrap();
        assert!(events.is_empty());
        assert_eq!(info(&deps.storage, &lazy.operator).power, 900);
    }

    #[test]
    fn test_jailed_validators_are_skipped_across_records() {
        let mut deps = mock_dependencies();
        PARAMS.save(&mut deps.storage, &params()).unwrap();
        let lazy = validator(&mut deps.storage, "val_lazy", 1);
        store_valset(&mut deps.storage, 20);
        store_valset(&mut deps.storage, 30);

        let events =
            slash_unconfirmed(&mut deps.storage, &deps.api, &env_at(100), &KEEPER).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(info(&deps.storage, &lazy).power, 900);
        assert_eq!(LAST_SLASHED_VALSET_NONCE.load(&deps.storage).unwrap(), 30);
    }

    #[test]
    fn test_unbonding_validator_slashing_window() {
        let mut deps = mock_dependencies();
        PARAMS.save(&mut deps.storage, &params()).unwrap();
        let leaving = validator(&mut deps.storage, "val_leaving", 1);
        let gone = validator(&mut deps.storage, "val_gone", 1);
        begin_unbonding(&mut deps.storage, &leaving, 45).unwrap();
        begin_unbonding(&mut deps.storage, &gone, 30).unwrap();

        // 50 < 45 + 10 so val_leaving is still liable; 50 >= 30 + 10 so val_gone is not
        store_valset(&mut deps.storage, 50);
        let events =
            slash_unconfirmed(&mut deps.storage, &deps.api, &env_at(61), &KEEPER).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].attributes[1].value,
            SlashCondition::UnbondingMissingValsetConfirm.as_str()
        );
        assert!(info(&deps.storage, &leaving).jailed);
        assert!(!info(&deps.storage, &gone).jailed);
    }

    #[test]
    fn test_batch_slashing() {
        let mut deps = mock_dependencies();
        PARAMS.save(&mut deps.storage, &params()).unwrap();
        let signer = validator(&mut deps.storage, "val_signer", 1);
        let lazy = validator(&mut deps.storage, "val_lazy", 1);
        let token = EthAddress::from_bytes([0xaa; 20]);

        let batch = OutgoingTxBatch {
            batch_nonce: 1,
            token_contract: token.clone(),
            transactions: vec![],
            total_fee: Uint128::zero(),
            block: 40,
            created_at: mock_env().block.time,
            batch_timeout: 1000,
            status: BatchStatus::Pending,
        };
        OUTGOING_BATCHES
            .save(&mut deps.storage, (token.as_str(), 1), &batch)
            .unwrap();
        BATCH_CONFIRMS
            .save(
                &mut deps.storage,
                (token.as_str(), 1, &signer),
                &crate::state::BatchConfirm {
                    nonce: 1,
                    token_contract: token.clone(),
                    validator: signer.clone(),
                    orchestrator: signer.clone(),
                    eth_address: EthAddress::from_bytes([0x01; 20]),
                    signature: Binary::from(vec![0u8; 65]),
                },
            )
            .unwrap();

        let events =
            slash_unconfirmed(&mut deps.storage, &deps.api, &env_at(51), &KEEPER).unwrap();
        assert_eq!(events.len(), 1);
        assert!(info(&deps.storage, &lazy).jailed);
        assert!(!info(&deps.storage, &signer).jailed);
        assert_eq!(LAST_SLASHED_BATCH_BLOCK.load(&deps.storage).unwrap(), 40);
    }

    #[test]
    fn test_claim_slashing_only_after_window() {
        let mut deps = mock_dependencies();
        PARAMS.save(&mut deps.storage, &params()).unwrap();
        let voter = validator(&mut deps.storage, "val_voter", 1);
        let absent = validator(&mut deps.storage, "val_absent", 1);
        let voter_index = info(&deps.storage, &voter).index;

        let claim = EventClaim {
            event_nonce: 1,
            eth_block_height: 10,
            payload: ClaimPayload::BatchExecuted {
                batch_nonce: 1,
                token_contract: EthAddress::from_bytes([0xaa; 20]),
            },
        };
        let hash = claim.hash().unwrap();
        ATTESTATIONS
            .save(
                &mut deps.storage,
                (1, hash.as_slice()),
                &Attestation {
                    event_nonce: 1,
                    claim_hash: hash.to_vec().into(),
                    claim,
                    votes: vec![voter_index],
                    observed: true,
                    height: 30,
                    apply_error: None,
                },
            )
            .unwrap();
        LAST_OBSERVED_EVENT_NONCE.save(&mut deps.storage, &1).unwrap();

        let events =
            slash_unconfirmed(&mut deps.storage, &deps.api, &env_at(40), &KEEPER).unwrap();
        assert!(events.is_empty());
        assert!(LAST_SLASHED_CLAIM_NONCE
            .may_load(&deps.storage)
            .unwrap()
            .is_none());

        let events =
            slash_unconfirmed(&mut deps.storage, &deps.api, &env_at(41), &KEEPER).unwrap();
        assert_eq!(events.len(), 1);
        assert!(info(&deps.storage, &absent).jailed);
        assert!(!info(&deps.storage, &voter).jailed);
        assert_eq!(LAST_SLASHED_CLAIM_NONCE.load(&deps.storage).unwrap(), 1);
    }

    #[test]
    fn test_late_voter_is_not_slashed() {
        let mut deps = mock_dependencies();
        PARAMS.save(&mut deps.storage, &params()).unwrap();
        let vals: Vec<ValidatorInfo> = [("val_a", 34), ("val_b", 33), ("val_c", 33)]
            .iter()
            .map(|(name, power)| {
                let operator = Addr::unchecked(*name);
                set_validator_power(&mut deps.storage, &operator, *power, 1).unwrap()
            })
            .collect();
        let claim = EventClaim {
            event_nonce: 1,
            eth_block_height: 10,
            payload: ClaimPayload::ValsetUpdated {
                valset_nonce: 0,
                members: vec![],
            },
        };

        for (validator, height) in [(&vals[0], 20), (&vals[1], 20), (&vals[2], 21)] {
            submit_claim(
                &mut deps.storage,
                &deps.api,
                &env_at(height),
                &KEEPER,
                validator,
                claim.clone(),
            )
            .unwrap();
        }

        let events =
            slash_unconfirmed(&mut deps.storage, &deps.api, &env_at(40), &KEEPER).unwrap();
        assert!(events.is_empty());
        assert_eq!(LAST_SLASHED_CLAIM_NONCE.load(&deps.storage).unwrap(), 1);
        assert!(!info(&deps.storage, &vals[2].operator).jailed);
    }

    #[test]
    fn test_early_chain_heights_do_not_underflow() {
        let mut deps = mock_dependencies();
        PARAMS.save(&mut deps.storage, &params()).unwrap();
        validator(&mut deps.storage, "val_lazy", 1);
        store_valset(&mut deps.storage, 2);
        let events =
            slash_unconfirmed(&mut deps.storage, &deps.api, &env_at(5), &KEEPER).unwrap();
        assert!(events.is_empty());
    }
}
