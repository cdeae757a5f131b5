//! Per-block processing, invoked by the host through `SudoMsg::EndBlocker`.

use cosmwasm_std::{Api, Env, Event, StdResult, Storage, SubMsg};

use crate::attestation::{prune_attestations, tally_sweep};
use crate::batch::{
    batch_cancelled_event, batch_created_event, cancel_timed_out_batches,
    create_batches_for_pending_tokens,
};
use crate::error::ContractError;
use crate::slashing::slash_unconfirmed;
use crate::staking::StakingKeeper;
use crate::valset::{maybe_request_valset, prune_valsets, valset_request_event};

/// Everything the end blocker wants the host to see.
#[derive(Debug, Default)]
pub struct EndBlockOutcome {
    pub messages: Vec<SubMsg>,
    pub events: Vec<Event>,
    pub pruned_valsets: usize,
    pub pruned_attestations: u64,
}

pub fn end_blocker(
    storage: &mut dyn Storage,
    api: &dyn Api,
    env: &Env,
    keeper: &dyn StakingKeeper,
) -> Result<EndBlockOutcome, ContractError> {
    let mut outcome = EndBlockOutcome::default();

    outcome
        .events
        .extend(slash_unconfirmed(storage, api, env, keeper)?);

    let tally = tally_sweep(storage, api, env, keeper)?;
    outcome.messages.extend(tally.messages);
    outcome.events.extend(tally.events);

    if let Some(valset) = maybe_request_valset(storage, api, keeper, env)? {
        outcome.events.push(valset_request_event(&valset));
    }

    for batch in cancel_timed_out_batches(storage)? {
        outcome.events.push(batch_cancelled_event(&batch));
    }
    for batch in create_batches_for_pending_tokens(storage, api, env)? {
        outcome.events.push(batch_created_event(&batch));
    }

    let (pruned_valsets, pruned_attestations) = prune(storage, env)?;
    outcome.pruned_valsets = pruned_valsets;
    outcome.pruned_attestations = pruned_attestations;

    Ok(outcome)
}

fn prune(storage: &mut dyn Storage, env: &Env) -> StdResult<(usize, u64)> {
    let valsets = prune_valsets(storage, env)?.len();
    let attestations = prune_attestations(storage)?;
    Ok((valsets, attestations))
}
