//! End blocker tests: signer-set requests and slashing for missed confirmations.

mod helpers;

use cosmwasm_std::Decimal;
use cw_multi_test::{AppResponse, Executor};

use gravity::checkpoint::valset_checkpoint;
use gravity::msg::{ExecuteMsg, QueryMsg, SudoMsg, ValsetsResponse};
use gravity::state::{ValidatorInfo, Valset};

use helpers::{default_params, event_attr, has_event, setup_with_params, TestEnv, GRAVITY_ID};

const WINDOW: u64 = 10;

fn setup_short_windows() -> TestEnv {
    let mut params = default_params();
    params.signed_valsets_window = WINDOW;
    params.signed_batches_window = WINDOW;
    params.signed_claims_window = WINDOW;
    params.unbond_slashing_valsets_window = WINDOW;
    params.slash_fraction_valset = Decimal::percent(10);
    setup_with_params(params)
}

fn latest_valset(env: &TestEnv) -> Valset {
    let res: ValsetsResponse = env.query(&QueryMsg::LastValsetRequests { limit: Some(1) });
    res.valsets.into_iter().next().unwrap()
}

fn confirm_valset(env: &mut TestEnv, validator: usize, valset: &Valset) {
    let checkpoint = valset_checkpoint(GRAVITY_ID, valset.nonce, &valset.members).unwrap();
    let signature = env.validators[validator].sign(&checkpoint);
    env.app
        .execute_contract(
            env.validators[validator].orchestrator.clone(),
            env.contract_addr.clone(),
            &ExecuteMsg::ValsetConfirm {
                nonce: valset.nonce,
                signature,
            },
            &[],
        )
        .unwrap();
}

fn validator(env: &TestEnv, idx: usize) -> ValidatorInfo {
    let info: Option<ValidatorInfo> = env.query(&QueryMsg::Validator {
        operator: env.validators[idx].operator.to_string(),
    });
    info.unwrap()
}

/// Run `blocks` end blocks and return the responses that slashed someone.
fn run_blocks(env: &mut TestEnv, blocks: u64) -> Vec<AppResponse> {
    (0..blocks)
        .map(|_| env.end_block())
        .filter(|res| has_event(res, "slash"))
        .collect()
}

#[test]
fn test_first_end_block_requests_valset() {
    let mut env = setup_short_windows();
    let res = env.end_block();
    assert!(has_event(&res, "valset_request"));
    assert_eq!(event_attr(&res, "valset_request", "members").unwrap(), "3");

    let valset = latest_valset(&env);
    assert_eq!(valset.members.len(), 3);
    // Power descending
    assert!(valset.members[0].power > valset.members[1].power);
    assert!(valset.members[1].power > valset.members[2].power);

    // Unchanged power, no new request
    let res = env.end_block();
    assert!(!has_event(&res, "valset_request"));
}

#[test]
fn test_missing_valset_confirm_is_slashed_once() {
    let mut env = setup_short_windows();
    env.end_block();
    let valset = latest_valset(&env);
    confirm_valset(&mut env, 0, &valset);
    confirm_valset(&mut env, 1, &valset);

    // Nothing happens inside the window
    assert!(run_blocks(&mut env, WINDOW).is_empty());

    let slashed = run_blocks(&mut env, 2);
    assert_eq!(slashed.len(), 1);
    let res = &slashed[0];
    assert_eq!(
        event_attr(res, "slash", "validator").unwrap(),
        env.validators[2].operator.to_string()
    );
    assert_eq!(
        event_attr(res, "slash", "reason").unwrap(),
        "missing_valset_confirm"
    );
    assert_eq!(
        event_attr(res, "slash", "nonce").unwrap(),
        valset.nonce.to_string()
    );

    let val2 = validator(&env, 2);
    assert!(val2.jailed);
    assert_eq!(val2.power, 18);
    assert_eq!(validator(&env, 0).power, 50);
    assert!(!validator(&env, 1).jailed);

    // Checked sets are never revisited
    assert!(run_blocks(&mut env, 3).is_empty());
}

#[test]
fn test_unbonding_validator_stays_liable() {
    let mut env = setup_short_windows();
    env.end_block();
    let first = latest_valset(&env);
    for idx in 0..3 {
        confirm_valset(&mut env, idx, &first);
    }

    // Unbonding triggers a request without the leaving validator
    let operator = env.validators[2].operator.to_string();
    env.app
        .wasm_sudo(
            env.contract_addr.clone(),
            &SudoMsg::BeginUnbonding { operator },
        )
        .unwrap();
    let res = env.end_block();
    assert!(has_event(&res, "valset_request"));
    let second = latest_valset(&env);
    assert!(second.nonce > first.nonce);
    assert_eq!(second.members.len(), 2);
    confirm_valset(&mut env, 0, &second);
    confirm_valset(&mut env, 1, &second);

    let slashed = run_blocks(&mut env, WINDOW + 2);
    assert_eq!(slashed.len(), 1);
    let res = &slashed[0];
    assert_eq!(
        event_attr(res, "slash", "reason").unwrap(),
        "unbonding_missing_valset_confirm"
    );
    assert_eq!(
        event_attr(res, "slash", "nonce").unwrap(),
        second.nonce.to_string()
    );

    let val2 = validator(&env, 2);
    assert!(val2.jailed);
    assert_eq!(val2.power, 18);
}
