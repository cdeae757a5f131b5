//! Shared cw-multi-test harness: a gravity contract with three bonded
//! validators (power 50/30/20), each with an orchestrator and a k256 key.

#![allow(dead_code)]

use common::EthAddress;
use cosmwasm_std::{coins, Addr, Binary, Empty};
use cw_multi_test::{next_block, App, AppResponse, ContractWrapper, Executor};
use k256::ecdsa::SigningKey;
use serde::de::DeserializeOwned;

use gravity::checkpoint::{eth_address_from_pubkey, eth_signed_message_hash};
use gravity::claims::ClaimPayload;
use gravity::msg::{ExecuteMsg, InstantiateMsg, QueryMsg, SudoMsg};
use gravity::Params;

pub const GRAVITY_ID: &str = "gravity-test";
pub const DENOM: &str = "uatom";

pub fn contract_gravity() -> Box<dyn cw_multi_test::Contract<Empty>> {
    let contract = ContractWrapper::new(
        gravity::contract::execute,
        gravity::contract::instantiate,
        gravity::contract::query,
    )
    .with_sudo(gravity::contract::sudo)
    .with_reply(gravity::contract::reply);
    Box::new(contract)
}

pub fn contract_cw20() -> Box<dyn cw_multi_test::Contract<Empty>> {
    let contract = ContractWrapper::new(
        cw20_base::contract::execute,
        cw20_base::contract::instantiate,
        cw20_base::contract::query,
    );
    Box::new(contract)
}

pub fn bridge_address() -> EthAddress {
    EthAddress::from_bytes([0x42; 20])
}

pub fn default_params() -> Params {
    Params::default_for(GRAVITY_ID, bridge_address())
}

pub struct TestValidator {
    pub operator: Addr,
    pub orchestrator: Addr,
    pub key: SigningKey,
}

impl TestValidator {
    pub fn eth_address(&self) -> EthAddress {
        let point = self.key.verifying_key().to_encoded_point(false);
        eth_address_from_pubkey(point.as_bytes()).unwrap()
    }

    /// 65-byte `r || s || v` signature as an Ethereum wallet produces it
    pub fn sign(&self, checkpoint: &[u8; 32]) -> Binary {
        let digest = eth_signed_message_hash(checkpoint);
        let (signature, recovery_id) = self.key.sign_prehash_recoverable(&digest).unwrap();
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(27 + recovery_id.to_byte());
        Binary::from(bytes)
    }
}

pub struct TestEnv {
    pub app: App,
    pub contract_addr: Addr,
    pub admin: Addr,
    pub user: Addr,
    pub validators: Vec<TestValidator>,
}

pub fn setup() -> TestEnv {
    setup_with_params(default_params())
}

pub fn setup_with_params(params: Params) -> TestEnv {
    let mut app = App::default();
    let admin = Addr::unchecked("cosmos1admin");
    let user = Addr::unchecked("cosmos1user");

    app.init_modules(|router, _, storage| {
        router
            .bank
            .init_balance(storage, &user, coins(10_000_000, DENOM))
            .unwrap();
    });

    let code_id = app.store_code(contract_gravity());
    let contract_addr = app
        .instantiate_contract(
            code_id,
            admin.clone(),
            &InstantiateMsg {
                admin: admin.to_string(),
                params,
            },
            &[],
            "gravity",
            Some(admin.to_string()),
        )
        .unwrap();

    let mut validators = vec![];
    for (i, power) in [50u64, 30, 20].into_iter().enumerate() {
        let validator = TestValidator {
            operator: Addr::unchecked(format!("cosmos1val{}", i)),
            orchestrator: Addr::unchecked(format!("cosmos1orch{}", i)),
            key: SigningKey::from_slice(&[i as u8 + 1; 32]).unwrap(),
        };
        app.wasm_sudo(
            contract_addr.clone(),
            &SudoMsg::SetValidatorPower {
                operator: validator.operator.to_string(),
                power,
            },
        )
        .unwrap();
        app.execute_contract(
            validator.operator.clone(),
            contract_addr.clone(),
            &ExecuteMsg::SetOrchestratorAddress {
                orchestrator: validator.orchestrator.to_string(),
                eth_address: validator.eth_address().to_string(),
            },
            &[],
        )
        .unwrap();
        validators.push(validator);
    }

    // Records created from here on postdate every validator's bonding
    app.update_block(next_block);

    TestEnv {
        app,
        contract_addr,
        admin,
        user,
        validators,
    }
}

impl TestEnv {
    /// Run the end blocker at the current height, then move to the next block.
    pub fn end_block(&mut self) -> AppResponse {
        let res = self
            .app
            .wasm_sudo(self.contract_addr.clone(), &SudoMsg::EndBlocker {})
            .unwrap();
        self.app.update_block(next_block);
        res
    }

    pub fn submit_claim(
        &mut self,
        validator: usize,
        event_nonce: u64,
        eth_block_height: u64,
        claim: ClaimPayload,
    ) -> AppResponse {
        self.app
            .execute_contract(
                self.validators[validator].orchestrator.clone(),
                self.contract_addr.clone(),
                &ExecuteMsg::SubmitClaim {
                    event_nonce,
                    eth_block_height,
                    claim,
                },
                &[],
            )
            .unwrap()
    }

    pub fn query<T: DeserializeOwned>(&self, msg: &QueryMsg) -> T {
        self.app
            .wrap()
            .query_wasm_smart(self.contract_addr.clone(), msg)
            .unwrap()
    }
}

pub fn has_event(res: &AppResponse, ty: &str) -> bool {
    let wasm_ty = format!("wasm-{}", ty);
    res.events.iter().any(|event| event.ty == wasm_ty)
}

pub fn event_attr(res: &AppResponse, ty: &str, key: &str) -> Option<String> {
    let wasm_ty = format!("wasm-{}", ty);
    res.events
        .iter()
        .filter(|event| event.ty == wasm_ty)
        .flat_map(|event| event.attributes.iter())
        .find(|attr| attr.key == key)
        .map(|attr| attr.value.clone())
}

/// Value of a response attribute set on the contract's `wasm` event
pub fn wasm_attr(res: &AppResponse, key: &str) -> Option<String> {
    res.events
        .iter()
        .filter(|event| event.ty == "wasm")
        .flat_map(|event| event.attributes.iter())
        .find(|attr| attr.key == key)
        .map(|attr| attr.value.clone())
}
