//! Ethereum event claims.
//!
//! A claim is one orchestrator's report of an event emitted by the Gravity
//! contract on Ethereum. Claims from different validators that agree on every
//! field hash identically and are aggregated into one attestation.

use common::EthAddress;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{to_json_vec, Api, Attribute, CosmosMsg, StdResult, Storage, Uint128};

use crate::batch;
use crate::checkpoint::keccak256;
use crate::error::ContractError;
use crate::state::{
    BridgeValidator, TokenMapping, TokenOrigin, LAST_OBSERVED_VALSET_NONCE, VALSETS,
};
use crate::token_registry;

#[cw_serde]
pub enum ClaimPayload {
    /// Tokens locked in the Ethereum contract for a receiver on this chain
    Deposit {
        token_contract: EthAddress,
        amount: Uint128,
        ethereum_sender: EthAddress,
        receiver: String,
    },
    /// An outgoing batch was executed on Ethereum
    BatchExecuted {
        batch_nonce: u64,
        token_contract: EthAddress,
    },
    /// An ERC20 representing a local asset was deployed
    Erc20Deployed {
        denom: String,
        token_contract: EthAddress,
        name: String,
        symbol: String,
        decimals: u8,
    },
    /// A signer set was installed on the Ethereum contract
    ValsetUpdated {
        valset_nonce: u64,
        members: Vec<BridgeValidator>,
    },
}

#[cw_serde]
pub struct EventClaim {
    pub event_nonce: u64,
    pub eth_block_height: u64,
    pub payload: ClaimPayload,
}

#[cw_serde]
#[derive(Copy, Eq, PartialOrd, Ord)]
pub enum ClaimType {
    Deposit,
    BatchExecuted,
    Erc20Deployed,
    ValsetUpdated,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Deposit => "deposit",
            ClaimType::BatchExecuted => "batch_executed",
            ClaimType::Erc20Deployed => "erc20_deployed",
            ClaimType::ValsetUpdated => "valset_updated",
        }
    }

    /// Storage tag
    pub fn as_byte(&self) -> u8 {
        match self {
            ClaimType::Deposit => 1,
            ClaimType::BatchExecuted => 2,
            ClaimType::Erc20Deployed => 3,
            ClaimType::ValsetUpdated => 4,
        }
    }
}

impl EventClaim {
    pub fn claim_type(&self) -> ClaimType {
        match self.payload {
            ClaimPayload::Deposit { .. } => ClaimType::Deposit,
            ClaimPayload::BatchExecuted { .. } => ClaimType::BatchExecuted,
            ClaimPayload::Erc20Deployed { .. } => ClaimType::Erc20Deployed,
            ClaimPayload::ValsetUpdated { .. } => ClaimType::ValsetUpdated,
        }
    }

    /// keccak256 of the canonical JSON encoding. Identical claims from
    /// different validators produce the same hash.
    pub fn hash(&self) -> StdResult<[u8; 32]> {
        Ok(keccak256(&to_json_vec(self)?))
    }

    /// Key suffix for the per-validator claim record: type tag followed by hash
    pub fn storage_suffix(&self) -> StdResult<Vec<u8>> {
        let mut suffix = Vec::with_capacity(33);
        suffix.push(self.claim_type().as_byte());
        suffix.extend_from_slice(&self.hash()?);
        Ok(suffix)
    }

    /// Stateless checks performed before a claim is accepted.
    pub fn validate_basic(&self) -> Result<(), ContractError> {
        if self.event_nonce == 0 {
            return Err(ContractError::InvalidClaim {
                reason: "event nonce must be positive".to_string(),
            });
        }
        match &self.payload {
            ClaimPayload::Deposit {
                amount, receiver, ..
            } => {
                if amount.is_zero() {
                    return Err(ContractError::InvalidClaim {
                        reason: "deposit amount must be positive".to_string(),
                    });
                }
                if receiver.is_empty() {
                    return Err(ContractError::InvalidClaim {
                        reason: "deposit receiver must not be empty".to_string(),
                    });
                }
            }
            ClaimPayload::Erc20Deployed { denom, .. } if denom.is_empty() => {
                return Err(ContractError::InvalidClaim {
                    reason: "deployed denom must not be empty".to_string(),
                });
            }
            _ => {}
        }
        Ok(())
    }
}

/// What applying an observed claim produced.
#[derive(Debug, Default, PartialEq)]
pub struct ClaimEffects {
    /// Messages to dispatch (unlocks, mints)
    pub messages: Vec<CosmosMsg>,
    pub attributes: Vec<Attribute>,
}

/// Apply the side effects of an observed claim.
///
/// Callers run this against a write buffer and discard it on error.
pub fn apply(
    claim: &EventClaim,
    storage: &mut dyn Storage,
    api: &dyn Api,
) -> Result<ClaimEffects, ContractError> {
    let mut effects = ClaimEffects::default();

    match &claim.payload {
        ClaimPayload::Deposit {
            token_contract,
            amount,
            ethereum_sender,
            receiver,
        } => {
            let mapping = token_registry::mapping_for_token(storage, token_contract)?.ok_or(
                ContractError::TokenNotSupported {
                    token: token_contract.to_string(),
                },
            )?;
            let receiver_addr =
                api.addr_validate(receiver)
                    .map_err(|err| ContractError::InvalidClaim {
                        reason: format!("invalid receiver {}: {}", receiver, err),
                    })?;

            effects
                .messages
                .push(token_registry::release_msg(&mapping, &receiver_addr, *amount)?);
            effects.attributes.extend([
                Attribute::new("ethereum_sender", ethereum_sender.to_string()),
                Attribute::new("receiver", receiver_addr.to_string()),
                Attribute::new("asset", mapping.asset.key()),
                Attribute::new("amount", amount.to_string()),
            ]);
        }
        ClaimPayload::BatchExecuted {
            batch_nonce,
            token_contract,
        } => {
            let (executed, cancelled) = batch::mark_executed(storage, token_contract, *batch_nonce)?;
            effects.attributes.extend([
                Attribute::new("token_contract", token_contract.to_string()),
                Attribute::new("batch_nonce", executed.batch_nonce.to_string()),
                Attribute::new("tx_count", executed.transactions.len().to_string()),
            ]);
            if !cancelled.is_empty() {
                let nonces: Vec<String> =
                    cancelled.iter().map(|b| b.batch_nonce.to_string()).collect();
                effects
                    .attributes
                    .push(Attribute::new("cancelled_batches", nonces.join(",")));
            }
        }
        ClaimPayload::Erc20Deployed {
            denom,
            token_contract,
            symbol,
            decimals,
            ..
        } => {
            let asset = token_registry::asset_from_denom(api, denom)?;
            token_registry::register(
                storage,
                &TokenMapping {
                    asset,
                    token_contract: token_contract.clone(),
                    origin: TokenOrigin::CosmosOriginated,
                },
            )?;
            effects.attributes.extend([
                Attribute::new("denom", denom.clone()),
                Attribute::new("token_contract", token_contract.to_string()),
                Attribute::new("symbol", symbol.clone()),
                Attribute::new("decimals", decimals.to_string()),
            ]);
        }
        ClaimPayload::ValsetUpdated {
            valset_nonce,
            members,
        } => {
            // Nonce 0 is the set the Ethereum contract was deployed with
            if *valset_nonce != 0 {
                let stored = VALSETS.may_load(storage, *valset_nonce)?.ok_or(
                    ContractError::UnknownNonce {
                        nonce: *valset_nonce,
                    },
                )?;
                if &stored.members != members {
                    return Err(ContractError::InvalidClaim {
                        reason: format!(
                            "members of valset {} do not match the stored request",
                            valset_nonce
                        ),
                    });
                }
            }
            let last = LAST_OBSERVED_VALSET_NONCE.may_load(storage)?.unwrap_or(0);
            LAST_OBSERVED_VALSET_NONCE.save(storage, &last.max(*valset_nonce))?;
            effects
                .attributes
                .push(Attribute::new("valset_nonce", valset_nonce.to_string()));
        }
    }

    Ok(effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Params, PARAMS};
    use crate::pool;
    use crate::state::{Valset, OUTGOING_BATCHES};
    use common::AssetInfo;
    use cosmwasm_std::testing::{mock_dependencies, mock_env};
    use cosmwasm_std::{Addr, BankMsg, Coin};

    fn token() -> EthAddress {
        EthAddress::from_bytes([0xaa; 20])
    }

    fn deposit(nonce: u64, receiver: &str) -> EventClaim {
        EventClaim {
            event_nonce: nonce,
            eth_block_height: 100,
            payload: ClaimPayload::Deposit {
                token_contract: token(),
                amount: Uint128::new(500),
                ethereum_sender: EthAddress::from_bytes([0x05; 20]),
                receiver: receiver.to_string(),
            },
        }
    }

    fn register_native(storage: &mut dyn Storage) {
        token_registry::register(
            storage,
            &TokenMapping {
                asset: AssetInfo::Native {
                    denom: "uatom".to_string(),
                },
                token_contract: token(),
                origin: TokenOrigin::CosmosOriginated,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_hash_is_content_addressed() {
        let a = deposit(1, "cosmos1receiver");
        let b = deposit(1, "cosmos1receiver");
        let c = deposit(1, "cosmos1other");
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
        assert_ne!(a.hash().unwrap(), c.hash().unwrap());

        let suffix = a.storage_suffix().unwrap();
        assert_eq!(suffix.len(), 33);
        assert_eq!(suffix[0], ClaimType::Deposit.as_byte());
    }

    #[test]
    fn test_validate_basic() {
        assert!(deposit(1, "cosmos1receiver").validate_basic().is_ok());
        assert!(deposit(0, "cosmos1receiver").validate_basic().is_err());
        assert!(deposit(1, "").validate_basic().is_err());
    }

    #[test]
    fn test_apply_deposit_unlocks() {
        let mut deps = mock_dependencies();
        register_native(deps.as_mut().storage);

        let effects = apply(
            &deposit(1, "cosmos1receiver"),
            &mut deps.storage,
            &deps.api,
        )
        .unwrap();
        assert_eq!(
            effects.messages,
            vec![CosmosMsg::Bank(BankMsg::Send {
                to_address: "cosmos1receiver".to_string(),
                amount: vec![Coin::new(500, "uatom")],
            })]
        );
    }

    #[test]
    fn test_apply_deposit_unknown_token_fails() {
        let mut deps = mock_dependencies();
        let err = apply(
            &deposit(1, "cosmos1receiver"),
            &mut deps.storage,
            &deps.api,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::TokenNotSupported { .. }));
    }

    #[test]
    fn test_apply_erc20_deployed_registers_once() {
        let mut deps = mock_dependencies();
        let claim = EventClaim {
            event_nonce: 1,
            eth_block_height: 10,
            payload: ClaimPayload::Erc20Deployed {
                denom: "uatom".to_string(),
                token_contract: token(),
                name: "Atom".to_string(),
                symbol: "ATOM".to_string(),
                decimals: 6,
            },
        };
        apply(&claim, &mut deps.storage, &deps.api).unwrap();
        let mapping = token_registry::mapping_for_token(&deps.storage, &token())
            .unwrap()
            .unwrap();
        assert_eq!(mapping.origin, TokenOrigin::CosmosOriginated);

        let err = apply(&claim, &mut deps.storage, &deps.api).unwrap_err();
        assert!(matches!(err, ContractError::TokenAlreadyRegistered { .. }));
    }

    #[test]
    fn test_apply_batch_executed() {
        let mut deps = mock_dependencies();
        PARAMS
            .save(
                deps.as_mut().storage,
                &Params::default_for("gravity-test", EthAddress::from_bytes([0x42; 20])),
            )
            .unwrap();
        pool::add_to_outgoing_pool(
            deps.as_mut().storage,
            Addr::unchecked("cosmos1sender"),
            EthAddress::from_bytes([0x01; 20]),
            token(),
            Uint128::new(100),
            Uint128::new(1),
        )
        .unwrap();
        batch::build_batch(deps.as_mut().storage, &mock_env(), &token(), 1, false).unwrap();

        let claim = EventClaim {
            event_nonce: 1,
            eth_block_height: 10,
            payload: ClaimPayload::BatchExecuted {
                batch_nonce: 1,
                token_contract: token(),
            },
        };
        apply(&claim, &mut deps.storage, &deps.api).unwrap();
        assert!(!OUTGOING_BATCHES.has(&deps.storage, (token().as_str(), 1)));

        let err = apply(&claim, &mut deps.storage, &deps.api).unwrap_err();
        assert_eq!(err, ContractError::UnknownNonce { nonce: 1 });
    }

    #[test]
    fn test_apply_valset_updated_checks_members() {
        let mut deps = mock_dependencies();
        let members = vec![BridgeValidator {
            power: u32::MAX as u64,
            ethereum_address: EthAddress::from_bytes([0x11; 20]),
        }];
        VALSETS
            .save(
                deps.as_mut().storage,
                12,
                &Valset {
                    nonce: 12,
                    height: 12,
                    members: members.clone(),
                },
            )
            .unwrap();

        let mut claim = EventClaim {
            event_nonce: 1,
            eth_block_height: 10,
            payload: ClaimPayload::ValsetUpdated {
                valset_nonce: 12,
                members: vec![],
            },
        };
        assert!(apply(&claim, &mut deps.storage, &deps.api).is_err());
        assert!(LAST_OBSERVED_VALSET_NONCE
            .may_load(&deps.storage)
            .unwrap()
            .is_none());

        claim.payload = ClaimPayload::ValsetUpdated {
            valset_nonce: 12,
            members,
        };
        apply(&claim, &mut deps.storage, &deps.api).unwrap();
        assert_eq!(LAST_OBSERVED_VALSET_NONCE.load(&deps.storage).unwrap(), 12);
    }
}
