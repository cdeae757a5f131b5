//! Checkpoint computation for signer sets and outgoing batches
//!
//! Produces byte-identical output to the Gravity Solidity contract, which
//! recomputes these hashes to verify validator signatures.
//!
//! # Solidity Reference
//! ```solidity
//! // signer set
//! keccak256(abi.encode(
//!     gravityId,              // bytes32
//!     bytes32("checkpoint"),
//!     valsetNonce,            // uint256
//!     validators,             // address[]
//!     powers                  // uint256[]
//! ));
//!
//! // batch
//! keccak256(abi.encode(
//!     gravityId,              // bytes32
//!     bytes32("transactionBatch"),
//!     amounts,                // uint256[]
//!     destinations,           // address[]
//!     fees,                   // uint256[]
//!     batchNonce,             // uint256
//!     tokenContract,          // address
//!     batchTimeout            // uint256
//! ));
//! ```
//!
//! # abi.encode layout
//! Static arguments occupy one 32-byte head slot each. A dynamic array puts the
//! byte offset of its tail (measured from the start of the encoding) in its head
//! slot; the tail holds the length word followed by one word per element.

use common::EthAddress;
use cosmwasm_std::{StdError, StdResult, Uint128};
use tiny_keccak::{Hasher, Keccak};

use crate::state::{BridgeValidator, OutgoingTransferTx};

/// Method name mixed into every signer-set checkpoint
pub const VALSET_METHOD_NAME: &str = "checkpoint";

/// Method name mixed into every batch checkpoint
pub const BATCH_METHOD_NAME: &str = "transactionBatch";

/// Prefix Ethereum clients prepend before signing a 32-byte digest
const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Compute keccak256 hash of arbitrary data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// One `abi.encode` argument
enum AbiToken {
    Word([u8; 32]),
    Array(Vec<[u8; 32]>),
}

fn abi_encode(tokens: &[AbiToken]) -> Vec<u8> {
    let head_len = tokens.len() * 32;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            AbiToken::Word(word) => head.extend_from_slice(word),
            AbiToken::Array(items) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                tail.extend_from_slice(&uint_word(items.len() as u128));
                for item in items {
                    tail.extend_from_slice(item);
                }
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// uint256 word, big-endian, left-padded
fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Solidity `bytes32` literal: UTF-8 bytes, right-padded with zeros
pub fn string_to_bytes32(value: &str) -> StdResult<[u8; 32]> {
    let bytes = value.as_bytes();
    if bytes.len() > 32 {
        return Err(StdError::generic_err(format!(
            "'{}' does not fit in bytes32",
            value
        )));
    }
    let mut word = [0u8; 32];
    word[..bytes.len()].copy_from_slice(bytes);
    Ok(word)
}

/// Compute the signer-set checkpoint the Gravity contract stores and verifies against.
///
/// `members` must already be in canonical order (power descending, address ascending).
pub fn valset_checkpoint(
    gravity_id: &str,
    nonce: u64,
    members: &[BridgeValidator],
) -> StdResult<[u8; 32]> {
    let encoded = abi_encode(&[
        AbiToken::Word(string_to_bytes32(gravity_id)?),
        AbiToken::Word(string_to_bytes32(VALSET_METHOD_NAME)?),
        AbiToken::Word(uint_word(nonce as u128)),
        AbiToken::Array(
            members
                .iter()
                .map(|m| m.ethereum_address.to_word())
                .collect(),
        ),
        AbiToken::Array(members.iter().map(|m| uint_word(m.power as u128)).collect()),
    ]);
    Ok(keccak256(&encoded))
}

/// Compute the batch checkpoint submitted alongside `submitBatch`.
pub fn batch_checkpoint(
    gravity_id: &str,
    batch_nonce: u64,
    token_contract: &EthAddress,
    batch_timeout: u64,
    transactions: &[OutgoingTransferTx],
) -> StdResult<[u8; 32]> {
    let amounts = transactions.iter().map(|tx| uint_amount(tx.amount)).collect();
    let destinations = transactions
        .iter()
        .map(|tx| tx.dest_address.to_word())
        .collect();
    let fees = transactions.iter().map(|tx| uint_amount(tx.fee)).collect();

    let encoded = abi_encode(&[
        AbiToken::Word(string_to_bytes32(gravity_id)?),
        AbiToken::Word(string_to_bytes32(BATCH_METHOD_NAME)?),
        AbiToken::Array(amounts),
        AbiToken::Array(destinations),
        AbiToken::Array(fees),
        AbiToken::Word(uint_word(batch_nonce as u128)),
        AbiToken::Word(token_contract.to_word()),
        AbiToken::Word(uint_word(batch_timeout as u128)),
    ]);
    Ok(keccak256(&encoded))
}

fn uint_amount(amount: Uint128) -> [u8; 32] {
    uint_word(amount.u128())
}

/// Digest an Ethereum wallet actually signs for a checkpoint (EIP-191 personal message).
pub fn eth_signed_message_hash(checkpoint: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(ETH_SIGNED_MESSAGE_PREFIX.len() + 32);
    data.extend_from_slice(ETH_SIGNED_MESSAGE_PREFIX);
    data.extend_from_slice(checkpoint);
    keccak256(&data)
}

/// Ethereum address of an uncompressed SEC1 public key (`0x04 || x || y`).
pub fn eth_address_from_pubkey(pubkey: &[u8]) -> StdResult<EthAddress> {
    if pubkey.len() != 65 || pubkey[0] != 0x04 {
        return Err(StdError::generic_err("expected 65-byte uncompressed public key"));
    }
    let hash = keccak256(&pubkey[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Ok(EthAddress::from_bytes(address))
}

/// Convert 32-byte hash to hex string (for attributes/logging)
pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::Addr;

    fn eth(s: &str) -> EthAddress {
        EthAddress::parse(s).unwrap()
    }

    fn three_members() -> Vec<BridgeValidator> {
        vec![
            BridgeValidator {
                power: 3334,
                ethereum_address: eth("0xc783df8a850f42e7f7e57013759c285caa701eb6"),
            },
            BridgeValidator {
                power: 3333,
                ethereum_address: eth("0xe5904695748fe4a84b40b3fc79de2277660bd1d3"),
            },
            BridgeValidator {
                power: 3333,
                ethereum_address: eth("0xead9c93b79ae7c1591b1fb5323bd777e86e150d4"),
            },
        ]
    }

    fn tx(id: u64, dest: &str, amount: u128, fee: u128) -> OutgoingTransferTx {
        OutgoingTransferTx {
            id,
            sender: Addr::unchecked("cosmos1sender"),
            dest_address: eth(dest),
            token_contract: eth("0x835973768750b3ed2d5c3ef5adcd5edb44d12ad4"),
            amount: Uint128::new(amount),
            fee: Uint128::new(fee),
        }
    }

    #[test]
    fn test_keccak256_basic() {
        assert_eq!(
            bytes32_to_hex(&keccak256(b"hello")),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_abi_encode_dynamic_layout() {
        let encoded = abi_encode(&[
            AbiToken::Word([1u8; 32]),
            AbiToken::Array(vec![[2u8; 32], [3u8; 32]]),
            AbiToken::Array(vec![[4u8; 32]]),
        ]);
        // head (3 words) + first tail (len + 2) + second tail (len + 1)
        assert_eq!(encoded.len(), 32 * (3 + 3 + 2));
        assert_eq!(&encoded[0..32], &[1u8; 32]);
        assert_eq!(encoded[63], 96);
        assert_eq!(encoded[95], 96 + 96);
        assert_eq!(encoded[127], 2);
        assert_eq!(encoded[223], 1);
    }

    #[test]
    fn test_string_to_bytes32() {
        let word = string_to_bytes32("checkpoint").unwrap();
        assert_eq!(&word[..10], b"checkpoint");
        assert_eq!(&word[10..], &[0u8; 22]);
        assert!(string_to_bytes32(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_valset_checkpoint_vector_three_members() {
        let checkpoint = valset_checkpoint("foo", 0, &three_members()).unwrap();
        assert_eq!(
            bytes32_to_hex(&checkpoint),
            "0xc840b18a6a8143684ffbafe8316711ac7cc0a9ef11e08926902a348919a5617f"
        );
    }

    #[test]
    fn test_valset_checkpoint_vector_single_member() {
        let members = vec![BridgeValidator {
            power: u32::MAX as u64,
            ethereum_address: EthAddress::from_bytes([0x11; 20]),
        }];
        let checkpoint = valset_checkpoint("defaultgravityid", 12345, &members).unwrap();
        assert_eq!(
            bytes32_to_hex(&checkpoint),
            "0x13b1accfdc35cfa706c2622ae607a557278e8358186835ab91208993670f704a"
        );
    }

    #[test]
    fn test_valset_checkpoint_changes_with_any_field() {
        let base = valset_checkpoint("foo", 0, &three_members()).unwrap();

        let mut members = three_members();
        members[2].power = 3332;
        let power_changed = valset_checkpoint("foo", 0, &members).unwrap();
        assert_eq!(
            bytes32_to_hex(&power_changed),
            "0x540df4ede758bd47b9ddde2ffdd17604c2fd8fcec041b4890958ba32122a35b1"
        );

        let nonce_changed = valset_checkpoint("foo", 1, &three_members()).unwrap();
        assert_eq!(
            bytes32_to_hex(&nonce_changed),
            "0xa6deeba36ef3232dc02597201446606272f90182bbb4dd89026e54f188bb85e7"
        );

        let id_changed = valset_checkpoint("bar", 0, &three_members()).unwrap();
        assert_ne!(base, power_changed);
        assert_ne!(base, nonce_changed);
        assert_ne!(base, id_changed);
    }

    #[test]
    fn test_valset_checkpoint_survives_storage_round_trip() {
        let members = three_members();
        let bytes = cosmwasm_std::to_json_vec(&members).unwrap();
        let restored: Vec<BridgeValidator> = cosmwasm_std::from_json(&bytes).unwrap();
        assert_eq!(
            valset_checkpoint("foo", 0, &members).unwrap(),
            valset_checkpoint("foo", 0, &restored).unwrap()
        );
    }

    #[test]
    fn test_batch_checkpoint_vector() {
        let token = eth("0x835973768750b3ed2d5c3ef5adcd5edb44d12ad4");
        let txs = vec![
            tx(1, "0x9fc9c2dfba3b6cf204c37a5f690619772b926e39", 1000, 3),
            tx(2, "0x2222222222222222222222222222222222222222", 500, 2),
        ];
        let checkpoint = batch_checkpoint("foo", 1, &token, 2111, &txs).unwrap();
        assert_eq!(
            bytes32_to_hex(&checkpoint),
            "0x7dc7817722144a72ba8c1cc58405efbc0b2d545dfaa4d3e9b16ee40a559476bd"
        );

        let timeout_changed = batch_checkpoint("foo", 1, &token, 2112, &txs).unwrap();
        assert_eq!(
            bytes32_to_hex(&timeout_changed),
            "0x4287fc17edff16d6542337dfac1c7e862b6666684c09a2e35696f7f372440795"
        );
    }

    #[test]
    fn test_batch_checkpoint_vector_empty() {
        let token = EthAddress::from_bytes([0x33; 20]);
        let checkpoint = batch_checkpoint("defaultgravityid", 7, &token, 0, &[]).unwrap();
        assert_eq!(
            bytes32_to_hex(&checkpoint),
            "0x16b117420999d78c736fdbda6e8843ea25d1f168f28623d57c5b012a65a10e57"
        );
    }

    #[test]
    fn test_eth_signed_message_hash_vector() {
        let checkpoint = valset_checkpoint("foo", 0, &three_members()).unwrap();
        assert_eq!(
            bytes32_to_hex(&eth_signed_message_hash(&checkpoint)),
            "0xdcb1f294920675108b200c0a2c8517b4c888b81c03dbb3e08759e22496e884a9"
        );
    }

    #[test]
    fn test_eth_address_from_pubkey_rejects_compressed() {
        assert!(eth_address_from_pubkey(&[0x02; 33]).is_err());
    }
}
