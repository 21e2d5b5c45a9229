//! # Escrow Address Derivation and ABI Encoding
//!
//! Escrow addresses are content-addressed: both the coordinator and the
//! ledger derive the same address from the immutables.
//!
//! - EVM: CREATE2 `keccak256(0xff ++ factory ++ salt ++ init_code_hash)[12..]`
//!   with `salt = keccak256(abi.encode(immutables))`.
//! - NEAR: sub-account `{src|dst}-{first 8 hex of order hash}.{factory}`.

use crate::domain::{
    EscrowImmutables, EscrowRole, Hash, InvariantViolation, LedgerAddress, LedgerKind, TokenRef,
};
use crate::algorithms::timelock_codec::pack_evm_timelocks;
use primitive_types::U256;
use sha3::{Digest, Keccak256};

/// ABI word size.
pub const WORD: usize = 32;

/// Canonical tuple type of the escrow immutables.
pub const IMMUTABLES_TUPLE: &str = "(bytes32,bytes32,address,address,address,uint256,uint256,uint256)";

/// Keccak-256.
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// First four bytes of `keccak256(signature)`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Left-pad an address into an ABI word.
pub fn abi_word_address(address: &[u8; 20]) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address);
    word
}

/// Big-endian uint256 word.
pub fn abi_word_u256(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

/// Big-endian word for a `u128`.
pub fn abi_word_u128(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn evm_bytes<'a>(address: &'a LedgerAddress, field: &'static str) -> Result<&'a [u8; 20], InvariantViolation> {
    address.as_evm().ok_or(InvariantViolation::LedgerMismatch {
        expected: LedgerKind::Evm,
        field,
    })
}

/// `abi.encode(immutables)`: eight static words.
pub fn encode_evm_immutables(immutables: &EscrowImmutables) -> Result<Vec<u8>, InvariantViolation> {
    let token = match &immutables.token {
        TokenRef::Native => [0u8; 20],
        TokenRef::Contract(address) => *evm_bytes(address, "token")?,
    };
    let words = [
        immutables.order_hash,
        immutables.hashlock,
        abi_word_address(evm_bytes(&immutables.maker, "maker")?),
        abi_word_address(evm_bytes(&immutables.taker, "taker")?),
        abi_word_address(&token),
        abi_word_u128(immutables.amount),
        abi_word_u128(immutables.safety_deposit),
        abi_word_u256(pack_evm_timelocks(&immutables.timelocks)?),
    ];
    Ok(words.concat())
}

/// CREATE2 salt for an escrow.
pub fn evm_immutables_hash(immutables: &EscrowImmutables) -> Result<Hash, InvariantViolation> {
    Ok(keccak256(&encode_evm_immutables(immutables)?))
}

/// CREATE2 address.
pub fn create2_address(deployer: &[u8; 20], salt: &Hash, init_code_hash: &Hash) -> [u8; 20] {
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(deployer);
    preimage.extend_from_slice(salt);
    preimage.extend_from_slice(init_code_hash);
    let hash = keccak256(&preimage);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Deterministic escrow address on an EVM ledger.
pub fn evm_escrow_address(
    factory: &[u8; 20],
    init_code_hash: &Hash,
    immutables: &EscrowImmutables,
) -> Result<[u8; 20], InvariantViolation> {
    let salt = evm_immutables_hash(immutables)?;
    Ok(create2_address(factory, &salt, init_code_hash))
}

/// Deterministic escrow sub-account on NEAR.
pub fn near_escrow_account(order_hash: &Hash, role: EscrowRole, factory: &str) -> String {
    let order_hex = hex::encode(order_hash);
    format!("{}-{}.{}", role.prefix(), &order_hex[..8], factory)
}

/// Calldata for a function taking only the immutables tuple.
pub fn immutables_call(signature: &str, immutables: &EscrowImmutables) -> Result<Vec<u8>, InvariantViolation> {
    let mut data = function_selector(signature).to_vec();
    data.extend(encode_evm_immutables(immutables)?);
    Ok(data)
}

/// Calldata for `withdraw(bytes secret, Immutables)`.
///
/// Head: offset of the dynamic `bytes`, then the static tuple inline. Tail:
/// length word and the right-padded secret.
pub fn withdraw_call(signature: &str, secret: &[u8], immutables: &EscrowImmutables) -> Result<Vec<u8>, InvariantViolation> {
    let tuple = encode_evm_immutables(immutables)?;
    let offset = WORD + tuple.len();
    let padded = secret.len().div_ceil(WORD) * WORD;

    let mut data = function_selector(signature).to_vec();
    data.extend_from_slice(&abi_word_u128(offset as u128));
    data.extend(tuple);
    data.extend_from_slice(&abi_word_u128(secret.len() as u128));
    data.extend_from_slice(secret);
    data.resize(data.len() + (padded - secret.len()), 0);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TimelockSchedule, Timelocks};

    fn immutables() -> EscrowImmutables {
        EscrowImmutables {
            order_hash: [0x11; 32],
            hashlock: [0x22; 32],
            maker: LedgerAddress::Evm([0x33; 20]),
            taker: LedgerAddress::Evm([0x44; 20]),
            token: TokenRef::Native,
            amount: 1_000_000,
            safety_deposit: 5_000,
            timelocks: Timelocks::new(
                1_700_000_000,
                TimelockSchedule::new(144, 1_800, 7_200, 604_800).unwrap(),
            ),
        }
    }

    #[test]
    fn test_function_selector_known() {
        assert_eq!(hex::encode(function_selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_create2_eip1014_vector() {
        // EIP-1014 example 0: zero deployer, zero salt, init code 0x00
        let init_code_hash = keccak256(&[0x00]);
        let address = create2_address(&[0u8; 20], &[0u8; 32], &init_code_hash);
        assert_eq!(hex::encode(address), "4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38");
    }

    #[test]
    fn test_encode_immutables_layout() {
        let encoded = encode_evm_immutables(&immutables()).unwrap();
        assert_eq!(encoded.len(), 8 * WORD);
        assert_eq!(&encoded[..32], &[0x11; 32]);
        assert_eq!(&encoded[76..96], &[0x33; 20]);
        assert_eq!(&encoded[128..160], &[0u8; 32]);
        assert_eq!(u128::from_be_bytes(encoded[176..192].try_into().unwrap()), 1_000_000);
    }

    #[test]
    fn test_encode_rejects_near_addresses() {
        let mut imm = immutables();
        imm.maker = LedgerAddress::Near("alice.near".into());
        assert_eq!(
            encode_evm_immutables(&imm),
            Err(InvariantViolation::LedgerMismatch {
                expected: LedgerKind::Evm,
                field: "maker"
            })
        );
    }

    #[test]
    fn test_escrow_address_deterministic_and_content_addressed() {
        let factory = [0xAA; 20];
        let code = [0xBB; 32];
        let a = evm_escrow_address(&factory, &code, &immutables()).unwrap();
        let b = evm_escrow_address(&factory, &code, &immutables()).unwrap();
        assert_eq!(a, b);

        let mut other = immutables();
        other.amount += 1;
        assert_ne!(a, evm_escrow_address(&factory, &code, &other).unwrap());
    }

    #[test]
    fn test_near_escrow_account() {
        let mut order_hash = [0u8; 32];
        order_hash[..4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(
            near_escrow_account(&order_hash, EscrowRole::Destination, "factory.near"),
            "dst-deadbeef.factory.near"
        );
    }

    #[test]
    fn test_withdraw_call_layout() {
        let secret = [0x55u8; 40];
        let data = withdraw_call("withdraw(bytes,(bytes32))", &secret, &immutables()).unwrap();
        // selector + offset + 8 tuple words + length + 2 data words
        assert_eq!(data.len(), 4 + WORD + 8 * WORD + WORD + 2 * WORD);
        assert_eq!(u16::from_be_bytes([data[4 + 30], data[4 + 31]]), (9 * WORD) as u16);
        assert_eq!(data[4 + 9 * WORD + 31], 40);
        assert_eq!(&data[4 + 10 * WORD..4 + 10 * WORD + 40], &secret);
        assert!(data[4 + 10 * WORD + 40..].iter().all(|b| *b == 0));
    }
}
