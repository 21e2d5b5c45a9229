//! Contract-side view of a ledger call.
//!
//! Decodes a `WirePayload` the way the escrow contracts would and checks it
//! carries the same operation as the semantic `EscrowAction`: selector and
//! ABI words or method and JSON arguments, target, attached value. A
//! withdrawal yields the preimage the contract hashes.

use super::evm_escrow::{
    CANCEL_SIGNATURE, CREATE_DST_SIGNATURE, CREATE_SRC_SIGNATURE, RESCUE_SIGNATURE,
    WITHDRAW_SIGNATURE,
};
use super::near_escrow::{
    decode_secret_arg, immutables_json, CANCEL_METHOD, CREATE_DST_METHOD, CREATE_SRC_METHOD,
    RESCUE_METHOD, WITHDRAW_METHOD,
};
use crate::algorithms::address::{encode_evm_immutables, function_selector, immutables_call, WORD};
use crate::domain::{EscrowImmutables, EscrowRole, LedgerAddress};
use crate::ports::{EscrowAction, WirePayload};
use serde_json::Value;

/// Check `payload` against `action` on an escrow with `immutables`.
///
/// `Ok(Some(preimage))` for withdrawals, `Ok(None)` otherwise. `Err` is the
/// revert reason.
pub(crate) fn decode_call(
    payload: &WirePayload,
    action: &EscrowAction,
    immutables: &EscrowImmutables,
) -> Result<Option<Vec<u8>>, String> {
    match payload {
        WirePayload::Evm { to, calldata, value } => decode_evm(to, calldata, *value, action, immutables),
        WirePayload::Near {
            receiver,
            method,
            args_json,
            deposit,
        } => decode_near(receiver, method, args_json, *deposit, action, immutables),
    }
}

fn decode_evm(
    to: &[u8; 20],
    calldata: &[u8],
    value: u128,
    action: &EscrowAction,
    immutables: &EscrowImmutables,
) -> Result<Option<Vec<u8>>, String> {
    let expect_call = |signature: &str| -> Result<(), String> {
        let expected = immutables_call(signature, immutables).map_err(|e| e.to_string())?;
        if calldata != expected.as_slice() {
            return Err(format!("calldata does not encode {signature}"));
        }
        Ok(())
    };

    match action {
        EscrowAction::Create { role, deposit, .. } => {
            expect_value(value, *deposit)?;
            expect_call(match role {
                EscrowRole::Source => CREATE_SRC_SIGNATURE,
                EscrowRole::Destination => CREATE_DST_SIGNATURE,
            })?;
            Ok(None)
        }
        EscrowAction::Withdraw { address, .. } => {
            expect_evm_target(to, address)?;
            expect_value(value, 0)?;
            let (tuple, secret) = decode_withdraw_calldata(calldata)?;
            let expected = encode_evm_immutables(immutables).map_err(|e| e.to_string())?;
            if tuple != expected.as_slice() {
                return Err("immutables do not match escrow".to_string());
            }
            Ok(Some(secret))
        }
        EscrowAction::Cancel { address } => {
            expect_evm_target(to, address)?;
            expect_value(value, 0)?;
            expect_call(CANCEL_SIGNATURE)?;
            Ok(None)
        }
        EscrowAction::Rescue { address } => {
            expect_evm_target(to, address)?;
            expect_value(value, 0)?;
            expect_call(RESCUE_SIGNATURE)?;
            Ok(None)
        }
    }
}

fn decode_near(
    receiver: &str,
    method: &str,
    args_json: &str,
    attached: u128,
    action: &EscrowAction,
    immutables: &EscrowImmutables,
) -> Result<Option<Vec<u8>>, String> {
    let args: Value = serde_json::from_str(args_json).map_err(|e| format!("malformed arguments: {e}"))?;
    let expect_method = |expected: &str| -> Result<(), String> {
        if method != expected {
            return Err(format!("method {method} is not {expected}"));
        }
        Ok(())
    };
    let expect_receiver = |address: &LedgerAddress| -> Result<(), String> {
        if address.as_near() != Some(receiver) {
            return Err(format!("call sent to {receiver} instead of {address}"));
        }
        Ok(())
    };

    match action {
        EscrowAction::Create { role, deposit, .. } => {
            expect_value(attached, *deposit)?;
            expect_method(match role {
                EscrowRole::Source => CREATE_SRC_METHOD,
                EscrowRole::Destination => CREATE_DST_METHOD,
            })?;
            let expected = immutables_json(immutables).map_err(|e| e.to_string())?;
            if args["immutables"] != expected {
                return Err("immutables argument does not match".to_string());
            }
            Ok(None)
        }
        EscrowAction::Withdraw { address, .. } => {
            expect_receiver(address)?;
            expect_method(WITHDRAW_METHOD)?;
            expect_value(attached, 0)?;
            let arg = args["secret"].as_str().ok_or("missing secret argument")?;
            decode_secret_arg(arg)
                .map(Some)
                .ok_or_else(|| "secret argument is not base64".to_string())
        }
        EscrowAction::Cancel { address } => {
            expect_receiver(address)?;
            expect_method(CANCEL_METHOD)?;
            expect_value(attached, 0)?;
            Ok(None)
        }
        EscrowAction::Rescue { address } => {
            expect_receiver(address)?;
            expect_method(RESCUE_METHOD)?;
            expect_value(attached, 0)?;
            Ok(None)
        }
    }
}

fn expect_value(attached: u128, expected: u128) -> Result<(), String> {
    if attached != expected {
        return Err(format!("attached value {attached} does not match {expected}"));
    }
    Ok(())
}

fn expect_evm_target(to: &[u8; 20], address: &LedgerAddress) -> Result<(), String> {
    if address.as_evm() != Some(to) {
        return Err(format!("call sent to 0x{} instead of {address}", hex::encode(to)));
    }
    Ok(())
}

/// Split `withdraw(bytes, Immutables)` calldata into the inline tuple words
/// and the secret bytes.
fn decode_withdraw_calldata(calldata: &[u8]) -> Result<(&[u8], Vec<u8>), String> {
    let selector = calldata.get(..4).ok_or("calldata too short")?;
    if selector != function_selector(WITHDRAW_SIGNATURE).as_slice() {
        return Err("unknown selector".to_string());
    }
    let args = &calldata[4..];
    let offset = abi_usize(args, 0)?;
    let tuple = args.get(WORD..offset).ok_or("malformed head")?;
    let len = abi_usize(args, offset)?;
    let start = offset.checked_add(WORD).ok_or("secret offset overflow")?;
    let end = start.checked_add(len).ok_or("secret length overflow")?;
    let secret = args.get(start..end).ok_or("secret out of bounds")?;
    Ok((tuple, secret.to_vec()))
}

/// ABI word at byte `at`, as a length or offset.
fn abi_usize(args: &[u8], at: usize) -> Result<usize, String> {
    let end = at.checked_add(WORD).ok_or("offset overflow")?;
    let word = args.get(at..end).ok_or("calldata too short")?;
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err("ABI word out of range".to_string());
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(low)).map_err(|e| e.to_string())
}
