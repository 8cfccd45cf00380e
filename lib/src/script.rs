// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Script recognition and construction helpers
//!
//! Only the minimal pattern matching required to select a signing path is
//! performed here, scripts are not otherwise validated.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use ledger_btc_apdu::public_key::AddressFormat;

use crate::{varint, Error};

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;

/// Length of a compressed secp256k1 public key
pub const COMPRESSED_KEY_LEN: usize = 33;

/// Length of an uncompressed secp256k1 public key
pub const UNCOMPRESSED_KEY_LEN: usize = 65;

/// Classify an output script by shape
pub fn classify(script: &[u8]) -> Result<AddressFormat, Error> {
    match script {
        [OP_DUP, OP_HASH160, ..] if script.len() == 25 => Ok(AddressFormat::Legacy),
        [OP_HASH160, ..] if script.len() == 23 => Ok(AddressFormat::P2shSegwit),
        [OP_0, 0x14, ..] if script.len() == 22 => Ok(AddressFormat::NativeSegwit),
        _ => Err(Error::InvalidParameter("unrecognised output script")),
    }
}

/// Compress a secp256k1 public key.
///
/// Uncompressed (`0x04` prefixed) keys are reduced to their x coordinate
/// with a parity prefix, already compressed keys are returned unchanged.
pub fn compress_public_key(pk: &[u8]) -> Result<[u8; COMPRESSED_KEY_LEN], Error> {
    let mut c = [0u8; COMPRESSED_KEY_LEN];

    match (pk.len(), pk.first().copied()) {
        (UNCOMPRESSED_KEY_LEN, Some(0x04)) => {
            c[0] = 0x02 | (pk[UNCOMPRESSED_KEY_LEN - 1] & 0x01);
            c[1..].copy_from_slice(&pk[1..COMPRESSED_KEY_LEN]);
        }
        (COMPRESSED_KEY_LEN, Some(0x02 | 0x03)) => {
            c.copy_from_slice(pk);
        }
        _ => return Err(Error::InvalidParameter("unsupported public key encoding")),
    }

    Ok(c)
}

/// RIPEMD160(SHA256(d))
pub fn hash160(d: &[u8]) -> [u8; 20] {
    let h = Ripemd160::digest(Sha256::digest(d));
    h.into()
}

/// Build a standard P2PKH output script for the provided public key
pub fn p2pkh_script(pk: &[u8; COMPRESSED_KEY_LEN]) -> Vec<u8> {
    let mut s = Vec::with_capacity(25);

    s.extend_from_slice(&[OP_DUP, OP_HASH160, 0x14]);
    s.extend_from_slice(&hash160(pk));
    s.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);

    s
}

/// Append a minimal data push to a script
pub fn push(d: &[u8], script: &mut Vec<u8>) {
    match d.len() {
        n if n < OP_PUSHDATA1 as usize => script.push(n as u8),
        n if n <= u8::MAX as usize => script.extend_from_slice(&[OP_PUSHDATA1, n as u8]),
        n => {
            script.push(OP_PUSHDATA2);
            script.extend_from_slice(&(n as u16).to_le_bytes());
        }
    }
    script.extend_from_slice(d);
}

/// Build the final scriptSig for an input
pub fn script_sig(
    format: AddressFormat,
    signature: &[u8],
    pk: &[u8; COMPRESSED_KEY_LEN],
) -> Vec<u8> {
    let mut s = vec![];

    match format {
        AddressFormat::Legacy => {
            push(signature, &mut s);
            push(pk, &mut s);
        }
        AddressFormat::P2shSegwit => {
            // Push of the P2WPKH witness program
            s.extend_from_slice(&[0x16, OP_0, 0x14]);
            s.extend_from_slice(&hash160(pk));
        }
        AddressFormat::NativeSegwit => (),
    }

    s
}

/// Build the serialised witness for an input, legacy inputs produce
/// an empty (zero item) placeholder
pub fn witness(format: AddressFormat, signature: &[u8], pk: &[u8; COMPRESSED_KEY_LEN]) -> Vec<u8> {
    let mut w = vec![];

    match format {
        AddressFormat::Legacy => varint::encode(0, &mut w),
        AddressFormat::P2shSegwit | AddressFormat::NativeSegwit => {
            varint::encode(2, &mut w);
            for item in [signature, &pk[..]] {
                varint::encode(item.len() as u32, &mut w);
                w.extend_from_slice(item);
            }
        }
    }

    w
}
