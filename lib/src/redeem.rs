// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Redeem script resolution for inputs being signed

use ledger_btc_apdu::public_key::AddressFormat;

use crate::script::{p2pkh_script, COMPRESSED_KEY_LEN};

/// Resolve the script committed for an input during hashing.
///
/// A non-empty caller-supplied override is always used verbatim, otherwise
/// legacy inputs commit the spent output script and segwit inputs commit
/// the P2PKH script for the signing key.
pub fn resolve_redeem_script(
    override_script: &[u8],
    format: AddressFormat,
    prev_script: &[u8],
    pk: &[u8; COMPRESSED_KEY_LEN],
) -> Vec<u8> {
    if !override_script.is_empty() {
        return override_script.to_vec();
    }

    match format {
        AddressFormat::Legacy => prev_script.to_vec(),
        AddressFormat::P2shSegwit | AddressFormat::NativeSegwit => p2pkh_script(pk),
    }
}
