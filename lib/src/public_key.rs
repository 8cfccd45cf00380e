// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wallet public key queries

use encdec::Decode;
use log::debug;

use ledger_btc_apdu::{
    path::Bip32Path,
    public_key::{AddressFormat, WalletPublicKeyReq, WalletPublicKeyResp},
};

use crate::{
    channel,
    script::{compress_public_key, COMPRESSED_KEY_LEN},
    Error, Exchange,
};

/// Public key, address and chain code for a derivation path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletPublicKey {
    /// Raw public key as returned by the device
    pub public_key: Vec<u8>,
    /// Address for the requested format
    pub address: String,
    /// BIP32 chain code, where provided
    pub chain_code: Option<[u8; 32]>,
}

impl WalletPublicKey {
    /// Fetch the compressed form of the public key
    pub fn compressed(&self) -> Result<[u8; COMPRESSED_KEY_LEN], Error> {
        compress_public_key(&self.public_key)
    }
}

/// Query the device for the public key and address at `path`
pub async fn wallet_public_key<T: Exchange + ?Sized>(
    t: &mut T,
    path: &Bip32Path,
    display: bool,
    format: AddressFormat,
) -> Result<WalletPublicKey, Error> {
    debug!("Requesting public key for path: {path} (format: {format}, display: {display})");

    let resp = channel::request(t, &WalletPublicKeyReq::new(path.clone(), display, format)).await?;

    let (r, _n) = WalletPublicKeyResp::decode(&resp).map_err(|_| Error::UnexpectedResponse)?;

    Ok(WalletPublicKey {
        public_key: r.public_key.to_vec(),
        address: r.address.to_string(),
        chain_code: r.chain_code,
    })
}

/// Query the device for the compressed public key at `path`
pub async fn compressed_public_key<T: Exchange + ?Sized>(
    t: &mut T,
    path: &Bip32Path,
) -> Result<[u8; COMPRESSED_KEY_LEN], Error> {
    wallet_public_key(t, path, false, AddressFormat::Legacy)
        .await?
        .compressed()
}
