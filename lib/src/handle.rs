// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for connected ledger devices
//!
//! This provides methods for interacting with the device
//! and is generic over [Exchange] implementations

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use ledger_btc_apdu::{
    message::MessageSignature, path::Bip32Path, public_key::AddressFormat,
};

use crate::{
    message,
    public_key::{self, WalletPublicKey},
    script::COMPRESSED_KEY_LEN,
    signer::{self, SignRequest},
    trusted_input::{self, InputReference},
    tx::Transaction,
    Error, Exchange,
};

/// Bitcoin handle for a connected ledger device.
///
/// This is generic over [Exchange] types to support different
/// underlying transports, each operation holds the device for its
/// full sequence of exchanges.
pub struct DeviceHandle<T: Exchange> {
    t: Arc<Mutex<T>>,
}

/// Create a [DeviceHandle] wrapper from a type implementing [Exchange]
impl<T: Exchange> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
        }
    }
}

impl<T: Exchange> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self { t: self.t.clone() }
    }
}

impl<T: Exchange> DeviceHandle<T> {
    /// Lock the underlying device for a sequence of exchanges,
    /// for example to drive a [crate::hashing::HashingSession] directly
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        self.t.lock().await
    }

    /// Fetch the public key, address and chain code for a path
    pub async fn wallet_public_key(
        &self,
        path: &Bip32Path,
        display: bool,
        format: AddressFormat,
    ) -> Result<WalletPublicKey, Error> {
        let mut t = self.t.lock().await;
        public_key::wallet_public_key(&mut *t, path, display, format).await
    }

    /// Fetch the compressed public key for a path
    pub async fn public_key(&self, path: &Bip32Path) -> Result<[u8; COMPRESSED_KEY_LEN], Error> {
        let mut t = self.t.lock().await;
        public_key::compressed_public_key(&mut *t, path).await
    }

    /// Fetch a trusted input for output `index` of `parent`
    pub async fn trusted_input(
        &self,
        parent: &Transaction,
        index: u32,
    ) -> Result<InputReference, Error> {
        let mut t = self.t.lock().await;
        trusted_input::trusted_input(&mut *t, parent, index).await
    }

    /// Sign all inputs of a transaction, writing scriptSigs and witness
    /// data in place
    pub async fn sign_transaction(
        &self,
        tx: &mut Transaction,
        req: &SignRequest,
    ) -> Result<(), Error> {
        let mut t = self.t.lock().await;
        signer::sign_transaction(&mut *t, tx, req).await
    }

    /// Sign a message with the key at `path`
    pub async fn sign_message(
        &self,
        path: &Bip32Path,
        message: &[u8],
    ) -> Result<MessageSignature, Error> {
        let mut t = self.t.lock().await;
        message::sign_message(&mut *t, path, message).await
    }
}
