// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Ledger Bitcoin API Library (and CLI)
//!
//! Host-side driver for the Ledger Bitcoin application, providing
//! transaction parsing / serialisation, trusted input and untrusted hashing
//! protocols, and transaction and message signing over any [Exchange]
//! implementation.

/// Re-export `ledger-btc-apdu` for consumers
pub use ledger_btc_apdu::{self as apdu};

pub mod channel;

mod error;
pub use error::{Error, ParseError};

mod handle;
pub use handle::DeviceHandle;

pub mod hashing;

pub mod message;

pub mod public_key;
pub use public_key::WalletPublicKey;

pub mod redeem;

pub mod script;

pub mod signer;
pub use signer::{sign_transaction, SignRequest};

pub mod transport;
pub use transport::Exchange;

pub mod trusted_input;
pub use trusted_input::InputReference;

pub mod tx;
pub use tx::{Input, Output, Transaction};

pub mod varint;
