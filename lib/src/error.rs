// Copyright (c) 2022-2023 The MobileCoin Foundation

use ledger_btc_apdu::{path::PathError, ApduError};

use crate::hashing::HashState;

/// Ledger Bitcoin API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transaction could not be parsed
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(#[from] ParseError),

    /// Invalid argument supplied by the caller
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Device returned a non-success status word
    #[error("Request rejected by device (status: {0:04x})")]
    DeviceRejected(u16),

    /// Device is not running the Bitcoin application
    #[error("Wrong application selected on device")]
    WrongApplication,

    /// Internal invariant violated
    #[error("Internal error: {0}")]
    Internal(&'static str),

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// APDU encode / decode failure
    #[error("APDU error: {0:?}")]
    Apdu(ApduError),

    /// Unexpected APDU response
    #[error("Unexpected APDU response")]
    UnexpectedResponse,

    /// Hashing session used out of order
    #[error("Invalid hashing state (actual: {0}, expected: {1})")]
    InvalidState(HashState, HashState),
}

/// Transaction parsing errors
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Buffer ended before the transaction was complete
    #[error("truncated buffer")]
    Truncated,

    /// Witness flag other than `0x01`
    #[error("unsupported witness flag: {0:02x}")]
    UnsupportedWitnessFlag(u8),

    /// Varint prefix outside of the supported range
    #[error("unsupported varint encoding: {0:02x}")]
    UnsupportedEncoding(u8),
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        Error::Apdu(e)
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        match e {
            PathError::TooLong => Error::InvalidParameter("BIP32 path too long"),
            PathError::InvalidElement => Error::InvalidParameter("invalid BIP32 path element"),
        }
    }
}
