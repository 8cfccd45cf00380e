// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / APDU definitions for communicating with the Bitcoin device application
//!
//! This module provides the command frames exchanged with the hardware wallet when
//! querying keys, computing trusted inputs, driving the untrusted transaction hash
//! and signing messages.
//!
//! Frames carrying transaction fragments are produced by the host library, these
//! types wrap the fragments with the correct class, instruction and parameters.
//! Fixed-layout commands (key queries, signing requests) are encoded field by field.
//! Unlike most of the world, integer fields sent to the Bitcoin application are
//! big-endian, with the exception of fields lifted verbatim from the transaction
//! wire format.

#![no_std]

pub use ledger_proto::{ApduError, ApduStatic};

pub mod hash_input;
pub mod message;
pub mod path;
pub mod prelude;
pub mod public_key;
pub mod status;
pub mod trusted_input;

mod helpers;

/// Bitcoin application APDU Class
pub const BTC_APDU_CLA: u8 = 0xe0;

/// Maximum payload carried by a single APDU
pub const MAX_APDU_DATA: usize = 255;

/// Bitcoin application instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Fetch the public key (and address) for a BIP32 path
    GetWalletPublicKey = 0x40,

    /// Stream a parent transaction to compute a trusted input
    GetTrustedInput = 0x42,

    /// Start (or continue) hashing transaction inputs
    HashInputStart = 0x44,

    /// Sign the hashed transaction for the current input
    HashSign = 0x48,

    /// Stream transaction outputs (or provide the change path)
    HashInputFinalizeFull = 0x4a,

    /// Prepare or sign a message
    SignMessage = 0x4e,
}

/// Position of a frame within a multi-frame command
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FramePosition {
    /// First frame of the command, carries headers
    First,
    /// Any subsequent frame
    Next,
}

/// Helper macro for encoding APDUs consisting only of a borrowed `data` field
#[macro_export]
macro_rules! encdec_data_frame {
    ($b:ident) => {
        impl<'a> encdec::Encode for $b<'a> {
            type Error = $crate::ApduError;

            fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
                if self.data.len() > $crate::MAX_APDU_DATA || buff.len() < self.data.len() {
                    return Err($crate::ApduError::InvalidLength);
                }

                buff[..self.data.len()].copy_from_slice(self.data);

                Ok(self.data.len())
            }

            fn encode_len(&self) -> Result<usize, Self::Error> {
                Ok(self.data.len())
            }
        }
    };
}

#[cfg(test)]
pub(crate) mod test {
    use encdec::EncDec;

    use super::*;

    /// Helper for APDU encode / decode tests
    pub fn encode_decode_apdu<'a, A: EncDec<'a, ApduError> + PartialEq>(
        buff: &'a mut [u8],
        apdu: &A,
    ) -> usize {
        // Encode APDU
        let n = apdu.encode(buff).expect("encode failed");

        // Ensure encoded data fits maximum APDU payload
        let m = MAX_APDU_DATA;
        assert!(n <= m, "encoded length {n} exceeds maximum APDU payload {m}");

        // Check encoded length matches expected length
        let expected_n = apdu.encode_len().expect("get length failed");
        assert_eq!(n, expected_n, "encode length mismatch");

        // Decode APDU
        let (decoded, decoded_n) = A::decode(&buff[..n]).expect("decode failed");

        // Check decoded object and length match
        assert_eq!(apdu, &decoded);
        assert_eq!(expected_n, decoded_n);

        // Return length, useful for rough confirmation of packing expectations
        n
    }
}
