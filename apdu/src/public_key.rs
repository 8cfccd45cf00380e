// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wallet public key APDUs, for fetching keys and addresses for BIP32 paths

use encdec::{Decode, DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

use super::{ApduError, ApduStatic, Instruction, BTC_APDU_CLA};
use crate::{helpers::bytes, path::Bip32Path};

/// Bitcoin address / output formats supported by the device
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum AddressFormat {
    /// Legacy P2PKH
    Legacy = 0x00,
    /// P2WPKH wrapped in P2SH
    P2shSegwit = 0x01,
    /// Native P2WPKH (bech32)
    NativeSegwit = 0x02,
}

impl AddressFormat {
    /// Check whether inputs of this format are signed via segregated witness
    pub fn is_segwit(&self) -> bool {
        match self {
            AddressFormat::Legacy => false,
            AddressFormat::P2shSegwit | AddressFormat::NativeSegwit => true,
        }
    }
}

/// Wallet public key request APDU.
///
/// Requests the public key and address for a BIP32 path, P1 requests on-device
/// display of the address, P2 selects the address format.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  PATH_COUNT   |                 PATH_ELEMENTS...              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct WalletPublicKeyReq {
    /// BIP32 derivation path
    pub path: Bip32Path,
    /// Display (and verify) the address on the device
    pub display: bool,
    /// Address format to be returned
    pub format: AddressFormat,
}

impl WalletPublicKeyReq {
    /// Create a new [WalletPublicKeyReq] APDU
    pub fn new(path: Bip32Path, display: bool, format: AddressFormat) -> Self {
        Self {
            path,
            display,
            format,
        }
    }
}

impl ApduStatic for WalletPublicKeyReq {
    const CLA: u8 = BTC_APDU_CLA;
    const INS: u8 = Instruction::GetWalletPublicKey as u8;

    fn p1(&self) -> u8 {
        self.display as u8
    }

    fn p2(&self) -> u8 {
        self.format as u8
    }
}

impl Encode for WalletPublicKeyReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        self.path.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        self.path.encode(buff)
    }
}

/// Wallet public key response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    PK_LEN     |                 PUBLIC_KEY...                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   ADDR_LEN    |                  ADDRESS...                   /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                   CHAIN_CODE (32-byte, optional)              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct WalletPublicKeyResp<'a> {
    /// Raw public key (usually 65-byte uncompressed)
    pub public_key: &'a [u8],
    /// Human readable address
    pub address: &'a str,
    /// BIP32 chain code, where provided
    pub chain_code: Option<[u8; 32]>,
}

impl<'a> WalletPublicKeyResp<'a> {
    /// Create a new [WalletPublicKeyResp] APDU
    pub fn new(public_key: &'a [u8], address: &'a str, chain_code: Option<[u8; 32]>) -> Self {
        Self {
            public_key,
            address,
            chain_code,
        }
    }
}

impl<'a> Encode for WalletPublicKeyResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        let mut len = 2 + self.public_key.len() + self.address.len();
        if self.chain_code.is_some() {
            len += 32;
        }
        Ok(len)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < self.encode_len()? || self.public_key.len() > 0xff || self.address.len() > 0xff {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;

        buff[index] = self.public_key.len() as u8;
        index += 1;
        index += bytes::enc(self.public_key, &mut buff[index..])?;

        buff[index] = self.address.len() as u8;
        index += 1;
        index += bytes::enc(self.address.as_bytes(), &mut buff[index..])?;

        if let Some(c) = &self.chain_code {
            index += bytes::enc(c, &mut buff[index..])?;
        }

        Ok(index)
    }
}

impl<'a> Decode<'a> for WalletPublicKeyResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut index = 0;

        // Fetch public key
        let pk_len = *buff.first().ok_or(ApduError::InvalidLength)? as usize;
        index += 1;
        if buff.len() < index + pk_len + 1 {
            return Err(ApduError::InvalidLength);
        }
        let public_key = &buff[index..][..pk_len];
        index += pk_len;

        // Fetch address string
        let addr_len = buff[index] as usize;
        index += 1;
        if buff.len() < index + addr_len {
            return Err(ApduError::InvalidLength);
        }
        let address = core::str::from_utf8(&buff[index..][..addr_len])
            .map_err(|_| ApduError::InvalidUtf8)?;
        index += addr_len;

        // Chain code is optional on older applications
        let chain_code = match buff.len() >= index + 32 {
            true => {
                let (c, n) = bytes::dec::<32>(&buff[index..])?;
                index += n;
                Some(c)
            }
            false => None,
        };

        Ok((
            Self {
                public_key,
                address,
                chain_code,
            },
            index,
        ))
    }
}

impl DecodeOwned for AddressFormat {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        match Self::try_from(buff[0]) {
            Ok(v) => Ok((v, 1)),
            Err(_) => Err(ApduError::InvalidEncoding),
        }
    }
}
