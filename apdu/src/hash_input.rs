// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Untrusted transaction hashing APDUs.
//!
//! Signing is performed by streaming the transaction being signed to the
//! device via [HashInputStartFrame] (version, inputs and scripts) and
//! [HashOutputFrame] (outputs or change path), then requesting a signature
//! for a single input with [HashSignReq].

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter};

use crate::{
    helpers::bytes, path::Bip32Path, ApduError, ApduStatic, FramePosition, Instruction,
    BTC_APDU_CLA,
};

/// Input reference tag for trusted input blobs (`0x01 ‖ len ‖ blob`)
pub const TRUSTED_INPUT_TAG: u8 = 0x01;

/// Input reference tag for witness (segwit) references (`0x02 ‖ reference`)
pub const WITNESS_INPUT_TAG: u8 = 0x02;

/// Hashing mode, selected on the first frame of a hash input start command
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum InputMode {
    /// Begin hashing a new legacy transaction
    NewLegacy = 0x00,
    /// Begin hashing a new segwit transaction
    NewSegwit = 0x02,
    /// Continue hashing a previously started transaction
    Continue = 0x80,
}

/// Hash input start frame, carrying a fragment of the transaction
/// version, inputs and the script of the input being signed.
///
/// P1 is `0x00` for the first frame and `0x80` for subsequent frames,
/// P2 carries the [InputMode] on the first frame.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                   FRAGMENT (up to 255 bytes)...               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct HashInputStartFrame<'a> {
    /// Frame position
    pub position: FramePosition,
    /// Hashing mode, applies to the first frame only
    pub mode: InputMode,
    /// Frame payload
    pub data: &'a [u8],
}

impl<'a> HashInputStartFrame<'a> {
    /// Create a new [HashInputStartFrame] APDU
    pub fn new(position: FramePosition, mode: InputMode, data: &'a [u8]) -> Self {
        Self {
            position,
            mode,
            data,
        }
    }
}

impl<'a> ApduStatic for HashInputStartFrame<'a> {
    const CLA: u8 = BTC_APDU_CLA;
    const INS: u8 = Instruction::HashInputStart as u8;

    fn p1(&self) -> u8 {
        match self.position {
            FramePosition::First => 0x00,
            FramePosition::Next => 0x80,
        }
    }

    fn p2(&self) -> u8 {
        match self.position {
            FramePosition::First => self.mode as u8,
            FramePosition::Next => 0x00,
        }
    }
}

crate::encdec_data_frame!(HashInputStartFrame);

/// Output frame kinds, selected via P1 of the finalize command
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum OutputFrameKind {
    /// More output data follows
    More = 0x00,
    /// Final output frame
    Last = 0x80,
    /// Frame carries the change BIP32 path
    ChangePath = 0xff,
}

/// Hash output frame, carrying either a fragment of the serialised outputs
/// or the BIP32 path of the change output.
#[derive(Clone, PartialEq, Debug)]
pub struct HashOutputFrame<'a> {
    /// Frame kind
    pub kind: OutputFrameKind,
    /// Frame payload
    pub data: &'a [u8],
}

impl<'a> HashOutputFrame<'a> {
    /// Create a new [HashOutputFrame] APDU
    pub fn new(kind: OutputFrameKind, data: &'a [u8]) -> Self {
        Self { kind, data }
    }
}

impl<'a> ApduStatic for HashOutputFrame<'a> {
    const CLA: u8 = BTC_APDU_CLA;
    const INS: u8 = Instruction::HashInputFinalizeFull as u8;

    fn p1(&self) -> u8 {
        self.kind as u8
    }
}

crate::encdec_data_frame!(HashOutputFrame);

/// Signature hash types
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum SigHashType {
    /// Sign all inputs and outputs
    All = 0x01,
    /// Sign all inputs, no outputs
    None = 0x02,
    /// Sign all inputs and the output with the same index
    Single = 0x03,
    /// Sign only the current input (combined with other flags)
    AnyoneCanPay = 0x80,
}

impl DecodeOwned for SigHashType {
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

/// Hash sign request APDU, requests a signature over the hashed transaction
/// for the key at the provided path.
///
/// The lock time is sent big-endian, unlike its transaction wire encoding.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  PATH_COUNT   |                 PATH_ELEMENTS...              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  PIN_LEN (0)  |              LOCK_TIME (u32, big-endian)      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |               |   SIGHASH     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct HashSignReq {
    /// Path of the signing key
    pub path: Bip32Path,
    /// Transaction lock time
    pub lock_time: u32,
    /// Signature hash type
    pub sighash: SigHashType,
}

impl HashSignReq {
    /// Create a new [HashSignReq] APDU
    pub fn new(path: Bip32Path, lock_time: u32, sighash: SigHashType) -> Self {
        Self {
            path,
            lock_time,
            sighash,
        }
    }
}

impl ApduStatic for HashSignReq {
    const CLA: u8 = BTC_APDU_CLA;
    const INS: u8 = Instruction::HashSign as u8;
}

impl Encode for HashSignReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(self.path.encode_len()? + 1 + 4 + 1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = self.path.encode(buff)?;

        // No user validation code
        buff[index] = 0x00;
        index += 1;

        BigEndian::write_u32(&mut buff[index..], self.lock_time);
        index += 4;

        buff[index] = self.sighash as u8;
        index += 1;

        Ok(index)
    }
}

impl DecodeOwned for HashSignReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (path, mut index) = Bip32Path::decode_owned(buff)?;

        if buff.len() < index + 6 {
            return Err(ApduError::InvalidLength);
        }

        if buff[index] != 0x00 {
            return Err(ApduError::InvalidEncoding);
        }
        index += 1;

        let (lock_time, n) = bytes::dec::<4>(&buff[index..])?;
        index += n;

        let (sighash, n) = SigHashType::decode_owned(&buff[index..])?;
        index += n;

        Ok((
            Self {
                path,
                lock_time: u32::from_be_bytes(lock_time),
                sighash,
            },
            index,
        ))
    }
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn hash_input_start_params() {
        let d = [0x01, 0x00, 0x00, 0x00, 0x02];

        let f = HashInputStartFrame::new(FramePosition::First, InputMode::NewSegwit, &d);
        assert_eq!((f.p1(), f.p2()), (0x00, 0x02));

        let f = HashInputStartFrame::new(FramePosition::First, InputMode::Continue, &d);
        assert_eq!((f.p1(), f.p2()), (0x00, 0x80));

        let f = HashInputStartFrame::new(FramePosition::Next, InputMode::NewLegacy, &d);
        assert_eq!((f.p1(), f.p2()), (0x80, 0x00));

        // Mode only applies to the first frame
        let f = HashInputStartFrame::new(FramePosition::Next, InputMode::Continue, &d);
        assert_eq!(f.p2(), 0x00);
    }

    #[test]
    fn hash_output_params() {
        let d = [0u8; 8];

        for (k, p1) in [
            (OutputFrameKind::More, 0x00),
            (OutputFrameKind::Last, 0x80),
            (OutputFrameKind::ChangePath, 0xff),
        ] {
            let f = HashOutputFrame::new(k, &d);
            assert_eq!(f.p1(), p1);
            assert_eq!(f.p2(), 0x00);
        }
    }

    #[test]
    fn hash_sign_req_layout() {
        let path = Bip32Path::from_str("44'/0'/0'/0/0").unwrap();
        let req = HashSignReq::new(path, 0x0001_0203, SigHashType::All);

        let mut buff = [0u8; 64];
        let n = req.encode(&mut buff).unwrap();

        assert_eq!(n, 21 + 6);
        assert_eq!(&buff[21..n], &[0x00, 0x00, 0x01, 0x02, 0x03, 0x01]);
    }

    #[test]
    fn hash_sign_req_apdu() {
        let path = Bip32Path::from_str("84'/1'/0'/1/12").unwrap();
        let req = HashSignReq::new(path, 650_000, SigHashType::All);

        let mut buff = [0u8; 64];
        encode_decode_apdu(&mut buff, &req);
    }
}
