// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Message signing APDUs.
//!
//! Messages are streamed to the device with [SignMessageFrame]s, the first of
//! which carries the signing path and message length, then signed with a
//! [SignMessageSignReq] returning a [MessageSignature].

use encdec::{DecodeOwned, Encode};

use crate::{
    helpers::der, ApduError, ApduStatic, FramePosition, Instruction, BTC_APDU_CLA,
};

/// Message preparation frame.
///
/// ## Encoding (first frame):
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  PATH_COUNT   |                 PATH_ELEMENTS...              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   MESSAGE_LEN (u16, BE)       |         MESSAGE_CHUNK...      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Subsequent frames carry message chunks only.
#[derive(Clone, PartialEq, Debug)]
pub struct SignMessageFrame<'a> {
    /// Frame position
    pub position: FramePosition,
    /// Frame payload
    pub data: &'a [u8],
}

impl<'a> SignMessageFrame<'a> {
    /// Create a new [SignMessageFrame] APDU
    pub fn new(position: FramePosition, data: &'a [u8]) -> Self {
        Self { position, data }
    }
}

impl<'a> ApduStatic for SignMessageFrame<'a> {
    const CLA: u8 = BTC_APDU_CLA;
    const INS: u8 = Instruction::SignMessage as u8;

    fn p1(&self) -> u8 {
        0x00
    }

    fn p2(&self) -> u8 {
        match self.position {
            FramePosition::First => 0x01,
            FramePosition::Next => 0x80,
        }
    }
}

crate::encdec_data_frame!(SignMessageFrame);

/// Message signing request, issued once the message has been streamed
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct SignMessageSignReq;

impl ApduStatic for SignMessageSignReq {
    const CLA: u8 = BTC_APDU_CLA;
    const INS: u8 = Instruction::SignMessage as u8;

    fn p1(&self) -> u8 {
        0x80
    }
}

impl Encode for SignMessageSignReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        // No user validation code
        buff[0] = 0x00;

        Ok(1)
    }
}

impl DecodeOwned for SignMessageSignReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        match buff.first() {
            Some(0x00) => Ok((Self, 1)),
            Some(_) => Err(ApduError::InvalidEncoding),
            None => Err(ApduError::InvalidLength),
        }
    }
}

/// ECDSA message signature returned by the device.
///
/// The response is a DER signature with the recovery parity folded
/// into the low bit of the leading sequence tag.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  0x30 | V     |    SEQ_LEN    |     0x02      |     R_LEN     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                              R...                             /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     0x02      |     S_LEN     |              S...             /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct MessageSignature {
    /// Recovery information (key parity)
    pub v: u8,
    /// Signature R, big-endian
    pub r: [u8; 32],
    /// Signature S, big-endian
    pub s: [u8; 32],
}

impl MessageSignature {
    /// Create a new [MessageSignature]
    pub fn new(v: u8, r: [u8; 32], s: [u8; 32]) -> Self {
        Self { v, r, s }
    }

    /// Length of the standard DER encoding of this signature
    pub fn der_len(&self) -> usize {
        2 + der::int_len(&self.r) + der::int_len(&self.s)
    }

    /// Write the standard DER encoding of this signature (without recovery information)
    pub fn encode_der(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.encode(buff)?;
        buff[0] = der::SEQUENCE;
        Ok(n)
    }
}

impl Encode for MessageSignature {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(self.der_len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.der_len();
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = der::SEQUENCE | (self.v & 0x01);
        buff[1] = (n - 2) as u8;
        let mut index = 2;

        index += der::enc_int(&self.r, &mut buff[index..])?;
        index += der::enc_int(&self.s, &mut buff[index..])?;

        Ok(index)
    }
}

impl DecodeOwned for MessageSignature {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 2 {
            return Err(ApduError::InvalidLength);
        }
        if buff[0] & !0x01 != der::SEQUENCE {
            return Err(ApduError::InvalidEncoding);
        }

        let v = buff[0] & 0x01;
        let l = buff[1] as usize;
        if buff.len() < 2 + l {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 2;

        let (r, n) = der::dec_int(&buff[index..][..l])?;
        index += n;

        let (s, n) = der::dec_int(&buff[index..2 + l])?;
        index += n;

        Ok((Self { v, r, s }, index))
    }
}
