// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Trusted input APDUs, used to stream a parent transaction to the device
//! so it can attest to the value of one of its outputs.

use crate::{ApduStatic, FramePosition, Instruction, BTC_APDU_CLA};

/// Length of a trusted input blob returned by the device
pub const TRUSTED_INPUT_LEN: usize = 56;

/// Trusted input frame, carrying a fragment of the parent transaction.
///
/// The first frame is prefixed by the output index being attested
/// (big-endian u32), subsequent frames carry transaction fragments
/// split on the wire-format boundaries expected by the device.
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
pub struct TrustedInputFrame<'a> {
    /// Frame position, the first frame carries the output index
    pub position: FramePosition,
    /// Frame payload
    pub data: &'a [u8],
}

impl<'a> TrustedInputFrame<'a> {
    /// Create a new [TrustedInputFrame] APDU
    pub fn new(position: FramePosition, data: &'a [u8]) -> Self {
        Self { position, data }
    }
}

impl<'a> ApduStatic for TrustedInputFrame<'a> {
    const CLA: u8 = BTC_APDU_CLA;
    const INS: u8 = Instruction::GetTrustedInput as u8;

    fn p1(&self) -> u8 {
        match self.position {
            FramePosition::First => 0x00,
            FramePosition::Next => 0x80,
        }
    }
}

crate::encdec_data_frame!(TrustedInputFrame);
