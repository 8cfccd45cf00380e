// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Trusted input protocol
//!
//! Inputs are presented to the device by reference, either as a trusted input
//! blob issued by the device after streaming the whole parent transaction, or
//! as a witness reference computed locally (BIP143 style).

use std::ops::Range;

use log::debug;

use ledger_btc_apdu::{
    hash_input::{TRUSTED_INPUT_TAG, WITNESS_INPUT_TAG},
    trusted_input::{TrustedInputFrame, TRUSTED_INPUT_LEN},
    FramePosition,
};

use crate::{
    channel::{self, Command},
    tx::Transaction,
    varint, Error, Exchange,
};

/// Bytes of a trusted input blob forming the witness reference
const WITNESS_RANGE: Range<usize> = 4..44;

/// Reference to a previous transaction output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputReference {
    /// Opaque device-issued trusted input
    Trusted(Vec<u8>),
    /// Witness reference, `hash ‖ index (LE) ‖ amount`.
    ///
    /// Locally computed references are 44 bytes, references converted from a
    /// trusted input blob carry bytes 4..44 of the blob (40 bytes).
    Witness(Vec<u8>),
}

impl InputReference {
    /// Check whether this is a witness reference
    pub fn is_witness(&self) -> bool {
        matches!(self, InputReference::Witness(_))
    }

    /// Convert to witness form, extracting the witness reference from
    /// trusted input blobs
    pub fn to_witness(&self) -> Result<Self, Error> {
        match self {
            InputReference::Witness(_) => Ok(self.clone()),
            InputReference::Trusted(b) => b
                .get(WITNESS_RANGE)
                .map(|r| InputReference::Witness(r.to_vec()))
                .ok_or(Error::UnexpectedResponse),
        }
    }

    /// Append the tagged reference encoding used in hash input frames
    pub(crate) fn encode(&self, buff: &mut Vec<u8>) -> Result<(), Error> {
        match self {
            InputReference::Trusted(b) => {
                let n = u8::try_from(b.len())
                    .map_err(|_| Error::InvalidParameter("trusted input too long"))?;

                buff.push(TRUSTED_INPUT_TAG);
                buff.push(n);
                buff.extend_from_slice(b);
            }
            InputReference::Witness(r) => {
                buff.push(WITNESS_INPUT_TAG);
                buff.extend_from_slice(r);
            }
        }
        Ok(())
    }
}

/// Compute a witness reference for an output of `parent` without device interaction
pub fn witness_reference(parent: &Transaction, index: u32) -> Result<InputReference, Error> {
    let output = parent
        .outputs
        .get(index as usize)
        .ok_or(Error::InvalidParameter("output index out of range"))?;

    let mut r = Vec::with_capacity(44);
    r.extend_from_slice(&parent.txid());
    r.extend_from_slice(&index.to_le_bytes());
    r.extend_from_slice(&output.amount);

    Ok(InputReference::Witness(r))
}

/// Trusted input continuation frames
struct TrustedInputCmd;

impl Command for TrustedInputCmd {
    type Frame<'a> = TrustedInputFrame<'a>;

    fn frame<'a>(&self, _index: usize, _last: bool, data: &'a [u8]) -> Self::Frame<'a> {
        TrustedInputFrame::new(FramePosition::Next, data)
    }
}

/// Stream `parent` to the device to obtain a trusted input for output `index`
pub async fn trusted_input<T: Exchange + ?Sized>(
    t: &mut T,
    parent: &Transaction,
    index: u32,
) -> Result<InputReference, Error> {
    if index as usize >= parent.outputs.len() {
        return Err(Error::InvalidParameter("output index out of range"));
    }

    debug!("Requesting trusted input for {}:{}", parent.txid_hex(), index);

    let mut buff = Vec::with_capacity(64);

    // Output index, version and input count
    buff.extend_from_slice(&index.to_be_bytes());
    buff.extend_from_slice(&parent.version);
    varint::encode(parent.inputs.len() as u32, &mut buff);
    channel::request(t, &TrustedInputFrame::new(FramePosition::First, &buff)).await?;

    // Inputs, with scripts and sequences split over frames
    for i in &parent.inputs {
        buff.clear();
        buff.extend_from_slice(&i.prev_hash);
        buff.extend_from_slice(&i.prev_index.to_le_bytes());
        varint::encode(i.script.len() as u32, &mut buff);
        channel::request(t, &TrustedInputFrame::new(FramePosition::Next, &buff)).await?;

        channel::send_chunked(t, &TrustedInputCmd, &i.script, Some(&i.sequence[..])).await?;
    }

    // Outputs
    buff.clear();
    varint::encode(parent.outputs.len() as u32, &mut buff);
    channel::request(t, &TrustedInputFrame::new(FramePosition::Next, &buff)).await?;

    for o in &parent.outputs {
        buff.clear();
        buff.extend_from_slice(&o.amount);
        varint::encode(o.script.len() as u32, &mut buff);
        channel::request(t, &TrustedInputFrame::new(FramePosition::Next, &buff)).await?;

        channel::send_chunked(t, &TrustedInputCmd, &o.script, None).await?;
    }

    // Lock time completes the transaction and returns the trusted input
    let resp =
        channel::request(t, &TrustedInputFrame::new(FramePosition::Next, &parent.lock_time))
            .await?;

    if resp.len() != TRUSTED_INPUT_LEN {
        return Err(Error::UnexpectedResponse);
    }

    Ok(InputReference::Trusted(resp))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tx::{test::SEGWIT_TX, Output};

    #[test]
    fn witness_reference_layout() {
        let tx = Transaction::parse(&hex::decode(SEGWIT_TX).unwrap()).unwrap();

        let r = witness_reference(&tx, 1).unwrap();
        let InputReference::Witness(b) = &r else {
            panic!("expected witness reference");
        };

        assert_eq!(b.len(), 44);
        assert_eq!(&b[..32], &tx.txid());
        assert_eq!(&b[32..36], &[1, 0, 0, 0]);
        assert_eq!(&b[36..], &tx.outputs[1].amount);

        // Witness references convert to themselves
        assert_eq!(r.to_witness().unwrap(), r);
    }

    #[test]
    fn witness_reference_out_of_range() {
        let tx = Transaction::new(1, 0).with_output(Output::new(1000, vec![0x51]));

        assert!(matches!(
            witness_reference(&tx, 1),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn trusted_to_witness() {
        let blob: Vec<u8> = (0u8..56).collect();

        let r = InputReference::Trusted(blob.clone()).to_witness().unwrap();
        assert_eq!(r, InputReference::Witness(blob[4..44].to_vec()));

        assert!(matches!(
            InputReference::Trusted(vec![0u8; 20]).to_witness(),
            Err(Error::UnexpectedResponse)
        ));
    }

    #[test]
    fn reference_encoding() {
        let mut b = vec![];
        InputReference::Trusted(vec![0xaa; 56]).encode(&mut b).unwrap();
        assert_eq!(&b[..2], &[TRUSTED_INPUT_TAG, 56]);
        assert_eq!(b.len(), 58);

        let mut b = vec![];
        InputReference::Witness(vec![0xbb; 44]).encode(&mut b).unwrap();
        assert_eq!(b[0], WITNESS_INPUT_TAG);
        assert_eq!(b.len(), 45);
    }
}
