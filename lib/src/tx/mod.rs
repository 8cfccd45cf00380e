// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Raw Bitcoin transaction model
//!
//! Fields that are never used arithmetically (version, sequence, amounts,
//! lock time) are retained as their wire-format bytes so transactions
//! re-serialise exactly as they were parsed.

use sha2::{Digest, Sha256};

use crate::{varint, Error, ParseError};

mod reader;
use reader::Reader;

/// Segregated witness marker and flag, following the version field
const WITNESS_MARKER: [u8; 2] = [0x00, 0x01];

/// Transaction input
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Input {
    /// Previous transaction hash (wire byte order)
    pub prev_hash: [u8; 32],
    /// Previous output index
    pub prev_index: u32,
    /// Input script.
    ///
    /// For unsigned inputs this may carry a redeem script override, replaced
    /// by the final scriptSig once signed.
    pub script: Vec<u8>,
    /// Sequence (wire byte order)
    pub sequence: [u8; 4],
}

/// Transaction output
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Output {
    /// Amount in satoshis (little-endian wire bytes)
    pub amount: [u8; 8],
    /// Output script (scriptPubKey)
    pub script: Vec<u8>,
}

impl Output {
    /// Create an output from a native amount
    pub fn new(amount: u64, script: Vec<u8>) -> Self {
        Self {
            amount: amount.to_le_bytes(),
            script,
        }
    }

    /// Fetch the output amount in satoshis
    pub fn value(&self) -> u64 {
        u64::from_le_bytes(self.amount)
    }
}

/// Raw Bitcoin transaction
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Transaction {
    /// Version (wire byte order)
    pub version: [u8; 4],
    /// Transaction inputs
    pub inputs: Vec<Input>,
    /// Transaction outputs
    pub outputs: Vec<Output>,
    /// Lock time (wire byte order)
    pub lock_time: [u8; 4],
    /// Serialised witness data, present for segwit transactions
    pub witness: Option<Vec<u8>>,
}

impl Transaction {
    /// Create a new empty transaction
    pub fn new(version: u32, lock_time: u32) -> Self {
        Self {
            version: version.to_le_bytes(),
            lock_time: lock_time.to_le_bytes(),
            ..Default::default()
        }
    }

    /// Append an input, builder style
    pub fn with_input(mut self, input: Input) -> Self {
        self.inputs.push(input);
        self
    }

    /// Append an output, builder style
    pub fn with_output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Parse a transaction from raw bytes
    pub fn parse(buff: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(buff);

        let version = r.array::<4>()?;

        // Check for segwit marker / flag
        let segwit = match (buff.get(4).copied(), buff.get(5).copied()) {
            (Some(0x00), Some(0x01)) => true,
            (Some(0x00), Some(f)) if f != 0x00 => {
                return Err(ParseError::UnsupportedWitnessFlag(f).into())
            }
            _ => false,
        };
        if segwit {
            r.take(WITNESS_MARKER.len())?;
        }

        let input_count = r.varint()?;
        let mut inputs = Vec::with_capacity(input_count.min(256) as usize);
        for _ in 0..input_count {
            let prev_hash = r.array::<32>()?;
            let prev_index = u32::from_le_bytes(r.array::<4>()?);
            let script = r.bytes()?.to_vec();
            let sequence = r.array::<4>()?;

            inputs.push(Input {
                prev_hash,
                prev_index,
                script,
                sequence,
            });
        }

        let output_count = r.varint()?;
        let mut outputs = Vec::with_capacity(output_count.min(256) as usize);
        for _ in 0..output_count {
            let amount = r.array::<8>()?;
            let script = r.bytes()?.to_vec();

            outputs.push(Output { amount, script });
        }

        // Witness data runs to the trailing lock time
        let witness = match segwit {
            true => {
                let n = r.remaining().checked_sub(4).ok_or(ParseError::Truncated)?;
                Some(r.take(n)?.to_vec())
            }
            false => None,
        };

        let lock_time = r.array::<4>()?;

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
            witness,
        })
    }

    /// Serialise the transaction.
    ///
    /// `skip_output_locktime` truncates the encoding after the inputs,
    /// `skip_witness` omits the witness marker and data where present.
    pub fn serialize(&self, skip_output_locktime: bool, skip_witness: bool) -> Vec<u8> {
        let mut buff = Vec::with_capacity(self.encode_len_hint());

        let witness = match (&self.witness, skip_witness) {
            (Some(w), false) => Some(w),
            _ => None,
        };

        buff.extend_from_slice(&self.version);

        if witness.is_some() {
            buff.extend_from_slice(&WITNESS_MARKER);
        }

        varint::encode(self.inputs.len() as u32, &mut buff);
        for i in &self.inputs {
            buff.extend_from_slice(&i.prev_hash);
            buff.extend_from_slice(&i.prev_index.to_le_bytes());
            varint::encode(i.script.len() as u32, &mut buff);
            buff.extend_from_slice(&i.script);
            buff.extend_from_slice(&i.sequence);
        }

        if skip_output_locktime {
            return buff;
        }

        buff.extend_from_slice(&self.serialize_outputs());

        if let Some(w) = witness {
            buff.extend_from_slice(w);
        }

        buff.extend_from_slice(&self.lock_time);

        buff
    }

    /// Serialise transaction outputs (count followed by each output)
    pub fn serialize_outputs(&self) -> Vec<u8> {
        let mut buff = Vec::new();

        varint::encode(self.outputs.len() as u32, &mut buff);
        for o in &self.outputs {
            buff.extend_from_slice(&o.amount);
            varint::encode(o.script.len() as u32, &mut buff);
            buff.extend_from_slice(&o.script);
        }

        buff
    }

    /// Compute the transaction id (double SHA256 of the witness-stripped
    /// encoding) in wire byte order
    pub fn txid(&self) -> [u8; 32] {
        sha256d(&self.serialize(false, true))
    }

    /// Transaction id in the conventional (reversed) hex display form
    pub fn txid_hex(&self) -> String {
        let mut id = self.txid();
        id.reverse();
        hex::encode(id)
    }

    /// Lock time as a native value
    pub fn lock_time(&self) -> u32 {
        u32::from_le_bytes(self.lock_time)
    }

    fn encode_len_hint(&self) -> usize {
        let i: usize = self.inputs.iter().map(|i| 41 + 5 + i.script.len()).sum();
        let o: usize = self.outputs.iter().map(|o| 8 + 5 + o.script.len()).sum();
        let w = self.witness.as_ref().map(|w| w.len() + 2).unwrap_or(0);

        4 + 5 + i + 5 + o + w + 4
    }
}

/// Double SHA256 digest
pub(crate) fn sha256d(d: &[u8]) -> [u8; 32] {
    let h = Sha256::digest(Sha256::digest(d));
    h.into()
}
