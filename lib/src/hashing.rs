// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Untrusted transaction hashing
//!
//! The device maintains a running hash over the transaction being signed,
//! [HashingSession] mirrors the device state machine on the host so protocol
//! operations are issued in a valid order.

use log::debug;
use strum::Display;

use ledger_btc_apdu::{
    hash_input::{
        HashInputStartFrame, HashOutputFrame, HashSignReq, InputMode, OutputFrameKind,
        SigHashType,
    },
    path::Bip32Path,
    FramePosition,
};

use crate::{
    channel::{self, Command},
    trusted_input::InputReference,
    tx::Transaction,
    varint, Error, Exchange,
};

/// Host-side hashing state
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum HashState {
    /// No transaction started
    Idle,
    /// New legacy transaction started
    NewLegacy,
    /// New segwit transaction started
    NewSegwit,
    /// Inputs streamed
    InputsSent,
    /// Outputs streamed
    OutputsSent,
    /// Signature issued for the current input
    Signed,
}

/// Hash input continuation frames
struct HashInputCmd;

impl Command for HashInputCmd {
    type Frame<'a> = HashInputStartFrame<'a>;

    fn frame<'a>(&self, _index: usize, _last: bool, data: &'a [u8]) -> Self::Frame<'a> {
        HashInputStartFrame::new(FramePosition::Next, InputMode::NewLegacy, data)
    }
}

/// Hash output frames, marking the final frame
struct HashOutputCmd;

impl Command for HashOutputCmd {
    type Frame<'a> = HashOutputFrame<'a>;

    fn frame<'a>(&self, _index: usize, last: bool, data: &'a [u8]) -> Self::Frame<'a> {
        let kind = match last {
            true => OutputFrameKind::Last,
            false => OutputFrameKind::More,
        };
        HashOutputFrame::new(kind, data)
    }
}

/// Untrusted hashing session, holding the device for the duration of signing
pub struct HashingSession<'a, T: Exchange + ?Sized> {
    t: &'a mut T,
    state: HashState,
    /// Change path provided for this transaction
    change_sent: bool,
    /// Outputs hashed since the last new transaction
    outputs_hashed: bool,
    /// Last new transaction was started in segwit mode
    segwit: bool,
}

impl<'a, T: Exchange + ?Sized> HashingSession<'a, T> {
    /// Create a new hashing session using the provided device
    pub fn new(t: &'a mut T) -> Self {
        Self {
            t,
            state: HashState::Idle,
            change_sent: false,
            outputs_hashed: false,
            segwit: false,
        }
    }

    /// Fetch the current session state
    pub fn state(&self) -> HashState {
        self.state
    }

    /// Check whether a change path has been provided
    pub fn change_sent(&self) -> bool {
        self.change_sent
    }

    /// Start (or continue) hashing a transaction.
    ///
    /// Every input is presented by reference, with `redeem_script` committed
    /// for the input at `target` and empty scripts for all other inputs.
    /// Segwit mode is selected when any reference is in witness form.
    pub async fn start(
        &mut self,
        tx: &Transaction,
        new: bool,
        target: Option<usize>,
        references: &[InputReference],
        redeem_script: &[u8],
    ) -> Result<(), Error> {
        if references.len() != tx.inputs.len() {
            return Err(Error::InvalidParameter("input reference count mismatch"));
        }
        if matches!(target, Some(i) if i >= tx.inputs.len()) {
            return Err(Error::InvalidParameter("target input out of range"));
        }

        let segwit = references.iter().any(|r| r.is_witness());

        // Continuation requires a previously hashed transaction
        if !new && !matches!(self.state, HashState::OutputsSent | HashState::Signed) {
            return Err(Error::InvalidState(self.state, HashState::OutputsSent));
        }

        let mode = match (new, segwit) {
            (true, false) => InputMode::NewLegacy,
            (true, true) => InputMode::NewSegwit,
            (false, _) => InputMode::Continue,
        };

        debug!(
            "Hashing {} inputs (mode: {mode}, target: {target:?})",
            tx.inputs.len()
        );

        // Version and input count
        let mut buff = Vec::with_capacity(64);
        buff.extend_from_slice(&tx.version);
        varint::encode(tx.inputs.len() as u32, &mut buff);
        channel::request(
            self.t,
            &HashInputStartFrame::new(FramePosition::First, mode, &buff),
        )
        .await?;

        if new {
            self.state = match segwit {
                true => HashState::NewSegwit,
                false => HashState::NewLegacy,
            };
            self.outputs_hashed = false;
            self.segwit = segwit;
        }

        // Input references, each followed by its script and sequence
        for (i, (input, reference)) in tx.inputs.iter().zip(references).enumerate() {
            let script = match target == Some(i) {
                true => redeem_script,
                false => &[],
            };

            buff.clear();
            reference.encode(&mut buff)?;
            varint::encode(script.len() as u32, &mut buff);
            channel::request(
                self.t,
                &HashInputStartFrame::new(FramePosition::Next, mode, &buff),
            )
            .await?;

            channel::send_chunked(self.t, &HashInputCmd, script, Some(&input.sequence[..])).await?;
        }

        self.state = HashState::InputsSent;

        Ok(())
    }

    /// Provide the change output path, at most once per transaction and
    /// only between inputs and outputs
    pub async fn provide_change_path(&mut self, path: &Bip32Path) -> Result<(), Error> {
        if self.state != HashState::InputsSent {
            return Err(Error::InvalidState(self.state, HashState::InputsSent));
        }
        if self.change_sent {
            return Err(Error::InvalidParameter("change path already provided"));
        }

        debug!("Providing change path: {path}");

        let mut buff = [0u8; 64];
        let n = encdec::Encode::encode(path, &mut buff)?;

        channel::request(
            self.t,
            &HashOutputFrame::new(OutputFrameKind::ChangePath, &buff[..n]),
        )
        .await?;

        self.change_sent = true;

        Ok(())
    }

    /// Hash serialised transaction outputs
    pub async fn hash_outputs(&mut self, outputs: &[u8]) -> Result<(), Error> {
        if self.state != HashState::InputsSent {
            return Err(Error::InvalidState(self.state, HashState::InputsSent));
        }

        debug!("Hashing outputs ({} bytes)", outputs.len());

        channel::send_chunked(self.t, &HashOutputCmd, outputs, None).await?;

        self.state = HashState::OutputsSent;
        self.outputs_hashed = true;

        Ok(())
    }

    /// Request a signature for the current input
    pub async fn sign(
        &mut self,
        path: &Bip32Path,
        lock_time: u32,
        sighash: SigHashType,
    ) -> Result<Vec<u8>, Error> {
        if sighash != SigHashType::All {
            return Err(Error::InvalidParameter("unsupported sighash type"));
        }

        // Only segwit continuations may reuse previously hashed outputs
        match self.state {
            HashState::OutputsSent => (),
            HashState::InputsSent if self.segwit && self.outputs_hashed => (),
            _ => return Err(Error::InvalidState(self.state, HashState::OutputsSent)),
        }

        debug!("Requesting signature for path: {path}");

        let mut sig =
            channel::request(self.t, &HashSignReq::new(path.clone(), lock_time, sighash)).await?;

        // Signatures are DER encoded with key parity folded into the sequence tag
        match sig.first_mut() {
            Some(b) => *b &= !0x01,
            None => return Err(Error::UnexpectedResponse),
        }

        self.state = HashState::Signed;

        Ok(sig)
    }
}
