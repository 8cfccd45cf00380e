// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction signing
//!
//! Legacy inputs are signed by re-hashing the whole transaction once per
//! input. Segwit inputs share a single hash of the whole transaction,
//! followed by a single-input continuation for each input being signed.
//! Transactions mixing both run the legacy pass first, then convert every
//! input reference to witness form for the segwit pass.

use std::collections::HashMap;

use log::debug;

use ledger_btc_apdu::{hash_input::SigHashType, path::Bip32Path, public_key::AddressFormat};

use crate::{
    hashing::HashingSession,
    public_key::compressed_public_key,
    redeem::resolve_redeem_script,
    script::{self, COMPRESSED_KEY_LEN},
    trusted_input::{trusted_input, witness_reference, InputReference},
    tx::{Output, Transaction},
    Error, Exchange,
};

/// Transaction signing request
#[derive(Clone, Debug, PartialEq)]
pub struct SignRequest {
    /// Transactions containing the outputs spent by each input
    pub parents: Vec<Transaction>,
    /// Signing key path for each input
    pub paths: Vec<Bip32Path>,
    /// Change output path, where the transaction includes change
    pub change_path: Option<Bip32Path>,
    /// Signature hash type (only [SigHashType::All] is supported)
    pub sighash: SigHashType,
}

impl SignRequest {
    /// Create a new signing request with [SigHashType::All] and no change
    pub fn new(parents: Vec<Transaction>, paths: Vec<Bip32Path>) -> Self {
        Self {
            parents,
            paths,
            change_path: None,
            sighash: SigHashType::All,
        }
    }

    /// Set the change output path
    pub fn with_change_path(mut self, path: Bip32Path) -> Self {
        self.change_path = Some(path);
        self
    }
}

/// Per-input signing information
struct InputInfo<'r> {
    path: &'r Bip32Path,
    parent: &'r Transaction,
    format: AddressFormat,
    pk: [u8; COMPRESSED_KEY_LEN],
    redeem_script: Vec<u8>,
}

/// Signing state threaded through each pass
struct SigningContext<'r> {
    req: &'r SignRequest,
    inputs: Vec<InputInfo<'r>>,
    references: Vec<InputReference>,
    signatures: Vec<Option<Vec<u8>>>,
    outputs: Vec<u8>,
    lock_time: u32,
}

impl<'r> SigningContext<'r> {
    fn has_legacy(&self) -> bool {
        self.inputs.iter().any(|i| !i.format.is_segwit())
    }

    fn has_segwit(&self) -> bool {
        self.inputs.iter().any(|i| i.format.is_segwit())
    }

    /// Provide the change path if configured and not yet sent
    async fn change<T: Exchange + ?Sized>(
        &self,
        session: &mut HashingSession<'_, T>,
    ) -> Result<(), Error> {
        match &self.req.change_path {
            Some(p) if !session.change_sent() => session.provide_change_path(p).await,
            _ => Ok(()),
        }
    }

    /// Sign legacy inputs, re-hashing the whole transaction for each
    async fn legacy_pass<T: Exchange + ?Sized>(
        &mut self,
        session: &mut HashingSession<'_, T>,
        tx: &Transaction,
    ) -> Result<(), Error> {
        let mut new = true;

        for i in 0..self.inputs.len() {
            if self.inputs[i].format.is_segwit() {
                continue;
            }

            debug!("Signing legacy input {i}");

            session
                .start(
                    tx,
                    new,
                    Some(i),
                    &self.references,
                    &self.inputs[i].redeem_script,
                )
                .await?;
            new = false;

            self.change(session).await?;
            session.hash_outputs(&self.outputs).await?;

            let sig = session
                .sign(self.inputs[i].path, self.lock_time, self.req.sighash)
                .await?;
            self.signatures[i] = Some(sig);
        }

        Ok(())
    }

    /// Sign segwit inputs, hashing the whole transaction once then
    /// continuing with each input alone
    async fn segwit_pass<T: Exchange + ?Sized>(
        &mut self,
        session: &mut HashingSession<'_, T>,
        tx: &Transaction,
    ) -> Result<(), Error> {
        if self.has_legacy() {
            self.references = self
                .references
                .iter()
                .map(|r| r.to_witness())
                .collect::<Result<_, _>>()?;
        }

        debug!("Hashing segwit transaction");

        session.start(tx, true, None, &self.references, &[]).await?;
        self.change(session).await?;
        session.hash_outputs(&self.outputs).await?;

        for i in 0..self.inputs.len() {
            if !self.inputs[i].format.is_segwit() {
                continue;
            }

            debug!("Signing segwit input {i}");

            let single = Transaction {
                version: tx.version,
                inputs: vec![tx.inputs[i].clone()],
                outputs: vec![],
                lock_time: tx.lock_time,
                witness: None,
            };

            session
                .start(
                    &single,
                    false,
                    Some(0),
                    &self.references[i..=i],
                    &self.inputs[i].redeem_script,
                )
                .await?;

            let sig = session
                .sign(self.inputs[i].path, self.lock_time, self.req.sighash)
                .await?;
            self.signatures[i] = Some(sig);
        }

        Ok(())
    }

    /// Write scriptSigs and witness data into the transaction
    fn assemble(self, tx: &mut Transaction) -> Result<(), Error> {
        let segwit = self.has_segwit();
        let mut witness = vec![];

        for (i, (info, sig)) in self.inputs.iter().zip(&self.signatures).enumerate() {
            let sig = sig.as_deref().ok_or(Error::Internal("input not signed"))?;

            tx.inputs[i].script = script::script_sig(info.format, sig, &info.pk);

            if segwit {
                witness.extend(script::witness(info.format, sig, &info.pk));
            }
        }

        tx.witness = segwit.then_some(witness);

        Ok(())
    }
}

/// Sign every input of `tx`, writing scriptSigs and witness data in place
pub async fn sign_transaction<T: Exchange + ?Sized>(
    t: &mut T,
    tx: &mut Transaction,
    req: &SignRequest,
) -> Result<(), Error> {
    if tx.inputs.is_empty() {
        return Err(Error::InvalidParameter("transaction has no inputs"));
    }
    if req.paths.len() != tx.inputs.len() {
        return Err(Error::InvalidParameter("key path count mismatch"));
    }
    if req.sighash != SigHashType::All {
        return Err(Error::InvalidParameter("unsupported sighash type"));
    }

    let parents: HashMap<[u8; 32], &Transaction> =
        req.parents.iter().map(|p| (p.txid(), p)).collect();

    // Resolve spent outputs and classify inputs
    let mut spent: Vec<(&Transaction, &Output, AddressFormat)> =
        Vec::with_capacity(tx.inputs.len());
    for i in &tx.inputs {
        let parent = *parents
            .get(&i.prev_hash)
            .ok_or(Error::InvalidParameter("missing parent transaction"))?;
        let output = parent
            .outputs
            .get(i.prev_index as usize)
            .ok_or(Error::InvalidParameter("output index out of range"))?;

        spent.push((parent, output, script::classify(&output.script)?));
    }

    // Fetch public keys, once per unique path
    let mut keys: Vec<(&Bip32Path, [u8; COMPRESSED_KEY_LEN])> = vec![];
    for p in &req.paths {
        if !keys.iter().any(|(k, _)| *k == p) {
            let pk = compressed_public_key(t, p).await?;
            keys.push((p, pk));
        }
    }

    let mut inputs = Vec::with_capacity(tx.inputs.len());
    for ((input, (parent, output, format)), path) in tx.inputs.iter().zip(spent).zip(&req.paths) {
        let pk = keys
            .iter()
            .find(|(k, _)| *k == path)
            .map(|(_, pk)| *pk)
            .ok_or(Error::Internal("missing public key"))?;

        inputs.push(InputInfo {
            path,
            parent,
            format,
            pk,
            redeem_script: resolve_redeem_script(&input.script, format, &output.script, &pk),
        });
    }

    let mut ctx = SigningContext {
        req,
        signatures: vec![None; inputs.len()],
        references: Vec::with_capacity(inputs.len()),
        inputs,
        outputs: tx.serialize_outputs(),
        lock_time: tx.lock_time(),
    };

    // Trusted inputs are only required where legacy inputs are present
    let legacy = ctx.has_legacy();
    debug!(
        "Signing {} inputs (legacy: {legacy}, segwit: {})",
        tx.inputs.len(),
        ctx.has_segwit()
    );

    for (input, info) in tx.inputs.iter().zip(&ctx.inputs) {
        let r = match legacy {
            true => trusted_input(t, info.parent, input.prev_index).await?,
            false => witness_reference(info.parent, input.prev_index)?,
        };
        ctx.references.push(r);
    }

    let mut session = HashingSession::new(t);

    if legacy {
        ctx.legacy_pass(&mut session, tx).await?;
    }

    if ctx.has_segwit() {
        ctx.segwit_pass(&mut session, tx).await?;
    }

    ctx.assemble(tx)
}
