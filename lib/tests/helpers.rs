// Copyright (c) 2022-2023 The MobileCoin Foundation

#![allow(unused)]

use std::{collections::HashMap, str::FromStr};

use async_trait::async_trait;
use log::{debug, LevelFilter};
use simplelog::SimpleLogger;

use ledger_btc::{
    apdu::{path::Bip32Path, Instruction},
    script::p2pkh_script,
    Error, Exchange, Input, Output, Transaction,
};

/// Uncompressed public key returned by the mock device (secp256k1 generator)
pub const PK_UNCOMPRESSED: &str = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";

/// Compressed form of [PK_UNCOMPRESSED]
pub const PK_COMPRESSED: &str =
    "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

/// HASH160 of [PK_COMPRESSED]
pub const PK_HASH: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";

/// Address returned by the mock device
pub const ADDRESS: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";

/// Chain code returned by the mock device
pub const CHAIN_CODE: [u8; 32] = [0xcc; 32];

/// Signature R / S values returned by the mock device
pub const SIG_R: [u8; 32] = [0x11; 32];
pub const SIG_S: [u8; 32] = [0x22; 32];

/// Default signing path
pub const PATH: &str = "44'/0'/0'/0/0";

/// APDU frame as received by the mock device
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

/// Scripted device, recording every frame and answering with
/// canned responses per instruction
pub struct MockDevice {
    /// Frames received, in order
    pub frames: Vec<Frame>,
    /// Status word overrides by instruction
    status: HashMap<u8, u16>,
    /// Response overrides by instruction
    responses: HashMap<u8, Vec<u8>>,
}

impl MockDevice {
    pub fn new() -> Self {
        setup_logging();

        Self {
            frames: vec![],
            status: HashMap::new(),
            responses: HashMap::new(),
        }
    }

    /// Respond to `ins` with the provided status word
    pub fn with_status(mut self, ins: Instruction, sw: u16) -> Self {
        self.status.insert(ins as u8, sw);
        self
    }

    /// Respond to `ins` with the provided payload
    pub fn with_response(mut self, ins: Instruction, data: Vec<u8>) -> Self {
        self.responses.insert(ins as u8, data);
        self
    }

    /// Fetch frames received for an instruction
    pub fn frames(&self, ins: Instruction) -> Vec<&Frame> {
        self.frames.iter().filter(|f| f.ins == ins as u8).collect()
    }

    /// Fetch instructions in the order received
    pub fn instructions(&self) -> Vec<u8> {
        self.frames.iter().map(|f| f.ins).collect()
    }

    fn respond(&self, f: &Frame) -> Vec<u8> {
        if let Some(r) = self.responses.get(&f.ins) {
            return r.clone();
        }

        match Instruction::try_from(f.ins) {
            Ok(Instruction::GetWalletPublicKey) => wallet_public_key_resp(),
            Ok(Instruction::GetTrustedInput) => trusted_input_blob(),
            Ok(Instruction::HashSign) => {
                let mut s = device_signature();
                s.push(0x01);
                s
            }
            Ok(Instruction::SignMessage) if f.p1 == 0x80 => device_signature(),
            _ => vec![],
        }
    }
}

#[async_trait]
impl Exchange for MockDevice {
    async fn exchange(
        &mut self,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: &[u8],
    ) -> Result<(Vec<u8>, u16), Error> {
        assert!(data.len() <= 255, "oversized frame");

        let f = Frame {
            cla,
            ins,
            p1,
            p2,
            data: data.to_vec(),
        };

        let sw = self.status.get(&ins).copied().unwrap_or(0x9000);
        let resp = match sw {
            0x9000 => self.respond(&f),
            _ => vec![],
        };

        self.frames.push(f);

        Ok((resp, sw))
    }
}

/// Setup logging, ignoring repeat initialisation
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Wallet public key response, `pk_len ‖ pk ‖ addr_len ‖ addr ‖ chain_code`
pub fn wallet_public_key_resp() -> Vec<u8> {
    let pk = hex::decode(PK_UNCOMPRESSED).unwrap();

    let mut r = vec![pk.len() as u8];
    r.extend_from_slice(&pk);
    r.push(ADDRESS.len() as u8);
    r.extend_from_slice(ADDRESS.as_bytes());
    r.extend_from_slice(&CHAIN_CODE);
    r
}

/// Trusted input blob (byte `n` = `n`)
pub fn trusted_input_blob() -> Vec<u8> {
    (0u8..56).collect()
}

/// DER signature with the parity bit set in the sequence tag
pub fn device_signature() -> Vec<u8> {
    let mut s = vec![0x31, 0x44, 0x02, 0x20];
    s.extend_from_slice(&SIG_R);
    s.extend_from_slice(&[0x02, 0x20]);
    s.extend_from_slice(&SIG_S);
    s
}

/// Normalised transaction signature (`DER ‖ sighash`)
pub fn tx_signature() -> Vec<u8> {
    let mut s = device_signature();
    s[0] = 0x30;
    s.push(0x01);
    s
}

pub fn path() -> Bip32Path {
    Bip32Path::from_str(PATH).unwrap()
}

pub fn pk_compressed() -> [u8; 33] {
    let mut b = [0u8; 33];
    hex::decode_to_slice(PK_COMPRESSED, &mut b).unwrap();
    b
}

/// P2PKH output script for the mock device key
pub fn p2pkh() -> Vec<u8> {
    p2pkh_script(&pk_compressed())
}

/// P2SH-P2WPKH output script for the mock device key
pub fn p2sh_segwit() -> Vec<u8> {
    let mut redeem = vec![0x00, 0x14];
    redeem.extend_from_slice(&hex::decode(PK_HASH).unwrap());

    let mut s = vec![0xa9, 0x14];
    s.extend_from_slice(&ledger_btc::script::hash160(&redeem));
    s.push(0x87);
    s
}

/// P2WPKH output script for the mock device key
pub fn native_segwit() -> Vec<u8> {
    let mut s = vec![0x00, 0x14];
    s.extend_from_slice(&hex::decode(PK_HASH).unwrap());
    s
}

/// Build a parent transaction paying `amount` to `script`
pub fn parent(script: Vec<u8>, amount: u64, n: u8) -> Transaction {
    Transaction::new(1, 0)
        .with_input(Input {
            prev_hash: [n; 32],
            prev_index: 0,
            script: vec![0x51; 16],
            sequence: [0xff; 4],
        })
        .with_output(Output::new(1_000, vec![0x52]))
        .with_output(Output::new(amount, script))
}

/// Build an unsigned transaction spending output 1 of each parent
pub fn spend(parents: &[&Transaction]) -> Transaction {
    let mut tx = Transaction::new(2, 0x1234);

    for p in parents {
        tx.inputs.push(Input {
            prev_hash: p.txid(),
            prev_index: 1,
            script: vec![],
            sequence: [0xfd, 0xff, 0xff, 0xff],
        });
    }

    tx.with_output(Output::new(40_000, p2pkh()))
        .with_output(Output::new(5_000, native_segwit()))
}
