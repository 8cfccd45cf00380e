// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for interacting with the Ledger Bitcoin application

use std::{str::FromStr, time::Duration};

use clap::Parser;
use ledger_lib::{Filters, LedgerProvider, Transport};
use log::{debug, error, info, LevelFilter};

use ledger_btc::{
    apdu::public_key::AddressFormat,
    transport::LedgerTransport,
    DeviceHandle, Exchange, SignRequest, Transaction,
};

mod helpers;
use helpers::*;

/// Ledger Bitcoin command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Supported transports for ledger discovery
    #[clap(long, value_enum, default_value = "any")]
    target: Target,

    /// Device index (where more than one device is available)
    #[clap(long, default_value = "0")]
    device_index: usize,

    /// Per-request timeout in milliseconds
    #[clap(long, default_value = "30000")]
    timeout_ms: u64,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// List available devices
    List,

    /// Fetch the public key and address for a BIP32 path
    PublicKey {
        /// BIP32 derivation path
        #[clap(long, default_value = "44'/0'/0'/0/0")]
        path: String,

        /// Address format (Legacy, P2shSegwit, NativeSegwit)
        #[clap(long, default_value = "Legacy")]
        format: String,

        /// Display the address on the device for verification
        #[clap(long)]
        display: bool,
    },

    /// Sign a message
    SignMessage {
        /// BIP32 derivation path
        #[clap(long, default_value = "44'/0'/0'/0/0")]
        path: String,

        /// Message to be signed
        #[clap(long)]
        message: String,
    },

    /// Sign a transaction from a JSON signing request
    SignTx {
        /// Signing request file (JSON)
        #[clap(long)]
        input: String,

        /// Optional output file for the signed transaction (hex)
        #[clap(long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default());

    // Connect to ledger provider
    let mut p = LedgerProvider::init().await;

    debug!("Using transport: {:?}", args.target);

    // List available devices
    let mut devices = p.list(args.target.into()).await?;
    if devices.is_empty() {
        return Err(anyhow::anyhow!("No devices found"));
    }

    // Handle list command
    if args.cmd == Actions::List {
        info!("Devices:");
        for (i, d) in devices.iter().enumerate() {
            info!("  {}: {:?}", i, d);
        }

        return Ok(());
    }

    // Select device by index
    if args.device_index >= devices.len() {
        return Err(anyhow::anyhow!(
            "Invalid device index: {} (max: {})",
            args.device_index,
            devices.len() - 1
        ));
    }

    let d = devices.swap_remove(args.device_index);
    debug!("Using device {}: {:?}", args.device_index, d);

    // Connect to device
    let h = match p.connect(d).await {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to connect to device: {e:?}");
            return Err(e.into());
        }
    };

    let t = LedgerTransport::new(h, Duration::from_millis(args.timeout_ms));

    // Execute command
    execute(DeviceHandle::from(t), args.cmd).await?;

    Ok(())
}

/// Execute a command with the provided device
async fn execute<T: Exchange>(t: DeviceHandle<T>, cmd: Actions) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::PublicKey {
            path,
            format,
            display,
        } => {
            let path = parse_path(&path)?;
            let format = AddressFormat::from_str(&format)
                .map_err(|_| anyhow::anyhow!("invalid address format '{format}'"))?;

            info!("Requesting public key for path: {path} (format: {format})");

            let k = t.wallet_public_key(&path, display, format).await?;

            info!("public key: {}", hex::encode(&k.public_key));
            info!("address: {}", k.address);
            if let Some(c) = k.chain_code {
                info!("chain code: {}", hex::encode(c));
            }
        }
        Actions::SignMessage { path, message } => {
            let path = parse_path(&path)?;

            info!("Signing message with path: {path}");

            let sig = t.sign_message(&path, message.as_bytes()).await?;

            info!("v: {}", sig.v);
            info!("r: {}", hex::encode(sig.r));
            info!("s: {}", hex::encode(sig.s));
        }
        Actions::SignTx { input, output } => {
            // Read in signing request
            let r: SignTxFile = read_input(&input).await?;

            let (mut tx, req) = r.into_request()?;

            // Execute signing
            debug!("Signing transaction {}", tx.txid_hex());
            t.sign_transaction(&mut tx, &req).await?;

            let signed = hex::encode(tx.serialize(false, false));

            match output {
                Some(o) => write_output(&o, &signed).await?,
                None => info!("signed transaction: {signed}"),
            }
        }
        Actions::List => unreachable!(),
    }

    Ok(())
}

/// Signing request file format
#[derive(Clone, PartialEq, Debug, serde::Deserialize)]
struct SignTxFile {
    /// Unsigned transaction (hex)
    tx: String,
    /// Parent transactions (hex)
    parents: Vec<String>,
    /// Signing path for each input
    paths: Vec<String>,
    /// Change output path
    #[serde(default)]
    change_path: Option<String>,
}

impl SignTxFile {
    /// Decode transactions and paths into a [SignRequest]
    fn into_request(self) -> anyhow::Result<(Transaction, SignRequest)> {
        let tx = parse_tx(&self.tx)?;

        let parents = self
            .parents
            .iter()
            .map(|p| parse_tx(p))
            .collect::<Result<Vec<_>, _>>()?;

        let paths = self
            .paths
            .iter()
            .map(|p| parse_path(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut req = SignRequest::new(parents, paths);
        if let Some(c) = &self.change_path {
            req = req.with_change_path(parse_path(c)?);
        }

        Ok((tx, req))
    }
}

/// Device discovery filter
#[derive(Copy, Clone, Debug, PartialEq, clap::ValueEnum, strum::Display)]
enum Target {
    /// List all devices available using supported transport
    Any,
    /// List only HID devices
    Hid,
    /// List only TCP devices
    Tcp,
}

impl From<Target> for Filters {
    fn from(t: Target) -> Self {
        match t {
            Target::Any => Filters::Any,
            Target::Hid => Filters::Hid,
            Target::Tcp => Filters::Tcp,
        }
    }
}
