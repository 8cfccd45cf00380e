// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::path::Path;

use log::debug;
use serde::de::DeserializeOwned;

use ledger_btc::{apdu::path::Bip32Path, Transaction};

/// Parse a hex encoded transaction
pub fn parse_tx(s: &str) -> anyhow::Result<Transaction> {
    let b = hex::decode(s.trim())?;
    let tx = Transaction::parse(&b)?;
    Ok(tx)
}

/// Parse a textual BIP32 path
pub fn parse_path(s: &str) -> anyhow::Result<Bip32Path> {
    s.parse::<Bip32Path>()
        .map_err(|e| anyhow::anyhow!("invalid path '{s}': {e}"))
}

/// Helper to read input files where required
pub async fn read_input<T: DeserializeOwned>(file_name: &str) -> anyhow::Result<T> {
    debug!("Reading input from '{}'", file_name);

    let s = tokio::fs::read_to_string(file_name).await?;

    // Determine format from file name
    let p = Path::new(file_name);

    // Decode based on input extension
    let v = match p.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&s)?,
        _ => return Err(anyhow::anyhow!("unsupported input file format")),
    };

    Ok(v)
}

/// Helper to write hex output files
pub async fn write_output(file_name: &str, value: &str) -> anyhow::Result<()> {
    debug!("Writing output to '{}'", file_name);

    tokio::fs::write(file_name, value).await?;

    Ok(())
}
