// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Message signing

use encdec::{DecodeOwned, Encode};
use log::debug;

use ledger_btc_apdu::{
    message::{MessageSignature, SignMessageFrame, SignMessageSignReq},
    path::Bip32Path,
    FramePosition,
};

use crate::{
    channel::{self, Command},
    Error, Exchange,
};

/// Message preparation frames, the first carrying the path and length
struct SignMessageCmd;

impl Command for SignMessageCmd {
    type Frame<'a> = SignMessageFrame<'a>;

    fn frame<'a>(&self, index: usize, _last: bool, data: &'a [u8]) -> Self::Frame<'a> {
        let position = match index {
            0 => FramePosition::First,
            _ => FramePosition::Next,
        };
        SignMessageFrame::new(position, data)
    }
}

/// Sign a message with the key at `path`
pub async fn sign_message<T: Exchange + ?Sized>(
    t: &mut T,
    path: &Bip32Path,
    message: &[u8],
) -> Result<MessageSignature, Error> {
    let len = u16::try_from(message.len())
        .map_err(|_| Error::InvalidParameter("message too long"))?;

    debug!("Signing {len} byte message with path: {path}");

    let mut payload = vec![0u8; path.encode_len()? + 2 + message.len()];
    let n = path.encode(&mut payload)?;
    payload[n..][..2].copy_from_slice(&len.to_be_bytes());
    payload[n + 2..].copy_from_slice(message);

    channel::send_chunked(t, &SignMessageCmd, &payload, None).await?;

    let resp = channel::request(t, &SignMessageSignReq).await?;

    let (sig, _n) =
        MessageSignature::decode_owned(&resp).map_err(|_| Error::UnexpectedResponse)?;

    Ok(sig)
}
