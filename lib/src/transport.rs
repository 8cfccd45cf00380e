//! Device transport abstraction, allowing protocol operations to run over
//! any underlying transport (or a scripted device under test)
//!
// Copyright (c) 2022-2023 The MobileCoin Foundation

use async_trait::async_trait;

use crate::Error;

/// Exchange a single APDU with a device.
///
/// At most one exchange may be in flight, implementations return the
/// response payload with the trailing status word split out.
#[async_trait]
pub trait Exchange: Send {
    /// Issue an APDU, returning the response payload and status word
    async fn exchange(
        &mut self,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: &[u8],
    ) -> Result<(Vec<u8>, u16), Error>;
}

#[cfg(feature = "transport")]
pub use ledger::LedgerTransport;

#[cfg(feature = "transport")]
mod ledger {
    use std::time::Duration;

    use async_trait::async_trait;
    use log::trace;

    use ledger_btc_apdu::{ApduError, MAX_APDU_DATA};

    use super::Exchange;
    use crate::Error;

    /// [Exchange] implementation over `ledger-lib` transports (USB HID, BLE, TCP)
    pub struct LedgerTransport<T> {
        device: T,
        timeout: Duration,
    }

    impl<T: ledger_lib::Exchange + Send> LedgerTransport<T> {
        /// Wrap a connected `ledger-lib` device with the provided per-request timeout
        pub fn new(device: T, timeout: Duration) -> Self {
            Self { device, timeout }
        }
    }

    #[async_trait]
    impl<T: ledger_lib::Exchange + Send> Exchange for LedgerTransport<T> {
        async fn exchange(
            &mut self,
            cla: u8,
            ins: u8,
            p1: u8,
            p2: u8,
            data: &[u8],
        ) -> Result<(Vec<u8>, u16), Error> {
            if data.len() > MAX_APDU_DATA {
                return Err(Error::Apdu(ApduError::InvalidLength));
            }

            let mut cmd = Vec::with_capacity(5 + data.len());
            cmd.extend_from_slice(&[cla, ins, p1, p2, data.len() as u8]);
            cmd.extend_from_slice(data);

            let mut resp = self
                .device
                .exchange(&cmd, self.timeout)
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;

            trace!("raw response: {}", hex::encode(&resp));

            if resp.len() < 2 {
                return Err(Error::UnexpectedResponse);
            }

            let sw = resp.split_off(resp.len() - 2);

            Ok((resp, u16::from_be_bytes([sw[0], sw[1]])))
        }
    }
}
