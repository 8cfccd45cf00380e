// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device command channel.
//!
//! Helpers for issuing single APDUs and splitting long payloads over
//! multiple frames, checking the status word of every response.

use std::fmt::Debug;

use encdec::Encode;
use log::{debug, trace};

use ledger_btc_apdu::{status::StatusWord, MAX_APDU_DATA};
use ledger_proto::{ApduError, ApduStatic};

use crate::{Error, Exchange};

/// Command carried over one or more data frames
pub trait Command {
    /// APDU type for each frame
    type Frame<'a>: ApduStatic + Encode<Error = ApduError> + Debug;

    /// Build the frame carrying the fragment at `index`
    fn frame<'a>(&self, index: usize, last: bool, data: &'a [u8]) -> Self::Frame<'a>;
}

/// Check a response status word
pub fn check_status(sw: u16) -> Result<(), Error> {
    match StatusWord::try_from(sw) {
        Ok(StatusWord::Ok) => Ok(()),
        Ok(s) if s.is_wrong_application() => {
            debug!("Wrong application (status: {s})");
            Err(Error::WrongApplication)
        }
        Ok(s) => {
            debug!("Request rejected (status: {s})");
            Err(Error::DeviceRejected(sw))
        }
        Err(_) => {
            debug!("Request rejected (status: {sw:04x})");
            Err(Error::DeviceRejected(sw))
        }
    }
}

/// Issue a single APDU, returning the response payload on success
pub async fn request<T, R>(t: &mut T, req: &R) -> Result<Vec<u8>, Error>
where
    T: Exchange + ?Sized,
    R: ApduStatic + Encode<Error = ApduError> + Debug,
{
    let mut buff = [0u8; MAX_APDU_DATA];
    let n = req.encode(&mut buff)?;

    trace!(
        "cmd: {:02x} {:02x} {:02x} {:02x} {}",
        R::CLA,
        R::INS,
        req.p1(),
        req.p2(),
        hex::encode(&buff[..n])
    );

    let (resp, sw) = t
        .exchange(R::CLA, R::INS, req.p1(), req.p2(), &buff[..n])
        .await?;

    trace!("resp: {} ({sw:04x})", hex::encode(&resp));

    check_status(sw)?;

    Ok(resp)
}

/// Split a payload into frame-sized fragments.
///
/// Where a trailer is provided fragments are reduced in size so the trailer
/// always fits in the final fragment, an empty payload with a trailer
/// produces a single trailer-only fragment.
pub fn fragments(payload: &[u8], trailer: Option<&[u8]>) -> Result<Vec<Vec<u8>>, Error> {
    let max = match trailer {
        Some(t) if t.len() >= MAX_APDU_DATA => {
            return Err(Error::InvalidParameter("trailer exceeds frame size"))
        }
        Some(t) => MAX_APDU_DATA - t.len(),
        None => MAX_APDU_DATA,
    };

    let mut f: Vec<Vec<u8>> = payload.chunks(max).map(|c| c.to_vec()).collect();

    if let Some(t) = trailer {
        match f.last_mut() {
            Some(l) => l.extend_from_slice(t),
            None => f.push(t.to_vec()),
        }
    }

    Ok(f)
}

/// Send a payload as a sequence of frames, aborting on the first failure.
///
/// Returns the response to the final frame (empty where no frames were sent).
pub async fn send_chunked<T, C>(
    t: &mut T,
    cmd: &C,
    payload: &[u8],
    trailer: Option<&[u8]>,
) -> Result<Vec<u8>, Error>
where
    T: Exchange + ?Sized,
    C: Command,
{
    let f = fragments(payload, trailer)?;
    let mut resp = vec![];

    for (i, d) in f.iter().enumerate() {
        let frame = cmd.frame(i, i == f.len() - 1, d);
        resp = request(t, &frame).await?;
    }

    Ok(resp)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fragment_counts() {
        for k in 1..4 {
            let p = vec![0xaa; MAX_APDU_DATA * k];
            assert_eq!(fragments(&p, None).unwrap().len(), k);

            let p = vec![0xaa; MAX_APDU_DATA * k + 1];
            assert_eq!(fragments(&p, None).unwrap().len(), k + 1);
        }

        assert!(fragments(&[], None).unwrap().is_empty());
    }

    #[test]
    fn fragment_trailer() {
        let t = [0xff; 4];

        // Trailer only
        let f = fragments(&[], Some(&t)).unwrap();
        assert_eq!(f, vec![t.to_vec()]);

        // Trailer fits alongside a full-size fragment
        let p = vec![0xaa; MAX_APDU_DATA - 4];
        let f = fragments(&p, Some(&t)).unwrap();
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].len(), MAX_APDU_DATA);
        assert_eq!(&f[0][MAX_APDU_DATA - 4..], &t);

        // Trailer pushes the payload into a second fragment
        let p = vec![0xaa; MAX_APDU_DATA - 3];
        let f = fragments(&p, Some(&t)).unwrap();
        assert_eq!(f.len(), 2);
        assert_eq!(f[1], vec![0xaa, 0xff, 0xff, 0xff, 0xff]);
        assert!(f.iter().all(|f| f.len() <= MAX_APDU_DATA));
    }

    #[test]
    fn fragment_trailer_too_long() {
        let t = [0u8; MAX_APDU_DATA];
        assert!(matches!(
            fragments(&[1, 2, 3], Some(&t)),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn status_words() {
        assert!(check_status(0x9000).is_ok());

        for sw in [0x6e00, 0x6d00, 0x6b00] {
            assert!(matches!(check_status(sw), Err(Error::WrongApplication)));
        }

        for sw in [0x6985, 0x6a80, 0x6f00, 0x0000] {
            assert!(matches!(check_status(sw), Err(Error::DeviceRejected(v)) if v == sw));
        }
    }
}
