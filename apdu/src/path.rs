// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BIP32 derivation paths, as encoded in key and signing requests

use core::{fmt::Display, str::FromStr};

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};
use heapless::Vec;

use crate::ApduError;

/// Maximum number of path elements accepted by the device
pub const MAX_PATH_LEN: usize = 10;

/// Hardened derivation flag
pub const HARDENED: u32 = 0x8000_0000;

/// BIP32 derivation path
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     COUNT     |          ELEMENT_0 (u32, big-endian)          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |               |                 ELEMENT_1...                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Bip32Path(Vec<u32, MAX_PATH_LEN>);

/// Path parsing / construction errors
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum PathError {
    /// Path exceeds [MAX_PATH_LEN] elements
    TooLong,
    /// Element is not a valid (optionally hardened) 31-bit index
    InvalidElement,
}

impl Bip32Path {
    /// Create a new (empty) path
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a path from raw elements (hardened elements with [HARDENED] set)
    pub fn from_slice(elements: &[u32]) -> Result<Self, PathError> {
        Vec::from_slice(elements)
            .map(Self)
            .map_err(|_| PathError::TooLong)
    }

    /// Append an element to the path
    pub fn push(&mut self, element: u32) -> Result<(), PathError> {
        self.0.push(element).map_err(|_| PathError::TooLong)
    }

    /// Fetch raw path elements
    pub fn elements(&self) -> &[u32] {
        &self.0
    }

    /// Number of elements in the path
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the path is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse textual paths such as `44'/0'/0'/0/5` (`m/` prefix and `h` markers also accepted)
impl FromStr for Bip32Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("m/").unwrap_or(s);

        let mut p = Self::new();
        if s.is_empty() || s == "m" {
            return Ok(p);
        }

        for e in s.split('/') {
            let (digits, hardened) = match e.strip_suffix('\'').or_else(|| e.strip_suffix('h')) {
                Some(d) => (d, true),
                None => (e, false),
            };

            let v = digits
                .parse::<u32>()
                .map_err(|_| PathError::InvalidElement)?;

            if v & HARDENED != 0 {
                return Err(PathError::InvalidElement);
            }

            p.push(if hardened { v | HARDENED } else { v })?;
        }

        Ok(p)
    }
}

impl Display for Bip32Path {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }

            match e & HARDENED != 0 {
                true => write!(f, "{}'", e & !HARDENED)?,
                false => write!(f, "{e}")?,
            }
        }
        Ok(())
    }
}

impl Encode for Bip32Path {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1 + 4 * self.0.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.0.len() as u8;
        for (i, e) in self.0.iter().enumerate() {
            BigEndian::write_u32(&mut buff[1 + 4 * i..], *e);
        }

        Ok(n)
    }
}

impl DecodeOwned for Bip32Path {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let count = buff[0] as usize;
        if count > MAX_PATH_LEN {
            return Err(ApduError::InvalidEncoding);
        }
        if buff.len() < 1 + 4 * count {
            return Err(ApduError::InvalidLength);
        }

        let mut p = Self::new();
        for i in 0..count {
            let e = BigEndian::read_u32(&buff[1 + 4 * i..]);
            p.push(e).map_err(|_| ApduError::InvalidEncoding)?;
        }

        Ok((p, 1 + 4 * count))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn parse_path() {
        let p = Bip32Path::from_str("44'/0'/0'/0/5").unwrap();

        assert_eq!(
            p.elements(),
            &[44 | HARDENED, HARDENED, HARDENED, 0, 5]
        );

        let q = Bip32Path::from_str("m/44h/0h/0h/0/5").unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn parse_path_errors() {
        assert_eq!(
            Bip32Path::from_str("0/1/2/3/4/5/6/7/8/9/10"),
            Err(PathError::TooLong)
        );
        assert_eq!(
            Bip32Path::from_str("44'/x"),
            Err(PathError::InvalidElement)
        );
        assert_eq!(
            Bip32Path::from_str("2147483648"),
            Err(PathError::InvalidElement)
        );
    }

    #[test]
    fn encode_path() {
        let p = Bip32Path::from_str("44'/1").unwrap();

        let mut buff = [0u8; 16];
        let n = p.encode(&mut buff).unwrap();

        assert_eq!(&buff[..n], &[2, 0x80, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn encode_empty_path() {
        let mut buff = [0xffu8; 4];
        let n = Bip32Path::new().encode(&mut buff).unwrap();

        assert_eq!(&buff[..n], &[0]);
    }

    #[test]
    fn encode_decode_path() {
        let p = Bip32Path::from_str("84'/0'/0'/1/7").unwrap();

        let mut buff = [0u8; 64];
        let n = encode_decode_apdu(&mut buff, &p);
        assert_eq!(n, 21);
    }

    #[test]
    fn display_path() {
        use core::fmt::Write;

        let p = Bip32Path::from_str("m/49'/1'/0'/0/3").unwrap();

        let mut s = heapless::String::<32>::new();
        write!(s, "{p}").unwrap();
        assert_eq!(s.as_str(), "49'/1'/0'/0/3");
    }
}
