// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bitcoin compact-size (varint) encoding.
//!
//! Only the one, three and five byte forms are supported, the nine byte
//! (`0xff`) form is rejected on decode as counts beyond `u32::MAX` are
//! outside the range handled by the device.

use crate::{Error, ParseError};

/// Prefix for a two byte value
const PREFIX_U16: u8 = 0xfd;
/// Prefix for a four byte value
const PREFIX_U32: u8 = 0xfe;
/// Prefix for an eight byte value (unsupported)
const PREFIX_U64: u8 = 0xff;

/// Compute the encoded length of a value
pub fn encode_len(value: u32) -> usize {
    match value {
        v if v < PREFIX_U16 as u32 => 1,
        v if v <= u16::MAX as u32 => 3,
        _ => 5,
    }
}

/// Append the encoded value to the provided buffer
pub fn encode(value: u32, buff: &mut Vec<u8>) {
    match value {
        v if v < PREFIX_U16 as u32 => buff.push(v as u8),
        v if v <= u16::MAX as u32 => {
            buff.push(PREFIX_U16);
            buff.extend_from_slice(&(v as u16).to_le_bytes());
        }
        v => {
            buff.push(PREFIX_U32);
            buff.extend_from_slice(&v.to_le_bytes());
        }
    }
}

/// Decode a value from the start of the provided buffer,
/// returning the value and the number of bytes consumed
pub fn decode(buff: &[u8]) -> Result<(u32, usize), Error> {
    let prefix = *buff.first().ok_or(ParseError::Truncated)?;

    let n = match prefix {
        PREFIX_U64 => return Err(ParseError::UnsupportedEncoding(prefix).into()),
        PREFIX_U32 => 4,
        PREFIX_U16 => 2,
        v => return Ok((v as u32, 1)),
    };

    if buff.len() < 1 + n {
        return Err(ParseError::Truncated.into());
    }

    let mut b = [0u8; 4];
    b[..n].copy_from_slice(&buff[1..][..n]);

    Ok((u32::from_le_bytes(b), 1 + n))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_decode() {
        let values = [
            0u32,
            1,
            0xfc,
            0xfd,
            0xfe,
            0xff,
            0x1234,
            0xffff,
            0x10000,
            0xdead_beef,
            u32::MAX,
        ];

        for v in values {
            let mut buff = vec![];
            encode(v, &mut buff);

            assert_eq!(buff.len(), encode_len(v), "length mismatch for {v:#x}");
            assert_eq!(decode(&buff).unwrap(), (v, buff.len()));
        }
    }

    #[test]
    fn encoding_forms() {
        let mut buff = vec![];

        encode(0xfc, &mut buff);
        assert_eq!(buff, &[0xfc]);

        buff.clear();
        encode(0xfd, &mut buff);
        assert_eq!(buff, &[0xfd, 0xfd, 0x00]);

        buff.clear();
        encode(0x0001_0000, &mut buff);
        assert_eq!(buff, &[0xfe, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            decode(&[0xff, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(Error::MalformedTransaction(ParseError::UnsupportedEncoding(0xff)))
        ));

        assert!(matches!(
            decode(&[]),
            Err(Error::MalformedTransaction(ParseError::Truncated))
        ));

        assert!(matches!(
            decode(&[0xfe, 0x01, 0x02]),
            Err(Error::MalformedTransaction(ParseError::Truncated))
        ));
    }
}
