#![allow(unused)]
// Copyright (c) 2022-2023 The MobileCoin Foundation

/// encdec helper module for raw byte fields
pub(crate) mod bytes {
    use ledger_proto::ApduError;

    pub fn enc(d: &[u8], buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < d.len() {
            return Err(ApduError::InvalidLength);
        }

        buff[..d.len()].copy_from_slice(d);

        Ok(d.len())
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), ApduError> {
        if buff.len() < N {
            return Err(ApduError::InvalidLength);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// Helpers for DER encoded ECDSA integers
pub(crate) mod der {
    use ledger_proto::ApduError;

    /// DER sequence tag
    pub const SEQUENCE: u8 = 0x30;

    /// DER integer tag
    pub const INTEGER: u8 = 0x02;

    /// Strip leading zero bytes from a big-endian integer (keeping at least one byte)
    pub fn trim(v: &[u8; 32]) -> &[u8] {
        let n = v.iter().take_while(|b| **b == 0).count().min(31);
        &v[n..]
    }

    /// Compute the encoded length of an integer (including tag and length bytes)
    pub fn int_len(v: &[u8; 32]) -> usize {
        let t = trim(v);
        2 + t.len() + (t[0] & 0x80 != 0) as usize
    }

    /// Write a DER integer, prefixing a zero byte where the high bit is set
    pub fn enc_int(v: &[u8; 32], buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = int_len(v);
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        let t = trim(v);

        buff[0] = INTEGER;
        buff[1] = (n - 2) as u8;
        let mut index = 2;

        if t[0] & 0x80 != 0 {
            buff[index] = 0;
            index += 1;
        }

        buff[index..][..t.len()].copy_from_slice(t);
        index += t.len();

        Ok(index)
    }

    /// Read a DER integer into a 32-byte big-endian value
    pub fn dec_int(buff: &[u8]) -> Result<([u8; 32], usize), ApduError> {
        if buff.len() < 2 || buff[0] != INTEGER {
            return Err(ApduError::InvalidEncoding);
        }

        let l = buff[1] as usize;
        if buff.len() < 2 + l || l == 0 {
            return Err(ApduError::InvalidLength);
        }

        // Drop sign padding
        let mut v = &buff[2..][..l];
        while v.len() > 1 && v[0] == 0 {
            v = &v[1..];
        }

        if v.len() > 32 {
            return Err(ApduError::InvalidEncoding);
        }

        let mut d = [0u8; 32];
        d[32 - v.len()..].copy_from_slice(v);

        Ok((d, 2 + l))
    }
}
