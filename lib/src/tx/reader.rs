// Copyright (c) 2022-2023 The MobileCoin Foundation

use crate::{varint, Error, ParseError};

/// Cursor over a raw transaction buffer
pub(crate) struct Reader<'a> {
    buff: &'a [u8],
    index: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buff: &'a [u8]) -> Self {
        Self { buff, index: 0 }
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.buff.len() - self.index
    }

    /// Take `n` bytes from the buffer
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < n {
            return Err(ParseError::Truncated.into());
        }

        let d = &self.buff[self.index..][..n];
        self.index += n;

        Ok(d)
    }

    /// Take a fixed-size field
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut a = [0u8; N];
        a.copy_from_slice(self.take(N)?);
        Ok(a)
    }

    /// Take a varint
    pub fn varint(&mut self) -> Result<u32, Error> {
        let (v, n) = varint::decode(&self.buff[self.index..])?;
        self.index += n;
        Ok(v)
    }

    /// Take a varint-prefixed byte string
    pub fn bytes(&mut self) -> Result<&'a [u8], Error> {
        let n = self.varint()?;
        self.take(n as usize)
    }
}
