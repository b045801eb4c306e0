//! Little-endian, 4-byte-aligned primitives shared by every wire record.
//!
//! Strings are length-prefixed (`u32`) and zero-padded to the next 4-byte
//! boundary so a truncated datagram never causes a read past the buffer end.

use bytes::{Buf, BufMut, BytesMut};

use crate::Error;

fn pad(size: usize) -> usize {
    (4 - (size % 4)) % 4
}

pub trait Pack {
    fn packed_size(&self) -> usize;

    fn pack(&self, bytes: &mut BytesMut);
}

pub trait Unpack: Sized {
    fn unpack(bytes: &mut &[u8]) -> Result<Self, Error>;
}

impl Pack for bool {
    fn packed_size(&self) -> usize {
        4
    }

    fn pack(&self, bytes: &mut BytesMut) {
        bytes.put_u32_le(if *self { 1 } else { 0 });
    }
}

impl Unpack for bool {
    fn unpack(bytes: &mut &[u8]) -> Result<Self, Error> {
        let value = u32::unpack(bytes)?;
        match value {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::InvalidBool(other)),
        }
    }
}

impl Pack for u32 {
    fn packed_size(&self) -> usize {
        4
    }

    fn pack(&self, bytes: &mut BytesMut) {
        bytes.put_u32_le(*self);
    }
}

impl Unpack for u32 {
    fn unpack(bytes: &mut &[u8]) -> Result<Self, Error> {
        if bytes.len() < 4 {
            return Err(Error::UnexpectedEof);
        }

        Ok(bytes.get_u32_le())
    }
}

impl Pack for String {
    fn packed_size(&self) -> usize {
        4 + self.len() + pad(self.len())
    }

    fn pack(&self, bytes: &mut BytesMut) {
        bytes.put_u32_le(self.len() as u32);
        bytes.put_slice(self.as_bytes());
        bytes.put_bytes(0, pad(self.len()));
    }
}

impl Unpack for String {
    fn unpack(bytes: &mut &[u8]) -> Result<Self, Error> {
        let len = u32::unpack(bytes)? as usize;
        let total = len + pad(len);
        if bytes.len() < total {
            return Err(Error::UnexpectedEof);
        }

        let s = std::str::from_utf8(&bytes[..len])?.to_string();
        bytes.advance(total);
        Ok(s)
    }
}
