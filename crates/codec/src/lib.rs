//! Wire codec for the heartbeat cluster protocol.
//!
//! Every datagram begins with a 4-byte little-endian [`MessageType`] tag
//! followed by a packed record. Records are packed with [`Pack`]/[`Unpack`],
//! little-endian and 4-byte aligned throughout.

pub mod hostname;
pub mod message;
pub mod wire;

pub use hostname::Hostname;
pub use message::{Header, MessageType, NodeState};
pub use wire::{Pack, Unpack};

use std::{net::AddrParseError, str::Utf8Error};

#[derive(Debug)]
pub enum Error {
    UnexpectedEof,
    InvalidBool(u32),
    InvalidMessageType(u32),
    InvalidNodeState(u32),
    Utf8Error(Utf8Error),
    AddrParseError(AddrParseError),
    ResolveFailure(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8Error(value)
    }
}

impl From<AddrParseError> for Error {
    fn from(value: AddrParseError) -> Self {
        Self::AddrParseError(value)
    }
}

/// Decode the leading 4-byte message-type tag and hand back the remainder.
pub fn split_tag(bytes: &[u8]) -> Result<(MessageType, &[u8]), Error> {
    if bytes.len() < 4 {
        return Err(Error::UnexpectedEof);
    }

    let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    Ok((MessageType::try_from(raw)?, &bytes[4..]))
}
