//! The single application message exchanged by this protocol: the heartbeat
//! header, carried as the payload of every datagram after its type tag.

use bytes::BytesMut;

use crate::hostname::Hostname;
use crate::wire::{Pack, Unpack};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Heartbeat = 0,
}

impl TryFrom<u32> for MessageType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::Heartbeat),
            other => Err(Error::InvalidMessageType(other)),
        }
    }
}

impl From<MessageType> for u32 {
    fn from(value: MessageType) -> Self {
        value as u32
    }
}

/// Role this node (or a peer) currently occupies, as carried in a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Unknown = 0,
    Slave = 1,
    ToBeMaster = 2,
    ToBeSlave = 3,
    Master = 4,
    Replica = 5,
}

impl TryFrom<u32> for NodeState {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Error> {
        Ok(match value {
            0 => Self::Unknown,
            1 => Self::Slave,
            2 => Self::ToBeMaster,
            3 => Self::ToBeSlave,
            4 => Self::Master,
            5 => Self::Replica,
            other => return Err(Error::InvalidNodeState(other)),
        })
    }
}

impl std::str::FromStr for NodeState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "unknown" => Self::Unknown,
            "slave" => Self::Slave,
            "to-be-master" => Self::ToBeMaster,
            "to-be-slave" => Self::ToBeSlave,
            "master" => Self::Master,
            "replica" => Self::Replica,
            _ => return Err(Error::InvalidNodeState(u32::MAX)),
        })
    }
}

impl Pack for NodeState {
    fn packed_size(&self) -> usize {
        4
    }

    fn pack(&self, bytes: &mut BytesMut) {
        (*self as u32).pack(bytes);
    }
}

impl Unpack for NodeState {
    fn unpack(bytes: &mut &[u8]) -> Result<Self, Error> {
        Self::try_from(u32::unpack(bytes)?)
    }
}

/// Heartbeat request/response header. This is the sole payload of every
/// datagram in the protocol; `is_request` distinguishes the two directions.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub is_request: bool,
    pub state: NodeState,
    pub group_id: String,
    pub orig_hostname: Hostname,
    pub dest_hostname: Hostname,
}

impl Pack for Header {
    fn packed_size(&self) -> usize {
        self.is_request.packed_size()
            + self.state.packed_size()
            + self.group_id.packed_size()
            + self.orig_hostname.packed_size()
            + self.dest_hostname.packed_size()
    }

    fn pack(&self, bytes: &mut BytesMut) {
        self.is_request.pack(bytes);
        self.state.pack(bytes);
        self.group_id.pack(bytes);
        self.orig_hostname.pack(bytes);
        self.dest_hostname.pack(bytes);
    }
}

impl Unpack for Header {
    fn unpack(bytes: &mut &[u8]) -> Result<Self, Error> {
        Ok(Self {
            is_request: bool::unpack(bytes)?,
            state: NodeState::unpack(bytes)?,
            group_id: String::unpack(bytes)?,
            orig_hostname: Hostname::unpack(bytes)?,
            dest_hostname: Hostname::unpack(bytes)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = Header {
            is_request: true,
            state: NodeState::Slave,
            group_id: "group-a".to_string(),
            orig_hostname: Hostname::new("node-1"),
            dest_hostname: Hostname::new("node-2"),
        };

        let mut buf = BytesMut::with_capacity(header.packed_size());
        header.pack(&mut buf);
        assert_eq!(buf.len(), header.packed_size());

        let frozen = buf.freeze();
        let mut slice: &[u8] = &frozen;
        let decoded = Header::unpack(&mut slice).unwrap();
        assert!(slice.is_empty());
        assert_eq!(decoded, header);
    }

    #[test]
    fn message_type_round_trips() {
        assert_eq!(MessageType::try_from(0u32).unwrap(), MessageType::Heartbeat);
        assert!(MessageType::try_from(7u32).is_err());
    }
}
