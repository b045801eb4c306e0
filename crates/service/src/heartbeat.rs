//! Protocol layer: builds outbound heartbeat requests and applies inbound
//! ones. Generic over the collaborators in [`crate::remote`] so this crate
//! never owns a socket.

use std::net::Ipv4Addr;

use codec::{Header, MessageType, NodeState, Pack};
use bytes::BytesMut;
use log::warn;

use crate::cluster::Cluster;
use crate::remote::RemoteCaller;

pub struct HeartbeatService<'a> {
    cluster: &'a Cluster,
    remote: &'a dyn RemoteCaller,
}

impl<'a> HeartbeatService<'a> {
    pub fn new(cluster: &'a Cluster, remote: &'a dyn RemoteCaller) -> Self {
        Self { cluster, remote }
    }

    fn build_header(&self, is_request: bool, dest: codec::Hostname) -> Option<Header> {
        let orig = self.cluster.myself_hostname()?;
        Some(Header {
            is_request,
            state: self.cluster.node_state(),
            group_id: self.cluster.group_id(),
            orig_hostname: orig,
            dest_hostname: dest,
        })
    }

    /// Send a heartbeat request to `dest`. Transport failures are logged
    /// and swallowed — the next periodic round will simply try again.
    pub fn send_heartbeat_request(&self, dest: &codec::Hostname) {
        let Some(header) = self.build_header(true, dest.clone()) else {
            warn!("cannot send heartbeat: local node not yet known");
            return;
        };

        let mut bytes = BytesMut::with_capacity(4 + header.packed_size());
        (MessageType::Heartbeat as u32).pack(&mut bytes);
        header.pack(&mut bytes);

        if let Err(e) = self.remote.remote_call(dest, bytes.to_vec()) {
            warn!("heartbeat send to {dest} failed: {e}");
        }
    }

    /// Apply an inbound heartbeat request or response, returning the reply
    /// datagram to send back (if any).
    pub fn on_heartbeat_request(&self, header: &Header, source_ip: Ipv4Addr, on_state_changed: &dyn Fn()) -> Option<Vec<u8>> {
        let should_reply = self.cluster.on_heartbeat(
            header.is_request,
            header.state,
            &header.group_id,
            &header.orig_hostname,
            &header.dest_hostname,
            source_ip,
            on_state_changed,
        );

        if !should_reply {
            return None;
        }

        let reply = self.build_header(false, header.orig_hostname.clone())?;
        let mut bytes = BytesMut::with_capacity(4 + reply.packed_size());
        (MessageType::Heartbeat as u32).pack(&mut bytes);
        reply.pack(&mut bytes);
        Some(bytes.to_vec())
    }

    /// Broadcast a request to every configured peer, incrementing each
    /// peer's outstanding-request counter.
    pub fn send_heartbeat_to_all(&self) {
        for peer in self.cluster.peer_hostnames() {
            self.send_heartbeat_request(&peer);
            self.cluster.increment_heartbeat_gap(&peer);
        }
    }
}
