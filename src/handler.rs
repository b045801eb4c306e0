use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use ahash::AHashMap;
use codec::{split_tag, Header, MessageType, Unpack};
use log::{debug, warn};
use service::{Cluster, HeartbeatService, RemoteCaller};

/// A single registered message handler. Returns the reply payload to send
/// back to `source`, or `None` to stay silent.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, body: &[u8], source: SocketAddr) -> Option<Vec<u8>>;
}

#[derive(Default)]
pub struct Registry {
    handlers: AHashMap<MessageType, Arc<dyn MessageHandler>>,
}

impl Registry {
    pub fn register(&mut self, kind: MessageType, handler: Arc<dyn MessageHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Peel the leading type tag and dispatch the remainder. Unknown tags
    /// and decode failures are dropped silently.
    pub fn dispatch(&self, datagram: &[u8], source: SocketAddr) -> Option<Vec<u8>> {
        let (kind, body) = split_tag(datagram).ok()?;
        let handler = self.handlers.get(&kind)?;
        handler.handle(body, source)
    }
}

pub struct HeartbeatHandler {
    cluster: Arc<Cluster>,
    remote: Arc<dyn RemoteCaller>,
    on_state_changed: Arc<dyn Fn() + Send + Sync>,
}

impl HeartbeatHandler {
    pub fn new(
        cluster: Arc<Cluster>,
        remote: Arc<dyn RemoteCaller>,
        on_state_changed: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        Self {
            cluster,
            remote,
            on_state_changed,
        }
    }
}

impl MessageHandler for HeartbeatHandler {
    fn handle(&self, body: &[u8], source: SocketAddr) -> Option<Vec<u8>> {
        let IpAddr::V4(source_ip) = source.ip() else {
            warn!("heartbeat received over IPv6, unsupported: {source}");
            return None;
        };

        let mut slice = body;
        let header = match Header::unpack(&mut slice) {
            Ok(header) => header,
            Err(e) => {
                debug!("dropping malformed heartbeat from {source}: {e}");
                return None;
            }
        };

        let service = HeartbeatService::new(&self.cluster, &*self.remote);
        service.on_heartbeat_request(&header, source_ip, &|| (self.on_state_changed)())
    }
}
