use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use codec::Hostname;
use log::{trace, warn};
use service::remote::RemoteError;
use service::RemoteCaller;
use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::handler::Registry;

const RECV_BUFFER_SIZE: usize = 4096;

pub struct Transport {
    socket: Arc<UdpSocket>,
    port: u16,
}

impl Transport {
    pub async fn bind(port: u16) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        Ok(Self {
            socket: Arc::new(socket),
            port,
        })
    }

    /// Await the next datagram or a shutdown signal, whichever comes first.
    /// Dispatches through `registry` and replies to the sender when a
    /// handler produces a response. Runs until `shutdown` fires.
    pub async fn run(&self, registry: Arc<Registry>, mut shutdown: watch::Receiver<()>) {
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        loop {
            let (size, source) = tokio::select! {
                recv = self.socket.recv_from(&mut buf) => match recv {
                    Ok(pair) => pair,
                    Err(e) if e.kind() == ErrorKind::ConnectionReset => continue,
                    Err(e) => {
                        warn!("heartbeat transport receive failed: {e}");
                        continue;
                    }
                },
                _ = shutdown.changed() => {
                    trace!("heartbeat transport shutting down");
                    return;
                }
            };

            if size == 0 {
                continue;
            }

            if let Some(reply) = registry.dispatch(&buf[..size], source) {
                if let Err(e) = self.socket.try_send_to(&reply, source) {
                    if e.kind() != ErrorKind::ConnectionReset {
                        warn!("heartbeat reply to {source} failed: {e}");
                    }
                }
            }
        }
    }
}

impl RemoteCaller for Transport {
    fn remote_call(&self, dest: &Hostname, payload: Vec<u8>) -> Result<(), RemoteError> {
        let addr = dest
            .resolve()
            .map_err(|_| RemoteError::ResolveFailure(dest.as_str().to_string()))?;

        let target: SocketAddr = (addr, self.port).into();

        match self.socket.try_send_to(&payload, target) {
            Ok(_) => Ok(()),
            // UDP is unreliable by design; a full send buffer is equivalent
            // to a dropped datagram, not a hard failure.
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(RemoteError::SendFailure(e.to_string())),
        }
    }
}
