//! Outbound transport, injected so the protocol layer never owns a socket
//! directly.

use codec::Hostname;

pub trait RemoteCaller: Send + Sync {
    /// Resolve `dest` and send `payload` to it. Errors are transport
    /// failures (resolution, socket send); the caller logs and drops them,
    /// matching the protocol's best-effort delivery contract.
    fn remote_call(&self, dest: &Hostname, payload: Vec<u8>) -> Result<(), RemoteError>;
}

#[derive(Debug)]
pub enum RemoteError {
    ResolveFailure(String),
    SendFailure(String),
}

impl std::error::Error for RemoteError {}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResolveFailure(host) => write!(f, "failed to resolve host `{host}`"),
            Self::SendFailure(reason) => write!(f, "send failed: {reason}"),
        }
    }
}
