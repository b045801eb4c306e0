use std::net::TcpStream;
use std::time::Duration;

use codec::Hostname;
use service::{PingProbe, PingResult};

/// Reachability probe used by cluster init. A raw ICMP echo needs a raw
/// socket (and usually root), so this probes the configured port instead —
/// "can we open a connection at all" is the question that actually matters
/// for isolation detection here.
pub struct TcpPingProbe {
    pub port: u16,
    pub timeout: Duration,
}

impl PingProbe for TcpPingProbe {
    fn check(&self, hostname: &Hostname) -> PingResult {
        let addr = match hostname.resolve() {
            Ok(addr) => addr,
            Err(_) => return PingResult::SysErr,
        };

        match TcpStream::connect_timeout(&(addr, self.port).into(), self.timeout) {
            Ok(_) => PingResult::Success,
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                // Host is up and routable, it just isn't listening on our port.
                PingResult::Success
            }
            Err(_) => PingResult::Failure,
        }
    }
}
