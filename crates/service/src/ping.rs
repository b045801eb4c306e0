//! Optional external reachability witnesses.

use codec::Hostname;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingResult {
    Unknown,
    Success,
    UselessHost,
    SysErr,
    Failure,
}

#[derive(Debug, Clone)]
pub struct PingHost {
    pub hostname: Hostname,
    pub result: PingResult,
}

impl PingHost {
    pub fn new(hostname: Hostname) -> Self {
        Self {
            hostname,
            result: PingResult::Unknown,
        }
    }
}

/// Injected reachability probe, so the cluster never shells out to `ping`
/// directly and tests can stub arbitrary outcomes.
pub trait PingProbe: Send + Sync {
    fn check(&self, hostname: &Hostname) -> PingResult;
}
