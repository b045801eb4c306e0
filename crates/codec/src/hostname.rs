//! Canonical hostname identifier.
//!
//! Equality is the "canonical tail" rule: two hostnames match if one is a
//! strict prefix of the other and the longer one continues with `.` at that
//! point, or if they are byte-identical. This is intentionally not a true
//! equivalence relation (transitivity can fail across differing tails) —
//! that matches the protocol's own semantics and is not considered a defect.

use std::fmt;
use std::net::{Ipv4Addr, ToSocketAddrs};

use bytes::BytesMut;

use crate::wire::{Pack, Unpack};
use crate::Error;

// No `Eq` here: canonical-tail equality is not transitive, so it cannot
// honestly satisfy the `Eq` contract.
#[derive(Debug, Clone)]
pub struct Hostname(String);

impl Hostname {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve this hostname to an IPv4 address. Dotted-quad literals are
    /// parsed directly; anything else goes through the OS resolver.
    pub fn resolve(&self) -> Result<Ipv4Addr, Error> {
        if let Ok(addr) = self.0.parse::<Ipv4Addr>() {
            return Ok(addr);
        }

        (self.0.as_str(), 0u16)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| {
                addrs.find_map(|a| match a.ip() {
                    std::net::IpAddr::V4(v4) => Some(v4),
                    std::net::IpAddr::V6(_) => None,
                })
            })
            .ok_or_else(|| Error::ResolveFailure(self.0.clone()))
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Hostname {
    fn eq(&self, other: &Self) -> bool {
        canonical_tail_eq(&self.0, &other.0)
    }
}

impl PartialEq<str> for Hostname {
    fn eq(&self, other: &str) -> bool {
        canonical_tail_eq(&self.0, other)
    }
}

fn canonical_tail_eq(lhs: &str, rhs: &str) -> bool {
    let mut l = lhs.chars();
    let mut r = rhs.chars();

    loop {
        match (l.clone().next(), r.clone().next()) {
            (Some(a), Some(b)) if a == b => {
                l.next();
                r.next();
            }
            (None, Some(_)) => return r.next() == Some('.'),
            (Some(_), None) => return l.next() == Some('.'),
            (None, None) => return true,
            _ => return false,
        }
    }
}

impl Pack for Hostname {
    fn packed_size(&self) -> usize {
        self.0.packed_size()
    }

    fn pack(&self, bytes: &mut BytesMut) {
        self.0.pack(bytes);
    }
}

impl Unpack for Hostname {
    fn unpack(bytes: &mut &[u8]) -> Result<Self, Error> {
        Ok(Self(String::unpack(bytes)?))
    }
}

impl From<String> for Hostname {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Hostname {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::canonical_tail_eq;

    #[test]
    fn canonical_tail_equality_law() {
        assert!(canonical_tail_eq("a", "a"));
        assert!(canonical_tail_eq("a", "a.x"));
        assert!(canonical_tail_eq("a.x", "a"));
        assert!(canonical_tail_eq("a.x", "a.x"));

        assert!(!canonical_tail_eq("a", "b"));
        assert!(!canonical_tail_eq("a", "ax"));
        assert!(!canonical_tail_eq("a.x", "a.y"));
        assert!(!canonical_tail_eq("host-1", "host-1x"));
    }

    #[test]
    fn dotted_quad_resolves_without_dns() {
        let host = super::Hostname::new("127.0.0.1");
        assert_eq!(host.resolve().unwrap(), "127.0.0.1".parse().unwrap());
    }
}
