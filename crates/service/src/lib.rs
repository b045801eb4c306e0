//! Cluster membership, validation policy and heartbeat protocol logic.
//!
//! The [`Cluster`] owns every node and unidentified-node record behind a
//! single lock. The [`HeartbeatService`] is the protocol-facing layer that
//! builds outbound requests and applies inbound ones; it is generic over the
//! collaborators described in [`params`] and [`remote`] so callers can
//! inject their own parameter source, ping probe and transport instead of
//! reaching for process-global state.

pub mod cluster;
pub mod heartbeat;
pub mod node;
pub mod params;
pub mod ping;
pub mod remote;
pub mod ui_node;

pub use cluster::{Category, Cluster, ClusterError};
pub use heartbeat::HeartbeatService;
pub use node::{NodeEntry, HIGHEST_PRIORITY, REPLICA_PRIORITY};
pub use params::ClusterParams;
pub use ping::{PingHost, PingProbe, PingResult};
pub use remote::RemoteCaller;
pub use ui_node::{UiNodeCategory, UiNodeEntry};

/// How long an unidentified-node entry may sit idle before [`Cluster::cleanup_ui_nodes`]
/// removes it.
pub const UI_NODE_CLEANUP_TIME: std::time::Duration = std::time::Duration::from_secs(3600);

/// How often a rejected peer's category is expected to be re-logged by a caller.
pub const UI_NODE_CACHE_TIME: std::time::Duration = std::time::Duration::from_secs(60);

/// Upper bound on the unidentified-node table; the oldest entry is evicted
/// to admit a new one once full.
pub const UI_NODE_TABLE_CAPACITY: usize = 1024;
