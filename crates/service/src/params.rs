//! Parameter source consumed by [`crate::cluster::Cluster::init`] — kept as
//! a trait so the cluster never reaches into global configuration state
//! itself.

use std::time::Duration;

use codec::NodeState;

pub trait ClusterParams: Send + Sync {
    fn port(&self) -> u16;

    fn heartbeat_interval(&self) -> Duration;

    fn desired_state(&self) -> NodeState;

    fn master_host(&self) -> Option<String>;

    /// `group@h1,h2,...`
    fn node_list(&self) -> String;

    /// `group@h1,h2,...`, empty if there is no replica group.
    fn replica_list(&self) -> String;

    /// `h1:h2:...` or comma-separated, empty if there are no ping hosts.
    fn ping_hosts(&self) -> String;

    fn hide_to_demote(&self) -> bool;
}
