use std::sync::Arc;
use std::time::Duration;

use codec::NodeState;
use service::ClusterParams;

use crate::config::Config;

/// Adapts the on-disk [`Config`] to the collaborator interface the cluster
/// actually depends on, so `service` never parses a config file itself.
pub struct ConfigParams(pub Arc<Config>);

impl ClusterParams for ConfigParams {
    fn port(&self) -> u16 {
        self.0.cluster.port
    }

    fn heartbeat_interval(&self) -> Duration {
        self.0.cluster.heartbeat_interval()
    }

    fn desired_state(&self) -> NodeState {
        self.0.cluster.state.parse().unwrap_or(NodeState::Slave)
    }

    fn master_host(&self) -> Option<String> {
        self.0.cluster.master_host.clone()
    }

    fn node_list(&self) -> String {
        self.0.cluster.node_list.clone()
    }

    fn replica_list(&self) -> String {
        self.0.cluster.replica_list.clone()
    }

    fn ping_hosts(&self) -> String {
        self.0.cluster.ping_hosts.clone()
    }

    fn hide_to_demote(&self) -> bool {
        self.0.cluster.hide_to_demote
    }
}
