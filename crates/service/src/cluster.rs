//! Cluster membership and the inbound-heartbeat validation policy.
//!
//! All mutable state lives behind a single [`parking_lot::Mutex`]; callers
//! never see partial updates. `myself` and `master` are indices into
//! `nodes`, not pointers, so a list mutation can never leave either
//! dangling — they are re-bound by scanning whenever the list changes.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use codec::{Hostname, NodeState};
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::node::{NodeEntry, HIGHEST_PRIORITY, REPLICA_PRIORITY};
use crate::params::ClusterParams;
use crate::ping::{PingHost, PingProbe, PingResult};
use crate::ui_node::{UiNodeCategory, UiNodeKey, UiNodeTable};
use crate::UI_NODE_CLEANUP_TIME;

#[derive(Debug)]
pub enum ClusterError {
    MissingSelf,
    EmptyNodeList,
    ReplicaGroupMismatch,
    NoReachablePingHost,
    ReloadWouldDropMaster,
}

impl std::error::Error for ClusterError {}

impl std::fmt::Display for ClusterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSelf => write!(f, "local hostname not found in configured node list"),
            Self::EmptyNodeList => write!(f, "configured node list is empty"),
            Self::ReplicaGroupMismatch => write!(f, "replica list group id differs from node list group id"),
            Self::NoReachablePingHost => write!(f, "no configured ping host is reachable"),
            Self::ReloadWouldDropMaster => write!(f, "reload would drop the current master from the node list"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Valid,
    Unidentified,
    GroupMismatch,
    IpMismatch,
    Unresolvable,
}

/// Everything the cluster mutates while running, grouped so `reload` can
/// deep-copy it wholesale and restore it field-by-field on failure instead
/// of relying on whole-struct assignment over a lock.
struct State {
    hostname: Hostname,
    group_id: String,
    state: NodeState,
    nodes: Vec<NodeEntry>,
    myself: Option<usize>,
    master: Option<usize>,
    ui_nodes: UiNodeTable,
    ping_hosts: Vec<PingHost>,
    shutdown: bool,
    hide_to_demote: bool,
    is_isolated: bool,
}

impl Clone for State {
    fn clone(&self) -> Self {
        Self {
            hostname: self.hostname.clone(),
            group_id: self.group_id.clone(),
            state: self.state,
            nodes: self.nodes.clone(),
            myself: self.myself,
            master: self.master,
            ui_nodes: self.ui_nodes.clone(),
            ping_hosts: self.ping_hosts.clone(),
            shutdown: self.shutdown,
            hide_to_demote: self.hide_to_demote,
            is_isolated: self.is_isolated,
        }
    }
}

pub struct Cluster {
    state: Mutex<State>,
    ping_probe: Box<dyn PingProbe>,
}

fn split_node_list(raw: &str) -> (String, Vec<String>) {
    let tokens: Vec<&str> = raw
        .split(|c| c == '@' || c == ':' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if tokens.len() < 2 {
        return (String::new(), Vec::new());
    }

    (tokens[0].to_string(), tokens[1..].iter().map(|s| s.to_string()).collect())
}

fn split_ping_hosts(raw: &str) -> Vec<String> {
    raw.split(|c| c == ':' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Cluster {
    pub fn new(ping_probe: Box<dyn PingProbe>) -> Self {
        Self {
            state: Mutex::new(State {
                hostname: Hostname::new(""),
                group_id: String::new(),
                state: NodeState::Unknown,
                nodes: Vec::new(),
                myself: None,
                master: None,
                ui_nodes: UiNodeTable::default(),
                ping_hosts: Vec::new(),
                shutdown: false,
                hide_to_demote: false,
                is_isolated: false,
            }),
            ping_probe,
        }
    }

    /// Populate membership from `params` and the OS-reported local hostname.
    pub fn init(&self, local_hostname: Hostname, params: &dyn ClusterParams) -> Result<(), ClusterError> {
        let mut guard = self.state.lock();
        Self::init_locked(&mut guard, local_hostname, params, &*self.ping_probe)
    }

    fn init_locked(
        state: &mut State,
        local_hostname: Hostname,
        params: &dyn ClusterParams,
        ping_probe: &dyn PingProbe,
    ) -> Result<(), ClusterError> {
        state.hostname = local_hostname;
        state.hide_to_demote = params.hide_to_demote();
        state.shutdown = false;

        let (group_id, hostnames) = split_node_list(&params.node_list());
        state.group_id = group_id;

        if !hostnames.is_empty() {
            let mut priority = HIGHEST_PRIORITY;
            for raw_host in &hostnames {
                let host = Self::substitute_localhost(raw_host, &state.hostname);
                let idx = Self::insert_host_node(&mut state.nodes, host.clone(), priority);
                if host == state.hostname {
                    state.myself = Some(idx);
                }
                priority += 1;
            }
        }

        let (replica_group, replica_hosts) = split_node_list(&params.replica_list());
        if !replica_hosts.is_empty() {
            if replica_group != state.group_id {
                return Err(ClusterError::ReplicaGroupMismatch);
            }

            for raw_host in &replica_hosts {
                let host = Self::substitute_localhost(raw_host, &state.hostname);
                let idx = Self::insert_host_node(&mut state.nodes, host.clone(), REPLICA_PRIORITY);
                if host == state.hostname {
                    state.myself = Some(idx);
                    state.state = NodeState::Replica;
                }
            }
        }

        if state.state != NodeState::Replica {
            state.state = params.desired_state();
        }

        if state.myself.is_none() {
            return Err(ClusterError::MissingSelf);
        }

        if state.nodes.is_empty() {
            return Err(ClusterError::EmptyNodeList);
        }

        if let Some(master_host) = params.master_host() {
            let master_host = Hostname::new(master_host);
            state.master = state
                .nodes
                .iter()
                .position(|n| n.hostname == master_host);
        }

        let ping_hostnames = split_ping_hosts(&params.ping_hosts());
        state.ping_hosts = ping_hostnames
            .into_iter()
            .map(|h| PingHost::new(Hostname::new(h)))
            .collect();

        if !state.ping_hosts.is_empty() {
            let mut any_reachable = false;
            for ping in &mut state.ping_hosts {
                ping.result = ping_probe.check(&ping.hostname);
                if ping.result == PingResult::Success {
                    any_reachable = true;
                }
            }

            if !any_reachable {
                return Err(ClusterError::NoReachablePingHost);
            }
        }

        info!(
            "cluster initialized: hostname={}, group={}, nodes={}",
            state.hostname,
            state.group_id,
            state.nodes.len()
        );

        Ok(())
    }

    fn substitute_localhost(raw: &str, local_hostname: &Hostname) -> Hostname {
        if raw == "localhost" {
            local_hostname.clone()
        } else {
            Hostname::new(raw)
        }
    }

    fn insert_host_node(nodes: &mut Vec<NodeEntry>, hostname: Hostname, priority: u16) -> usize {
        if let Some(idx) = nodes.iter().position(|n| n.hostname == hostname) {
            return idx;
        }

        nodes.push(NodeEntry::new(hostname, priority));
        nodes.len() - 1
    }

    /// Rebuild membership from `params`, preserving per-node runtime fields
    /// across the rebuild and rolling back entirely on failure.
    pub fn reload(&self, params: &dyn ClusterParams) -> Result<(), ClusterError> {
        let mut guard = self.state.lock();
        let backup = guard.clone();

        let local_hostname = guard.hostname.clone();
        guard.nodes.clear();
        guard.myself = None;
        guard.ping_hosts.clear();

        let master_hostname = backup.master.map(|i| backup.nodes[i].hostname.clone());

        if let Err(e) = Self::init_locked(&mut guard, local_hostname, params, &*self.ping_probe) {
            *guard = backup;
            return Err(e);
        }

        if let Some(master_hostname) = &master_hostname {
            match guard.nodes.iter().position(|n| &n.hostname == master_hostname) {
                Some(idx) => guard.master = Some(idx),
                None => {
                    *guard = backup;
                    return Err(ClusterError::ReloadWouldDropMaster);
                }
            }
        }

        for old_node in &backup.nodes {
            if let Some(new_node) = guard.nodes.iter_mut().find(|n| n.hostname == old_node.hostname) {
                new_node.state = old_node.state;
                new_node.score = old_node.score;
                new_node.heartbeat_gap = old_node.heartbeat_gap;
                new_node.last_heard = old_node.last_heard;
            }
        }

        info!("cluster reload succeeded");
        Ok(())
    }

    pub fn stop(&self) {
        let mut guard = self.state.lock();
        guard.myself = None;
        guard.master = None;
        guard.shutdown = true;
        guard.state = NodeState::Unknown;
        guard.nodes.clear();
        guard.ui_nodes.clear();
        info!("cluster stopped");
    }

    pub fn hostname(&self) -> Hostname {
        self.state.lock().hostname.clone()
    }

    pub fn group_id(&self) -> String {
        self.state.lock().group_id.clone()
    }

    pub fn node_state(&self) -> NodeState {
        self.state.lock().state
    }

    pub fn is_isolated(&self) -> bool {
        self.state.lock().is_isolated
    }

    pub fn set_isolated(&self, isolated: bool) {
        let mut guard = self.state.lock();
        if guard.is_isolated != isolated {
            warn!("cluster isolation state changed: isolated={isolated}");
        }
        guard.is_isolated = isolated;
    }

    pub fn myself_hostname(&self) -> Option<Hostname> {
        let guard = self.state.lock();
        guard.myself.map(|i| guard.nodes[i].hostname.clone())
    }

    fn classify(state: &State, orig_host: &Hostname, orig_group: &str, source_ip: Ipv4Addr) -> Category {
        let found = state
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != state.myself)
            .any(|(_, n)| &n.hostname == orig_host);

        if !found {
            return Category::Unidentified;
        }

        if orig_group != state.group_id {
            return Category::GroupMismatch;
        }

        match orig_host.resolve() {
            Err(_) => Category::Unresolvable,
            Ok(resolved) if resolved != source_ip => Category::IpMismatch,
            Ok(_) => Category::Valid,
        }
    }

    /// Apply an inbound heartbeat header. Returns `true` if a reply should
    /// be sent (the request bit was set and we are not hiding to demote).
    pub fn on_heartbeat(
        &self,
        is_request: bool,
        peer_state: NodeState,
        group_id: &str,
        orig_hostname: &Hostname,
        dest_hostname: &Hostname,
        source_ip: Ipv4Addr,
        on_state_changed: &dyn Fn(),
    ) -> bool {
        let mut guard = self.state.lock();

        if guard.shutdown {
            return false;
        }

        if &guard.hostname != dest_hostname {
            debug!("heartbeat misaddressed: dest={dest_hostname}, self={}", guard.hostname);
            return false;
        }

        let category = Self::classify(&guard, orig_hostname, group_id, source_ip);

        if category != Category::Valid {
            let key = UiNodeKey {
                hostname: orig_hostname.as_str().to_string(),
                group_id: group_id.to_string(),
                source_ip,
            };

            let ui_category = match category {
                Category::Unidentified => UiNodeCategory::Unidentified,
                Category::GroupMismatch => UiNodeCategory::GroupMismatch,
                Category::IpMismatch => UiNodeCategory::IpMismatch,
                Category::Unresolvable => UiNodeCategory::Unresolvable,
                Category::Valid => unreachable!(),
            };

            let was_new = guard.ui_nodes.get(&key).is_none();
            guard.ui_nodes.upsert(key, ui_category, Instant::now());

            if was_new {
                debug!(
                    "receive heartbeat from unidentified host: host={orig_hostname}, group={group_id}, category={ui_category:?}"
                );
            }

            return false;
        }

        if group_id != guard.group_id {
            return false;
        }

        let idx = guard
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != guard.myself)
            .find(|(_, n)| &n.hostname == orig_hostname)
            .map(|(i, _)| i);

        let Some(idx) = idx else {
            return is_request && !guard.hide_to_demote;
        };

        let state_changed = guard.nodes[idx].state == NodeState::Master && guard.nodes[idx].state != peer_state;

        guard.nodes[idx].state = peer_state;
        guard.nodes[idx].heartbeat_gap = guard.nodes[idx].heartbeat_gap.saturating_sub(1);
        guard.nodes[idx].last_heard = Some(Instant::now());

        let should_reply = is_request && !guard.hide_to_demote;
        drop(guard);

        if state_changed {
            on_state_changed();
        }

        should_reply
    }

    /// Hostnames of every node other than self, for the send-to-all loop.
    pub fn peer_hostnames(&self) -> Vec<Hostname> {
        let guard = self.state.lock();
        guard
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != guard.myself)
            .map(|(_, n)| n.hostname.clone())
            .collect()
    }

    pub fn increment_heartbeat_gap(&self, hostname: &Hostname) {
        let mut guard = self.state.lock();
        if let Some(node) = guard.nodes.iter_mut().find(|n| &n.hostname == hostname) {
            node.heartbeat_gap += 1;
        }
    }

    pub fn is_heartbeat_received_from_all(&self, interval: Duration) -> bool {
        let guard = self.state.lock();
        let now = Instant::now();
        guard
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != guard.myself)
            .all(|(_, n)| n.received_within(now, interval))
    }

    pub fn cleanup_ui_nodes(&self) {
        let mut guard = self.state.lock();
        guard.ui_nodes.cleanup(Instant::now(), UI_NODE_CLEANUP_TIME);
    }

    pub fn ui_node_count(&self) -> usize {
        self.state.lock().ui_nodes.len()
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    struct FakeParams {
        node_list: String,
        replica_list: String,
        ping_hosts: String,
        master_host: Option<String>,
    }

    impl ClusterParams for FakeParams {
        fn port(&self) -> u16 {
            12345
        }

        fn heartbeat_interval(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn desired_state(&self) -> NodeState {
            NodeState::Slave
        }

        fn master_host(&self) -> Option<String> {
            self.master_host.clone()
        }

        fn node_list(&self) -> String {
            self.node_list.clone()
        }

        fn replica_list(&self) -> String {
            self.replica_list.clone()
        }

        fn ping_hosts(&self) -> String {
            self.ping_hosts.clone()
        }

        fn hide_to_demote(&self) -> bool {
            false
        }
    }

    struct AlwaysUp;
    impl PingProbe for AlwaysUp {
        fn check(&self, _hostname: &Hostname) -> PingResult {
            PingResult::Success
        }
    }

    // Node hostnames are dotted-quad literals so `Hostname::resolve` never
    // touches a real DNS resolver inside a test.
    fn params() -> FakeParams {
        FakeParams {
            node_list: "group-a@127.0.0.2,127.0.0.3,127.0.0.4".to_string(),
            replica_list: String::new(),
            ping_hosts: String::new(),
            master_host: None,
        }
    }

    #[test]
    fn init_finds_self_and_assigns_priority() {
        let cluster = Cluster::new(Box::new(AlwaysUp));
        cluster.init(Hostname::new("127.0.0.2"), &params()).unwrap();
        assert_eq!(cluster.node_count(), 3);
        assert_eq!(cluster.group_id(), "group-a");
    }

    #[test]
    fn init_fails_when_self_missing() {
        let cluster = Cluster::new(Box::new(AlwaysUp));
        let err = cluster.init(Hostname::new("10.0.0.9"), &params()).unwrap_err();
        assert!(matches!(err, ClusterError::MissingSelf));
    }

    #[test]
    fn valid_heartbeat_updates_peer_state_and_gap() {
        let cluster = Cluster::new(Box::new(AlwaysUp));
        cluster.init(Hostname::new("127.0.0.2"), &params()).unwrap();
        cluster.increment_heartbeat_gap(&Hostname::new("127.0.0.3"));

        let noop = || {};
        let reply = cluster.on_heartbeat(
            true,
            NodeState::Slave,
            "group-a",
            &Hostname::new("127.0.0.3"),
            &Hostname::new("127.0.0.2"),
            "127.0.0.3".parse().unwrap(),
            &noop,
        );

        assert!(reply);
    }

    #[test]
    fn misaddressed_heartbeat_is_dropped_silently() {
        let cluster = Cluster::new(Box::new(AlwaysUp));
        cluster.init(Hostname::new("127.0.0.2"), &params()).unwrap();

        let noop = || {};
        let reply = cluster.on_heartbeat(
            true,
            NodeState::Slave,
            "group-a",
            &Hostname::new("127.0.0.3"),
            &Hostname::new("10.0.0.9"),
            "127.0.0.3".parse().unwrap(),
            &noop,
        );

        assert!(!reply);
    }

    #[test]
    fn wrong_group_records_unidentified_entry_without_node_update() {
        let cluster = Cluster::new(Box::new(AlwaysUp));
        cluster.init(Hostname::new("127.0.0.2"), &params()).unwrap();

        let noop = || {};
        let reply = cluster.on_heartbeat(
            true,
            NodeState::Slave,
            "other-group",
            &Hostname::new("127.0.0.3"),
            &Hostname::new("127.0.0.2"),
            "127.0.0.3".parse().unwrap(),
            &noop,
        );

        assert!(!reply);
        assert_eq!(cluster.ui_node_count(), 1);
    }

    #[test]
    fn wrong_source_ip_records_ip_mismatch_entry() {
        let cluster = Cluster::new(Box::new(AlwaysUp));
        cluster.init(Hostname::new("127.0.0.2"), &params()).unwrap();

        let noop = || {};
        let reply = cluster.on_heartbeat(
            true,
            NodeState::Slave,
            "group-a",
            &Hostname::new("127.0.0.3"),
            &Hostname::new("127.0.0.2"),
            "10.0.0.9".parse().unwrap(),
            &noop,
        );

        assert!(!reply);
        assert_eq!(cluster.ui_node_count(), 1);
    }

    #[test]
    fn reload_rolls_back_when_master_would_be_dropped() {
        let cluster = Cluster::new(Box::new(AlwaysUp));
        let mut p = params();
        p.master_host = Some("127.0.0.4".to_string());
        cluster.init(Hostname::new("127.0.0.2"), &p).unwrap();

        let shrunk = FakeParams {
            node_list: "group-a@127.0.0.2,127.0.0.3".to_string(),
            ..params()
        };

        let err = cluster.reload(&shrunk).unwrap_err();
        assert!(matches!(err, ClusterError::ReloadWouldDropMaster));
        assert_eq!(cluster.node_count(), 3);
    }

    #[test]
    fn recompute_signal_fires_only_when_master_state_changes() {
        let cluster = Cluster::new(Box::new(AlwaysUp));
        cluster.init(Hostname::new("127.0.0.2"), &params()).unwrap();

        let noop = || {};
        cluster.on_heartbeat(
            true,
            NodeState::Master,
            "group-a",
            &Hostname::new("127.0.0.3"),
            &Hostname::new("127.0.0.2"),
            "127.0.0.3".parse().unwrap(),
            &noop,
        );

        let fired = Arc::new(StdMutex::new(false));
        let fired2 = fired.clone();
        let signal = move || {
            *fired2.lock().unwrap() = true;
        };

        cluster.on_heartbeat(
            true,
            NodeState::Slave,
            "group-a",
            &Hostname::new("127.0.0.3"),
            &Hostname::new("127.0.0.2"),
            "127.0.0.3".parse().unwrap(),
            &signal,
        );

        assert!(*fired.lock().unwrap());
    }
}
