use std::sync::Mutex as StdMutex;
use std::time::Duration;

use anyhow::Result;
use codec::{Hostname, NodeState};
use hb_cluster_service::{ClusterParams, Cluster, HeartbeatService, PingProbe, PingResult, RemoteCaller};

struct FileParams {
    node_list: String,
}

impl ClusterParams for FileParams {
    fn port(&self) -> u16 {
        54321
    }

    fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(500)
    }

    fn desired_state(&self) -> NodeState {
        NodeState::Slave
    }

    fn master_host(&self) -> Option<String> {
        None
    }

    fn node_list(&self) -> String {
        self.node_list.clone()
    }

    fn replica_list(&self) -> String {
        String::new()
    }

    fn ping_hosts(&self) -> String {
        String::new()
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

#[derive(Default)]
struct RecordingRemote {
    sent: StdMutex<Vec<(String, Vec<u8>)>>,
}

impl RemoteCaller for RecordingRemote {
    fn remote_call(
        &self,
        dest: &Hostname,
        payload: Vec<u8>,
    ) -> Result<(), hb_cluster_service::remote::RemoteError> {
        self.sent.lock().unwrap().push((dest.as_str().to_string(), payload));
        Ok(())
    }
}

#[test]
fn test_happy_heartbeat_round_trip_between_two_peers() -> Result<()> {
    let a = Cluster::new(Box::new(AlwaysUp));
    let b = Cluster::new(Box::new(AlwaysUp));

    let params = FileParams {
        node_list: "group-a@127.0.0.2,127.0.0.3".to_string(),
    };

    a.init(Hostname::new("127.0.0.2"), &params)?;
    b.init(Hostname::new("127.0.0.3"), &params)?;

    let remote = RecordingRemote::default();
    let service_a = HeartbeatService::new(&a, &remote);
    service_a.send_heartbeat_to_all();

    let sent = remote.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (dest, payload) = &sent[0];
    assert_eq!(dest, "127.0.0.3");

    let (kind, body) = codec::split_tag(payload)?;
    assert_eq!(kind, codec::MessageType::Heartbeat);

    let mut slice = body;
    let header = <codec::Header as codec::Unpack>::unpack(&mut slice)?;
    assert!(header.is_request);
    assert_eq!(header.orig_hostname.as_str(), "127.0.0.2");
    assert_eq!(header.dest_hostname.as_str(), "127.0.0.3");

    let service_b = HeartbeatService::new(&b, &remote);
    let noop = || {};
    let reply = service_b
        .on_heartbeat_request(&header, "127.0.0.2".parse().unwrap(), &noop)
        .expect("b should reply to a request");

    let (kind, body) = codec::split_tag(&reply)?;
    assert_eq!(kind, codec::MessageType::Heartbeat);
    let mut slice = body;
    let reply_header = <codec::Header as codec::Unpack>::unpack(&mut slice)?;
    assert!(!reply_header.is_request);
    assert_eq!(reply_header.orig_hostname.as_str(), "127.0.0.3");

    assert!(a.is_heartbeat_received_from_all(Duration::from_secs(3600)) == false);

    Ok(())
}

#[test]
fn test_reload_preserves_runtime_state_on_no_op_config() -> Result<()> {
    let cluster = Cluster::new(Box::new(AlwaysUp));
    let params = FileParams {
        node_list: "group-a@127.0.0.2,127.0.0.3".to_string(),
    };

    cluster.init(Hostname::new("127.0.0.2"), &params)?;

    let remote = RecordingRemote::default();
    let service = HeartbeatService::new(&cluster, &remote);
    let noop = || {};

    let header = codec::Header {
        is_request: true,
        state: NodeState::Slave,
        group_id: "group-a".to_string(),
        orig_hostname: Hostname::new("127.0.0.3"),
        dest_hostname: Hostname::new("127.0.0.2"),
    };

    service.on_heartbeat_request(&header, "127.0.0.3".parse().unwrap(), &noop);
    assert!(cluster.is_heartbeat_received_from_all(Duration::from_secs(3600)));

    cluster.reload(&params)?;
    assert!(cluster.is_heartbeat_received_from_all(Duration::from_secs(3600)));

    Ok(())
}
