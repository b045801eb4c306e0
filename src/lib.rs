pub mod config;
pub mod handler;
pub mod params;
pub mod ping;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use codec::{Hostname, MessageType};
use log::info;
use service::{Cluster, HeartbeatService};
use tokio::sync::watch;

use crate::config::Config;
use crate::handler::{HeartbeatHandler, Registry};
use crate::params::ConfigParams;
use crate::ping::TcpPingProbe;
use crate::transport::Transport;

fn local_hostname() -> anyhow::Result<Hostname> {
    Ok(Hostname::new(gethostname::gethostname().to_string_lossy().into_owned()))
}

/// Bring up the cluster: bind the transport, run `init`, register the
/// heartbeat handler, and drive the periodic send/cleanup loop until a
/// shutdown signal arrives.
pub async fn startup(config: Arc<Config>) -> anyhow::Result<()> {
    let hostname = local_hostname()?;

    let ping_probe = TcpPingProbe {
        port: config.cluster.port,
        timeout: Duration::from_millis(500),
    };

    let cluster = Arc::new(Cluster::new(Box::new(ping_probe)));
    let params = ConfigParams(config.clone());
    cluster.init(hostname, &params)?;

    let transport = Arc::new(Transport::bind(config.cluster.port).await?);
    let remote: Arc<dyn service::RemoteCaller> = transport.clone();

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let on_state_changed: Arc<dyn Fn() + Send + Sync> = Arc::new(|| {
        info!("peer master state changed, recompute scores immediately");
    });

    let mut registry = Registry::default();
    registry.register(
        MessageType::Heartbeat,
        Arc::new(HeartbeatHandler::new(
            cluster.clone(),
            remote.clone(),
            on_state_changed,
        )),
    );
    let registry = Arc::new(registry);

    let receive_task = {
        let transport = transport.clone();
        tokio::spawn(async move { transport.run(registry, shutdown_rx).await })
    };

    let periodic_task = {
        let cluster = cluster.clone();
        let remote = remote.clone();
        let interval = params.heartbeat_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                HeartbeatService::new(&cluster, &*remote).send_heartbeat_to_all();
                cluster.cleanup_ui_nodes();
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    periodic_task.abort();
    cluster.stop();
    let _ = shutdown_tx.send(());
    let _ = receive_task.await;

    Ok(())
}
