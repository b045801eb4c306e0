use std::sync::Arc;

use hb_cluster::config::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::load()?);

    simple_logger::init_with_level(config.log.level.as_level())?;

    if config.cluster.node_list.is_empty() {
        log::warn!("cluster.node-list is empty, nothing to do");
        return Ok(());
    }

    hb_cluster::startup(config).await
}
