use std::fs::read_to_string;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => return Err(format!("unknown log level: {value}")),
        })
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match *self {
            Self::Error => log::Level::Error,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Log {
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Cluster {
    /// UDP port the heartbeat transport binds on.
    #[serde(default = "Cluster::port")]
    pub port: u16,
    ///
    /// How often this node sends a heartbeat request to every peer, and the
    /// window used by `is_heartbeat_received_from_all`.
    ///
    #[serde(default = "Cluster::heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    ///
    /// Desired startup role, unless this node is found in the replica list
    /// (which always forces `replica`).
    ///
    #[serde(default = "Cluster::state")]
    pub state: String,
    ///
    /// If set, seeds the `master` pointer at startup by hostname lookup in
    /// the node list.
    ///
    #[serde(default)]
    pub master_host: Option<String>,
    ///
    /// `group@host1,host2,...`
    ///
    pub node_list: String,
    ///
    /// `group@host1,host2,...`, empty if there is no replica group.
    ///
    #[serde(default)]
    pub replica_list: String,
    ///
    /// `host1:host2:...`, external reachability witnesses checked once at
    /// startup.
    ///
    #[serde(default)]
    pub ping_hosts: String,
    ///
    /// When set, inbound heartbeat requests are still validated and applied
    /// but never replied to - used to deliberately let peers demote this
    /// node without risking a reply-driven split-brain window.
    ///
    #[serde(default)]
    pub hide_to_demote: bool,
}

impl Cluster {
    fn port() -> u16 {
        54321
    }

    fn heartbeat_interval_ms() -> u64 {
        1000
    }

    fn state() -> String {
        "slave".to_string()
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub cluster: Cluster,
    #[serde(default)]
    pub log: Log,
}

impl Default for Cluster {
    fn default() -> Self {
        Self {
            port: Self::port(),
            heartbeat_interval_ms: Self::heartbeat_interval_ms(),
            state: Self::state(),
            master_host: None,
            node_list: String::new(),
            replica_list: String::new(),
            ping_hosts: String::new(),
            hide_to_demote: false,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    ///
    /// Specify the configuration file path
    ///
    /// Example: hb-cluster --config /etc/hb-cluster/config.json5
    ///
    #[arg(long, short)]
    config: String,
}

impl Config {
    ///
    /// Load command line parameters, then parse the configuration file they
    /// point at. A missing `--config` or a malformed file is a startup
    /// error, not a per-request one.
    ///
    pub fn load() -> Result<Self> {
        Ok(serde_json5::from_str::<Self>(&read_to_string(
            &Cli::parse().config,
        )?)?)
    }
}
