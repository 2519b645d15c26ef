//! Command-line surface for the soak harness.

use std::time::Duration;

use clap::Parser;

use crate::config::{
    ConfigError, GroupConfig, DEFAULT_MEMBER_COUNT, DEFAULT_MEMBER_PREFIX, DEFAULT_NAMESPACE,
};
use crate::monitor::{MonitorConfig, DEFAULT_PARTICIPANT_CEILING};

/// Keeps a large set of leadership candidacies open over one managed
/// connection and flags clusters reporting more participants than the
/// steady-state ceiling, the signature of an ephemeral registration the
/// coordination service failed to reap.
#[derive(Debug, Parser)]
#[command(name = "electra", version)]
pub struct Opts {
    /// The unique node identifier
    #[arg(short = 'i', long = "id")]
    pub node_id: String,

    /// The coordination service connection string
    #[arg(short = 's', long)]
    pub servers: String,

    /// The namespace for the managed connection
    #[arg(short = 'n', long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// The connection retry interval in milliseconds
    #[arg(short = 'r', long = "retry-ms", default_value_t = 30_000)]
    pub retry_ms: u64,

    /// The participant poll interval in milliseconds
    #[arg(short = 't', long = "test-ms", default_value_t = 30_000)]
    pub test_ms: u64,

    /// The member prefix
    #[arg(short = 'p', long, default_value = DEFAULT_MEMBER_PREFIX)]
    pub prefix: String,

    /// The member count
    #[arg(short = 'c', long, default_value_t = DEFAULT_MEMBER_COUNT)]
    pub count: usize,

    /// The expected steady-state participant ceiling
    #[arg(long, default_value_t = DEFAULT_PARTICIPANT_CEILING)]
    pub ceiling: i64,
}

impl Opts {
    pub fn group_config(&self) -> Result<GroupConfig, ConfigError> {
        GroupConfig::builder(self.node_id.as_str(), self.servers.as_str())
            .namespace(self.namespace.as_str())
            .member_prefix(self.prefix.as_str())
            .member_count(self.count)
            .retry_interval(Duration::from_millis(self.retry_ms))
            .build()
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(self.test_ms),
            participant_ceiling: self.ceiling,
        }
    }
}
