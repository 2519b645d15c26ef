//! Validated configuration for a membership group.

use std::time::Duration;

use thiserror::Error;

use crate::client::{ConnectionSettings, RetryPolicy};

pub const DEFAULT_NAMESPACE: &str = "LeaderElectionTest";
pub const DEFAULT_MEMBER_PREFIX: &str = "Member";
pub const DEFAULT_MEMBER_COUNT: usize = 100;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Errors raised while validating a group configuration. All of them are
/// fatal at construction time; the process never starts on bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("the node id cannot be empty")]
    EmptyNodeId,
    #[error("the servers cannot be empty")]
    EmptyServers,
    #[error("the namespace cannot be empty")]
    EmptyNamespace,
    #[error("the member prefix cannot be empty")]
    EmptyMemberPrefix,
    #[error("the member count ({0}) must be a positive number")]
    InvalidMemberCount(usize),
    #[error("the retry interval must be a positive duration")]
    InvalidRetryInterval,
    #[error("the heartbeat interval must be a positive duration")]
    InvalidHeartbeatInterval,
}

/// Validated settings for one [`MembershipGroup`](crate::MembershipGroup).
///
/// Construction goes through [`GroupConfig::builder`]; a value of this
/// type is proof the settings passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConfig {
    node_id: String,
    servers: String,
    namespace: String,
    member_prefix: String,
    member_count: usize,
    retry_interval: Duration,
    heartbeat_interval: Duration,
}

impl GroupConfig {
    /// Starts a builder from the two required settings.
    pub fn builder(node_id: impl Into<String>, servers: impl Into<String>) -> GroupConfigBuilder {
        GroupConfigBuilder {
            node_id: node_id.into(),
            servers: servers.into(),
            namespace: None,
            member_prefix: None,
            member_count: None,
            retry_interval: None,
            heartbeat_interval: None,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn servers(&self) -> &str {
        &self.servers
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn member_prefix(&self) -> &str {
        &self.member_prefix
    }

    pub fn member_count(&self) -> usize {
        self.member_count
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Settings handed to the [`Connector`](crate::client::Connector).
    /// The connection retries indefinitely at the configured interval;
    /// the harness runs unattended and the connection never gives up.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            servers: self.servers.clone(),
            namespace: self.namespace.clone(),
            retry: RetryPolicy::Forever {
                interval: self.retry_interval,
            },
        }
    }
}

/// Builder with optional overrides for the defaulted settings.
#[derive(Debug, Clone)]
pub struct GroupConfigBuilder {
    node_id: String,
    servers: String,
    namespace: Option<String>,
    member_prefix: Option<String>,
    member_count: Option<usize>,
    retry_interval: Option<Duration>,
    heartbeat_interval: Option<Duration>,
}

impl GroupConfigBuilder {
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn member_prefix(mut self, member_prefix: impl Into<String>) -> Self {
        self.member_prefix = Some(member_prefix.into());
        self
    }

    pub fn member_count(mut self, member_count: usize) -> Self {
        self.member_count = Some(member_count);
        self
    }

    pub fn retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = Some(retry_interval);
        self
    }

    pub fn heartbeat_interval(mut self, heartbeat_interval: Duration) -> Self {
        self.heartbeat_interval = Some(heartbeat_interval);
        self
    }

    /// Validates every setting eagerly and fails fast on the first bad one.
    pub fn build(self) -> Result<GroupConfig, ConfigError> {
        let node_id = self.node_id.trim().to_string();
        if node_id.is_empty() {
            return Err(ConfigError::EmptyNodeId);
        }
        let servers = self.servers.trim().to_string();
        if servers.is_empty() {
            return Err(ConfigError::EmptyServers);
        }
        let namespace = self
            .namespace
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
            .trim()
            .to_string();
        if namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        let member_prefix = self
            .member_prefix
            .unwrap_or_else(|| DEFAULT_MEMBER_PREFIX.to_string())
            .trim()
            .to_string();
        if member_prefix.is_empty() {
            return Err(ConfigError::EmptyMemberPrefix);
        }
        let member_count = self.member_count.unwrap_or(DEFAULT_MEMBER_COUNT);
        if member_count < 1 {
            return Err(ConfigError::InvalidMemberCount(member_count));
        }
        let retry_interval = self.retry_interval.unwrap_or(DEFAULT_RETRY_INTERVAL);
        if retry_interval.is_zero() {
            return Err(ConfigError::InvalidRetryInterval);
        }
        let heartbeat_interval = self
            .heartbeat_interval
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL);
        if heartbeat_interval.is_zero() {
            return Err(ConfigError::InvalidHeartbeatInterval);
        }
        Ok(GroupConfig {
            node_id,
            servers,
            namespace,
            member_prefix,
            member_count,
            retry_interval,
            heartbeat_interval,
        })
    }
}
