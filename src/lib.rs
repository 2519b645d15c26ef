//! Soak harness for leader-election coordination: many concurrent
//! candidacies over one managed connection, with an anomaly monitor that
//! flags clusters reporting more participants than should exist.

pub mod app;
pub mod client;
pub mod config;
pub mod membership;
pub mod monitor;
pub mod opts;
pub mod shutdown;
pub mod testkit;

pub use client::{
    CandidacyHandle, ClientError, ConnectionSettings, Connector, CoordinationClient,
    LeadershipHandler, RetryPolicy,
};
pub use config::{
    ConfigError, GroupConfig, GroupConfigBuilder, DEFAULT_HEARTBEAT_INTERVAL,
    DEFAULT_MEMBER_COUNT, DEFAULT_MEMBER_PREFIX, DEFAULT_NAMESPACE, DEFAULT_RETRY_INTERVAL,
};
pub use membership::{
    CandidacySession, GroupError, MembershipGroup, SessionError, PARTICIPANT_COUNT_UNAVAILABLE,
};
pub use monitor::{
    AnomalyLog, AnomalyMonitor, AnomalyReport, MonitorConfig, MonitorHandle, PollSample,
    DEFAULT_PARTICIPANT_CEILING, DEFAULT_POLL_INTERVAL,
};
pub use opts::Opts;
pub use shutdown::ShutdownSignal;
pub use testkit::LoopbackCoordinator;
