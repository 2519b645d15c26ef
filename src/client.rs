//! Seam to the external coordination service.
//!
//! The harness consumes exactly four primitives from whatever service it
//! runs against: build a managed connection, register a leadership
//! candidacy with an election callback, query a cluster's candidate list,
//! and release a registration. Everything wire-level lives behind these
//! traits; reconnection and retry belong to the implementation, driven by
//! the [`RetryPolicy`] it was built with.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Callback invoked by the coordination client, on a thread the client
/// owns, each time the registered identity is elected leader. Returning
/// from the callback relinquishes leadership; while the registration is
/// live the client re-queues the identity as a candidate automatically.
pub type LeadershipHandler = Arc<dyn Fn() + Send + Sync>;

/// Retry behaviour for the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry at a fixed interval without giving up. The default: the
    /// harness runs unattended soak tests and must outlive service
    /// outages.
    Forever { interval: Duration },
    /// Retry at a fixed interval up to a bounded number of attempts.
    Limited {
        interval: Duration,
        max_attempts: usize,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Forever {
            interval: Duration::from_secs(30),
        }
    }
}

/// Everything a connector needs to build one managed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub servers: String,
    pub namespace: String,
    pub retry: RetryPolicy,
}

/// Builds a managed connection to a concrete coordination service.
pub trait Connector {
    fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn CoordinationClient>, ClientError>;
}

/// Managed, auto-reconnecting connection to the coordination service.
pub trait CoordinationClient: Send + Sync {
    /// Opens the connection. Expected to be called once, before any
    /// registration is submitted.
    fn start(&self) -> Result<(), ClientError>;

    /// Submits `candidate_id` as a leadership candidate for `cluster`.
    /// Returns once the registration request is submitted, not once
    /// elected. `on_elected` fires per the [`LeadershipHandler`] contract.
    fn register_candidate(
        &self,
        cluster: &str,
        candidate_id: &str,
        on_elected: LeadershipHandler,
    ) -> Result<Box<dyn CandidacyHandle>, ClientError>;

    /// Current candidate list for `cluster`.
    fn participants(&self, cluster: &str) -> Result<Vec<String>, ClientError>;

    /// Closes the connection. Registrations still held become invalid.
    fn close(&self);
}

/// Exclusive handle to one live candidacy registration.
pub trait CandidacyHandle: Send + Sync {
    /// Withdraws the candidacy. Release does not interrupt a handler that
    /// is currently leading; callers signal their handler first.
    fn release(&self) -> Result<(), ClientError>;
}

/// Errors surfaced across the coordination-client seam.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("coordination service unavailable: {0}")]
    Unavailable(String),
    #[error("connection is closed")]
    Closed,
    #[error("registration already released")]
    AlreadyReleased,
    #[error("query for '{cluster}' failed: {reason}")]
    Query { cluster: String, reason: String },
}
