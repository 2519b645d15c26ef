//! The group owning the shared connection and every candidacy session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::client::{ClientError, Connector, CoordinationClient};
use crate::config::GroupConfig;
use crate::membership::session::{CandidacySession, SessionError};

/// Errors surfaced while starting a group. Either the shared connection
/// could not be opened or a session registration could not be submitted;
/// both are unrecoverable startup failures.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("failed to open the shared coordination connection")]
    Connection(#[from] ClientError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Fixed-size collection of [`CandidacySession`]s sharing one process
/// identity and one managed connection.
///
/// The connection's lifetime strictly contains every session's: it opens
/// before the first session starts and closes after the last one is told
/// to shut down.
pub struct MembershipGroup {
    client: Arc<dyn CoordinationClient>,
    sessions: Vec<Arc<CandidacySession>>,
    shutdown: AtomicBool,
}

impl MembershipGroup {
    /// Builds the managed connection from validated settings and derives
    /// one session per member ordinal (`prefix + index`), all sharing the
    /// node identity. Nothing is registered until [`MembershipGroup::start`].
    pub fn connect(config: &GroupConfig, connector: &dyn Connector) -> Result<Self, ClientError> {
        let client = connector.connect(&config.connection_settings())?;
        let sessions = (0..config.member_count())
            .map(|index| {
                let cluster = format!("{}{index}", config.member_prefix());
                CandidacySession::new(
                    Arc::clone(&client),
                    config.node_id(),
                    &cluster,
                    config.heartbeat_interval(),
                )
            })
            .collect();
        debug!(
            node = config.node_id(),
            members = config.member_count(),
            "membership group assembled"
        );
        Ok(Self {
            client,
            sessions,
            shutdown: AtomicBool::new(false),
        })
    }

    /// Opens the shared connection, then starts every session in index
    /// order. Session order carries no election semantics; it is fixed so
    /// runs are reproducible.
    pub fn start(&self) -> Result<(), GroupError> {
        self.client.start()?;
        for session in &self.sessions {
            session.start()?;
        }
        info!(members = self.sessions.len(), "membership group started");
        Ok(())
    }

    /// Shuts every session down, then closes the shared connection.
    /// Idempotent, and safe to call concurrently with the monitor's
    /// polling; one session's shutdown failure never blocks the others.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        for session in &self.sessions {
            session.shutdown();
        }
        self.client.close();
        info!(members = self.sessions.len(), "membership group shut down");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Read-only snapshot of the session collection; size and identities
    /// are fixed at construction.
    pub fn members(&self) -> &[Arc<CandidacySession>] {
        &self.sessions
    }
}

impl Drop for MembershipGroup {
    fn drop(&mut self) {
        self.shutdown();
    }
}
