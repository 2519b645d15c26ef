//! One contender's relationship to one logical cluster.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::client::{CandidacyHandle, ClientError, CoordinationClient, LeadershipHandler};
use crate::shutdown::ShutdownSignal;

/// Sentinel returned by [`CandidacySession::participant_count`] when the
/// query fails.
pub const PARTICIPANT_COUNT_UNAVAILABLE: i64 = -1;

/// Errors surfaced by session lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session is terminal; starting it again is a programming error,
    /// not a retryable condition.
    #[error("candidacy session '{id}' cannot be started after shutdown")]
    StartAfterShutdown { id: String },
    /// The registration request could not be submitted. Not retried here;
    /// retry belongs to the managed connection.
    #[error("failed to register candidacy for '{id}'")]
    Registration {
        id: String,
        #[source]
        source: ClientError,
    },
}

/// A single leadership candidacy for one logical cluster.
///
/// The session owns its registration handle exclusively. While elected it
/// occupies the client's callback thread with a heartbeat loop that
/// unwinds within one heartbeat interval of a shutdown request. Losing
/// leadership is the normal steady state for all but one contender per
/// cluster; the client re-queues the candidacy automatically.
pub struct CandidacySession {
    id: String,
    cluster: String,
    client: Arc<dyn CoordinationClient>,
    heartbeat_interval: Duration,
    started: AtomicBool,
    shutdown: AtomicBool,
    elected: AtomicBool,
    stop: ShutdownSignal,
    registration: Mutex<Option<Box<dyn CandidacyHandle>>>,
}

impl CandidacySession {
    pub(crate) fn new(
        client: Arc<dyn CoordinationClient>,
        node_id: &str,
        cluster: &str,
        heartbeat_interval: Duration,
    ) -> Arc<Self> {
        let cluster = if cluster.starts_with('/') {
            cluster.to_string()
        } else {
            format!("/{cluster}")
        };
        Arc::new(Self {
            id: format!("{node_id}{cluster}"),
            cluster,
            client,
            heartbeat_interval,
            started: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            elected: AtomicBool::new(false),
            stop: ShutdownSignal::new(),
            registration: Mutex::new(None),
        })
    }

    /// Composite identity: node id + cluster path.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Normalized logical cluster path this session contends for.
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn is_elected(&self) -> bool {
        self.elected.load(Ordering::SeqCst)
    }

    /// Submits the candidacy registration. Single-use: the first call
    /// registers, later calls are no-ops, and a call on a terminal
    /// session is an error. Returns once the registration request is
    /// submitted, not once elected.
    pub fn start(self: &Arc<Self>) -> Result<(), SessionError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(SessionError::StartAfterShutdown {
                id: self.id.clone(),
            });
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }
        let session = Arc::clone(self);
        let handler: LeadershipHandler = Arc::new(move || session.hold_leadership());
        let handle = self
            .client
            .register_candidate(&self.cluster, &self.id, handler)
            .map_err(|source| SessionError::Registration {
                id: self.id.clone(),
                source,
            })?;
        *self.registration.lock().unwrap() = Some(handle);
        // shutdown may have raced the registration; it found no handle to
        // release, so release here
        if self.shutdown.load(Ordering::SeqCst) {
            self.release_registration();
        }
        Ok(())
    }

    /// Requests shutdown. Idempotent and callable from any thread: the
    /// first call wins the compare-and-set, signals any in-progress
    /// leadership hold, and releases the registration handle exactly once.
    pub fn shutdown(&self) {
        if self
            .shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.stop.trigger();
        if self.started.load(Ordering::SeqCst) {
            self.release_registration();
        }
    }

    /// Observed candidate count for this session's cluster, or
    /// [`PARTICIPANT_COUNT_UNAVAILABLE`] on any query failure. Never
    /// propagates: the monitor calls this in a tight loop across every
    /// session and one failure must not abort the rest.
    pub fn participant_count(&self) -> i64 {
        match self.client.participants(&self.cluster) {
            Ok(participants) => participants.len() as i64,
            Err(err) => {
                error!(id = %self.id, error = %err, "unable to determine cluster participant count");
                PARTICIPANT_COUNT_UNAVAILABLE
            }
        }
    }

    /// Election callback body, run on the client's thread. Leading ends
    /// on the stop signal or on cleared lifecycle flags; returning hands
    /// the thread back to the client, which re-queues the candidacy.
    fn hold_leadership(&self) {
        self.elected.store(true, Ordering::SeqCst);
        info!(id = %self.id, "taking leadership");
        while self.started.load(Ordering::SeqCst) && !self.shutdown.load(Ordering::SeqCst) {
            if self.stop.wait_timeout(self.heartbeat_interval) {
                debug!(id = %self.id, "stop requested, will relinquish leadership");
                break;
            }
            debug!(id = %self.id, "leadership heartbeat");
        }
        self.elected.store(false, Ordering::SeqCst);
        info!(id = %self.id, "relinquishing leadership");
    }

    fn release_registration(&self) {
        let handle = self.registration.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.release() {
                error!(id = %self.id, error = %err, "failed to release candidacy registration");
            }
        }
    }
}
