//! In-process coordination backend for tests and local soak runs.
//!
//! Not a coordination service: no networking, no consensus, no
//! persistence. Elections are scripted: the first live candidate of a
//! cluster leads, and returning from the callback re-queues the candidacy
//! and promotes the next in line. That is enough to exercise the harness
//! end to end and to inject the failures it exists to detect.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::debug;

use crate::client::{
    CandidacyHandle, ClientError, ConnectionSettings, Connector, CoordinationClient,
    LeadershipHandler,
};

/// Process-local coordination backend implementing the client seam.
///
/// One instance models the service; each [`Connector::connect`] call
/// hands out an independent connection sharing its state. Candidacies are
/// ephemeral: closing a connection removes the registrations made through
/// it. Orphans planted with [`LoopbackCoordinator::inject_orphan`] survive
/// every close, modeling exactly the leaked records the harness exists to
/// catch.
#[derive(Clone, Default)]
pub struct LoopbackCoordinator {
    service: Arc<LoopbackService>,
}

#[derive(Default)]
struct LoopbackService {
    next_token: AtomicU64,
    next_connection: AtomicU64,
    open_connections: AtomicI64,
    closed_connections: AtomicU64,
    releases: AtomicU64,
    clusters: Mutex<HashMap<String, ClusterState>>,
}

#[derive(Default)]
struct ClusterState {
    queue: VecDeque<Candidate>,
    leading: Option<u64>,
    orphans: Vec<String>,
    fail_queries: bool,
}

struct Candidate {
    token: u64,
    connection: u64,
    id: String,
    handler: LeadershipHandler,
}

impl LoopbackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections that have been started and not yet closed.
    pub fn open_connections(&self) -> i64 {
        self.service.open_connections.load(Ordering::SeqCst)
    }

    pub fn closed_connections(&self) -> u64 {
        self.service.closed_connections.load(Ordering::SeqCst)
    }

    /// Total successful registration releases across all clusters.
    pub fn total_releases(&self) -> u64 {
        self.service.releases.load(Ordering::Relaxed)
    }

    /// Number of candidacies currently registered across all clusters.
    pub fn live_registrations(&self) -> usize {
        let clusters = self.service.clusters.lock().unwrap();
        clusters.values().map(|state| state.queue.len()).sum()
    }

    /// Makes participant queries for `cluster` fail, driving the
    /// monitor's sentinel paths.
    pub fn fail_queries_for(&self, cluster: &str) {
        let cluster = normalize(cluster);
        let mut clusters = self.service.clusters.lock().unwrap();
        clusters.entry(cluster).or_default().fail_queries = true;
    }

    /// Plants a phantom participant that never goes away: the
    /// orphaned-ephemeral-registration bug this harness exists to catch.
    pub fn inject_orphan(&self, cluster: &str, id: impl Into<String>) {
        let cluster = normalize(cluster);
        let mut clusters = self.service.clusters.lock().unwrap();
        clusters.entry(cluster).or_default().orphans.push(id.into());
    }
}

impl Connector for LoopbackCoordinator {
    fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn CoordinationClient>, ClientError> {
        let connection = self.service.next_connection.fetch_add(1, Ordering::Relaxed);
        debug!(
            servers = %settings.servers,
            namespace = %settings.namespace,
            connection,
            "loopback connection built"
        );
        Ok(Arc::new(LoopbackConnection {
            service: Arc::clone(&self.service),
            connection,
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }))
    }
}

/// One managed connection to the loopback backend.
struct LoopbackConnection {
    service: Arc<LoopbackService>,
    connection: u64,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl CoordinationClient for LoopbackConnection {
    fn start(&self) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        if !self.connected.swap(true, Ordering::SeqCst) {
            self.service.open_connections.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn register_candidate(
        &self,
        cluster: &str,
        candidate_id: &str,
        on_elected: LeadershipHandler,
    ) -> Result<Box<dyn CandidacyHandle>, ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable(
                "connection has not been started".to_string(),
            ));
        }
        let cluster = normalize(cluster);
        let token = self.service.next_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut clusters = self.service.clusters.lock().unwrap();
            let state = clusters.entry(cluster.clone()).or_default();
            state.queue.push_back(Candidate {
                token,
                connection: self.connection,
                id: candidate_id.to_string(),
                handler: on_elected,
            });
            self.service.maybe_elect(&cluster, state);
        }
        Ok(Box::new(LoopbackRegistration {
            service: Arc::clone(&self.service),
            cluster,
            token,
            released: AtomicBool::new(false),
        }))
    }

    fn participants(&self, cluster: &str) -> Result<Vec<String>, ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        let cluster = normalize(cluster);
        let clusters = self.service.clusters.lock().unwrap();
        let Some(state) = clusters.get(&cluster) else {
            return Ok(Vec::new());
        };
        if state.fail_queries {
            return Err(ClientError::Query {
                cluster,
                reason: "injected query failure".to_string(),
            });
        }
        let mut ids: Vec<String> = state
            .queue
            .iter()
            .map(|candidate| candidate.id.clone())
            .collect();
        ids.extend(state.orphans.iter().cloned());
        Ok(ids)
    }

    /// Closing drops every candidacy registered through this connection
    /// (ephemeral semantics); injected orphans survive on purpose.
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.connected.swap(false, Ordering::SeqCst) {
            self.service.open_connections.fetch_sub(1, Ordering::SeqCst);
        }
        self.service
            .closed_connections
            .fetch_add(1, Ordering::SeqCst);
        let mut clusters = self.service.clusters.lock().unwrap();
        for state in clusters.values_mut() {
            state
                .queue
                .retain(|candidate| candidate.connection != self.connection);
        }
    }
}

impl LoopbackService {
    /// Promotes the head of the queue when the cluster has no leader,
    /// invoking its handler on a dedicated client-owned thread. Callers
    /// hold the cluster lock.
    fn maybe_elect(self: &Arc<Self>, cluster: &str, state: &mut ClusterState) {
        if state.leading.is_some() {
            return;
        }
        let Some(front) = state.queue.front() else {
            return;
        };
        let token = front.token;
        let candidate_id = front.id.clone();
        let handler = Arc::clone(&front.handler);
        state.leading = Some(token);
        let service = Arc::clone(self);
        let cluster = cluster.to_string();
        thread::Builder::new()
            .name(format!("election{cluster}"))
            .spawn(move || {
                debug!(cluster = %cluster, candidate = %candidate_id, "candidate elected");
                handler();
                service.leadership_returned(&cluster, token);
            })
            .expect("failed to spawn election thread");
    }

    /// The handler for `token` returned: clear leadership, re-queue the
    /// candidacy if it is still live, and promote the next candidate.
    fn leadership_returned(self: &Arc<Self>, cluster: &str, token: u64) {
        let mut clusters = self.clusters.lock().unwrap();
        let Some(state) = clusters.get_mut(cluster) else {
            return;
        };
        if state.leading == Some(token) {
            state.leading = None;
        }
        if let Some(position) = state
            .queue
            .iter()
            .position(|candidate| candidate.token == token)
        {
            if let Some(candidate) = state.queue.remove(position) {
                state.queue.push_back(candidate);
            }
        }
        self.maybe_elect(cluster, state);
    }

    fn release(self: &Arc<Self>, cluster: &str, token: u64) {
        let mut clusters = self.clusters.lock().unwrap();
        if let Some(state) = clusters.get_mut(cluster) {
            if let Some(position) = state
                .queue
                .iter()
                .position(|candidate| candidate.token == token)
            {
                state.queue.remove(position);
            }
            // a leading candidate stays leading until its handler returns;
            // leadership_returned elects the successor
        }
        self.releases.fetch_add(1, Ordering::Relaxed);
    }
}

struct LoopbackRegistration {
    service: Arc<LoopbackService>,
    cluster: String,
    token: u64,
    released: AtomicBool,
}

impl CandidacyHandle for LoopbackRegistration {
    fn release(&self) -> Result<(), ClientError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyReleased);
        }
        self.service.release(&self.cluster, self.token);
        Ok(())
    }
}

fn normalize(cluster: &str) -> String {
    if cluster.starts_with('/') {
        cluster.to_string()
    } else {
        format!("/{cluster}")
    }
}
