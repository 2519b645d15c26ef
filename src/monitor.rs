//! Anomaly detection: the polling loop that watches participant counts.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::warn;

use crate::membership::MembershipGroup;
use crate::shutdown::ShutdownSignal;

/// Default expected steady-state participant ceiling. Two covers the
/// paired-process soak scenario: one live candidate plus at most one
/// stale record mid-expiry.
pub const DEFAULT_PARTICIPANT_CEILING: i64 = 2;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Tuning for the anomaly monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub participant_ceiling: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            participant_ceiling: DEFAULT_PARTICIPANT_CEILING,
        }
    }
}

/// One observation of one contest, produced per tick and consumed
/// immediately by the anomaly check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollSample {
    pub cluster: String,
    pub observed: i64,
    pub at_ms: u64,
}

/// Record of one over-ceiling observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnomalyReport {
    pub session_id: String,
    pub cluster: String,
    pub observed: i64,
    pub ceiling: i64,
    pub at_ms: u64,
}

/// Thread-safe record of reported anomalies, process-lifetime only.
#[derive(Debug, Default, Clone)]
pub struct AnomalyLog {
    entries: Arc<Mutex<Vec<AnomalyReport>>>,
}

impl AnomalyLog {
    fn record(&self, report: AnomalyReport) {
        self.entries.lock().unwrap().push(report);
    }

    pub fn snapshot(&self) -> Vec<AnomalyReport> {
        self.entries.lock().unwrap().clone()
    }
}

/// Polls every session of a group on a fixed interval and reports any
/// cluster whose participant count exceeds the configured ceiling.
///
/// Pure observability: the monitor takes no corrective action. A count at
/// the ceiling is healthy; the sentinel from a failed query never trips
/// the check.
pub struct AnomalyMonitor {
    group: Arc<MembershipGroup>,
    config: MonitorConfig,
    log: AnomalyLog,
    stop: Arc<ShutdownSignal>,
}

impl AnomalyMonitor {
    pub fn new(group: Arc<MembershipGroup>, config: MonitorConfig) -> Self {
        Self {
            group,
            config,
            log: AnomalyLog::default(),
            stop: Arc::new(ShutdownSignal::new()),
        }
    }

    pub fn anomaly_log(&self) -> AnomalyLog {
        self.log.clone()
    }

    /// One full pass over the group's snapshot, in snapshot order.
    /// Returns the samples taken; over-ceiling observations are logged
    /// and recorded as they are found.
    pub fn poll_once(&self) -> Vec<PollSample> {
        let at_ms = unix_millis();
        self.group
            .members()
            .iter()
            .map(|session| {
                let observed = session.participant_count();
                if observed > self.config.participant_ceiling {
                    let report = AnomalyReport {
                        session_id: session.id().to_string(),
                        cluster: session.cluster().to_string(),
                        observed,
                        ceiling: self.config.participant_ceiling,
                        at_ms,
                    };
                    match serde_json::to_string(&report) {
                        Ok(payload) => warn!(
                            report = %payload,
                            "possible orphaned ephemeral registration, member '{}' is reporting '{}' participants",
                            report.session_id, report.observed
                        ),
                        Err(err) => warn!(
                            error = %err,
                            "possible orphaned ephemeral registration, member '{}' is reporting '{}' participants",
                            report.session_id, report.observed
                        ),
                    }
                    self.log.record(report);
                }
                PollSample {
                    cluster: session.cluster().to_string(),
                    observed,
                    at_ms,
                }
            })
            .collect()
    }

    /// Runs the polling loop on the calling thread until stopped. A wake
    /// caused by the stop signal exits immediately, without another poll.
    pub fn run(&self) {
        loop {
            if self.stop.wait_timeout(self.config.poll_interval) {
                break;
            }
            self.poll_once();
        }
    }

    /// Spawns the loop on its own named thread. The returned handle stops
    /// the loop (waking a sleeping tick) and joins the thread.
    pub fn spawn(self) -> MonitorHandle {
        let stop = Arc::clone(&self.stop);
        let log = self.log.clone();
        let join = thread::Builder::new()
            .name("anomaly-monitor".to_string())
            .spawn(move || self.run())
            .expect("failed to spawn anomaly monitor thread");
        MonitorHandle {
            stop,
            log,
            join: Mutex::new(Some(join)),
        }
    }
}

/// Running monitor thread: `Running` until [`MonitorHandle::stop`],
/// `Stopped` after.
pub struct MonitorHandle {
    stop: Arc<ShutdownSignal>,
    log: AnomalyLog,
    join: Mutex<Option<thread::JoinHandle<()>>>,
}

impl MonitorHandle {
    pub fn anomaly_log(&self) -> AnomalyLog {
        self.log.clone()
    }

    /// Wakes the sleeping loop and joins the thread. Idempotent.
    pub fn stop(&self) {
        self.stop.trigger();
        if let Some(handle) = self.join.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis().min(u128::from(u64::MAX)) as u64)
        .unwrap_or(0)
}
