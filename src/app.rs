//! Application orchestrator: wire configuration, the membership group,
//! the anomaly monitor, and OS shutdown signals.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::client::Connector;
use crate::membership::MembershipGroup;
use crate::monitor::AnomalyMonitor;
use crate::opts::Opts;
use crate::testkit::LoopbackCoordinator;

/// Binary entrypoint. Runs against the in-process loopback backend;
/// deployments binding a real coordination service supply their own
/// [`Connector`] to [`run_with`].
pub fn run() -> Result<()> {
    let opts = Opts::parse();
    init_tracing();
    run_with(&opts, &LoopbackCoordinator::new())
}

/// Runs the harness with the provided connector until interrupted, then
/// drains: stop the monitor, shut every session down, close the
/// connection.
pub fn run_with(opts: &Opts, connector: &dyn Connector) -> Result<()> {
    let config = opts.group_config()?;
    info!(servers = %config.servers(), namespace = %config.namespace(), "connecting");
    let group = Arc::new(
        MembershipGroup::connect(&config, connector)
            .context("unable to build the membership group")?,
    );
    group
        .start()
        .context("unable to start the membership group")?;
    info!(node = %config.node_id(), "beginning test");
    let monitor = AnomalyMonitor::new(Arc::clone(&group), opts.monitor_config()).spawn();
    let interrupted = wait_for_interrupt();
    info!(node = %config.node_id(), "ending test");
    monitor.stop();
    group.shutdown();
    interrupted
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

/// Parks the calling thread until SIGINT. The signal wait needs an I/O
/// driver, so it runs on a private current-thread runtime.
fn wait_for_interrupt() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("unable to build the signal runtime")?;
    runtime
        .block_on(tokio::signal::ctrl_c())
        .context("unable to listen for the shutdown signal")
}
