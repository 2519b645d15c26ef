use std::sync::Arc;
use std::time::{Duration, Instant};

use electra::{AnomalyMonitor, GroupConfig, LoopbackCoordinator, MembershipGroup, MonitorConfig};

fn wait_for<F>(timeout: Duration, mut predicate: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("condition not met within {:?}", timeout);
}

fn three_member_group(coordinator: &LoopbackCoordinator) -> MembershipGroup {
    let config = GroupConfig::builder("node-A", "svc:1234")
        .member_count(3)
        .heartbeat_interval(Duration::from_millis(25))
        .build()
        .unwrap();
    MembershipGroup::connect(&config, coordinator).unwrap()
}

#[test]
fn three_member_scenario_runs_clean() {
    let coordinator = LoopbackCoordinator::new();
    let group = three_member_group(&coordinator);
    let ids: Vec<&str> = group.members().iter().map(|session| session.id()).collect();
    assert_eq!(ids, ["node-A/Member0", "node-A/Member1", "node-A/Member2"]);

    group.start().unwrap();
    assert!(group.members().iter().all(|session| session.is_started()));
    assert_eq!(coordinator.live_registrations(), 3);

    group.shutdown();
    assert!(group.members().iter().all(|session| session.is_shutdown()));
    assert_eq!(coordinator.live_registrations(), 0);
    assert_eq!(coordinator.total_releases(), 3);
    assert_eq!(coordinator.closed_connections(), 1);
}

#[test]
fn connection_lifetime_contains_session_lifetimes() {
    let coordinator = LoopbackCoordinator::new();
    let group = three_member_group(&coordinator);
    assert_eq!(coordinator.open_connections(), 0);

    group.start().unwrap();
    assert_eq!(coordinator.open_connections(), 1);

    group.shutdown();
    assert_eq!(coordinator.open_connections(), 0);
    assert_eq!(coordinator.closed_connections(), 1);
}

#[test]
fn shutdown_is_safe_concurrently_and_repeatedly() {
    let coordinator = LoopbackCoordinator::new();
    let group = Arc::new(three_member_group(&coordinator));
    group.start().unwrap();
    let monitor = AnomalyMonitor::new(
        Arc::clone(&group),
        MonitorConfig {
            poll_interval: Duration::from_millis(10),
            participant_ceiling: 2,
        },
    )
    .spawn();
    std::thread::sleep(Duration::from_millis(30));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| group.shutdown());
        }
    });
    monitor.stop();

    assert!(group.is_shutdown());
    assert_eq!(coordinator.total_releases(), 3);
    assert_eq!(coordinator.closed_connections(), 1);
}

#[test]
fn held_leadership_unwinds_before_the_connection_closes() {
    let coordinator = LoopbackCoordinator::new();
    let config = GroupConfig::builder("node-A", "svc:1234")
        .member_count(1)
        .heartbeat_interval(Duration::from_millis(25))
        .build()
        .unwrap();
    let group = MembershipGroup::connect(&config, &coordinator).unwrap();
    group.start().unwrap();
    let session = &group.members()[0];
    wait_for(Duration::from_secs(2), || session.is_elected());

    group.shutdown();
    wait_for(Duration::from_secs(1), || !session.is_elected());
    assert_eq!(coordinator.total_releases(), 1);
    assert_eq!(coordinator.closed_connections(), 1);
}
