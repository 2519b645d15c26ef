use std::time::{Duration, Instant};

use electra::{
    GroupConfig, LoopbackCoordinator, MembershipGroup, SessionError,
    PARTICIPANT_COUNT_UNAVAILABLE,
};

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

fn started_group(member_count: usize) -> (LoopbackCoordinator, MembershipGroup) {
    let coordinator = LoopbackCoordinator::new();
    let config = GroupConfig::builder("node-A", "svc:1234")
        .member_count(member_count)
        .heartbeat_interval(Duration::from_millis(25))
        .build()
        .unwrap();
    let group = MembershipGroup::connect(&config, &coordinator).unwrap();
    group.start().unwrap();
    (coordinator, group)
}

#[test]
fn start_marks_every_session_started() {
    let (coordinator, group) = started_group(3);
    assert!(group.members().iter().all(|session| session.is_started()));
    assert_eq!(coordinator.live_registrations(), 3);
    // every session contends in its own cluster, so each one is elected
    wait_for(Duration::from_secs(2), || {
        group.members().iter().all(|session| session.is_elected())
    });
}

#[test]
fn start_is_idempotent_after_first_call() {
    let (coordinator, group) = started_group(3);
    group.members()[0].start().unwrap();
    group.start().unwrap();
    assert_eq!(coordinator.live_registrations(), 3);
}

#[test]
fn start_after_shutdown_is_a_lifecycle_error() {
    let (_coordinator, group) = started_group(2);
    group.shutdown();
    let err = group.members()[0].start().unwrap_err();
    match err {
        SessionError::StartAfterShutdown { id } => assert_eq!(id, "node-A/Member0"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn repeated_shutdown_is_idempotent() {
    let (coordinator, group) = started_group(3);
    group.shutdown();
    assert!(group.members().iter().all(|session| session.is_shutdown()));
    group.shutdown();
    assert!(group.members().iter().all(|session| session.is_shutdown()));
    assert_eq!(coordinator.total_releases(), 3);
}

#[test]
fn query_failure_returns_the_sentinel() {
    let (coordinator, group) = started_group(2);
    assert_eq!(group.members()[0].participant_count(), 1);
    coordinator.fail_queries_for(group.members()[0].cluster());
    assert_eq!(
        group.members()[0].participant_count(),
        PARTICIPANT_COUNT_UNAVAILABLE
    );
    // the sibling session is untouched
    assert_eq!(group.members()[1].participant_count(), 1);
}

#[test]
fn elected_session_relinquishes_within_a_heartbeat_on_shutdown() {
    let (coordinator, group) = started_group(1);
    let session = &group.members()[0];
    wait_for(Duration::from_secs(2), || session.is_elected());
    session.shutdown();
    wait_for(Duration::from_secs(1), || !session.is_elected());
    assert_eq!(coordinator.total_releases(), 1);
}

#[test]
fn next_candidate_is_promoted_when_the_leader_withdraws() {
    let coordinator = LoopbackCoordinator::new();
    let config_a = GroupConfig::builder("node-A", "svc:1234")
        .member_count(1)
        .heartbeat_interval(Duration::from_millis(25))
        .build()
        .unwrap();
    let group_a = MembershipGroup::connect(&config_a, &coordinator).unwrap();
    group_a.start().unwrap();
    wait_for(Duration::from_secs(2), || {
        group_a.members()[0].is_elected()
    });

    let config_b = GroupConfig::builder("node-B", "svc:1234")
        .member_count(1)
        .heartbeat_interval(Duration::from_millis(25))
        .build()
        .unwrap();
    let group_b = MembershipGroup::connect(&config_b, &coordinator).unwrap();
    group_b.start().unwrap();
    // both contend for /Member0; node-B waits in line
    assert_eq!(group_a.members()[0].participant_count(), 2);
    assert!(!group_b.members()[0].is_elected());

    group_a.shutdown();
    wait_for(Duration::from_secs(2), || {
        group_b.members()[0].is_elected()
    });
    assert_eq!(group_b.members()[0].participant_count(), 1);
}
