use std::collections::HashSet;
use std::time::Duration;

use electra::{
    ConfigError, GroupConfig, LoopbackCoordinator, MembershipGroup, RetryPolicy,
    DEFAULT_MEMBER_COUNT, DEFAULT_MEMBER_PREFIX, DEFAULT_NAMESPACE, DEFAULT_RETRY_INTERVAL,
};

#[test]
fn defaults_cover_every_optional_setting() {
    let config = GroupConfig::builder("node-A", "svc:1234").build().unwrap();
    assert_eq!(config.node_id(), "node-A");
    assert_eq!(config.servers(), "svc:1234");
    assert_eq!(config.namespace(), DEFAULT_NAMESPACE);
    assert_eq!(config.member_prefix(), DEFAULT_MEMBER_PREFIX);
    assert_eq!(config.member_count(), DEFAULT_MEMBER_COUNT);
    assert_eq!(config.retry_interval(), DEFAULT_RETRY_INTERVAL);
}

#[test]
fn identity_and_servers_are_trimmed() {
    let config = GroupConfig::builder("  node-A ", " svc:1234  ")
        .build()
        .unwrap();
    assert_eq!(config.node_id(), "node-A");
    assert_eq!(config.servers(), "svc:1234");
}

#[test]
fn empty_required_settings_are_rejected() {
    assert_eq!(
        GroupConfig::builder("   ", "svc:1234").build().unwrap_err(),
        ConfigError::EmptyNodeId
    );
    assert_eq!(
        GroupConfig::builder("node-A", " ").build().unwrap_err(),
        ConfigError::EmptyServers
    );
}

#[test]
fn blank_optional_settings_are_rejected() {
    assert_eq!(
        GroupConfig::builder("node-A", "svc:1234")
            .namespace("  ")
            .build()
            .unwrap_err(),
        ConfigError::EmptyNamespace
    );
    assert_eq!(
        GroupConfig::builder("node-A", "svc:1234")
            .member_prefix(" ")
            .build()
            .unwrap_err(),
        ConfigError::EmptyMemberPrefix
    );
}

#[test]
fn member_count_must_be_positive() {
    assert_eq!(
        GroupConfig::builder("node-A", "svc:1234")
            .member_count(0)
            .build()
            .unwrap_err(),
        ConfigError::InvalidMemberCount(0)
    );
}

#[test]
fn intervals_must_be_positive() {
    assert_eq!(
        GroupConfig::builder("node-A", "svc:1234")
            .retry_interval(Duration::ZERO)
            .build()
            .unwrap_err(),
        ConfigError::InvalidRetryInterval
    );
    assert_eq!(
        GroupConfig::builder("node-A", "svc:1234")
            .heartbeat_interval(Duration::ZERO)
            .build()
            .unwrap_err(),
        ConfigError::InvalidHeartbeatInterval
    );
}

#[test]
fn connection_retries_forever_at_the_configured_interval() {
    let config = GroupConfig::builder("node-A", "svc:1234")
        .retry_interval(Duration::from_millis(1500))
        .build()
        .unwrap();
    let settings = config.connection_settings();
    assert_eq!(settings.servers, "svc:1234");
    assert_eq!(settings.namespace, DEFAULT_NAMESPACE);
    assert_eq!(
        settings.retry,
        RetryPolicy::Forever {
            interval: Duration::from_millis(1500)
        }
    );
}

#[test]
fn sessions_derive_distinct_deterministic_names() {
    let coordinator = LoopbackCoordinator::new();
    let config = GroupConfig::builder("node-A", "svc:1234")
        .member_count(5)
        .build()
        .unwrap();
    let group = MembershipGroup::connect(&config, &coordinator).unwrap();
    let ids: Vec<&str> = group.members().iter().map(|session| session.id()).collect();
    assert_eq!(
        ids,
        [
            "node-A/Member0",
            "node-A/Member1",
            "node-A/Member2",
            "node-A/Member3",
            "node-A/Member4",
        ]
    );
    let distinct: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(distinct.len(), 5);
}

#[test]
fn connect_registers_nothing_until_start() {
    let coordinator = LoopbackCoordinator::new();
    let config = GroupConfig::builder("node-A", "svc:1234")
        .member_count(3)
        .build()
        .unwrap();
    let group = MembershipGroup::connect(&config, &coordinator).unwrap();
    assert_eq!(coordinator.open_connections(), 0);
    assert_eq!(coordinator.live_registrations(), 0);
    assert!(group.members().iter().all(|session| !session.is_started()));
}
