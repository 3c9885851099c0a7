#![allow(clippy::unwrap_used)]

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use futures_util::future::join_all;
use nvtuner_core::{
    AuthMode, CommandRunner, ConnectionState, CoreError, Notification, SessionConfig,
};
use nvtuner_ssh::{CommandOutput, Error};
use tokio::sync::broadcast;

use common::{FakeRouter, password_router, session};

fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn log_messages(notifications: &[Notification]) -> Vec<String> {
    notifications
        .iter()
        .filter_map(|n| match n {
            Notification::Log(entry) => Some(entry.message.clone()),
            _ => None,
        })
        .collect()
}

// ── Connect ──────────────────────────────────────────────────────

#[tokio::test]
async fn real_connect_identifies_router() {
    let router = FakeRouter::merlin();
    let (manager, bus) = session(&router, SessionConfig::default());
    let mut rx = bus.subscribe();

    let result = manager.connect(&password_router(), false).await.unwrap();
    assert!(result.success);
    assert_eq!(result.hostname, "RT-AX88U");
    assert_eq!(result.os, "ASUSWRT-Merlin");
    assert!(manager.is_connected());
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(manager.router().unwrap().display_name(), "lab");

    assert!(log_messages(&drain(&mut rx)).contains(&"Connected to RT-AX88U".to_string()));
    manager.disconnect().await;
}

#[tokio::test]
async fn second_real_connect_is_rejected() {
    let router = FakeRouter::merlin();
    let (manager, _bus) = session(&router, SessionConfig::default());

    manager.connect(&password_router(), false).await.unwrap();
    let err = manager.connect(&password_router(), false).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyConnected { ref router } if router == "lab"));
    assert_eq!(router.connects.load(Ordering::SeqCst), 1);
    manager.disconnect().await;
}

#[tokio::test]
async fn probe_leaves_real_session_untouched() {
    let router = FakeRouter::merlin();
    let (manager, bus) = session(&router, SessionConfig::default());

    manager.connect(&password_router(), false).await.unwrap();
    let mut rx = bus.subscribe();

    let probe = manager.connect(&password_router(), true).await.unwrap();
    assert!(probe.success);
    assert_eq!(probe.hostname, "RT-AX88U");

    assert_eq!(router.connects.load(Ordering::SeqCst), 2);
    assert!(!router.is_closed(0), "real transport must stay open");
    assert!(router.is_closed(1), "probe transport must be closed");
    assert!(manager.is_connected());
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(
        log_messages(&drain(&mut rx))
            .iter()
            .any(|m| m.contains("using temporary client"))
    );
    manager.disconnect().await;
}

#[tokio::test]
async fn probe_alone_never_counts_as_connected() {
    let router = FakeRouter::merlin();
    let (manager, _bus) = session(&router, SessionConfig::default());

    let probe = manager.connect(&password_router(), true).await.unwrap();
    assert!(probe.success);
    assert!(!manager.is_connected());
    assert_eq!(manager.state(), ConnectionState::NotConnected);
}

#[tokio::test]
async fn failed_login_is_reported_not_raised() {
    let router = FakeRouter::merlin();
    router.refuse_logins();
    let (manager, bus) = session(&router, SessionConfig::default());
    let mut rx = bus.subscribe();

    let result = manager.connect(&password_router(), false).await.unwrap();
    assert!(!result.success);
    assert!(!manager.is_connected());
    assert_eq!(manager.state(), ConnectionState::Error);

    let logs = log_messages(&drain(&mut rx));
    assert!(logs.iter().any(|m| m.starts_with("Error during connection to 'lab'")));

    let probe = manager.connect(&password_router(), true).await.unwrap();
    assert!(!probe.success);
}

#[tokio::test]
async fn missing_private_key_is_raised() {
    let router = FakeRouter::merlin();
    let (manager, _bus) = session(&router, SessionConfig::default());
    let keys = tempfile::tempdir().unwrap();

    let mut target = password_router();
    target.auth_mode = AuthMode::KeyPair;
    target.key_dir = Some(keys.path().to_path_buf());

    for probe_only in [false, true] {
        let err = manager.connect(&target, probe_only).await.unwrap_err();
        assert!(
            matches!(err, CoreError::KeyNotFound { ref path } if path == &keys.path().join("id_rsa"))
        );
    }
    assert_eq!(router.connects.load(Ordering::SeqCst), 0);
    assert_eq!(manager.state(), ConnectionState::NotConnected);
}

#[tokio::test]
async fn invalid_router_is_rejected_before_connecting() {
    let router = FakeRouter::merlin();
    let (manager, _bus) = session(&router, SessionConfig::default());
    let mut target = password_router();
    target.address = "300.1.1.1".into();

    let err = manager.connect(&target, false).await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    assert_eq!(router.connects.load(Ordering::SeqCst), 0);
}

// ── Commands ─────────────────────────────────────────────────────

#[tokio::test]
async fn run_command_requires_a_session() {
    let router = FakeRouter::merlin();
    let (manager, bus) = session(&router, SessionConfig::default());
    let mut rx = bus.subscribe();

    let err = manager.run_command("nvram show").await.unwrap_err();
    assert!(matches!(err, CoreError::NotConnected));
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [Notification::CommandRan { success: false, .. }]
    ));
    assert!(router.executed().is_empty());
}

#[tokio::test]
async fn transport_failure_yields_empty_output() {
    let router = FakeRouter::merlin();
    router.fail("nvram show");
    let (manager, bus) = session(&router, SessionConfig::default());
    manager.connect(&password_router(), false).await.unwrap();
    let mut rx = bus.subscribe();

    let output = manager.run_command("nvram show").await.unwrap();
    assert_eq!(output, CommandOutput::default());

    let seen = drain(&mut rx);
    assert!(seen.iter().any(|n| matches!(
        n,
        Notification::CommandRan { command, success: false } if command == "nvram show"
    )));
    assert!(
        log_messages(&seen)
            .iter()
            .any(|m| m.starts_with("Command 'nvram show' failed"))
    );
    manager.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_commands_are_serialized_in_order() {
    let router = FakeRouter::merlin();
    let (manager, _bus) = session(&router, SessionConfig::default());
    manager.connect(&password_router(), false).await.unwrap();
    router.set_exec_delay(Duration::from_millis(50));

    let commands: Vec<String> = (0..5).map(|i| format!("echo {i}")).collect();
    let outputs = join_all(commands.iter().map(|c| manager.run_command(c))).await;
    assert!(outputs.iter().all(Result::is_ok));

    assert_eq!(router.max_in_flight.load(Ordering::SeqCst), 1);
    let executed = router.executed();
    assert_eq!(&executed[executed.len() - 5..], commands.as_slice());
    manager.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn queued_command_dropped_by_disconnect_is_announced() {
    let router = FakeRouter::merlin();
    let (manager, bus) = session(&router, SessionConfig::default());
    manager.connect(&password_router(), false).await.unwrap();
    router.set_exec_delay(Duration::from_secs(2));
    let mut rx = bus.subscribe();

    let first = tokio::spawn({
        let manager = manager.clone();
        async move { manager.run_command("first").await }
    });
    while !router.executed().iter().any(|c| c == "first") {
        tokio::task::yield_now().await;
    }
    let second = tokio::spawn({
        let manager = manager.clone();
        async move { manager.run_command("second").await }
    });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    manager.disconnect().await;

    assert!(first.await.unwrap().is_ok());
    assert!(matches!(second.await.unwrap(), Err(CoreError::NotConnected)));
    assert!(!router.executed().iter().any(|c| c == "second"));

    let ran: Vec<(String, bool)> = drain(&mut rx)
        .into_iter()
        .filter_map(|n| match n {
            Notification::CommandRan { command, success } => Some((command, success)),
            _ => None,
        })
        .collect();
    assert_eq!(
        ran,
        vec![("first".to_string(), true), ("second".to_string(), false)]
    );
}

// ── Background tasks ─────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn ticks_once_per_interval_with_formatted_elapsed() {
    let router = FakeRouter::merlin();
    let (manager, bus) = session(&router, SessionConfig::default());
    let mut rx = bus.subscribe();
    manager.connect(&password_router(), false).await.unwrap();

    tokio::time::sleep(Duration::from_millis(3_500)).await;

    let ticks: Vec<String> = drain(&mut rx)
        .into_iter()
        .filter_map(|n| match n {
            Notification::ConnectionTick(tick) => Some(tick.formatted()),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec!["00:00:01", "00:00:02", "00:00:03"]);
    manager.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn heartbeat_runs_on_configured_interval() {
    let router = FakeRouter::merlin();
    let config = SessionConfig {
        keepalive_interval: Duration::from_secs(10),
        ..SessionConfig::default()
    };
    let (manager, _bus) = session(&router, config);
    manager.connect(&password_router(), false).await.unwrap();

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(router.keepalives.load(Ordering::SeqCst), 3);

    manager.disconnect().await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(router.keepalives.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn zero_keepalive_disables_heartbeat() {
    let router = FakeRouter::merlin();
    let config = SessionConfig {
        keepalive_interval: Duration::ZERO,
        ..SessionConfig::default()
    };
    let (manager, _bus) = session(&router, config);
    manager.connect(&password_router(), false).await.unwrap();

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(router.keepalives.load(Ordering::SeqCst), 0);
    manager.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn transport_errors_are_forwarded() {
    let router = FakeRouter::merlin();
    let (manager, bus) = session(&router, SessionConfig::default());
    manager.connect(&password_router(), false).await.unwrap();
    let mut rx = bus.subscribe();

    router.raise(
        0,
        Error::Disconnected {
            reason: "router rebooted".into(),
        },
    );
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(drain(&mut rx).iter().any(|n| matches!(
        n,
        Notification::TransportError(msg) if msg.contains("router rebooted")
    )));
    assert_eq!(manager.state(), ConnectionState::Error);
    manager.disconnect().await;
}

// ── Disconnect ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn disconnect_is_idempotent_and_stops_ticks() {
    let router = FakeRouter::merlin();
    let (manager, bus) = session(&router, SessionConfig::default());
    manager.connect(&password_router(), false).await.unwrap();
    let mut rx = bus.subscribe();

    manager.disconnect().await;
    manager.disconnect().await;

    let seen = drain(&mut rx);
    let disconnects = seen
        .iter()
        .filter(|n| matches!(n, Notification::RouterDisconnected))
        .count();
    assert_eq!(disconnects, 1);
    assert_eq!(log_messages(&seen), vec!["Disconnected".to_string()]);
    assert!(router.is_closed(0));
    assert!(!manager.is_connected());
    assert_eq!(manager.state(), ConnectionState::NotConnected);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(
        !drain(&mut rx)
            .iter()
            .any(|n| matches!(n, Notification::ConnectionTick(_)))
    );
}

#[tokio::test]
async fn disconnect_without_session_is_silent() {
    let router = FakeRouter::merlin();
    let (manager, bus) = session(&router, SessionConfig::default());
    let mut rx = bus.subscribe();

    manager.disconnect().await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn reconnect_after_disconnect() {
    let router = FakeRouter::merlin();
    let (manager, _bus) = session(&router, SessionConfig::default());

    manager.connect(&password_router(), false).await.unwrap();
    manager.disconnect().await;
    let again = manager.connect(&password_router(), false).await.unwrap();

    assert!(again.success);
    assert!(manager.is_connected());
    assert_eq!(router.connects.load(Ordering::SeqCst), 2);
    manager.disconnect().await;
}
