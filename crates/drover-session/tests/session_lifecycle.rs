//! End-to-end tests of the session protocol: initialize, execute commands
//! against a worker-owned fake browser, and shut down within bounds.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;

use drover_protocol::error_codes;
use drover_protocol::{Command, Response};
use drover_session::test_support::{FakeBrowser, FakeElement, FakeFactory};
use drover_session::{
    GuardOutcome, InitGuard, MockSleeper, RealSleeper, SessionConfig, SessionController,
    SessionError, SessionParameters,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Each test gets its own guard path so parallel tests never contend on
/// the real system-wide lock file.
fn test_config(dir: &TempDir) -> SessionConfig {
    SessionConfig::default()
        .with_guard_path(dir.path().join("init.lock"))
        .with_keep_alive_interval(Duration::from_millis(10))
}

fn initialized_controller(dir: &TempDir, factory: FakeFactory) -> SessionController {
    init_tracing();
    let mut controller = SessionController::new(test_config(dir));
    controller.initialize(SessionParameters::default(), Box::new(factory));
    controller
}

fn get_attribute_command(id: &str, name: &str) -> String {
    Command::new("getElementAttribute")
        .with_param("id", id)
        .with_param("name", name)
        .to_json()
}

#[test]
fn test_initialize_yields_worker_derived_session_id() {
    let dir = TempDir::new().unwrap();
    let controller = initialized_controller(&dir, FakeFactory::new());

    assert!(controller.is_initialized());
    assert_eq!(controller.session_id().len(), 36);
}

#[test]
fn test_get_attribute_four_branches_through_the_full_stack() {
    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::open("b1");
    let element = FakeElement::attached().with_attribute("value", "hello");
    let mut controller = initialized_controller(
        &dir,
        FakeFactory::new()
            .with_browser(&browser)
            .with_element("e1", &element),
    );

    // Present attribute: string success.
    let (serialized, valid) = controller
        .execute_command(&get_attribute_command("e1", "value"))
        .unwrap();
    assert!(valid);
    let response = Response::from_json(&serialized).unwrap();
    assert_eq!(response.status, error_codes::SUCCESS);
    assert_eq!(response.value, Value::String(String::from("hello")));

    // Absent attribute: explicit null success, not an error.
    let (serialized, _) = controller
        .execute_command(&get_attribute_command("e1", "missing-attr"))
        .unwrap();
    let response = Response::from_json(&serialized).unwrap();
    assert_eq!(response.status, error_codes::SUCCESS);
    assert!(response.value.is_null());

    // Unregistered element id.
    let (serialized, _) = controller
        .execute_command(&get_attribute_command("ghost", "value"))
        .unwrap();
    let response = Response::from_json(&serialized).unwrap();
    assert_eq!(response.status, error_codes::NO_SUCH_ELEMENT);

    // Detached element: stale, distinct from not-found. The test steers
    // the worker-owned element from the caller thread.
    element.detach();
    let (serialized, _) = controller
        .execute_command(&get_attribute_command("e1", "value"))
        .unwrap();
    let response = Response::from_json(&serialized).unwrap();
    assert_eq!(response.status, error_codes::STALE_ELEMENT_REFERENCE);

    controller.shut_down();
}

#[test]
fn test_missing_parameter_is_rejected_before_browser_resolution() {
    let dir = TempDir::new().unwrap();
    // No browser at all: if resolution ran first this would be
    // NO_SUCH_WINDOW.
    let mut controller = initialized_controller(&dir, FakeFactory::new());

    let serialized_command = Command::new("getElementAttribute")
        .with_param("id", "e1")
        .to_json();
    let (serialized, _) = controller.execute_command(&serialized_command).unwrap();

    let json: Value = serde_json::from_str(&serialized).unwrap();
    assert_eq!(json["status"], error_codes::INVALID_ARGUMENT);
    assert_eq!(json["value"]["error"], "invalid argument");

    controller.shut_down();
}

#[test]
fn test_every_branch_serializes_with_a_status_field() {
    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::open("b1");
    let element = FakeElement::attached().with_attribute("value", "v");
    let mut controller = initialized_controller(
        &dir,
        FakeFactory::new()
            .with_browser(&browser)
            .with_element("e1", &element),
    );

    let commands = [
        get_attribute_command("e1", "value"),
        get_attribute_command("e1", "absent"),
        get_attribute_command("ghost", "value"),
        Command::new("getElementAttribute").with_param("id", "e1").to_json(),
    ];
    for serialized_command in &commands {
        let (serialized, _) = controller.execute_command(serialized_command).unwrap();
        let json: Value = serde_json::from_str(&serialized).unwrap();
        assert!(json.get("status").is_some(), "no status in {}", serialized);
    }

    controller.shut_down();
}

#[test]
fn test_session_validity_reported_false_exactly_when_browser_closes() {
    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::open("b1");
    let mut controller = initialized_controller(&dir, FakeFactory::new().with_browser(&browser));

    // Quitting tears every browser down, so the flag reports invalid.
    let (_, valid) = controller
        .execute_command(&Command::new("quit").to_json())
        .unwrap();
    assert!(!valid);

    controller.shut_down();

    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::open("b1");
    let element = FakeElement::attached();
    let mut controller = initialized_controller(
        &dir,
        FakeFactory::new()
            .with_browser(&browser)
            .with_element("e1", &element),
    );

    // Ordinary commands leave the session valid.
    let (_, valid) = controller
        .execute_command(&get_attribute_command("e1", "anything"))
        .unwrap();
    assert!(valid);

    // ...and closing the last window invalidates it on the same cycle.
    let (serialized, valid) = controller
        .execute_command(&Command::new("close").to_json())
        .unwrap();
    let response = Response::from_json(&serialized).unwrap();
    assert_eq!(response.status, error_codes::SUCCESS);
    assert!(!valid);

    controller.shut_down();
}

#[test]
fn test_unknown_command_yields_error_response_not_a_hang() {
    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::open("b1");
    let mut controller = initialized_controller(&dir, FakeFactory::new().with_browser(&browser));

    let (serialized, valid) = controller
        .execute_command(&Command::new("teleport").to_json())
        .unwrap();
    assert!(valid);
    let response = Response::from_json(&serialized).unwrap();
    assert_eq!(response.status, error_codes::UNKNOWN_COMMAND);

    controller.shut_down();
}

#[test]
fn test_failed_browser_launch_degrades_but_session_still_answers() {
    let dir = TempDir::new().unwrap();
    let mut controller = initialized_controller(&dir, FakeFactory::failing());

    // The worker came up, so a session id exists even though no browser
    // does.
    assert!(controller.is_initialized());

    let (serialized, valid) = controller
        .execute_command(&get_attribute_command("e1", "value"))
        .unwrap();
    assert!(!valid);
    let response = Response::from_json(&serialized).unwrap();
    assert_eq!(response.status, error_codes::NO_SUCH_WINDOW);

    controller.shut_down();
}

#[test]
fn test_initialize_proceeds_when_guard_is_held_elsewhere() {
    let dir = TempDir::new().unwrap();
    let guard_path = dir.path().join("init.lock");
    let outcome = InitGuard::acquire(&guard_path, Duration::from_secs(1), &RealSleeper);
    let GuardOutcome::Acquired(_held) = outcome else {
        panic!("expected to hold the guard for the test");
    };

    let config = SessionConfig::default()
        .with_guard_path(guard_path)
        .with_guard_timeout(Duration::from_millis(50))
        .with_keep_alive_interval(Duration::from_millis(10));
    let mut controller =
        SessionController::new(config).with_sleeper(Arc::new(MockSleeper::new()));
    controller.initialize(SessionParameters::default(), Box::new(FakeFactory::new()));

    // Guard timeout degrades gracefully: the session still comes up.
    assert!(controller.is_initialized());
    controller.shut_down();
}

#[test]
fn test_guard_is_released_after_every_initialize() {
    let dir = TempDir::new().unwrap();

    let mut first = initialized_controller(&dir, FakeFactory::new());
    first.shut_down();

    // A second initialize on the same guard path must not dead-lock or
    // time out: the first one released the guard on every branch.
    let mut second = SessionController::new(
        test_config(&dir).with_guard_timeout(Duration::from_millis(200)),
    );
    second.initialize(SessionParameters::default(), Box::new(FakeFactory::new()));
    assert!(second.is_initialized());
    second.shut_down();
}

#[test]
fn test_shut_down_quit_poll_is_bounded_when_teardown_stalls() {
    let dir = TempDir::new().unwrap();
    let slow = FakeBrowser::open_slow_teardown("b1");
    let sleeper = Arc::new(MockSleeper::new());
    let mut controller =
        SessionController::new(test_config(&dir)).with_sleeper(sleeper.clone());
    controller.initialize(
        SessionParameters::default(),
        Box::new(FakeFactory::new().with_browser(&slow)),
    );

    // Leave the session quitting with a browser that never finishes.
    let (_, valid) = controller
        .execute_command(&Command::new("quit").to_json())
        .unwrap();
    assert!(!valid);

    controller.shut_down();

    // The quit poll slept its fixed interval at most the bounded number
    // of times, then shutdown proceeded anyway.
    let quit_sleeps = sleeper
        .durations()
        .iter()
        .filter(|d| **d == Duration::from_millis(100))
        .count();
    assert!(quit_sleeps > 0, "stalled teardown must be polled");
    assert!(quit_sleeps <= 50, "quit poll must stay bounded");
    assert!(controller.session_id().is_empty());
}

#[test]
fn test_execute_after_shut_down_is_a_typed_error() {
    let dir = TempDir::new().unwrap();
    let mut controller = initialized_controller(&dir, FakeFactory::new());
    controller.shut_down();

    assert!(matches!(
        controller.execute_command(&Command::new("quit").to_json()),
        Err(SessionError::NotInitialized)
    ));
    assert!(controller.session_id().is_empty());
}

#[test]
fn test_shut_down_twice_is_safe() {
    let dir = TempDir::new().unwrap();
    let mut controller = initialized_controller(&dir, FakeFactory::new());
    controller.shut_down();
    controller.shut_down();
}
