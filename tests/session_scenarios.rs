//! End-to-end scenarios for the RN-42 session.
//!
//! Each test scripts a [`SimulatedModule`] with the exact byte exchanges a
//! real module would produce and checks the session's resulting belief about
//! the module's mode.

use rn42::{MemorySink, MessageSeverity, Mode, RadioSession, SimulatedModule};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn session_with_sink(sim: SimulatedModule) -> (RadioSession<SimulatedModule>, MemorySink) {
    let sink = MemorySink::new();
    let mut session = RadioSession::new(sim);
    session.attach_console(sink.clone());
    (session, sink)
}

fn command_mode(sim: SimulatedModule) -> RadioSession<SimulatedModule> {
    let mut session = RadioSession::new(sim);
    assert!(session.enter_command_mode().unwrap());
    session
}

// ---------------------------------------------------------------------------
// Mode transitions
// ---------------------------------------------------------------------------

/// `$$$` unanswered, but a bare newline gets `?`: the module was already
/// in command mode.
#[test]
fn enter_command_mode_recovers_through_newline_check() {
    let sim = SimulatedModule::new()
        .expect_silent("$$$")
        .expect("\n", "?\r\n");
    let (mut session, sink) = session_with_sink(sim);

    assert!(session.enter_command_mode().unwrap());
    assert_eq!(session.mode(), Mode::Command);
    assert_eq!(session.transport().written(), vec!["$$$", "\n"]);
    assert!(sink
        .messages()
        .iter()
        .any(|m| m.message.contains("Maybe in command mode already?")));
}

/// After every successful transition the believed mode is the one the last
/// acknowledgment implies.
#[test]
fn believed_mode_tracks_acknowledgments() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD\r\n")
        .expect("---\n", "END\r\n")
        .expect_silent("---\n")
        .expect("$$$", "CMD\r\n")
        .expect("---\n", "END\r\n")
        .expect_silent("$$$")
        .expect("\n", "?")
        .expect("---\n", "END");
    let mut session = RadioSession::new(sim);

    assert!(session.enter_command_mode().unwrap());
    assert_eq!(session.mode(), Mode::Command);
    assert!(session.enter_data_mode().unwrap());
    assert_eq!(session.mode(), Mode::Data);
    // desync: the module is actually in command mode
    assert!(session.enter_data_mode().unwrap());
    assert_eq!(session.mode(), Mode::Data);
    assert!(session.enter_command_mode().unwrap());
    assert_eq!(session.mode(), Mode::Command);
    assert!(session.enter_data_mode().unwrap());
    assert_eq!(session.mode(), Mode::Data);

    assert_eq!(session.transport().remaining(), 0);
    assert!(session.transport().unmatched().is_empty());
}

/// Noise before and after an acknowledgment does not change the outcome.
#[test]
fn acknowledgment_tolerates_noise() {
    for noise in ["", "\r\n", "xx", "%DISCONNECT\r\n", "?"] {
        let reply = format!("{noise}CMD{noise}");
        let mut session = RadioSession::new(SimulatedModule::new().expect("$$$", &reply));
        assert!(session.enter_command_mode().unwrap(), "reply {reply:?}");
        assert_eq!(session.mode(), Mode::Command);
    }
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

/// Module has no escape sequence: write `%`, verify it, reboot.
#[test]
fn init_defines_missing_escape_sequence() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD\r\n")
        .expect("GO\n", "NULL\r\n")
        .expect("SO,%\n", "AOK\r\n")
        .expect("GO\n", "%\r\n")
        .expect("R,1\n", "Reboot!\r\n");
    let (mut session, sink) = session_with_sink(sim);

    assert!(session.init().unwrap());
    assert_eq!(session.mode(), Mode::Data);
    assert_eq!(session.escape_sequence(), "%");
    assert_eq!(
        session.transport().written(),
        vec!["$$$", "GO\n", "SO,%\n", "GO\n", "R,1\n"]
    );
    assert_eq!(
        sink.messages()[0].message,
        "extended status string undefined.  Setting to default value."
    );
}

/// Module already reports `%`: init runs twice with the same outcome and no
/// non-default warning.
#[test]
fn init_is_idempotent_with_default_escape_sequence() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD\r\n")
        .expect("GO\n", "%\r\n")
        .expect("$$$", "CMD\r\n")
        .expect("GO\n", "%\r\n");
    let (mut session, sink) = session_with_sink(sim);

    assert!(session.init().unwrap());
    let first = (session.mode(), session.escape_sequence().to_string());

    assert!(session.init().unwrap());
    let second = (session.mode(), session.escape_sequence().to_string());

    assert_eq!(first, second);
    assert_eq!(first, (Mode::Command, "%".to_string()));
    assert!(sink
        .messages()
        .iter()
        .all(|m| m.severity != MessageSeverity::Warning));
}

/// A failed reboot acknowledgment makes init fail.
#[test]
fn init_fails_without_reboot_ack() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD")
        .expect("GO\n", "NULL")
        .expect("SO,%\n", "AOK")
        .expect("GO\n", "%")
        .expect_silent("R,1\n");
    let mut session = RadioSession::new(sim);

    assert!(!session.init().unwrap());
}

// ---------------------------------------------------------------------------
// Connection handshake
// ---------------------------------------------------------------------------

/// `TRYING`, then a connect frame three poll intervals later.
#[test]
fn connect_succeeds_on_connect_frame() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD\r\n")
        .expect_then(
            "C\n",
            &[(0, "TRYING\r\n"), (1_750, "%CONNECT,0006664F1A2B,0\r\n")],
        );
    let mut session = command_mode(sim);

    assert!(session.connect().unwrap());
    assert_eq!(session.mode(), Mode::Data);
}

/// `TRYING`, then `failed`: back in command mode.
#[test]
fn connect_fails_on_failed_marker() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD\r\n")
        .expect_then("C\n", &[(0, "TRYING\r\n"), (1_750, "CONNECT failed\r\n")]);
    let mut session = command_mode(sim);

    assert!(!session.connect().unwrap());
    assert_eq!(session.mode(), Mode::Command);
}

/// `TRYING`, then silence for the whole poll budget.
#[test]
fn connect_times_out_quietly() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD\r\n")
        .expect("C\n", "TRYING\r\n");
    let (mut session, sink) = session_with_sink(sim);
    assert!(session.enter_command_mode().unwrap());

    let before = session.transport().now();
    assert!(!session.connect().unwrap());
    let waited = session.transport().now() - before;

    // mode stays where it was, the outcome is reported as ambiguous
    assert_eq!(session.mode(), Mode::Command);
    assert!(waited >= Duration::from_millis(200 + 10 * 500));
    assert!(sink
        .messages()
        .iter()
        .any(|m| m.message.contains("module state unknown")));
}

/// A frame arriving after the poll budget is not picked up.
#[test]
fn connect_frame_after_budget_is_ignored() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD\r\n")
        .expect_then("C\n", &[(0, "TRYING\r\n"), (6_000, "%CONNECT,0006664F1A2B,0")]);
    let mut session = command_mode(sim);

    assert!(!session.connect().unwrap());
    assert_eq!(session.mode(), Mode::Command);
}

/// Faster polling configuration shrinks the wait window.
#[test]
fn connect_respects_configured_poll_budget() {
    let config = rn42::RadioConfig {
        connect_poll_interval: Duration::from_millis(100),
        connect_poll_attempts: 3,
        ..Default::default()
    };
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD")
        .expect("C\n", "TRYING");
    let mut session = RadioSession::with_config(sim, config);
    assert!(session.enter_command_mode().unwrap());

    let before = session.transport().now();
    assert!(!session.connect().unwrap());
    let waited = session.transport().now() - before;
    assert!(waited < Duration::from_millis(600));
}

// ---------------------------------------------------------------------------
// Data relay
// ---------------------------------------------------------------------------

/// Payload goes out unchanged and incoming text comes back whole.
#[test]
fn relay_round_trip_until_disconnect() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD\r\n")
        .expect_then(
            "C,0006664F1A2B\n",
            &[(0, "TRYING\r\n"), (300, "%CONNECT,0006664F1A2B,0\r\n")],
        )
        .expect_then("ping", &[(20, "pong"), (900, "%DISCONNECT\r\n")]);
    let mut session = command_mode(sim);

    assert!(session.connect_to_address("0006664F1A2B").unwrap());
    session.send("ping").unwrap();

    assert_eq!(session.receive(Duration::from_millis(200)).unwrap(), "pong");
    assert!(!session.disconnect_seen());

    let tail = session.receive(Duration::from_millis(1_000)).unwrap();
    assert_eq!(tail, "%DISCONNECT\r\n");
    assert!(session.disconnect_seen());
    // no automatic resync; callers re-run mode detection
    assert_eq!(session.mode(), Mode::Data);
}

/// A session can be cancelled from another thread while it spins.
#[test]
fn cancel_interrupts_long_receive() {
    let sim = SimulatedModule::new().with_tick(Duration::from_micros(1));
    let mut session = RadioSession::new(sim);
    let token = session.cancel_token();

    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        token.cancel();
    });

    let result = session.receive(Duration::from_secs(3_600));
    canceller.join().unwrap();

    assert!(matches!(result, Err(rn42::RadioError::Cancelled)));
}

// ---------------------------------------------------------------------------
// Host flows
// ---------------------------------------------------------------------------

/// The status query right after init reuses the command mode init left the
/// module in, and returns to data mode afterwards.
#[test]
fn status_query_after_init() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD\r\n")
        .expect("GO\n", "%\r\n")
        .expect("GK\n", "1,0,0\r\n")
        .expect("---\n", "END\r\n");
    let (mut session, sink) = session_with_sink(sim);

    assert!(session.init().unwrap());
    assert!(session.ensure_command_mode().unwrap());
    assert!(session.is_connected().unwrap());
    assert!(session.ensure_data_mode().unwrap());

    assert_eq!(session.mode(), Mode::Data);
    assert_eq!(session.transport().remaining(), 0);
    assert_eq!(
        session.transport().written(),
        vec!["$$$", "GO\n", "GK\n", "---\n"]
    );
    assert!(sink
        .messages()
        .iter()
        .all(|m| m.severity != MessageSeverity::Warning));
}

/// A module that answers neither `$$$` nor a bare newline makes the mode
/// switch report failure instead of letting a status query run blind.
#[test]
fn status_query_stops_when_command_mode_unreachable() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD\r\n")
        .expect("GO\n", "%\r\n")
        .expect("---\n", "END\r\n")
        .expect_silent("$$$")
        .expect_silent("\n");
    let mut session = RadioSession::new(sim);

    assert!(session.init().unwrap());
    assert!(session.enter_data_mode().unwrap());
    assert!(!session.ensure_command_mode().unwrap());
    assert_eq!(session.mode(), Mode::Data);
    assert!(!session.transport().written().contains(&"GK\n".to_string()));
}

/// After init reboots the module, the session waits out the boot before
/// the next command goes out.
#[test]
fn commands_follow_boot_wait() {
    let sim = SimulatedModule::new()
        .expect("$$$", "CMD")
        .expect("GO\n", "NULL")
        .expect("SO,%\n", "AOK")
        .expect("GO\n", "%")
        .expect("R,1\n", "Reboot!")
        .expect("$$$", "CMD");
    let config = rn42::RadioConfig {
        boot_delay: Duration::from_millis(800),
        ..Default::default()
    };
    let mut session = RadioSession::with_config(sim, config);

    assert!(session.init().unwrap());
    assert!(session.awaiting_boot());
    let before = session.transport().now();
    session.wait_for_boot().unwrap();
    assert!(session.transport().now() - before >= Duration::from_millis(800));

    assert!(session.ensure_command_mode().unwrap());
    assert_eq!(session.transport().remaining(), 0);
}
