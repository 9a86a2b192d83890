//! Controller behavior driven through in-memory ports.
//!
//! Time is passed explicitly, so no test sleeps.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use netbadge::app::{ControllerState, RefreshController};
use netbadge::config::{ConfigStore, Settings};
use netbadge::diagnostics::{Diagnostic, Lookup};
use netbadge::error::BadgeError;
use netbadge::label::NETWORK_GLYPH;
use netbadge::model::{Frame, NetworkStatus};
use netbadge::monitor::{
    LocationPort, LocationResolver, NetworkPort, NetworkStateReader, Subscription,
};
use netbadge::presenter::{Presenter, ShellCommand};
use netbadge::schedule::Slot;
use tempfile::NamedTempFile;

#[derive(Default)]
struct NetState {
    active: Option<String>,
    failing: bool,
    queries: usize,
    switches: Vec<String>,
}

struct FakeNetwork(Rc<RefCell<NetState>>);

impl NetworkPort for FakeNetwork {
    fn query_active(&mut self) -> Result<Vec<NetworkStatus>, BadgeError> {
        let mut state = self.0.borrow_mut();
        state.queries += 1;
        if state.failing {
            return Err(BadgeError::Timeout {
                command: "nmcli".into(),
                timeout: Duration::from_secs(3),
            });
        }
        Ok(state
            .active
            .iter()
            .map(|name| NetworkStatus {
                identity: name.clone(),
                active: true,
            })
            .collect())
    }

    fn switch_to(&mut self, identity: &str) -> Result<(), BadgeError> {
        self.0.borrow_mut().switches.push(identity.to_string());
        Ok(())
    }
}

struct PanickingNetwork;

impl NetworkPort for PanickingNetwork {
    fn query_active(&mut self) -> Result<Vec<NetworkStatus>, BadgeError> {
        panic!("nmcli output exploded");
    }

    fn switch_to(&mut self, _identity: &str) -> Result<(), BadgeError> {
        Ok(())
    }
}

#[derive(Default)]
struct LocState {
    replies: VecDeque<Result<String, String>>,
    calls: usize,
}

struct FakeLocation(Rc<RefCell<LocState>>);

impl LocationPort for FakeLocation {
    fn fetch(&mut self) -> Result<String, BadgeError> {
        let mut state = self.0.borrow_mut();
        state.calls += 1;
        match state.replies.pop_front() {
            Some(Ok(body)) => Ok(body),
            Some(Err(e)) => Err(BadgeError::Location(e)),
            None => Err(BadgeError::Location("unreachable".into())),
        }
    }
}

#[derive(Default)]
struct Shell {
    frames: Vec<Frame>,
    menu_closes: usize,
}

struct RecordingPresenter(Rc<RefCell<Shell>>);

impl Presenter for RecordingPresenter {
    fn present(&mut self, frame: &Frame) {
        self.0.borrow_mut().frames.push(frame.clone());
    }

    fn close_menu(&mut self) {
        self.0.borrow_mut().menu_closes += 1;
    }
}

struct Harness {
    controller: RefreshController,
    net: Rc<RefCell<NetState>>,
    loc: Rc<RefCell<LocState>>,
    shell: Rc<RefCell<Shell>>,
    colors: NamedTempFile,
}

impl Harness {
    fn new(colors: &str) -> Self {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(colors.as_bytes()).unwrap();
        file.flush().unwrap();

        let net = Rc::new(RefCell::new(NetState::default()));
        let loc = Rc::new(RefCell::new(LocState::default()));
        let shell = Rc::new(RefCell::new(Shell::default()));

        let settings = Settings {
            colors_path: file.path().to_path_buf(),
            ..Settings::default()
        };
        let (config, _) = ConfigStore::open(file.path());
        let controller = RefreshController::new(
            settings,
            config,
            NetworkStateReader::new(Box::new(FakeNetwork(Rc::clone(&net))), ""),
            LocationResolver::new(Box::new(FakeLocation(Rc::clone(&loc)))),
            Box::new(RecordingPresenter(Rc::clone(&shell))),
        );
        Self {
            controller,
            net,
            loc,
            shell,
            colors: file,
        }
    }

    fn last_text(&self) -> String {
        self.shell
            .borrow()
            .frames
            .last()
            .map(|f| f.text.clone())
            .unwrap_or_default()
    }

    fn rewrite_colors(&mut self, colors: &str) {
        std::fs::write(self.colors.path(), colors).unwrap();
    }
}

const HOME_ONLY: &str = "networks:\n  home: green\n";

#[test]
fn state_changed_renders_configured_network_without_location() {
    let mut h = Harness::new(HOME_ONLY);
    let t0 = Instant::now();
    h.controller.start(t0);

    h.net.borrow_mut().active = Some("home".into());
    h.controller.on_signal("StateChanged", t0);
    h.controller.advance(t0 + Duration::from_millis(600));

    let text = h.last_text();
    assert!(text.starts_with(NETWORK_GLYPH));
    assert!(text.contains("<span color=\"green\" weight=\"bold\">home</span>"));
    assert_eq!(h.controller.state(), ControllerState::Idle);
}

#[test]
fn signal_queues_settle_then_full_pass() {
    let mut h = Harness::new(HOME_ONLY);
    let t0 = Instant::now();
    h.controller.start(t0);
    assert_eq!(h.loc.borrow().calls, 1);

    h.controller.on_signal("DeviceAdded", t0);
    assert!(h.controller.scheduler().pending(Slot::SignalSettle).is_some());
    assert!(h.controller.scheduler().pending(Slot::SignalFull).is_some());

    h.controller.advance(t0 + Duration::from_millis(600));
    assert_eq!(h.loc.borrow().calls, 1, "settle pass must not fetch location");

    h.controller.advance(t0 + Duration::from_millis(2600));
    assert_eq!(h.loc.borrow().calls, 2);
    assert!(h.controller.scheduler().is_empty());
}

#[test]
fn burst_of_signals_is_debounced() {
    let mut h = Harness::new(HOME_ONLY);
    let t0 = Instant::now();
    h.controller.start(t0);
    let queries_after_start = h.net.borrow().queries;

    h.controller.on_signal("StateChanged", t0);
    h.controller.on_signal("StateChanged", t0 + Duration::from_millis(300));
    h.controller.advance(t0 + Duration::from_millis(600));
    assert_eq!(h.net.borrow().queries, queries_after_start);

    h.controller.advance(t0 + Duration::from_millis(800));
    assert_eq!(h.net.borrow().queries, queries_after_start + 1);
}

#[test]
fn location_failure_keeps_previous_snapshot() {
    let mut h = Harness::new(HOME_ONLY);
    h.loc.borrow_mut().replies.push_back(Ok(
        r#"{"country_iso":"DE","ip":"203.0.113.7","asn_org":"Hetzner Online GmbH"}"#.into(),
    ));
    let t0 = Instant::now();
    h.controller.start(t0);
    let before = h.controller.resolved().location;
    assert_eq!(before.country_code, "DE");

    h.controller.on_signal("StateChanged", t0);
    h.controller.advance(t0 + Duration::from_secs(3));

    assert_eq!(h.loc.borrow().calls, 2);
    assert_eq!(h.controller.resolved().location, before);
    assert_eq!(
        h.controller.diagnostics().lookup_failures(Lookup::Location),
        1
    );
    assert!(h.last_text().starts_with("<span color=\"white\">DE</span> | "));
}

#[test]
fn periodic_timer_reloads_config_but_not_location() {
    let mut h = Harness::new(HOME_ONLY);
    h.net.borrow_mut().active = Some("home".into());
    let t0 = Instant::now();
    h.controller.start(t0);
    assert!(h.last_text().contains("color=\"green\""));

    h.rewrite_colors("networks:\n  home: red\n  office: blue\n");
    h.controller.advance(t0 + Duration::from_secs(29));
    assert!(h.last_text().contains("color=\"green\""));

    h.controller.advance(t0 + Duration::from_secs(30));
    assert!(h.last_text().contains("color=\"red\""));
    assert_eq!(h.shell.borrow().frames.last().unwrap().menu.len(), 2);
    assert_eq!(h.loc.borrow().calls, 1);
    assert_eq!(
        h.controller.next_wakeup(),
        Some(t0 + Duration::from_secs(60))
    );
}

#[test]
fn network_failure_keeps_sticky_identity() {
    let mut h = Harness::new(HOME_ONLY);
    h.net.borrow_mut().active = Some("home".into());
    let t0 = Instant::now();
    h.controller.start(t0);

    h.net.borrow_mut().failing = true;
    h.controller.on_signal("StateChanged", t0);
    h.controller.advance(t0 + Duration::from_millis(600));

    assert_eq!(h.controller.resolved().network, "home");
    assert!(h.last_text().contains(">home</span>"));
    assert_eq!(h.controller.diagnostics().lookup_failures(Lookup::Network), 1);
}

#[test]
fn missing_config_degrades_to_defaults() {
    let mut h = Harness::new("");
    std::fs::remove_file(h.colors.path()).unwrap();
    let t0 = Instant::now();
    h.controller.start(t0);

    assert!(h
        .last_text()
        .ends_with("<span color=\"white\" weight=\"bold\">WiFi</span>"));
    assert!(h
        .controller
        .diagnostics()
        .entries()
        .any(|d| matches!(d, Diagnostic::ConfigUnreadable { .. })));
}

#[test]
fn cycle_switches_to_next_network_and_schedules_follow_up() {
    let mut h = Harness::new("networks:\n  A: red\n  B: green\n  C: blue\n");
    h.net.borrow_mut().active = Some("C".into());
    let t0 = Instant::now();
    h.controller.start(t0);

    h.controller.on_cycle_requested(t0);
    assert_eq!(h.net.borrow().switches, vec!["A".to_string()]);
    assert!(h.controller.scheduler().pending(Slot::CycleFollowUp).is_some());
    assert!(h.last_text().contains("<span color=\"red\" weight=\"bold\">A</span>"));
}

#[test]
fn cycle_with_no_networks_is_diagnosed() {
    let mut h = Harness::new("countries:\n  DE: yellow\n");
    let t0 = Instant::now();
    h.controller.start(t0);
    h.controller.on_cycle_requested(t0);

    assert!(h.net.borrow().switches.is_empty());
    assert!(h
        .controller
        .diagnostics()
        .entries()
        .any(|d| *d == Diagnostic::EmptyCycle));
}

#[test]
fn switch_request_closes_menu_without_waiting() {
    let mut h = Harness::new("networks:\n  home: green\n  office: blue\n");
    h.net.borrow_mut().active = Some("home".into());
    let t0 = Instant::now();
    h.controller.start(t0);

    h.controller
        .on_command(ShellCommand::Switch("office".into()), t0);
    assert_eq!(h.net.borrow().switches, vec!["office".to_string()]);
    assert_eq!(h.shell.borrow().menu_closes, 1);
    assert!(h.last_text().contains(">office</span>"));
    assert!(h.controller.scheduler().pending(Slot::SwitchFollowUp).is_some());
}

#[test]
fn unknown_signal_is_diagnosed_and_ignored() {
    let mut h = Harness::new(HOME_ONLY);
    let t0 = Instant::now();
    h.controller.start(t0);
    h.controller.on_signal("PropertiesChanged", t0);

    assert!(h.controller.scheduler().is_empty());
    assert!(h
        .controller
        .diagnostics()
        .entries()
        .any(|d| *d == Diagnostic::UnknownSignal("PropertiesChanged".into())));
}

#[test]
fn shutdown_cancels_timers_and_subscriptions() {
    let mut h = Harness::new(HOME_ONLY);
    let cancelled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&cancelled);
    h.controller.attach(Subscription::new("fake", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    let t0 = Instant::now();
    h.controller.start(t0);
    h.controller.on_signal("StateChanged", t0);
    let frames_before = h.shell.borrow().frames.len();

    h.controller.on_command(ShellCommand::Quit, t0);
    assert_eq!(h.controller.state(), ControllerState::Stopped);
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.subscription_count(), 0);
    assert!(h.controller.scheduler().is_empty());
    assert_eq!(h.controller.next_wakeup(), None);

    h.controller.on_signal("StateChanged", t0);
    h.controller.advance(t0 + Duration::from_secs(60));
    assert_eq!(h.shell.borrow().frames.len(), frames_before);
}

#[test]
fn panicking_step_is_diagnosed_and_the_pass_still_renders() {
    let mut colors = NamedTempFile::new().unwrap();
    colors.write_all(HOME_ONLY.as_bytes()).unwrap();
    colors.flush().unwrap();
    let shell = Rc::new(RefCell::new(Shell::default()));
    let (config, _) = ConfigStore::open(colors.path());
    let mut controller = RefreshController::new(
        Settings {
            colors_path: colors.path().to_path_buf(),
            ..Settings::default()
        },
        config,
        NetworkStateReader::new(Box::new(PanickingNetwork), "home"),
        LocationResolver::disabled(),
        Box::new(RecordingPresenter(Rc::clone(&shell))),
    );

    controller.start(Instant::now());

    let shell = shell.borrow();
    let frames = &shell.frames;
    assert_eq!(frames.len(), 1);
    assert!(frames[0]
        .text
        .contains("<span color=\"green\" weight=\"bold\">home</span>"));
    assert_eq!(controller.diagnostics().len(), 1);
    assert!(controller
        .diagnostics()
        .entries()
        .any(|d| *d == Diagnostic::StepPanicked("read-network")));
    assert_eq!(controller.state(), ControllerState::Idle);
}
