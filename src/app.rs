use crate::config::{ConfigStore, Settings};
use crate::diagnostics::{Diagnostic, DiagnosticLog, Lookup};
use crate::identity::IdentityResolver;
use crate::label::LabelComposer;
use crate::model::{Frame, ResolvedIdentity};
use crate::monitor::{LocationResolver, NetworkStateReader, Signal, Subscription};
use crate::presenter::{Presenter, ShellCommand};
use crate::schedule::{Pass, Scheduler, Slot, Step};
use crossbeam_channel::{never, select, Receiver};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest the loop sleeps before checking for shutdown.
const MAX_IDLE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Refreshing,
    Stopped,
}

/// Drives every refresh: timers, network signals and shell requests.
pub struct RefreshController {
    settings: Settings,
    config: ConfigStore,
    network: NetworkStateReader,
    location: LocationResolver,
    presenter: Box<dyn Presenter>,
    scheduler: Scheduler,
    diagnostics: DiagnosticLog,
    subscriptions: Vec<Subscription>,
    state: ControllerState,
    tick: u64,
    next_periodic: Option<Instant>,
}

impl RefreshController {
    pub fn new(
        settings: Settings,
        config: ConfigStore,
        network: NetworkStateReader,
        location: LocationResolver,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        Self {
            settings,
            config,
            network,
            location,
            presenter,
            scheduler: Scheduler::new(),
            diagnostics: DiagnosticLog::default(),
            subscriptions: Vec::new(),
            state: ControllerState::Idle,
            tick: 0,
            next_periodic: None,
        }
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.record(diagnostic);
    }

    pub fn attach(&mut self, subscription: Subscription) {
        log::info!("subscribed to {}", subscription.name());
        self.subscriptions.push(subscription);
    }

    /// Initial full pass, then arm the periodic timer.
    pub fn start(&mut self, now: Instant) {
        if self.state == ControllerState::Stopped {
            return;
        }
        self.run_pass(Pass::Full);
        self.next_periodic = Some(now + self.settings.poll_interval);
    }

    /// Run whatever is due at `now`: queued delayed passes, then the
    /// periodic timer.
    pub fn advance(&mut self, now: Instant) {
        if self.state == ControllerState::Stopped {
            return;
        }
        for (slot, pass) in self.scheduler.take_due(now) {
            log::debug!("running {pass:?} pass queued by {slot:?}");
            self.run_pass(pass);
        }
        if let Some(due) = self.next_periodic {
            if due <= now {
                self.run_pass(Pass::Periodic);
                self.next_periodic = Some(now + self.settings.poll_interval);
            }
        }
    }

    pub fn next_wakeup(&self) -> Option<Instant> {
        match (self.next_periodic, self.scheduler.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// React to a network-state signal by queueing the settle and full
    /// passes. A burst of signals keeps pushing both back.
    pub fn on_signal(&mut self, name: &str, now: Instant) {
        if self.state == ControllerState::Stopped {
            return;
        }
        let signal = Signal::from_name(name);
        if !signal.is_network_change() {
            self.diagnostics
                .record(Diagnostic::UnknownSignal(name.to_string()));
            return;
        }
        log::debug!("{signal:?}: scheduling refresh");
        for (slot, delay, pass) in self.signal_plan() {
            self.scheduler.schedule(slot, now + delay, pass);
        }
    }

    fn signal_plan(&self) -> [(Slot, Duration, Pass); 2] {
        [
            (Slot::SignalSettle, self.settings.settle_delay, Pass::Settle),
            (Slot::SignalFull, self.settings.full_refresh_delay, Pass::Full),
        ]
    }

    /// Ask for `identity` and return immediately; the label follows the
    /// signals the switch produces.
    pub fn on_switch_requested(&mut self, identity: &str, now: Instant) {
        if self.state == ControllerState::Stopped {
            return;
        }
        self.request_switch(identity);
        self.presenter.close_menu();
        self.scheduler.schedule(
            Slot::SwitchFollowUp,
            now + self.settings.switch_follow_up,
            Pass::Settle,
        );
    }

    /// Switch to the network after the current one in file order.
    pub fn on_cycle_requested(&mut self, now: Instant) {
        if self.state == ControllerState::Stopped {
            return;
        }
        let current = self.network.current_network();
        let tables = self.config.snapshot();
        let Some(target) = cycle_target(&tables.network_order, &current).map(str::to_string)
        else {
            self.diagnostics.record(Diagnostic::EmptyCycle);
            return;
        };
        self.request_switch(&target);
        self.scheduler.schedule(
            Slot::CycleFollowUp,
            now + self.settings.cycle_follow_up,
            Pass::Settle,
        );
    }

    pub fn on_command(&mut self, command: ShellCommand, now: Instant) {
        match command {
            ShellCommand::Switch(identity) => self.on_switch_requested(&identity, now),
            ShellCommand::Cycle => self.on_cycle_requested(now),
            ShellCommand::Refresh => self.run_pass(Pass::Full),
            ShellCommand::Quit => self.shutdown(),
        }
    }

    fn request_switch(&mut self, identity: &str) {
        log::info!("switching to {identity}");
        match self.network.switch_to(identity) {
            Ok(()) => {
                self.network.remember(identity);
                self.run_pass(Pass::Redraw);
            }
            Err(e) => self.diagnostics.record(Diagnostic::LookupFailure {
                lookup: Lookup::Switch,
                reason: e.to_string(),
            }),
        }
    }

    /// Cancel every timer and subscription. Nothing runs afterwards.
    pub fn shutdown(&mut self) {
        if self.state == ControllerState::Stopped {
            return;
        }
        let timers = self.scheduler.cancel_all();
        self.next_periodic = None;
        for subscription in &mut self.subscriptions {
            subscription.cancel();
        }
        self.subscriptions.clear();
        self.state = ControllerState::Stopped;
        log::info!("stopped ({timers} pending timer(s) cancelled)");
    }

    pub fn run_pass(&mut self, pass: Pass) {
        if self.state == ControllerState::Stopped {
            return;
        }
        self.state = ControllerState::Refreshing;
        self.tick += 1;
        for &step in pass.steps() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_step(step)));
            if outcome.is_err() {
                self.diagnostics
                    .record(Diagnostic::StepPanicked(step.name()));
            }
        }
        self.state = ControllerState::Idle;
    }

    fn run_step(&mut self, step: Step) {
        match step {
            Step::ReloadConfig => {
                let diagnostics = self.config.reload();
                self.diagnostics.extend(diagnostics);
            }
            Step::FetchLocation => {
                if let Err(e) = self.location.fetch(self.tick) {
                    self.diagnostics.record(Diagnostic::LookupFailure {
                        lookup: Lookup::Location,
                        reason: e.to_string(),
                    });
                }
            }
            Step::ReadNetwork => {
                if let Err(e) = self.network.refresh() {
                    self.diagnostics.record(Diagnostic::LookupFailure {
                        lookup: Lookup::Network,
                        reason: e.to_string(),
                    });
                }
            }
            Step::Render => {
                let frame = self.frame();
                self.presenter.present(&frame);
            }
        }
    }

    pub fn resolved(&self) -> ResolvedIdentity {
        IdentityResolver::compose(&self.network, &self.location, &self.config).identity
    }

    pub fn frame(&self) -> Frame {
        let composition = IdentityResolver::compose(&self.network, &self.location, &self.config);
        LabelComposer::frame(&composition.identity, &composition.tables)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

/// The network after `current` in `order`, wrapping around. Starts from the
/// first entry when `current` is not listed.
pub fn cycle_target<'a>(order: &'a [String], current: &str) -> Option<&'a str> {
    if order.is_empty() {
        return None;
    }
    let next = order
        .iter()
        .position(|name| name == current)
        .map_or(0, |idx| (idx + 1) % order.len());
    Some(order[next].as_str())
}

enum Wake {
    Signal(Option<String>),
    Command(Option<ShellCommand>),
    Timer,
}

/// Single-threaded event loop. Returns once `shutdown` is set or the shell
/// asks to quit.
pub fn run_event_loop(
    controller: &mut RefreshController,
    signals: Receiver<String>,
    commands: Receiver<ShellCommand>,
    shutdown: &AtomicBool,
) {
    let mut signals = signals;
    let mut commands = commands;
    controller.start(Instant::now());

    while controller.state() != ControllerState::Stopped {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        controller.advance(Instant::now());

        let wait = controller
            .next_wakeup()
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(MAX_IDLE)
            .min(MAX_IDLE);

        let wake = select! {
            recv(signals) -> msg => Wake::Signal(msg.ok()),
            recv(commands) -> msg => Wake::Command(msg.ok()),
            default(wait) => Wake::Timer,
        };
        match wake {
            Wake::Signal(Some(name)) => controller.on_signal(&name, Instant::now()),
            Wake::Signal(None) => {
                log::warn!("all notification sources closed; relying on the periodic timer");
                signals = never();
            }
            Wake::Command(Some(command)) => controller.on_command(command, Instant::now()),
            Wake::Command(None) => commands = never(),
            Wake::Timer => {}
        }
    }

    controller.shutdown();
}
