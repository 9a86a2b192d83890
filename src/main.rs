use clap::Parser;
use crossbeam_channel::unbounded;
use netbadge::app::{self, RefreshController};
use netbadge::cli::Cli;
use netbadge::config::ConfigStore;
use netbadge::diagnostics::{Diagnostic, Lookup};
use netbadge::error::BadgeError;
use netbadge::monitor::{
    HttpLocation, InterfaceWatcher, LocationPort, LocationResolver, NetworkStateReader, Nmcli,
    NmcliMonitor, NotificationPort,
};
use netbadge::presenter::{spawn_stdin_reader, StdoutPresenter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const INTERFACE_POLL: Duration = Duration::from_secs(5);

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(
            libc::SIGTERM,
            signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGINT,
            signal_handler as *const () as libc::sighandler_t,
        );
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| run(cli)));

    match result {
        Ok(Ok(())) => std::process::exit(0),
        Ok(Err(e)) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("error: fatal: unexpected panic");
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<(), BadgeError> {
    install_signal_handlers();
    let settings = cli.settings();

    // Load problems are reported again by the startup pass.
    let (config, _) = ConfigStore::open(&settings.colors_path);
    let first_network = config
        .snapshot()
        .network_order
        .first()
        .cloned()
        .unwrap_or_default();
    log::info!("colors from {}", config.path().display());

    let network = NetworkStateReader::new(
        Box::new(Nmcli::new(settings.command_timeout)),
        first_network,
    );
    let (location, location_failure) = match &settings.location_endpoint {
        Some(endpoint) => LocationResolver::from_port(
            HttpLocation::new(endpoint.clone(), settings.command_timeout)
                .map(|port| Box::new(port) as Box<dyn LocationPort>),
        ),
        None => (LocationResolver::disabled(), None),
    };
    if !location.is_enabled() {
        log::info!("location lookup disabled");
    }

    let mut sources: Vec<Box<dyn NotificationPort>> = vec![Box::new(NmcliMonitor)];
    if settings.watch_interfaces {
        sources.push(Box::new(InterfaceWatcher::new(INTERFACE_POLL)));
    }

    let presenter = Box::new(StdoutPresenter::new(cli.format));
    let mut controller = RefreshController::new(settings, config, network, location, presenter);
    if let Some(diagnostic) = location_failure {
        controller.record(diagnostic);
    }

    let (signal_tx, signal_rx) = unbounded();
    for mut source in sources {
        match source.subscribe(signal_tx.clone()) {
            Ok(subscription) => controller.attach(subscription),
            Err(e) => controller.record(Diagnostic::LookupFailure {
                lookup: Lookup::Notification,
                reason: e.to_string(),
            }),
        }
    }
    drop(signal_tx);

    let (command_tx, command_rx) = unbounded();
    spawn_stdin_reader(command_tx)
        .map_err(|e| BadgeError::Fatal(format!("spawn stdin reader: {e}")))?;

    app::run_event_loop(&mut controller, signal_rx, command_rx, &SHUTDOWN_REQUESTED);
    Ok(())
}
