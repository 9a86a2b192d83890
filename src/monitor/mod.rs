pub mod events;
pub mod location;
pub mod network;

use crate::error::BadgeError;
use crate::model::NetworkStatus;
use crossbeam_channel::Sender;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub use events::{InterfaceWatcher, NmcliMonitor, Signal};
pub use location::{HttpLocation, LocationResolver};
pub use network::{Nmcli, NetworkStateReader};

/// Queries and switches the host's networks.
pub trait NetworkPort {
    fn query_active(&mut self) -> Result<Vec<NetworkStatus>, BadgeError>;

    /// Request a switch. Returns once the request is handed off; it does not
    /// wait for the switch to finish.
    fn switch_to(&mut self, identity: &str) -> Result<(), BadgeError>;
}

/// Fetches the raw JSON document describing the public location.
pub trait LocationPort {
    fn fetch(&mut self) -> Result<String, BadgeError>;
}

/// Source of network-state signals. Each signal is delivered as its name.
pub trait NotificationPort {
    fn subscribe(&mut self, sink: Sender<String>) -> Result<Subscription, BadgeError>;
}

/// Handle to a live notification subscription. Cancelled on drop.
pub struct Subscription {
    name: &'static str,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(name: &'static str, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            log::debug!("unsubscribing from {}", self.name);
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run `program` and collect its stdout, killing it if it has not finished
/// within `timeout`.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, BadgeError> {
    let command = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    let failed = |detail: String| BadgeError::Command {
        command: command.clone(),
        detail,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| failed(e.to_string()))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| failed("stdout not captured".to_string()))?;

    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("netbadge-cmd".into())
        .spawn(move || {
            let mut out = String::new();
            let result = stdout.read_to_string(&mut out).map(|_| out);
            let _ = tx.send(result);
        })
        .map_err(|e| failed(format!("spawn reader thread: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(out)) => {
            let status = child.wait().map_err(|e| failed(e.to_string()))?;
            if status.success() {
                Ok(out)
            } else {
                Err(failed(status.to_string()))
            }
        }
        Ok(Err(e)) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(failed(e.to_string()))
        }
        Err(_) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(BadgeError::Timeout {
                command: command.clone(),
                timeout,
            })
        }
    }
}
