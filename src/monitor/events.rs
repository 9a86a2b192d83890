use super::{NotificationPort, Subscription};
use crate::error::BadgeError;
use crossbeam_channel::{bounded, select, Sender};
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use sysinfo::Networks;

pub const STATE_CHANGED: &str = "StateChanged";
pub const DEVICE_ADDED: &str = "DeviceAdded";
pub const DEVICE_REMOVED: &str = "DeviceRemoved";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    StateChanged,
    DeviceAdded,
    DeviceRemoved,
    Other(String),
}

impl Signal {
    pub fn from_name(name: &str) -> Self {
        match name {
            STATE_CHANGED => Signal::StateChanged,
            DEVICE_ADDED => Signal::DeviceAdded,
            DEVICE_REMOVED => Signal::DeviceRemoved,
            other => Signal::Other(other.to_string()),
        }
    }

    pub fn is_network_change(&self) -> bool {
        !matches!(self, Signal::Other(_))
    }
}

/// Follows `nmcli monitor` and turns each status line into a signal name.
pub struct NmcliMonitor;

impl NotificationPort for NmcliMonitor {
    fn subscribe(&mut self, sink: Sender<String>) -> Result<Subscription, BadgeError> {
        let mut child = Command::new("nmcli")
            .arg("monitor")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BadgeError::Notification(format!("nmcli monitor: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BadgeError::Notification("nmcli monitor: no stdout".into()))?;

        let reader = thread::Builder::new()
            .name("netbadge-nm-monitor".into())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if let Some(name) = classify_monitor_line(&line) {
                        if sink.send(name.to_string()).is_err() {
                            break;
                        }
                    }
                }
                log::debug!("nmcli monitor stream closed");
            });
        if let Err(e) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(BadgeError::Notification(format!("spawn monitor reader: {e}")));
        }

        Ok(Subscription::new("nmcli monitor", move || {
            let _ = child.kill();
            let _ = child.wait();
        }))
    }
}

/// Map one `nmcli monitor` line to a signal name.
pub fn classify_monitor_line(line: &str) -> Option<&'static str> {
    let line = line.trim();
    if line.is_empty() {
        None
    } else if line.ends_with("device created") {
        Some(DEVICE_ADDED)
    } else if line.ends_with("device removed") {
        Some(DEVICE_REMOVED)
    } else {
        Some(STATE_CHANGED)
    }
}

/// Polls the interface list and reports interfaces that appear or vanish.
pub struct InterfaceWatcher {
    interval: Duration,
}

impl InterfaceWatcher {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl NotificationPort for InterfaceWatcher {
    fn subscribe(&mut self, sink: Sender<String>) -> Result<Subscription, BadgeError> {
        let interval = self.interval;
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("netbadge-ifwatch".into())
            .spawn(move || {
                let mut networks = Networks::new_with_refreshed_list();
                let mut known = interface_names(&networks);
                loop {
                    let stopped = select! {
                        recv(stop_rx) -> _ => true,
                        default(interval) => false,
                    };
                    if stopped {
                        break;
                    }
                    networks.refresh(true);
                    let current = interface_names(&networks);
                    for name in interface_changes(&known, &current) {
                        if sink.send(name.to_string()).is_err() {
                            return;
                        }
                    }
                    known = current;
                }
            })
            .map_err(|e| BadgeError::Notification(format!("spawn interface watcher: {e}")))?;

        Ok(Subscription::new("interface watcher", move || {
            drop(stop_tx);
            let _ = handle.join();
        }))
    }
}

fn interface_names(networks: &Networks) -> BTreeSet<String> {
    networks.iter().map(|(name, _)| name.to_string()).collect()
}

/// One signal per interface added or removed between two observations.
pub fn interface_changes(before: &BTreeSet<String>, after: &BTreeSet<String>) -> Vec<&'static str> {
    let added = after.difference(before).map(|_| DEVICE_ADDED);
    let removed = before.difference(after).map(|_| DEVICE_REMOVED);
    added.chain(removed).collect()
}
