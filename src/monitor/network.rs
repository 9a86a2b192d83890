use super::{run_with_timeout, NetworkPort};
use crate::error::BadgeError;
use crate::model::NetworkStatus;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

const NMCLI: &str = "nmcli";

/// NetworkManager command-line client.
pub struct Nmcli {
    timeout: Duration,
}

impl Nmcli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl NetworkPort for Nmcli {
    fn query_active(&mut self) -> Result<Vec<NetworkStatus>, BadgeError> {
        let out = run_with_timeout(
            NMCLI,
            &["-t", "-f", "active,ssid", "dev", "wifi"],
            self.timeout,
        )?;
        Ok(parse_active_lines(&out))
    }

    fn switch_to(&mut self, identity: &str) -> Result<(), BadgeError> {
        let mut child = Command::new(NMCLI)
            .args(["con", "up", identity])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BadgeError::Command {
                command: format!("{NMCLI} con up {identity}"),
                detail: e.to_string(),
            })?;

        // Reap the child off the loop thread.
        let target = identity.to_string();
        thread::Builder::new()
            .name("netbadge-switch".into())
            .spawn(move || match child.wait() {
                Ok(status) if status.success() => log::info!("switched to {target}"),
                Ok(status) => log::warn!("switch to {target} exited with {status}"),
                Err(e) => log::warn!("switch to {target}: {e}"),
            })
            .map_err(|e| BadgeError::Fatal(format!("spawn switch reaper: {e}")))?;
        Ok(())
    }
}

/// Parse `nmcli -t` output of the form `flag:ssid`, one network per line.
///
/// Terse mode escapes colons inside values as `\:`.
pub fn parse_active_lines(out: &str) -> Vec<NetworkStatus> {
    out.lines()
        .filter_map(|line| {
            let line = line.trim_end_matches('\r');
            let (flag, ssid) = line.split_once(':')?;
            Some(NetworkStatus {
                identity: unescape_terse(ssid.trim()),
                active: flag.trim().eq_ignore_ascii_case("yes"),
            })
        })
        .collect()
}

fn unescape_terse(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Tracks which network is in use, remembering the last definite answer.
pub struct NetworkStateReader {
    port: Box<dyn NetworkPort>,
    last_known: String,
}

impl NetworkStateReader {
    pub fn new(port: Box<dyn NetworkPort>, initial: impl Into<String>) -> Self {
        Self {
            port,
            last_known: initial.into(),
        }
    }

    /// Query the port and update the sticky identity. When nothing is active
    /// the previous identity is kept and `Ok` is still returned.
    pub fn refresh(&mut self) -> Result<&str, BadgeError> {
        let statuses = self.port.query_active()?;
        if let Some(active) = statuses
            .into_iter()
            .find(|s| s.active && !s.identity.is_empty())
        {
            self.last_known = active.identity;
        }
        Ok(&self.last_known)
    }

    /// Query and return the current network, falling back to the sticky
    /// identity on failure.
    pub fn current_network(&mut self) -> String {
        if let Err(e) = self.refresh() {
            log::debug!("network query failed, keeping {:?}: {e}", self.last_known);
        }
        self.last_known.clone()
    }

    pub fn last_known(&self) -> &str {
        &self.last_known
    }

    pub fn remember(&mut self, identity: &str) {
        self.last_known = identity.to_string();
    }

    pub fn switch_to(&mut self, identity: &str) -> Result<(), BadgeError> {
        self.port.switch_to(identity)
    }
}
