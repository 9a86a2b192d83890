use crate::config::{default_colors_path, Settings, DEFAULT_LOCATION_ENDPOINT};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "netbadge",
    version,
    about = "Color-coded network identity for status bars"
)]
pub struct Cli {
    /// Color file mapping networks, countries, IPs and ASN orgs to colors
    #[arg(long, env = "NETBADGE_COLORS")]
    pub colors: Option<PathBuf>,

    /// Output format written to stdout
    #[arg(long, default_value = "markup")]
    pub format: OutputFormat,

    /// Seconds between periodic config reloads
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Milliseconds to wait after a network signal before re-reading the network
    #[arg(long, default_value_t = 500)]
    pub settle_ms: u64,

    /// Milliseconds to wait after a network signal before the full refresh
    #[arg(long, default_value_t = 2500)]
    pub refresh_ms: u64,

    /// Milliseconds after a switch request before re-reading the network
    #[arg(long, default_value_t = 2000)]
    pub switch_follow_up_ms: u64,

    /// Milliseconds after a cycle request before re-reading the network
    #[arg(long, default_value_t = 3000)]
    pub cycle_follow_up_ms: u64,

    /// Seconds an external command or lookup may take
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Location lookup endpoint returning country_iso, ip and asn_org
    #[arg(long, default_value = DEFAULT_LOCATION_ENDPOINT)]
    pub endpoint: String,

    /// Never contact the location service
    #[arg(long)]
    pub no_location: bool,

    /// Do not poll the interface list for added or removed devices
    #[arg(long)]
    pub no_watch_interfaces: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pango markup, one line per change
    Markup,
    /// Waybar-style JSON object per change
    Json,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            colors_path: self.colors.clone().unwrap_or_else(default_colors_path),
            poll_interval: Duration::from_secs(self.interval),
            settle_delay: Duration::from_millis(self.settle_ms),
            full_refresh_delay: Duration::from_millis(self.refresh_ms),
            switch_follow_up: Duration::from_millis(self.switch_follow_up_ms),
            cycle_follow_up: Duration::from_millis(self.cycle_follow_up_ms),
            command_timeout: Duration::from_secs(self.timeout),
            location_endpoint: (!self.no_location).then(|| self.endpoint.clone()),
            watch_interfaces: !self.no_watch_interfaces,
        }
    }
}
