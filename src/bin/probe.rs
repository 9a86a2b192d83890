use netbadge::config::{ConfigStore, DEFAULT_LOCATION_ENDPOINT};
use netbadge::monitor::location::parse_location;
use netbadge::monitor::{HttpLocation, LocationPort, NetworkPort, Nmcli};
use std::path::PathBuf;
use std::time::Duration;

fn main() {
    let timeout = Duration::from_secs(3);

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(netbadge::config::default_colors_path);
    let report = ConfigStore::load(&path);
    println!(
        "colors {}: {} network(s), {} countr(ies), {} ip(s), {} org(s)",
        path.display(),
        report.tables.network_order.len(),
        report.tables.countries.len(),
        report.tables.ips.len(),
        report.tables.asn_orgs.len()
    );
    for diagnostic in &report.diagnostics {
        println!("  {diagnostic}");
    }

    match Nmcli::new(timeout).query_active() {
        Ok(statuses) => {
            for status in statuses {
                println!("network: {:?} active={}", status.identity, status.active);
            }
        }
        Err(e) => println!("network query failed: {e}"),
    }

    let fetched = HttpLocation::new(DEFAULT_LOCATION_ENDPOINT, timeout)
        .and_then(|mut port| port.fetch())
        .and_then(|body| parse_location(&body, 0));
    match fetched {
        Ok(snapshot) => println!("location: {snapshot:?}"),
        Err(e) => println!("location lookup failed: {e}"),
    }
}
