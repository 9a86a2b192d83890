use serde::Serialize;

/// Public-facing location of the host as last reported by the lookup service.
///
/// Empty strings mean "unknown"; they are not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocationSnapshot {
    pub country_code: String,
    pub public_ip: String,
    pub asn_org: String,
    pub fetched_at_tick: u64,
}

impl LocationSnapshot {
    pub fn is_unknown(&self) -> bool {
        self.country_code.is_empty() && self.public_ip.is_empty()
    }
}

/// Render-ready view of the current network and location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub network: String,
    pub location: LocationSnapshot,
}

/// One selectable network in the shell's menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub name: String,
    pub color: String,
}

/// Everything the presentation shell receives for one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub text: String,
    /// Styling hook for the bar: `located` or `unknown`.
    pub class: &'static str,
    pub menu: Vec<MenuEntry>,
}

/// One line of the network query: an identity and whether it is in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkStatus {
    pub identity: String,
    pub active: bool,
}
