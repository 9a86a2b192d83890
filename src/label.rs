use crate::config::{ColorTables, Section};
use crate::model::{Frame, LocationSnapshot, ResolvedIdentity};

pub const DEFAULT_NETWORK_TEXT: &str = "WiFi";
pub const NETWORK_GLYPH: &str = "<span alpha=\"50%\">🛜</span> ";
const SEGMENT_SEPARATOR: &str = " | ";
const ELLIPSIS: &str = "...";
const MAX_PLAIN_ADDRESS_LEN: usize = 15;
pub const CLASS_LOCATED: &str = "located";
pub const CLASS_UNKNOWN: &str = "unknown";

pub struct LabelComposer;

impl LabelComposer {
    /// Render the identity as Pango markup: location, glyph, network.
    pub fn render(identity: &ResolvedIdentity, tables: &ColorTables) -> String {
        let mut markup = location_segment(identity, tables);
        markup.push_str(NETWORK_GLYPH);
        markup.push_str(&network_segment(&identity.network, tables));
        markup
    }

    pub fn frame(identity: &ResolvedIdentity, tables: &ColorTables) -> Frame {
        Frame {
            text: Self::render(identity, tables),
            class: location_class(&identity.location),
            menu: tables.menu_entries(),
        }
    }
}

fn location_class(location: &LocationSnapshot) -> &'static str {
    if location.is_unknown() {
        CLASS_UNKNOWN
    } else {
        CLASS_LOCATED
    }
}

fn network_segment(network: &str, tables: &ColorTables) -> String {
    let text = if network.is_empty() {
        DEFAULT_NETWORK_TEXT
    } else {
        network
    };
    format!(
        "<span color=\"{}\" weight=\"bold\">{}</span>",
        escape(tables.color_of(Section::Networks, network)),
        escape(text)
    )
}

/// Empty unless the country or the address is known. Known parts appear in
/// the order country, organization, address.
fn location_segment(identity: &ResolvedIdentity, tables: &ColorTables) -> String {
    let loc = &identity.location;
    if loc.country_code.is_empty() && loc.public_ip.is_empty() {
        return String::new();
    }

    let mut parts = Vec::with_capacity(3);
    if !loc.country_code.is_empty() {
        parts.push(colored(
            tables.color_of(Section::Countries, &loc.country_code),
            &loc.country_code,
        ));
    }
    if let Some(word) = org_first_word(&loc.asn_org) {
        parts.push(colored(asn_color(tables, &loc.asn_org, word), word));
    }
    if !loc.public_ip.is_empty() {
        parts.push(colored(
            tables.color_of(Section::Ips, &loc.public_ip),
            &abbreviate_address(&loc.public_ip),
        ));
    }

    let mut segment = parts.join(SEGMENT_SEPARATOR);
    segment.push(' ');
    segment
}

fn colored(color: &str, text: &str) -> String {
    format!("<span color=\"{}\">{}</span>", escape(color), escape(text))
}

/// Full organization name first, then its display word.
fn asn_color<'a>(tables: &'a ColorTables, org: &str, word: &str) -> &'a str {
    tables
        .asn_orgs
        .get(org)
        .or_else(|| tables.asn_orgs.get(word))
        .map(String::as_str)
        .unwrap_or(crate::config::DEFAULT_COLOR)
}

pub fn org_first_word(org: &str) -> Option<&str> {
    org.split(|c: char| c.is_whitespace() || c == '-')
        .find(|word| !word.is_empty())
}

/// Long colon-separated addresses show only their last group.
pub fn abbreviate_address(address: &str) -> String {
    if address.contains(':') && address.chars().count() > MAX_PLAIN_ADDRESS_LEN {
        let tail = address.rsplit(':').next().unwrap_or_default();
        format!("{ELLIPSIS}{tail}")
    } else {
        address.to_string()
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
