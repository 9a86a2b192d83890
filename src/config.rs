use crate::diagnostics::Diagnostic;
use crate::error::BadgeError;
use crate::model::MenuEntry;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_COLOR: &str = "white";
pub const DEFAULT_LOCATION_ENDPOINT: &str = "https://ifconfig.co/json";
const COLORS_FILE_NAME: &str = ".networks";

pub struct Settings {
    pub colors_path: PathBuf,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    pub full_refresh_delay: Duration,
    pub switch_follow_up: Duration,
    pub cycle_follow_up: Duration,
    pub command_timeout: Duration,
    pub location_endpoint: Option<String>,
    pub watch_interfaces: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            colors_path: default_colors_path(),
            poll_interval: Duration::from_secs(30),
            settle_delay: Duration::from_millis(500),
            full_refresh_delay: Duration::from_millis(2500),
            switch_follow_up: Duration::from_secs(2),
            cycle_follow_up: Duration::from_secs(3),
            command_timeout: Duration::from_secs(3),
            location_endpoint: Some(DEFAULT_LOCATION_ENDPOINT.to_string()),
            watch_interfaces: true,
        }
    }
}

pub fn default_colors_path() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(COLORS_FILE_NAME)
}

pub type ColorMap = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Networks,
    Countries,
    Ips,
    AsnOrgs,
}

impl Section {
    fn from_header(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "networks:" => Some(Section::Networks),
            "countries:" => Some(Section::Countries),
            "ips:" => Some(Section::Ips),
            "asn_orgs:" => Some(Section::AsnOrgs),
            _ => None,
        }
    }
}

/// One generation of the color file. Replaced as a whole on reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorTables {
    pub networks: ColorMap,
    pub countries: ColorMap,
    pub ips: ColorMap,
    pub asn_orgs: ColorMap,
    /// Network names in file order, repeats included.
    pub network_order: Vec<String>,
}

impl ColorTables {
    pub fn map(&self, section: Section) -> &ColorMap {
        match section {
            Section::Networks => &self.networks,
            Section::Countries => &self.countries,
            Section::Ips => &self.ips,
            Section::AsnOrgs => &self.asn_orgs,
        }
    }

    pub fn color_of(&self, section: Section, key: &str) -> &str {
        self.map(section)
            .get(key)
            .map(String::as_str)
            .unwrap_or(DEFAULT_COLOR)
    }

    pub fn menu_entries(&self) -> Vec<MenuEntry> {
        self.network_order
            .iter()
            .map(|name| MenuEntry {
                name: name.clone(),
                color: self.color_of(Section::Networks, name).to_string(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
            && self.countries.is_empty()
            && self.ips.is_empty()
            && self.asn_orgs.is_empty()
    }

    fn insert(&mut self, section: Section, key: String, color: String) {
        if section == Section::Networks {
            self.network_order.push(key.clone());
        }
        let map = match section {
            Section::Networks => &mut self.networks,
            Section::Countries => &mut self.countries,
            Section::Ips => &mut self.ips,
            Section::AsnOrgs => &mut self.asn_orgs,
        };
        map.insert(key, color);
    }
}

/// Parse the color file format.
///
/// Headers open a section; indented lines below them are `key: color`
/// entries. The first unindented non-header line closes the section.
pub fn parse(text: &str) -> (ColorTables, Vec<Diagnostic>) {
    let mut tables = ColorTables::default();
    let mut diagnostics = Vec::new();
    let mut open: Option<Section> = None;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(section) = Section::from_header(trimmed) {
            open = Some(section);
            continue;
        }

        let indented = raw.starts_with(char::is_whitespace);
        let section = match open {
            Some(section) if indented => section,
            _ => {
                open = None;
                continue;
            }
        };

        match split_entry(trimmed) {
            Some((key, color)) => tables.insert(section, key, color),
            None => diagnostics.push(Diagnostic::MalformedEntry {
                line: idx + 1,
                text: trimmed.to_string(),
            }),
        }
    }

    (tables, diagnostics)
}

/// Split on the first colon that is not inside double quotes, so quoted
/// IPv6 addresses survive as keys.
fn split_entry(line: &str) -> Option<(String, String)> {
    let mut quoted = false;
    let sep = line.char_indices().find_map(|(i, c)| match c {
        '"' => {
            quoted = !quoted;
            None
        }
        ':' if !quoted => Some(i),
        _ => None,
    })?;

    let key = unquote(line[..sep].trim()).trim();
    let color = unquote(line[sep + 1..].trim()).trim();
    if key.is_empty() || color.is_empty() {
        return None;
    }
    Some((key.to_string(), color.to_string()))
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

pub struct LoadReport {
    pub tables: ColorTables,
    pub diagnostics: Vec<Diagnostic>,
    pub readable: bool,
}

fn read_colors(path: &Path) -> Result<String, BadgeError> {
    fs::read_to_string(path).map_err(|source| BadgeError::ConfigUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

/// Owns the parsed color tables and hands out consistent snapshots.
pub struct ConfigStore {
    path: PathBuf,
    tables: ArcSwap<ColorTables>,
}

impl ConfigStore {
    /// Read and parse `path`. Never fails: an unreadable file yields empty
    /// tables and a diagnostic.
    pub fn load(path: &Path) -> LoadReport {
        match read_colors(path) {
            Ok(text) => {
                let (tables, diagnostics) = parse(&text);
                LoadReport {
                    tables,
                    diagnostics,
                    readable: true,
                }
            }
            Err(e) => LoadReport {
                tables: ColorTables::default(),
                diagnostics: vec![Diagnostic::ConfigUnreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }],
                readable: false,
            },
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> (Self, Vec<Diagnostic>) {
        let path = path.into();
        let report = Self::load(&path);
        let store = Self {
            path,
            tables: ArcSwap::from_pointee(report.tables),
        };
        (store, report.diagnostics)
    }

    /// Re-read the file and swap in the new generation. When the file has
    /// become unreadable the previous generation stays in place.
    pub fn reload(&self) -> Vec<Diagnostic> {
        let report = Self::load(&self.path);
        if report.readable {
            self.tables.store(Arc::new(report.tables));
        }
        report.diagnostics
    }

    pub fn snapshot(&self) -> Arc<ColorTables> {
        self.tables.load_full()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
