use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

const DEFAULT_MAX_ENTRIES: usize = 64;

/// Which external lookup produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Network,
    Location,
    Switch,
    Notification,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lookup::Network => "network query",
            Lookup::Location => "location lookup",
            Lookup::Switch => "network switch",
            Lookup::Notification => "notification source",
        };
        f.write_str(name)
    }
}

/// A failure that was absorbed instead of propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    ConfigUnreadable { path: PathBuf, reason: String },
    MalformedEntry { line: usize, text: String },
    LookupFailure { lookup: Lookup, reason: String },
    UnknownSignal(String),
    EmptyCycle,
    StepPanicked(&'static str),
}

impl Diagnostic {
    fn emit(&self) {
        match self {
            Diagnostic::MalformedEntry { .. } | Diagnostic::UnknownSignal(_) => {
                log::debug!("{self}")
            }
            Diagnostic::StepPanicked(_) => log::error!("{self}"),
            _ => log::warn!("{self}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ConfigUnreadable { path, reason } => {
                write!(f, "color config {} unreadable: {reason}", path.display())
            }
            Diagnostic::MalformedEntry { line, text } => {
                write!(f, "skipping malformed entry on line {line}: {text:?}")
            }
            Diagnostic::LookupFailure { lookup, reason } => write!(f, "{lookup} failed: {reason}"),
            Diagnostic::UnknownSignal(name) => write!(f, "ignoring unknown signal {name:?}"),
            Diagnostic::EmptyCycle => f.write_str("no configured networks to cycle through"),
            Diagnostic::StepPanicked(step) => write!(f, "refresh step {step} panicked"),
        }
    }
}

/// Bounded record of absorbed failures, oldest first.
pub struct DiagnosticLog {
    entries: VecDeque<Diagnostic>,
    max_entries: usize,
}

impl DiagnosticLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries: max_entries.max(1),
        }
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.record(diagnostic);
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup_failures(&self, lookup: Lookup) -> usize {
        self.entries
            .iter()
            .filter(|d| matches!(d, Diagnostic::LookupFailure { lookup: l, .. } if *l == lookup))
            .count()
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
