use std::collections::BTreeMap;
use std::time::Instant;

/// A single unit of work inside a refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ReloadConfig,
    FetchLocation,
    ReadNetwork,
    Render,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::ReloadConfig => "reload-config",
            Step::FetchLocation => "fetch-location",
            Step::ReadNetwork => "read-network",
            Step::Render => "render",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Everything, including the external location lookup.
    Full,
    /// Periodic timer: config and network, never the location service.
    Periodic,
    /// Quick re-read once a transition has had time to settle.
    Settle,
    /// Redraw from the cached state without any lookup.
    Redraw,
}

impl Pass {
    pub fn steps(self) -> &'static [Step] {
        match self {
            Pass::Full => &[
                Step::ReloadConfig,
                Step::FetchLocation,
                Step::ReadNetwork,
                Step::Render,
            ],
            Pass::Periodic => &[Step::ReloadConfig, Step::ReadNetwork, Step::Render],
            Pass::Settle => &[Step::ReadNetwork, Step::Render],
            Pass::Redraw => &[Step::Render],
        }
    }
}

/// Why a delayed pass was queued. Each slot holds at most one pass, so
/// queueing into a busy slot restarts its delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Slot {
    SignalSettle,
    SignalFull,
    SwitchFollowUp,
    CycleFollowUp,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pending: BTreeMap<Slot, (Instant, Pass)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `pass` to run at `at`. Returns true if an earlier entry in the
    /// same slot was replaced.
    pub fn schedule(&mut self, slot: Slot, at: Instant, pass: Pass) -> bool {
        self.pending.insert(slot, (at, pass)).is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(at, _)| *at).min()
    }

    /// Remove and return every pass due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(Slot, Pass)> {
        let mut due: Vec<(Instant, Slot, Pass)> = self
            .pending
            .iter()
            .filter(|(_, (at, _))| *at <= now)
            .map(|(slot, (at, pass))| (*at, *slot, *pass))
            .collect();
        due.sort_by_key(|(at, slot, _)| (*at, *slot));
        for (_, slot, _) in &due {
            self.pending.remove(slot);
        }
        due.into_iter().map(|(_, slot, pass)| (slot, pass)).collect()
    }

    pub fn pending(&self, slot: Slot) -> Option<(Instant, Pass)> {
        self.pending.get(&slot).copied()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }
}
