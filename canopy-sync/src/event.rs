//! Events emitted once per executed action, the reporter contract, and the
//! run summary the scheduler tallies from them.

use std::fmt;

/// Outcome class of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Cloned,
    Failed,
    Ignored,
    Removed,
    Unchanged,
    Updated,
}

impl EventKind {
    /// Fixed-width tag used in line-oriented output.
    pub fn label(self) -> &'static str {
        match self {
            EventKind::Cloned => "new ",
            EventKind::Failed => "FAIL",
            EventKind::Ignored => "ign ",
            EventKind::Removed => "rm  ",
            EventKind::Unchanged => "ok  ",
            EventKind::Updated => "upd ",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Completion record for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    pub kind: EventKind,
    /// Display name of the repository, usually its path.
    pub name: String,
    pub message: String,
    /// Non-fatal notes about judgment calls made along the way.
    pub caveats: Vec<String>,
}

impl ActionEvent {
    pub fn new(kind: EventKind, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            message: message.into(),
            caveats: Vec::new(),
        }
    }

    pub fn with_caveats(mut self, caveats: Vec<String>) -> Self {
        self.caveats = caveats;
        self
    }
}

/// Consumes action events as they complete.
///
/// The scheduler drives a reporter from a single task, so implementations
/// never see concurrent calls.
pub trait Reporter: Send {
    /// Called once before any event, with the number of planned actions.
    fn start(&mut self, _total: usize) {}

    fn handle_event(&mut self, event: &ActionEvent);

    /// Called once after every worker has finished.
    fn finish(&mut self, summary: &RunSummary);
}

/// Tally of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Planned actions, executed or not.
    pub total: usize,
    pub cloned: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub updated: usize,
    pub failed: Vec<ActionEvent>,
    pub ignored: Vec<ActionEvent>,
    /// `(name, caveat)` in arrival order.
    pub caveats: Vec<(String, String)>,
    /// A failure cancelled the run before every action was executed.
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, event: &ActionEvent) {
        match event.kind {
            EventKind::Cloned => self.cloned += 1,
            EventKind::Failed => self.failed.push(event.clone()),
            EventKind::Ignored => self.ignored.push(event.clone()),
            EventKind::Removed => self.removed += 1,
            EventKind::Unchanged => self.unchanged += 1,
            EventKind::Updated => self.updated += 1,
        }
        self.caveats.extend(
            event
                .caveats
                .iter()
                .map(|c| (event.name.clone(), c.clone())),
        );
    }

    /// Number of events recorded so far.
    pub fn executed(&self) -> usize {
        self.cloned
            + self.failed.len()
            + self.ignored.len()
            + self.removed
            + self.unchanged
            + self.updated
    }

    pub fn num_failed(&self) -> usize {
        self.failed.len()
    }

    /// `Done! 2 cloned, 1 FAILED, 5 total`; zero counts are left out.
    pub fn headline(&self) -> String {
        let counts = [
            (self.cloned, "cloned"),
            (self.failed.len(), "FAILED"),
            (self.ignored.len(), "ignored"),
            (self.removed, "removed"),
            (self.unchanged, "unchanged"),
            (self.updated, "updated"),
        ];
        let mut line = String::from("Done! ");
        for (n, what) in counts.into_iter().filter(|(n, _)| *n > 0) {
            line.push_str(&format!("{n} {what}, "));
        }
        line.push_str(&format!("{} total", self.total));
        line
    }
}
