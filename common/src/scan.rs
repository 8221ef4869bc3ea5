use eyre::Result;
use regex::Regex;
use tracing::trace;

use crate::record::{Record, UNKNOWN};

/// Implementation names recognised when a log line has no explicit label
pub const IMPL_VOCABULARY: &[&str] = &["tenge", "rust", "go", "c"];

/// Tokens recognised in free-form logs: `TASK=<identifier>` sets the current
/// task, `TIME_NS=<integer>` emits a record for it and `__CSV__:<impl>:<integer>`
/// emits a record with an explicit implementation label.
#[derive(Debug, Clone)]
pub struct Markers {
    task: Regex,
    time: Regex,
    compact: Regex,
    impl_matchers: Vec<ImplMatcher>,
}

impl Markers {
    pub fn new() -> Result<Self> {
        Ok(Self {
            task: Regex::new(r"TASK=([A-Za-z0-9_()\-]+)")?,
            time: Regex::new(r"TIME_NS=(\d+)")?,
            compact: Regex::new(r"__CSV__:(.*?):(\d+)")?,
            impl_matchers: ImplMatcher::defaults()?,
        })
    }

    /// Guesses the implementation label from a line of text.
    ///
    /// The left-most match wins; when two matchers hit the same position the
    /// one listed first wins, so `c(sym)` beats `c`.
    pub fn infer_impl<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.impl_matchers
            .iter()
            .enumerate()
            .filter_map(|(order, m)| m.find(line).map(|hit| (order, hit)))
            .min_by_key(|(order, (start, _))| (*start, *order))
            .map(|(_, (_, label))| label)
    }

    /// Processes one line, updating `state` and returning the record it emits, if any.
    pub fn step(&self, state: &mut ScanState, line: &str, source: &str) -> Option<Record> {
        if let Some(cap) = self.compact.captures(line) {
            let impl_name = cap.get(1).map_or("", |m| m.as_str().trim());
            let time_ns = cap.get(2)?.as_str().parse::<u64>().ok()?;
            let task = state.current_task.as_deref().unwrap_or(impl_name);
            return Some(Record::new(task, impl_name, time_ns, source));
        }

        if let Some(task) = self.task.captures(line).and_then(|cap| cap.get(1)) {
            let task = task.as_str().trim().to_lowercase();
            trace!("{source}: task context -> {task}");
            state.current_task = Some(task);
        }

        let time_ns = self.time.captures(line)?.get(1)?.as_str().parse::<u64>().ok()?;
        let task = state.current_task.as_deref().unwrap_or(UNKNOWN);
        let impl_name = self
            .infer_impl(line)
            .or(state.current_task.as_deref())
            .unwrap_or(UNKNOWN);
        Some(Record::new(task, impl_name, time_ns, source))
    }

    /// Scans every non-blank line in order, carrying the task context between lines.
    pub fn scan_lines<I, S>(&self, lines: I, source: &str) -> Vec<Record>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = ScanState::default();
        let mut records = Vec::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            if let Some(record) = self.step(&mut state, line, source) {
                records.push(record);
            }
        }
        records
    }
}

/// State carried between lines of a scan
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanState {
    pub current_task: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    /// A vocabulary name followed by a parenthesised qualifier, ie. `tenge(pdq)`, `c(-)`
    Qualified,
    /// A vocabulary name on its own
    Bare,
}

#[derive(Debug, Clone)]
pub struct ImplMatcher {
    pub kind: MatcherKind,
    regex: Regex,
}

impl ImplMatcher {
    pub fn new(kind: MatcherKind, vocabulary: &[&str]) -> Result<Self> {
        let names = vocabulary
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = match kind {
            MatcherKind::Qualified => format!(r"(?i)\b(?:{names})\([^)]+\)"),
            MatcherKind::Bare => format!(r"(?i)\b(?:{names})\b"),
        };
        Ok(Self {
            kind,
            regex: Regex::new(&pattern)?,
        })
    }

    /// Matchers in evaluation order
    pub fn defaults() -> Result<Vec<Self>> {
        Ok(vec![
            Self::new(MatcherKind::Qualified, IMPL_VOCABULARY)?,
            Self::new(MatcherKind::Bare, IMPL_VOCABULARY)?,
        ])
    }

    pub fn find<'a>(&self, line: &'a str) -> Option<(usize, &'a str)> {
        self.regex.find(line).map(|m| (m.start(), m.as_str()))
    }
}
