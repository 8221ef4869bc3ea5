use std::collections::{BTreeMap, btree_map::Entry};

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Presentation order of implementation labels on a chart. Anything not listed
/// goes after these.
pub const IMPL_PRIORITY: &[&str] = &[
    "tenge(radix)",
    "tenge(pdq)",
    "tenge(msort)",
    "tenge(qsort)",
    "tenge",
    "c",
    "rust",
    "go",
    "c(-)",
    "rust(-)",
    "go(-)",
    "tenge(sym)",
    "c(sym)",
    "rust(sym)",
    "go(sym)",
];

/// Collapses a detailed task name into the group it is charted under.
///
/// Rules are checked in order and the first match wins, `nbody_sym` has to
/// come before `nbody`.
pub fn task_group(task: &str) -> String {
    let task = task.to_lowercase();
    let rules: &[(&[&str], &str)] = &[
        (&["sort"], "sort"),
        (&["fib_iter"], "fib_iter"),
        (&["fib_rec"], "fib_rec"),
        (&["var_mc"], "var_mc"),
        (&["nbody_sym", "(sym"], "nbody_sym"),
        (&["nbody"], "nbody"),
    ];
    for (needles, group) in rules {
        if needles.iter().any(|needle| task.contains(needle)) {
            return (*group).to_owned();
        }
    }
    if task.is_empty() {
        "misc".to_owned()
    } else {
        task
    }
}

fn priority(impl_name: &str) -> usize {
    IMPL_PRIORITY
        .iter()
        .position(|known| *known == impl_name)
        .unwrap_or(IMPL_PRIORITY.len())
}

/// Best (minimum) time per implementation for every task group.
///
/// Observing records and merging partial results are both order independent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BestTimes {
    groups: BTreeMap<String, BTreeMap<String, u64>>,
}

impl BestTimes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, record: &Record) {
        self.insert(task_group(&record.task), &record.impl_name, record.time_ns);
    }

    fn insert(&mut self, group: String, impl_name: &str, time_ns: u64) {
        let impls = self.groups.entry(group).or_default();
        match impls.entry(impl_name.to_owned()) {
            Entry::Vacant(entry) => {
                entry.insert(time_ns);
            }
            Entry::Occupied(mut entry) => {
                if time_ns < *entry.get() {
                    entry.insert(time_ns);
                }
            }
        }
    }

    pub fn merge(&mut self, other: BestTimes) {
        for (group, impls) in other.groups {
            for (impl_name, time_ns) in impls {
                self.insert(group.clone(), &impl_name, time_ns);
            }
        }
    }

    pub fn get(&self, group: &str, impl_name: &str) -> Option<u64> {
        self.groups.get(group)?.get(impl_name).copied()
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of task groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// One chart per group, groups in ascending name order
    pub fn charts(&self) -> Vec<GroupChart> {
        self.groups
            .iter()
            .map(|(group, impls)| GroupChart::new(group, impls))
            .collect()
    }
}

impl Extend<Record> for BestTimes {
    fn extend<T: IntoIterator<Item = Record>>(&mut self, iter: T) {
        for record in iter {
            self.observe(&record);
        }
    }
}

impl<'a> Extend<&'a Record> for BestTimes {
    fn extend<T: IntoIterator<Item = &'a Record>>(&mut self, iter: T) {
        for record in iter {
            self.observe(record);
        }
    }
}

impl FromIterator<Record> for BestTimes {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut best = Self::new();
        best.extend(iter);
        best
    }
}

impl<'a> FromIterator<&'a Record> for BestTimes {
    fn from_iter<T: IntoIterator<Item = &'a Record>>(iter: T) -> Self {
        let mut best = Self::new();
        best.extend(iter);
        best
    }
}

/// Chart-ready table for one task group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupChart {
    pub group: String,
    pub title: String,
    /// `(impl, best time_ns)` in presentation order
    pub bars: Vec<(String, u64)>,
}

impl GroupChart {
    fn new(group: &str, impls: &BTreeMap<String, u64>) -> Self {
        let mut bars = impls
            .iter()
            .map(|(impl_name, time_ns)| (impl_name.clone(), *time_ns))
            .collect::<Vec<_>>();
        bars.sort_by(|(a_name, a_time), (b_name, b_time)| {
            (priority(a_name), a_time, a_name).cmp(&(priority(b_name), b_time, b_name))
        });
        Self {
            group: group.to_owned(),
            title: format!("{group}_benchmark"),
            bars,
        }
    }

    /// File name (without extension) for the rendered chart
    pub fn file_stem(&self) -> String {
        self.title
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.bars.iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn max_time(&self) -> u64 {
        self.bars.iter().map(|(_, t)| *t).max().unwrap_or(0)
    }
}
