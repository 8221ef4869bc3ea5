use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "unknown";

/// One normalized benchmark measurement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub task: String,
    #[serde(rename = "impl")]
    pub impl_name: String,
    pub time_ns: u64,
    /// File name the measurement was read from
    pub source: String,
}

impl Record {
    /// Builds a record, lower-casing the task and filling empty labels so that
    /// neither `task` nor `impl_name` is ever empty.
    pub fn new(task: &str, impl_name: &str, time_ns: u64, source: &str) -> Self {
        let task = match task.trim() {
            "" => UNKNOWN.to_owned(),
            t => t.to_lowercase(),
        };
        let impl_name = match impl_name.trim() {
            "" => task.clone(),
            i => i.to_owned(),
        };
        Self {
            task,
            impl_name,
            time_ns,
            source: source.to_owned(),
        }
    }
}

/// Numeric coercion for a timing cell. Returns `None` for anything that should
/// drop the row instead of becoming a zero.
pub fn parse_time_ns(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(ns) = value.parse::<u64>() {
        return Some(ns);
    }

    let ns = value.parse::<f64>().ok()?;
    if !ns.is_finite() || ns < 0.0 || ns >= u64::MAX as f64 {
        return None;
    }
    Some(ns.round() as u64)
}
