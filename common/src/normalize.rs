use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tokio::fs::read;
use tracing::debug;

use crate::{
    record::{Record, parse_time_ns},
    scan::Markers,
};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parse strategies, in the order they are attempted
pub const STRATEGIES: &[Strategy] = &[Strategy::Tabular, Strategy::RawText];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Header row with a `task` column and an `avg_ns` or `time_ns` column
    Tabular,
    /// Line by line marker scan, see [`crate::scan`]
    RawText,
}

#[derive(Debug, PartialEq)]
pub enum Attempt {
    Accepted(Vec<Record>),
    /// The input is not of this shape, the next strategy gets the original text
    Rejected(String),
    /// The input was readable but not in the expected shape, the next strategy gets these lines
    Degraded(Vec<String>),
}

#[derive(Debug)]
pub struct Input<'a> {
    pub text: &'a str,
    /// Lines handed down by a degraded strategy, replacing `text` for line scanning
    pub rescan: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub records: Vec<Record>,
    /// The strategy that accepted the input
    pub strategy: Strategy,
    /// Whether an earlier strategy handed down serialized rows
    pub degraded: bool,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Tabular => "tabular",
            Strategy::RawText => "raw-text",
        }
    }

    pub fn attempt(&self, input: &Input<'_>, source: &str, markers: &Markers) -> Attempt {
        match self {
            Strategy::Tabular => tabular(input.text, source),
            Strategy::RawText => Attempt::Accepted(match &input.rescan {
                Some(lines) => markers.scan_lines(lines, source),
                None => markers.scan_lines(input.text.lines(), source),
            }),
        }
    }
}

struct Columns {
    task: usize,
    time: usize,
    impl_name: Option<usize>,
}

impl Columns {
    fn find(headers: &StringRecord) -> Option<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
        };
        Some(Self {
            task: position("task")?,
            time: position("avg_ns").or_else(|| position("time_ns"))?,
            impl_name: position("impl"),
        })
    }

    fn record(&self, row: &StringRecord, source: &str) -> Option<Record> {
        let time_ns = parse_time_ns(row.get(self.time)?)?;
        let task = row.get(self.task).unwrap_or_default();
        let impl_name = self
            .impl_name
            .and_then(|idx| row.get(idx))
            .unwrap_or_default();
        Some(Record::new(task, impl_name, time_ns, source))
    }
}

fn tabular(text: &str, source: &str) -> Attempt {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(err) => return Attempt::Rejected(err.to_string()),
    };

    let mut rows = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        match row {
            Ok(row) if row.len() > headers.len() => {
                return Attempt::Rejected(format!(
                    "row {} has {} fields, header has {}",
                    idx + 1,
                    row.len(),
                    headers.len()
                ));
            }
            Ok(row) => rows.push(row),
            Err(err) => return Attempt::Rejected(err.to_string()),
        }
    }

    match Columns::find(&headers) {
        Some(columns) => {
            let records = rows
                .iter()
                .filter_map(|row| columns.record(row, source))
                .collect::<Vec<_>>();
            debug!(
                "{source}: {} of {} rows have a usable time",
                records.len(),
                rows.len()
            );
            Attempt::Accepted(records)
        }
        None => Attempt::Degraded(
            std::iter::once(&headers)
                .filter(|h| !h.is_empty())
                .chain(rows.iter())
                .map(|row| row.iter().collect::<Vec<_>>().join(","))
                .collect(),
        ),
    }
}

/// Turns the contents of one result file into records, falling back through
/// [`STRATEGIES`] until one accepts the input.
pub fn normalize(text: &str, source: &str, markers: &Markers) -> Normalized {
    let mut input = Input { text, rescan: None };
    for strategy in STRATEGIES {
        match strategy.attempt(&input, source, markers) {
            Attempt::Accepted(records) => {
                return Normalized {
                    records,
                    strategy: *strategy,
                    degraded: input.rescan.is_some(),
                };
            }
            Attempt::Rejected(reason) => {
                debug!("{source}: not {}: {reason}", strategy.name());
            }
            Attempt::Degraded(lines) => {
                debug!(
                    "{source}: unexpected {} shape, rescanning {} rows",
                    strategy.name(),
                    lines.len()
                );
                input.rescan = Some(lines);
            }
        }
    }

    Normalized {
        records: Vec::new(),
        strategy: Strategy::RawText,
        degraded: input.rescan.is_some(),
    }
}

/// Decodes the bytes of a result file, replacing invalid UTF-8, and normalizes them.
pub fn normalize_bytes(bytes: &[u8], source: &str, markers: &Markers) -> Normalized {
    normalize(&String::from_utf8_lossy(bytes), source, markers)
}

pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads a result file and normalizes it. Only I/O failures are errors.
pub async fn load_file(path: &Path, markers: &Markers) -> Result<Normalized, LoadError> {
    let bytes = read(path).await.map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(normalize_bytes(&bytes, &source_name(path), markers))
}
