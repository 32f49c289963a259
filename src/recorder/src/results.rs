use common::{HarnessError, Measurement, ModeLabel};
use std::collections::BTreeMap;
use std::path::Path;

/// One parsed results log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub hint: Option<String>,
    pub chunk: usize,
    pub repetition: usize,
    pub timestamp: String,
    pub source_path: String,
    pub planning_time_ms: f64,
    pub execution_time_ms: f64,
    pub mode: ModeLabel,
}

/// Aggregate statistics of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSummary {
    pub chunk: usize,
    pub mode: ModeLabel,
    pub executions: usize,
    pub failures: usize,
    /// Over non-failed executions only.
    pub mean_execution_ms: Option<f64>,
    pub median_execution_ms: Option<f64>,
}

fn parse_err(line: u64, what: &str) -> HarnessError {
    HarnessError::IOError(format!("results log line {}: {}", line, what))
}

fn parse_record(record: &csv::StringRecord, line: u64) -> Result<LogEntry, HarnessError> {
    if record.len() != 8 {
        return Err(parse_err(line, "expected 8 fields"));
    }
    let usize_at = |i: usize| {
        record[i]
            .parse::<usize>()
            .map_err(|_| parse_err(line, "bad index"))
    };
    let f64_at = |i: usize| {
        record[i]
            .parse::<f64>()
            .map_err(|_| parse_err(line, "bad time"))
    };
    let hint = match &record[0] {
        "x" => None,
        h => Some(h.to_string()),
    };
    Ok(LogEntry {
        hint,
        chunk: usize_at(1)?,
        repetition: usize_at(2)?,
        timestamp: record[3].to_string(),
        source_path: record[4].to_string(),
        planning_time_ms: f64_at(5)?,
        execution_time_ms: f64_at(6)?,
        mode: ModeLabel::from_label(&record[7]).ok_or_else(|| parse_err(line, "bad mode"))?,
    })
}

/// Reads back a results log.
pub fn read_log(path: &Path) -> Result<Vec<LogEntry>, HarnessError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| HarnessError::IOError(e.to_string()))?;
    let mut entries = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| HarnessError::IOError(e.to_string()))?;
        entries.push(parse_record(&record, i as u64 + 1)?);
    }
    Ok(entries)
}

/// Groups entries by chunk and mode. Rows carrying the failure sentinel for
/// `timeout_ms` count as failures and are left out of the averages.
pub fn summarize(entries: &[LogEntry], timeout_ms: u64) -> Vec<ChunkSummary> {
    let sentinel = Measurement::sentinel_ms(timeout_ms);
    let mut groups: BTreeMap<(usize, ModeLabel), (usize, Vec<f64>)> = BTreeMap::new();
    for e in entries {
        let group = groups.entry((e.chunk, e.mode)).or_insert((0, Vec::new()));
        if e.execution_time_ms == sentinel {
            group.0 += 1;
        } else {
            group.1.push(e.execution_time_ms);
        }
    }

    groups
        .into_iter()
        .map(|((chunk, mode), (failures, mut times))| {
            times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            ChunkSummary {
                chunk,
                mode,
                executions: failures + times.len(),
                failures,
                mean_execution_ms: mean(&times),
                median_execution_ms: median(&times),
            }
        })
        .collect()
}

fn mean(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        None
    } else {
        Some(sorted.iter().sum::<f64>() / sorted.len() as f64)
    }
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        None
    } else if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}
