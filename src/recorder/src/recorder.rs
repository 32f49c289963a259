use common::{HarnessError, Measurement, QueryItem};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp format of the results log, microsecond resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn current_timestamp_str() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Formats one results log line:
/// `hint, chunk, repetition, timestamp, source_path, planning_ms, execution_ms, mode`.
///
/// Fields are joined by `", "`; a field holding a comma, quote or newline is
/// quoted so the line always reads back as eight fields.
pub fn format_log_line(
    measurement: &Measurement,
    item: &QueryItem,
    repetition: usize,
    chunk: usize,
    timestamp: &str,
) -> Result<String, HarnessError> {
    let fields = [
        measurement.hint_label().to_string(),
        chunk.to_string(),
        repetition.to_string(),
        timestamp.to_string(),
        item.source_path().display().to_string(),
        measurement.planning_time_ms.to_string(),
        measurement.execution_time_ms.to_string(),
        measurement.mode.to_string(),
    ];
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    // The space after each separator lives inside the field; readers trim it.
    let record = fields.iter().enumerate().map(|(i, f)| {
        if i == 0 {
            f.clone()
        } else {
            format!(" {}", f)
        }
    });
    wtr.write_record(record).map_err(csv_err)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| HarnessError::IOError(e.to_string()))?;
    let line = String::from_utf8(bytes).map_err(|e| HarnessError::IOError(e.to_string()))?;
    Ok(line.trim_end_matches('\n').to_string())
}

fn csv_err(e: csv::Error) -> HarnessError {
    HarnessError::IOError(e.to_string())
}

/// Appends measurements to the results log and archives their plans.
///
/// The log is only ever appended to. Plans go to
/// `<query_dir>/BAO/run<k>/<name>_plan.json` when each query is repeated, and
/// to `<query_dir>/BAO/<name>_plan.json` otherwise.
pub struct Recorder {
    log_path: PathBuf,
    repeat_count: usize,
}

impl Recorder {
    /// # Arguments
    ///
    /// * `log_path` - Results log to append to.
    /// * `repeat_count` - Repetitions per query, decides the archive layout.
    pub fn new<P: Into<PathBuf>>(log_path: P, repeat_count: usize) -> Self {
        Self {
            log_path: log_path.into(),
            repeat_count,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Refuses to start a run on top of an existing results log.
    pub fn ensure_new_log(&self) -> Result<(), HarnessError> {
        if self.log_path.exists() {
            error!(
                "The file {} already exists, stopping.",
                self.log_path.display()
            );
            return Err(HarnessError::OutputExists(
                self.log_path.display().to_string(),
            ));
        }
        Ok(())
    }

    /// Records one execution.
    ///
    /// The log line is written for failures too; only the plan archive is
    /// skipped when there is no plan.
    ///
    /// # Arguments
    ///
    /// * `measurement` - Measurement to record.
    /// * `item` - Query that was executed.
    /// * `repetition` - Zero-based repetition index.
    /// * `chunk` - Index of the chunk the execution belongs to.
    pub fn record(
        &self,
        measurement: &Measurement,
        item: &QueryItem,
        repetition: usize,
        chunk: usize,
    ) -> Result<(), HarnessError> {
        let line = format_log_line(
            measurement,
            item,
            repetition,
            chunk,
            &current_timestamp_str(),
        )?;
        info!("{}", line);
        self.append_line(&line)?;

        match &measurement.execution_plan {
            Some(plan) => {
                let path = self.plan_path(item, repetition);
                write_plan(&path, plan)?;
                debug!("Plan saved to {:?}", path);
            }
            None => warn!(
                "Execution plan for {} is missing. Skipping saving plan.",
                item.display_name()
            ),
        }
        Ok(())
    }

    /// Archive location of a repetition's plan.
    pub fn plan_path(&self, item: &QueryItem, repetition: usize) -> PathBuf {
        let mut path = item.archive_dir();
        if self.repeat_count > 1 {
            path.push(format!("run{}", repetition + 1));
        }
        path.push(item.plan_file_name());
        path
    }

    fn append_line(&self, line: &str) -> Result<(), HarnessError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

/// Writes a plan as JSON indented by four spaces, creating directories as needed.
fn write_plan(path: &Path, plan: &Value) -> Result<(), HarnessError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    plan.serialize(&mut ser)?;
    fs::write(path, buf)?;
    Ok(())
}
