#[macro_use]
extern crate serde;

use std::error::Error;
use std::fmt;
use std::io;

pub mod measurement;
pub mod query;
pub mod session;
pub mod testutil;

pub use measurement::Measurement;
pub use query::QueryItem;
pub use session::{AdvisorEndpoint, SessionConfig};

/// Server-side statement timeout applied to every session, in milliseconds.
pub const TIMEOUT_LIMIT_MS: u64 = 3 * 60 * 1000;
/// Number of queries per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 25;
/// Minimum number of queries sampled for a training run.
pub const DEFAULT_SAMPLE_TARGET: usize = 500;
/// Seed for the training sampler, so a given input set always yields the same sequence.
pub const DEFAULT_SEED: u64 = 42;
/// Repetitions per query in training runs.
pub const TRAINING_REPETITIONS: usize = 3;
/// Repetitions per query in evaluation runs.
pub const EVALUATION_REPETITIONS: usize = 3;
/// Name of the per-query directory holding archived plans.
pub const PLAN_ARCHIVE_DIR: &str = "BAO";

/// Custom error type.
#[derive(Debug, Clone, PartialEq)]
pub enum HarnessError {
    /// IO Errors.
    IOError(String),
    /// Connection, configuration or statement errors reported by the database.
    DatabaseError(String),
    /// A plan document without the expected timing or hint entries.
    MalformedPlan(String),
    /// Invalid harness configuration.
    ConfigError(String),
    /// The results log of a new run already exists.
    OutputExists(String),
    /// Workload directory or query file not found.
    MissingInput(String),
    /// An external advisor command failed.
    CollaboratorError(String),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HarnessError::IOError(s) => s.to_string(),
                HarnessError::DatabaseError(s) => format!("Database Error: {}", s),
                HarnessError::MalformedPlan(s) => format!("Malformed Plan: {}", s),
                HarnessError::ConfigError(s) => format!("Configuration Error: {}", s),
                HarnessError::OutputExists(s) => {
                    format!("The file {} already exists, stopping.", s)
                }
                HarnessError::MissingInput(s) => format!("Missing Input: {}", s),
                HarnessError::CollaboratorError(s) => format!("Advisor Error: {}", s),
            }
        )
    }
}

impl From<io::Error> for HarnessError {
    fn from(error: io::Error) -> Self {
        HarnessError::IOError(error.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(error: serde_json::Error) -> Self {
        HarnessError::IOError(format!("JSON: {}", error))
    }
}

impl Error for HarnessError {}

/// Which optimizer produced the measured plan.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum ModeLabel {
    /// Native planner, advisor selection off.
    Baseline,
    /// Advisor selection on.
    Advisor,
}

impl ModeLabel {
    /// Label written to the results log.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeLabel::Baseline => "PG",
            ModeLabel::Advisor => "Bao",
        }
    }

    /// Parses a results log label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PG" => Some(ModeLabel::Baseline),
            "Bao" => Some(ModeLabel::Advisor),
            _ => None,
        }
    }
}

impl fmt::Display for ModeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
