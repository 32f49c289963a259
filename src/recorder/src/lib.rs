#[macro_use]
extern crate log;

pub mod recorder;
pub mod results;

pub use recorder::Recorder;
pub use results::{read_log, summarize, ChunkSummary, LogEntry};
