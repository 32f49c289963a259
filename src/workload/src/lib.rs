#[macro_use]
extern crate log;

pub mod loader;
pub mod schedule;
pub mod sequencer;

pub use loader::fetch_queries;
pub use schedule::{build_sequence, plan_chunks, session_flags, Chunk, SamplingConfig};
pub use sequencer::{RetrainFailurePolicy, RetrainHook, RunSummary, Sequencer, SequencerConfig};
