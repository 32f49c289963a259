#[macro_use]
extern crate log;

pub mod advisor;
pub mod checkpoint;

pub use advisor::{AdvisorConfig, AdvisorControl, AdvisorProcess};
pub use checkpoint::{ArchiveConfig, Checkpointer, ModelArchive};
