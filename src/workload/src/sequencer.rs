use crate::schedule::{build_sequence, plan_chunks, session_flags, Chunk, SamplingConfig};
use common::{
    AdvisorEndpoint, HarnessError, ModeLabel, QueryItem, SessionConfig, EVALUATION_REPETITIONS,
    TIMEOUT_LIMIT_MS, TRAINING_REPETITIONS,
};
use queryexe::query::{Executor, SessionSource};
use recorder::recorder::current_timestamp_str;
use recorder::Recorder;
use serde::Deserialize;
use std::path::Path;
use utilities::{AdvisorControl, Checkpointer};

/// Retrains the advisor between chunks and keeps a checkpoint of the result.
pub trait RetrainHook {
    fn retrain_and_checkpoint(&mut self, chunk: usize) -> Result<(), HarnessError>;
}

impl<A: AdvisorControl> RetrainHook for Checkpointer<A> {
    fn retrain_and_checkpoint(&mut self, chunk: usize) -> Result<(), HarnessError> {
        Checkpointer::retrain_and_checkpoint(self, chunk)
    }
}

/// What a failed retrain does to the run.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetrainFailurePolicy {
    /// Log it and run the next chunk against the previous model.
    Continue,
    /// Stop the run with the retrain error.
    Abort,
}

impl Default for RetrainFailurePolicy {
    fn default() -> Self {
        RetrainFailurePolicy::Continue
    }
}

#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Sample the sequence, seed baseline rewards, and refuse an existing log.
    pub training: bool,
    pub repeat_count: usize,
    pub sampling: SamplingConfig,
    /// Retrain between chunks. Off for runs against a frozen model.
    pub retrain: bool,
    pub retrain_failure: RetrainFailurePolicy,
    pub advisor: AdvisorEndpoint,
    pub statement_timeout_ms: u64,
}

impl SequencerConfig {
    pub fn training(advisor: AdvisorEndpoint) -> Self {
        Self {
            training: true,
            repeat_count: TRAINING_REPETITIONS,
            sampling: SamplingConfig::default(),
            retrain: true,
            retrain_failure: RetrainFailurePolicy::default(),
            advisor,
            statement_timeout_ms: TIMEOUT_LIMIT_MS,
        }
    }

    pub fn evaluation(advisor: AdvisorEndpoint) -> Self {
        Self {
            training: false,
            repeat_count: EVALUATION_REPETITIONS,
            ..Self::training(advisor)
        }
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub chunks: usize,
    pub executions: usize,
    pub failures: usize,
    pub retrains: usize,
    pub retrain_failures: usize,
}

/// Feeds the workload to the database chunk by chunk.
///
/// Queries run strictly one after another. The first chunk runs on the native
/// planner; before every later chunk the advisor is retrained, and the loop
/// waits for that to finish so the chunk sees the updated model. Query faults
/// never stop the loop: they arrive as failed measurements and are logged like
/// any other.
pub struct Sequencer<'a, S: SessionSource + ?Sized> {
    executor: Executor<'a, S>,
    hook: &'a mut dyn RetrainHook,
    config: SequencerConfig,
}

impl<'a, S: SessionSource + ?Sized> Sequencer<'a, S> {
    pub fn new(source: &'a S, hook: &'a mut dyn RetrainHook, config: SequencerConfig) -> Self {
        Self {
            executor: Executor::new(source),
            hook,
            config,
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Runs the workload and appends every execution to `log_path`.
    ///
    /// # Arguments
    ///
    /// * `items` - Loaded queries, in load order.
    /// * `chunk_size` - Queries per chunk.
    /// * `log_path` - Results log.
    pub fn run(
        &mut self,
        items: &[QueryItem],
        chunk_size: usize,
        log_path: &Path,
    ) -> Result<RunSummary, HarnessError> {
        if self.config.repeat_count == 0 {
            return Err(HarnessError::ConfigError(String::from(
                "repeat count must be at least 1",
            )));
        }
        let recorder = Recorder::new(log_path, self.config.repeat_count);
        if self.config.training {
            recorder.ensure_new_log()?;
        }

        let sequence = build_sequence(items, self.config.training, &self.config.sampling);
        let chunks = plan_chunks(&sequence, chunk_size)?;
        info!(
            "Executing {} queries in {} chunks of {}",
            sequence.len(),
            chunks.len(),
            chunk_size
        );

        let mut summary = RunSummary::default();
        let total = chunks.len();
        for chunk in chunks.iter() {
            if chunk.mode == ModeLabel::Advisor && self.config.retrain {
                self.retrain(chunk.index, total, &mut summary)?;
            }
            info!("{}", "===".repeat(30));
            info!(
                "Iteration over chunk {}/{} ({})...",
                chunk.index + 1,
                total,
                chunk.mode
            );
            self.run_chunk(chunk, &recorder, &mut summary)?;
            summary.chunks += 1;
        }
        info!("Run finished: {:?}", summary);
        Ok(summary)
    }

    fn run_chunk(
        &mut self,
        chunk: &Chunk<'_>,
        recorder: &Recorder,
        summary: &mut RunSummary,
    ) -> Result<(), HarnessError> {
        let repeat_count = self.config.repeat_count;
        for item in chunk.items.iter() {
            info!("Executing query from file: {}", item.display_name());
            for repetition in 0..repeat_count {
                let (select, reward) =
                    session_flags(chunk.mode, repetition, repeat_count, self.config.training);
                let session = SessionConfig::new(select, reward, self.config.advisor.clone())
                    .with_statement_timeout(self.config.statement_timeout_ms);
                for measurement in self.executor.execute(item.sql(), &session, chunk.mode, 1) {
                    if measurement.is_failure() {
                        summary.failures += 1;
                    }
                    summary.executions += 1;
                    recorder.record(&measurement, item, repetition, chunk.index)?;
                }
            }
        }
        Ok(())
    }

    fn retrain(
        &mut self,
        chunk: usize,
        total: usize,
        summary: &mut RunSummary,
    ) -> Result<(), HarnessError> {
        info!(
            "[{}]\t[{}/{}]\tRetraining Bao...",
            current_timestamp_str(),
            chunk,
            total - 1
        );
        summary.retrains += 1;
        match self.hook.retrain_and_checkpoint(chunk) {
            Ok(()) => {
                info!(
                    "[{}]\t[{}/{}]\tRetraining done.",
                    current_timestamp_str(),
                    chunk,
                    total - 1
                );
                Ok(())
            }
            Err(e) => {
                summary.retrain_failures += 1;
                error!("Retraining before chunk {} failed: {}", chunk, e);
                match self.config.retrain_failure {
                    RetrainFailurePolicy::Continue => Ok(()),
                    RetrainFailurePolicy::Abort => Err(e),
                }
            }
        }
    }
}
