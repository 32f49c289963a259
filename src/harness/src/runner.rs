use crate::config::{HarnessConfig, RunOptions};
use common::HarnessError;
use queryexe::query::SessionSource;
use recorder::{read_log, summarize, ChunkSummary, Recorder};
use std::path::Path;
use utilities::{AdvisorControl, Checkpointer, ModelArchive};
use workload::{fetch_queries, RunSummary, Sequencer, SequencerConfig};

fn archive_for(config: &HarnessConfig) -> Option<ModelArchive> {
    if config.models.checkpoints {
        Some(ModelArchive::new(config.models.archive.clone()))
    } else {
        None
    }
}

fn stop_advisor<A: AdvisorControl>(config: &HarnessConfig, advisor: &mut A) {
    if config.advisor.start_server {
        if let Err(e) = advisor.stop() {
            warn!("Stopping the advisor failed: {}", e);
        }
    }
}

/// Training run: sampled workload, baseline reward seeding, retraining with
/// checkpoints, and a final model copy at the end.
///
/// Refuses to start when the output log already exists.
pub fn train<S, A>(
    source: &S,
    advisor: A,
    config: &HarnessConfig,
    opts: &RunOptions,
) -> Result<RunSummary, HarnessError>
where
    S: SessionSource + ?Sized,
    A: AdvisorControl,
{
    Recorder::new(&opts.output, config.workload.training_repetitions).ensure_new_log()?;
    let items = fetch_queries(
        &opts.workload_dir,
        opts.manifest.as_deref(),
        opts.skip_processed,
    )?;

    let mut checkpointer = Checkpointer::new(advisor, archive_for(config));
    if config.advisor.start_server {
        checkpointer.advisor_mut().start()?;
    }

    let seq_config = SequencerConfig {
        repeat_count: config.workload.training_repetitions,
        sampling: config.workload.sampling.clone(),
        retrain_failure: config.advisor.retrain_failure,
        statement_timeout_ms: config.workload.statement_timeout_ms,
        ..SequencerConfig::training(config.advisor.endpoint.clone())
    };
    let result = Sequencer::new(source, &mut checkpointer, seq_config).run(
        &items,
        config.workload.chunk_size,
        &opts.output,
    );

    if result.is_ok() {
        let archive = ModelArchive::new(config.models.archive.clone());
        match archive.save_final() {
            Ok(saved) => info!("Final model saved ({} entries)", saved.len()),
            Err(e) => error!("Saving the final model failed: {}", e),
        }
    }
    stop_advisor(config, checkpointer.advisor_mut());
    result
}

/// Evaluation run: queries in load order, output appended to the log.
///
/// When `final_model` is given it is copied into the advisor's live model
/// directory and loaded; if loading fails the advisor is stopped and the run
/// aborts. With `frozen` set the model is never retrained.
pub fn evaluate<S, A>(
    source: &S,
    advisor: A,
    config: &HarnessConfig,
    opts: &RunOptions,
    final_model: Option<&Path>,
    frozen: bool,
) -> Result<RunSummary, HarnessError>
where
    S: SessionSource + ?Sized,
    A: AdvisorControl,
{
    let items = fetch_queries(
        &opts.workload_dir,
        opts.manifest.as_deref(),
        opts.skip_processed,
    )?;

    let mut checkpointer = Checkpointer::new(advisor, archive_for(config));
    if config.advisor.start_server {
        checkpointer.advisor_mut().start()?;
    }

    if let Some(model_dir) = final_model {
        let archive = ModelArchive::new(config.models.archive.clone());
        let loaded = archive.restore(model_dir).and_then(|_| {
            checkpointer
                .advisor_mut()
                .load_model(&config.models.archive.live_model_dir)
        });
        if let Err(e) = loaded {
            error!("Failed to load model: {}", e);
            // Stopped whether or not this run started it.
            if let Err(stop) = checkpointer.advisor_mut().stop() {
                warn!("Stopping the advisor failed: {}", stop);
            }
            return Err(e);
        }
    }

    let seq_config = SequencerConfig {
        repeat_count: config.workload.evaluation_repetitions,
        retrain: !frozen,
        retrain_failure: config.advisor.retrain_failure,
        statement_timeout_ms: config.workload.statement_timeout_ms,
        ..SequencerConfig::evaluation(config.advisor.endpoint.clone())
    };
    let result = Sequencer::new(source, &mut checkpointer, seq_config).run(
        &items,
        config.workload.chunk_size,
        &opts.output,
    );
    stop_advisor(config, checkpointer.advisor_mut());
    result
}

/// Per-chunk statistics of an existing results log.
pub fn summary(log: &Path, timeout_ms: u64) -> Result<Vec<ChunkSummary>, HarnessError> {
    let entries = read_log(log)?;
    Ok(summarize(&entries, timeout_ms))
}

pub fn format_summary(rows: &[ChunkSummary]) -> String {
    let mut out = String::from("chunk\tmode\texecutions\tfailures\tmean_ms\tmedian_ms\n");
    for row in rows.iter() {
        let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |ms| format!("{:.3}", ms));
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\n",
            row.chunk,
            row.mode,
            row.executions,
            row.failures,
            fmt(row.mean_execution_ms),
            fmt(row.median_execution_ms)
        ));
    }
    out
}
