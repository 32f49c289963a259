use common::testutil::{gen_random_dir, write_query_file};
use common::{AdvisorEndpoint, HarnessError, QueryItem};
use queryexe::testutil::ScriptedSource;
use std::fs;
use std::path::PathBuf;
use workload::{RetrainHook, Sequencer, SequencerConfig};

use criterion::{BatchSize, Criterion};

/// Retraining is out of process; benchmarks only measure the loop around it.
pub struct NoRetrain;

impl RetrainHook for NoRetrain {
    fn retrain_and_checkpoint(&mut self, _chunk: usize) -> Result<(), HarnessError> {
        Ok(())
    }
}

/// A generated workload run end to end against the scripted session source.
pub struct WorkloadTemplate {
    pub query_count: usize,
    pub chunk_size: usize,
    pub repeat_count: usize,
    root: PathBuf,
    items: Vec<QueryItem>,
}

impl WorkloadTemplate {
    pub fn new(query_count: usize, chunk_size: usize, repeat_count: usize) -> Self {
        Self {
            query_count,
            chunk_size,
            repeat_count,
            root: gen_random_dir(),
            items: Vec::new(),
        }
    }

    pub fn run_setup(&mut self) {
        self.items = (0..self.query_count)
            .map(|i| {
                let sql = format!("select count(*) from title t where t.id < {}", i);
                let path = write_query_file(&self.root, &format!("q{}/q{}.sql", i, i), &sql);
                QueryItem::new(path, sql)
            })
            .collect();
    }

    fn log_path(&self) -> PathBuf {
        self.root.join("out.txt")
    }

    /// Removes the results log and plan archives of the previous iteration so
    /// every sample starts from the same file state.
    pub fn reset_outputs(&self, source: &ScriptedSource) {
        source.journal().borrow_mut().clear();
        let _ = fs::remove_file(self.log_path());
        for item in self.items.iter() {
            let _ = fs::remove_dir_all(item.archive_dir());
        }
    }

    pub fn run_workload(&self, source: &ScriptedSource) {
        let mut hook = NoRetrain;
        let config = SequencerConfig {
            repeat_count: self.repeat_count,
            ..SequencerConfig::evaluation(AdvisorEndpoint::default())
        };
        let log = self.log_path();
        let mut seq = Sequencer::new(source, &mut hook, config);
        if let Err(e) = seq.run(&self.items, self.chunk_size, &log) {
            panic!("benchmark run failed: {}", e);
        }
    }

    pub fn run_cleanup(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }

    pub fn bench_workload(&mut self, c: &mut Criterion, name: &str) {
        self.run_setup();
        let source = ScriptedSource::new();
        let this = &*self;
        c.bench_function(name, |b| {
            b.iter_batched(
                || this.reset_outputs(&source),
                |_| this.run_workload(&source),
                BatchSize::PerIteration,
            )
        });
        self.run_cleanup();
    }
}
