use common::{
    AdvisorEndpoint, HarnessError, DEFAULT_CHUNK_SIZE, EVALUATION_REPETITIONS, TIMEOUT_LIMIT_MS,
    TRAINING_REPETITIONS,
};
use queryexe::query::{ConnectionMode, DatabaseParams, PoolSettings};
use std::fs;
use std::path::{Path, PathBuf};
use utilities::{AdvisorConfig, ArchiveConfig};
use workload::{RetrainFailurePolicy, SamplingConfig};

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DatabaseSection {
    #[serde(flatten)]
    pub params: DatabaseParams,
    pub connection: ConnectionMode,
    pub pool: PoolSettings,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AdvisorSection {
    #[serde(flatten)]
    pub endpoint: AdvisorEndpoint,
    #[serde(flatten)]
    pub process: AdvisorConfig,
    /// Start the advisor server before the run and stop it afterwards.
    pub start_server: bool,
    pub retrain_failure: RetrainFailurePolicy,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorkloadSection {
    pub chunk_size: usize,
    pub training_repetitions: usize,
    pub evaluation_repetitions: usize,
    pub statement_timeout_ms: u64,
    pub sampling: SamplingConfig,
}

impl Default for WorkloadSection {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            training_repetitions: TRAINING_REPETITIONS,
            evaluation_repetitions: EVALUATION_REPETITIONS,
            statement_timeout_ms: TIMEOUT_LIMIT_MS,
            sampling: SamplingConfig::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelsSection {
    #[serde(flatten)]
    pub archive: ArchiveConfig,
    /// Copy the model files after every retrain.
    pub checkpoints: bool,
}

impl Default for ModelsSection {
    fn default() -> Self {
        Self {
            archive: ArchiveConfig::default(),
            checkpoints: true,
        }
    }
}

/// Harness configuration, read from a JSON file or assembled from flags.
/// Every section and field is optional.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    pub database: DatabaseSection,
    pub advisor: AdvisorSection,
    pub workload: WorkloadSection,
    pub models: ModelsSection,
}

impl HarnessConfig {
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            HarnessError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: HarnessConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HarnessError> {
        let w = &self.workload;
        if w.chunk_size == 0 {
            return Err(HarnessError::ConfigError(String::from(
                "workload.chunk_size must be at least 1",
            )));
        }
        if w.training_repetitions == 0 || w.evaluation_repetitions == 0 {
            return Err(HarnessError::ConfigError(String::from(
                "repetition counts must be at least 1",
            )));
        }
        if w.statement_timeout_ms == 0 {
            return Err(HarnessError::ConfigError(String::from(
                "workload.statement_timeout_ms must be positive",
            )));
        }
        if self.database.connection == ConnectionMode::Pooled && self.database.pool.pool_size == 0 {
            return Err(HarnessError::ConfigError(String::from(
                "database.pool.pool_size must be at least 1",
            )));
        }
        Ok(())
    }
}

/// What a single run operates on; these always come from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub workload_dir: PathBuf,
    pub output: PathBuf,
    pub manifest: Option<PathBuf>,
    pub skip_processed: bool,
}
