use common::HarnessError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Lifecycle of the external advisor service.
///
/// The harness never looks inside the advisor; it only asks it to start,
/// stop, retrain from accumulated experience, or load a stored model.
pub trait AdvisorControl {
    fn start(&mut self) -> Result<(), HarnessError>;
    fn stop(&mut self) -> Result<(), HarnessError>;
    fn retrain(&mut self) -> Result<(), HarnessError>;
    fn load_model(&mut self, model_dir: &Path) -> Result<(), HarnessError>;
}

/// Command lines of the advisor service, run from `server_dir`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AdvisorConfig {
    pub server_dir: PathBuf,
    pub start_command: Vec<String>,
    pub retrain_command: Vec<String>,
    /// The model directory is appended as the last argument.
    pub load_command: Vec<String>,
    /// Flush file system buffers after retraining so model files are complete on disk.
    pub sync_after_retrain: bool,
    pub startup_grace_ms: u64,
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            server_dir: PathBuf::from("bao_server"),
            start_command: to_args(&[
                "python3",
                "main.py",
                "--log-performance",
                "--log-file-path",
                "performance_log.txt",
            ]),
            retrain_command: to_args(&["python3", "baoctl.py", "--retrain"]),
            load_command: to_args(&["python3", "baoctl.py", "--load"]),
            sync_after_retrain: true,
            startup_grace_ms: 30_000,
        }
    }
}

/// Drives the advisor through its command line tools.
pub struct AdvisorProcess {
    config: AdvisorConfig,
    child: Option<Child>,
}

impl AdvisorProcess {
    pub fn new(config: AdvisorConfig) -> Self {
        Self {
            config,
            child: None,
        }
    }

    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn command(&self, argv: &[String]) -> Result<Command, HarnessError> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            HarnessError::ConfigError(String::from("empty advisor command line"))
        })?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(&self.config.server_dir);
        Ok(cmd)
    }

    /// Runs a command to completion; a non-zero exit is an error carrying its stderr.
    fn run_to_completion(&self, argv: &[String], extra: Option<&Path>) -> Result<(), HarnessError> {
        let mut cmd = self.command(argv)?;
        if let Some(arg) = extra {
            cmd.arg(arg);
        }
        debug!("Running advisor command {:?}", cmd);
        let output = cmd.output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(HarnessError::CollaboratorError(format!(
                "'{}' exited with {}: {}",
                argv.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

impl AdvisorControl for AdvisorProcess {
    fn start(&mut self) -> Result<(), HarnessError> {
        if self.is_running() {
            return Ok(());
        }
        let mut child = self.command(&self.config.start_command)?.spawn()?;
        // Give it some time to start
        std::thread::sleep(Duration::from_millis(self.config.startup_grace_ms));
        match child.try_wait()? {
            None => {
                info!("Advisor server started (pid {})", child.id());
                self.child = Some(child);
                Ok(())
            }
            Some(status) => Err(HarnessError::CollaboratorError(format!(
                "advisor server exited during startup with {}",
                status
            ))),
        }
    }

    fn stop(&mut self) -> Result<(), HarnessError> {
        match self.child.take() {
            Some(mut child) => {
                if child.try_wait()?.is_none() {
                    child.kill()?;
                }
                child.wait()?;
                info!("Successfully terminated advisor server process");
            }
            None => info!("No running advisor server process found"),
        }
        Ok(())
    }

    fn retrain(&mut self) -> Result<(), HarnessError> {
        self.run_to_completion(&self.config.retrain_command, None)?;
        if self.config.sync_after_retrain {
            let status = Command::new("sync").stdout(Stdio::null()).status();
            if !matches!(status, Ok(s) if s.success()) {
                warn!("sync after retraining failed: {:?}", status);
            }
        }
        Ok(())
    }

    fn load_model(&mut self, model_dir: &Path) -> Result<(), HarnessError> {
        info!("Loading model from {}", model_dir.display());
        self.run_to_completion(&self.config.load_command, Some(model_dir))?;
        info!("Model loaded successfully");
        Ok(())
    }
}

impl Drop for AdvisorProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
