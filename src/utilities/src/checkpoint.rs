use crate::advisor::AdvisorControl;
use common::HarnessError;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where model state lives and where copies of it are kept.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Files and directories making up the advisor's current model.
    pub model_files: Vec<PathBuf>,
    /// Directory the advisor loads its model from.
    pub live_model_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
    pub final_dir: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            model_files: vec![
                PathBuf::from("bao_server/bao_default_model"),
                PathBuf::from("bao_server/bao_default_model.metadata.json"),
            ],
            live_model_dir: PathBuf::from("bao_server/bao_default_model"),
            checkpoint_dir: PathBuf::from("models/checkpoints"),
            final_dir: PathBuf::from("models/final_model"),
        }
    }
}

pub fn archive_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn copy_recursively(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_recursively(&entry.path(), &dst.join(entry.file_name()))?;
        }
    } else {
        fs::copy(src, dst)?;
    }
    Ok(())
}

/// Copies of the advisor's model files, taken after each retrain and at the end of a run.
pub struct ModelArchive {
    config: ArchiveConfig,
}

impl ModelArchive {
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Copies every model file into `dest_dir`, each name prefixed with `prefix`.
    /// Missing model files are skipped with a warning.
    fn copy_model_files(&self, dest_dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, HarnessError> {
        fs::create_dir_all(dest_dir)?;
        let mut saved = Vec::new();
        for src in self.config.model_files.iter() {
            let name = match src.file_name() {
                Some(n) => n.to_string_lossy().to_string(),
                None => continue,
            };
            if !src.exists() {
                warn!("{} not found during checkpointing.", src.display());
                continue;
            }
            let dest = dest_dir.join(format!("{}{}", prefix, name));
            copy_recursively(src, &dest)?;
            info!("Checkpoint saved: {}", dest.display());
            saved.push(dest);
        }
        Ok(saved)
    }

    /// Saves `<checkpoint_dir>/<timestamp>_chunk<k>_<name>` for every model file.
    pub fn save_checkpoint(&self, chunk: usize) -> Result<Vec<PathBuf>, HarnessError> {
        let prefix = format!("{}_chunk{}_", archive_timestamp(), chunk);
        self.copy_model_files(&self.config.checkpoint_dir, &prefix)
    }

    /// Saves `<final_dir>/<timestamp>_<name>` for every model file.
    pub fn save_final(&self) -> Result<Vec<PathBuf>, HarnessError> {
        let prefix = format!("{}_", archive_timestamp());
        self.copy_model_files(&self.config.final_dir, &prefix)
    }

    /// Replaces the contents of the live model directory with a stored model.
    pub fn restore(&self, from: &Path) -> Result<(), HarnessError> {
        if !from.is_dir() {
            return Err(HarnessError::MissingInput(format!(
                "Final model directory not found at {}",
                from.display()
            )));
        }
        let live = &self.config.live_model_dir;
        fs::create_dir_all(live)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            let dest = live.join(entry.file_name());
            if dest.is_dir() {
                fs::remove_dir_all(&dest)?;
            }
            debug!("Copying {:?} to {:?}", entry.file_name(), live);
            copy_recursively(&entry.path(), &dest)?;
        }
        Ok(())
    }
}

/// Retrains the advisor and, when an archive is configured, checkpoints the new model.
pub struct Checkpointer<A: AdvisorControl> {
    advisor: A,
    archive: Option<ModelArchive>,
}

impl<A: AdvisorControl> Checkpointer<A> {
    pub fn new(advisor: A, archive: Option<ModelArchive>) -> Self {
        Self { advisor, archive }
    }

    pub fn advisor_mut(&mut self) -> &mut A {
        &mut self.advisor
    }

    pub fn archive(&self) -> Option<&ModelArchive> {
        self.archive.as_ref()
    }

    /// A failed retrain is returned before any checkpoint is taken.
    pub fn retrain_and_checkpoint(&mut self, chunk: usize) -> Result<(), HarnessError> {
        self.advisor.retrain()?;
        if let Some(archive) = &self.archive {
            archive.save_checkpoint(chunk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::testutil::*;
    use temp_testdir::TempDir;

    fn model_tree(root: &Path) -> ArchiveConfig {
        let model = root.join("server/model");
        fs::create_dir_all(model.join("nested")).unwrap();
        fs::write(model.join("nn.pt"), "weights").unwrap();
        fs::write(model.join("nested/scaler.pkl"), "scaler").unwrap();
        let meta = root.join("server/model.metadata.json");
        fs::write(&meta, "{}").unwrap();
        ArchiveConfig {
            model_files: vec![model.clone(), meta, root.join("server/missing.json")],
            live_model_dir: model,
            checkpoint_dir: root.join("checkpoints"),
            final_dir: root.join("final"),
        }
    }

    struct CountingAdvisor {
        retrains: usize,
        fail: bool,
    }

    impl AdvisorControl for CountingAdvisor {
        fn start(&mut self) -> Result<(), HarnessError> {
            Ok(())
        }
        fn stop(&mut self) -> Result<(), HarnessError> {
            Ok(())
        }
        fn retrain(&mut self) -> Result<(), HarnessError> {
            self.retrains += 1;
            if self.fail {
                Err(HarnessError::CollaboratorError("retrain".to_string()))
            } else {
                Ok(())
            }
        }
        fn load_model(&mut self, _model_dir: &Path) -> Result<(), HarnessError> {
            Ok(())
        }
    }

    #[test]
    fn test_save_checkpoint() {
        init();
        let tdir = TempDir::new(gen_random_dir(), true);
        let archive = ModelArchive::new(model_tree(&tdir));
        let saved = archive.save_checkpoint(3).unwrap();
        assert_eq!(2, saved.len());
        let name = saved[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("_chunk3_model"), "{}", name);
        assert!(saved[0].join("nested/scaler.pkl").is_file());
        assert!(saved[1].is_file());
    }

    #[test]
    fn test_save_final_and_restore() {
        init();
        let tdir = TempDir::new(gen_random_dir(), true);
        let config = model_tree(&tdir);
        let archive = ModelArchive::new(config.clone());
        let saved = archive.save_final().unwrap();
        assert!(saved[0].starts_with(&config.final_dir));

        fs::write(config.live_model_dir.join("nn.pt"), "retrained").unwrap();
        archive.restore(&saved[0]).unwrap();
        assert_eq!(
            "weights",
            fs::read_to_string(config.live_model_dir.join("nn.pt")).unwrap()
        );
        assert!(archive.restore(&tdir.join("nope")).is_err());
    }

    #[test]
    fn test_checkpointer() {
        init();
        let tdir = TempDir::new(gen_random_dir(), true);
        let archive = ModelArchive::new(model_tree(&tdir));
        let advisor = CountingAdvisor {
            retrains: 0,
            fail: false,
        };
        let mut cp = Checkpointer::new(advisor, Some(archive));
        cp.retrain_and_checkpoint(1).unwrap();
        assert_eq!(1, cp.advisor_mut().retrains);
        let count = fs::read_dir(&tdir.join("checkpoints")).unwrap().count();
        assert_eq!(2, count);

        cp.advisor_mut().fail = true;
        assert!(cp.retrain_and_checkpoint(2).is_err());
        let count = fs::read_dir(&tdir.join("checkpoints")).unwrap().count();
        assert_eq!(2, count);
    }
}
