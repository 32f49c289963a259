use crate::PLAN_ARCHIVE_DIR;
use std::path::{Path, PathBuf};

/// One workload statement loaded from a `.sql` file.
///
/// The source path is the identity; `display_name` is the file's basename and
/// is only used to name output files, so two items from different directories
/// may share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryItem {
    source_path: PathBuf,
    display_name: String,
    sql: String,
}

impl QueryItem {
    /// Create a new query item.
    ///
    /// # Arguments
    ///
    /// * `source_path` - Path of the file the statement was read from.
    /// * `sql` - Statement text.
    pub fn new(source_path: PathBuf, sql: String) -> Self {
        let display_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            source_path,
            display_name,
            sql,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Directory containing the query file.
    pub fn query_dir(&self) -> &Path {
        self.source_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Root of this query's plan archive, `<query_dir>/BAO`.
    pub fn archive_dir(&self) -> PathBuf {
        self.query_dir().join(PLAN_ARCHIVE_DIR)
    }

    /// File name of an archived plan, `<name>_plan.json`.
    pub fn plan_file_name(&self) -> String {
        let stem = self
            .display_name
            .strip_suffix(".sql")
            .unwrap_or(&self.display_name);
        format!("{}_plan.json", stem)
    }
}
