use common::{HarnessError, QueryItem, PLAN_ARCHIVE_DIR};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads the workload's queries.
///
/// With a manifest, queries come in manifest order; each line names a file
/// `<id>.sql` expected at `<workload_dir>/<id>/<id>.sql`. Without one, every
/// `.sql` file under `workload_dir` is loaded in lexicographic path order.
///
/// Manifest entries that are not `.sql` files or do not exist are skipped with
/// a warning. A missing workload directory is an error.
///
/// # Arguments
///
/// * `workload_dir` - Root directory of the workload.
/// * `manifest` - Optional file listing query files in execution order.
/// * `skip_processed` - Skip queries whose directory already holds a plan archive.
pub fn fetch_queries(
    workload_dir: &Path,
    manifest: Option<&Path>,
    skip_processed: bool,
) -> Result<Vec<QueryItem>, HarnessError> {
    if !workload_dir.is_dir() {
        error!(
            "The directory {} does not exist.",
            workload_dir.display()
        );
        return Err(HarnessError::MissingInput(format!(
            "workload directory {} does not exist",
            workload_dir.display()
        )));
    }

    let candidates = match manifest {
        Some(m) => manifest_paths(workload_dir, m)?,
        None => {
            info!("No query order file provided. Executing all queries in the directory.");
            let mut paths = Vec::new();
            collect_sql_files(workload_dir, &mut paths)?;
            paths.sort();
            paths
        }
    };

    let mut queries = Vec::new();
    for path in candidates {
        if skip_processed && already_processed(&path) {
            info!(
                "Skipping {} as {} directory already exists",
                path.display(),
                PLAN_ARCHIVE_DIR
            );
            continue;
        }
        if !path.is_file() {
            warn!("Warning: {} does not exist. Skipping.", path.display());
            continue;
        }
        let sql = fs::read_to_string(&path)?;
        queries.push(QueryItem::new(path, sql));
    }
    info!(
        "Found {} queries in {}",
        queries.len(),
        workload_dir.display()
    );
    Ok(queries)
}

fn manifest_paths(workload_dir: &Path, manifest: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let contents = fs::read_to_string(manifest).map_err(|e| {
        HarnessError::MissingInput(format!("query order file {}: {}", manifest.display(), e))
    })?;
    let mut paths = Vec::new();
    for line in contents.lines() {
        let filename = line.trim();
        if filename.is_empty() {
            continue;
        }
        if !filename.ends_with(".sql") {
            warn!("Warning: {} is not a .sql file. Skipping.", filename);
            continue;
        }
        let file_id = filename.split('.').next().unwrap_or(filename);
        paths.push(workload_dir.join(file_id).join(filename));
    }
    Ok(paths)
}

fn collect_sql_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), HarnessError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_sql_files(&path, out)?;
        } else if path.extension().map_or(false, |ext| ext == "sql") {
            out.push(path);
        }
    }
    Ok(())
}

fn already_processed(query_path: &Path) -> bool {
    query_path
        .parent()
        .map_or(false, |dir| dir.join(PLAN_ARCHIVE_DIR).exists())
}
