use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde_json::{json, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn gen_rand_string(n: usize) -> String {
    thread_rng().sample_iter(Alphanumeric).take(n).map(char::from).collect()
}

pub fn gen_random_dir() -> PathBuf {
    init();
    let mut dir = env::temp_dir();
    dir.push(String::from("baobench"));
    let rand_string = gen_rand_string(10);
    dir.push(rand_string);
    dir
}

/// Writes `sql` to `root/relative`, creating parent directories.
pub fn write_query_file(root: &Path, relative: &str, sql: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, sql).unwrap();
    path
}

/// A plan document shaped like the output of `EXPLAIN (ANALYZE, VERBOSE, FORMAT JSON)`
/// with the advisor extension loaded.
pub fn sample_plan(execution_ms: f64, planning_ms: f64, hint: Option<&str>) -> Value {
    let mut entry = json!({
        "Plan": {
            "Node Type": "Seq Scan",
            "Relation Name": "title",
            "Actual Total Time": execution_ms,
            "Actual Rows": 1,
        },
        "Planning Time": planning_ms,
        "Triggers": [],
        "Execution Time": execution_ms,
    });
    if let Some(h) = hint {
        entry["Bao"] = json!({ "Bao recommended hint": h, "Bao prediction": 12.5 });
    }
    json!([entry])
}
