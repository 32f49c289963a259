use crate::query::{Session, SessionSource};
use common::testutil::sample_plan;
use common::HarnessError;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared, ordered record of what happened during a test run.
pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn new_journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// Scripted reply to a statement.
#[derive(Debug, Clone)]
pub enum Outcome {
    Plan(Value),
    Fail(String),
}

/// In-memory session source. Sessions answer from a per-statement script and
/// log every call (`acquire`, `set name=value`, `plain sql`, `explain sql`,
/// `release`) to a journal that other test doubles can share.
///
/// Unscripted statements succeed with a 1 ms plan recommending hint `0`.
pub struct ScriptedSource {
    journal: Journal,
    script: HashMap<String, Outcome>,
    fail_connect: bool,
    reject_settings: bool,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::with_journal(new_journal())
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            script: HashMap::new(),
            fail_connect: false,
            reject_settings: false,
        }
    }

    pub fn script(mut self, sql: &str, outcome: Outcome) -> Self {
        self.script.insert(sql.to_string(), outcome);
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn rejecting_settings(mut self) -> Self {
        self.reject_settings = true;
        self
    }

    pub fn journal(&self) -> Journal {
        Rc::clone(&self.journal)
    }

    pub fn events(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    fn log(&self, event: String) {
        self.journal.borrow_mut().push(event);
    }

    fn outcome(&self, sql: &str) -> Outcome {
        self.script
            .get(sql)
            .cloned()
            .unwrap_or_else(|| Outcome::Plan(sample_plan(1.0, 0.1, Some("0"))))
    }
}

impl SessionSource for ScriptedSource {
    fn acquire(&self) -> Result<Box<dyn Session + '_>, HarnessError> {
        if self.fail_connect {
            self.log("connect failed".to_string());
            return Err(HarnessError::DatabaseError(String::from(
                "could not connect to server: Connection refused",
            )));
        }
        self.log("acquire".to_string());
        Ok(Box::new(ScriptedSession { source: self }))
    }
}

struct ScriptedSession<'a> {
    source: &'a ScriptedSource,
}

impl<'a> Session for ScriptedSession<'a> {
    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), HarnessError> {
        self.source.log(format!("set {}={}", name, value));
        if self.source.reject_settings {
            return Err(HarnessError::DatabaseError(format!(
                "unrecognized configuration parameter \"{}\"",
                name
            )));
        }
        Ok(())
    }

    fn run_plain(&mut self, sql: &str) -> Result<(), HarnessError> {
        self.source.log(format!("plain {}", sql));
        match self.source.outcome(sql) {
            Outcome::Plan(_) => Ok(()),
            Outcome::Fail(msg) => Err(HarnessError::DatabaseError(msg)),
        }
    }

    fn explain_analyze(&mut self, sql: &str) -> Result<Value, HarnessError> {
        self.source.log(format!("explain {}", sql));
        match self.source.outcome(sql) {
            Outcome::Plan(plan) => Ok(plan),
            Outcome::Fail(msg) => Err(HarnessError::DatabaseError(msg)),
        }
    }
}

impl<'a> Drop for ScriptedSession<'a> {
    fn drop(&mut self) {
        self.source.log("release".to_string());
    }
}
