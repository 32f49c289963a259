use crate::query::connection::SessionSource;
use crate::query::plan;
use crate::query::session::apply_session_config;
use common::{HarnessError, Measurement, ModeLabel, SessionConfig};

/// Runs workload statements under a configured session and measures them.
///
/// Executions are strictly sequential. Any fault while connecting, configuring
/// or executing is absorbed here: the caller always gets one measurement per
/// requested repetition.
pub struct Executor<'a, S: SessionSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: SessionSource + ?Sized> Executor<'a, S> {
    /// Initializes an executor over a session source owned by the caller.
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Executes `sql` `repeat_count` times in one session.
    ///
    /// When rewards are enabled each repetition first runs the plain statement,
    /// since the advisor extension does not learn from explained executions, and
    /// then the measured `EXPLAIN ANALYZE` form.
    ///
    /// On any error the whole batch is replaced by `repeat_count` failed
    /// measurements carrying the sentinel time of twice the statement timeout.
    ///
    /// # Arguments
    ///
    /// * `sql` - Statement to run.
    /// * `config` - Advisory flags and statement timeout of the session.
    /// * `mode` - Label attached to the measurements.
    /// * `repeat_count` - Number of measured executions.
    pub fn execute(
        &self,
        sql: &str,
        config: &SessionConfig,
        mode: ModeLabel,
        repeat_count: usize,
    ) -> Vec<Measurement> {
        match self.try_execute(sql, config, mode, repeat_count) {
            Ok(measurements) => measurements,
            Err(e) => {
                warn!(
                    "An unexpected exception or timeout occurred during database querying: {}",
                    e
                );
                (0..repeat_count)
                    .map(|_| Measurement::failed(config.statement_timeout_ms, mode))
                    .collect()
            }
        }
    }

    fn try_execute(
        &self,
        sql: &str,
        config: &SessionConfig,
        mode: ModeLabel,
        repeat_count: usize,
    ) -> Result<Vec<Measurement>, HarnessError> {
        // Released on every return path when `session` drops.
        let mut session = self.source.acquire()?;
        apply_session_config(session.as_mut(), config)?;

        let mut measurements = Vec::with_capacity(repeat_count);
        for i in 0..repeat_count {
            if config.reward_enabled {
                session.run_plain(sql)?;
            }
            let doc = session.explain_analyze(sql)?;
            let timings = plan::extract_timings(&doc)?;
            let hint = if config.select_enabled {
                Some(plan::extract_hint(&doc)?)
            } else {
                None
            };
            info!(
                "\t{}: Execution Time: {:.4}\tPlanning Time: {:.4}",
                i, timings.execution_time_ms, timings.planning_time_ms
            );
            measurements.push(Measurement::new(
                timings.execution_time_ms,
                timings.planning_time_ms,
                hint,
                doc,
                mode,
            ));
        }
        Ok(measurements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Outcome, ScriptedSource};
    use common::testutil::{init, sample_plan};
    use common::{AdvisorEndpoint, TIMEOUT_LIMIT_MS};

    fn config(select: bool, reward: bool) -> SessionConfig {
        SessionConfig::new(select, reward, AdvisorEndpoint::default())
    }

    #[test]
    fn test_execute_success() {
        init();
        let source = ScriptedSource::new().script(
            "select 1",
            Outcome::Plan(sample_plan(42.0, 1.5, Some("3"))),
        );
        let exec = Executor::new(&source);
        let ms = exec.execute("select 1", &config(true, false), ModeLabel::Advisor, 3);
        assert_eq!(3, ms.len());
        for m in ms.iter() {
            assert_eq!(42.0, m.execution_time_ms);
            assert_eq!(1.5, m.planning_time_ms);
            assert_eq!(Some("3".to_string()), m.hint);
            assert!(m.execution_plan.is_some());
            assert_eq!(ModeLabel::Advisor, m.mode);
        }
        // One session for the whole batch.
        let events = source.events();
        assert_eq!(1, events.iter().filter(|e| *e == "acquire").count());
        assert_eq!(3, events.iter().filter(|e| e.starts_with("explain")).count());
        assert_eq!(Some(&"release".to_string()), events.last());
    }

    #[test]
    fn test_no_hint_without_selection() {
        init();
        let source = ScriptedSource::new();
        let exec = Executor::new(&source);
        let ms = exec.execute("select 1", &config(false, false), ModeLabel::Baseline, 1);
        assert_eq!(None, ms[0].hint);
        assert!(source.events().iter().all(|e| !e.starts_with("plain")));
    }

    #[test]
    fn test_reward_runs_plain_statement_first() {
        init();
        let source = ScriptedSource::new();
        let exec = Executor::new(&source);
        exec.execute("select 2", &config(true, true), ModeLabel::Advisor, 2);
        let statements: Vec<String> = source
            .events()
            .into_iter()
            .filter(|e| e.starts_with("plain") || e.starts_with("explain"))
            .collect();
        assert_eq!(
            vec![
                "plain select 2",
                "explain select 2",
                "plain select 2",
                "explain select 2"
            ],
            statements
        );
    }

    #[test]
    fn test_connection_failure_yields_sentinels() {
        init();
        let source = ScriptedSource::new().failing_connect();
        let exec = Executor::new(&source);
        let ms = exec.execute("select 1", &config(true, true), ModeLabel::Advisor, 3);
        assert_eq!(3, ms.len());
        for m in ms.iter() {
            assert_eq!(2.0 * TIMEOUT_LIMIT_MS as f64, m.execution_time_ms);
            assert_eq!(2.0 * TIMEOUT_LIMIT_MS as f64, m.planning_time_ms);
            assert!(m.hint.is_none());
            assert!(m.execution_plan.is_none());
        }
    }

    #[test]
    fn test_timeout_aborts_whole_batch() {
        init();
        let source = ScriptedSource::new().script(
            "select pg_sleep(500)",
            Outcome::Fail("canceling statement due to statement timeout".to_string()),
        );
        let exec = Executor::new(&source);
        let cfg = config(false, false).with_statement_timeout(1000);
        let ms = exec.execute("select pg_sleep(500)", &cfg, ModeLabel::Baseline, 3);
        assert_eq!(3, ms.len());
        assert!(ms.iter().all(|m| m.execution_time_ms == 2000.0 && m.is_failure()));
        // Stopped after the first failing statement and still released the session.
        let events = source.events();
        assert_eq!(1, events.iter().filter(|e| e.starts_with("explain")).count());
        assert_eq!(Some(&"release".to_string()), events.last());
    }

    #[test]
    fn test_rejected_configuration_is_a_query_fault() {
        init();
        let source = ScriptedSource::new().rejecting_settings();
        let exec = Executor::new(&source);
        let ms = exec.execute("select 1", &config(true, false), ModeLabel::Advisor, 2);
        assert_eq!(2, ms.len());
        assert!(ms.iter().all(|m| m.is_failure()));
        let events = source.events();
        assert!(events.iter().all(|e| !e.starts_with("explain")));
        assert_eq!(Some(&"release".to_string()), events.last());
    }

    #[test]
    fn test_missing_hint_is_a_query_fault() {
        init();
        let source =
            ScriptedSource::new().script("select 1", Outcome::Plan(sample_plan(1.0, 1.0, None)));
        let exec = Executor::new(&source);
        let ms = exec.execute("select 1", &config(true, false), ModeLabel::Advisor, 1);
        assert!(ms[0].is_failure());
        let ms = exec.execute("select 1", &config(false, false), ModeLabel::Baseline, 1);
        assert!(!ms[0].is_failure());
    }
}
