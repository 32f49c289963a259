use common::HarnessError;
use postgres::{Client, NoTls};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Prefix wrapping every measured statement.
pub const EXPLAIN_PREFIX: &str = "EXPLAIN (ANALYZE, VERBOSE, FORMAT JSON)";

/// Builds the measured form of a statement.
pub fn explain_statement(sql: &str) -> String {
    format!("{} {}", EXPLAIN_PREFIX, sql)
}

/// One database session, exclusively held by its user until dropped.
///
/// Dropping the session releases it: a fresh connection is closed, a pooled one
/// goes back to its pool.
pub trait Session {
    /// Sets a server parameter for the rest of the session.
    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), HarnessError>;

    /// Runs a statement as-is and discards its rows.
    fn run_plain(&mut self, sql: &str) -> Result<(), HarnessError>;

    /// Runs a statement under `EXPLAIN (ANALYZE, VERBOSE, FORMAT JSON)` and returns the plan document.
    fn explain_analyze(&mut self, sql: &str) -> Result<Value, HarnessError>;
}

/// Hands out sessions.
pub trait SessionSource {
    fn acquire(&self) -> Result<Box<dyn Session + '_>, HarnessError>;
}

fn db_err(e: postgres::Error) -> HarnessError {
    HarnessError::DatabaseError(e.to_string())
}

fn pool_err(e: r2d2::Error) -> HarnessError {
    HarnessError::DatabaseError(format!("connection pool: {}", e))
}

impl Session for Client {
    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), HarnessError> {
        self.execute("SELECT set_config($1, $2, false)", &[&name, &value])
            .map(|_| ())
            .map_err(db_err)
    }

    fn run_plain(&mut self, sql: &str) -> Result<(), HarnessError> {
        self.simple_query(sql).map(|_| ()).map_err(db_err)
    }

    fn explain_analyze(&mut self, sql: &str) -> Result<Value, HarnessError> {
        let row = self
            .query_one(explain_statement(sql).as_str(), &[])
            .map_err(db_err)?;
        row.try_get::<_, Value>(0).map_err(db_err)
    }
}

type PgPooled = PooledConnection<PostgresConnectionManager<NoTls>>;

impl Session for PgPooled {
    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), HarnessError> {
        Session::set_parameter(&mut **self, name, value)
    }

    fn run_plain(&mut self, sql: &str) -> Result<(), HarnessError> {
        Session::run_plain(&mut **self, sql)
    }

    fn explain_analyze(&mut self, sql: &str) -> Result<Value, HarnessError> {
        Session::explain_analyze(&mut **self, sql)
    }
}

/// Connection parameters of the benchmark database.
#[derive(Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl Default for DatabaseParams {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "imdbload".to_string(),
        }
    }
}

impl fmt::Debug for DatabaseParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("dbname", &self.dbname)
            .finish()
    }
}

impl DatabaseParams {
    pub fn to_pg_config(&self) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(&self.dbname);
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        config
    }
}

/// How sessions are obtained.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// One new connection per executed statement batch.
    Fresh,
    /// Connections borrowed from a bounded pool.
    Pooled,
}

impl Default for ConnectionMode {
    fn default() -> Self {
        ConnectionMode::Fresh
    }
}

/// Pool sizing, mirroring a queue pool with overflow.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PoolSettings {
    pub pool_size: u32,
    pub max_overflow: u32,
    /// Connections older than this are replaced.
    pub recycle_secs: u64,
    /// Check connections for liveness before handing them out.
    pub pre_ping: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_size: 5,
            max_overflow: 10,
            recycle_secs: 3600,
            pre_ping: true,
        }
    }
}

/// Opens a new connection for every session.
pub struct FreshConnector {
    config: postgres::Config,
}

impl FreshConnector {
    pub fn new(params: &DatabaseParams) -> Self {
        Self {
            config: params.to_pg_config(),
        }
    }
}

impl SessionSource for FreshConnector {
    fn acquire(&self) -> Result<Box<dyn Session + '_>, HarnessError> {
        let client = self.config.connect(NoTls).map_err(db_err)?;
        Ok(Box::new(client))
    }
}

/// Borrows sessions from a connection pool. Server-side session state is not
/// trusted across hand-offs, so callers re-apply their configuration on every
/// acquisition.
pub struct PooledConnector {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

impl PooledConnector {
    pub fn new(params: &DatabaseParams, settings: &PoolSettings) -> Result<Self, HarnessError> {
        if settings.pool_size == 0 {
            return Err(HarnessError::ConfigError(String::from(
                "pool_size must be at least 1",
            )));
        }
        let manager = PostgresConnectionManager::new(params.to_pg_config(), NoTls);
        let pool = Pool::builder()
            .max_size(settings.pool_size + settings.max_overflow)
            .min_idle(Some(settings.pool_size))
            .max_lifetime(Some(Duration::from_secs(settings.recycle_secs)))
            .test_on_check_out(settings.pre_ping)
            .build(manager)
            .map_err(pool_err)?;
        debug!(
            "Connection pool ready: size {} overflow {}",
            settings.pool_size, settings.max_overflow
        );
        Ok(Self { pool })
    }
}

impl SessionSource for PooledConnector {
    fn acquire(&self) -> Result<Box<dyn Session + '_>, HarnessError> {
        let conn = self.pool.get().map_err(pool_err)?;
        Ok(Box::new(conn))
    }
}

/// Session source selected at startup.
pub enum Connector {
    Fresh(FreshConnector),
    Pooled(PooledConnector),
}

impl Connector {
    pub fn connect(
        params: &DatabaseParams,
        mode: ConnectionMode,
        settings: &PoolSettings,
    ) -> Result<Self, HarnessError> {
        info!("Connecting to {:?} with {:?} connections", params, mode);
        match mode {
            ConnectionMode::Fresh => Ok(Connector::Fresh(FreshConnector::new(params))),
            ConnectionMode::Pooled => Ok(Connector::Pooled(PooledConnector::new(
                params, settings,
            )?)),
        }
    }
}

impl SessionSource for Connector {
    fn acquire(&self) -> Result<Box<dyn Session + '_>, HarnessError> {
        match self {
            Connector::Fresh(c) => c.acquire(),
            Connector::Pooled(c) => c.acquire(),
        }
    }
}
