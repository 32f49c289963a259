pub use connection::{
    ConnectionMode, Connector, DatabaseParams, FreshConnector, PoolSettings, PooledConnector,
    Session, SessionSource,
};
pub use executor::Executor;
pub use session::apply_session_config;
pub mod connection;
mod executor;
pub mod plan;
mod session;
