use crate::query::connection::Session;
use common::{HarnessError, SessionConfig};

/// Applies the advisory flags to a session before any workload statement.
///
/// Each parameter is sent as a bound argument to `set_config`, never spliced
/// into SQL text. The first rejected parameter fails the whole call.
pub fn apply_session_config(
    session: &mut dyn Session,
    config: &SessionConfig,
) -> Result<(), HarnessError> {
    for (name, value) in config.settings() {
        debug!("SET {} = {}", name, value);
        session.set_parameter(name, &value)?;
    }
    Ok(())
}
