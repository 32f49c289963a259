use crate::TIMEOUT_LIMIT_MS;

/// Where the advisor service listens, and how many arms it chooses between.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[serde(default)]
pub struct AdvisorEndpoint {
    pub host: String,
    pub port: u16,
    pub num_arms: u32,
}

impl Default for AdvisorEndpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9381,
            num_arms: 5,
        }
    }
}

/// Advisory flags applied at the start of every session.
///
/// The global advisor switch is not stored: it is on exactly when selection or
/// reward recording is requested.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SessionConfig {
    pub select_enabled: bool,
    pub reward_enabled: bool,
    pub advisor: AdvisorEndpoint,
    pub statement_timeout_ms: u64,
}

impl SessionConfig {
    pub fn new(select_enabled: bool, reward_enabled: bool, advisor: AdvisorEndpoint) -> Self {
        Self {
            select_enabled,
            reward_enabled,
            advisor,
            statement_timeout_ms: TIMEOUT_LIMIT_MS,
        }
    }

    pub fn with_statement_timeout(mut self, timeout_ms: u64) -> Self {
        self.statement_timeout_ms = timeout_ms;
        self
    }

    pub fn enable_advisor(&self) -> bool {
        self.select_enabled || self.reward_enabled
    }

    /// Server parameters in the order they are applied.
    pub fn settings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("enable_bao", on_off(self.enable_advisor())),
            ("bao_host", self.advisor.host.clone()),
            ("bao_port", self.advisor.port.to_string()),
            ("enable_bao_selection", on_off(self.select_enabled)),
            ("enable_bao_rewards", on_off(self.reward_enabled)),
            ("bao_num_arms", self.advisor.num_arms.to_string()),
            ("statement_timeout", self.statement_timeout_ms.to_string()),
        ]
    }
}

fn on_off(flag: bool) -> String {
    let value = if flag { "on" } else { "off" };
    value.to_string()
}
