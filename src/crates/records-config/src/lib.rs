//! Typed configuration for the case orchestration engine.
//!
//! Every recognized option is a field on [`Settings`] with a documented
//! default, loadable from the process environment via
//! [`Settings::from_env`]. Following the teacher's `orca::config::loader`
//! layering, environment variables always win over the built-in defaults;
//! there is no intermediate file layer, since environment variables are
//! this component's only configuration surface.

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Whether the Executor performs real side effects or logs no-ops
/// instead (`EXECUTION_MODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Live,
    Dry,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Live
    }
}

impl FromStr for ExecutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LIVE" => Ok(Self::Live),
            "DRY" => Ok(Self::Dry),
            other => Err(ConfigError::InvalidValue {
                key: "EXECUTION_MODE",
                value: other.to_string(),
            }),
        }
    }
}

/// Default autopilot mode for a newly-loaded configuration
/// (`AUTOPILOT_MODE`, default SUPERVISED). This is the *process-wide*
/// default; a `Case`'s own `autopilot_mode` field (records-core) always
/// takes precedence once the case exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAutopilotMode {
    Auto,
    Supervised,
    Manual,
}

impl Default for DefaultAutopilotMode {
    fn default() -> Self {
        Self::Supervised
    }
}

impl FromStr for DefaultAutopilotMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AUTO" => Ok(Self::Auto),
            "SUPERVISED" => Ok(Self::Supervised),
            "MANUAL" => Ok(Self::Manual),
            other => Err(ConfigError::InvalidValue {
                key: "AUTOPILOT_MODE",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// All recognized configuration options, plus the connection strings
/// the ambient stack needs (database, LLM provider).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Cap on follow-ups before an escalation is raised. Default 2.
    pub max_followups: u32,
    /// Days to wait between a sent follow-up and the next one. Default 7.
    pub followup_delay_days: u32,
    /// Threshold below which fee acceptance auto-executes in AUTO mode.
    /// Default 100.
    pub fee_auto_approve_max: f64,
    /// Threshold above which a fee is negotiated rather than accepted or
    /// declined outright. Default 500.
    pub fee_moderate_max: f64,
    /// Global per-run iteration bound enforced by the router. Default 5.
    pub max_iterations: u32,
    /// Process-wide default autopilot mode. Default SUPERVISED.
    pub default_autopilot_mode: DefaultAutopilotMode,
    /// Whether the executor performs real side effects. Default LIVE.
    pub execution_mode: ExecutionMode,
    /// Statutory response deadline in days, used by `commit_state` to
    /// recompute `next_due_at` absent a jurisdiction-specific override.
    /// Default 10.
    pub statutory_deadline_days: u32,
    /// Lower/upper bound in minutes of the human-like delay applied to
    /// queued email jobs. Default 120..=600.
    pub email_delay_minutes: (u32, u32),
    /// Queue worker retry policy: attempts and base exponential backoff.
    pub queue_max_attempts: u32,
    pub queue_backoff_base_secs: u64,
    /// Postgres connection string for `records-store`/`records-checkpoint`.
    pub database_url: String,
    /// Anthropic API key for `records-llm`'s `AnthropicProvider`. Absent
    /// means the provider falls back to `MockProvider`.
    pub anthropic_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_followups: 2,
            followup_delay_days: 7,
            fee_auto_approve_max: 100.0,
            fee_moderate_max: 500.0,
            max_iterations: 5,
            default_autopilot_mode: DefaultAutopilotMode::default(),
            execution_mode: ExecutionMode::default(),
            statutory_deadline_days: 10,
            email_delay_minutes: (120, 600),
            queue_max_attempts: 3,
            queue_backoff_base_secs: 5,
            database_url: "postgres://localhost/records_agent".to_string(),
            anthropic_api_key: None,
        }
    }
}

impl Settings {
    /// Load from the process environment, falling back to
    /// [`Settings::default`] for anything unset. Mirrors the teacher's
    /// `orca::config::loader` pattern of "parse if present, default
    /// otherwise, surface a typed error only for malformed values".
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(v) = env_u32("MAX_FOLLOWUPS")? {
            settings.max_followups = v;
        }
        if let Some(v) = env_u32("FOLLOWUP_DELAY_DAYS")? {
            settings.followup_delay_days = v;
        }
        if let Some(v) = env_f64("FEE_AUTO_APPROVE_MAX")? {
            settings.fee_auto_approve_max = v;
        }
        if let Some(v) = env_f64("FEE_MODERATE_MAX")? {
            settings.fee_moderate_max = v;
        }
        if let Some(v) = env_u32("LANGGRAPH_MAX_ITERATIONS")? {
            settings.max_iterations = v;
        }
        if let Ok(v) = env::var("AUTOPILOT_MODE") {
            settings.default_autopilot_mode = v.parse()?;
        }
        if let Ok(v) = env::var("EXECUTION_MODE") {
            settings.execution_mode = v.parse()?;
        }
        if let Some(v) = env::var("DATABASE_URL").ok() {
            settings.database_url = v;
        }
        settings.anthropic_api_key = env::var("ANTHROPIC_API_KEY").ok();

        Ok(settings)
    }
}

fn env_u32(key: &'static str) -> Result<Option<u32>, ConfigError> {
    match env::var(key) {
        Ok(v) => v
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: v }),
        Err(_) => Ok(None),
    }
}

fn env_f64(key: &'static str) -> Result<Option<f64>, ConfigError> {
    match env::var(key) {
        Ok(v) => v
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: v }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let settings = Settings::default();
        assert_eq!(settings.max_followups, 2);
        assert_eq!(settings.followup_delay_days, 7);
        assert_eq!(settings.fee_auto_approve_max, 100.0);
        assert_eq!(settings.fee_moderate_max, 500.0);
        assert_eq!(settings.max_iterations, 5);
        assert_eq!(settings.default_autopilot_mode, DefaultAutopilotMode::Supervised);
        assert_eq!(settings.execution_mode, ExecutionMode::Live);
        assert_eq!(settings.statutory_deadline_days, 10);
    }

    #[test]
    fn execution_mode_parses_case_insensitively() {
        assert_eq!("dry".parse::<ExecutionMode>().unwrap(), ExecutionMode::Dry);
        assert_eq!("LIVE".parse::<ExecutionMode>().unwrap(), ExecutionMode::Live);
        assert!("bogus".parse::<ExecutionMode>().is_err());
    }
}
