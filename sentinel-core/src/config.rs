use crate::constants::*;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),
    #[error("invalid override for {key}: {value:?}")]
    InvalidOverride { key: String, value: String },
    #[error("invalid load profile: {0}")]
    InvalidLoad(String),
}

/// Connection details for one target environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Per-step deadlines for the booking workflow.
///
/// Each step that can block on the target application carries its own
/// deadline; exceeding one is a timeout failure for that task, distinct from
/// an exception-style failure.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deadlines {
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_login")]
    pub login: Duration,
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_submission")]
    pub submission: Duration,
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_confirmation")]
    pub confirmation: Duration,
    #[serde_as(as = "DurationMilliSeconds")]
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,
}

fn default_login() -> Duration {
    DEFAULT_LOGIN_DEADLINE
}
fn default_submission() -> Duration {
    DEFAULT_SUBMISSION_DEADLINE
}
fn default_confirmation() -> Duration {
    DEFAULT_CONFIRMATION_DEADLINE
}
fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            login: default_login(),
            submission: default_submission(),
            confirmation: default_confirmation(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// How much load to generate: total simulated users and the cap on
/// concurrently open sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProfile {
    #[serde(default = "default_users")]
    pub users: u32,
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

fn default_users() -> u32 {
    DEFAULT_USERS
}
fn default_concurrency() -> u32 {
    DEFAULT_CONCURRENCY
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            users: default_users(),
            concurrency: default_concurrency(),
        }
    }
}

impl LoadProfile {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users == 0 {
            return Err(ConfigError::InvalidLoad("users must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidLoad(
                "concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Number of workers the pool actually needs.
    pub fn worker_count(&self) -> usize {
        self.users.min(self.concurrency) as usize
    }
}

/// Explicit configuration object for a stress run.
///
/// Loaded once (file, then environment-variable overrides) and passed into
/// the harness constructor; nothing reads configuration ad hoc mid-workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressConfig {
    pub active_environment: String,
    pub environments: HashMap<String, EnvironmentConfig>,
    #[serde(default)]
    pub deadlines: Deadlines,
    #[serde(default)]
    pub load: LoadProfile,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl StressConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.environment()?;
        config.load.validate()?;
        Ok(config)
    }

    /// The active target environment.
    pub fn environment(&self) -> Result<&EnvironmentConfig, ConfigError> {
        self.environments
            .get(&self.active_environment)
            .ok_or_else(|| ConfigError::UnknownEnvironment(self.active_environment.clone()))
    }

    fn environment_mut(&mut self) -> Result<&mut EnvironmentConfig, ConfigError> {
        let name = self.active_environment.clone();
        self.environments
            .get_mut(&name)
            .ok_or(ConfigError::UnknownEnvironment(name))
    }

    /// Apply `SENTINEL_*` environment-variable overrides. Precedence is
    /// env > file > defaults, matching the loader this replaces.
    ///
    /// Takes an explicit iterator so callers pass `std::env::vars()` while
    /// tests pass fixed pairs.
    pub fn apply_overrides(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        let vars: Vec<(String, String)> = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with("SENTINEL_"))
            .collect();

        // Environment selection first, so field overrides land on the right
        // entry regardless of iteration order.
        for (key, value) in &vars {
            if key == "SENTINEL_ENV" {
                if !self.environments.contains_key(value) {
                    return Err(ConfigError::UnknownEnvironment(value.clone()));
                }
                self.active_environment = value.clone();
            }
        }

        for (key, value) in vars {
            match key.as_str() {
                "SENTINEL_ENV" => {}
                "SENTINEL_BASE_URL" => self.environment_mut()?.base_url = value,
                "SENTINEL_USERNAME" => self.environment_mut()?.username = value,
                "SENTINEL_PASSWORD" => self.environment_mut()?.password = value,
                "SENTINEL_USERS" => self.load.users = parse_number(&key, &value)?,
                "SENTINEL_CONCURRENCY" => self.load.concurrency = parse_number(&key, &value)?,
                "SENTINEL_SEED" => self.seed = Some(parse_number(&key, &value)?),
                "SENTINEL_LOGIN_TIMEOUT" => self.deadlines.login = parse_duration(&key, &value)?,
                "SENTINEL_SUBMISSION_TIMEOUT" => {
                    self.deadlines.submission = parse_duration(&key, &value)?
                }
                "SENTINEL_CONFIRMATION_TIMEOUT" => {
                    self.deadlines.confirmation = parse_duration(&key, &value)?
                }
                "SENTINEL_POLL_INTERVAL" => {
                    self.deadlines.poll_interval = parse_duration(&key, &value)?
                }
                other => warn!("ignoring unrecognized override {other}"),
            }
        }

        self.load.validate()
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Durations come in humantime form, e.g. `10s` or `250ms`.
fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|_| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
