//! Pipeline configuration.
//!
//! Sources are layered lowest to highest: built-in defaults, an optional
//! config file, then `ORDERPULSE_*` environment variables (`__` separates
//! nested keys, e.g. `ORDERPULSE_RETRY__MAX_ATTEMPTS=3`). Command-line flags
//! are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::retry::RetryPolicy;

pub const ENV_PREFIX: &str = "ORDERPULSE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(with = "humantime_serde")]
    pub window_size: Duration,
    /// Watermark delay and grace period for out-of-order events.
    #[serde(with = "humantime_serde")]
    pub allowed_lateness: Duration,
    /// Emission cadence. Falls back to `window_size` when unset.
    #[serde(with = "humantime_serde")]
    pub flush_interval: Option<Duration>,
    /// `-` for stdin, `tcp://host:port`, `file://path` or a bare path.
    pub source_endpoint: String,
    pub sink_directory: PathBuf,
    /// Payloads buffered between the reader and the aggregation task.
    pub buffer_capacity: usize,
    /// Echo every accepted order at info level.
    pub log_events: bool,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: Duration::from_secs(600),
            allowed_lateness: Duration::from_secs(60),
            flush_interval: None,
            source_endpoint: "-".to_string(),
            sink_directory: PathBuf::from("kpis"),
            buffer_capacity: 1024,
            log_events: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        Self::load_with_env(path, Self::environment())
    }

    /// Like [`load`](Self::load) with an explicit environment source.
    pub fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, PipelineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config: Self = builder
            .add_source(env)
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    pub fn flush_interval(&self) -> Duration {
        self.flush_interval.unwrap_or(self.window_size)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window_size.is_zero() {
            return Err(invalid("window_size must be positive"));
        }
        if self.window_size.subsec_nanos() % 1_000_000 != 0 {
            return Err(invalid("window_size must be a whole number of milliseconds"));
        }
        if i64::try_from(self.window_size.as_millis()).is_err() {
            return Err(invalid("window_size is too large"));
        }
        if i64::try_from(self.allowed_lateness.as_millis()).is_err() {
            return Err(invalid("allowed_lateness is too large"));
        }
        if self.flush_interval().is_zero() {
            return Err(invalid("flush_interval must be positive"));
        }
        if self.buffer_capacity == 0 {
            return Err(invalid("buffer_capacity must be positive"));
        }
        if self.sink_directory.as_os_str().is_empty() {
            return Err(invalid("sink_directory must not be empty"));
        }
        if self.source_endpoint.trim().is_empty() {
            return Err(invalid("source_endpoint must not be empty"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> PipelineError {
    PipelineError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
