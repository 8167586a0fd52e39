use std::str::FromStr;

use reclaim_api::ConfigError;
use tracing::warn;

pub const DEFAULT_POOL_NAME: &str = "reusable";
pub const DEFAULT_INITIAL_SIZE: usize = 32;
pub const DEFAULT_MAXIMUM_SIZE: usize = 64;
pub const DEFAULT_FAILURE_REPORT_CAPACITY: usize = 128;

pub const ENV_POOL_NAME: &str = "RECLAIM_POOL_NAME";
pub const ENV_INITIAL_SIZE: &str = "RECLAIM_POOL_INITIAL_SIZE";
pub const ENV_MAXIMUM_SIZE: &str = "RECLAIM_POOL_MAXIMUM_SIZE";
pub const ENV_STACK_SIZE: &str = "RECLAIM_POOL_STACK_SIZE";

/// Configuration for a [`Pool`](crate::Pool).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Name of the pool's thread group; prefix of every worker thread name.
    pub name: String,

    /// Workers constructed up front. Their threads still launch lazily.
    pub initial_size: usize,

    /// Maximum number of idle workers kept for reuse.
    pub maximum_size: usize,

    /// Stack size for worker threads, platform default when `None`.
    pub stack_size: Option<usize>,

    /// Capacity of the task failure report channel.
    pub failure_report_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_POOL_NAME.to_string(),
            initial_size: DEFAULT_INITIAL_SIZE,
            maximum_size: DEFAULT_MAXIMUM_SIZE,
            stack_size: None,
            failure_report_capacity: DEFAULT_FAILURE_REPORT_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Read overrides from the process environment.
    ///
    /// Unset variables keep their defaults; values that fail to parse fall
    /// back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            name: lookup(ENV_POOL_NAME).unwrap_or(defaults.name),
            initial_size: parse_or(&lookup, ENV_INITIAL_SIZE, defaults.initial_size),
            maximum_size: parse_or(&lookup, ENV_MAXIMUM_SIZE, defaults.maximum_size),
            stack_size: lookup(ENV_STACK_SIZE)
                .and_then(|raw| parse_value(ENV_STACK_SIZE, &raw))
                .or(defaults.stack_size),
            failure_report_capacity: defaults.failure_report_capacity,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.contains('\0') {
            return Err(ConfigError::InvalidThreadName(self.name.clone()));
        }
        if self.failure_report_capacity == 0 {
            return Err(ConfigError::ZeroFailureCapacity);
        }
        Ok(())
    }

    /// Number of workers to pre-warm; never more than `maximum_size`.
    pub fn effective_initial_size(&self) -> usize {
        self.initial_size.min(self.maximum_size)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|raw| parse_value(key, &raw))
        .unwrap_or(default)
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = raw, "ignoring unparsable pool setting");
            None
        }
    }
}
