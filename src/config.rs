//! Runtime configuration with environment overrides.
//!
//! # Configuration Precedence
//!
//! 1. **Programmatic**: fields set directly on [`ReactiveConfig`]
//! 2. **Environment variables**: values from `REFLUX_*` env vars
//! 3. **Defaults**: [`ReactiveConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `REFLUX_POOL_THREAD_NAME_PREFIX` | `String` | `pool_thread_name_prefix` |
//! | `REFLUX_POOL_THREAD_STACK_SIZE` | `usize` | `pool_thread_stack_size` |
//! | `REFLUX_POOL_MAX_THREADS` | `usize` | `pool_max_threads` |
//! | `REFLUX_POOL_IDLE_TIMEOUT_MS` | `u64` (ms) | `pool_idle_timeout` |
//! | `REFLUX_SWAP_LIST_CAPACITY` | `usize` | `swap_list_capacity` |
//! | `REFLUX_UNHANDLED_RESPONSE` | `log` / `silent` | `unhandled_response` |

use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};
use crate::tracing_compat::debug;

/// Environment variable name for the default pool's thread name prefix.
pub const ENV_POOL_THREAD_NAME_PREFIX: &str = "REFLUX_POOL_THREAD_NAME_PREFIX";
/// Environment variable name for the default pool's thread stack size.
pub const ENV_POOL_THREAD_STACK_SIZE: &str = "REFLUX_POOL_THREAD_STACK_SIZE";
/// Environment variable name for the default pool's worker limit.
pub const ENV_POOL_MAX_THREADS: &str = "REFLUX_POOL_MAX_THREADS";
/// Environment variable name for the default pool's idle retirement timeout.
pub const ENV_POOL_IDLE_TIMEOUT_MS: &str = "REFLUX_POOL_IDLE_TIMEOUT_MS";
/// Environment variable name for the initial swap-list capacity.
pub const ENV_SWAP_LIST_CAPACITY: &str = "REFLUX_SWAP_LIST_CAPACITY";
/// Environment variable name for the default unhandled-error response.
pub const ENV_UNHANDLED_RESPONSE: &str = "REFLUX_UNHANDLED_RESPONSE";

/// What the default sink does with an unhandled error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnhandledResponse {
    /// Emit an `error!` event.
    #[default]
    Log,
    /// Drop the error.
    Silent,
}

/// Settings used to build process-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactiveConfig {
    /// Name prefix for threads spawned by the default task pool.
    pub pool_thread_name_prefix: String,
    /// Stack size in bytes for threads spawned by the default task pool.
    pub pool_thread_stack_size: usize,
    /// Upper bound on worker threads in the default task pool.
    pub pool_max_threads: usize,
    /// How long an idle pool worker waits for work before exiting.
    pub pool_idle_timeout: Duration,
    /// Initial capacity of each buffer in a marshalling observer's swap list.
    pub swap_list_capacity: usize,
    /// Behaviour of the default unhandled-error sink.
    pub unhandled_response: UnhandledResponse,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            pool_thread_name_prefix: "reflux-pool".to_string(),
            pool_thread_stack_size: 2 * 1024 * 1024,
            pool_max_threads: 4,
            pool_idle_timeout: Duration::from_secs(10),
            swap_list_capacity: 16,
            unhandled_response: UnhandledResponse::Log,
        }
    }
}

impl ReactiveConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.pool_thread_stack_size == 0 {
            return Err(invalid("pool_thread_stack_size must be greater than zero"));
        }
        if self.pool_max_threads == 0 {
            return Err(invalid("pool_max_threads must be at least one"));
        }
        if self.pool_thread_name_prefix.is_empty() {
            return Err(invalid("pool_thread_name_prefix must not be empty"));
        }
        Ok(())
    }
}

/// Apply environment variable overrides to a [`ReactiveConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut ReactiveConfig) -> Result<()> {
    if let Some(val) = read_env(ENV_POOL_THREAD_NAME_PREFIX) {
        config.pool_thread_name_prefix = val;
    }
    if let Some(val) = read_env(ENV_POOL_THREAD_STACK_SIZE) {
        config.pool_thread_stack_size = parse_usize(ENV_POOL_THREAD_STACK_SIZE, &val)?;
    }
    if let Some(val) = read_env(ENV_POOL_MAX_THREADS) {
        config.pool_max_threads = parse_usize(ENV_POOL_MAX_THREADS, &val)?;
    }
    if let Some(val) = read_env(ENV_POOL_IDLE_TIMEOUT_MS) {
        config.pool_idle_timeout = parse_millis(ENV_POOL_IDLE_TIMEOUT_MS, &val)?;
    }
    if let Some(val) = read_env(ENV_SWAP_LIST_CAPACITY) {
        config.swap_list_capacity = parse_usize(ENV_SWAP_LIST_CAPACITY, &val)?;
    }
    if let Some(val) = read_env(ENV_UNHANDLED_RESPONSE) {
        config.unhandled_response = parse_response(ENV_UNHANDLED_RESPONSE, &val)?;
    }
    config.validate()?;
    debug!(?config, "resolved reactive config");
    Ok(())
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidConfig).with_message(msg)
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize> {
    val.trim().parse::<usize>().map_err(|e| {
        invalid(format!(
            "invalid value for {var_name}: expected unsigned integer, got {val:?} ({e})"
        ))
    })
}

fn parse_millis(var_name: &str, val: &str) -> Result<Duration> {
    val.trim().parse::<u64>().map(Duration::from_millis).map_err(|e| {
        invalid(format!(
            "invalid value for {var_name}: expected milliseconds, got {val:?} ({e})"
        ))
    })
}

fn parse_response(var_name: &str, val: &str) -> Result<UnhandledResponse> {
    match val.trim().to_lowercase().as_str() {
        "log" => Ok(UnhandledResponse::Log),
        "silent" | "ignore" => Ok(UnhandledResponse::Silent),
        _ => Err(invalid(format!(
            "invalid value for {var_name}: expected log/silent, got {val:?}"
        ))),
    }
}

// =========================================================================
// Tests
// =========================================================================
