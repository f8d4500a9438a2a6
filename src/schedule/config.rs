//! Configuration for the schedule manager.
//!
//! [`ScheduleConfig`] decides how many pool threads are started and which identities they
//! carry. It can be built in code or loaded from JSON.

use crate::core::{Result, ThreadError, ThreadId};
use crate::pool::{worker_capacity, ThreadPoolConfig, DEFAULT_MAX_WORKER_THREADS};
use serde::{Deserialize, Serialize};

/// Configuration for a [`ScheduleManager`](super::ScheduleManager).
///
/// # Example
///
/// ```rust
/// use frame_scheduler::schedule::ScheduleConfig;
///
/// let config = ScheduleConfig::new()
///     .with_max_worker_threads(4)
///     .with_thread_name_prefix("frame");
/// assert!(config.worker_capacity() <= 4);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Upper bound on pooled threads
    pub max_worker_threads: usize,

    /// Identity of the first pooled thread. Identity 0 belongs to the main thread.
    pub worker_id_offset: u32,

    /// Thread name prefix for pooled threads
    pub thread_name_prefix: String,

    /// Overrides the detected number of logical cores
    pub hardware_concurrency: Option<usize>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleConfig {
    /// Creates a configuration with default values.
    ///
    /// Default values:
    /// - at most 16 pooled threads
    /// - pooled identities start at 1
    /// - detected hardware concurrency
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_worker_threads: DEFAULT_MAX_WORKER_THREADS,
            worker_id_offset: 1,
            thread_name_prefix: "frame-worker".to_string(),
            hardware_concurrency: None,
        }
    }

    /// Parse a configuration from JSON. Missing fields take their default value.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ThreadError::invalid_config("json", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the upper bound on pooled threads.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_worker_threads(mut self, max: usize) -> Self {
        self.max_worker_threads = max;
        self
    }

    /// Sets the identity of the first pooled thread.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_worker_id_offset(mut self, offset: u32) -> Self {
        self.worker_id_offset = offset;
        self
    }

    /// Sets the thread name prefix.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Overrides the detected number of logical cores.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_hardware_concurrency(mut self, cores: usize) -> Self {
        self.hardware_concurrency = Some(cores);
        self
    }

    /// Number of pooled threads this configuration yields
    pub fn worker_capacity(&self) -> usize {
        let cores = self.hardware_concurrency.unwrap_or_else(num_cpus::get);
        worker_capacity(cores, self.max_worker_threads)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_worker_threads == 0 {
            return Err(ThreadError::invalid_config(
                "max_worker_threads",
                "must be greater than 0",
            ));
        }
        if self.worker_id_offset <= ThreadId::MAIN.get() {
            return Err(ThreadError::invalid_config(
                "worker_id_offset",
                "identity 0 is reserved for the main thread",
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(ThreadError::invalid_config(
                "thread_name_prefix",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Pool configuration derived from this configuration
    pub fn pool_config(&self) -> ThreadPoolConfig {
        ThreadPoolConfig::new(self.worker_capacity())
            .with_id_offset(self.worker_id_offset)
            .with_thread_name_prefix(self.thread_name_prefix.clone())
    }
}
