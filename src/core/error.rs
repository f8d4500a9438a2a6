//! Error types for the scheduler

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, ThreadError>;

/// Errors that can occur in the scheduler
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ThreadError {
    /// Thread pool is already running with details
    #[error("Thread pool '{pool_name}' is already running with {worker_count} workers")]
    AlreadyRunning {
        /// Name of the thread pool
        pool_name: String,
        /// Number of worker threads
        worker_count: usize,
    },

    /// Thread pool is not running
    #[error("Thread pool '{pool_name}' is not running")]
    NotRunning {
        /// Name of the thread pool
        pool_name: String,
    },

    /// Failed to spawn a thread with details
    #[error("Failed to spawn worker thread #{thread_id}: {message}")]
    SpawnError {
        /// Identity the thread would have carried
        thread_id: u32,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to join a thread
    #[error("Failed to join worker thread #{thread_id}: {message}")]
    JoinError {
        /// Identity of the thread that failed to join
        thread_id: u32,
        /// Error message
        message: String,
    },

    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// A pool cycle was started while the previous one was never joined
    #[error("Pool cycle for queue '{queue}' started before the previous cycle was joined")]
    CycleInProgress {
        /// Label of the queue the rejected cycle targeted
        queue: String,
    },

    /// Job registered against a thread group that does not exist
    #[error("Unknown thread group {group_id}")]
    UnknownGroup {
        /// The group identifier
        group_id: String,
    },

    /// General error
    #[error("{0}")]
    Other(String),
}

impl ThreadError {
    /// Create an already running error
    pub fn already_running(pool_name: impl Into<String>, worker_count: usize) -> Self {
        ThreadError::AlreadyRunning {
            pool_name: pool_name.into(),
            worker_count,
        }
    }

    /// Create a not running error
    pub fn not_running(pool_name: impl Into<String>) -> Self {
        ThreadError::NotRunning {
            pool_name: pool_name.into(),
        }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        thread_id: u32,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        ThreadError::SpawnError {
            thread_id,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(thread_id: u32, message: impl Into<String>) -> Self {
        ThreadError::JoinError {
            thread_id,
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        ThreadError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a cycle in progress error
    pub fn cycle_in_progress(queue: impl Into<String>) -> Self {
        ThreadError::CycleInProgress {
            queue: queue.into(),
        }
    }

    /// Create an unknown group error
    pub fn unknown_group(group_id: impl ToString) -> Self {
        ThreadError::UnknownGroup {
            group_id: group_id.to_string(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        ThreadError::Other(msg.into())
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ThreadError::already_running("frame", 8);
        assert!(matches!(err, ThreadError::AlreadyRunning { .. }));

        let err = ThreadError::cycle_in_progress("worker");
        assert!(matches!(err, ThreadError::CycleInProgress { .. }));

        let err = ThreadError::unknown_group("group-1");
        assert!(matches!(err, ThreadError::UnknownGroup { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = ThreadError::already_running("frame", 4);
        assert_eq!(
            err.to_string(),
            "Thread pool 'frame' is already running with 4 workers"
        );

        let err = ThreadError::cycle_in_progress("sync");
        assert_eq!(
            err.to_string(),
            "Pool cycle for queue 'sync' started before the previous cycle was joined"
        );

        let err = ThreadError::invalid_config("max_worker_threads", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'max_worker_threads': must be greater than 0"
        );
    }

    #[test]
    fn test_spawn_error_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = ThreadError::spawn_with_source(5, "Cannot create thread", io_err);

        assert!(matches!(err, ThreadError::SpawnError { .. }));
        assert!(err.to_string().contains("worker thread #5"));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }
}
