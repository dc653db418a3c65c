//! Engine-wide error type.
//!
//! Errors detectable before the scheduler starts are fatal: the CLI maps
//! them to a nonzero exit code without ever starting the scheduler. Once
//! running, only [`EngineError::is_fatal`] distinguishes the handful of
//! kinds that should still abort the run from the ones that are absorbed
//! into the verbose log so the engine can drive toward a quiescent
//! termination.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("input format error: {0}")]
    InputFormat(String),

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("failed to create worker thread {thread_index} for process PID {pid}: {source}")]
    ThreadCreate {
        pid: u32,
        thread_index: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown scheduling policy code: {0}")]
    UnknownPolicy(u8),

    #[error("event log buffer capacity exceeded, dropping message")]
    LogOverflow,

    #[error("scheduler exceeded its iteration safety bound without terminating")]
    RunawayScheduler,
}

impl EngineError {
    /// Whether this error must abort the engine rather than be absorbed
    /// into the log and driven past.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::ThreadCreate { .. } | EngineError::LogOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_create_is_recoverable() {
        let err = EngineError::ThreadCreate {
            pid: 1,
            thread_index: 0,
            source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn input_format_is_fatal() {
        assert!(EngineError::InputFormat("bad".into()).is_fatal());
    }

    #[test]
    fn unknown_policy_is_fatal() {
        assert!(EngineError::UnknownPolicy(9).is_fatal());
    }

    #[test]
    fn log_overflow_is_recoverable() {
        assert!(!EngineError::LogOverflow.is_fatal());
    }
}
