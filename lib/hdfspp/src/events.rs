//! Lifecycle event instrumentation.
//!
//! Engines report interesting points of their work (connecting to a
//! namenode, reading from a datanode, ...) to an optional observer.
//! The observer may ask the engine to fail the operation, which is how
//! fault injection tests steer the engine.

use crate::Status;
use std::sync::Arc;

pub const FS_NN_CONNECT_EVENT: &str = "NN::connect";
pub const FS_NN_READ_EVENT: &str = "NN::read";
pub const FS_NN_WRITE_EVENT: &str = "NN::write";

pub const FILE_DN_CONNECT_EVENT: &str = "DN::connect";
pub const FILE_DN_READ_EVENT: &str = "DN::read";
pub const FILE_DN_WRITE_EVENT: &str = "DN::write";

/// What an observer wants the engine to do after an event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventResponse {
    #[default]
    Ok,
    /// Fail the current operation with the given status.
    TestError(Status),
}

impl EventResponse {
    pub fn ok() -> Self {
        Self::Ok
    }

    pub fn test_err(status: Status) -> Self {
        Self::TestError(status)
    }

    /// `Err` with the injected status for [`EventResponse::TestError`].
    pub fn into_result(self) -> Result<(), Status> {
        match self {
            Self::Ok => Ok(()),
            Self::TestError(status) => Err(status),
        }
    }
}

/// Session level observer: `(event, cluster, value)`.
pub type FsEventCallback = Arc<dyn Fn(&str, &str, i64) -> EventResponse + Send + Sync>;

/// File level observer: `(event, cluster, file, value)`.
pub type FileEventCallback = Arc<dyn Fn(&str, &str, &str, i64) -> EventResponse + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_err_fails_the_operation() {
        assert_eq!(EventResponse::ok().into_result(), Ok(()));
        let injected = Status::error("Simulated error");
        assert_eq!(
            EventResponse::test_err(injected.clone()).into_result(),
            Err(injected)
        );
    }
}
