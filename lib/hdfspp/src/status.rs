//! The result type shared by every engine operation.

use thiserror::Error;

/// The category of a [`Status`].
///
/// Only the first seven codes have a dedicated translation at the C
/// boundary; the others are classified as unrecognized there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StatusCode {
    Ok,
    InvalidArgument,
    ResourceUnavailable,
    Unimplemented,
    Exception,
    OperationCanceled,
    PermissionDenied,
    PathNotFound,
    Error,
}

/// An engine outcome: a code plus an optional human readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Status {
    code: StatusCode,
    message: String,
}

impl Status {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::Ok, "")
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InvalidArgument, message)
    }

    pub fn resource_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::ResourceUnavailable, message)
    }

    pub fn unimplemented() -> Self {
        Self::new(StatusCode::Unimplemented, "")
    }

    /// An exception status. An empty `description` yields an empty
    /// message so the boundary falls back to its default phrase.
    pub fn exception(description: impl Into<String>) -> Self {
        Self::new(StatusCode::Exception, description)
    }

    pub fn canceled() -> Self {
        Self::new(StatusCode::OperationCanceled, "")
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PermissionDenied, message)
    }

    pub fn path_not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PathNotFound, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Error, message)
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_message() {
        let status = Status::path_not_found("/tmp/missing");
        assert_eq!(status.to_string(), "/tmp/missing");
        assert_eq!(status.code(), StatusCode::PathNotFound);
        assert!(!status.is_ok());
    }

    #[test]
    fn canned_constructors_have_empty_messages() {
        assert!(Status::ok().is_ok());
        assert!(Status::canceled().message().is_empty());
        assert!(Status::unimplemented().message().is_empty());
        assert_eq!(Status::default(), Status::ok());
    }
}
