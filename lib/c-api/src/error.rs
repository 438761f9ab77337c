//! Utilities to report and read errors.
//!
//! Every exported function reports its failures on the calling thread:
//! an errno style classifier (also written to the platform `errno`)
//! and a human readable message. Both stay in place until the next
//! failure on the same thread; a successful call never clears them.
//!
//! Reading the message from C is a single call:
//!
//! ```c
//! hdfsFS fs = hdfsConnect("localhost", 0);
//! if (!fs) {
//!     char message[256];
//!     hdfsGetLastError(message, sizeof(message));
//!     fprintf(stderr, "connect failed: errno=%d %s\n", errno, message);
//! }
//! ```
//!
//! Rust panics play the part of uncaught exceptions: [`guard`] catches
//! them at every entry point and reports them as an exception.

use hdfspp::{Status, StatusCode};
use libc::{c_char, c_int};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use thiserror::Error;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
    static LAST_ERRNO: Cell<c_int> = const { Cell::new(0) };
}

/// Failures detected by the bindings themselves, before the engine is
/// involved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CApiError {
    #[error("Cannot perform FS operations with null FS handle.")]
    NullFileSystem,
    #[error("Cannot perform FS operations with null File handle.")]
    NullFile,
    #[error("Cannot disconnect null FS handle.")]
    DisconnectNull,
    #[error("Could not create FileSystem object")]
    FileSystemCreation,
    #[error("Cannot perform operations with null Builder handle.")]
    NullBuilder,
    #[error("Argument `{0}` must not be null")]
    NullArgument(&'static str),
    #[error("Argument `{0}` is not valid UTF-8")]
    InvalidUtf8(&'static str),
    #[error("Argument `{0}` must not be negative")]
    Negative(&'static str),
    #[error("Could not change Builder value")]
    BuilderValue,
    #[error("Could not get Builder value")]
    BuilderLookup,
    #[error("Value of `{0}` does not fit in an int")]
    IntOutOfRange(String),
}

impl CApiError {
    pub fn errno(&self) -> c_int {
        match self {
            Self::NullFileSystem | Self::DisconnectNull | Self::FileSystemCreation => libc::ENODEV,
            Self::NullFile => libc::EBADF,
            _ => libc::EINVAL,
        }
    }
}

/// Records `message` and `errnum` as the calling thread's last error.
pub fn report_error(errnum: c_int, message: impl Into<String>) {
    let message = message.into();
    tracing::debug!(errno = errnum, message = %message, "reporting error");
    set_errno(errnum);
    LAST_ERRNO.with(|last| last.set(errnum));
    LAST_ERROR.with(|last| *last.borrow_mut() = message);
}

/// Reports a binding-level failure and returns `-1`.
pub(crate) fn report(err: CApiError) -> c_int {
    report_error(err.errno(), err.to_string());
    -1
}

/// Anything an exported function can fail with.
pub(crate) trait ReportError {
    /// Records `self` as the last error and returns `-1`.
    fn report(self) -> c_int;
}

impl ReportError for CApiError {
    fn report(self) -> c_int {
        report(self)
    }
}

impl ReportError for Status {
    fn report(self) -> c_int {
        report_status(&self)
    }
}

/// The classifier and fallback message for a status code.
pub fn classify(code: StatusCode) -> (c_int, &'static str) {
    match code {
        StatusCode::Ok => (0, ""),
        StatusCode::InvalidArgument => (libc::EINVAL, "Invalid argument"),
        StatusCode::ResourceUnavailable => (libc::EAGAIN, "Resource temporarily unavailable"),
        StatusCode::Unimplemented => (libc::ENOSYS, "Function not implemented"),
        StatusCode::Exception => (libc::EINTR, "Exception raised"),
        StatusCode::OperationCanceled => (libc::EINTR, "Operation canceled"),
        StatusCode::PermissionDenied => (libc::EACCES, "Permission denied"),
        _ => (libc::ENOSYS, "Error: unrecognised code"),
    }
}

/// Translates `status` into a return code: `0` when it is ok, `-1`
/// after recording the error otherwise.
pub fn report_status(status: &Status) -> c_int {
    if status.is_ok() {
        return 0;
    }
    let (errnum, default_message) = classify(status.code());
    if status.message().is_empty() {
        report_error(errnum, default_message);
    } else {
        report_error(errnum, status.message());
    }
    -1
}

fn report_panic(payload: Box<dyn Any + Send>) -> c_int {
    let description = if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::new()
    };
    report_status(&Status::exception(description))
}

/// Runs `body`, turning a panic into a reported exception and
/// `on_panic`.
pub(crate) fn guard<R>(on_panic: R, body: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => {
            report_panic(payload);
            on_panic
        }
    }
}

/// The calling thread's last error message, empty if none.
pub fn last_error() -> String {
    LAST_ERROR.with(|last| last.borrow().clone())
}

/// The calling thread's last classifier, `0` if none.
pub fn last_errno() -> c_int {
    LAST_ERRNO.with(Cell::get)
}

fn set_errno(errnum: c_int) {
    cfg_if::cfg_if! {
        if #[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "fuchsia"))] {
            unsafe { *libc::__errno_location() = errnum };
        } else if #[cfg(any(target_os = "android", target_os = "openbsd", target_os = "netbsd"))] {
            unsafe { *libc::__errno() = errnum };
        } else if #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))] {
            unsafe { *libc::__error() = errnum };
        } else {
            let _ = errnum;
        }
    }
}

/// Copies the calling thread's last error message into `buf`.
///
/// At most `len - 1` bytes of the message are copied, followed by a
/// NUL byte. Nothing is written when `buf` is null or `len < 1`.
///
/// # Safety
///
/// `buf` must be null or valid for writes of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsGetLastError(buf: *mut c_char, len: c_int) {
    if buf.is_null() || len < 1 {
        return;
    }
    let len = len as usize;

    guard((), || {
        LAST_ERROR.with(|last| {
            let message = last.borrow();
            let copy_len = message.len().min(len - 1);
            unsafe {
                ptr::copy_nonoverlapping(message.as_ptr(), buf.cast::<u8>(), copy_len);
                // Add a trailing null so people using the string as a `char *`
                // don't accidentally read into garbage.
                *buf.add(copy_len) = 0;
            }
        })
    })
}
