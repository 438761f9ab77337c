//! Filesystem sessions.
//!
//! A session is created by one of the connect functions and released
//! by [`hdfsDisconnect`]. Files opened from a session borrow it: the
//! session must outlive them.

use crate::error::{CApiError, guard};
use crate::events::pending_fs_event_callback;
use crate::tPort;
use crate::utils::{optional_str, port_override};
use hdfspp::engine::{self, FileSystem};
use hdfspp::{DEFAULT_NAMENODE_PORT, Options};
use libc::{c_char, c_int};

/// Opaque session handle, `hdfsFS` in C.
#[allow(non_camel_case_types)]
pub struct hdfs_internal {
    pub(crate) filesystem: Box<dyn FileSystem>,
}

/// Where a session connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// The endpoint named by `fs.defaultFS`.
    DefaultFs,
    Explicit { host: String, port: tPort },
}

impl Endpoint {
    /// Neither override selects the default filesystem. Either one
    /// selects an explicit endpoint, with the missing port defaulted.
    pub fn resolve(host: Option<&str>, port: Option<tPort>) -> Self {
        match (host, port) {
            (None, None) => Self::DefaultFs,
            (host, port) => Self::Explicit {
                host: host.unwrap_or_default().to_owned(),
                port: port.unwrap_or(DEFAULT_NAMENODE_PORT),
            },
        }
    }
}

/// Creates a session with the current engine and connects it.
///
/// The thread's pending session observer is attached before the
/// connect attempt. On failure the session and its I/O service are
/// released and the error is reported.
pub(crate) fn do_hdfs_connect(
    endpoint: Endpoint,
    user: Option<&str>,
    options: &Options,
) -> Option<Box<hdfs_internal>> {
    let engine = engine::current();
    let io_service = engine.new_io_service();

    let mut filesystem = c_try!(
        engine
            .new_filesystem(io_service, user.unwrap_or_default(), options)
            .ok_or(CApiError::FileSystemCreation),
        None
    );

    if let Some(callback) = pending_fs_event_callback() {
        filesystem.set_fs_event_callback(callback);
    }

    tracing::debug!(?endpoint, user, "connecting");
    let status = match &endpoint {
        Endpoint::DefaultFs => filesystem.connect_to_default_fs(),
        Endpoint::Explicit { host, port } => filesystem.connect(host, &port.to_string()),
    };
    c_try!(status, None);

    Some(Box::new(hdfs_internal { filesystem }))
}

unsafe fn connect_with_defaults(
    nn: *const c_char,
    port: tPort,
    user: *const c_char,
) -> Option<Box<hdfs_internal>> {
    guard(None, || {
        let host = c_try!(unsafe { optional_str(nn, "nn") }, None);
        let user = c_try!(unsafe { optional_str(user, "user") }, None);
        do_hdfs_connect(
            Endpoint::resolve(host, port_override(port)),
            user,
            &Options::default(),
        )
    })
}

/// Connects to `nn:port` as the default user.
///
/// A null `nn` and a `port` of 0 mean no override; with neither, the
/// session connects to the default filesystem. Returns null on failure.
///
/// # Safety
///
/// `nn` must be null or a NUL terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsConnect(nn: *const c_char, port: tPort) -> Option<Box<hdfs_internal>> {
    unsafe { connect_with_defaults(nn, port, std::ptr::null()) }
}

/// Like [`hdfsConnect`], as `user`.
///
/// # Safety
///
/// `nn` and `user` must be null or NUL terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsConnectAsUser(
    nn: *const c_char,
    port: tPort,
    user: *const c_char,
) -> Option<Box<hdfs_internal>> {
    unsafe { connect_with_defaults(nn, port, user) }
}

/// Like [`hdfsConnect`]. Sessions are never shared, so every connect
/// already yields a new instance.
///
/// # Safety
///
/// See [`hdfsConnect`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsConnectNewInstance(
    nn: *const c_char,
    port: tPort,
) -> Option<Box<hdfs_internal>> {
    unsafe { connect_with_defaults(nn, port, std::ptr::null()) }
}

/// Like [`hdfsConnectAsUser`].
///
/// # Safety
///
/// See [`hdfsConnectAsUser`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsConnectAsUserNewInstance(
    nn: *const c_char,
    port: tPort,
    user: *const c_char,
) -> Option<Box<hdfs_internal>> {
    unsafe { connect_with_defaults(nn, port, user) }
}

/// Releases a session. Returns `0`, or `-1` with `ENODEV` for a null
/// handle.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsDisconnect(fs: Option<Box<hdfs_internal>>) -> c_int {
    guard(-1, || match fs {
        Some(fs) => {
            drop(fs);
            0
        }
        None => crate::error::report(CApiError::DisconnectNull),
    })
}
