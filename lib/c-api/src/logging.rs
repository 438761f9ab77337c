//! The log sink and its filters.
//!
//! [`hdfsSetLogFunction`] routes every engine log record that passes
//! the level and component filters to a C function. The record handed
//! to it, message included, lives only for the duration of the call;
//! use [`hdfsCopyLogData`] to keep it longer.

use crate::error::guard;
use hdfspp::logging::{LogLevel, LogManager, LogMessage, LogSourceComponent, LoggerInterface};
use libc::{c_char, c_int};
use std::ffi::{CStr, CString};
use std::ptr;

pub const HDFSPP_LOG_LEVEL_TRACE: c_int = LogLevel::Trace as c_int;
pub const HDFSPP_LOG_LEVEL_DEBUG: c_int = LogLevel::Debug as c_int;
pub const HDFSPP_LOG_LEVEL_INFO: c_int = LogLevel::Info as c_int;
pub const HDFSPP_LOG_LEVEL_WARN: c_int = LogLevel::Warning as c_int;
pub const HDFSPP_LOG_LEVEL_ERROR: c_int = LogLevel::Error as c_int;

pub const HDFSPP_LOG_COMPONENT_UNKNOWN: c_int = LogSourceComponent::Unknown as c_int;
pub const HDFSPP_LOG_COMPONENT_RPC: c_int = LogSourceComponent::Rpc as c_int;
pub const HDFSPP_LOG_COMPONENT_BLOCKREADER: c_int = LogSourceComponent::BlockReader as c_int;
pub const HDFSPP_LOG_COMPONENT_FILEHANDLE: c_int = LogSourceComponent::FileHandle as c_int;
pub const HDFSPP_LOG_COMPONENT_FILESYSTEM: c_int = LogSourceComponent::FileSystem as c_int;

/// A log record as seen from C.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LogData {
    pub level: c_int,
    pub component: c_int,
    /// The message text.
    pub msg: *const c_char,
    /// Source file that emitted the record. Static storage.
    pub file_name: *const c_char,
    pub file_line: c_int,
}

#[allow(non_camel_case_types)]
pub type hdfs_log_callback = unsafe extern "C" fn(data: *mut LogData);

/// Converts records into [`LogData`] for a C callback.
struct CForwardingLogger {
    callback: Option<hdfs_log_callback>,
}

fn message_text(msg: &str) -> CString {
    CString::new(msg).unwrap_or_else(|err| {
        let end = err.nul_position();
        let mut bytes = err.into_vec();
        bytes.truncate(end);
        CString::new(bytes).unwrap_or_default()
    })
}

impl LoggerInterface for CForwardingLogger {
    fn write(&self, msg: &LogMessage) {
        let Some(callback) = self.callback else {
            return;
        };

        let text = message_text(msg.msg_string());
        let mut data = LogData {
            level: msg.level() as c_int,
            component: msg.component() as c_int,
            msg: text.as_ptr(),
            file_name: msg.file_name().as_ptr(),
            file_line: c_int::try_from(msg.file_line()).unwrap_or(c_int::MAX),
        };
        unsafe { callback(&mut data) };
    }
}

/// Makes `callback` the process-wide log sink, replacing the previous
/// one. A null `callback` discards every record.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsSetLogFunction(callback: Option<hdfs_log_callback>) {
    guard((), || {
        LogManager::set_logger_implementation(Box::new(CForwardingLogger { callback }));
    })
}

/// Copies `data`, message text included. Returns null for a null
/// `data`.
///
/// Release the copy with [`hdfsFreeLogData`].
///
/// # Safety
///
/// `data.msg` must be null or a NUL terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsCopyLogData(data: Option<&LogData>) -> Option<Box<LogData>> {
    guard(None, || {
        let data = data?;
        let msg = if data.msg.is_null() {
            ptr::null()
        } else {
            unsafe { CStr::from_ptr(data.msg) }.to_owned().into_raw().cast_const()
        };
        Some(Box::new(LogData { msg, ..*data }))
    })
}

/// Frees the message of a copied record and zeroes the record.
///
/// # Safety
///
/// `data` must come from [`hdfsCopyLogData`] and not have been released.
unsafe fn release_log_data(data: &mut LogData) {
    if !data.msg.is_null() {
        drop(unsafe { CString::from_raw(data.msg.cast_mut()) });
    }
    *data = LogData {
        level: 0,
        component: 0,
        msg: ptr::null(),
        file_name: ptr::null(),
        file_line: 0,
    };
}

/// Releases a record returned by [`hdfsCopyLogData`]. Null is ignored.
///
/// # Safety
///
/// `data` must be null or a record returned by [`hdfsCopyLogData`], not
/// yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsFreeLogData(data: Option<Box<LogData>>) {
    guard((), || {
        if let Some(mut data) = data {
            unsafe { release_log_data(&mut data) };
        }
    })
}

/// Enables records from `component`. Returns `0`, or `1` when
/// `component` is not exactly one known component flag.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsEnableLoggingForComponent(component: c_int) -> c_int {
    guard(1, || match LogSourceComponent::try_from(component) {
        Ok(component) => {
            LogManager::enable_log_for_component(component);
            0
        }
        Err(_) => 1,
    })
}

/// Disables records from `component`. Same return values as
/// [`hdfsEnableLoggingForComponent`].
#[unsafe(no_mangle)]
pub extern "C" fn hdfsDisableLoggingForComponent(component: c_int) -> c_int {
    guard(1, || match LogSourceComponent::try_from(component) {
        Ok(component) => {
            LogManager::disable_log_for_component(component);
            0
        }
        Err(_) => 1,
    })
}

/// Sets the minimum level of records that reach the sink. Returns `0`,
/// or `1` when `level` is not between `HDFSPP_LOG_LEVEL_TRACE` and
/// `HDFSPP_LOG_LEVEL_ERROR`.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsSetLoggingLevel(level: c_int) -> c_int {
    guard(1, || match LogLevel::try_from(level) {
        Ok(level) => {
            LogManager::set_log_level(level);
            0
        }
        Err(_) => 1,
    })
}
