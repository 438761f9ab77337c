//! Instrumentation hooks.
//!
//! A C observer is registered per thread with
//! [`hdfsPreAttachFSMonitor`] or [`hdfsPreAttachFileMonitor`] and is
//! attached to every session (respectively file) that thread creates
//! afterwards. Registering does not wait for the next connect or open
//! to consume it: the same observer keeps being attached until another
//! one replaces it.
//!
//! The observer's return value is advisory. [`LIBHDFSPP_EVENT_OK`] and
//! any unknown value let the operation run; [`DEBUG_SIMULATE_ERROR`]
//! fails it, but only in debug builds or with the `simulate-errors`
//! feature.

use crate::error::guard;
use hdfspp::Status;
use hdfspp::events::{EventResponse, FileEventCallback, FsEventCallback};
use libc::{c_char, c_int};
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::sync::Arc;

/// Session level observer: `(event, cluster, value, cookie)`.
#[allow(non_camel_case_types)]
pub type libhdfspp_fs_event_callback = unsafe extern "C" fn(
    event: *const c_char,
    cluster: *const c_char,
    value: i64,
    cookie: i64,
) -> c_int;

/// File level observer: `(event, cluster, file, value, cookie)`.
#[allow(non_camel_case_types)]
pub type libhdfspp_file_event_callback = unsafe extern "C" fn(
    event: *const c_char,
    cluster: *const c_char,
    file: *const c_char,
    value: i64,
    cookie: i64,
) -> c_int;

pub const LIBHDFSPP_EVENT_OK: c_int = 0;
pub const DEBUG_SIMULATE_ERROR: c_int = -1;

/// A NUL terminated event name, as seen from C.
#[repr(transparent)]
pub struct EventName(*const c_char);

// Points into static, immutable data.
unsafe impl Sync for EventName {}

impl EventName {
    pub fn to_str(&self) -> &'static str {
        unsafe { CStr::from_ptr(self.0) }.to_str().unwrap_or_default()
    }
}

#[unsafe(no_mangle)]
pub static FS_NN_CONNECT_EVENT: EventName = EventName(c"NN::connect".as_ptr());
#[unsafe(no_mangle)]
pub static FS_NN_READ_EVENT: EventName = EventName(c"NN::read".as_ptr());
#[unsafe(no_mangle)]
pub static FS_NN_WRITE_EVENT: EventName = EventName(c"NN::write".as_ptr());

#[unsafe(no_mangle)]
pub static FILE_DN_CONNECT_EVENT: EventName = EventName(c"DN::connect".as_ptr());
#[unsafe(no_mangle)]
pub static FILE_DN_READ_EVENT: EventName = EventName(c"DN::read".as_ptr());
#[unsafe(no_mangle)]
pub static FILE_DN_WRITE_EVENT: EventName = EventName(c"DN::write".as_ptr());

thread_local! {
    static PENDING_FS_CALLBACK: RefCell<Option<FsEventCallback>> = const { RefCell::new(None) };
    static PENDING_FILE_CALLBACK: RefCell<Option<FileEventCallback>> = const { RefCell::new(None) };
}

/// The session observer registered on this thread, if any. The slot
/// keeps it.
pub(crate) fn pending_fs_event_callback() -> Option<FsEventCallback> {
    PENDING_FS_CALLBACK.with(|slot| slot.borrow().clone())
}

/// The file observer registered on this thread, if any. The slot keeps
/// it.
pub(crate) fn pending_file_event_callback() -> Option<FileEventCallback> {
    PENDING_FILE_CALLBACK.with(|slot| slot.borrow().clone())
}

fn interpret(result: c_int) -> EventResponse {
    if result == LIBHDFSPP_EVENT_OK {
        return EventResponse::ok();
    }
    if cfg!(any(debug_assertions, feature = "simulate-errors")) && result == DEBUG_SIMULATE_ERROR {
        return EventResponse::test_err(Status::error("Simulated error"));
    }
    EventResponse::ok()
}

fn c_string(value: &str) -> CString {
    CString::new(value).unwrap_or_default()
}

fn fs_callback_glue(handler: libhdfspp_fs_event_callback, cookie: i64) -> FsEventCallback {
    Arc::new(move |event: &str, cluster: &str, value: i64| {
        let event = c_string(event);
        let cluster = c_string(cluster);
        interpret(unsafe { handler(event.as_ptr(), cluster.as_ptr(), value, cookie) })
    })
}

fn file_callback_glue(handler: libhdfspp_file_event_callback, cookie: i64) -> FileEventCallback {
    Arc::new(move |event: &str, cluster: &str, file: &str, value: i64| {
        let event = c_string(event);
        let cluster = c_string(cluster);
        let file = c_string(file);
        interpret(unsafe {
            handler(
                event.as_ptr(),
                cluster.as_ptr(),
                file.as_ptr(),
                value,
                cookie,
            )
        })
    })
}

/// Registers `handler` as the session observer for sessions later
/// created on the calling thread. A null `handler` removes it.
///
/// Always returns `0`.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsPreAttachFSMonitor(
    handler: Option<libhdfspp_fs_event_callback>,
    cookie: i64,
) -> c_int {
    guard(-1, || {
        let callback = handler.map(|handler| fs_callback_glue(handler, cookie));
        PENDING_FS_CALLBACK.with(|slot| *slot.borrow_mut() = callback);
        0
    })
}

/// Registers `handler` as the file observer for files later opened on
/// the calling thread. A null `handler` removes it.
///
/// Always returns `0`.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsPreAttachFileMonitor(
    handler: Option<libhdfspp_file_event_callback>,
    cookie: i64,
) -> c_int {
    guard(-1, || {
        let callback = handler.map(|handler| file_callback_glue(handler, cookie));
        PENDING_FILE_CALLBACK.with(|slot| *slot.borrow_mut() = callback);
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdfspp::events as ev;
    use std::cell::Cell;

    thread_local! {
        static SEEN: RefCell<Vec<(String, String, i64, i64)>> = const { RefCell::new(Vec::new()) };
        static REPLY: Cell<c_int> = const { Cell::new(LIBHDFSPP_EVENT_OK) };
    }

    unsafe extern "C" fn record_fs(
        event: *const c_char,
        cluster: *const c_char,
        value: i64,
        cookie: i64,
    ) -> c_int {
        let event = unsafe { CStr::from_ptr(event) }.to_string_lossy().into_owned();
        let cluster = unsafe { CStr::from_ptr(cluster) }.to_string_lossy().into_owned();
        SEEN.with(|seen| seen.borrow_mut().push((event, cluster, value, cookie)));
        REPLY.with(Cell::get)
    }

    unsafe extern "C" fn record_file(
        event: *const c_char,
        _cluster: *const c_char,
        file: *const c_char,
        value: i64,
        cookie: i64,
    ) -> c_int {
        let event = unsafe { CStr::from_ptr(event) }.to_string_lossy().into_owned();
        let file = unsafe { CStr::from_ptr(file) }.to_string_lossy().into_owned();
        SEEN.with(|seen| seen.borrow_mut().push((event, file, value, cookie)));
        REPLY.with(Cell::get)
    }

    #[test]
    fn event_names_are_exported() {
        assert_eq!(FS_NN_CONNECT_EVENT.to_str(), ev::FS_NN_CONNECT_EVENT);
        assert_eq!(FS_NN_READ_EVENT.to_str(), ev::FS_NN_READ_EVENT);
        assert_eq!(FS_NN_WRITE_EVENT.to_str(), ev::FS_NN_WRITE_EVENT);
        assert_eq!(FILE_DN_CONNECT_EVENT.to_str(), ev::FILE_DN_CONNECT_EVENT);
        assert_eq!(FILE_DN_READ_EVENT.to_str(), ev::FILE_DN_READ_EVENT);
        assert_eq!(FILE_DN_WRITE_EVENT.to_str(), ev::FILE_DN_WRITE_EVENT);
    }

    #[test]
    fn pending_callbacks_are_sticky() {
        assert_eq!(hdfsPreAttachFSMonitor(Some(record_fs), 42), 0);

        let first = pending_fs_event_callback().unwrap();
        let second = pending_fs_event_callback().unwrap();
        assert_eq!(first("NN::connect", "alpha", 1), EventResponse::ok());
        assert_eq!(second("NN::read", "alpha", 2), EventResponse::ok());

        SEEN.with(|seen| {
            assert_eq!(
                *seen.borrow(),
                vec![
                    ("NN::connect".to_owned(), "alpha".to_owned(), 1, 42),
                    ("NN::read".to_owned(), "alpha".to_owned(), 2, 42),
                ]
            );
        });

        hdfsPreAttachFSMonitor(None, 0);
        assert!(pending_fs_event_callback().is_none());
    }

    #[test]
    fn pending_callbacks_are_per_thread() {
        hdfsPreAttachFileMonitor(Some(record_file), 7);
        std::thread::spawn(|| assert!(pending_file_event_callback().is_none()))
            .join()
            .unwrap();

        let callback = pending_file_event_callback().unwrap();
        callback("DN::read", "alpha", "/data/a", 512);
        SEEN.with(|seen| {
            assert_eq!(
                seen.borrow().last(),
                Some(&("DN::read".to_owned(), "/data/a".to_owned(), 512, 7))
            );
        });
        hdfsPreAttachFileMonitor(None, 0);
    }

    #[test]
    fn return_value_is_advisory() {
        hdfsPreAttachFSMonitor(Some(record_fs), 0);
        let callback = pending_fs_event_callback().unwrap();

        REPLY.with(|reply| reply.set(5));
        assert_eq!(callback("NN::connect", "alpha", 0), EventResponse::ok());

        REPLY.with(|reply| reply.set(DEBUG_SIMULATE_ERROR));
        let expected = if cfg!(any(debug_assertions, feature = "simulate-errors")) {
            EventResponse::test_err(Status::error("Simulated error"))
        } else {
            EventResponse::ok()
        };
        assert_eq!(callback("NN::connect", "alpha", 0), expected);

        REPLY.with(|reply| reply.set(LIBHDFSPP_EVENT_OK));
        hdfsPreAttachFSMonitor(None, 0);
    }
}
