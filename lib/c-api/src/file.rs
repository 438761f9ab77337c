//! Read handles.
//!
//! Every function here takes the session together with the file and
//! checks both before touching the engine: a null session fails with
//! `ENODEV`, a null file with `EBADF`.

use crate::error::{CApiError, ReportError, guard};
use crate::events::pending_file_event_callback;
use crate::fs::hdfs_internal;
use crate::utils::{buffer_mut, required_str};
use crate::{tOffset, tSize};
use hdfspp::engine::FileHandle;
use libc::{c_char, c_int, c_short, c_void};
use std::io::SeekFrom;

/// Opaque file handle, `hdfsFile` in C.
#[allow(non_camel_case_types)]
pub struct hdfsFile_internal {
    pub(crate) file: Box<dyn FileHandle>,
}

fn check_system_and_handle<'a>(
    fs: Option<&hdfs_internal>,
    file: Option<&'a hdfsFile_internal>,
) -> Result<&'a hdfsFile_internal, CApiError> {
    fs.ok_or(CApiError::NullFileSystem)?;
    file.ok_or(CApiError::NullFile)
}

fn offset_arg(offset: tOffset, name: &'static str) -> Result<u64, CApiError> {
    u64::try_from(offset).map_err(|_| CApiError::Negative(name))
}

/// Returns 1 for a non-null file. Files are only ever opened for
/// reading.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsFileIsOpenForRead(file: Option<&hdfsFile_internal>) -> c_int {
    guard(0, || file.is_some().into())
}

/// Opens `path` for reading. Returns null on failure.
///
/// `flags`, `buffer_size`, `replication` and `blocksize` are accepted
/// for compatibility and ignored.
///
/// # Safety
///
/// `path` must be null or a NUL terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsOpenFile(
    fs: Option<&hdfs_internal>,
    path: *const c_char,
    flags: c_int,
    buffer_size: c_int,
    replication: c_short,
    blocksize: tSize,
) -> Option<Box<hdfsFile_internal>> {
    let _ = (flags, buffer_size, replication, blocksize);
    guard(None, || {
        let fs = c_try!(fs.ok_or(CApiError::NullFileSystem), None);
        let path = c_try!(unsafe { required_str(path, "path") }, None);

        let mut file = c_try!(fs.filesystem.open(path), None);
        if let Some(callback) = pending_file_event_callback() {
            file.set_file_event_callback(callback);
        }
        Some(Box::new(hdfsFile_internal { file }))
    })
}

/// Releases `file`. Returns `0`, or `-1` when either handle is null.
///
/// `file` stays allocated when `fs` is null.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsCloseFile(
    fs: Option<&hdfs_internal>,
    file: Option<Box<hdfsFile_internal>>,
) -> c_int {
    guard(-1, || {
        if let Err(err) = check_system_and_handle(fs, file.as_deref()) {
            if let Some(file) = file {
                // Ownership stays with the caller.
                let _ = Box::into_raw(file);
            }
            return err.report();
        }
        drop(file);
        0
    })
}

/// Reads up to `length` bytes at `position` into `buffer`, leaving the
/// cursor alone. Returns the byte count, 0 at end of file, or `-1`.
///
/// # Safety
///
/// `buffer` must be valid for writes of `length` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsPread(
    fs: Option<&hdfs_internal>,
    file: Option<&hdfsFile_internal>,
    position: tOffset,
    buffer: *mut c_void,
    length: tSize,
) -> tSize {
    guard(-1, || {
        let file = c_try!(check_system_and_handle(fs, file), -1);
        let position = c_try!(offset_arg(position, "position"), -1);
        let buffer = c_try!(unsafe { buffer_mut(buffer, length) }, -1);

        let count = c_try!(file.file.position_read(buffer, position), -1);
        count as tSize
    })
}

/// Reads up to `length` bytes at the cursor into `buffer` and advances
/// the cursor. Returns the byte count, 0 at end of file, or `-1`.
///
/// # Safety
///
/// `buffer` must be valid for writes of `length` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsRead(
    fs: Option<&hdfs_internal>,
    file: Option<&hdfsFile_internal>,
    buffer: *mut c_void,
    length: tSize,
) -> tSize {
    guard(-1, || {
        let file = c_try!(check_system_and_handle(fs, file), -1);
        let buffer = c_try!(unsafe { buffer_mut(buffer, length) }, -1);

        let count = c_try!(file.file.read(buffer), -1);
        count as tSize
    })
}

/// Moves the cursor to `desired_pos`, counted from the start of the
/// file.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsSeek(
    fs: Option<&hdfs_internal>,
    file: Option<&hdfsFile_internal>,
    desired_pos: tOffset,
) -> c_int {
    guard(-1, || {
        let file = c_try!(check_system_and_handle(fs, file), -1);
        let desired_pos = c_try!(offset_arg(desired_pos, "desiredPos"), -1);

        c_try!(file.file.seek(SeekFrom::Start(desired_pos)), -1);
        0
    })
}

/// The cursor position, or `-1`.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsTell(fs: Option<&hdfs_internal>, file: Option<&hdfsFile_internal>) -> tOffset {
    guard(-1, || {
        let file = c_try!(check_system_and_handle(fs, file), -1);
        let position = c_try!(file.file.seek(SeekFrom::Current(0)), -1);
        position as tOffset
    })
}

/// Asks in-flight and later operations on `file` to stop. Returns
/// without waiting for them.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsCancel(fs: Option<&hdfs_internal>, file: Option<&hdfsFile_internal>) -> c_int {
    guard(-1, || {
        let file = c_try!(check_system_and_handle(fs, file), -1);
        file.file.cancel_operations();
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{last_errno, last_error};
    use crate::fs::{Endpoint, do_hdfs_connect};
    use hdfspp::Options;
    use hdfspp::engine::{self, MemoryEngine};
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::ptr;
    use std::sync::Arc;

    struct Fixture {
        previous: Arc<dyn engine::FileSystemEngine>,
        fs: Option<Box<hdfs_internal>>,
    }

    impl Fixture {
        fn new() -> Self {
            let memory = MemoryEngine::new();
            let cluster = memory.add_cluster("localhost", 8020, "test-cluster");
            cluster.put_file("/data/hello.txt", &b"hello, world"[..]);
            let previous = engine::install(Arc::new(memory));

            let fs = do_hdfs_connect(
                Endpoint::resolve(Some("localhost"), None),
                None,
                &Options::default(),
            );
            assert!(fs.is_some());
            Self { previous, fs }
        }

        fn fs(&self) -> Option<&hdfs_internal> {
            self.fs.as_deref()
        }

        fn open(&self, path: &std::ffi::CStr) -> Option<Box<hdfsFile_internal>> {
            unsafe { hdfsOpenFile(self.fs(), path.as_ptr(), 0, 0, 0, 0) }
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            self.fs.take();
            engine::install(Arc::clone(&self.previous));
        }
    }

    #[test]
    fn null_session_is_checked_first() {
        let mut buf = [0u8; 4];
        let read = unsafe { hdfsRead(None, None, buf.as_mut_ptr().cast(), 4) };
        assert_eq!(read, -1);
        assert_eq!(last_errno(), libc::ENODEV);
        assert_eq!(last_error(), "Cannot perform FS operations with null FS handle.");

        assert_eq!(hdfsTell(None, None), -1);
        assert_eq!(last_errno(), libc::ENODEV);
        assert_eq!(hdfsFileIsOpenForRead(None), 0);

        let opened = unsafe { hdfsOpenFile(None, c"/a".as_ptr(), 0, 0, 0, 0) };
        assert!(opened.is_none());
        assert_eq!(last_errno(), libc::ENODEV);
    }

    #[test]
    #[serial(engine)]
    fn null_file_is_a_bad_descriptor() {
        let fixture = Fixture::new();
        let mut buf = [0u8; 4];

        let checks = [
            unsafe { hdfsPread(fixture.fs(), None, 0, buf.as_mut_ptr().cast(), 4) },
            unsafe { hdfsRead(fixture.fs(), None, buf.as_mut_ptr().cast(), 4) },
            hdfsSeek(fixture.fs(), None, 0),
            hdfsTell(fixture.fs(), None) as c_int,
            hdfsCancel(fixture.fs(), None),
            hdfsCloseFile(fixture.fs(), None),
        ];
        for result in checks {
            assert_eq!(result, -1);
        }
        assert_eq!(last_errno(), libc::EBADF);
        assert_eq!(
            last_error(),
            "Cannot perform FS operations with null File handle."
        );
    }

    #[test]
    #[serial(engine)]
    fn read_advances_and_pread_does_not() {
        let fixture = Fixture::new();
        let file = fixture.open(c"/data/hello.txt");
        assert_eq!(hdfsFileIsOpenForRead(file.as_deref()), 1);
        let handle = file.as_deref();

        let mut buf = [0u8; 5];
        let read = unsafe { hdfsRead(fixture.fs(), handle, buf.as_mut_ptr().cast(), 5) };
        assert_eq!(read, 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(hdfsTell(fixture.fs(), handle), 5);

        let mut buf = [0u8; 5];
        let read = unsafe { hdfsPread(fixture.fs(), handle, 7, buf.as_mut_ptr().cast(), 5) };
        assert_eq!(read, 5);
        assert_eq!(&buf, b"world");
        assert_eq!(hdfsTell(fixture.fs(), handle), 5);

        assert_eq!(hdfsSeek(fixture.fs(), handle, 12), 0);
        let read = unsafe { hdfsRead(fixture.fs(), handle, buf.as_mut_ptr().cast(), 5) };
        assert_eq!(read, 0);
        assert_eq!(hdfsTell(fixture.fs(), handle), 12);

        assert_eq!(hdfsCloseFile(fixture.fs(), file), 0);
    }

    #[test]
    #[serial(engine)]
    fn invalid_arguments() {
        let fixture = Fixture::new();
        let file = fixture.open(c"/data/hello.txt");
        let handle = file.as_deref();

        assert_eq!(unsafe { hdfsRead(fixture.fs(), handle, ptr::null_mut(), 4) }, -1);
        assert_eq!(last_errno(), libc::EINVAL);

        let mut buf = [0u8; 4];
        assert_eq!(
            unsafe { hdfsRead(fixture.fs(), handle, buf.as_mut_ptr().cast(), -1) },
            -1
        );
        assert_eq!(last_errno(), libc::EINVAL);

        assert_eq!(
            unsafe { hdfsPread(fixture.fs(), handle, -8, buf.as_mut_ptr().cast(), 4) },
            -1
        );
        assert_eq!(last_errno(), libc::EINVAL);

        assert_eq!(hdfsSeek(fixture.fs(), handle, -1), -1);
        assert_eq!(last_errno(), libc::EINVAL);
        assert_eq!(hdfsSeek(fixture.fs(), handle, 100), -1);
        assert_eq!(last_errno(), libc::EINVAL);

        assert!(unsafe { hdfsOpenFile(fixture.fs(), ptr::null(), 0, 0, 0, 0) }.is_none());
        assert_eq!(last_errno(), libc::EINVAL);

        assert_eq!(hdfsCloseFile(fixture.fs(), file), 0);
    }

    #[test]
    #[serial(engine)]
    fn missing_path_reports_the_engine_message() {
        let fixture = Fixture::new();
        assert!(fixture.open(c"/nope").is_none());
        assert_eq!(last_errno(), libc::ENOSYS);
        assert_eq!(last_error(), "Path not found: /nope");
    }

    #[test]
    #[serial(engine)]
    fn cancel_stops_later_reads() {
        let fixture = Fixture::new();
        let file = fixture.open(c"/data/hello.txt");
        let handle = file.as_deref();

        assert_eq!(hdfsCancel(fixture.fs(), handle), 0);
        let mut buf = [0u8; 4];
        let read = unsafe { hdfsRead(fixture.fs(), handle, buf.as_mut_ptr().cast(), 4) };
        assert_eq!(read, -1);
        assert_eq!(last_errno(), libc::EINTR);
        assert_eq!(last_error(), "Operation canceled");

        assert_eq!(hdfsCloseFile(fixture.fs(), file), 0);
    }

    #[test]
    #[serial(engine)]
    fn close_without_session_keeps_the_file() {
        let fixture = Fixture::new();
        let file = fixture.open(c"/data/hello.txt").unwrap();
        let raw = Box::into_raw(file);

        assert_eq!(hdfsCloseFile(None, Some(unsafe { Box::from_raw(raw) })), -1);
        assert_eq!(last_errno(), libc::ENODEV);

        // Still ours to release.
        let file = unsafe { Box::from_raw(raw) };
        assert_eq!(hdfsCloseFile(fixture.fs(), Some(file)), 0);
    }
}
