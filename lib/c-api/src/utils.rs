use crate::error::CApiError;
use crate::tSize;
use libc::{c_char, c_void};
use std::ffi::CStr;
use std::slice;

/// Unwraps a `Result`, or reports its error on the calling thread and
/// returns `$ret` from the enclosing function (or closure).
macro_rules! c_try {
    ($expr:expr, $ret:expr) => {{
        match $expr {
            Ok(val) => val,
            Err(err) => {
                crate::error::ReportError::report(err);
                return $ret;
            }
        }
    }};
}

/// Borrows a C string that may be null.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL terminated string that outlives
/// `'a`.
pub(crate) unsafe fn optional_str<'a>(
    ptr: *const c_char,
    name: &'static str,
) -> Result<Option<&'a str>, CApiError> {
    if ptr.is_null() {
        return Ok(None);
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(Some)
        .map_err(|_| CApiError::InvalidUtf8(name))
}

/// Borrows a C string that must not be null.
///
/// # Safety
///
/// Same as [`optional_str`].
pub(crate) unsafe fn required_str<'a>(
    ptr: *const c_char,
    name: &'static str,
) -> Result<&'a str, CApiError> {
    unsafe { optional_str(ptr, name) }?.ok_or(CApiError::NullArgument(name))
}

/// Views a caller supplied buffer of `length` bytes.
///
/// # Safety
///
/// `buffer` must be valid for writes of `length` bytes when `length` is
/// positive.
pub(crate) unsafe fn buffer_mut<'a>(
    buffer: *mut c_void,
    length: tSize,
) -> Result<&'a mut [u8], CApiError> {
    let length = usize::try_from(length).map_err(|_| CApiError::Negative("length"))?;
    if length == 0 {
        return Ok(&mut []);
    }
    if buffer.is_null() {
        return Err(CApiError::NullArgument("buffer"));
    }
    Ok(unsafe { slice::from_raw_parts_mut(buffer.cast::<u8>(), length) })
}

/// Port 0 asks for the default.
pub(crate) fn port_override(port: crate::tPort) -> Option<crate::tPort> {
    (port != 0).then_some(port)
}
