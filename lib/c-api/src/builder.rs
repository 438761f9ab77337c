//! Layered connection configuration.
//!
//! A builder starts from the default resources found on its search
//! path (or from an empty configuration when there are none). Keys can
//! then be overlaid one by one, and the namenode host, port and user
//! can be overridden. Overrides are resolved when
//! [`hdfsBuilderConnect`] runs, never earlier.
//!
//! ```c
//! struct hdfsBuilder *bld = hdfsNewBuilderFromDirectory("/etc/hadoop/conf");
//! hdfsBuilderConfSetStr(bld, "dfs.client.socket-timeout", "5000");
//! hdfsBuilderSetNameNode(bld, "nn1.example.com");
//! hdfsFS fs = hdfsBuilderConnect(bld);
//! hdfsFreeBuilder(bld);
//! ```

use crate::error::{CApiError, ReportError, guard};
use crate::fs::{Endpoint, do_hdfs_connect, hdfs_internal};
use crate::tPort;
use crate::utils::{optional_str, port_override, required_str};
use hdfspp::{Configuration, ConfigurationLoader, Options};
use libc::{c_char, c_int};
use std::ffi::CString;
use std::ptr;

/// Opaque builder handle.
#[allow(non_camel_case_types)]
pub struct hdfsBuilder {
    loader: ConfigurationLoader,
    config: Configuration,
    override_host: Option<String>,
    override_port: Option<tPort>,
    user: Option<String>,
}

impl hdfsBuilder {
    /// A builder over the default search path.
    pub fn new() -> Self {
        let mut loader = ConfigurationLoader::new();
        loader.set_default_search_path();
        Self::with_loader(loader)
    }

    /// A builder whose search path is only `directory`.
    pub fn from_directory(directory: &str) -> Self {
        let mut loader = ConfigurationLoader::new();
        loader.set_search_path(directory);
        Self::with_loader(loader)
    }

    fn with_loader(loader: ConfigurationLoader) -> Self {
        let config = loader
            .load_default_resources()
            .unwrap_or_else(|| loader.new_config());
        Self {
            loader,
            config,
            override_host: None,
            override_port: None,
            user: None,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Overlays `key` with `value`, keeping the current snapshot when
    /// the loader refuses.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CApiError> {
        let next = self
            .loader
            .overlay_value(&self.config, key, value)
            .ok_or(CApiError::BuilderValue)?;
        self.config = next;
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::resolve(self.override_host.as_deref(), self.override_port)
    }

    fn connect(&self) -> Option<Box<hdfs_internal>> {
        let options = Options::from(&self.config);
        do_hdfs_connect(self.endpoint(), self.user.as_deref(), &options)
    }

    fn get_str(&self, key: &str) -> Option<CString> {
        let value = self.config.get(key)?;
        // Like `strncpy`, the copy ends at the first NUL.
        let bytes = value.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        CString::new(&bytes[..end]).ok()
    }

    fn get_int(&self, key: &str) -> Result<i32, CApiError> {
        let value = self.config.get_int(key).ok_or(CApiError::BuilderLookup)?;
        i32::try_from(value).map_err(|_| CApiError::IntOutOfRange(key.to_owned()))
    }
}

impl Default for hdfsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A builder over the default search path: `HADOOP_CONF_DIR`, then
/// `$HADOOP_HOME/etc/hadoop`, then `/etc/hadoop/conf`.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsNewBuilder() -> Option<Box<hdfsBuilder>> {
    guard(None, || Some(Box::new(hdfsBuilder::new())))
}

/// A builder that only looks for resources in `config_directory`.
///
/// # Safety
///
/// `config_directory` must be null or a NUL terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsNewBuilderFromDirectory(
    config_directory: *const c_char,
) -> Option<Box<hdfsBuilder>> {
    guard(None, || {
        let directory = c_try!(
            unsafe { required_str(config_directory, "configDirectory") },
            None
        );
        Some(Box::new(hdfsBuilder::from_directory(directory)))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn hdfsFreeBuilder(bld: Option<Box<hdfsBuilder>>) {
    guard((), || drop(bld))
}

/// Overrides the namenode host. A null `nn` removes the override.
///
/// # Safety
///
/// `nn` must be null or a NUL terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsBuilderSetNameNode(bld: Option<&mut hdfsBuilder>, nn: *const c_char) {
    guard((), || {
        let bld = c_try!(bld.ok_or(CApiError::NullBuilder), ());
        let nn = c_try!(unsafe { optional_str(nn, "nn") }, ());
        bld.override_host = nn.map(str::to_owned);
    })
}

/// Overrides the namenode port. A `port` of 0 removes the override.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsBuilderSetNameNodePort(bld: Option<&mut hdfsBuilder>, port: tPort) {
    guard((), || {
        let bld = c_try!(bld.ok_or(CApiError::NullBuilder), ());
        bld.override_port = port_override(port);
    })
}

/// Sets the user to connect as. Null or empty names are ignored.
///
/// # Safety
///
/// `user_name` must be null or a NUL terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsBuilderSetUserName(
    bld: Option<&mut hdfsBuilder>,
    user_name: *const c_char,
) {
    guard((), || {
        let bld = c_try!(bld.ok_or(CApiError::NullBuilder), ());
        if let Some(user) = c_try!(unsafe { optional_str(user_name, "userName") }, ()) {
            if !user.is_empty() {
                bld.user = Some(user.to_owned());
            }
        }
    })
}

/// Overlays `key` with `val`. Returns `0`, or `1` when the value could
/// not be set.
///
/// # Safety
///
/// `key` and `val` must be null or NUL terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsBuilderConfSetStr(
    bld: Option<&mut hdfsBuilder>,
    key: *const c_char,
    val: *const c_char,
) -> c_int {
    guard(-1, || {
        let bld = c_try!(bld.ok_or(CApiError::NullBuilder), -1);
        let key = unsafe { required_str(key, "key") };
        let val = unsafe { required_str(val, "val") };

        match (key, val) {
            (Ok(key), Ok(val)) if bld.set(key, val).is_ok() => 0,
            _ => {
                CApiError::BuilderValue.report();
                1
            }
        }
    })
}

/// Stores a copy of the value of `key` in `*val`, or null when the key
/// is not set. Either way the lookup succeeds and returns `0`.
///
/// Release the copy with [`hdfsConfStrFree`].
///
/// # Safety
///
/// `key` must be null or a NUL terminated string; `val` must be null or
/// valid for a pointer write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsBuilderConfGetStr(
    bld: Option<&hdfsBuilder>,
    key: *const c_char,
    val: *mut *mut c_char,
) -> c_int {
    guard(-1, || {
        let bld = c_try!(bld.ok_or(CApiError::NullBuilder), -1);
        let key = c_try!(unsafe { required_str(key, "key") }, -1);
        if val.is_null() {
            return CApiError::NullArgument("val").report();
        }

        let value = bld.get_str(key).map_or(ptr::null_mut(), CString::into_raw);
        unsafe { *val = value };
        0
    })
}

/// Stores the value of `key` in `*val`.
///
/// Returns `0` when found, `-1` when the key is unset or not an
/// integer, and `1` when it does not fit in an `int`. `*val` is only
/// written on success.
///
/// # Safety
///
/// `key` must be null or a NUL terminated string; `val` must be null or
/// valid for an `int32_t` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsBuilderConfGetInt(
    bld: Option<&hdfsBuilder>,
    key: *const c_char,
    val: *mut i32,
) -> c_int {
    guard(-1, || {
        let bld = c_try!(bld.ok_or(CApiError::NullBuilder), -1);
        let key = c_try!(unsafe { required_str(key, "key") }, -1);
        if val.is_null() {
            return CApiError::NullArgument("val").report();
        }

        match bld.get_int(key) {
            Ok(value) => {
                unsafe { *val = value };
                0
            }
            Err(err @ CApiError::IntOutOfRange(_)) => {
                err.report();
                1
            }
            Err(err) => err.report(),
        }
    })
}

/// Releases a string returned by [`hdfsBuilderConfGetStr`] or
/// [`hdfsConfGetStr`]. Null is ignored.
///
/// # Safety
///
/// `val` must be null or a string returned by one of those functions,
/// not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsConfStrFree(val: *mut c_char) {
    guard((), || {
        if !val.is_null() {
            drop(unsafe { CString::from_raw(val) });
        }
    })
}

/// [`hdfsBuilderConfGetStr`] against a fresh default builder.
///
/// # Safety
///
/// See [`hdfsBuilderConfGetStr`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsConfGetStr(key: *const c_char, val: *mut *mut c_char) -> c_int {
    guard(-1, || {
        let builder = hdfsBuilder::new();
        unsafe { hdfsBuilderConfGetStr(Some(&builder), key, val) }
    })
}

/// [`hdfsBuilderConfGetInt`] against a fresh default builder.
///
/// # Safety
///
/// See [`hdfsBuilderConfGetInt`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hdfsConfGetInt(key: *const c_char, val: *mut i32) -> c_int {
    guard(-1, || {
        let builder = hdfsBuilder::new();
        unsafe { hdfsBuilderConfGetInt(Some(&builder), key, val) }
    })
}

/// Connects with the builder's overrides and configuration. The
/// builder is left untouched and must still be freed.
#[unsafe(no_mangle)]
pub extern "C" fn hdfsBuilderConnect(bld: Option<&hdfsBuilder>) -> Option<Box<hdfs_internal>> {
    guard(None, || {
        let bld = c_try!(bld.ok_or(CApiError::NullBuilder), None);
        bld.connect()
    })
}
