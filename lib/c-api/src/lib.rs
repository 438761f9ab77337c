//! libhdfs compatible C API for libhdfs++.
//!
//! This crate exposes the `hdfs*` C functions declared by the
//! `hdfspp.h` header generated at build time. It is only the boundary
//! layer: it checks handles and arguments, turns engine results into
//! `errno` plus a per-thread message, and hands everything else to the
//! engine installed with [`hdfspp::engine::install`].
//!
//! The surface is split by concern:
//!
//! * [`fs`], sessions (`hdfsConnect`, `hdfsDisconnect`, ...),
//! * [`file`], read handles (`hdfsOpenFile`, `hdfsRead`, ...),
//! * [`builder`], layered configuration (`hdfsNewBuilder`, ...),
//! * [`events`], instrumentation hooks (`hdfsPreAttachFSMonitor`, ...),
//! * [`logging`], the log sink and filters (`hdfsSetLogFunction`, ...),
//! * [`error`], `hdfsGetLastError`.
//!
//! Every entry point is panic safe: a panic is reported as an exception
//! and never unwinds into C.

#![allow(non_snake_case)]
#![deny(
    dead_code,
    unused_imports,
    unused_variables,
    unused_unsafe,
    unreachable_patterns
)]

#[macro_use]
mod utils;

pub mod builder;
pub mod error;
pub mod events;
pub mod file;
pub mod fs;
pub mod logging;

/// A TCP port.
#[allow(non_camel_case_types)]
pub type tPort = u16;

/// Byte counts for reads.
#[allow(non_camel_case_types)]
pub type tSize = i32;

/// Offsets within a file.
#[allow(non_camel_case_types)]
pub type tOffset = i64;
