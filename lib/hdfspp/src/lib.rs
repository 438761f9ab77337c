//! Client-side contract of libhdfs++.
//!
//! This crate holds what the C bindings (`hdfspp-c-api`) adapt:
//!
//! * [`Status`], the result of every engine operation,
//! * [`Configuration`] snapshots and the [`ConfigurationLoader`] that
//!   resolves them from resource files,
//! * the connection [`Options`] derived from a snapshot,
//! * the event instrumentation contract ([`events`]),
//! * the logging plugin contract ([`logging`]),
//! * the engine traits and registry ([`engine`]), with an in-process
//!   [`MemoryEngine`](engine::MemoryEngine).

#![deny(unused_imports, unused_unsafe, unreachable_patterns)]

pub mod configuration;
pub mod configuration_loader;
pub mod engine;
pub mod events;
pub mod logging;
pub mod options;
pub mod status;

pub use crate::configuration::Configuration;
pub use crate::configuration_loader::{ConfigError, ConfigurationLoader};
pub use crate::options::{AuthenticationMethod, Options};
pub use crate::status::{Status, StatusCode};

/// Namenode RPC port used when a host is given without one.
pub const DEFAULT_NAMENODE_PORT: u16 = 8020;
