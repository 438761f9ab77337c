//! The filesystem engine contract.
//!
//! An engine owns everything below the client surface: RPC, block
//! transfer, retries and authentication. The C bindings only ever talk
//! to it through the traits in this module, and find it through the
//! process-wide registry ([`install`] / [`current`]).

pub mod memory;

use crate::events::{FileEventCallback, FsEventCallback};
use crate::{Options, Status};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::io::SeekFrom;
use std::sync::Arc;

pub use self::memory::MemoryEngine;

/// The engine's I/O context. Dropping it stops and releases it.
pub trait IoService: Send + Sync {
    /// Asks the service to stop running handlers. Idempotent.
    fn stop(&self);
}

/// A session with one remote filesystem.
pub trait FileSystem: Send + Sync {
    /// Registers the session-level event observer. Replaces any
    /// previous one.
    fn set_fs_event_callback(&mut self, callback: FsEventCallback);

    /// Connects to the namenode at `host`, where `service` is the port
    /// in decimal.
    fn connect(&mut self, host: &str, service: &str) -> Result<(), Status>;

    /// Connects to the endpoint named by `fs.defaultFS`.
    fn connect_to_default_fs(&mut self) -> Result<(), Status>;

    /// Opens `path` for reading.
    fn open(&self, path: &str) -> Result<Box<dyn FileHandle>, Status>;
}

/// An open, positioned read handle.
///
/// Every operation takes `&self`: a handle may be read on one thread
/// while another cancels it, so implementations serialize internally.
pub trait FileHandle: Send + Sync {
    fn set_file_event_callback(&mut self, callback: FileEventCallback);

    /// Reads at the cursor and advances it. `Ok(0)` is end of stream.
    fn read(&self, buf: &mut [u8]) -> Result<usize, Status>;

    /// Reads at `offset` without touching the cursor.
    fn position_read(&self, buf: &mut [u8], offset: u64) -> Result<usize, Status>;

    /// Moves the cursor and returns its new absolute position.
    fn seek(&self, pos: SeekFrom) -> Result<u64, Status>;

    /// Signals in-flight and future operations to stop. Does not wait.
    fn cancel_operations(&self);
}

/// Factory for sessions.
pub trait FileSystemEngine: Send + Sync {
    fn new_io_service(&self) -> Box<dyn IoService>;

    /// Builds an unconnected session that takes ownership of `io`.
    ///
    /// `None` means the session could not be created; `io` has been
    /// released in that case.
    fn new_filesystem(
        &self,
        io: Box<dyn IoService>,
        user: &str,
        options: &Options,
    ) -> Option<Box<dyn FileSystem>>;
}

static ENGINE: Lazy<RwLock<Arc<dyn FileSystemEngine>>> =
    Lazy::new(|| RwLock::new(Arc::new(MemoryEngine::new())));

/// Makes `engine` the one used by every subsequent connect, returning
/// the previous engine.
pub fn install(engine: Arc<dyn FileSystemEngine>) -> Arc<dyn FileSystemEngine> {
    std::mem::replace(&mut *ENGINE.write(), engine)
}

/// The engine currently installed. Defaults to an empty
/// [`MemoryEngine`], which has no reachable endpoint.
pub fn current() -> Arc<dyn FileSystemEngine> {
    Arc::clone(&*ENGINE.read())
}
