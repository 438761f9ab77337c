//! An in-process engine serving immutable files from memory.
//!
//! Namenode endpoints are registered as `host:port` pairs; connecting
//! anywhere else fails as if nothing were listening. The engine does no
//! network I/O, which makes it suitable for embedding and for tests of
//! the client surface.

use super::{FileHandle, FileSystem, FileSystemEngine, IoService};
use crate::events::{
    FILE_DN_READ_EVENT, FS_NN_CONNECT_EVENT, FS_NN_READ_EVENT, FileEventCallback,
    FsEventCallback,
};
use crate::hdfs_log;
use crate::logging::{LogLevel, LogSourceComponent};
use crate::{DEFAULT_NAMENODE_PORT, Options, Status};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::io::SeekFrom;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct Shared {
    clusters: RwLock<HashMap<String, Arc<MemoryCluster>>>,
    live_io_services: AtomicUsize,
}

fn endpoint(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}

/// See the [module documentation](self).
#[derive(Clone, Default)]
pub struct MemoryEngine {
    shared: Arc<Shared>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a cluster named `name` reachable at `host:port`, replacing
    /// whatever was registered there.
    pub fn add_cluster(&self, host: &str, port: u16, name: &str) -> Arc<MemoryCluster> {
        let cluster = Arc::new(MemoryCluster::new(name));
        self.shared
            .clusters
            .write()
            .insert(endpoint(host, port), Arc::clone(&cluster));
        cluster
    }

    pub fn remove_cluster(&self, host: &str, port: u16) -> Option<Arc<MemoryCluster>> {
        self.shared.clusters.write().remove(&endpoint(host, port))
    }

    /// Number of I/O services created by this engine and not yet
    /// dropped.
    pub fn live_io_services(&self) -> usize {
        self.shared.live_io_services.load(Ordering::SeqCst)
    }
}

impl FileSystemEngine for MemoryEngine {
    fn new_io_service(&self) -> Box<dyn IoService> {
        self.shared.live_io_services.fetch_add(1, Ordering::SeqCst);
        Box::new(MemoryIoService {
            shared: Arc::clone(&self.shared),
            stopped: AtomicBool::new(false),
        })
    }

    fn new_filesystem(
        &self,
        io: Box<dyn IoService>,
        user: &str,
        options: &Options,
    ) -> Option<Box<dyn FileSystem>> {
        Some(Box::new(MemoryFileSystem {
            shared: Arc::clone(&self.shared),
            io,
            user: user.to_owned(),
            options: options.clone(),
            cluster: None,
            callback: None,
        }))
    }
}

/// The namespace of one registered cluster.
pub struct MemoryCluster {
    name: String,
    files: RwLock<HashMap<String, Bytes>>,
    denied_users: RwLock<HashSet<String>>,
}

impl MemoryCluster {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            files: RwLock::default(),
            denied_users: RwLock::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn put_file(&self, path: &str, contents: impl Into<Bytes>) {
        self.files.write().insert(path.to_owned(), contents.into());
    }

    pub fn remove_file(&self, path: &str) -> Option<Bytes> {
        self.files.write().remove(path)
    }

    /// Makes every later connect as `user` fail with permission denied.
    pub fn deny_user(&self, user: &str) {
        self.denied_users.write().insert(user.to_owned());
    }

    fn file(&self, path: &str) -> Option<Bytes> {
        self.files.read().get(path).cloned()
    }

    fn is_denied(&self, user: &str) -> bool {
        self.denied_users.read().contains(user)
    }
}

struct MemoryIoService {
    shared: Arc<Shared>,
    stopped: AtomicBool,
}

impl IoService for MemoryIoService {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

impl Drop for MemoryIoService {
    fn drop(&mut self) {
        self.stop();
        self.shared.live_io_services.fetch_sub(1, Ordering::SeqCst);
    }
}

struct MemoryFileSystem {
    shared: Arc<Shared>,
    io: Box<dyn IoService>,
    user: String,
    options: Options,
    cluster: Option<Arc<MemoryCluster>>,
    callback: Option<FsEventCallback>,
}

impl MemoryFileSystem {
    fn fire(&self, event: &str, cluster: &str, value: i64) -> Result<(), Status> {
        match &self.callback {
            Some(callback) => callback(event, cluster, value).into_result(),
            None => Ok(()),
        }
    }
}

impl Drop for MemoryFileSystem {
    fn drop(&mut self) {
        self.io.stop();
    }
}

impl FileSystem for MemoryFileSystem {
    fn set_fs_event_callback(&mut self, callback: FsEventCallback) {
        self.callback = Some(callback);
    }

    fn connect(&mut self, host: &str, service: &str) -> Result<(), Status> {
        let port: u16 = service
            .trim()
            .parse()
            .map_err(|_| Status::invalid_argument(format!("Invalid port: {service}")))?;

        hdfs_log!(
            LogLevel::Info,
            LogSourceComponent::FileSystem,
            "Connecting to {host}:{port} as '{}'",
            self.user
        );

        let cluster = self.shared.clusters.read().get(&endpoint(host, port)).cloned();
        let cluster_name = cluster.as_ref().map_or(host, |c| c.name());
        self.fire(FS_NN_CONNECT_EVENT, cluster_name, 0)?;

        let Some(cluster) = cluster else {
            hdfs_log!(
                LogLevel::Warning,
                LogSourceComponent::Rpc,
                "No namenode listening at {host}:{port}"
            );
            return Err(Status::resource_unavailable(format!(
                "Unable to connect to {host}:{port}"
            )));
        };

        if cluster.is_denied(&self.user) {
            return Err(Status::permission_denied(format!(
                "Permission denied: user={}",
                self.user
            )));
        }

        self.cluster = Some(cluster);
        Ok(())
    }

    fn connect_to_default_fs(&mut self) -> Result<(), Status> {
        let Some(default_fs) = self.options.default_fs.clone() else {
            return Err(Status::invalid_argument("fs.defaultFS is not configured"));
        };
        let Some(host) = default_fs.host_str() else {
            return Err(Status::invalid_argument(format!(
                "fs.defaultFS has no host: {default_fs}"
            )));
        };
        let port = default_fs.port().unwrap_or(DEFAULT_NAMENODE_PORT);
        self.connect(host, &port.to_string())
    }

    fn open(&self, path: &str) -> Result<Box<dyn FileHandle>, Status> {
        let Some(cluster) = &self.cluster else {
            return Err(Status::resource_unavailable("FileSystem is not connected"));
        };
        self.fire(FS_NN_READ_EVENT, cluster.name(), 0)?;

        let data = cluster
            .file(path)
            .ok_or_else(|| Status::path_not_found(format!("Path not found: {path}")))?;

        hdfs_log!(
            LogLevel::Debug,
            LogSourceComponent::FileSystem,
            "Opened {path} ({} bytes) on {}",
            data.len(),
            cluster.name()
        );

        Ok(Box::new(MemoryFile {
            cluster: cluster.name().to_owned(),
            path: path.to_owned(),
            data,
            position: Mutex::new(0),
            canceled: AtomicBool::new(false),
            callback: None,
        }))
    }
}

struct MemoryFile {
    cluster: String,
    path: String,
    data: Bytes,
    position: Mutex<u64>,
    canceled: AtomicBool,
    callback: Option<FileEventCallback>,
}

impl MemoryFile {
    fn check_canceled(&self) -> Result<(), Status> {
        if self.canceled.load(Ordering::SeqCst) {
            Err(Status::canceled())
        } else {
            Ok(())
        }
    }

    fn copy_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, Status> {
        self.check_canceled()?;
        let len = self.data.len() as u64;
        let start = offset.min(len) as usize;
        let count = buf.len().min(self.data.len() - start);

        if let Some(callback) = &self.callback {
            callback(FILE_DN_READ_EVENT, &self.cluster, &self.path, count as i64)
                .into_result()?;
        }

        buf[..count].copy_from_slice(&self.data[start..start + count]);
        hdfs_log!(
            LogLevel::Trace,
            LogSourceComponent::BlockReader,
            "Read {count} bytes of {} at offset {offset}",
            self.path
        );
        Ok(count)
    }
}

impl FileHandle for MemoryFile {
    fn set_file_event_callback(&mut self, callback: FileEventCallback) {
        self.callback = Some(callback);
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, Status> {
        let mut position = self.position.lock();
        let count = self.copy_at(buf, *position)?;
        *position += count as u64;
        Ok(count)
    }

    fn position_read(&self, buf: &mut [u8], offset: u64) -> Result<usize, Status> {
        self.copy_at(buf, offset)
    }

    fn seek(&self, pos: SeekFrom) -> Result<u64, Status> {
        self.check_canceled()?;
        let mut position = self.position.lock();
        let len = self.data.len() as i128;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => *position as i128 + delta as i128,
            SeekFrom::End(delta) => len + delta as i128,
        };
        if !(0..=len).contains(&target) {
            return Err(Status::invalid_argument(format!(
                "Seek offset {target} outside of {} (length {len})",
                self.path
            )));
        }
        *position = target as u64;
        Ok(*position)
    }

    fn cancel_operations(&self) {
        hdfs_log!(
            LogLevel::Debug,
            LogSourceComponent::FileHandle,
            "Canceling operations on {}",
            self.path
        );
        self.canceled.store(true, Ordering::SeqCst);
    }
}
