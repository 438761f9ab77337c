//! Connection parameters derived from a configuration snapshot.

use crate::configuration::Configuration;
use std::time::Duration;
use url::Url;

pub const FS_DEFAULT_FS_KEY: &str = "fs.defaultFS";
pub const DFS_CLIENT_SOCKET_TIMEOUT_KEY: &str = "dfs.client.socket-timeout";
pub const IPC_CLIENT_CONNECT_TIMEOUT_KEY: &str = "ipc.client.connect.timeout";
pub const IPC_CLIENT_CONNECT_MAX_RETRIES_KEY: &str = "ipc.client.connect.max.retries";
pub const IPC_CLIENT_CONNECT_RETRY_INTERVAL_KEY: &str = "ipc.client.connect.retry.interval";
pub const DFS_CLIENT_FAILOVER_MAX_ATTEMPTS_KEY: &str = "dfs.client.failover.max.attempts";
pub const DFS_CLIENT_FAILOVER_CONNECTION_RETRIES_KEY: &str =
    "dfs.client.failover.connection.retries";
pub const HADOOP_SECURITY_AUTHENTICATION_KEY: &str = "hadoop.security.authentication";
pub const DFS_BLOCK_SIZE_KEY: &str = "dfs.blocksize";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthenticationMethod {
    #[default]
    Simple,
    Kerberos,
}

/// Everything the engine needs to build a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub rpc_timeout: Duration,
    pub rpc_connect_timeout: Duration,
    pub max_rpc_retries: u32,
    pub rpc_retry_delay: Duration,
    pub failover_max_retries: u32,
    pub failover_connection_max_retries: u32,
    pub authentication: AuthenticationMethod,
    pub block_size: u64,
    /// Endpoint used when no explicit host or port is given.
    pub default_fs: Option<Url>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_millis(30_000),
            rpc_connect_timeout: Duration::from_millis(30_000),
            max_rpc_retries: 0,
            rpc_retry_delay: Duration::from_millis(10_000),
            failover_max_retries: 4,
            failover_connection_max_retries: 0,
            authentication: AuthenticationMethod::Simple,
            block_size: 128 * 1024 * 1024,
            default_fs: None,
        }
    }
}

impl Options {
    /// Reads every known key from `config`, keeping the default for
    /// keys that are absent or malformed.
    pub fn from_configuration(config: &Configuration) -> Self {
        let defaults = Self::default();

        let millis = |key: &str, default: Duration| match config.get_int(key) {
            Some(ms) if ms >= 0 => Duration::from_millis(ms as u64),
            _ => default,
        };
        let count = |key: &str, default: u32| {
            config
                .get_int(key)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(default)
        };

        let default_fs = match config.get(FS_DEFAULT_FS_KEY) {
            Some(raw) => match Url::parse(raw.trim()) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(value = raw, error = %e, "ignoring malformed fs.defaultFS");
                    None
                }
            },
            None => None,
        };

        let authentication = match config.get(HADOOP_SECURITY_AUTHENTICATION_KEY) {
            Some(method) if method.trim().eq_ignore_ascii_case("kerberos") => {
                AuthenticationMethod::Kerberos
            }
            _ => AuthenticationMethod::Simple,
        };

        Self {
            rpc_timeout: millis(DFS_CLIENT_SOCKET_TIMEOUT_KEY, defaults.rpc_timeout),
            rpc_connect_timeout: millis(
                IPC_CLIENT_CONNECT_TIMEOUT_KEY,
                defaults.rpc_connect_timeout,
            ),
            max_rpc_retries: count(IPC_CLIENT_CONNECT_MAX_RETRIES_KEY, defaults.max_rpc_retries),
            rpc_retry_delay: millis(
                IPC_CLIENT_CONNECT_RETRY_INTERVAL_KEY,
                defaults.rpc_retry_delay,
            ),
            failover_max_retries: count(
                DFS_CLIENT_FAILOVER_MAX_ATTEMPTS_KEY,
                defaults.failover_max_retries,
            ),
            failover_connection_max_retries: count(
                DFS_CLIENT_FAILOVER_CONNECTION_RETRIES_KEY,
                defaults.failover_connection_max_retries,
            ),
            authentication,
            block_size: config
                .get_int(DFS_BLOCK_SIZE_KEY)
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(defaults.block_size),
            default_fs,
        }
    }
}

impl From<&Configuration> for Options {
    fn from(config: &Configuration) -> Self {
        Self::from_configuration(config)
    }
}
